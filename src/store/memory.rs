use async_trait::async_trait;
use log::debug;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::TaskStore;
use crate::error::TaskResult;
use crate::models::{Role, SharedWith, TaskRecord};

/// Process-local store with the same matching rules as the MongoDB store.
#[derive(Default)]
pub struct InMemoryTaskStore {
    records: RwLock<Vec<TaskRecord>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn merge(target: &mut TaskRecord, fields: TaskRecord) {
    if fields.title.is_some() {
        target.title = fields.title;
    }
    if fields.description.is_some() {
        target.description = fields.description;
    }
    if fields.is_done.is_some() {
        target.is_done = fields.is_done;
    }
    if fields.created_at.is_some() {
        target.created_at = fields.created_at;
    }
    if fields.updated_at.is_some() {
        target.updated_at = fields.updated_at;
    }
    if fields.user_id.is_some() {
        target.user_id = fields.user_id;
    }
    if fields.owner_email.is_some() {
        target.owner_email = fields.owner_email;
    }
    if fields.shared_with.is_some() {
        target.shared_with = fields.shared_with;
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_by_owner(&self, user_id: &str) -> TaskResult<Vec<TaskRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn find_shared_with(&self, email: &str, roles: &[Role]) -> TaskResult<Vec<TaskRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| {
                r.shared_with.as_ref().is_some_and(|grants| {
                    grants
                        .iter()
                        .any(|g| g.is_for(email) && roles.contains(&g.role))
                })
            })
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> TaskResult<Option<TaskRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn insert(&self, mut record: TaskRecord) -> TaskResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        record.id = id.clone();
        debug!("In-memory insert of task {}", id);
        self.records.write().await.push(record);
        Ok(id)
    }

    async fn merge_fields(&self, id: &str, fields: TaskRecord) -> TaskResult<bool> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                merge(record, fields);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> TaskResult<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    async fn upsert_grant(&self, id: &str, grant: &SharedWith) -> TaskResult<bool> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        let grants = record.shared_with.get_or_insert_with(Vec::new);
        grants.retain(|g| !g.is_for(&grant.email));
        grants.push(grant.clone());
        Ok(true)
    }

    async fn remove_grants(&self, id: &str, email: &str) -> TaskResult<bool> {
        let mut records = self.records.write().await;
        let Some(grants) = records
            .iter_mut()
            .find(|r| r.id == id)
            .and_then(|r| r.shared_with.as_mut())
        else {
            return Ok(false);
        };
        let before = grants.len();
        grants.retain(|g| !g.is_for(email));
        Ok(grants.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn record(user_id: &str) -> TaskRecord {
        TaskRecord {
            title: Some("Task".to_string()),
            user_id: Some(user_id.to_string()),
            ..TaskRecord::default()
        }
    }

    fn with_grants(user_id: &str, grants: Vec<SharedWith>) -> TaskRecord {
        TaskRecord {
            shared_with: Some(grants),
            ..record(user_id)
        }
    }

    #[tokio::test]
    async fn shared_lookup_filters_on_role() {
        let store = InMemoryTaskStore::new();
        let id = store.insert(record("owner")).await.unwrap();
        store
            .upsert_grant(&id, &SharedWith::new("bob@example.com", Role::Admin))
            .await
            .unwrap();

        let wrong_role = store
            .find_shared_with("bob@example.com", &[Role::User])
            .await
            .unwrap();
        assert!(wrong_role.is_empty());

        let any_role = store
            .find_shared_with("bob@example.com", &Role::ALL)
            .await
            .unwrap();
        assert_eq!(any_role.len(), 1);
    }

    #[tokio::test]
    async fn shared_lookup_ignores_email_case() {
        let store = InMemoryTaskStore::new();
        store
            .insert(with_grants(
                "owner",
                vec![SharedWith::new("Bob@Example.com", Role::Admin)],
            ))
            .await
            .unwrap();

        let found = store
            .find_shared_with("bob@example.com", &Role::ALL)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn upsert_collapses_every_grant_for_the_email() {
        let store = InMemoryTaskStore::new();
        let id = store
            .insert(with_grants(
                "owner",
                vec![
                    SharedWith::new("Bob@Example.com", Role::User),
                    SharedWith::new("carol@example.com", Role::User),
                    SharedWith::new("bob@example.com", Role::Admin),
                ],
            ))
            .await
            .unwrap();

        store
            .upsert_grant(&id, &SharedWith::new("bob@example.com", Role::User))
            .await
            .unwrap();

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(
            stored.shared_with.unwrap(),
            vec![
                SharedWith::new("carol@example.com", Role::User),
                SharedWith::new("bob@example.com", Role::User),
            ]
        );
    }

    #[tokio::test]
    async fn concurrent_upserts_leave_one_grant() {
        let store = InMemoryTaskStore::new();
        let id = store.insert(record("owner")).await.unwrap();
        let as_user = SharedWith::new("bob@example.com", Role::User);
        let as_admin = SharedWith::new("Bob@Example.com", Role::Admin);

        let (a, b) = tokio::join!(
            store.upsert_grant(&id, &as_user),
            store.upsert_grant(&id, &as_admin)
        );
        assert!(a.unwrap());
        assert!(b.unwrap());

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.shared_with.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_drops_every_grant_for_the_email() {
        let store = InMemoryTaskStore::new();
        let id = store
            .insert(with_grants(
                "owner",
                vec![
                    SharedWith::new("bob@example.com", Role::User),
                    SharedWith::new("BOB@example.com", Role::Admin),
                    SharedWith::new("carol@example.com", Role::User),
                ],
            ))
            .await
            .unwrap();

        assert!(store.remove_grants(&id, "bob@example.com").await.unwrap());
        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(
            stored.shared_with.unwrap(),
            vec![SharedWith::new("carol@example.com", Role::User)]
        );
        assert!(!store.remove_grants(&id, "bob@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn upsert_replaces_role_for_existing_email() {
        let store = InMemoryTaskStore::new();
        let id = store.insert(record("owner")).await.unwrap();
        store
            .upsert_grant(&id, &SharedWith::new("bob@example.com", Role::User))
            .await
            .unwrap();
        store
            .upsert_grant(&id, &SharedWith::new("bob@example.com", Role::Admin))
            .await
            .unwrap();

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(
            stored.shared_with.unwrap(),
            vec![SharedWith::new("bob@example.com", Role::Admin)]
        );
    }

    #[tokio::test]
    async fn missing_ids_report_false() {
        let store = InMemoryTaskStore::new();
        let grant = SharedWith::new("bob@example.com", Role::User);
        assert!(!store.delete("nope").await.unwrap());
        assert!(!store.merge_fields("nope", TaskRecord::default()).await.unwrap());
        assert!(!store.upsert_grant("nope", &grant).await.unwrap());
        assert!(!store.remove_grants("nope", &grant.email).await.unwrap());
        assert!(store.is_empty().await);
    }
}
