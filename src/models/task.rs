use chrono::{DateTime, Utc};
use log::warn;
use mongodb::bson::DateTime as BsonDateTime;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Emails are the join key between sessions and grants; compare them only in
/// this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Capability level granted to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can edit and toggle completion.
    Admin,
    /// View only.
    User,
}

impl Role {
    /// Every role a grant can carry. Shared-task lookups enumerate these.
    pub const ALL: [Role; 2] = [Role::User, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// One collaborator grant on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedWith {
    pub email: String,
    pub role: Role,
}

impl SharedWith {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }

    /// Whether this grant belongs to `email`, compared normalized.
    pub fn is_for(&self, email: &str) -> bool {
        normalize_email(&self.email) == normalize_email(email)
    }
}

/// Reads `sharedWith`, dropping entries that are not a valid grant so one bad
/// element does not make the whole document unreadable.
fn lenient_grants<'de, D>(deserializer: D) -> Result<Option<Vec<SharedWith>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Grant(SharedWith),
        Malformed(IgnoredAny),
    }

    let entries = Option::<Vec<Entry>>::deserialize(deserializer)?;
    Ok(entries.map(|entries| {
        entries
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Grant(grant) => Some(grant),
                Entry::Malformed(_) => {
                    warn!("Skipping undecodable sharedWith entry");
                    None
                }
            })
            .collect()
    }))
}

/// A task as seen by the rest of the crate, after decoding from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
    pub owner_email: String,
    pub shared_with: Vec<SharedWith>,
}

impl Task {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// The grant held by `email`, if any. Emails are compared normalized.
    pub fn grant_for(&self, email: &str) -> Option<&SharedWith> {
        self.shared_with.iter().find(|grant| grant.is_for(email))
    }
}

/// A task that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub is_done: bool,
    pub user_id: String,
    pub owner_email: String,
    pub shared_with: Option<Vec<SharedWith>>,
}

/// Fields to merge into an existing task. `None` leaves the stored value
/// untouched; an empty description clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_done: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.is_done.is_none()
    }
}

/// Raw shape of a document in the `tasks` collection.
///
/// Every field is optional because documents written by other clients may
/// omit any of them. The same shape doubles as a partial update: only the
/// fields that are `Some` are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(skip)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<BsonDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<BsonDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_grants",
        skip_serializing_if = "Option::is_none"
    )]
    pub shared_with: Option<Vec<SharedWith>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShareTaskRequest {
    pub email: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, from_document, to_document};

    #[test]
    fn record_uses_camel_case_field_names() {
        let record = TaskRecord {
            title: Some("Buy milk".to_string()),
            is_done: Some(false),
            user_id: Some("u1".to_string()),
            shared_with: Some(vec![SharedWith::new("bob@example.com", Role::User)]),
            ..TaskRecord::default()
        };
        let document = to_document(&record).unwrap();
        assert_eq!(document.get_str("title").unwrap(), "Buy milk");
        assert!(!document.get_bool("isDone").unwrap());
        assert_eq!(document.get_str("userId").unwrap(), "u1");
        assert!(!document.contains_key("description"));
        let grants = document.get_array("sharedWith").unwrap();
        assert_eq!(
            grants[0].as_document().unwrap(),
            &doc! { "email": "bob@example.com", "role": "user" }
        );
    }

    #[test]
    fn record_tolerates_missing_fields() {
        let record: TaskRecord = from_document(doc! { "title": "Sparse" }).unwrap();
        assert_eq!(record.title.as_deref(), Some("Sparse"));
        assert!(record.is_done.is_none());
        assert!(record.shared_with.is_none());
        assert!(record.created_at.is_none());
    }

    #[test]
    fn undecodable_grants_are_dropped() {
        let record: TaskRecord = from_document(doc! {
            "title": "Shared",
            "sharedWith": [
                { "email": "bob@example.com", "role": "owner" },
                { "email": "carol@example.com" },
                "dave@example.com",
                { "email": "erin@example.com", "role": "admin" },
            ],
        })
        .unwrap();
        assert_eq!(
            record.shared_with.unwrap(),
            vec![SharedWith::new("erin@example.com", Role::Admin)]
        );
    }

    #[test]
    fn grant_lookup_ignores_case() {
        let now = Utc::now();
        let task = Task {
            id: "t1".to_string(),
            title: "Shared".to_string(),
            description: None,
            is_done: false,
            created_at: now,
            updated_at: now,
            user_id: "owner".to_string(),
            owner_email: "owner@example.com".to_string(),
            shared_with: vec![SharedWith::new("bob@example.com", Role::Admin)],
        };
        assert_eq!(task.grant_for("Bob@Example.com").map(|g| g.role), Some(Role::Admin));
        assert_eq!(task.grant_for(" BOB@example.com ").map(|g| g.role), Some(Role::Admin));
        assert!(task.grant_for("carol@example.com").is_none());
    }
}
