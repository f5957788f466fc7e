// src/repository.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use mongodb::bson::DateTime as BsonDateTime;

use crate::error::{TaskError, TaskResult};
use crate::models::{NewTask, Role, Task, TaskPatch, TaskRecord};
use crate::store::TaskStore;

/// Typed CRUD over the `tasks` collection.
#[derive(Clone)]
pub struct TaskRepository {
    store: Arc<dyn TaskStore>,
}

fn to_bson_time(ts: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(ts.timestamp_millis())
}

fn from_bson_time(ts: Option<BsonDateTime>, now: DateTime<Utc>) -> DateTime<Utc> {
    ts.and_then(|t| DateTime::<Utc>::from_timestamp_millis(t.timestamp_millis()))
        .unwrap_or(now)
}

/// Maps a raw document onto a [`Task`], defaulting whatever is missing.
fn to_task(record: TaskRecord, now: DateTime<Utc>) -> Task {
    Task {
        id: record.id,
        title: record.title.unwrap_or_default(),
        description: record.description.filter(|d| !d.trim().is_empty()),
        is_done: record.is_done.unwrap_or(false),
        created_at: from_bson_time(record.created_at, now),
        updated_at: from_bson_time(record.updated_at, now),
        user_id: record.user_id.unwrap_or_default(),
        owner_email: record.owner_email.unwrap_or_default(),
        shared_with: record.shared_with.unwrap_or_default(),
    }
}

fn to_tasks(records: Vec<TaskRecord>) -> Vec<Task> {
    let now = Utc::now();
    records.into_iter().map(|r| to_task(r, now)).collect()
}

impl TaskRepository {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        TaskRepository { store }
    }

    pub async fn list_owned(&self, user_id: &str) -> TaskResult<Vec<Task>> {
        if user_id.is_empty() {
            return Err(TaskError::Validation("User ID is required".to_string()));
        }
        let records = self.store.find_by_owner(user_id).await.map_err(|e| {
            error!("Error fetching tasks owned by {}: {}", user_id, e);
            e
        })?;
        debug!("Fetched {} owned tasks for {}", records.len(), user_id);
        Ok(to_tasks(records))
    }

    /// Tasks whose `sharedWith` holds a grant for `email` under any role.
    pub async fn list_shared_with(&self, email: &str) -> TaskResult<Vec<Task>> {
        if email.is_empty() {
            return Err(TaskError::Validation("Email is required".to_string()));
        }
        let records = self
            .store
            .find_shared_with(email, &Role::ALL)
            .await
            .map_err(|e| {
                error!("Error fetching tasks shared with {}: {}", email, e);
                e
            })?;
        debug!("Fetched {} tasks shared with {}", records.len(), email);
        Ok(to_tasks(records))
    }

    pub async fn get(&self, id: &str) -> TaskResult<Option<Task>> {
        let record = self.store.find_by_id(id).await?;
        Ok(record.map(|r| to_task(r, Utc::now())))
    }

    pub async fn create(&self, task: NewTask) -> TaskResult<String> {
        let now = to_bson_time(Utc::now());
        let record = TaskRecord {
            id: String::new(),
            title: Some(task.title),
            description: task.description,
            is_done: Some(task.is_done),
            created_at: Some(now),
            updated_at: Some(now),
            user_id: Some(task.user_id),
            owner_email: Some(task.owner_email),
            shared_with: Some(task.shared_with.unwrap_or_default()),
        };
        let id = self.store.insert(record).await.map_err(|e| {
            error!("Error creating task: {}", e);
            e
        })?;
        info!("Task created {}", id);
        Ok(id)
    }

    /// Merges the supplied fields and refreshes `updatedAt`.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> TaskResult<()> {
        let fields = TaskRecord {
            title: patch.title,
            description: patch.description,
            is_done: patch.is_done,
            updated_at: Some(to_bson_time(Utc::now())),
            ..TaskRecord::default()
        };
        if self.store.merge_fields(id, fields).await? {
            debug!("Task updated {}", id);
            Ok(())
        } else {
            Err(TaskError::NotFound("Task not found".to_string()))
        }
    }

    /// Removes the task. A missing id is reported as `NotFound`.
    pub async fn delete(&self, id: &str) -> TaskResult<()> {
        if self.store.delete(id).await? {
            info!("Task deleted {}", id);
            Ok(())
        } else {
            Err(TaskError::NotFound("Task not found or already deleted".to_string()))
        }
    }
}
