//! Document-store seam for the `tasks` collection.
//!
//! Stores speak in [`TaskRecord`]s, the loosely-typed document shape. Mapping
//! to [`crate::models::Task`] happens in the repository, never here.

mod memory;
mod mongo;

use async_trait::async_trait;

use crate::error::TaskResult;
use crate::models::{Role, SharedWith, TaskRecord};

pub use memory::InMemoryTaskStore;
pub use mongo::MongoTaskStore;

pub const TASKS_COLLECTION: &str = "tasks";

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All documents whose `userId` equals `user_id`.
    async fn find_by_owner(&self, user_id: &str) -> TaskResult<Vec<TaskRecord>>;

    /// All documents whose `sharedWith` list holds an element for `email`
    /// whose role is one of `roles`. Emails match ignoring case and
    /// surrounding whitespace.
    async fn find_shared_with(&self, email: &str, roles: &[Role]) -> TaskResult<Vec<TaskRecord>>;

    async fn find_by_id(&self, id: &str) -> TaskResult<Option<TaskRecord>>;

    /// Inserts a document and returns the identifier the store assigned.
    async fn insert(&self, record: TaskRecord) -> TaskResult<String>;

    /// Writes every `Some` field of `fields` onto the document. Returns `false`
    /// when no document has this id.
    async fn merge_fields(&self, id: &str, fields: TaskRecord) -> TaskResult<bool>;

    /// Returns `false` when no document has this id.
    async fn delete(&self, id: &str) -> TaskResult<bool>;

    /// Replaces every element for `grant.email` with the single `grant`,
    /// appended at the end. Returns `false` when no document has this id.
    async fn upsert_grant(&self, id: &str, grant: &SharedWith) -> TaskResult<bool>;

    /// Removes every element for `email`. Returns `false` when nothing was
    /// removed.
    async fn remove_grants(&self, id: &str, email: &str) -> TaskResult<bool>;
}
