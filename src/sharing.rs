// src/sharing.rs

use std::sync::{Arc, OnceLock};

use log::{debug, info, warn};
use regex::Regex;

use crate::error::{TaskError, TaskResult};
use crate::models::{normalize_email, Role, SharedWith};
use crate::store::TaskStore;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

/// Maintains the `sharedWith` grants of a task. At most one grant per email.
#[derive(Clone)]
pub struct SharingService {
    store: Arc<dyn TaskStore>,
}

impl SharingService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        SharingService { store }
    }

    /// Grants `role` on the task to `collaborator_email`. Any grants the
    /// collaborator already holds, under any casing of the email, collapse
    /// into a single entry carrying the new role.
    pub async fn share(
        &self,
        task_id: &str,
        owner_email: &str,
        collaborator_email: &str,
        role: Role,
    ) -> TaskResult<()> {
        let collaborator = normalize_email(collaborator_email);
        if collaborator.is_empty() {
            return Err(TaskError::Validation("Email is required".to_string()));
        }
        if !email_pattern().is_match(&collaborator) {
            return Err(TaskError::Validation("Please enter a valid email".to_string()));
        }
        if collaborator == normalize_email(owner_email) {
            return Err(TaskError::Validation(
                "You cannot share a task with yourself".to_string(),
            ));
        }

        let grant = SharedWith::new(collaborator, role);
        if !self.store.upsert_grant(task_id, &grant).await? {
            warn!("Share of missing task {} requested", task_id);
            return Err(TaskError::NotFound("Task not found".to_string()));
        }
        info!("Task {} shared with {} as {}", task_id, grant.email, role.as_str());
        Ok(())
    }

    /// Revokes every grant held by `collaborator_email` on the task.
    pub async fn unshare(&self, task_id: &str, collaborator_email: &str) -> TaskResult<()> {
        let collaborator = normalize_email(collaborator_email);
        if self.store.find_by_id(task_id).await?.is_none() {
            return Err(TaskError::NotFound("Task not found".to_string()));
        }
        if !self.store.remove_grants(task_id, &collaborator).await? {
            return Err(TaskError::NotFound("User not found in shared list".to_string()));
        }
        info!("Task {} no longer shared with {}", task_id, collaborator);
        Ok(())
    }

    /// Live grants for display. A missing task has none.
    pub async fn current_grants(&self, task_id: &str) -> TaskResult<Vec<SharedWith>> {
        let grants = match self.store.find_by_id(task_id).await? {
            Some(record) => record.shared_with.unwrap_or_default(),
            None => {
                debug!("Grants requested for missing task {}", task_id);
                Vec::new()
            }
        };
        Ok(grants)
    }
}
