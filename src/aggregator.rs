// src/aggregator.rs

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::affordance::EditState;
use crate::error::{TaskError, TaskResult};
use crate::models::{NewTask, Role, SharedWith, Task, TaskPatch};
use crate::repository::TaskRepository;
use crate::session::Session;
use crate::sharing::SharingService;
use crate::store::TaskStore;
use crate::view::{merge_and_sort, AnnotatedTask, Permissions, TaskBoard};

/// Result of a share or unshare: the refreshed board and the task's live grants.
#[derive(Debug, Clone, Serialize)]
pub struct SharingOutcome {
    pub board: TaskBoard,
    pub grants: Vec<SharedWith>,
}

/// Resolves user intents into repository and sharing calls, then rebuilds
/// the session's board from the store after every successful mutation.
#[derive(Clone)]
pub struct TaskAggregator {
    repository: TaskRepository,
    sharing: SharingService,
}

impl TaskAggregator {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        TaskAggregator {
            repository: TaskRepository::new(store.clone()),
            sharing: SharingService::new(store),
        }
    }

    /// Owned and shared-with-me tasks, fetched concurrently.
    pub async fn board(&self, session: &Session) -> TaskResult<TaskBoard> {
        let (owned, shared) = futures::try_join!(
            self.repository.list_owned(&session.user_id),
            self.repository.list_shared_with(&session.email),
        )?;
        debug!(
            "Board for {}: {} owned, {} shared",
            session.user_id,
            owned.len(),
            shared.len()
        );
        Ok(merge_and_sort(owned, shared, &session.email))
    }

    /// The task with the session's capabilities. Tasks the session has no
    /// relation to are reported as missing.
    async fn load(&self, session: &Session, task_id: &str) -> TaskResult<(Task, Permissions)> {
        let not_found = || TaskError::NotFound("Task not found".to_string());
        let task = self.repository.get(task_id).await?.ok_or_else(not_found)?;
        match Permissions::for_session(&task, session) {
            Some(permissions) => Ok((task, permissions)),
            None => {
                warn!("{} has no access to task {}", session.user_id, task_id);
                Err(not_found())
            }
        }
    }

    async fn ensure_owner(&self, session: &Session, task_id: &str, action: &str) -> TaskResult<()> {
        let (_, permissions) = self.load(session, task_id).await?;
        if !permissions.can_share {
            return Err(TaskError::Forbidden(format!("Only the owner can {}", action)));
        }
        Ok(())
    }

    pub async fn task(&self, session: &Session, task_id: &str) -> TaskResult<AnnotatedTask> {
        let (task, permissions) = self.load(session, task_id).await?;
        let shared_by = if task.is_owned_by(&session.user_id) {
            None
        } else {
            Some(task.owner_email.clone())
        };
        Ok(AnnotatedTask {
            task,
            permissions,
            shared_by,
        })
    }

    pub async fn add(
        &self,
        session: &Session,
        title: &str,
        description: Option<&str>,
    ) -> TaskResult<TaskBoard> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::Validation("Task title cannot be empty".to_string()));
        }
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        self.repository
            .create(NewTask {
                title: title.to_string(),
                description,
                is_done: false,
                user_id: session.user_id.clone(),
                owner_email: session.email.clone(),
                shared_with: None,
            })
            .await?;
        self.board(session).await
    }

    /// Saves an inline edit. `description: None` keeps the current one.
    pub async fn edit(
        &self,
        session: &Session,
        task_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> TaskResult<TaskBoard> {
        let (task, permissions) = self.load(session, task_id).await?;

        let mut state = EditState::default();
        state.start_edit(&task, permissions)?;
        state.set_title(title);
        if let Some(description) = description {
            state.set_description(description);
        }
        let patch = state.save()?;

        self.repository.update(task_id, patch).await?;
        info!("Task {} edited by {}", task_id, session.user_id);
        self.board(session).await
    }

    /// Flips completion based on the stored value, not the caller's view.
    pub async fn toggle(&self, session: &Session, task_id: &str) -> TaskResult<TaskBoard> {
        let (task, permissions) = self.load(session, task_id).await?;
        if !EditState::Viewing.can_toggle(permissions) {
            return Err(TaskError::Forbidden(
                "You do not have permission to complete this task".to_string(),
            ));
        }
        self.repository
            .update(
                task_id,
                TaskPatch {
                    is_done: Some(!task.is_done),
                    ..TaskPatch::default()
                },
            )
            .await?;
        self.board(session).await
    }

    pub async fn delete(&self, session: &Session, task_id: &str) -> TaskResult<TaskBoard> {
        let (_, permissions) = self.load(session, task_id).await?;
        if !permissions.can_delete {
            return Err(TaskError::Forbidden("Only the owner can delete this task".to_string()));
        }
        self.repository.delete(task_id).await?;
        self.board(session).await
    }

    pub async fn share(
        &self,
        session: &Session,
        task_id: &str,
        email: &str,
        role: Role,
    ) -> TaskResult<SharingOutcome> {
        self.ensure_owner(session, task_id, "share this task").await?;
        self.sharing.share(task_id, &session.email, email, role).await?;
        self.sharing_outcome(session, task_id).await
    }

    pub async fn unshare(
        &self,
        session: &Session,
        task_id: &str,
        email: &str,
    ) -> TaskResult<SharingOutcome> {
        self.ensure_owner(session, task_id, "remove access to this task").await?;
        self.sharing.unshare(task_id, email).await?;
        self.sharing_outcome(session, task_id).await
    }

    pub async fn grants(&self, session: &Session, task_id: &str) -> TaskResult<Vec<SharedWith>> {
        self.ensure_owner(session, task_id, "view who this task is shared with")
            .await?;
        self.sharing.current_grants(task_id).await
    }

    async fn sharing_outcome(&self, session: &Session, task_id: &str) -> TaskResult<SharingOutcome> {
        let grants = self.sharing.current_grants(task_id).await?;
        let board = self.board(session).await?;
        Ok(SharingOutcome { board, grants })
    }
}
