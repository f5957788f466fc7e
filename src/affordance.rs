//! Edit affordance of a single task: `Viewing` or `EditingInline`.

use crate::error::{TaskError, TaskResult};
use crate::models::{Task, TaskPatch};
use crate::view::Permissions;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Viewing,
    EditingInline {
        draft_title: String,
        draft_description: String,
    },
}

impl EditState {
    /// `Viewing -> EditingInline`, seeding the drafts from the task.
    /// Requires `can_edit`; completed tasks are not editable.
    pub fn start_edit(&mut self, task: &Task, permissions: Permissions) -> TaskResult<()> {
        if !permissions.can_edit {
            return Err(TaskError::Forbidden(
                "You do not have permission to edit this task".to_string(),
            ));
        }
        if task.is_done {
            return Err(TaskError::Forbidden(
                "Completed tasks cannot be edited".to_string(),
            ));
        }
        if matches!(self, EditState::Viewing) {
            *self = EditState::EditingInline {
                draft_title: task.title.clone(),
                draft_description: task.description.clone().unwrap_or_default(),
            };
        }
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) {
        if let EditState::EditingInline { draft_title, .. } = self {
            *draft_title = title.to_string();
        }
    }

    pub fn set_description(&mut self, description: &str) {
        if let EditState::EditingInline {
            draft_description, ..
        } = self
        {
            *draft_description = description.to_string();
        }
    }

    /// `EditingInline -> Viewing`, yielding the update to send. An empty
    /// trimmed title keeps the state unchanged and fails.
    pub fn save(&mut self) -> TaskResult<TaskPatch> {
        let EditState::EditingInline {
            draft_title,
            draft_description,
        } = self
        else {
            return Err(TaskError::Validation("Task is not being edited".to_string()));
        };
        let title = draft_title.trim();
        if title.is_empty() {
            return Err(TaskError::Validation("Task title cannot be empty".to_string()));
        }
        let patch = TaskPatch {
            title: Some(title.to_string()),
            description: Some(draft_description.trim().to_string()),
            is_done: None,
        };
        *self = EditState::Viewing;
        Ok(patch)
    }

    /// Drops the drafts without producing an update.
    pub fn cancel(&mut self) {
        *self = EditState::Viewing;
    }

    /// Completion toggle is a one-shot action from `Viewing` only.
    pub fn can_toggle(&self, permissions: Permissions) -> bool {
        matches!(self, EditState::Viewing) && permissions.can_toggle
    }
}
