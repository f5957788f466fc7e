//! View models handed to the presentation boundary: merged, sorted,
//! permission-annotated task lists.

use serde::Serialize;

use crate::models::{Role, Task};
use crate::session::Session;

/// What the viewing session may do with one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_edit: bool,
    pub can_toggle: bool,
    pub can_delete: bool,
    pub can_share: bool,
}

impl Permissions {
    pub const OWNER: Permissions = Permissions {
        can_edit: true,
        can_toggle: true,
        can_delete: true,
        can_share: true,
    };

    /// Collaborator capabilities. The role gates edit and completion toggle
    /// identically; collaborators never delete or reshare.
    pub fn for_grant(role: Option<Role>) -> Self {
        let can_edit = role == Some(Role::Admin);
        Permissions {
            can_edit,
            can_toggle: can_edit,
            can_delete: false,
            can_share: false,
        }
    }

    /// `None` when the session neither owns the task nor holds a grant on it.
    pub fn for_session(task: &Task, session: &Session) -> Option<Self> {
        if task.is_owned_by(&session.user_id) {
            return Some(Permissions::OWNER);
        }
        task.grant_for(&session.email)
            .map(|grant| Permissions::for_grant(Some(grant.role)))
    }
}

/// A task together with the viewer's capabilities.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedTask {
    #[serde(flatten)]
    pub task: Task,
    pub permissions: Permissions,
    /// Owner email, present only on tasks shared with the viewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_by: Option<String>,
}

/// One row of a rendered list. `number` is its 1-based position in this
/// rendering only and identifies nothing across renders.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub number: usize,
    #[serde(flatten)]
    pub item: AnnotatedTask,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskList {
    /// Count of incomplete tasks.
    pub pending: usize,
    pub tasks: Vec<TaskView>,
}

impl TaskList {
    fn build(items: Vec<AnnotatedTask>) -> Self {
        let pending = items.iter().filter(|i| !i.task.is_done).count();
        let tasks = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| TaskView {
                number: index + 1,
                item,
            })
            .collect();
        TaskList { pending, tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Everything one session sees: its own tasks and those shared with it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskBoard {
    pub owned: TaskList,
    pub shared: TaskList,
}

/// Incomplete before completed, then newest `createdAt` first.
///
/// Tasks with identical `createdAt` and completion keep the order the store
/// returned them in, which the store does not define.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.is_done
            .cmp(&b.is_done)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

pub fn merge_and_sort(mut owned: Vec<Task>, mut shared: Vec<Task>, viewer_email: &str) -> TaskBoard {
    sort_tasks(&mut owned);
    sort_tasks(&mut shared);

    let owned = owned
        .into_iter()
        .map(|task| AnnotatedTask {
            task,
            permissions: Permissions::OWNER,
            shared_by: None,
        })
        .collect();
    let shared = shared
        .into_iter()
        .map(|task| {
            let role = task.grant_for(viewer_email).map(|grant| grant.role);
            let shared_by = Some(task.owner_email.clone());
            AnnotatedTask {
                task,
                permissions: Permissions::for_grant(role),
                shared_by,
            }
        })
        .collect();

    TaskBoard {
        owned: TaskList::build(owned),
        shared: TaskList::build(shared),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SharedWith;
    use chrono::{Duration, Utc};

    fn task(id: &str, is_done: bool, age_minutes: i64, shared_with: Vec<SharedWith>) -> Task {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        Task {
            id: id.to_string(),
            title: format!("Task {id}"),
            description: None,
            is_done,
            created_at,
            updated_at: created_at,
            user_id: "alice".to_string(),
            owner_email: "alice@example.com".to_string(),
            shared_with,
        }
    }

    fn ids(list: &TaskList) -> Vec<&str> {
        list.tasks.iter().map(|v| v.item.task.id.as_str()).collect()
    }

    #[test]
    fn incomplete_first_then_newest_first() {
        let owned = vec![
            task("old-done", true, 50, vec![]),
            task("old-open", false, 40, vec![]),
            task("new-done", true, 5, vec![]),
            task("new-open", false, 1, vec![]),
            task("mid-open", false, 20, vec![]),
        ];
        let board = merge_and_sort(owned, vec![], "alice@example.com");
        assert_eq!(
            ids(&board.owned),
            vec!["new-open", "mid-open", "old-open", "new-done", "old-done"]
        );

        let tasks: Vec<&Task> = board.owned.tasks.iter().map(|v| &v.item.task).collect();
        for pair in tasks.windows(2) {
            assert!(!(pair[0].is_done && !pair[1].is_done));
            if pair[0].is_done == pair[1].is_done {
                assert!(pair[0].created_at >= pair[1].created_at);
            }
        }
    }

    #[test]
    fn numbering_is_positional_and_pending_counts_open_tasks() {
        let owned = vec![
            task("a", true, 3, vec![]),
            task("b", false, 2, vec![]),
            task("c", false, 1, vec![]),
        ];
        let board = merge_and_sort(owned, vec![], "alice@example.com");
        let numbers: Vec<usize> = board.owned.tasks.iter().map(|v| v.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(board.owned.pending, 2);
        assert_eq!(board.owned.tasks[0].item.task.id, "c");
    }

    #[test]
    fn owned_tasks_carry_full_permissions() {
        let board = merge_and_sort(vec![task("a", false, 1, vec![])], vec![], "alice@example.com");
        let item = &board.owned.tasks[0].item;
        assert_eq!(item.permissions, Permissions::OWNER);
        assert!(item.shared_by.is_none());
    }

    #[test]
    fn shared_permissions_follow_the_viewer_role() {
        let shared = vec![
            task("viewer", false, 2, vec![SharedWith::new("bob@example.com", Role::User)]),
            task("editor", false, 1, vec![SharedWith::new("bob@example.com", Role::Admin)]),
        ];
        let board = merge_and_sort(vec![], shared, "bob@example.com");
        assert_eq!(board.shared.len(), 2);

        let editor = &board.shared.tasks[0].item;
        assert_eq!(editor.task.id, "editor");
        assert!(editor.permissions.can_edit);
        assert!(editor.permissions.can_toggle);
        assert!(!editor.permissions.can_delete);
        assert!(!editor.permissions.can_share);
        assert_eq!(editor.shared_by.as_deref(), Some("alice@example.com"));

        let viewer = &board.shared.tasks[1].item;
        assert_eq!(viewer.task.id, "viewer");
        assert!(!viewer.permissions.can_edit);
        assert!(!viewer.permissions.can_toggle);
        assert!(!viewer.permissions.can_delete);
    }

    #[test]
    fn session_without_relation_gets_no_permissions() {
        let t = task("a", false, 1, vec![SharedWith::new("bob@example.com", Role::User)]);
        assert_eq!(
            Permissions::for_session(&t, &Session::new("alice", "alice@example.com")),
            Some(Permissions::OWNER)
        );
        assert_eq!(
            Permissions::for_session(&t, &Session::new("bob", "bob@example.com")),
            Some(Permissions::for_grant(Some(Role::User)))
        );
        assert_eq!(
            Permissions::for_session(&t, &Session::new("carol", "carol@example.com")),
            None
        );
    }

    #[test]
    fn views_serialize_flat() {
        let board = merge_and_sort(vec![task("a", false, 1, vec![])], vec![], "alice@example.com");
        let json = serde_json::to_value(&board).unwrap();
        let row = &json["owned"]["tasks"][0];
        assert_eq!(row["number"], 1);
        assert_eq!(row["id"], "a");
        assert_eq!(row["isDone"], false);
        assert_eq!(row["permissions"]["canDelete"], true);
        assert!(row.get("sharedBy").is_none());
        assert_eq!(json["owned"]["pending"], 1);
    }
}
