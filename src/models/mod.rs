pub mod task;

pub use task::{
    normalize_email, CreateTaskRequest, NewTask, Role, ShareTaskRequest, SharedWith, Task,
    TaskPatch, TaskRecord, UpdateTaskRequest,
};
