use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Every failure the task core can surface to its caller.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Bad or missing input, detected before any I/O.
    #[error("{0}")]
    Validation(String),

    /// The referenced task or grant does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The session lacks the capability for this action.
    #[error("{0}")]
    Forbidden(String),

    #[error("Unauthorized")]
    Unauthenticated,

    /// The document store or identity provider failed or rejected the call.
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type TaskResult<T> = Result<T, TaskError>;

impl TaskError {
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Validation(_) => "validation",
            TaskError::NotFound(_) => "not_found",
            TaskError::Forbidden(_) => "forbidden",
            TaskError::Unauthenticated => "unauthenticated",
            TaskError::Backend(_) => "backend",
        }
    }
}

impl From<mongodb::error::Error> for TaskError {
    fn from(err: mongodb::error::Error) -> Self {
        TaskError::Backend(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for TaskError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        TaskError::Backend(format!("Malformed task document: {}", err))
    }
}

impl From<mongodb::bson::ser::Error> for TaskError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        TaskError::Backend(format!("Error serializing task document: {}", err))
    }
}

impl ResponseError for TaskError {
    fn status_code(&self) -> StatusCode {
        match self {
            TaskError::Validation(_) => StatusCode::BAD_REQUEST,
            TaskError::NotFound(_) => StatusCode::NOT_FOUND,
            TaskError::Forbidden(_) => StatusCode::FORBIDDEN,
            TaskError::Unauthenticated => StatusCode::UNAUTHORIZED,
            TaskError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}
