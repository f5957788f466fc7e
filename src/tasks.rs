// src/tasks.rs

use actix_web::{web, HttpResponse};
use log::debug;

use crate::app_state::AppState;
use crate::error::TaskError;
use crate::models::{CreateTaskRequest, ShareTaskRequest, UpdateTaskRequest};
use crate::session::Session;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health)).service(
        web::scope("/tasks")
            .route("", web::get().to(list_tasks))
            .route("", web::post().to(create_task))
            .service(
                web::scope("/{task_id}")
                    .route("", web::get().to(get_task))
                    .route("", web::put().to(update_task))
                    .route("", web::delete().to(delete_task))
                    .route("/toggle", web::post().to(toggle_task))
                    .service(
                        web::scope("/shares")
                            .route("", web::get().to(list_shares))
                            .route("", web::post().to(share_task))
                            .route("/{email}", web::delete().to(unshare_task)),
                    ),
            ),
    );
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

/// GET /tasks
/// The caller's own tasks and the tasks shared with them.
pub async fn list_tasks(
    session: Session,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TaskError> {
    let board = data.tasks.board(&session).await?;
    Ok(HttpResponse::Ok().json(board))
}

/// POST /tasks
pub async fn create_task(
    session: Session,
    data: web::Data<AppState>,
    payload: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, TaskError> {
    debug!("create_task for {} with payload {:?}", session.user_id, payload);
    let board = data
        .tasks
        .add(&session, &payload.title, payload.description.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(board))
}

/// GET /tasks/{task_id}
pub async fn get_task(
    session: Session,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, TaskError> {
    let task = data.tasks.task(&session, &task_id).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// PUT /tasks/{task_id}
pub async fn update_task(
    session: Session,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    payload: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, TaskError> {
    debug!("update_task {} with payload {:?}", task_id, payload);
    let board = data
        .tasks
        .edit(
            &session,
            &task_id,
            &payload.title,
            payload.description.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(board))
}

/// POST /tasks/{task_id}/toggle
pub async fn toggle_task(
    session: Session,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, TaskError> {
    let board = data.tasks.toggle(&session, &task_id).await?;
    Ok(HttpResponse::Ok().json(board))
}

/// DELETE /tasks/{task_id}
pub async fn delete_task(
    session: Session,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, TaskError> {
    let board = data.tasks.delete(&session, &task_id).await?;
    Ok(HttpResponse::Ok().json(board))
}

/// GET /tasks/{task_id}/shares
pub async fn list_shares(
    session: Session,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, TaskError> {
    let grants = data.tasks.grants(&session, &task_id).await?;
    Ok(HttpResponse::Ok().json(grants))
}

/// POST /tasks/{task_id}/shares
pub async fn share_task(
    session: Session,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    payload: web::Json<ShareTaskRequest>,
) -> Result<HttpResponse, TaskError> {
    debug!("share_task {} with payload {:?}", task_id, payload);
    let outcome = data
        .tasks
        .share(&session, &task_id, &payload.email, payload.role)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// DELETE /tasks/{task_id}/shares/{email}
pub async fn unshare_task(
    session: Session,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, TaskError> {
    let (task_id, email) = path.into_inner();
    let outcome = data.tasks.unshare(&session, &task_id, &email).await?;
    Ok(HttpResponse::Ok().json(outcome))
}
