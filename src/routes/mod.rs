pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Task, User};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::register)
            .service(auth::login)
            .service(auth::logout),
    )
    .service(
        web::scope("/user")
            .service(users::update_user)
            .service(users::assign_people),
    )
    .service(
        // Literal segments before the catch-all `{task_id}` routes.
        web::scope("/task")
            .service(tasks::create_task)
            .service(tasks::get_user_tasks)
            .service(tasks::task_analytics)
            .service(tasks::edit_task)
            .service(tasks::shift_task)
            .service(tasks::get_task)
            .service(tasks::delete_single_task)
            .service(tasks::update_checklist_task),
    );
}

/// Loads the caller's user record, failing with 404 when the account behind a
/// still-valid token no longer exists.
pub(crate) async fn require_user(pool: &PgPool, user_id: i32) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, assignees, created_at, updated_at \
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found!".into()))
}

pub(crate) async fn find_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, assignees, created_at, updated_at \
         FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub(crate) async fn require_task(pool: &PgPool, task_id: Uuid) -> Result<Task, AppError> {
    sqlx::query_as::<_, Task>(
        "SELECT id, user_id, stage, priority, title, assigned_to, due_date, checklist, \
                created_at, updated_at \
         FROM tasks WHERE id = $1",
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Task not found!".into()))
}
