use crate::{
    auth::AuthUser,
    error::AppError,
    models::{
        ChecklistToggle, ShiftQuery, Task, TaskAnalytics, TaskFilter, TaskInput, TaskListQuery,
        TaskStage, TaskUpdate,
    },
    routes::{require_task, require_user},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use chrono::Local;
use futures::future::try_join;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Creates a new task owned by the authenticated caller.
///
/// ## Request Body:
/// A JSON object matching `TaskInput`:
/// - `stage`: lifecycle stage (`backlog`, `todo`, `progress`, `done`).
/// - `priority`: `high`, `moderate`, or `low`.
/// - `title`: the title of the task (1-200 characters).
/// - `assigned_to` (optional): email of the delegate.
/// - `due_date` (optional): due timestamp.
/// - `checklist`: list of `{task, checked}` items; ids are assigned here.
///
/// ## Responses:
/// - `201 Created`: `{"message": "Task created successfully!"}`.
/// - `400 Bad Request`: malformed body or missing required fields.
/// - `401 Unauthorized`: missing or invalid session token.
/// - `422 Unprocessable Entity`: field validation failed.
#[post("/create")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    // Validate input
    task_data.validate()?;

    let user = require_user(&pool, auth.user_id).await?;
    let task = Task::new(task_data.into_inner(), user.id);

    sqlx::query(
        "INSERT INTO tasks (id, user_id, stage, priority, title, assigned_to, due_date, \
                            checklist, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(task.id)
    .bind(task.user_id)
    .bind(task.stage)
    .bind(task.priority)
    .bind(&task.title)
    .bind(&task.assigned_to)
    .bind(task.due_date)
    .bind(&task.checklist)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(json!({ "message": "Task created successfully!" })))
}

/// Retrieves the tasks visible to the caller within a creation-date window.
///
/// Visible means owned by the caller or assigned to the caller's email.
/// Tasks are ordered by creation date, newest first.
///
/// ## Query Parameters:
/// - `filter` (required): `today` (since local midnight), `week` (last 7
///   days), or `month` (last calendar month). Anything else is a 400.
///
/// ## Responses:
/// - `200 OK`: a JSON array of `Task` objects.
/// - `400 Bad Request`: missing or unrecognized `filter` value.
/// - `401 Unauthorized`: missing or invalid session token.
#[get("")]
pub async fn get_user_tasks(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    query_params: web::Query<TaskListQuery>,
) -> Result<impl Responder, AppError> {
    let filter = query_params
        .filter
        .as_deref()
        .and_then(TaskFilter::parse)
        .ok_or_else(|| AppError::BadRequest("Invalid period specified".into()))?;

    let user = require_user(&pool, auth.user_id).await?;
    let window_start = filter.window_start(Local::now());

    let tasks = sqlx::query_as::<_, Task>(
        "SELECT id, user_id, stage, priority, title, assigned_to, due_date, checklist, \
                created_at, updated_at \
         FROM tasks \
         WHERE (user_id = $1 OR assigned_to = $2) \
           AND created_at >= $3 AND created_at <= now() \
         ORDER BY created_at DESC",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(window_start)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Tallies the caller's visible tasks by priority and stage, plus how many
/// carry a due date.
///
/// ## Responses:
/// - `200 OK`: `{"priority": {"low", "moderate", "high"},
///   "status": {"backlog", "todo", "progress", "done"}, "dueDateTasks"}`.
/// - `401 Unauthorized`: missing or invalid session token.
#[get("/analytics")]
pub async fn task_analytics(
    pool: web::Data<PgPool>,
    auth: AuthUser,
) -> Result<impl Responder, AppError> {
    let user = require_user(&pool, auth.user_id).await?;

    let tasks = sqlx::query_as::<_, Task>(
        "SELECT id, user_id, stage, priority, title, assigned_to, due_date, checklist, \
                created_at, updated_at \
         FROM tasks \
         WHERE user_id = $1 OR assigned_to = $2",
    )
    .bind(user.id)
    .bind(&user.email)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(TaskAnalytics::tally(&tasks)))
}

/// Retrieves a single task by id.
///
/// This route is deliberately unauthenticated and performs no ownership
/// check; task ids are unguessable UUIDs shared between collaborators.
///
/// ## Responses:
/// - `200 OK`: the `Task` object.
/// - `404 Not Found`: no task with the given id.
#[get("/{task_id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = require_task(&pool, task_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Applies a partial update to a task.
///
/// Only the owner or the assignee may edit. Fields absent from the body are
/// left untouched; `assigned_to: null` clears the assignment; a replacement
/// checklist may carry item ids to preserve existing entries.
///
/// ## Responses:
/// - `200 OK`: a message plus the updated `Task`.
/// - `401 Unauthorized`: missing or invalid session token.
/// - `403 Forbidden`: caller is neither owner nor assignee.
/// - `404 Not Found`: unknown task.
/// - `422 Unprocessable Entity`: field validation failed.
#[patch("/edit/{task_id}")]
pub async fn edit_task(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    task_id: web::Path<Uuid>,
    update_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    update_data.validate()?;

    let (user, mut task) = try_join(
        require_user(&pool, auth.user_id),
        require_task(&pool, task_id.into_inner()),
    )
    .await?;

    if !task.can_be_managed_by(&user) {
        return Err(AppError::Forbidden(
            "You are not authorized to edit this task".into(),
        ));
    }

    task.apply_update(update_data.into_inner());

    let updated = sqlx::query_as::<_, Task>(
        "UPDATE tasks \
         SET stage = $1, priority = $2, title = $3, assigned_to = $4, due_date = $5, \
             checklist = $6, updated_at = now() \
         WHERE id = $7 \
         RETURNING id, user_id, stage, priority, title, assigned_to, due_date, checklist, \
                   created_at, updated_at",
    )
    .bind(task.stage)
    .bind(task.priority)
    .bind(&task.title)
    .bind(&task.assigned_to)
    .bind(task.due_date)
    .bind(&task.checklist)
    .bind(task.id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Task updated successfully!",
        "task": updated,
    })))
}

/// Moves a task to another lifecycle stage.
///
/// The target stage arrives in the `filter` query parameter (a name kept for
/// compatibility with existing clients) and is validated against the stage
/// enumeration. Only the owner or the assignee may shift.
///
/// ## Responses:
/// - `200 OK`: `{"message": "Task updated successfully!"}`.
/// - `400 Bad Request`: missing or unrecognized stage value.
/// - `401 Unauthorized`: missing or invalid session token.
/// - `403 Forbidden`: caller is neither owner nor assignee.
/// - `404 Not Found`: unknown task.
#[patch("/shift/{task_id}")]
pub async fn shift_task(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    task_id: web::Path<Uuid>,
    query_params: web::Query<ShiftQuery>,
) -> Result<impl Responder, AppError> {
    let stage = query_params
        .filter
        .as_deref()
        .and_then(TaskStage::parse)
        .ok_or_else(|| AppError::BadRequest("Invalid task stage specified".into()))?;

    let (user, task) = try_join(
        require_user(&pool, auth.user_id),
        require_task(&pool, task_id.into_inner()),
    )
    .await?;

    if !task.can_be_managed_by(&user) {
        return Err(AppError::Forbidden(
            "You are not authorized to update this task!".into(),
        ));
    }

    sqlx::query("UPDATE tasks SET stage = $1, updated_at = now() WHERE id = $2")
        .bind(stage)
        .bind(task.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Task updated successfully!" })))
}

/// Deletes a task.
///
/// Only the owner or the assignee may delete.
///
/// ## Responses:
/// - `200 OK`: `{"message": "Task deleted successfully!"}`.
/// - `401 Unauthorized`: missing or invalid session token.
/// - `403 Forbidden`: caller is neither owner nor assignee.
/// - `404 Not Found`: unknown task.
#[delete("/{task_id}")]
pub async fn delete_single_task(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let (user, task) = try_join(
        require_user(&pool, auth.user_id),
        require_task(&pool, task_id.into_inner()),
    )
    .await?;

    if !task.can_be_managed_by(&user) {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this task!".into(),
        ));
    }

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Task deleted successfully!" })))
}

/// Sets the `checked` flag of one checklist item, identified by its id,
/// leaving the other items unchanged.
///
/// ## Request Body:
/// `{"data": <bool>}`, the new state for the targeted item.
///
/// ## Responses:
/// - `200 OK`: `{"message": "Task updated successfully"}`.
/// - `401 Unauthorized`: missing or invalid session token.
/// - `403 Forbidden`: caller is neither owner nor assignee.
/// - `404 Not Found`: unknown task or checklist item.
#[patch("/{task_id}/{check_id}")]
pub async fn update_checklist_task(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
    toggle: web::Json<ChecklistToggle>,
) -> Result<impl Responder, AppError> {
    let (task_id, check_id) = path.into_inner();

    let (user, mut task) = try_join(
        require_user(&pool, auth.user_id),
        require_task(&pool, task_id),
    )
    .await?;

    if !task.can_be_managed_by(&user) {
        return Err(AppError::Forbidden(
            "You are not authorized to update this task!".into(),
        ));
    }

    if !task.set_checklist_item(check_id, toggle.data) {
        return Err(AppError::NotFound("Checklist item not found!".into()));
    }

    sqlx::query("UPDATE tasks SET checklist = $1, updated_at = now() WHERE id = $2")
        .bind(&task.checklist)
        .bind(task.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Task updated successfully" })))
}
