use crate::{
    auth::{hash_password, verify_password, AuthUser},
    error::AppError,
    models::{AssignRequest, UpdateUserRequest, User, UserProfile},
    routes::{find_user_by_email, require_user},
};
use actix_web::{put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::types::Json;
use sqlx::PgPool;
use validator::Validate;

/// Partially updates the caller's account.
///
/// Username and email apply independently when present; an email change is
/// checked for uniqueness first. A password change requires both
/// `old_password` and `new_password`, and the old one must verify against the
/// stored hash.
///
/// ## Responses:
/// - `200 OK`: `{"message": "Updated successfully!"}`.
/// - `400 Bad Request`: duplicate email or incorrect old password.
/// - `401 Unauthorized`: missing or invalid session token.
/// - `422 Unprocessable Entity`: field validation failed.
#[put("/update")]
pub async fn update_user(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    update_data: web::Json<UpdateUserRequest>,
) -> Result<impl Responder, AppError> {
    update_data.validate()?;

    let user = require_user(&pool, auth.user_id).await?;
    let update = update_data.into_inner();

    if let Some(username) = &update.username {
        sqlx::query("UPDATE users SET username = $1, updated_at = now() WHERE id = $2")
            .bind(username)
            .bind(user.id)
            .execute(&**pool)
            .await?;
    }

    if let Some(email) = &update.email {
        if email != &user.email && find_user_by_email(&pool, email).await?.is_some() {
            return Err(AppError::BadRequest("This email already exists!".into()));
        }
        sqlx::query("UPDATE users SET email = $1, updated_at = now() WHERE id = $2")
            .bind(email)
            .bind(user.id)
            .execute(&**pool)
            .await?;
    }

    if let (Some(old_password), Some(new_password)) = (&update.old_password, &update.new_password)
    {
        if !verify_password(old_password, &user.password_hash)? {
            return Err(AppError::BadRequest("Old Password is not correct!".into()));
        }

        let password_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
            .bind(&password_hash)
            .bind(user.id)
            .execute(&**pool)
            .await?;
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Updated successfully!" })))
}

/// Appends an email to the caller's delegate list.
///
/// Self-assignment and duplicates are rejected. Returns the updated profile.
#[put("/assignee")]
pub async fn assign_people(
    pool: web::Data<PgPool>,
    auth: AuthUser,
    assign_data: web::Json<AssignRequest>,
) -> Result<impl Responder, AppError> {
    assign_data.validate()?;

    let user = require_user(&pool, auth.user_id).await?;
    let email = assign_data.into_inner().email;

    if email == user.email {
        return Err(AppError::BadRequest(
            "Yours and assignee email cannot be the same!".into(),
        ));
    }

    if user.assignees.0.contains(&email) {
        return Err(AppError::BadRequest("This email is already added!".into()));
    }

    // jsonb || jsonb appends the single-element array to the stored list.
    let updated = sqlx::query_as::<_, User>(
        "UPDATE users SET assignees = assignees || $1, updated_at = now() WHERE id = $2 \
         RETURNING id, username, email, password_hash, assignees, created_at, updated_at",
    )
    .bind(Json(vec![email]))
    .bind(user.id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(UserProfile::from(updated)))
}
