use crate::{
    auth::{
        clear_session_cookie, generate_token, hash_password, session_cookie, verify_password,
        LoginRequest, RegisterRequest,
    },
    config::Config,
    error::AppError,
    models::{User, UserProfile},
    routes::find_user_by_email,
};
use actix_web::{post, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Register a new user
///
/// Creates a new user account, sets the session cookie, and returns the
/// created profile (without the password hash). A duplicate email is a 409.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    register_data.validate()?;

    // Check if email already exists
    if find_user_by_email(&pool, &register_data.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "User with this email already exists!".into(),
        ));
    }

    // Hash password
    let password_hash = hash_password(&register_data.password)?;

    // Insert new user
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
         RETURNING id, username, email, password_hash, assignees, created_at, updated_at",
    )
    .bind(&register_data.username)
    .bind(&register_data.email)
    .bind(&password_hash)
    .fetch_one(&**pool)
    .await?;

    let token = generate_token(user.id, &config.jwt_secret)?;

    Ok(HttpResponse::Created()
        .cookie(session_cookie(token))
        .json(UserProfile::from(user)))
}

/// Login user
///
/// Verifies credentials and sets the session cookie. An unknown email and a
/// wrong password are deliberately indistinguishable to the caller, and
/// neither sets a cookie.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    login_data.validate()?;

    let user = find_user_by_email(&pool, &login_data.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials!".into()))?;

    if !verify_password(&login_data.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials!".into()));
    }

    let token = generate_token(user.id, &config.jwt_secret)?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token))
        .json(UserProfile::from(user)))
}

/// Logout user
///
/// Replaces the session cookie with an immediately expiring one.
#[post("/logout")]
pub async fn logout() -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok()
        .cookie(clear_session_cookie())
        .json(json!({ "message": "Logged out successfully!" })))
}
