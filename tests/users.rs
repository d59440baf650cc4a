use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{test, web, App};
use dotenv::dotenv;
use serde_json::json;
use sqlx::PgPool;
use taskboard::config::Config;
use taskboard::routes;

async fn test_pool() -> Option<PgPool> {
    dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping integration test");
            return None;
        }
    };
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations on test DB");
    Some(pool)
}

fn test_config() -> Config {
    Config {
        database_url: "unused-by-handlers".to_string(),
        server_port: 8000,
        server_host: "127.0.0.1".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        cors_origin: "http://localhost:3000".to_string(),
    }
}

fn session_cookie_from<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .headers()
        .get_all(header::SET_COOKIE)
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| Cookie::parse_encoded(value.to_string()).ok())
        .find(|cookie| cookie.name() == "token")
}

async fn cleanup_user(pool: &PgPool, email: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await;
}

/// Registers a user and returns the new account id plus the session cookie.
async fn register_user(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    email: &str,
    password: &str,
) -> (i64, Cookie<'static>) {
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({ "username": username, "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert!(
        resp.status().is_success(),
        "Setup: failed to register {}",
        email
    );
    let cookie = session_cookie_from(&resp).expect("registration should set the session cookie");
    let profile: serde_json::Value = test::read_body_json(resp).await;
    (profile["id"].as_i64().unwrap(), cookie)
}

#[test_log::test(actix_rt::test)]
async fn test_update_user_profile_and_password() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let email = "users_update@example.com";
    cleanup_user(&pool, email).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(test_config()))
            .service(web::scope("/api").configure(routes::config)),
    )
    .await;

    let (_, cookie) = register_user(&app, "users_update", email, "OriginalPass1").await;

    // Unauthenticated update is rejected outright
    let req_anon = test::TestRequest::put()
        .uri("/api/user/update")
        .set_json(&json!({ "username": "sneaky_rename" }))
        .to_request();
    let resp_anon = test::call_service(&app, req_anon).await;
    assert_eq!(
        resp_anon.status(),
        actix_web::http::StatusCode::UNAUTHORIZED
    );

    // Rename only
    let req_rename = test::TestRequest::put()
        .uri("/api/user/update")
        .cookie(cookie.clone())
        .set_json(&json!({ "username": "renamed_user" }))
        .to_request();
    let resp_rename = test::call_service(&app, req_rename).await;
    assert_eq!(resp_rename.status(), actix_web::http::StatusCode::OK);

    // Password change with the wrong old password
    let req_wrong_old = test::TestRequest::put()
        .uri("/api/user/update")
        .cookie(cookie.clone())
        .set_json(&json!({ "old_password": "NotTheOldOne", "new_password": "BrandNewPass1" }))
        .to_request();
    let resp_wrong_old = test::call_service(&app, req_wrong_old).await;
    assert_eq!(
        resp_wrong_old.status(),
        actix_web::http::StatusCode::BAD_REQUEST
    );
    let body: serde_json::Value = test::read_body_json(resp_wrong_old).await;
    assert_eq!(body["message"], "Old Password is not correct!");

    // Password change with the correct old password
    let req_change = test::TestRequest::put()
        .uri("/api/user/update")
        .cookie(cookie.clone())
        .set_json(&json!({ "old_password": "OriginalPass1", "new_password": "BrandNewPass1" }))
        .to_request();
    let resp_change = test::call_service(&app, req_change).await;
    assert_eq!(resp_change.status(), actix_web::http::StatusCode::OK);

    // The old password no longer logs in, the new one does
    let req_old_login = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&json!({ "email": email, "password": "OriginalPass1" }))
        .to_request();
    let resp_old_login = test::call_service(&app, req_old_login).await;
    assert_eq!(
        resp_old_login.status(),
        actix_web::http::StatusCode::UNAUTHORIZED
    );

    let req_new_login = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&json!({ "email": email, "password": "BrandNewPass1" }))
        .to_request();
    let resp_new_login = test::call_service(&app, req_new_login).await;
    assert_eq!(resp_new_login.status(), actix_web::http::StatusCode::OK);
    let profile: serde_json::Value = test::read_body_json(resp_new_login).await;
    assert_eq!(profile["username"], "renamed_user");

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
async fn test_update_user_rejects_taken_email() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let email_a = "users_dup_a@example.com";
    let email_b = "users_dup_b@example.com";
    cleanup_user(&pool, email_a).await;
    cleanup_user(&pool, email_b).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(test_config()))
            .service(web::scope("/api").configure(routes::config)),
    )
    .await;

    let (_, cookie_a) = register_user(&app, "users_dup_a", email_a, "PasswordA1").await;
    register_user(&app, "users_dup_b", email_b, "PasswordB1").await;

    let req = test::TestRequest::put()
        .uri("/api/user/update")
        .cookie(cookie_a)
        .set_json(&json!({ "email": email_b }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "This email already exists!");

    cleanup_user(&pool, email_a).await;
    cleanup_user(&pool, email_b).await;
}

#[test_log::test(actix_rt::test)]
async fn test_assign_people() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let email = "users_assign@example.com";
    cleanup_user(&pool, email).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(test_config()))
            .service(web::scope("/api").configure(routes::config)),
    )
    .await;

    let (_, cookie) = register_user(&app, "users_assign", email, "PasswordC1").await;

    // First delegate is appended and returned in the profile
    let req_assign = test::TestRequest::put()
        .uri("/api/user/assignee")
        .cookie(cookie.clone())
        .set_json(&json!({ "email": "delegate@example.com" }))
        .to_request();
    let resp_assign = test::call_service(&app, req_assign).await;
    assert_eq!(resp_assign.status(), actix_web::http::StatusCode::OK);
    let profile: serde_json::Value = test::read_body_json(resp_assign).await;
    assert_eq!(profile["assignees"], json!(["delegate@example.com"]));

    // The same delegate cannot be added twice
    let req_dup = test::TestRequest::put()
        .uri("/api/user/assignee")
        .cookie(cookie.clone())
        .set_json(&json!({ "email": "delegate@example.com" }))
        .to_request();
    let resp_dup = test::call_service(&app, req_dup).await;
    assert_eq!(resp_dup.status(), actix_web::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp_dup).await;
    assert_eq!(body["message"], "This email is already added!");

    // Nor can the caller delegate to themselves
    let req_self = test::TestRequest::put()
        .uri("/api/user/assignee")
        .cookie(cookie.clone())
        .set_json(&json!({ "email": email }))
        .to_request();
    let resp_self = test::call_service(&app, req_self).await;
    assert_eq!(resp_self.status(), actix_web::http::StatusCode::BAD_REQUEST);

    // A malformed email never reaches the list
    let req_bad = test::TestRequest::put()
        .uri("/api/user/assignee")
        .cookie(cookie)
        .set_json(&json!({ "email": "not-an-email" }))
        .to_request();
    let resp_bad = test::call_service(&app, req_bad).await;
    assert_eq!(
        resp_bad.status(),
        actix_web::http::StatusCode::UNPROCESSABLE_ENTITY
    );

    cleanup_user(&pool, email).await;
}
