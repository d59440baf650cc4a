use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, Error as ActixError, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::{token::verify_token, SESSION_COOKIE};
use crate::config::Config;
use crate::error::AppError;

/// The authenticated identity of the caller.
///
/// Handlers that require authentication declare this extractor; routes that
/// must stay open (like fetching a single task by id) simply don't. The
/// session token is read from the `token` cookie set at login, with a
/// `Bearer` Authorization header accepted as a fallback for non-browser
/// clients, and verified against the signing secret from [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i32,
}

impl FromRequest for AuthUser {
    type Error = ActixError; // AppError converts into ActixError via ResponseError
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let secret = match req.app_data::<web::Data<Config>>() {
            Some(config) => config.jwt_secret.clone(),
            None => {
                let err =
                    AppError::InternalServerError("Application config not available".to_string());
                return ready(Err(err.into()));
            }
        };

        let token = req
            .cookie(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .or_else(|| {
                req.headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .map(str::to_string)
            });

        match token {
            Some(token) => match verify_token(&token, &secret) {
                Ok(claims) => ready(Ok(AuthUser {
                    user_id: claims.sub,
                })),
                Err(app_err) => ready(Err(app_err.into())),
            },
            None => {
                let err = AppError::Unauthorized("Missing token".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
