use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

/// A user account as stored in the database.
///
/// The password hash never leaves the server; responses carry [`UserProfile`]
/// instead. The assignee list holds the emails of people the user delegates
/// tasks to, kept as a JSONB column.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub assignees: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The public view of a user account, returned by the register, login, and
/// assignee endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub assignees: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            assignees: user.assignees.0,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Payload for partially updating the caller's account.
///
/// Absent fields are left untouched. Changing the password requires the
/// current one alongside the new one.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 4, max = 32),
        regex(
            path = "crate::auth::USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub old_password: Option<String>,
    #[validate(length(min = 5))]
    pub new_password: Option<String>,
}

/// Payload for adding a delegate email to the caller's assignee list.
#[derive(Debug, Deserialize, Validate)]
pub struct AssignRequest {
    #[validate(email)]
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 42,
            username: "sample_user".to_string(),
            email: "sample@example.com".to_string(),
            password_hash: "$2b$12$secret-hash".to_string(),
            assignees: Json(vec!["delegate@example.com".to_string()]),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let profile = UserProfile::from(sample_user());
        let value = serde_json::to_value(&profile).unwrap();

        assert_eq!(value["id"], 42);
        assert_eq!(value["email"], "sample@example.com");
        assert_eq!(value["assignees"][0], "delegate@example.com");
        assert!(value.get("password").is_none());
        assert!(value.get("password_hash").is_none());
    }

    #[test]
    fn test_update_user_request_validation() {
        let valid: UpdateUserRequest = serde_json::from_value(serde_json::json!({
            "username": "new_name",
            "new_password": "longenough"
        }))
        .unwrap();
        assert!(valid.validate().is_ok());

        let bad_email: UpdateUserRequest = serde_json::from_value(serde_json::json!({
            "email": "not-an-email"
        }))
        .unwrap();
        assert!(bad_email.validate().is_err());

        let short_password: UpdateUserRequest = serde_json::from_value(serde_json::json!({
            "old_password": "oldpass",
            "new_password": "abc"
        }))
        .unwrap();
        assert!(short_password.validate().is_err());

        // All fields absent is a valid (if pointless) update.
        let empty: UpdateUserRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn test_assign_request_validation() {
        let valid = AssignRequest {
            email: "person@example.com".to_string(),
        };
        assert!(valid.validate().is_ok());

        let invalid = AssignRequest {
            email: "person-at-example".to_string(),
        };
        assert!(invalid.validate().is_err());
    }
}
