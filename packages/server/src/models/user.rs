use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::user_info;
use crate::error::AppError;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "ada")]
    pub username: String,
}

/// Response DTO for a user.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = "ada")]
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<user_info::Model> for UserResponse {
    fn from(model: user_info::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            created_at: model.created_at,
        }
    }
}

/// Validate and trim a username (1-64 Unicode characters).
pub fn validate_username(username: &str) -> Result<&str, AppError> {
    let trimmed = username.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 64 {
        return Err(AppError::Validation(
            "Username must be 1-64 characters".into(),
        ));
    }
    Ok(trimmed)
}
