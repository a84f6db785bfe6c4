use chrono::{DateTime, Utc};
use common::CreationKind;
use serde::{Deserialize, Serialize};

use crate::entity::creation;
use crate::error::AppError;

/// Metadata half of an upload, sent as the JSON `input` multipart field.
#[derive(Debug, Deserialize)]
pub struct UploadInput {
    pub owner_id: i32,
    pub weight: Option<f64>,
    pub priority: Option<i32>,
    pub synopsis: Option<String>,
}

/// Response DTO for a single work.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WorkResponse {
    #[schema(example = 42)]
    pub id: i32,
    /// Display name (the original upload filename).
    #[schema(example = "photo.png")]
    pub name: String,
    /// Key of the stored object in the blob backend.
    #[schema(example = "3f2b8c94-a1d0-4bfe-9c0d-6a2f6f1f7b3a.png")]
    pub storage_key: String,
    pub synopsis: Option<String>,
    pub priority: Option<i32>,
    pub weight: Option<f64>,
    pub kind: CreationKind,
    #[schema(example = 7)]
    pub owner_id: i32,
    /// Object size in bytes.
    #[schema(example = 142857)]
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

/// Response DTO for listing works.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WorkListResponse {
    pub works: Vec<WorkResponse>,
    pub total: u64,
}

/// Response DTO for the download relay.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DownloadResponse {
    /// Destination path the object was written to.
    pub path: String,
    /// Bytes written.
    #[schema(example = 142857)]
    pub bytes: u64,
}

/// Query parameters for listing works.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListWorksQuery {
    /// Only works owned by this user are returned.
    pub owner_id: i32,
}

/// Query parameters for the download relay.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct DownloadQuery {
    /// Server-local destination path the object is copied to.
    pub path: String,
}

impl From<creation::Model> for WorkResponse {
    fn from(model: creation::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            storage_key: model.storage_key,
            synopsis: model.synopsis,
            priority: model.priority,
            weight: model.weight,
            kind: model.kind,
            owner_id: model.owner_id,
            size: model.size,
            created_at: model.created_at,
        }
    }
}

/// Validate the upload metadata payload after deserialization.
pub fn validate_upload_input(input: &UploadInput) -> Result<(), AppError> {
    if input.owner_id < 1 {
        return Err(AppError::Validation(
            "owner_id must be a positive integer".into(),
        ));
    }
    let synopsis_too_long = input
        .synopsis
        .as_ref()
        .is_some_and(|s| s.chars().count() > 2000);
    if synopsis_too_long {
        return Err(AppError::Validation(
            "Synopsis must be at most 2000 characters".into(),
        ));
    }
    Ok(())
}
