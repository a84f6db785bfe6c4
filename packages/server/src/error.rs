use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `STORAGE_WRITE_FAILED`, `UPSTREAM_ERROR`, `METADATA_WRITE_FAILED`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Missing 'file' field")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    /// Blob write failed during upload; no metadata was persisted.
    StorageWrite(String),
    /// The storage backend failed while serving a read path.
    Upstream(String),
    /// Metadata insert failed after the blob write succeeded. The object
    /// under `storage_key` is now orphaned and the key is logged for
    /// reconciliation.
    MetadataWrite {
        storage_key: String,
        detail: String,
    },
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::StorageWrite(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    code: "STORAGE_WRITE_FAILED",
                    message: msg,
                },
            ),
            AppError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    code: "UPSTREAM_ERROR",
                    message: msg,
                },
            ),
            AppError::MetadataWrite {
                storage_key,
                detail,
            } => {
                tracing::error!(
                    storage_key = %storage_key,
                    "Metadata write failed after blob write, object is orphaned: {detail}"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "METADATA_WRITE_FAILED",
                        message: "Upload was stored but could not be recorded".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        // Backend diagnostics (status, code, request id, host id) are
        // logged here, at the point of failure; the client only sees the
        // coarse category.
        tracing::error!(error = ?err, "Storage backend error");
        AppError::Upstream(err.to_string())
    }
}
