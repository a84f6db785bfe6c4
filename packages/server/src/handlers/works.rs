use std::path::PathBuf;

use axum::Json;
use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use chrono::Utc;
use common::CreationKind;
use common::storage::{BoxReader, ObjectStream};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entity::{creation, user_info};
use crate::error::{AppError, ErrorBody};
use crate::models::work::{
    DownloadQuery, DownloadResponse, ListWorksQuery, UploadInput, WorkListResponse, WorkResponse,
    validate_upload_input,
};
use crate::state::AppState;
use crate::utils::content_type::resolve_content_type;
use crate::utils::storage_key::generate_storage_key;

/// Body limit for the upload route: the object cap plus headroom for the
/// multipart framing and the `input` part.
pub fn upload_body_limit(config: &AppConfig) -> DefaultBodyLimit {
    let limit = config.storage.max_object_size.saturating_add(1024 * 1024);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Works",
    operation_id = "uploadWork",
    summary = "Upload a file and record its metadata",
    description = "Expects two multipart parts: `file` (the binary) and `input` (a JSON document \
        with `owner_id` plus optional `weight`, `priority` and `synopsis`). The payload is \
        validated first, then the bytes are written to the blob store under a generated storage \
        key, then a DONE record referencing that key is inserted. The two writes are not \
        transactional: a metadata failure leaves the stored object orphaned and is reported as \
        METADATA_WRITE_FAILED with the key logged server-side.",
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "`file` binary part and `input` JSON part"),
    responses(
        (status = 201, description = "Work created", body = WorkResponse),
        (status = 400, description = "Malformed or invalid payload", body = ErrorBody),
        (status = 502, description = "Blob write failed", body = ErrorBody),
        (status = 500, description = "Metadata write failed after the blob write", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_work(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<WorkResponse>), AppError> {
    let mut spooled: Option<SpooledFile> = None;

    let result = async {
        let mut input_json: Option<String> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
        {
            match field.name() {
                Some("file") => {
                    spooled =
                        Some(spool_upload_field(field, state.config.storage.max_object_size).await?);
                }
                Some("input") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Failed to read input: {e}")))?;
                    input_json = Some(text);
                }
                _ => {}
            }
        }

        finish_upload(&state, spooled.as_ref(), input_json).await
    }
    .await;

    // Best effort; the spool is in the OS temp dir either way.
    if let Some(spooled) = &spooled {
        let _ = tokio::fs::remove_file(&spooled.path).await;
    }

    result
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Works",
    operation_id = "getWork",
    summary = "Get a work's metadata",
    description = "Returns the metadata record for a DONE work. Drafts are hidden from the read \
        paths and answer 404 here.",
    params(("id" = i32, Path, description = "Work ID")),
    responses(
        (status = 200, description = "Work metadata", body = WorkResponse),
        (status = 404, description = "Work not found", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_work(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<WorkResponse>, AppError> {
    let work = creation::Entity::find_by_id(id)
        .filter(creation::Column::Kind.eq(CreationKind::Done))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Work not found".to_string()))?;

    Ok(Json(WorkResponse::from(work)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Works",
    operation_id = "listWorks",
    summary = "List a user's works",
    description = "Returns the DONE works owned by the given user, newest first.",
    params(ListWorksQuery),
    responses(
        (status = 200, description = "Works owned by the user", body = WorkListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_works(
    State(state): State<AppState>,
    Query(query): Query<ListWorksQuery>,
) -> Result<Json<WorkListResponse>, AppError> {
    let records = creation::Entity::find()
        .filter(creation::Column::OwnerId.eq(query.owner_id))
        .filter(creation::Column::Kind.eq(CreationKind::Done))
        .order_by_desc(creation::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let total = records.len() as u64;
    let works = records.into_iter().map(WorkResponse::from).collect();

    Ok(Json(WorkListResponse { works, total }))
}

#[utoipa::path(
    get,
    path = "/{id}/preview",
    tag = "Works",
    operation_id = "previewWork",
    summary = "Stream a work's object inline",
    description = "Streams the stored bytes with `Content-Disposition: inline`. The content type \
        is the one recorded by the blob backend when available, otherwise resolved from the \
        storage key's extension. Preview does not filter by kind, so drafts stream too.",
    params(("id" = i32, Path, description = "Work ID")),
    responses(
        (status = 200, description = "Object bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Work not found", body = ErrorBody),
        (status = 502, description = "Blob backend failed or the object is gone", body = ErrorBody),
        (status = 500, description = "Unexpected failure", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn preview_work(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let work = find_work(&state.db, id).await?;

    let ObjectStream {
        reader,
        content_type,
        size,
    } = state.blob_store.get_stream(&work.storage_key).await?;

    let content_type =
        content_type.unwrap_or_else(|| resolve_content_type(&work.storage_key).to_string());

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            inline_disposition_value(&work.storage_key),
        );
    if let Some(size) = size {
        builder = builder.header(header::CONTENT_LENGTH, size.to_string());
    }

    builder
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(format!("Failed to build preview response: {e}")))
}

#[utoipa::path(
    get,
    path = "/{id}/download",
    tag = "Works",
    operation_id = "downloadWork",
    summary = "Copy a work's object to a server-local path",
    description = "Administrative relay: fetches the stored object and writes it to `path` on the \
        server's own filesystem, overwriting any existing file. Storage failures are logged with \
        the backend's diagnostic fields and surface as UPSTREAM_ERROR.",
    params(("id" = i32, Path, description = "Work ID"), DownloadQuery),
    responses(
        (status = 200, description = "Object copied", body = DownloadResponse),
        (status = 400, description = "Missing or empty path", body = ErrorBody),
        (status = 404, description = "Work not found", body = ErrorBody),
        (status = 502, description = "Blob backend failed or the object is gone", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_work(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<DownloadResponse>, AppError> {
    if query.path.trim().is_empty() {
        return Err(AppError::Validation("path must not be empty".to_string()));
    }

    let work = find_work(&state.db, id).await?;

    let dest = PathBuf::from(&query.path);
    let bytes = state
        .blob_store
        .download_to_path(&work.storage_key, &dest)
        .await?;

    info!(
        storage_key = %work.storage_key,
        path = %query.path,
        bytes,
        "Copied object to local path"
    );

    Ok(Json(DownloadResponse {
        path: query.path,
        bytes,
    }))
}

/// A multipart file part spooled to a temp file so validation can run
/// before any blob traffic.
struct SpooledFile {
    path: PathBuf,
    original_filename: Option<String>,
}

impl SpooledFile {
    async fn open(&self) -> Result<BoxReader, AppError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen spooled upload: {e}")))?;
        Ok(Box::new(file))
    }
}

/// Stream a multipart file part to a temp file, enforcing the object size
/// cap chunk by chunk. The caller removes the file when done.
async fn spool_upload_field(
    mut field: Field<'_>,
    max_size: u64,
) -> Result<SpooledFile, AppError> {
    let original_filename = field.file_name().map(|name| name.to_string());
    let path = std::env::temp_dir().join(format!("work-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create spool file: {e}")))?;

        let mut size: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            size += chunk.len() as u64;
            if size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds the maximum object size of {max_size} bytes"
                )));
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Spool write failed: {e}")))?;
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Spool flush failed: {e}")))?;

        Ok(())
    }
    .await;

    match result {
        Ok(()) => Ok(SpooledFile {
            path,
            original_filename,
        }),
        Err(e) => {
            let _ = tokio::fs::remove_file(&path).await;
            Err(e)
        }
    }
}

async fn finish_upload(
    state: &AppState,
    spooled: Option<&SpooledFile>,
    input_json: Option<String>,
) -> Result<(StatusCode, Json<WorkResponse>), AppError> {
    // Everything that can fail cheaply fails here, before the blob write.
    let input_json =
        input_json.ok_or_else(|| AppError::Validation("Missing 'input' field".to_string()))?;
    let input: UploadInput = serde_json::from_str(&input_json)
        .map_err(|e| AppError::Validation(format!("Invalid input JSON: {e}")))?;
    validate_upload_input(&input)?;

    let spooled =
        spooled.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;

    let owner = user_info::Entity::find_by_id(input.owner_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!("Owner user {} does not exist", input.owner_id))
        })?;

    let original_filename = spooled.original_filename.clone().unwrap_or_default();
    let storage_key = generate_storage_key(&original_filename);
    let content_type = resolve_content_type(&original_filename);

    let reader = spooled.open().await?;
    let size = state
        .blob_store
        .put_stream(&storage_key, reader, Some(content_type))
        .await
        .map_err(|e| {
            tracing::error!(storage_key = %storage_key, error = ?e, "Blob write failed");
            AppError::StorageWrite(e.to_string())
        })?;

    let name = if original_filename.is_empty() {
        storage_key.clone()
    } else {
        original_filename
    };

    let record = creation::ActiveModel {
        name: Set(name),
        storage_key: Set(storage_key.clone()),
        synopsis: Set(input.synopsis),
        priority: Set(input.priority),
        weight: Set(input.weight),
        kind: Set(CreationKind::Done),
        owner_id: Set(owner.id),
        size: Set(i64::try_from(size).unwrap_or(i64::MAX)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let saved = record
        .insert(&state.db)
        .await
        .map_err(|e| AppError::MetadataWrite {
            storage_key: storage_key.clone(),
            detail: e.to_string(),
        })?;

    Ok((StatusCode::CREATED, Json(WorkResponse::from(saved))))
}

/// Fetch a work by primary key. No kind filter: preview and download serve
/// drafts too.
async fn find_work<C: ConnectionTrait>(db: &C, id: i32) -> Result<creation::Model, AppError> {
    creation::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Work not found".to_string()))
}

/// Build the inline `Content-Disposition` value for a storage key. The key
/// is percent-encoded into the filename parameter so the header stays a
/// single ASCII token whatever the extension carried.
fn inline_disposition_value(storage_key: &str) -> String {
    let encoded: String = storage_key
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();
    format!("inline; filename=\"{encoded}\"")
}
