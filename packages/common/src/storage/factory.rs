use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use super::error::StorageError;
use super::filesystem::FilesystemBlobStore;
use super::traits::BlobStore;
use crate::config::{StorageAppConfig, StorageBackend};

/// Errors raised while constructing a blob store from configuration.
#[derive(Debug, Error)]
pub enum StoreInitError {
    #[error("S3 backend requires storage.s3.endpoint to be set")]
    MissingEndpoint,

    #[error("Invalid S3 credentials: {0}")]
    Credentials(String),

    #[error("S3 client setup failed: {0}")]
    Client(String),

    #[error("Storage backend '{0}' is not compiled into this build")]
    BackendUnavailable(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Build the blob store selected by configuration.
pub async fn build_blob_store(
    config: &StorageAppConfig,
) -> Result<Arc<dyn BlobStore>, StoreInitError> {
    match config.backend {
        StorageBackend::Filesystem => {
            let store = FilesystemBlobStore::new(
                PathBuf::from(&config.filesystem.base_path),
                config.max_object_size,
            )
            .await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => {
            let store = super::s3::S3BlobStore::new(&config.s3)?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => Err(StoreInitError::BackendUnavailable("s3")),
    }
}
