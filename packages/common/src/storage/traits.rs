use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// An open read handle for a stored object.
///
/// `content_type` and `size` are whatever the backend recorded; backends
/// without per-object metadata report `None` and callers resolve a type
/// themselves.
pub struct ObjectStream {
    pub reader: BoxReader,
    pub content_type: Option<String>,
    pub size: Option<u64>,
}

/// Key-addressed blob storage.
///
/// Keys are caller-supplied opaque strings; a key refers to at most one
/// object at a time, and writing an existing key replaces its object.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`.
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<u64, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(key, reader, content_type).await
    }

    /// Store data from an async reader under `key`, returning the number
    /// of bytes written.
    async fn put_stream(
        &self,
        key: &str,
        reader: BoxReader,
        content_type: Option<&str>,
    ) -> Result<u64, StorageError>;

    /// Retrieve all bytes of the object under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut stream = self.get_stream(key).await?;
        let mut buf = Vec::new();
        stream.reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Open a streaming read handle for the object under `key`.
    async fn get_stream(&self, key: &str) -> Result<ObjectStream, StorageError>;

    /// Copy the object under `key` into a local file, overwriting any
    /// existing file at `dest` and creating parent directories as needed.
    ///
    /// Returns the number of bytes written.
    async fn download_to_path(&self, key: &str, dest: &Path) -> Result<u64, StorageError> {
        let mut stream = self.get_stream(key).await?;
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(dest).await?;
        let bytes = tokio::io::copy(&mut stream.reader, &mut file).await?;
        file.flush().await?;
        Ok(bytes)
    }

    /// Check whether an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete the object under `key`.
    ///
    /// Returns `true` if an object was deleted, `false` if none existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}
