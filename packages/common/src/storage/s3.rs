use std::path::Path;

use async_trait::async_trait;
use futures::TryStreamExt;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

use super::error::StorageError;
use super::factory::StoreInitError;
use super::traits::{BlobStore, BoxReader, ObjectStream};
use crate::config::S3StorageConfig;

/// S3-compatible key-addressed blob store.
///
/// Talks to any S3-compatible endpoint (AWS, MinIO, Ceph RGW, Aliyun
/// OSS) through a custom region. The client is built without the
/// fail-on-error feature, so HTTP status classification happens here:
/// 404s become [`StorageError::NotFound`] and other non-2xx responses
/// become [`StorageError::Backend`] with the fields parsed out of the
/// backend's error document.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
}

impl S3BlobStore {
    pub fn new(config: &S3StorageConfig) -> Result<Self, StoreInitError> {
        if config.endpoint.is_empty() {
            return Err(StoreInitError::MissingEndpoint);
        }

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StoreInitError::Credentials(e.to_string()))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StoreInitError::Client(e.to_string()))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }

    /// HEAD the object so reads can classify missing keys and report the
    /// stored content type before any body bytes move.
    async fn head(&self, key: &str) -> Result<s3::serde_types::HeadObjectResult, StorageError> {
        let (head, status) = self
            .bucket
            .head_object(key)
            .await
            .map_err(transport_error)?;
        match status {
            200..=299 => Ok(head),
            // HEAD responses carry no error document.
            _ => Err(error_from_response(status, "", key)),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_stream(
        &self,
        key: &str,
        mut reader: BoxReader,
        content_type: Option<&str>,
    ) -> Result<u64, StorageError> {
        let response = match content_type {
            Some(content_type) => {
                self.bucket
                    .put_object_stream_with_content_type(&mut reader, key, content_type)
                    .await
            }
            None => self.bucket.put_object_stream(&mut reader, key).await,
        }
        .map_err(transport_error)?;

        let status = response.status_code();
        if !(200..=299).contains(&status) {
            return Err(error_from_response(status, "", key));
        }

        Ok(response.uploaded_bytes() as u64)
    }

    async fn get_stream(&self, key: &str) -> Result<ObjectStream, StorageError> {
        let head = self.head(key).await?;

        let stream = self
            .bucket
            .get_object_stream(key)
            .await
            .map_err(transport_error)?;

        let status = stream.status_code;
        if !(200..=299).contains(&status) {
            // The body is the backend's error document, not object bytes.
            let body: Vec<u8> = stream
                .bytes
                .map_ok(|chunk| chunk.to_vec())
                .try_concat()
                .await
                .unwrap_or_default();
            return Err(error_from_response(
                status,
                &String::from_utf8_lossy(&body),
                key,
            ));
        }

        let reader = StreamReader::new(stream.bytes.map_err(std::io::Error::other));

        Ok(ObjectStream {
            reader: Box::new(reader),
            content_type: head.content_type,
            size: head.content_length.and_then(|len| u64::try_from(len).ok()),
        })
    }

    async fn download_to_path(&self, key: &str, dest: &Path) -> Result<u64, StorageError> {
        // Classify missing objects before touching the destination file.
        self.head(key).await?;

        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(dest).await?;
        let status = match self.bucket.get_object_to_writer(key, &mut file).await {
            Ok(status) => status,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(dest).await;
                return Err(transport_error(e));
            }
        };

        if !(200..=299).contains(&status) {
            // Whatever was streamed is the error document, not the object.
            drop(file);
            let _ = fs::remove_file(dest).await;
            return Err(error_from_response(status, "", key));
        }

        file.flush().await?;
        let bytes = file.metadata().await?.len();
        Ok(bytes)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(transport_error)?;
        match response.status_code() {
            200..=299 => Ok(true),
            404 => Ok(false),
            status => Err(error_from_response(
                status,
                &String::from_utf8_lossy(response.bytes()),
                key,
            )),
        }
    }
}

/// Map a client-side failure (connect, TLS, signing) that never produced
/// an HTTP response.
fn transport_error(err: s3::error::S3Error) -> StorageError {
    StorageError::Backend {
        status: None,
        code: None,
        message: err.to_string(),
        request_id: None,
        host_id: None,
    }
}

/// Classify a non-2xx backend response, pulling the diagnostic fields out
/// of the S3 error document when one is present.
fn error_from_response(status: u16, body: &str, key: &str) -> StorageError {
    if status == 404 {
        return StorageError::NotFound(key.to_string());
    }
    StorageError::Backend {
        status: Some(status),
        code: extract_xml_field(body, "Code"),
        message: extract_xml_field(body, "Message")
            .unwrap_or_else(|| format!("storage backend returned HTTP {status}")),
        request_id: extract_xml_field(body, "RequestId"),
        host_id: extract_xml_field(body, "HostId"),
    }
}

/// Pull `<tag>value</tag>` out of an S3 error document. The documents are
/// small and flat, so plain string scanning beats an XML dependency.
fn extract_xml_field(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    let value = body[start..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}
