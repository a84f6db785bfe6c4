use serde::Deserialize;

/// App-level object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Which backend stores object bytes. Default: "filesystem".
    #[serde(default)]
    pub backend: StorageBackend,
    /// Maximum accepted object size in bytes. Default: 512 MiB.
    /// Also used as the HTTP request body cap on upload routes.
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
    #[serde(default)]
    pub filesystem: FilesystemStorageConfig,
    #[serde(default)]
    pub s3: S3StorageConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// Settings for the local-disk backend.
#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemStorageConfig {
    /// Directory that holds stored objects. Default: "data/objects".
    #[serde(default = "default_fs_base_path")]
    pub base_path: String,
}

/// Settings for the S3-compatible backend.
///
/// `endpoint` + `path_style = true` is the MinIO-style deployment; leave
/// `path_style` false for virtual-hosted AWS buckets.
#[derive(Debug, Deserialize, Clone)]
pub struct S3StorageConfig {
    /// Backend endpoint URL, e.g. "http://127.0.0.1:9000".
    #[serde(default)]
    pub endpoint: String,
    /// Region name. Default: "us-east-1".
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Bucket that holds uploaded objects. Default: "creations".
    #[serde(default = "default_s3_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    /// Use path-style addressing. Default: true.
    #[serde(default = "default_s3_path_style")]
    pub path_style: bool,
}

fn default_max_object_size() -> u64 {
    512 * 1024 * 1024
}
fn default_fs_base_path() -> String {
    "data/objects".into()
}
fn default_s3_region() -> String {
    "us-east-1".into()
}
fn default_s3_bucket() -> String {
    "creations".into()
}
fn default_s3_path_style() -> bool {
    true
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            max_object_size: default_max_object_size(),
            filesystem: FilesystemStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

impl Default for FilesystemStorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_fs_base_path(),
        }
    }
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_s3_region(),
            bucket: default_s3_bucket(),
            access_key: String::new(),
            secret_key: String::new(),
            path_style: default_s3_path_style(),
        }
    }
}
