mod error;
mod factory;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::StorageError;
pub use factory::{StoreInitError, build_blob_store};
pub use traits::{BlobStore, BoxReader, ObjectStream};
