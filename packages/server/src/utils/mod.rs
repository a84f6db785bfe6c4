pub mod content_type;
pub mod storage_key;
