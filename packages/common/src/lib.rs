pub mod config;
pub mod creation_kind;
pub mod storage;

pub use creation_kind::CreationKind;
