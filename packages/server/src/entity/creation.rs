use common::CreationKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Metadata record for one uploaded object.
///
/// Created only after the blob write succeeds, so a persisted
/// `storage_key` always points at an object that existed at insert time.
/// The reverse does not hold: a blob whose metadata insert failed stays
/// behind as an orphan (logged, not garbage-collected here).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "creation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Display name: the original upload filename when the client sent
    /// one, otherwise the storage key.
    pub name: String,

    /// Key of the stored object in the blob backend. Never reused for a
    /// different object once persisted.
    #[sea_orm(unique)]
    pub storage_key: String,

    pub synopsis: Option<String>,

    pub priority: Option<i32>,

    pub weight: Option<f64>,

    /// Only `DONE` records are visible through the read paths.
    pub kind: CreationKind,

    pub owner_id: i32,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user_info::Entity>,

    /// Object size in bytes as counted by the blob write.
    pub size: i64,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
