#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visibility state of a creation record.
///
/// Read paths only return `Done` records; `Draft` exists for records that
/// have not been published. When the `sea-orm` feature is enabled, this
/// enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum CreationKind {
    /// Not yet published; hidden from read paths.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "DRAFT"))]
    Draft,
    /// Uploaded and visible.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "DONE"))]
    Done,
}

impl CreationKind {
    /// All possible kind values.
    pub const ALL: &'static [CreationKind] = &[Self::Draft, Self::Done];

    /// Returns the string representation (UPPERCASE).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for CreationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for CreationKind {
    fn default() -> Self {
        Self::Draft
    }
}

/// Error when parsing an invalid kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindError {
    invalid: String,
}

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid kind '{}'. Valid values: {}",
            self.invalid,
            CreationKind::ALL
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseKindError {}

impl FromStr for CreationKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "DONE" => Ok(Self::Done),
            _ => Err(ParseKindError {
                invalid: s.to_string(),
            }),
        }
    }
}
