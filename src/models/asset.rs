//! Represents a stored binary (image) and the record it is attached to.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata row for a stored object.
///
/// The payload itself lives on disk under the asset storage root; `path` is
/// the logical key used both for the on-disk location and the public URL.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Asset {
    pub id: i64,

    /// Owning table, e.g. `pollution_reports` or `articles`.
    pub model_type: Option<String>,

    /// Row id in the owning table.
    pub model_id: Option<i64>,

    /// Logical key such as `report-images/<uuid>-river.jpg`.
    pub path: String,

    pub content_type: Option<String>,

    pub size_bytes: i64,

    /// Hex MD5 of the payload.
    pub etag: Option<String>,

    pub created_at: String,
}

/// An asset together with the URL clients can fetch it from.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: Asset,
    pub url: String,
}

/// Owner kinds used in the `assets.model_type` column.
pub mod owner {
    pub const REPORT: &str = "pollution_reports";
    pub const ARTICLE: &str = "articles";
    pub const CONSERVATION: &str = "conservation";
}
