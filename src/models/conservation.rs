//! Represents a volunteer conservation opportunity.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Conservation {
    pub id: i64,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    /// External sign-up link.
    pub link: Option<String>,
    pub created_at: String,
}

/// Conservation entry with the URL of its first image, empty when none.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ConservationView {
    #[serde(flatten)]
    pub conservation: Conservation,
    pub image_url: String,
}
