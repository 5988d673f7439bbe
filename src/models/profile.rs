//! Represents a user profile and the role it carries.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// `profiles.role_id` value granted to administrators.
pub const ADMIN_ROLE_ID: i64 = 1;

/// `profiles.role_id` column default for ordinary members.
#[cfg(test)]
pub const MEMBER_ROLE_ID: i64 = 2;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Profile {
    pub id: String,
    pub full_name: Option<String>,
    pub role_id: i64,
    pub created_at: String,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role_id == ADMIN_ROLE_ID
    }
}
