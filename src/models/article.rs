//! Represents educational articles and the comments readers leave on them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An article row.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    /// Header image, see `assets.id`.
    pub image_id: Option<i64>,
    pub created_at: String,
}

/// Article listing entry. `content` is omitted from listings.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub date: String,
    pub image_url: String,
    pub comment_count: i64,
}

/// Full article for the reading page.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ArticleDetail {
    pub id: i64,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub date: String,
    pub image_url: String,
}

/// Fields an editor submits when creating or updating an article.
#[derive(Debug, Clone, Default)]
pub struct ArticleDraft {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
}

/// A comment joined with its author's display name.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub user_id: String,
    pub text: String,
    pub created_at: String,
    /// Profile name, `Anonymous` when the profile has none.
    pub username: String,
}
