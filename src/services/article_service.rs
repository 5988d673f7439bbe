//! ArticleService: educational articles and reader comments.

use crate::{
    models::{
        article::{Article, ArticleDetail, ArticleDraft, ArticleSummary, Comment},
        asset::{Asset, owner},
    },
    services::{
        asset_service::{AssetError, AssetService, StoredObject},
        timestamp::now_text,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("article {0} not found")]
    NotFound(i64),
    #[error("invalid article: {0}")]
    Validation(String),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type ArticleResult<T> = Result<T, ArticleError>;

/// Storage prefix for article header images.
pub const IMAGE_PREFIX: &str = "article-images";

const ARTICLE_COLUMNS: &str = "id, title, excerpt, content, author, image_id, created_at";

#[derive(Clone)]
pub struct ArticleService {
    pub db: Arc<SqlitePool>,
    pub assets: AssetService,
}

impl ArticleService {
    pub fn new(db: Arc<SqlitePool>, assets: AssetService) -> Self {
        Self { db, assets }
    }

    /// All articles, newest first, with image URL and comment count.
    pub async fn list(&self) -> ArticleResult<Vec<ArticleSummary>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            "SELECT a.id, a.title, a.excerpt, a.author, a.created_at, s.path AS image_path,
                    (SELECT COUNT(*) FROM comments c WHERE c.article_id = a.id) AS comment_count
             FROM articles a
             LEFT JOIN assets s ON s.id = a.image_id
             ORDER BY a.created_at DESC, a.id DESC",
        )
        .fetch_all(&*self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ArticleSummary {
                image_url: self.image_url(row.image_path.as_deref()),
                id: row.id,
                title: row.title,
                excerpt: row.excerpt,
                author: row.author,
                date: row.created_at,
                comment_count: row.comment_count,
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> ArticleResult<ArticleDetail> {
        let article = self.fetch(id).await?;
        let image_url = match article.image_id {
            Some(image_id) => match self.assets.find(image_id).await {
                Ok(asset) => self.image_url(Some(&asset.path)),
                Err(AssetError::NotFound(_)) => String::new(),
                Err(err) => return Err(err.into()),
            },
            None => String::new(),
        };

        Ok(ArticleDetail {
            id: article.id,
            title: article.title,
            excerpt: article.excerpt,
            content: article.content,
            author: article.author,
            date: article.created_at,
            image_url,
        })
    }

    /// Create an article, optionally with an already-stored header image.
    pub async fn create(
        &self,
        draft: ArticleDraft,
        image: Option<StoredObject>,
    ) -> ArticleResult<Article> {
        let title = match non_blank(draft.title) {
            Some(title) => title,
            None => {
                if let Some(image) = &image {
                    self.assets.discard(&image.path).await;
                }
                return Err(ArticleError::Validation("title must not be empty".into()));
            }
        };

        let image_asset = match &image {
            Some(stored) => Some(self.assets.attach(stored, None, None).await?),
            None => None,
        };

        let article = sqlx::query_as::<_, Article>(&format!(
            "INSERT INTO articles (title, excerpt, content, author, image_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(&title)
        .bind(non_blank(draft.excerpt))
        .bind(non_blank(draft.content))
        .bind(non_blank(draft.author))
        .bind(image_asset.as_ref().map(|asset| asset.id))
        .bind(now_text())
        .fetch_one(&*self.db)
        .await?;

        if let Some(asset) = image_asset {
            self.link_image(&asset, article.id).await?;
        }
        debug!(id = article.id, "created article");
        Ok(article)
    }

    /// Update the fields present in `draft`; a new image replaces the old one.
    pub async fn update(
        &self,
        id: i64,
        draft: ArticleDraft,
        image: Option<StoredObject>,
    ) -> ArticleResult<Article> {
        let existing = match self.fetch(id).await {
            Ok(existing) => existing,
            Err(err) => {
                if let Some(image) = &image {
                    self.assets.discard(&image.path).await;
                }
                return Err(err);
            }
        };

        let title = match draft.title {
            Some(title) if title.trim().is_empty() => {
                if let Some(image) = &image {
                    self.assets.discard(&image.path).await;
                }
                return Err(ArticleError::Validation("title must not be empty".into()));
            }
            Some(title) => title.trim().to_string(),
            None => existing.title.clone(),
        };

        let image_id = match &image {
            Some(stored) => {
                let asset = self.assets.attach(stored, Some(owner::ARTICLE), Some(id)).await?;
                Some(asset.id)
            }
            None => existing.image_id,
        };

        let article = sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET title = ?, excerpt = ?, content = ?, author = ?, image_id = ?
             WHERE id = ? RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(&title)
        .bind(draft.excerpt.map_or(existing.excerpt, |v| non_blank(Some(v))))
        .bind(draft.content.map_or(existing.content, |v| non_blank(Some(v))))
        .bind(draft.author.map_or(existing.author, |v| non_blank(Some(v))))
        .bind(image_id)
        .bind(id)
        .fetch_one(&*self.db)
        .await?;

        if image.is_some() {
            if let Some(old) = existing.image_id {
                if let Err(err) = self.assets.delete(old).await {
                    warn!(id, "could not remove replaced article image {}: {}", old, err);
                }
            }
        }
        Ok(article)
    }

    /// Delete an article, its comments and its images.
    pub async fn delete(&self, id: i64) -> ArticleResult<Article> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "DELETE FROM articles WHERE id = ? RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| not_found_or(err, id))?;

        sqlx::query("DELETE FROM comments WHERE article_id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        self.assets.delete_for(owner::ARTICLE, id).await?;
        Ok(article)
    }

    /// Comments on one article, oldest first.
    pub async fn comments(&self, article_id: i64) -> ArticleResult<Vec<Comment>> {
        self.fetch(article_id).await?;
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT c.id, c.article_id, c.user_id, c.text, c.created_at,
                    COALESCE(NULLIF(TRIM(p.full_name), ''), 'Anonymous') AS username
             FROM comments c
             LEFT JOIN profiles p ON p.id = c.user_id
             WHERE c.article_id = ?
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(article_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(comments)
    }

    pub async fn post_comment(
        &self,
        article_id: i64,
        user_id: &str,
        text: &str,
    ) -> ArticleResult<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ArticleError::Validation("comment must not be empty".into()));
        }
        self.fetch(article_id).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO comments (article_id, user_id, text, created_at)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(article_id)
        .bind(user_id)
        .bind(text)
        .bind(now_text())
        .fetch_one(&*self.db)
        .await?;

        let comment = sqlx::query_as::<_, Comment>(
            "SELECT c.id, c.article_id, c.user_id, c.text, c.created_at,
                    COALESCE(NULLIF(TRIM(p.full_name), ''), 'Anonymous') AS username
             FROM comments c
             LEFT JOIN profiles p ON p.id = c.user_id
             WHERE c.id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await?;
        Ok(comment)
    }

    async fn fetch(&self, id: i64) -> ArticleResult<Article> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| not_found_or(err, id))
    }

    async fn link_image(&self, asset: &Asset, article_id: i64) -> ArticleResult<()> {
        sqlx::query("UPDATE assets SET model_type = ?, model_id = ? WHERE id = ?")
            .bind(owner::ARTICLE)
            .bind(article_id)
            .bind(asset.id)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    fn image_url(&self, path: Option<&str>) -> String {
        path.map(|p| self.assets.public_url_for(p))
            .unwrap_or_default()
    }
}

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    excerpt: Option<String>,
    author: Option<String>,
    created_at: String,
    image_path: Option<String>,
    comment_count: i64,
}

fn not_found_or(err: sqlx::Error, id: i64) -> ArticleError {
    match err {
        sqlx::Error::RowNotFound => ArticleError::NotFound(id),
        other => ArticleError::Sqlx(other),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
