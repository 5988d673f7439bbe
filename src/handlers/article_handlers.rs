//! Article CMS endpoints and reader comments.

use crate::{
    errors::AppError,
    handlers::uploads::store_image,
    models::article::{Article, ArticleDetail, ArticleDraft, ArticleSummary, Comment},
    services::{article_service::IMAGE_PREFIX, asset_service::StoredObject},
    session::SessionState,
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct NewComment {
    pub text: String,
}

/// GET `/articles`
pub async fn list_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ArticleSummary>>, AppError> {
    Ok(Json(state.articles.list().await?))
}

/// GET `/articles/{id}`
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleDetail>, AppError> {
    Ok(Json(state.articles.get(id).await?))
}

/// POST `/admin/articles`
pub async fn create_article(
    State(state): State<AppState>,
    session: SessionState,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Article>), AppError> {
    let admin = session.require_admin()?;
    let (draft, image) = read_article_form(&state, multipart).await?;
    let article = state.articles.create(draft, image).await?;
    info!(id = article.id, admin = %admin.id, "article published");
    Ok((StatusCode::CREATED, Json(article)))
}

/// PUT `/admin/articles/{id}`
pub async fn update_article(
    State(state): State<AppState>,
    session: SessionState,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Article>, AppError> {
    let admin = session.require_admin()?;
    let (draft, image) = read_article_form(&state, multipart).await?;
    let article = state.articles.update(id, draft, image).await?;
    info!(id, admin = %admin.id, "article updated");
    Ok(Json(article))
}

/// DELETE `/admin/articles/{id}`
pub async fn delete_article(
    State(state): State<AppState>,
    session: SessionState,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let admin = session.require_admin()?;
    state.articles.delete(id).await?;
    info!(id, admin = %admin.id, "article deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/articles/{id}/comments`
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, AppError> {
    Ok(Json(state.articles.comments(id).await?))
}

/// POST `/articles/{id}/comments`
pub async fn post_comment(
    State(state): State<AppState>,
    session: SessionState,
    Path(id): Path<i64>,
    Json(comment): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let user = session.require_user()?;
    let comment = state.articles.post_comment(id, &user.id, &comment.text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Collect article text fields plus at most one header image.
///
/// A later `image` part replaces an earlier one. The stored image is removed
/// again if reading the rest of the form fails.
async fn read_article_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(ArticleDraft, Option<StoredObject>), AppError> {
    let mut draft = ArticleDraft::default();
    let mut image: Option<StoredObject> = None;

    let result: Result<(), AppError> = async {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            let slot = match name.as_str() {
                "image" => {
                    let stored = store_image(&state.assets, IMAGE_PREFIX, field).await?;
                    if let Some(previous) = image.replace(stored) {
                        state.assets.discard(&previous.path).await;
                    }
                    continue;
                }
                "title" => &mut draft.title,
                "excerpt" => &mut draft.excerpt,
                "content" => &mut draft.content,
                "author" => &mut draft.author,
                _ => continue,
            };
            *slot = Some(field.text().await?);
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => Ok((draft, image)),
        Err(err) => {
            if let Some(stored) = &image {
                state.assets.discard(&stored.path).await;
            }
            Err(err)
        }
    }
}
