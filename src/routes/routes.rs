//! Defines every HTTP route of the Jernih API.
//!
//! ## Structure
//! - **Health**: `GET /healthz`, `GET /readyz`
//! - **Reports**
//!   - `POST /reports` (multipart), `GET /reports`, `GET /reports/{id}`
//!   - `GET  /dashboard` status counts, monthly severity series, map markers
//! - **Admin console** (admin session required)
//!   - `GET    /admin/reports`
//!   - `PATCH  /admin/reports/{id}/status`
//!   - `DELETE /admin/reports/{id}`
//!   - `POST /admin/articles`, `PUT|DELETE /admin/articles/{id}`
//! - **Articles**: `GET /articles`, `GET /articles/{id}`,
//!   `GET|POST /articles/{id}/comments`
//! - **Conservation**: `GET /conservation?search=&location=`, `GET /conservation/{id}`
//! - **Subscriptions**: `POST /subscriptions`
//! - **Prediction**: `POST /predict`
//! - **Assets**: `GET /assets/{*path}`
//!
//! The wildcard `*path` allows nested keys like `report-images/<uuid>-river.jpg`.

use crate::{
    handlers::{
        admin_handlers, article_handlers, asset_handlers, conservation_handlers,
        health_handlers::{healthz, readyz},
        prediction_handlers, report_handlers, subscription_handlers,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
};

/// Upload ceiling for multipart forms carrying images.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build and return the router for the whole API.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // reports
        .route(
            "/reports",
            post(report_handlers::submit_report).get(report_handlers::list_reports),
        )
        .route("/reports/{id}", get(report_handlers::get_report))
        .route("/dashboard", get(report_handlers::dashboard))
        // admin console
        .route("/admin/reports", get(admin_handlers::list_reports))
        .route(
            "/admin/reports/{id}/status",
            patch(admin_handlers::update_status),
        )
        .route(
            "/admin/reports/{id}",
            delete(admin_handlers::delete_report),
        )
        .route("/admin/articles", post(article_handlers::create_article))
        .route(
            "/admin/articles/{id}",
            put(article_handlers::update_article).delete(article_handlers::delete_article),
        )
        // articles
        .route("/articles", get(article_handlers::list_articles))
        .route("/articles/{id}", get(article_handlers::get_article))
        .route(
            "/articles/{id}/comments",
            get(article_handlers::list_comments).post(article_handlers::post_comment),
        )
        // conservation, subscriptions, prediction
        .route("/conservation", get(conservation_handlers::list_conservation))
        .route("/conservation/{id}", get(conservation_handlers::get_conservation))
        .route("/subscriptions", post(subscription_handlers::subscribe))
        .route("/predict", post(prediction_handlers::predict))
        // stored images
        .route("/assets/{*path}", get(asset_handlers::get_asset))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
