use crate::{
    services::{
        article_service::ArticleError, asset_service::AssetError,
        conservation_service::ConservationError, prediction_service::PredictionError,
        report_service::ReportError,
        status_transition::{TransitionError, TransitionFailure},
        subscription_service::SubscriptionError,
    },
    session::SessionError,
};
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), "{}", self.message);
        }

        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        let status = match &err {
            ReportError::NotFound(_) => StatusCode::NOT_FOUND,
            ReportError::Validation(_) => StatusCode::BAD_REQUEST,
            ReportError::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.to_string())
    }
}

impl From<TransitionFailure> for AppError {
    fn from(err: TransitionFailure) -> Self {
        match err {
            TransitionFailure::NotFound(_) => AppError::not_found(err.to_string()),
            TransitionFailure::Invalid(invalid) => invalid.into(),
            TransitionFailure::Store(store) => store.into(),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }
}

impl From<AssetError> for AppError {
    fn from(err: AssetError) -> Self {
        let status = match &err {
            AssetError::NotFound(_) => StatusCode::NOT_FOUND,
            AssetError::InvalidPath => StatusCode::BAD_REQUEST,
            AssetError::NotAnImage(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AssetError::Sqlx(_) | AssetError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.to_string())
    }
}

impl From<ArticleError> for AppError {
    fn from(err: ArticleError) -> Self {
        match err {
            ArticleError::NotFound(_) => AppError::not_found(err.to_string()),
            ArticleError::Validation(_) => AppError::bad_request(err.to_string()),
            ArticleError::Asset(asset) => asset.into(),
            ArticleError::Sqlx(_) => AppError::internal(err.to_string()),
        }
    }
}

impl From<ConservationError> for AppError {
    fn from(err: ConservationError) -> Self {
        match err {
            ConservationError::NotFound(_) => AppError::not_found(err.to_string()),
            ConservationError::Asset(asset) => asset.into(),
            ConservationError::Sqlx(_) => AppError::internal(err.to_string()),
        }
    }
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        let status = match &err {
            SubscriptionError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::AlreadySubscribed(_) => StatusCode::CONFLICT,
            SubscriptionError::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.to_string())
    }
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        let status = match &err {
            PredictionError::InvalidSample(_) => StatusCode::BAD_REQUEST,
            PredictionError::UpstreamStatus(_) | PredictionError::Upstream(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        AppError::new(status, err.to_string())
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let status = match &err {
            SessionError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            SessionError::Forbidden => StatusCode::FORBIDDEN,
        };
        AppError::new(status, err.to_string())
    }
}
