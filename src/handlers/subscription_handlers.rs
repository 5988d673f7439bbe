use crate::{
    errors::AppError, services::subscription_service::Subscription, state::AppState,
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// POST `/subscriptions`: newsletter sign-up.
pub async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let subscription = state.subscriptions.subscribe(&request.email).await?;
    info!(id = subscription.id, "new newsletter subscription");
    Ok((StatusCode::CREATED, Json(subscription)))
}
