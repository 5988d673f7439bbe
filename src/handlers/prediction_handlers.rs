use crate::{
    errors::AppError,
    services::prediction_service::{Prediction, WaterSample},
    state::AppState,
};
use axum::{Json, extract::State};

/// POST `/predict`: forward a water sample to the potability model.
pub async fn predict(
    State(state): State<AppState>,
    Json(sample): Json<WaterSample>,
) -> Result<Json<Prediction>, AppError> {
    Ok(Json(state.predictor.predict(&sample).await?))
}
