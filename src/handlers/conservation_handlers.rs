use crate::{
    errors::AppError, models::conservation::ConservationView,
    services::conservation_service::ConservationFilter, state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ConservationQuery {
    pub search: Option<String>,
    pub location: Option<String>,
}

impl From<ConservationQuery> for ConservationFilter {
    fn from(query: ConservationQuery) -> Self {
        Self {
            search: query.search.unwrap_or_default(),
            location: query.location.unwrap_or_default(),
        }
    }
}

/// GET `/conservation?search=&location=`
pub async fn list_conservation(
    State(state): State<AppState>,
    Query(query): Query<ConservationQuery>,
) -> Result<Json<Vec<ConservationView>>, AppError> {
    Ok(Json(state.conservation.list(&query.into()).await?))
}

/// GET `/conservation/{id}`
pub async fn get_conservation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ConservationView>, AppError> {
    Ok(Json(state.conservation.get(id).await?))
}
