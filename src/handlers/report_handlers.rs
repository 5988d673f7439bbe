//! Public report endpoints: submission, listing, detail and the dashboard.

use crate::{
    errors::AppError,
    handlers::uploads::{discard_all, store_image},
    models::{
        asset::{AssetView, owner},
        report::{MapPoint, Report, ReportDraft},
    },
    services::{
        asset_service::StoredObject,
        report_filter::{FilterCriteria, Selector, SortOrder, StatusCounts, count_by_status, filter_and_sort},
        report_service::validate_draft,
        severity_aggregator::{MonthBucket, aggregate_by_month},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Storage prefix for images attached to reports.
const IMAGE_PREFIX: &str = "report-images";

/// Query params accepted by the report listings.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub pollution_type: Option<String>,
    pub sort: Option<String>,
}

impl From<ReportQuery> for FilterCriteria {
    fn from(query: ReportQuery) -> Self {
        Self {
            search_text: query.search.unwrap_or_default(),
            status: Selector::parse(query.status.as_deref()),
            pollution_type: Selector::parse(query.pollution_type.as_deref()),
            sort_by: SortOrder::parse(query.sort.as_deref()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmittedReport {
    pub report: Report,
    pub images: Vec<AssetView>,
    /// Paths of images that were received but could not be recorded.
    pub failed_images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub report: Report,
    pub images: Vec<AssetView>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub counts: StatusCounts,
    pub monthly: Vec<MonthBucket>,
    pub map: Vec<MapPoint>,
}

/// POST `/reports`: multipart report submission.
pub async fn submit_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmittedReport>), AppError> {
    let mut draft = ReportDraft::default();
    let mut stored = Vec::new();

    if let Err(err) = read_submission(&state, &mut multipart, &mut draft, &mut stored).await {
        discard_all(&state.assets, &stored).await;
        return Err(err);
    }

    let new_report = match validate_draft(draft) {
        Ok(report) => report,
        Err(err) => {
            discard_all(&state.assets, &stored).await;
            return Err(err.into());
        }
    };

    let report = match state.reports.create(&new_report).await {
        Ok(report) => report,
        Err(err) => {
            discard_all(&state.assets, &stored).await;
            return Err(err.into());
        }
    };

    let mut images = Vec::with_capacity(stored.len());
    let mut failed_images = Vec::new();
    for object in &stored {
        match state
            .assets
            .attach(object, Some(owner::REPORT), Some(report.id))
            .await
        {
            Ok(asset) => images.push(state.assets.view(asset)),
            Err(err) => {
                warn!(id = report.id, path = %object.path, "could not record report image: {}", err);
                failed_images.push(object.path.clone());
            }
        }
    }

    info!(id = report.id, images = images.len(), "report submitted");
    Ok((
        StatusCode::CREATED,
        Json(SubmittedReport {
            report,
            images,
            failed_images,
        }),
    ))
}

async fn read_submission(
    state: &AppState,
    multipart: &mut Multipart,
    draft: &mut ReportDraft,
    stored: &mut Vec<StoredObject>,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let slot = match name.as_str() {
            "images" | "images[]" | "image" => {
                stored.push(store_image(&state.assets, IMAGE_PREFIX, field).await?);
                continue;
            }
            "title" => &mut draft.title,
            "location" => &mut draft.location,
            "description" => &mut draft.description,
            "severity" => &mut draft.severity,
            "pollution_type" => &mut draft.pollution_type,
            "latitude" => &mut draft.latitude,
            "longitude" => &mut draft.longitude,
            "contact" => &mut draft.contact,
            "user_name" => &mut draft.user_name,
            _ => continue,
        };
        *slot = Some(field.text().await?);
    }
    Ok(())
}

/// GET `/reports`: filtered, sorted listing over the full store.
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<Report>>, AppError> {
    let reports = state.reports.list_all().await?;
    Ok(Json(filter_and_sort(&reports, &query.into())))
}

/// GET `/reports/{id}`
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ReportDetail>, AppError> {
    let report = state.reports.get(id).await?;
    let images = state
        .assets
        .list_for(owner::REPORT, id)
        .await?
        .into_iter()
        .map(|asset| state.assets.view(asset))
        .collect();
    Ok(Json(ReportDetail { report, images }))
}

/// GET `/dashboard`: status tallies, monthly severity series and map markers.
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<Dashboard>, AppError> {
    let reports = state.reports.list_all().await?;
    Ok(Json(Dashboard {
        counts: count_by_status(&reports),
        monthly: aggregate_by_month(&reports, &state.chart_offset),
        map: reports.iter().filter_map(Report::map_point).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::{PollutionType, ReportStatus};

    #[test]
    fn query_maps_to_criteria() {
        let query = ReportQuery {
            search: Some("Ciliwung".into()),
            status: Some("verified".into()),
            pollution_type: Some("all".into()),
            sort: Some("location".into()),
        };
        let criteria = FilterCriteria::from(query);
        assert_eq!(criteria.search_text, "Ciliwung");
        assert_eq!(criteria.status, Selector::Only(ReportStatus::Verified));
        assert_eq!(criteria.pollution_type, Selector::<PollutionType>::All);
        assert_eq!(criteria.sort_by, SortOrder::Location);
    }

    #[test]
    fn empty_query_is_newest_first_everything() {
        assert_eq!(FilterCriteria::from(ReportQuery::default()), FilterCriteria::default());
    }
}
