//! Admin console endpoints for reviewing reports.
//!
//! Every handler here requires an authenticated admin session.

use crate::{
    errors::AppError,
    handlers::report_handlers::ReportQuery,
    models::{
        asset::owner,
        report::{Report, ReportStatus},
    },
    services::{
        report_filter::{StatusCounts, count_by_status, filter_and_sort},
        status_transition::ReportBoard,
    },
    session::SessionState,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct AdminReportList {
    pub reports: Vec<Report>,
    /// Tallies over every report, not just the filtered ones.
    pub counts: StatusCounts,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdated {
    pub report: Report,
    pub counts: StatusCounts,
}

/// GET `/admin/reports`
pub async fn list_reports(
    State(state): State<AppState>,
    session: SessionState,
    Query(query): Query<ReportQuery>,
) -> Result<Json<AdminReportList>, AppError> {
    session.require_admin()?;
    let reports = state.reports.list_all().await?;
    Ok(Json(AdminReportList {
        counts: count_by_status(&reports),
        reports: filter_and_sort(&reports, &query.into()),
    }))
}

/// PATCH `/admin/reports/{id}/status`
pub async fn update_status(
    State(state): State<AppState>,
    session: SessionState,
    Path(id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<StatusUpdated>, AppError> {
    let admin = session.require_admin()?;

    let mut board = ReportBoard::new(state.reports.list_all().await?);
    let next = ReportStatus::parse_lenient(&update.status);
    let report = board
        .transition(&state.reports, id, next, update.reason.as_deref())
        .await?
        .clone();

    info!(id, admin = %admin.id, status = %report.status, "admin changed report status");
    Ok(Json(StatusUpdated {
        report,
        counts: board.counts(),
    }))
}

/// DELETE `/admin/reports/{id}`: removes the report and its images.
pub async fn delete_report(
    State(state): State<AppState>,
    session: SessionState,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let admin = session.require_admin()?;
    state.reports.delete(id).await?;
    let removed = state.assets.delete_for(owner::REPORT, id).await?;
    info!(id, admin = %admin.id, images = removed, "admin deleted report");
    Ok(StatusCode::NO_CONTENT)
}
