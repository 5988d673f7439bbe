//! ReportService: the report store backed by the `pollution_reports` table.

use crate::{
    models::report::{NewReport, PollutionType, Report, ReportDraft, ReportStatus, Severity},
    services::{
        status_transition::{ReportStore, StatusChange},
        timestamp::now_text,
    },
};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report {0} not found")]
    NotFound(i64),
    #[error("invalid report: {0}")]
    Validation(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;

const REPORT_COLUMNS: &str = "id, title, description, location, latitude, longitude, severity, \
     pollution_type, status, rejected_reason, created_at, contact, user_name";

#[derive(Clone)]
pub struct ReportService {
    pub db: Arc<SqlitePool>,
}

impl ReportService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a validated report. New reports always start `in_review`.
    pub async fn create(&self, report: &NewReport) -> ReportResult<Report> {
        let (latitude, longitude) = report.coordinates.unzip();
        let created = sqlx::query_as::<_, Report>(&format!(
            "INSERT INTO pollution_reports (
                title, description, location, latitude, longitude, severity,
                pollution_type, status, rejected_reason, created_at, contact, user_name
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?)
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(&report.title)
        .bind(&report.description)
        .bind(&report.location)
        .bind(latitude)
        .bind(longitude)
        .bind(report.severity.as_ref())
        .bind(report.pollution_type.as_ref())
        .bind(ReportStatus::InReview.as_ref())
        .bind(now_text())
        .bind(&report.contact)
        .bind(&report.user_name)
        .fetch_one(&*self.db)
        .await?;

        debug!(id = created.id, "inserted report");
        Ok(created)
    }

    /// Every report, in insertion order. Ordering for display is the filter's job.
    pub async fn list_all(&self) -> ReportResult<Vec<Report>> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM pollution_reports ORDER BY id ASC"
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(reports)
    }

    pub async fn get(&self, id: i64) -> ReportResult<Report> {
        sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM pollution_reports WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| not_found_or(err, id))
    }

    pub async fn delete(&self, id: i64) -> ReportResult<Report> {
        sqlx::query_as::<_, Report>(&format!(
            "DELETE FROM pollution_reports WHERE id = ? RETURNING {REPORT_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| not_found_or(err, id))
    }
}

impl ReportStore for ReportService {
    async fn apply_status(&self, id: i64, change: &StatusChange) -> ReportResult<Report> {
        sqlx::query_as::<_, Report>(&format!(
            "UPDATE pollution_reports SET status = ?, rejected_reason = ?
             WHERE id = ? RETURNING {REPORT_COLUMNS}"
        ))
        .bind(change.status.as_ref())
        .bind(&change.rejected_reason)
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| not_found_or(err, id))
    }
}

fn not_found_or(err: sqlx::Error, id: i64) -> ReportError {
    match err {
        sqlx::Error::RowNotFound => ReportError::NotFound(id),
        other => ReportError::Sqlx(other),
    }
}

/// Check a submitted draft and normalise it for insertion.
///
/// `title` and `location` must be non-blank, `severity` and `pollution_type`
/// must be recognised values, and coordinates must come as a numeric,
/// in-range pair or not at all. Blank optional fields become `None`.
pub fn validate_draft(draft: ReportDraft) -> ReportResult<NewReport> {
    let title = required(draft.title, "title")?;
    let location = required(draft.location, "location")?;

    let severity = draft
        .severity
        .as_deref()
        .map(Severity::parse_lenient)
        .filter(|severity| severity.is_known())
        .ok_or_else(|| ReportError::Validation("severity must be low, medium or high".into()))?;

    let pollution_type = draft
        .pollution_type
        .as_deref()
        .map(PollutionType::parse_lenient)
        .filter(|kind| kind.is_known())
        .ok_or_else(|| {
            ReportError::Validation(
                "pollution_type must be chemical, oil, plastic, sewage or other".into(),
            )
        })?;

    let coordinates = match (optional(draft.latitude), optional(draft.longitude)) {
        (None, None) => None,
        (Some(lat), Some(lon)) => Some((
            coordinate(&lat, "latitude", 90.0)?,
            coordinate(&lon, "longitude", 180.0)?,
        )),
        _ => {
            return Err(ReportError::Validation(
                "latitude and longitude must be given together".into(),
            ));
        }
    };

    Ok(NewReport {
        title,
        location,
        description: optional(draft.description),
        severity,
        pollution_type,
        coordinates,
        contact: optional(draft.contact),
        user_name: optional(draft.user_name),
    })
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &str) -> ReportResult<String> {
    optional(value).ok_or_else(|| ReportError::Validation(format!("{field} must not be empty")))
}

fn coordinate(raw: &str, field: &str, limit: f64) -> ReportResult<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && value.abs() <= limit)
        .ok_or_else(|| {
            ReportError::Validation(format!("{field} must be a number between -{limit} and {limit}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn draft() -> ReportDraft {
        ReportDraft {
            title: Some("Oil sheen".into()),
            location: Some(" Sungai Ciliwung ".into()),
            description: Some("   ".into()),
            severity: Some("High".into()),
            pollution_type: Some("oil".into()),
            latitude: Some("-6.2".into()),
            longitude: Some("106.8".into()),
            contact: None,
            user_name: Some("Dewi".into()),
        }
    }

    #[test]
    fn valid_draft_is_normalised() {
        let report = validate_draft(draft()).unwrap();
        assert_eq!(report.location, "Sungai Ciliwung");
        assert_eq!(report.description, None);
        assert_eq!(report.severity, Severity::High);
        assert_eq!(report.coordinates, Some((-6.2, 106.8)));
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        let mut bad = draft();
        bad.title = Some("  ".into());
        assert!(matches!(validate_draft(bad), Err(ReportError::Validation(_))));

        let mut bad = draft();
        bad.severity = Some("severe".into());
        assert!(matches!(validate_draft(bad), Err(ReportError::Validation(_))));

        let mut bad = draft();
        bad.pollution_type = None;
        assert!(matches!(validate_draft(bad), Err(ReportError::Validation(_))));
    }

    #[test]
    fn coordinates_must_be_numeric_paired_and_in_range() {
        let mut bad = draft();
        bad.latitude = Some("north".into());
        assert!(validate_draft(bad).is_err());

        let mut bad = draft();
        bad.longitude = None;
        assert!(validate_draft(bad).is_err());

        let mut bad = draft();
        bad.latitude = Some("91".into());
        assert!(validate_draft(bad).is_err());

        let mut none = draft();
        none.latitude = None;
        none.longitude = None;
        assert_eq!(validate_draft(none).unwrap().coordinates, None);
    }

    #[tokio::test]
    async fn create_list_update_delete() {
        let service = ReportService::new(db::test_pool().await);

        let created = service.create(&validate_draft(draft()).unwrap()).await.unwrap();
        assert_eq!(created.status, ReportStatus::InReview);
        assert_eq!(created.rejected_reason, None);
        assert_eq!(created.latitude, Some(-6.2));

        let change = StatusChange {
            status: ReportStatus::Rejected,
            rejected_reason: Some("duplicate".into()),
        };
        let updated = service.apply_status(created.id, &change).await.unwrap();
        assert_eq!(updated.status, ReportStatus::Rejected);
        assert_eq!(updated.rejected_reason.as_deref(), Some("duplicate"));

        assert_eq!(service.list_all().await.unwrap(), vec![updated.clone()]);
        assert_eq!(service.get(created.id).await.unwrap(), updated);

        service.delete(created.id).await.unwrap();
        assert!(matches!(
            service.get(created.id).await,
            Err(ReportError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn updating_a_missing_report_is_not_found() {
        let service = ReportService::new(db::test_pool().await);
        let change = StatusChange {
            status: ReportStatus::Verified,
            rejected_reason: None,
        };
        assert!(matches!(
            service.apply_status(42, &change).await,
            Err(ReportError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn unrecognised_stored_tags_decode_as_unknown() {
        let service = ReportService::new(db::test_pool().await);
        sqlx::query(
            "INSERT INTO pollution_reports (title, severity, pollution_type, status, created_at)
             VALUES ('legacy', '8', 'Chemical Discharge', 'Under Investigation', '2024-01-20')",
        )
        .execute(&*service.db)
        .await
        .unwrap();

        let report = &service.list_all().await.unwrap()[0];
        assert_eq!(report.severity, Severity::Unknown);
        assert_eq!(report.pollution_type, PollutionType::Unknown);
        assert_eq!(report.status, ReportStatus::Unknown);
    }
}
