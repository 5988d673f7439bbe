//! Represents a user-submitted water-pollution report and its enumerated tags.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{AsRefStr, Display, EnumString};

/// Severity tier chosen by the reporter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(from = "String", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Severity {
    Low,
    Medium,
    High,
    Unknown,
}

/// Kind of pollution observed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(from = "String", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PollutionType {
    Chemical,
    Oil,
    Plastic,
    Sewage,
    Other,
    Unknown,
}

/// Review lifecycle of a report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(from = "String", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ReportStatus {
    InReview,
    Verified,
    Rejected,
    Unknown,
}

macro_rules! lenient_tag {
    ($ty:ty) => {
        impl $ty {
            /// Decode a raw tag, ignoring surrounding whitespace and ASCII case.
            /// Anything unrecognised maps to `Unknown`.
            pub fn parse_lenient(raw: &str) -> Self {
                raw.trim().parse().unwrap_or(Self::Unknown)
            }

            pub fn is_known(self) -> bool {
                self != Self::Unknown
            }
        }

        impl From<String> for $ty {
            fn from(raw: String) -> Self {
                Self::parse_lenient(&raw)
            }
        }
    };
}

lenient_tag!(Severity);
lenient_tag!(PollutionType);
lenient_tag!(ReportStatus);

/// A pollution incident record as held by the report store.
///
/// `created_at` stays in the store's text form; consumers that need a
/// timestamp parse it and decide what to do with malformed values.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Report {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[sqlx(try_from = "String")]
    pub severity: Severity,
    #[sqlx(try_from = "String")]
    pub pollution_type: PollutionType,
    #[sqlx(try_from = "String")]
    pub status: ReportStatus,
    /// Only set by a transition into `rejected`.
    pub rejected_reason: Option<String>,
    pub created_at: String,
    pub contact: Option<String>,
    pub user_name: Option<String>,
}

/// Unvalidated report fields as they arrive from the submission form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportDraft {
    pub title: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub pollution_type: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub contact: Option<String>,
    pub user_name: Option<String>,
}

/// A draft that passed validation and is ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub title: String,
    pub location: String,
    pub description: Option<String>,
    pub severity: Severity,
    pub pollution_type: PollutionType,
    pub coordinates: Option<(f64, f64)>,
    pub contact: Option<String>,
    pub user_name: Option<String>,
}

/// Marker for the dashboard map.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MapPoint {
    pub id: i64,
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: Severity,
    pub status: ReportStatus,
}

impl Report {
    pub fn map_point(&self) -> Option<MapPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(MapPoint {
                id: self.id,
                title: self.title.clone(),
                latitude,
                longitude,
                severity: self.severity,
                status: self.status,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
impl Report {
    pub fn fixture(id: i64, status: &str, created_at: &str, severity: &str) -> Self {
        Self {
            id,
            title: format!("Report {id}"),
            description: None,
            location: None,
            latitude: None,
            longitude: None,
            severity: Severity::parse_lenient(severity),
            pollution_type: PollutionType::Other,
            status: ReportStatus::parse_lenient(status),
            rejected_reason: None,
            created_at: created_at.to_string(),
            contact: None,
            user_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_decode_case_and_whitespace_insensitively() {
        assert_eq!(Severity::parse_lenient(" HIGH "), Severity::High);
        assert_eq!(PollutionType::parse_lenient("Oil"), PollutionType::Oil);
        assert_eq!(
            ReportStatus::parse_lenient("IN_REVIEW"),
            ReportStatus::InReview
        );
    }

    #[test]
    fn unrecognised_tags_fall_back_to_unknown() {
        assert_eq!(Severity::parse_lenient("critical"), Severity::Unknown);
        assert_eq!(PollutionType::parse_lenient(""), PollutionType::Unknown);
        assert_eq!(ReportStatus::parse_lenient("Resolved"), ReportStatus::Unknown);
    }

    #[test]
    fn tags_serialize_snake_case_and_deserialize_leniently() {
        let json = serde_json::to_string(&ReportStatus::InReview).unwrap();
        assert_eq!(json, "\"in_review\"");

        let parsed: Severity = serde_json::from_str("\"Medium\"").unwrap();
        assert_eq!(parsed, Severity::Medium);

        let parsed: PollutionType = serde_json::from_str("\"radioactive\"").unwrap();
        assert_eq!(parsed, PollutionType::Unknown);
    }

    #[test]
    fn map_point_requires_both_coordinates() {
        let mut report = Report::fixture(7, "verified", "2024-01-05", "low");
        assert!(report.map_point().is_none());

        report.latitude = Some(-6.2);
        assert!(report.map_point().is_none());

        report.longitude = Some(106.8);
        let point = report.map_point().unwrap();
        assert_eq!(point.id, 7);
        assert_eq!(point.latitude, -6.2);
    }
}
