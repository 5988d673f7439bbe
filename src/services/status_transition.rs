//! Review-status state machine for reports.
//!
//! `in_review`, `verified` and `rejected` form a fully connected graph with
//! no self loops. Entering `rejected` needs a non-blank reason. Local copies
//! of a report only change after the store has accepted the write.

use crate::{
    models::report::{Report, ReportStatus},
    services::{
        report_filter::{StatusCounts, count_by_status},
        report_service::ReportError,
    },
};
use serde::Serialize;
use std::future::Future;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("report is already `{0}`")]
    Unchanged(ReportStatus),
    #[error("`{0}` is not a valid target status")]
    InvalidTarget(ReportStatus),
    #[error("a reason is required to reject a report")]
    MissingReason,
}

/// Everything that can stop a transition from being applied.
#[derive(Debug, Error)]
pub enum TransitionFailure {
    #[error("report {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Invalid(#[from] TransitionError),
    #[error(transparent)]
    Store(#[from] ReportError),
}

/// The column values written back to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub status: ReportStatus,
    /// Set when `status` is `rejected`, cleared otherwise.
    pub rejected_reason: Option<String>,
}

/// Statuses reachable from `from`.
pub fn allowed_targets(from: ReportStatus) -> &'static [ReportStatus] {
    use ReportStatus::*;
    match from {
        InReview => &[Verified, Rejected],
        Verified => &[InReview, Rejected],
        Rejected => &[InReview, Verified],
        Unknown => &[InReview, Verified, Rejected],
    }
}

/// Validate a requested transition and compute the store update for it.
pub fn plan(
    current: ReportStatus,
    next: ReportStatus,
    reason: Option<&str>,
) -> Result<StatusChange, TransitionError> {
    if !next.is_known() {
        return Err(TransitionError::InvalidTarget(next));
    }
    if current == next {
        return Err(TransitionError::Unchanged(current));
    }
    if !allowed_targets(current).contains(&next) {
        return Err(TransitionError::InvalidTarget(next));
    }

    let rejected_reason = if next == ReportStatus::Rejected {
        let reason = reason.map(str::trim).unwrap_or_default();
        if reason.is_empty() {
            return Err(TransitionError::MissingReason);
        }
        Some(reason.to_string())
    } else {
        None
    };

    Ok(StatusChange {
        status: next,
        rejected_reason,
    })
}

/// Persistence seam for status updates.
pub trait ReportStore {
    /// Write `change` for report `id` and return the row as stored.
    fn apply_status(
        &self,
        id: i64,
        change: &StatusChange,
    ) -> impl Future<Output = Result<Report, ReportError>> + Send;
}

/// A caller-owned snapshot of reports, kept in step with the store.
#[derive(Debug, Clone, Default)]
pub struct ReportBoard {
    reports: Vec<Report>,
}

impl ReportBoard {
    pub fn new(reports: Vec<Report>) -> Self {
        Self { reports }
    }

    pub fn counts(&self) -> StatusCounts {
        count_by_status(&self.reports)
    }

    /// Move report `id` to `next`.
    ///
    /// Validation happens before any store call. The snapshot entry is
    /// replaced with the store's row only once the write succeeds; on any
    /// failure the snapshot is left exactly as it was.
    pub async fn transition<S: ReportStore>(
        &mut self,
        store: &S,
        id: i64,
        next: ReportStatus,
        reason: Option<&str>,
    ) -> Result<&Report, TransitionFailure> {
        let index = self
            .reports
            .iter()
            .position(|report| report.id == id)
            .ok_or(TransitionFailure::NotFound(id))?;

        let change = plan(self.reports[index].status, next, reason)?;

        let stored = match store.apply_status(id, &change).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(id, status = %change.status, "status update rejected by store: {}", err);
                return Err(err.into());
            }
        };

        info!(id, from = %self.reports[index].status, to = %stored.status, "report status changed");
        self.reports[index] = stored;
        Ok(&self.reports[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Store double that records writes and echoes them back.
    #[derive(Default)]
    struct RecordingStore {
        writes: Mutex<Vec<(i64, StatusChange)>>,
        fail: bool,
    }

    impl ReportStore for RecordingStore {
        async fn apply_status(&self, id: i64, change: &StatusChange) -> Result<Report, ReportError> {
            if self.fail {
                return Err(ReportError::NotFound(id));
            }
            if let Ok(mut writes) = self.writes.lock() {
                writes.push((id, change.clone()));
            }
            let mut report = Report::fixture(id, change.status.as_ref(), "2024-01-05", "low");
            report.rejected_reason = change.rejected_reason.clone();
            Ok(report)
        }
    }

    fn board() -> ReportBoard {
        ReportBoard::new(vec![
            Report::fixture(1, "in_review", "2024-01-05", "low"),
            Report::fixture(2, "verified", "2024-01-20", "high"),
        ])
    }

    #[test]
    fn graph_is_fully_connected_without_self_loops() {
        use ReportStatus::*;
        for from in [InReview, Verified, Rejected] {
            for to in [InReview, Verified, Rejected] {
                let result = plan(from, to, Some("bad photo"));
                assert_eq!(result.is_ok(), from != to, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn verifying_clears_the_reason() {
        let change = plan(ReportStatus::InReview, ReportStatus::Verified, None).unwrap();
        assert_eq!(
            change,
            StatusChange {
                status: ReportStatus::Verified,
                rejected_reason: None,
            }
        );
    }

    #[test]
    fn rejecting_requires_a_non_blank_reason() {
        for reason in [None, Some(""), Some("   \n")] {
            assert_eq!(
                plan(ReportStatus::InReview, ReportStatus::Rejected, reason),
                Err(TransitionError::MissingReason)
            );
        }
        let change = plan(ReportStatus::Verified, ReportStatus::Rejected, Some("  duplicate ")).unwrap();
        assert_eq!(change.rejected_reason.as_deref(), Some("duplicate"));
    }

    #[test]
    fn unknown_is_never_a_target() {
        assert_eq!(
            plan(ReportStatus::InReview, ReportStatus::Unknown, None),
            Err(TransitionError::InvalidTarget(ReportStatus::Unknown))
        );
        assert!(plan(ReportStatus::Unknown, ReportStatus::Verified, None).is_ok());
    }

    #[tokio::test]
    async fn successful_write_updates_the_board() {
        let store = RecordingStore::default();
        let mut board = board();

        let updated = board
            .transition(&store, 1, ReportStatus::Verified, None)
            .await
            .unwrap();
        assert_eq!(updated.status, ReportStatus::Verified);
        assert_eq!(updated.rejected_reason, None);
        assert_eq!(board.counts().verified, 2);
        assert_eq!(store.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_the_store() {
        let store = RecordingStore::default();
        let mut board = board();

        let err = board
            .transition(&store, 1, ReportStatus::Rejected, Some(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionFailure::Invalid(TransitionError::MissingReason)));
        assert!(store.writes.lock().unwrap().is_empty());
        assert_eq!(board.reports[0].status, ReportStatus::InReview);
    }

    #[tokio::test]
    async fn failed_write_leaves_the_board_untouched() {
        let store = RecordingStore {
            fail: true,
            ..Default::default()
        };
        let mut board = board();
        let before = board.reports.clone();

        let err = board
            .transition(&store, 2, ReportStatus::Rejected, Some("blurry"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionFailure::Store(_)));
        assert_eq!(board.reports, before);
    }

    #[tokio::test]
    async fn missing_report_is_reported() {
        let store = RecordingStore::default();
        let mut board = board();
        let err = board
            .transition(&store, 99, ReportStatus::Verified, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionFailure::NotFound(99)));
    }
}
