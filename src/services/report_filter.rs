//! In-memory filtering, sorting and status tallies over a report snapshot.
//!
//! Everything here is a pure function of its inputs. Reports are never
//! mutated; filtered output is a subset of the input in a new order.

use crate::{
    models::report::{PollutionType, Report, ReportStatus, Severity},
    services::timestamp::parse_timestamp,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Either every value passes, or only one specific value does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<T> {
    All,
    Only(T),
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Selector::All
    }
}

impl<T: PartialEq + Copy> Selector<T> {
    pub fn admits(&self, value: T) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(wanted) => *wanted == value,
        }
    }
}

impl<T: From<String>> Selector<T> {
    /// `"all"` (any case) or a missing/blank value selects everything.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Selector::All,
            Some(value) if value.eq_ignore_ascii_case("all") => Selector::All,
            Some(value) => Selector::Only(T::from(value.to_string())),
        }
    }
}

/// Requested ordering of the filtered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Location,
    SeverityHigh,
    SeverityLow,
    /// Unrecognised sort key: keep input order.
    Unsorted,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => SortOrder::Newest,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "newest" => SortOrder::Newest,
                "oldest" => SortOrder::Oldest,
                "location" => SortOrder::Location,
                "severity-high" => SortOrder::SeverityHigh,
                "severity-low" => SortOrder::SeverityLow,
                _ => SortOrder::Unsorted,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub search_text: String,
    pub status: Selector<ReportStatus>,
    pub pollution_type: Selector<PollutionType>,
    pub sort_by: SortOrder,
}

/// Per-status tallies for the admin tab badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub all: usize,
    pub in_review: usize,
    pub verified: usize,
    pub rejected: usize,
}

/// Select the reports matching `criteria` and order them as requested.
///
/// Sorting is stable. Reports whose `created_at` cannot be parsed sort after
/// every dated report for both `Newest` and `Oldest`; unknown severities sort
/// last for both severity orders.
pub fn filter_and_sort(reports: &[Report], criteria: &FilterCriteria) -> Vec<Report> {
    let needle = criteria.search_text.to_lowercase();

    let mut selected: Vec<&Report> = reports
        .iter()
        .filter(|report| matches_search(report, &needle))
        .filter(|report| criteria.status.admits(report.status))
        .filter(|report| criteria.pollution_type.admits(report.pollution_type))
        .collect();

    match criteria.sort_by {
        SortOrder::Newest => sort_by_created(&mut selected, true),
        SortOrder::Oldest => sort_by_created(&mut selected, false),
        SortOrder::Location => {
            selected.sort_by_cached_key(|report| collation_key(report.location.as_deref()))
        }
        SortOrder::SeverityHigh => selected.sort_by_key(|report| {
            let rank = severity_rank(report.severity);
            (rank.is_none(), Reverse(rank))
        }),
        SortOrder::SeverityLow => selected.sort_by_key(|report| {
            let rank = severity_rank(report.severity);
            (rank.is_none(), rank)
        }),
        SortOrder::Unsorted => {}
    }

    selected.into_iter().cloned().collect()
}

/// Tally reports by status in one pass. Unknown statuses only count toward `all`.
pub fn count_by_status(reports: &[Report]) -> StatusCounts {
    reports
        .iter()
        .fold(StatusCounts::default(), |mut counts, report| {
            counts.all += 1;
            match report.status {
                ReportStatus::InReview => counts.in_review += 1,
                ReportStatus::Verified => counts.verified += 1,
                ReportStatus::Rejected => counts.rejected += 1,
                ReportStatus::Unknown => {}
            }
            counts
        })
}

fn matches_search(report: &Report, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [report.description.as_deref(), report.location.as_deref()]
        .into_iter()
        .any(|field| field.unwrap_or_default().to_lowercase().contains(needle))
}

fn sort_by_created(reports: &mut Vec<&Report>, newest_first: bool) {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &Report)> = reports
        .iter()
        .map(|report| (parse_timestamp(&report.created_at), *report))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) if newest_first => b.cmp(a),
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    *reports = keyed.into_iter().map(|(_, report)| report).collect();
}

fn severity_rank(severity: Severity) -> Option<u8> {
    match severity {
        Severity::Low => Some(1),
        Severity::Medium => Some(2),
        Severity::High => Some(3),
        Severity::Unknown => None,
    }
}

/// Alphabetical key for locations: accents and case are folded first, the
/// lowercased original breaks ties. Missing sorts first.
fn collation_key(location: Option<&str>) -> (String, String) {
    let lowered = location.unwrap_or_default().trim().to_lowercase();
    let folded = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();
    (folded, lowered)
}
