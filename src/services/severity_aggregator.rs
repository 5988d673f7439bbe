//! Monthly severity series for the dashboard chart.

use crate::{
    models::report::{Report, Severity},
    services::timestamp::parse_timestamp,
};
use chrono::{Datelike, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Number of most recent populated months kept in the series.
pub const MAX_BUCKETS: usize = 6;

/// Counts for one calendar month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    /// Display label such as `Jan '24`.
    pub month: String,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub total: usize,
}

/// Bucket reports by calendar month (in `tz`) and severity.
///
/// Reports with an unparsable `created_at` or an unrecognised severity are
/// skipped. Only months that contain at least one counted report appear; the
/// result is chronological and holds at most [`MAX_BUCKETS`] entries.
pub fn aggregate_by_month<Tz: TimeZone>(reports: &[Report], tz: &Tz) -> Vec<MonthBucket> {
    let mut months: BTreeMap<(i32, u32), MonthBucket> = BTreeMap::new();

    for report in reports {
        let Some(created) = parse_timestamp(&report.created_at) else {
            debug!(id = report.id, created_at = %report.created_at, "skipping report with unparsable date");
            continue;
        };
        if !report.severity.is_known() {
            debug!(id = report.id, "skipping report with unknown severity");
            continue;
        }

        let local = created.with_timezone(tz);
        let bucket = months.entry((local.year(), local.month())).or_default();
        match report.severity {
            Severity::Low => bucket.low += 1,
            Severity::Medium => bucket.medium += 1,
            Severity::High => bucket.high += 1,
            Severity::Unknown => continue,
        }
        bucket.total += 1;
    }

    let skip = months.len().saturating_sub(MAX_BUCKETS);
    months
        .into_iter()
        .skip(skip)
        .map(|((year, month), mut bucket)| {
            bucket.month = month_label(year, month);
            bucket
        })
        .collect()
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|date| date.format("%b '%y").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn report(id: i64, created_at: &str, severity: &str) -> Report {
        Report::fixture(id, "in_review", created_at, severity)
    }

    #[test]
    fn empty_input_yields_no_buckets() {
        assert!(aggregate_by_month(&[], &Utc).is_empty());
    }

    #[test]
    fn single_month_with_mixed_severities() {
        let reports = vec![
            report(1, "2024-01-05", "low"),
            report(2, "2024-01-20", "high"),
        ];
        assert_eq!(
            aggregate_by_month(&reports, &Utc),
            vec![MonthBucket {
                month: "Jan '24".into(),
                low: 1,
                medium: 0,
                high: 1,
                total: 2,
            }]
        );
    }

    #[test]
    fn mixed_case_severity_counts() {
        let buckets = aggregate_by_month(&[report(1, "2024-03-02T09:00:00Z", " HIGH ")], &Utc);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].high, 1);
        assert_eq!(buckets[0].total, 1);
    }

    #[test]
    fn bad_dates_and_unknown_severities_are_skipped() {
        let reports = vec![
            report(1, "garbage", "low"),
            report(2, "2024-02-10", "catastrophic"),
            report(3, "2024-02-11", "medium"),
        ];
        let buckets = aggregate_by_month(&reports, &Utc);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].month, "Feb '24");
        assert_eq!((buckets[0].medium, buckets[0].total), (1, 1));
    }

    #[test]
    fn keeps_only_latest_six_populated_months_in_order() {
        let reports: Vec<Report> = [
            "2023-09-01", "2023-11-15", "2024-01-01", "2024-02-03", "2024-03-04", "2024-05-05",
            "2024-06-06", "2024-08-08",
        ]
        .iter()
        .enumerate()
        .map(|(i, date)| report(i as i64, date, "low"))
        .collect();

        let labels: Vec<String> = aggregate_by_month(&reports, &Utc)
            .into_iter()
            .map(|b| b.month)
            .collect();
        assert_eq!(
            labels,
            vec!["Jan '24", "Feb '24", "Mar '24", "May '24", "Jun '24", "Aug '24"]
        );
    }

    #[test]
    fn result_is_independent_of_input_order() {
        let mut reports = vec![
            report(1, "2024-04-01", "low"),
            report(2, "2023-12-31T23:00:00Z", "medium"),
            report(3, "2024-04-15", "high"),
            report(4, "2024-01-02", "medium"),
        ];
        let forward = aggregate_by_month(&reports, &Utc);
        reports.reverse();
        assert_eq!(aggregate_by_month(&reports, &Utc), forward);
        reports.swap(0, 2);
        assert_eq!(aggregate_by_month(&reports, &Utc), forward);
    }

    #[test]
    fn months_follow_the_given_offset() {
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        let reports = vec![report(1, "2024-01-31T20:00:00Z", "low")];
        assert_eq!(aggregate_by_month(&reports, &Utc)[0].month, "Jan '24");
        assert_eq!(aggregate_by_month(&reports, &wib)[0].month, "Feb '24");
    }
}
