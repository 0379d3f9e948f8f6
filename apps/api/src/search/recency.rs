use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info};

use crate::services::SearchHit;

/// Keeps search results published within the last `days` days.
///
/// Results with no date, or a date that does not parse, are kept: dropping
/// undated results silently loses most of the useful ones.
#[derive(Debug, Clone, Copy)]
pub struct RecencyWindow {
    days: u32,
    now: DateTime<Utc>,
}

impl RecencyWindow {
    pub fn new(days: u32) -> Self {
        Self::ending_at(days, Utc::now())
    }

    pub fn ending_at(days: u32, now: DateTime<Utc>) -> Self {
        Self { days, now }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.now - Duration::days(i64::from(self.days))
    }

    pub fn admits(&self, published_date: Option<&str>) -> bool {
        let Some(raw) = published_date.map(str::trim).filter(|d| !d.is_empty()) else {
            debug!("No published_date, keeping result");
            return true;
        };

        match parse_published_date(raw) {
            Some(published) => published >= self.cutoff() && published <= self.now,
            None => {
                debug!("Could not parse date '{}', keeping result", raw);
                true
            }
        }
    }

    pub fn filter(&self, hits: Vec<SearchHit>) -> Vec<SearchHit> {
        let before = hits.len();
        let kept: Vec<SearchHit> = hits
            .into_iter()
            .filter(|h| self.admits(h.published_date.as_deref()))
            .collect();
        info!(
            "Date filter: {} results → {} results (within {} days)",
            before,
            kept.len(),
            self.days
        );
        kept
    }
}

/// Accepts RFC 3339, RFC 2822, naive ISO datetimes and bare `YYYY-MM-DD` dates.
fn parse_published_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn window() -> RecencyWindow {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        RecencyWindow::ending_at(30, now)
    }

    #[test]
    fn test_recent_date_is_admitted() {
        assert!(window().admits(Some("2026-10-01")));
        assert!(window().admits(Some("2026-10-10T08:30:00Z")));
    }

    #[test]
    fn test_old_date_is_rejected() {
        assert!(!window().admits(Some("2026-08-01")));
        assert!(!window().admits(Some("Mon, 01 Jun 2026 10:00:00 +0000")));
    }

    #[test]
    fn test_future_date_is_rejected() {
        assert!(!window().admits(Some("2026-12-01")));
    }

    #[test]
    fn test_missing_or_garbled_date_passes_through() {
        assert!(window().admits(None));
        assert!(window().admits(Some("")));
        assert!(window().admits(Some("last Tuesday")));
    }

    #[test]
    fn test_cutoff_boundary_is_inclusive() {
        assert!(window().admits(Some("2026-09-17T12:00:00Z")));
        assert!(!window().admits(Some("2026-09-17T11:59:59Z")));
    }

    #[test]
    fn test_filter_keeps_order() {
        let hits = vec![
            SearchHit {
                url: "a".into(),
                published_date: Some("2026-10-15".into()),
                ..SearchHit::default()
            },
            SearchHit {
                url: "b".into(),
                published_date: Some("2025-01-01".into()),
                ..SearchHit::default()
            },
            SearchHit {
                url: "c".into(),
                ..SearchHit::default()
            },
        ];
        let kept = window().filter(hits);
        let urls: Vec<_> = kept.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "c"]);
    }
}
