// src/engine/classifier.rs
//
// Day counts are measured in exact 24h windows between instants in UTC, the
// same arithmetic the backend uses for `daysOverdue` / `daysUntilDue`. A bare
// return date is UTC midnight of that day.
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::request::{Request, RequestStatus};

pub const DUE_SOON_WINDOW_DAYS: i64 = 7;
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_overdue: bool,
    pub is_due_soon: bool,
    pub days_overdue: i64,
    pub days_until_due: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        })
    }
}

fn active_return_date(request: &Request) -> Option<DateTime<Utc>> {
    match request.status {
        RequestStatus::Approved => request.return_date,
        _ => None,
    }
}

/// Approved, has a return date, and that date has passed.
pub fn is_overdue(request: &Request, now: DateTime<Utc>) -> bool {
    active_return_date(request).is_some_and(|due| due < now)
}

/// Approved and due within the next seven days (inclusive at both ends).
pub fn is_due_soon(request: &Request, now: DateTime<Utc>) -> bool {
    let horizon = now + Duration::days(DUE_SOON_WINDOW_DAYS);
    active_return_date(request).is_some_and(|due| now <= due && due <= horizon)
}

pub fn classify(request: &Request, now: DateTime<Utc>) -> Classification {
    let Some(due) = active_return_date(request) else {
        return Classification::default();
    };

    let millis = (due - now).num_milliseconds();
    if millis < 0 {
        Classification {
            is_overdue: true,
            is_due_soon: false,
            days_overdue: -millis / MILLIS_PER_DAY,
            days_until_due: 0,
        }
    } else {
        Classification {
            is_overdue: false,
            is_due_soon: millis <= DUE_SOON_WINDOW_DAYS * MILLIS_PER_DAY,
            days_overdue: 0,
            // ceil for positive spans; exactly due gives 0
            days_until_due: (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY,
        }
    }
}

pub fn overdue_severity(days_overdue: i64) -> Severity {
    if days_overdue >= 7 {
        Severity::High
    } else if days_overdue >= 3 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn due_severity(days_until_due: i64) -> Severity {
    if days_until_due <= 1 {
        Severity::High
    } else if days_until_due <= 3 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

impl Classification {
    /// Banding for overdue items, or for items due within the window.
    pub fn severity(&self) -> Option<Severity> {
        if self.is_overdue {
            Some(overdue_severity(self.days_overdue))
        } else if self.is_due_soon {
            Some(due_severity(self.days_until_due))
        } else {
            None
        }
    }

    pub fn days_text(&self) -> String {
        match (self.is_overdue, self.days_overdue, self.days_until_due) {
            (true, 1, _) => "1 day overdue".to_string(),
            (true, days, _) => format!("{days} days overdue"),
            (false, _, 1) => "due in 1 day".to_string(),
            (false, _, days) => format!("due in {days} days"),
        }
    }
}

/// One line of the overdue / due-soon report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnRow {
    pub request: Request,
    pub classification: Classification,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnsReport {
    pub overdue: Vec<ReturnRow>,
    pub due: Vec<ReturnRow>,
}

fn to_row(request: Request, now: DateTime<Utc>) -> ReturnRow {
    let classification = classify(&request, now);
    let server_days = if classification.is_overdue {
        request.days_overdue.map(|days| (days, classification.days_overdue))
    } else {
        request.days_until_due.map(|days| (days, classification.days_until_due))
    };
    if let Some((server, local)) = server_days.filter(|(server, local)| server != local) {
        debug!(
            "Request {} day count differs from backend (server={}, local={})",
            request.id, server, local
        );
    }

    ReturnRow {
        severity: classification.severity(),
        classification,
        request,
    }
}

/// Builds the report from `/overdue-returns` and `/due-returns` rows. Day
/// counts are always recomputed locally so every view agrees, and each row
/// lands in the section its local classification puts it in. Rows that are
/// neither overdue nor due soon any more are dropped, as are repeats.
pub fn returns_report(overdue: Vec<Request>, due: Vec<Request>, now: DateTime<Utc>) -> ReturnsReport {
    let mut seen = HashSet::new();
    let mut report = ReturnsReport::default();
    for request in overdue.into_iter().chain(due) {
        if !seen.insert(request.id.clone()) {
            continue;
        }
        let row = to_row(request, now);
        if row.classification.is_overdue {
            report.overdue.push(row);
        } else if row.classification.is_due_soon {
            report.due.push(row);
        }
    }
    report
        .overdue
        .sort_by(|a, b| b.classification.days_overdue.cmp(&a.classification.days_overdue));
    report
        .due
        .sort_by(|a, b| a.classification.days_until_due.cmp(&b.classification.days_until_due));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn approved(return_date: Option<DateTime<Utc>>) -> Request {
        serde_json::from_value::<Request>(serde_json::json!({
            "_id": "r1",
            "status": "approved",
            "quantity": 1
        }))
        .map(|mut r| {
            r.return_date = return_date;
            r
        })
        .unwrap()
    }

    #[test]
    fn due_soon_example() {
        let c = classify(&approved(Some(at(2024, 1, 3))), at(2024, 1, 1));
        assert!(!c.is_overdue);
        assert_eq!(c.days_until_due, 2);
        assert_eq!(c.days_overdue, 0);
        assert_eq!(c.severity(), Some(Severity::Medium));
        assert_eq!(c.days_text(), "due in 2 days");
    }

    #[test]
    fn overdue_example() {
        let c = classify(&approved(Some(at(2024, 1, 1))), at(2024, 1, 10));
        assert!(c.is_overdue);
        assert_eq!(c.days_overdue, 9);
        assert_eq!(c.days_until_due, 0);
        assert_eq!(c.severity(), Some(Severity::High));
    }

    #[test]
    fn partial_days_round_toward_the_deadline() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let c = classify(&approved(Some(at(2024, 1, 3))), now);
        assert_eq!(c.days_until_due, 2); // 1.5 days rounds up

        let now = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        let c = classify(&approved(Some(at(2024, 1, 1))), now);
        assert_eq!(c.days_overdue, 1); // 1.5 days rounds down
        assert_eq!(c.days_text(), "1 day overdue");
        assert_eq!(c.severity(), Some(Severity::Low));
    }

    #[test]
    fn non_approved_or_undated_is_never_overdue() {
        let now = at(2024, 6, 1);
        let mut request = approved(Some(at(2024, 1, 1)));
        for status in [
            RequestStatus::Pending,
            RequestStatus::Denied,
            RequestStatus::ReturnRequested,
            RequestStatus::Returned,
        ] {
            request.status = status;
            let c = classify(&request, now);
            assert!(!c.is_overdue);
            assert_eq!(c.days_overdue, 0);
            assert!(!is_overdue(&request, now));
        }

        let c = classify(&approved(None), now);
        assert_eq!(c, Classification::default());
    }

    #[test]
    fn severity_bands() {
        assert_eq!(overdue_severity(7), Severity::High);
        assert_eq!(overdue_severity(3), Severity::Medium);
        assert_eq!(overdue_severity(2), Severity::Low);
        assert_eq!(due_severity(1), Severity::High);
        assert_eq!(due_severity(3), Severity::Medium);
        assert_eq!(due_severity(4), Severity::Low);
    }

    #[test]
    fn due_window_is_inclusive() {
        let now = at(2024, 1, 1);
        assert!(is_due_soon(&approved(Some(now)), now));
        assert!(is_due_soon(&approved(Some(at(2024, 1, 8))), now));
        assert!(!is_due_soon(&approved(Some(at(2024, 1, 9))), now));
        assert!(!is_due_soon(&approved(Some(at(2023, 12, 31))), now));
    }

    #[test]
    fn report_recomputes_and_orders_rows() {
        let now = at(2024, 1, 10);
        let mut stale = approved(Some(at(2024, 1, 8)));
        stale.id = "stale".into();
        stale.days_overdue = Some(1); // backend ran a day ago
        let mut worst = approved(Some(at(2024, 1, 1)));
        worst.id = "worst".into();

        let mut soon = approved(Some(at(2024, 1, 11)));
        soon.id = "soon".into();
        let mut later = approved(Some(at(2024, 1, 15)));
        later.id = "later".into();

        let report = returns_report(vec![stale, worst], vec![later, soon], now);
        let overdue: Vec<_> = report.overdue.iter().map(|r| r.request.id.as_str()).collect();
        assert_eq!(overdue, ["worst", "stale"]);
        assert_eq!(report.overdue[1].classification.days_overdue, 2);

        let due: Vec<_> = report.due.iter().map(|r| r.request.id.as_str()).collect();
        assert_eq!(due, ["soon", "later"]);
        assert_eq!(report.due[0].severity, Some(Severity::High));
    }

    #[test]
    fn report_moves_rows_to_the_section_they_now_belong_in() {
        let now = Utc.with_ymd_and_hms(2024, 1, 4, 12, 0, 0).unwrap();

        // listed as due yesterday, passed since
        let mut lapsed = approved(Some(at(2024, 1, 4)));
        lapsed.id = "lapsed".into();
        lapsed.days_until_due = Some(1);
        // listed as overdue, return date extended
        let mut extended = approved(Some(at(2024, 1, 6)));
        extended.id = "extended".into();
        extended.days_overdue = Some(2);
        // listed as due, already returned
        let mut returned = approved(Some(at(2024, 1, 5)));
        returned.id = "returned".into();
        returned.status = RequestStatus::Returned;
        // far outside the window
        let mut distant = approved(Some(at(2024, 2, 1)));
        distant.id = "distant".into();

        let report = returns_report(
            vec![extended.clone()],
            vec![lapsed.clone(), returned, distant, extended],
            now,
        );

        let overdue: Vec<_> = report.overdue.iter().map(|r| r.request.id.as_str()).collect();
        assert_eq!(overdue, ["lapsed"]);
        assert_eq!(report.overdue[0].severity, Some(Severity::Low));
        assert_eq!(report.overdue[0].classification.days_text(), "0 days overdue");

        let due: Vec<_> = report.due.iter().map(|r| r.request.id.as_str()).collect();
        assert_eq!(due, ["extended"]);
        assert!(report.due.iter().all(|r| !r.classification.is_overdue));
    }

    #[test]
    fn due_exactly_now_is_high_severity() {
        let now = at(2024, 1, 1);
        let request = approved(Some(now));
        let c = classify(&request, now);
        assert!(is_due_soon(&request, now));
        assert!(c.is_due_soon);
        assert_eq!(c.days_until_due, 0);
        assert_eq!(c.severity(), Some(Severity::High));
        assert_eq!(c.days_text(), "due in 0 days");

        let c = classify(&approved(Some(at(2024, 1, 9))), now);
        assert!(!c.is_due_soon);
        assert_eq!(c.severity(), None);
        assert_eq!(classify(&approved(None), now).severity(), None);
    }
}
