// src/engine/ordering.rs
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::classifier::{is_due_soon, is_overdue};
use crate::models::request::{Request, RequestStatus};
use crate::models::user::Role;

/// Score assumed for pending requests that carry none.
pub const DEFAULT_PRIORITY_SCORE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestFilter {
    #[default]
    All,
    Pending,
    Approved,
    Denied,
    ReturnRequested,
    Returned,
    Overdue,
    Due,
}

impl RequestFilter {
    pub const ALL: [RequestFilter; 8] = [
        RequestFilter::All,
        RequestFilter::Pending,
        RequestFilter::Approved,
        RequestFilter::Denied,
        RequestFilter::ReturnRequested,
        RequestFilter::Returned,
        RequestFilter::Overdue,
        RequestFilter::Due,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestFilter::All => "all",
            RequestFilter::Pending => "pending",
            RequestFilter::Approved => "approved",
            RequestFilter::Denied => "denied",
            RequestFilter::ReturnRequested => "return_requested",
            RequestFilter::Returned => "returned",
            RequestFilter::Overdue => "overdue",
            RequestFilter::Due => "due",
        }
    }

    pub fn matches(&self, request: &Request, now: DateTime<Utc>) -> bool {
        match self {
            RequestFilter::All => true,
            RequestFilter::Pending => request.status == RequestStatus::Pending,
            RequestFilter::Approved => request.status == RequestStatus::Approved,
            RequestFilter::Denied => request.status == RequestStatus::Denied,
            RequestFilter::ReturnRequested => request.status == RequestStatus::ReturnRequested,
            RequestFilter::Returned => request.status == RequestStatus::Returned,
            RequestFilter::Overdue => is_overdue(request, now),
            RequestFilter::Due => is_due_soon(request, now),
        }
    }

    /// Next key in tab order, wrapping around.
    pub fn next(&self) -> RequestFilter {
        let idx = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for RequestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RequestFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| format!("unknown filter '{key}'"))
    }
}

fn priority_score(request: &Request) -> f64 {
    request
        .priority_score
        .filter(|score| score.is_finite())
        .unwrap_or(DEFAULT_PRIORITY_SCORE)
}

fn newest_first(a: &Request, b: &Request) -> Ordering {
    // requests without a timestamp sink to the bottom
    b.created().cmp(&a.created())
}

/// Review order for administrators: pending first, then by ascending priority
/// score among pending, then newest first.
fn admin_order(a: &Request, b: &Request) -> Ordering {
    let a_pending = a.status == RequestStatus::Pending;
    let b_pending = b.status == RequestStatus::Pending;

    match (a_pending, b_pending) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => priority_score(a)
            .total_cmp(&priority_score(b))
            .then_with(|| newest_first(a, b)),
        (false, false) => newest_first(a, b),
    }
}

pub fn sort_requests(requests: &mut [Request], viewer: Role) {
    match viewer {
        Role::Admin => requests.sort_by(admin_order),
        Role::Faculty | Role::Student | Role::Unknown => requests.sort_by(newest_first),
    }
}

/// The filtered, ordered view an operator acts on. Pure: the same input and
/// `now` always produce the same output.
pub fn filter_and_sort(
    requests: &[Request],
    filter: RequestFilter,
    viewer: Role,
    now: DateTime<Utc>,
) -> Vec<Request> {
    let mut view: Vec<Request> = requests
        .iter()
        .filter(|request| filter.matches(request, now))
        .cloned()
        .collect();
    sort_requests(&mut view, viewer);
    view
}

pub fn count_matching(requests: &[Request], filter: RequestFilter, now: DateTime<Utc>) -> usize {
    requests.iter().filter(|r| filter.matches(r, now)).count()
}
