// src/engine/stats.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::classifier::is_overdue;
use super::ordering::{sort_requests, RequestFilter};
use crate::models::request::{Request, RequestStatus};
use crate::models::resource::Resource;
use crate::models::user::{Role, User};

const RECENT_REQUESTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardStats {
    pub total_resources: usize,
    pub my_requests: usize,
    pub pending: usize,
    pub approved: usize,
    pub overdue: usize,
    pub due: usize,
    pub recent: Vec<Request>,
}

impl DashboardStats {
    /// `overdue_returns` is only fetched for administrators; everyone else gets
    /// the count computed from their own requests.
    pub fn compute(
        viewer: Role,
        resources: &[Resource],
        requests: &[Request],
        due_returns: &[Request],
        overdue_returns: &[Request],
        now: DateTime<Utc>,
    ) -> Self {
        let overdue = match viewer {
            Role::Admin => overdue_returns.len(),
            _ => requests.iter().filter(|r| is_overdue(r, now)).count(),
        };

        let mut recent = requests.to_vec();
        sort_requests(&mut recent, Role::Unknown);
        recent.truncate(RECENT_REQUESTS);

        Self {
            total_resources: resources.len(),
            my_requests: requests.len(),
            pending: requests.iter().filter(|r| RequestFilter::Pending.matches(r, now)).count(),
            approved: requests.iter().filter(|r| RequestFilter::Approved.matches(r, now)).count(),
            overdue,
            due: due_returns.len(),
            recent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserActivity {
    pub request_count: usize,
    pub approved_count: usize,
    pub pending_count: usize,
    pub last_request: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserDirectoryStats {
    pub total: usize,
    pub students: usize,
    pub faculty: usize,
    pub admins: usize,
    pub individual: HashMap<String, UserActivity>,
}

impl UserDirectoryStats {
    pub fn compute(users: &[User], requests: &[Request]) -> Self {
        let mut individual: HashMap<String, UserActivity> = HashMap::new();

        for request in requests {
            let Some(user) = request.user.as_ref().filter(|u| !u.id.is_empty()) else {
                continue;
            };
            let activity = individual.entry(user.id.clone()).or_default();
            activity.request_count += 1;
            match request.status {
                RequestStatus::Approved => activity.approved_count += 1,
                RequestStatus::Pending => activity.pending_count += 1,
                _ => {}
            }
            if request.created() > activity.last_request {
                activity.last_request = request.created();
            }
        }

        let count = |role: Role| users.iter().filter(|u| u.role == role).count();

        Self {
            total: users.len(),
            students: count(Role::Student),
            faculty: count(Role::Faculty),
            admins: count(Role::Admin),
            individual,
        }
    }

    pub fn activity(&self, user_id: &str) -> UserActivity {
        self.individual.get(user_id).cloned().unwrap_or_default()
    }
}
