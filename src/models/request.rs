// src/models/request.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::resource::ResourceSummary;
use super::timestamp;
use super::user::{Role, UserSummary};

/// Shortest denial reason the backend accepts.
pub const MIN_DENIAL_REASON_LEN: usize = 10;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
    ReturnRequested,
    Returned,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
            RequestStatus::ReturnRequested => "return_requested",
            RequestStatus::Returned => "returned",
        }
    }

    /// `pending → {approved, denied}`, `approved → return_requested`,
    /// `return_requested → returned`. `denied` and `returned` are terminal.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Denied)
                | (RequestStatus::Approved, RequestStatus::ReturnRequested)
                | (RequestStatus::ReturnRequested, RequestStatus::Returned)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    Research,
    Standard,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Urgent, Priority::Research, Priority::Standard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::Research => "research",
            Priority::Standard => "standard",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Urgent => "Urgent Research",
            Priority::Research => "Research Priority",
            Priority::Standard => "Standard Priority",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(Priority::Urgent),
            "research" => Ok(Priority::Research),
            "standard" => Ok(Priority::Standard),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub resource: Option<ResourceSummary>,
    #[serde(default)]
    pub user: Option<UserSummary>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub duration: Option<u32>, // days
    pub status: RequestStatus,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Lower sorts first among pending requests.
    #[serde(default)]
    pub priority_score: Option<f64>,
    #[serde(default)]
    pub denial_reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub return_date: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub return_requested_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub returned_at: Option<DateTime<Utc>>,
    // Only present on /overdue-returns and /due-returns rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_overdue: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_due: Option<i64>,
}

impl Request {
    /// Creation time used for ordering; older payloads only carry `requestedAt`.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.requested_at)
    }

    pub fn resource_name(&self) -> &str {
        self.resource
            .as_ref()
            .map(|r| r.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown Resource")
    }

    pub fn requester_name(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown User")
    }

    pub fn requester_role(&self) -> Role {
        self.user.as_ref().map(|u| u.role).unwrap_or_default()
    }
}

/// Body for `POST /requests`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    pub resource_id: String,
    pub quantity: u32,
    pub duration: u32,
    pub return_date: NaiveDate,
    pub notes: String,
    pub priority: Priority,
    pub user_role: Role,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot move a {from} request to {to}")]
    IllegalTransition { from: RequestStatus, to: RequestStatus },

    #[error("only administrators can mark a request {0}")]
    AdminOnly(RequestStatus),

    #[error("Please provide a reason for denial")]
    MissingDenialReason,

    #[error("Denial reason must be at least 10 characters")]
    DenialReasonTooShort,
}

/// A state change the client proposes with `PUT /requests/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTransition {
    Approve,
    Deny { reason: String },
    RequestReturn,
    ConfirmReturn,
}

impl RequestTransition {
    pub fn target(&self) -> RequestStatus {
        match self {
            RequestTransition::Approve => RequestStatus::Approved,
            RequestTransition::Deny { .. } => RequestStatus::Denied,
            RequestTransition::RequestReturn => RequestStatus::ReturnRequested,
            RequestTransition::ConfirmReturn => RequestStatus::Returned,
        }
    }

    /// Builds a denial after trimming and checking the reason.
    pub fn deny(reason: &str) -> Result<Self, TransitionError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TransitionError::MissingDenialReason);
        }
        if reason.chars().count() < MIN_DENIAL_REASON_LEN {
            return Err(TransitionError::DenialReasonTooShort);
        }
        Ok(RequestTransition::Deny { reason: reason.to_string() })
    }

    /// Advisory check before the mutation is sent; the backend stays authoritative.
    pub fn check(&self, current: RequestStatus, actor: Role) -> Result<(), TransitionError> {
        let target = self.target();
        if !current.can_transition_to(target) {
            return Err(TransitionError::IllegalTransition { from: current, to: target });
        }
        match self {
            RequestTransition::RequestReturn => Ok(()),
            _ if actor.is_admin() => Ok(()),
            _ => Err(TransitionError::AdminOnly(target)),
        }
    }
}

impl Serialize for RequestTransition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            status: RequestStatus,
            #[serde(skip_serializing_if = "Option::is_none")]
            denial_reason: Option<&'a str>,
        }

        let denial_reason = match self {
            RequestTransition::Deny { reason } => Some(reason.as_str()),
            _ => None,
        };
        Body { status: self.target(), denial_reason }.serialize(serializer)
    }
}

/// Response of `POST /check-overdue`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OverdueCheck {
    #[serde(default)]
    pub overdue_count: u32,
    #[serde(default)]
    pub due_count: u32,
}
