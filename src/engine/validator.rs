// src/engine/validator.rs
use std::fmt;

use chrono::{Days, NaiveDate};

use super::policy::ResolvedPolicy;
use crate::models::request::{NewRequest, Priority};
use crate::models::resource::Resource;
use crate::models::user::Role;

pub const MAX_NOTES_LEN: usize = 500;

/// What the requester typed into the checkout form.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDraft {
    pub quantity: u32,
    pub duration: u32, // days
    pub notes: String,
    pub priority: Priority,
}

impl RequestDraft {
    /// Form defaults: one unit, the role's default duration, first allowed priority.
    pub fn for_policy(policy: &ResolvedPolicy) -> Self {
        Self {
            quantity: 1,
            duration: policy.default_duration,
            notes: String::new(),
            priority: policy.default_priority(),
        }
    }
}

/// Field-scoped messages; an empty set means the draft may be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub quantity: Option<String>,
    pub duration: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.duration.is_none()
            && self.priority.is_none()
            && self.notes.is_none()
    }

    pub fn messages(&self) -> Vec<(&'static str, &str)> {
        [
            ("quantity", &self.quantity),
            ("duration", &self.duration),
            ("priority", &self.priority),
            ("notes", &self.notes),
        ]
        .into_iter()
        .filter_map(|(field, message)| message.as_deref().map(|m| (field, m)))
        .collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.messages().into_iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub errors: FieldErrors,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Unknown => "User",
        other => other.as_str(),
    }
}

fn check_quantity(quantity: u32, policy: &ResolvedPolicy, resource: &Resource, role: Role) -> Option<String> {
    if quantity < 1 {
        return Some("Quantity must be at least 1".to_string());
    }
    if quantity > resource.available_quantity {
        return Some(format!("Only {} units available", resource.available_quantity));
    }
    match policy.max_quantity {
        Some(max) if quantity > max => Some(format!(
            "{} can request maximum {} units",
            role_label(role),
            max
        )),
        _ => None,
    }
}

fn check_duration(duration: u32, policy: &ResolvedPolicy, role: Role) -> Option<String> {
    if duration < 1 {
        return Some("Duration must be at least 1 day".to_string());
    }
    if duration > policy.max_duration {
        return Some(format!(
            "{} can checkout for maximum {} days",
            role_label(role),
            policy.max_duration
        ));
    }
    None
}

/// Checks a draft against the resolved policy and the resource's availability.
/// Advisory only: the backend re-checks every submission.
pub fn validate(
    draft: &RequestDraft,
    policy: &ResolvedPolicy,
    resource: &Resource,
    role: Role,
) -> ValidationOutcome {
    let mut errors = FieldErrors {
        quantity: check_quantity(draft.quantity, policy, resource, role),
        duration: check_duration(draft.duration, policy, role),
        ..FieldErrors::default()
    };

    if !policy.allows(draft.priority) {
        errors.priority = Some(format!(
            "{} priority is not available for {}",
            draft.priority,
            role_label(role)
        ));
    }

    if draft.notes.trim().chars().count() > MAX_NOTES_LEN {
        errors.notes = Some(format!("Notes must be at most {MAX_NOTES_LEN} characters"));
    }

    ValidationOutcome { errors }
}

/// Return date is plain calendar arithmetic on the submission date.
pub fn return_date(submitted_on: NaiveDate, duration: u32) -> Option<NaiveDate> {
    submitted_on.checked_add_days(Days::new(u64::from(duration)))
}

/// Validates the draft and, when it passes, builds the `POST /requests` body.
pub fn prepare_submission(
    draft: &RequestDraft,
    policy: &ResolvedPolicy,
    resource: &Resource,
    role: Role,
    submitted_on: NaiveDate,
) -> Result<NewRequest, FieldErrors> {
    let mut outcome = validate(draft, policy, resource, role);
    let due = return_date(submitted_on, draft.duration);
    if due.is_none() && outcome.errors.duration.is_none() {
        outcome.errors.duration = Some("Duration is out of range".to_string());
    }

    match due {
        Some(return_date) if outcome.is_valid() => Ok(NewRequest {
            resource_id: resource.id.clone(),
            quantity: draft.quantity,
            duration: draft.duration,
            return_date,
            notes: draft.notes.trim().to_string(),
            priority: draft.priority,
            user_role: role,
        }),
        _ => Err(outcome.errors),
    }
}
