// src/models/policy.rs
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::request::Priority;
use super::user::Role;

pub const DEFAULT_MAX_DURATION: u32 = 7;
pub const DEFAULT_MAX_QUANTITY: u32 = 1;

fn default_max_duration() -> u32 {
    DEFAULT_MAX_DURATION
}

fn default_max_quantity() -> u32 {
    DEFAULT_MAX_QUANTITY
}

fn default_priorities() -> Vec<Priority> {
    vec![Priority::Standard]
}

/// Role-scoped checkout limits as stored on the backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default = "default_max_duration")]
    pub max_duration: u32, // days
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32, // units
    #[serde(default)]
    pub priority_access: bool,
    #[serde(default = "default_priorities")]
    pub allowed_priorities: Vec<Priority>,
}

/// `GET /stakeholder-policies` payload, keyed by role.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PolicyTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty: Option<Policy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<Policy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<Policy>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("{role} policy is missing")]
    MissingRole { role: Role },

    #[error("{role} {field} must be between {min} and {max} (got {value})")]
    OutOfBounds {
        role: Role,
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("{role} policy must allow at least one priority")]
    NoPriorities { role: Role },
}

impl PolicyTable {
    pub fn get(&self, role: Role) -> Option<&Policy> {
        match role {
            Role::Faculty => self.faculty.as_ref(),
            Role::Student => self.student.as_ref(),
            Role::Admin => self.admin.as_ref(),
            Role::Unknown => None,
        }
    }

    /// The values the policy editor starts from when the backend has none.
    pub fn builtin() -> Self {
        Self {
            faculty: Some(Policy {
                max_duration: 90,
                max_quantity: 10,
                priority_access: true,
                allowed_priorities: Priority::ALL.to_vec(),
            }),
            student: Some(Policy {
                max_duration: 30,
                max_quantity: 3,
                priority_access: false,
                allowed_priorities: vec![Priority::Standard],
            }),
            admin: Some(Policy {
                max_duration: 365,
                max_quantity: 999_999,
                priority_access: true,
                allowed_priorities: Priority::ALL.to_vec(),
            }),
        }
    }

    /// Editor bounds per role as `(duration, quantity)`.
    fn bounds(role: Role) -> (RangeInclusive<u32>, RangeInclusive<u32>) {
        match role {
            Role::Faculty => (1..=365, 1..=100),
            Role::Student => (1..=90, 1..=20),
            Role::Admin => (1..=999, 1..=999_999),
            Role::Unknown => (1..=7, 1..=1),
        }
    }

    /// Checks a table before it replaces the backend copy.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for role in [Role::Faculty, Role::Student, Role::Admin] {
            let policy = self.get(role).ok_or(PolicyError::MissingRole { role })?;
            let (duration, quantity) = Self::bounds(role);

            check_range(role, "maxDuration", policy.max_duration, &duration)?;
            check_range(role, "maxQuantity", policy.max_quantity, &quantity)?;

            if policy.allowed_priorities.is_empty() {
                return Err(PolicyError::NoPriorities { role });
            }
        }
        Ok(())
    }
}

fn check_range(
    role: Role,
    field: &'static str,
    value: u32,
    range: &RangeInclusive<u32>,
) -> Result<(), PolicyError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(PolicyError::OutOfBounds {
            role,
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
