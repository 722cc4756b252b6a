// src/engine/policy.rs
use crate::models::policy::{Policy, PolicyTable, DEFAULT_MAX_DURATION, DEFAULT_MAX_QUANTITY};
use crate::models::request::Priority;
use crate::models::resource::Resource;
use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySource {
    /// Limits came from `GET /stakeholder-policies`.
    Server,
    /// Backend copy unavailable, built-in role defaults were used.
    Builtin,
}

/// Limits that apply to one requester for one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPolicy {
    pub max_duration: u32,
    pub default_duration: u32,
    /// `None` means no policy cap (administrators without a resource in view).
    pub max_quantity: Option<u32>,
    pub priority_access: bool,
    pub can_reserve: bool,
    pub allowed_priorities: Vec<Priority>,
    pub source: PolicySource,
}

impl ResolvedPolicy {
    pub fn default_priority(&self) -> Priority {
        self.allowed_priorities
            .first()
            .copied()
            .unwrap_or(Priority::Standard)
    }

    pub fn allows(&self, priority: Priority) -> bool {
        self.allowed_priorities.contains(&priority)
    }
}

/// Default checkout length offered on the request form.
pub fn default_duration(role: Role) -> u32 {
    match role {
        Role::Faculty => 14,
        Role::Student | Role::Admin | Role::Unknown => 7,
    }
}

fn can_reserve(role: Role) -> bool {
    match role {
        Role::Faculty | Role::Admin => true,
        Role::Student | Role::Unknown => false,
    }
}

/// Hardcoded limits, used only when the backend table is unavailable.
fn builtin(role: Role) -> (u32, Option<u32>, bool, Vec<Priority>) {
    match role {
        Role::Faculty => (90, Some(10), true, Priority::ALL.to_vec()),
        Role::Student => (30, Some(3), false, vec![Priority::Standard]),
        Role::Admin => (365, None, true, Priority::ALL.to_vec()),
        Role::Unknown => (7, Some(1), false, vec![Priority::Standard]),
    }
}

fn clamp_to_resource(limit: Option<u32>, resource: Option<&Resource>) -> Option<u32> {
    match resource {
        Some(resource) => {
            let units = resource.requestable_units();
            Some(limit.map_or(units, |limit| limit.min(units)))
        }
        None => limit,
    }
}

fn or_default(value: u32, default: u32) -> u32 {
    if value == 0 {
        default
    } else {
        value
    }
}

fn from_server(role: Role, policy: &Policy, resource: Option<&Resource>) -> ResolvedPolicy {
    let allowed_priorities = if policy.allowed_priorities.is_empty() {
        vec![Priority::Standard]
    } else {
        policy.allowed_priorities.clone()
    };

    ResolvedPolicy {
        max_duration: or_default(policy.max_duration, DEFAULT_MAX_DURATION),
        default_duration: default_duration(role),
        max_quantity: clamp_to_resource(
            Some(or_default(policy.max_quantity, DEFAULT_MAX_QUANTITY)),
            resource,
        ),
        priority_access: policy.priority_access,
        can_reserve: can_reserve(role),
        allowed_priorities,
        source: PolicySource::Server,
    }
}

/// Maps a role to concrete limits. A server policy for the role wins; otherwise
/// the built-in defaults apply. With a resource in view the quantity cap is
/// clamped to what is actually available.
pub fn resolve_policy(
    role: Role,
    server: Option<&PolicyTable>,
    resource: Option<&Resource>,
) -> ResolvedPolicy {
    if let Some(policy) = server.and_then(|table| table.get(role)) {
        return from_server(role, policy, resource);
    }

    let (max_duration, max_quantity, priority_access, allowed_priorities) = builtin(role);
    let max_quantity = match role {
        Role::Unknown => max_quantity,
        _ => clamp_to_resource(max_quantity, resource),
    };

    ResolvedPolicy {
        max_duration,
        default_duration: default_duration(role),
        max_quantity,
        priority_access,
        can_reserve: can_reserve(role),
        allowed_priorities,
        source: PolicySource::Builtin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resource::ResourceStatus;

    fn resource(available: u32) -> Resource {
        Resource {
            id: "res1".into(),
            name: "3D Printer".into(),
            description: "PLA only".into(),
            category: "Fabrication".into(),
            quantity: 20,
            available_quantity: available,
            currently_booked: None,
            status: ResourceStatus::Available,
        }
    }

    #[test]
    fn builtin_defaults_per_role() {
        let faculty = resolve_policy(Role::Faculty, None, None);
        assert_eq!(faculty.max_duration, 90);
        assert_eq!(faculty.default_duration, 14);
        assert_eq!(faculty.max_quantity, Some(10));
        assert!(faculty.priority_access);
        assert_eq!(faculty.allowed_priorities, Priority::ALL.to_vec());
        assert_eq!(faculty.source, PolicySource::Builtin);

        let student = resolve_policy(Role::Student, None, None);
        assert_eq!(
            (student.max_duration, student.default_duration, student.max_quantity),
            (30, 7, Some(3))
        );
        assert!(!student.priority_access);
        assert_eq!(student.allowed_priorities, vec![Priority::Standard]);
        assert!(!student.can_reserve);

        let admin = resolve_policy(Role::Admin, None, None);
        assert_eq!((admin.max_duration, admin.max_quantity), (365, None));
        assert!(admin.priority_access);

        let unknown = resolve_policy(Role::Unknown, None, None);
        assert_eq!((unknown.max_duration, unknown.max_quantity), (7, Some(1)));
        assert_eq!(unknown.default_priority(), Priority::Standard);
    }

    #[test]
    fn builtin_defaults_hold_with_ample_availability() {
        let res = resource(50);
        assert_eq!(resolve_policy(Role::Faculty, None, Some(&res)).max_quantity, Some(10));
        assert_eq!(resolve_policy(Role::Student, None, Some(&res)).max_quantity, Some(3));
        assert_eq!(resolve_policy(Role::Admin, None, Some(&res)).max_quantity, Some(50));
        assert_eq!(resolve_policy(Role::Unknown, None, Some(&res)).max_quantity, Some(1));
    }

    #[test]
    fn server_policy_is_clamped_to_availability() {
        let table = PolicyTable {
            student: Some(Policy {
                max_duration: 21,
                max_quantity: 5,
                priority_access: false,
                allowed_priorities: vec![Priority::Standard],
            }),
            ..PolicyTable::default()
        };

        let resolved = resolve_policy(Role::Student, Some(&table), Some(&resource(2)));
        assert_eq!(resolved.source, PolicySource::Server);
        assert_eq!(resolved.max_duration, 21);
        assert_eq!(resolved.max_quantity, Some(2));
        assert_eq!(resolved.default_duration, 7);

        // fully booked resource still offers one unit
        let resolved = resolve_policy(Role::Student, Some(&table), Some(&resource(0)));
        assert_eq!(resolved.max_quantity, Some(1));
    }

    #[test]
    fn role_missing_from_server_table_uses_builtin() {
        let table = PolicyTable {
            admin: PolicyTable::builtin().admin,
            ..PolicyTable::default()
        };
        let resolved = resolve_policy(Role::Faculty, Some(&table), None);
        assert_eq!(resolved.source, PolicySource::Builtin);
        assert_eq!(resolved.max_duration, 90);
    }

    #[test]
    fn zeroed_server_values_fall_back() {
        let table = PolicyTable {
            faculty: Some(Policy {
                max_duration: 0,
                max_quantity: 0,
                priority_access: true,
                allowed_priorities: vec![],
            }),
            ..PolicyTable::default()
        };
        let resolved = resolve_policy(Role::Faculty, Some(&table), None);
        assert_eq!(resolved.max_duration, 7);
        assert_eq!(resolved.max_quantity, Some(1));
        assert_eq!(resolved.allowed_priorities, vec![Priority::Standard]);
        assert_eq!(resolved.default_duration, 14);
    }
}
