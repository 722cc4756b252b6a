// src/engine/catalog.rs
use crate::models::resource::{Resource, ResourceStatus};
use crate::models::user::{Role, User};

#[derive(Debug, Clone, Default)]
pub struct ResourceQuery {
    pub search: Option<String>,
    pub status: Option<ResourceStatus>,
    pub category: Option<String>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn normalized(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

pub fn filter_resources<'a>(resources: &'a [Resource], query: &ResourceQuery) -> Vec<&'a Resource> {
    let needle = normalized(&query.search);

    resources
        .iter()
        .filter(|r| {
            needle.as_deref().map_or(true, |n| {
                contains_ci(&r.name, n) || contains_ci(&r.description, n) || contains_ci(&r.category, n)
            })
        })
        .filter(|r| query.status.map_or(true, |status| r.status == status))
        .filter(|r| query.category.as_deref().map_or(true, |c| r.category == c))
        .collect()
}

/// Distinct categories in the order they first appear.
pub fn categories(resources: &[Resource]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for resource in resources {
        if !seen.iter().any(|c| c == &resource.category) {
            seen.push(resource.category.clone());
        }
    }
    seen
}

pub fn filter_users<'a>(users: &'a [User], search: Option<String>, role: Option<Role>) -> Vec<&'a User> {
    let needle = normalized(&search);

    users
        .iter()
        .filter(|u| {
            needle
                .as_deref()
                .map_or(true, |n| contains_ci(&u.name, n) || contains_ci(&u.email, n))
        })
        .filter(|u| role.map_or(true, |role| u.role == role))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, name: &str, category: &str, status: ResourceStatus) -> Resource {
        Resource {
            id: id.into(),
            name: name.into(),
            description: format!("{name} for loan"),
            category: category.into(),
            quantity: 3,
            available_quantity: 3,
            currently_booked: None,
            status,
        }
    }

    #[test]
    fn search_status_and_category_combine() {
        let resources = vec![
            resource("1", "Laptop", "Computing", ResourceStatus::Available),
            resource("2", "Projector", "AV", ResourceStatus::Maintenance),
            resource("3", "Tablet", "Computing", ResourceStatus::Booked),
        ];

        let query = ResourceQuery { search: Some("  COMPUT ".into()), ..Default::default() };
        assert_eq!(filter_resources(&resources, &query).len(), 2);

        let query = ResourceQuery {
            search: Some("comput".into()),
            status: Some(ResourceStatus::Booked),
            category: None,
        };
        let hits = filter_resources(&resources, &query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "3");

        let query = ResourceQuery { category: Some("AV".into()), ..Default::default() };
        assert_eq!(filter_resources(&resources, &query)[0].name, "Projector");

        assert_eq!(categories(&resources), ["Computing", "AV"]);
    }

    #[test]
    fn user_search_covers_name_and_email() {
        let users: Vec<User> = serde_json::from_value(serde_json::json!([
            { "_id": "1", "name": "Ada Lovelace", "email": "ada@uni.edu", "role": "faculty" },
            { "_id": "2", "name": "Alan", "email": "turing@uni.edu", "role": "student" },
            { "_id": "3", "name": "Root", "email": "admin@uni.edu", "role": "admin" }
        ]))
        .unwrap();

        assert_eq!(filter_users(&users, Some("TURING".into()), None)[0].id, "2");
        assert_eq!(filter_users(&users, None, Some(Role::Admin))[0].id, "3");
        assert_eq!(filter_users(&users, Some("a".into()), Some(Role::Faculty)).len(), 1);
        assert_eq!(filter_users(&users, Some("".into()), None).len(), 3);
    }
}
