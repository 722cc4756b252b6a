// src/models/resource.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    #[default]
    Available,
    Booked,
    Maintenance,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Available => "available",
            ResourceStatus::Booked => "booked",
            ResourceStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ResourceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(ResourceStatus::Available),
            "booked" => Ok(ResourceStatus::Booked),
            "maintenance" => Ok(ResourceStatus::Maintenance),
            other => Err(format!("unknown resource status '{other}'")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Total units owned by the department.
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub available_quantity: u32,
    #[serde(default)]
    pub currently_booked: Option<u32>,
    #[serde(default)]
    pub status: ResourceStatus,
}

impl Resource {
    /// Units that may be requested right now; the backend reports `0` for fully
    /// booked items but the request form still offers a single unit.
    pub fn requestable_units(&self) -> u32 {
        if self.available_quantity > 0 {
            self.available_quantity
        } else {
            1
        }
    }
}

/// Resource summary embedded in request payloads.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ResourceSummary {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
}

/// Body for `POST /resources` and `PUT /resources/{id}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResourceDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    pub quantity: u32,
    pub status: ResourceStatus,
}

impl ResourceDraft {
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            name: resource.name.clone(),
            description: resource.description.clone(),
            category: resource.category.clone(),
            quantity: resource.quantity,
            status: resource.status,
        }
    }

    /// Names every required field that is blank or zero.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.category.trim().is_empty() {
            missing.push("category");
        }
        if self.quantity == 0 {
            missing.push("quantity");
        }
        missing
    }
}
