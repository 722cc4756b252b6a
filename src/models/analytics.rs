use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct RoleStats {
    #[serde(default)]
    pub faculty: u32,
    #[serde(default)]
    pub student: u32,
    #[serde(default)]
    pub admin: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PriorityStats {
    #[serde(default)]
    pub urgent: u32,
    #[serde(default)]
    pub research: u32,
    #[serde(default)]
    pub standard: u32,
}

/// `GET /stakeholder-analytics`, shown to administrators as fetched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StakeholderAnalytics {
    #[serde(default)]
    pub total_requests: u32,
    #[serde(default)]
    pub role_stats: RoleStats,
    #[serde(default)]
    pub priority_stats: PriorityStats,
    #[serde(default)]
    pub conflicting_requests: u32,
    #[serde(default)]
    pub conflict_details: Vec<serde_json::Value>,
    #[serde(default = "full_compliance")]
    pub compliance_rate: f64,
}

fn full_compliance() -> f64 {
    100.0
}
