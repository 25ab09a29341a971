use serde::{Deserialize, Serialize};

/// A suggested cycling route published by an admin. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub route_type: String,
    #[serde(default)]
    pub start_location: String,
    #[serde(default)]
    pub end_location: String,
    #[serde(default)]
    pub distance: String,
    #[serde(default)]
    pub time_estimate: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub map_embed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub view_count: u64,
}
