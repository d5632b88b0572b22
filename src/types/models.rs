use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ElementKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-text status label, not a foreign key.
    pub status: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

/// Requirement row with lookup names resolved by the store's joins.
#[derive(Debug, Clone, Serialize)]
pub struct Requirement {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub type_id: i64,
    pub type_name: Option<String>,
    pub criteria: String,
    pub priority_id: Option<i64>,
    pub priority_name: Option<String>,
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
    pub origin: Option<String>,
    pub preconditions: Option<String>,
    pub project_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UseCase {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Comma-joined actor list.
    pub actors: String,
    pub preconditions: String,
    pub main_flow: Value,
    pub alternate_flows: Value,
    pub postconditions: Option<String>,
    pub special_requirements: Option<String>,
    pub risks: Option<String>,
    pub project_id: i64,
    pub priority_id: Option<i64>,
    pub priority_name: Option<String>,
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStory {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub actor_role: Option<String>,
    pub action: Option<String>,
    pub benefit: Option<String>,
    pub acceptance_criteria: String,
    pub priority_id: Option<i64>,
    pub priority_name: Option<String>,
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
    pub business_value: Option<i64>,
    pub dependencies: Option<String>,
    pub components: Option<String>,
    pub notes: Option<String>,
    pub project_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
}

/// Directed, typed edge between two same-kind entities, with the relation
/// type and destination names resolved for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct RelationEdge {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub type_id: i64,
    pub type_name: Option<String>,
    pub target_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryEstimation {
    pub id: i64,
    pub story_id: i64,
    pub type_id: i64,
    pub type_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Priority {
    pub id: i64,
    pub name: String,
    pub level: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
    pub id: i64,
    pub name: String,
    pub order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElementStatus {
    pub id: i64,
    pub name: String,
    pub kind: ElementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub active: bool,
}

/// Row shape shared by the four name-plus-description catalogs.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub active: bool,
}

// Write-side inputs. The store assigns ids and timestamps.

#[derive(Debug, Clone)]
pub struct NewRequirement {
    pub name: String,
    pub description: String,
    pub type_id: i64,
    pub criteria: String,
    pub priority_id: Option<i64>,
    pub status_id: Option<i64>,
    pub origin: String,
    pub preconditions: String,
    pub project_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewUseCase {
    pub name: String,
    pub description: String,
    pub actors: String,
    pub preconditions: String,
    pub main_flow: Value,
    pub alternate_flows: Value,
    pub postconditions: String,
    pub special_requirements: String,
    pub risks: String,
    pub project_id: i64,
    pub priority_id: Option<i64>,
    pub status_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewUserStory {
    pub title: String,
    pub description: String,
    pub actor_role: String,
    pub action: String,
    pub benefit: String,
    pub acceptance_criteria: String,
    pub priority_id: Option<i64>,
    pub status_id: Option<i64>,
    pub business_value: Option<i64>,
    pub dependencies: String,
    pub components: String,
    pub notes: String,
    pub project_id: i64,
}

/// A candidate relation entry from a create/update payload. Entries that do
/// not resolve (or point back at the source) are skipped, never reported.
#[derive(Debug, Clone)]
pub struct RelationInput {
    pub target_id: i64,
    pub type_id: i64,
    pub description: String,
}

/// A candidate estimation entry. The value is already parsed and positive;
/// the type is resolved (active-only) inside the write transaction.
#[derive(Debug, Clone)]
pub struct EstimationInput {
    pub type_id: i64,
    pub value: f64,
}
