mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Reads return active rows only; soft-deleted rows are invisible unless a
/// method says otherwise. Existence checks come back as `Option` so callers
/// decide how a missing row maps to the wire (400 vs 404 vs silent skip).
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;

    // Simple catalogs (requirement types, relation types, estimation types)
    fn create_catalog_item(&self, kind: CatalogKind, name: &str, description: &str)
    -> Result<i64>;
    fn list_catalog_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>>;
    fn get_catalog_item(&self, kind: CatalogKind, id: i64) -> Result<Option<CatalogItem>>;
    fn update_catalog_item(
        &self,
        kind: CatalogKind,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool>;
    fn disable_catalog_item(&self, kind: CatalogKind, id: i64) -> Result<bool>;

    // Priority operations
    fn create_priority(&self, name: &str, level: i64, description: &str) -> Result<i64>;
    fn list_priorities(&self) -> Result<Vec<Priority>>;
    fn get_priority(&self, id: i64) -> Result<Option<Priority>>;
    fn update_priority(
        &self,
        id: i64,
        name: Option<&str>,
        level: Option<i64>,
        description: Option<&str>,
    ) -> Result<bool>;
    fn disable_priority(&self, id: i64) -> Result<bool>;

    // Project status operations
    fn create_project_status(&self, name: &str, order: i64, description: &str) -> Result<i64>;
    fn list_project_statuses(&self) -> Result<Vec<ProjectStatus>>;
    fn get_project_status(&self, id: i64) -> Result<Option<ProjectStatus>>;
    fn update_project_status(
        &self,
        id: i64,
        name: Option<&str>,
        order: Option<i64>,
        description: Option<&str>,
    ) -> Result<bool>;
    fn disable_project_status(&self, id: i64) -> Result<bool>;

    // Element status operations
    fn create_element_status(
        &self,
        name: &str,
        kind: ElementKind,
        description: &str,
    ) -> Result<i64>;
    fn list_element_statuses(&self) -> Result<Vec<ElementStatus>>;
    fn get_element_status(&self, id: i64) -> Result<Option<ElementStatus>>;
    fn get_element_status_for_kind(
        &self,
        id: i64,
        kind: ElementKind,
    ) -> Result<Option<ElementStatus>>;
    /// The fallback status for new elements of this kind: the lowest-id
    /// active row, which the seed makes the kind's 'Pendiente'.
    fn default_element_status(&self, kind: ElementKind) -> Result<Option<i64>>;
    fn update_element_status(
        &self,
        id: i64,
        name: Option<&str>,
        kind: Option<ElementKind>,
        description: Option<&str>,
    ) -> Result<bool>;
    fn disable_element_status(&self, id: i64) -> Result<bool>;

    // Project operations (owner-scoped except where noted)
    fn create_project(
        &self,
        name: &str,
        description: &str,
        status: &str,
        user_id: &str,
    ) -> Result<i64>;
    fn list_projects(&self, user_id: &str) -> Result<Vec<Project>>;
    fn get_project(&self, id: i64, user_id: &str) -> Result<Option<Project>>;
    /// Existence check without ownership scoping, used when validating the
    /// `proyecto_id` foreign key of child entities.
    fn get_active_project(&self, id: i64) -> Result<Option<Project>>;
    fn update_project(&self, project: &Project) -> Result<()>;
    fn soft_delete_project(&self, id: i64, user_id: &str) -> Result<bool>;

    // Requirement operations
    /// Inserts the requirement plus the resolvable relation entries in one
    /// transaction. Returns the new id and the number of edges created.
    fn create_requirement(
        &self,
        req: &NewRequirement,
        relations: &[RelationInput],
    ) -> Result<(i64, usize)>;
    fn get_requirement(&self, id: i64) -> Result<Option<Requirement>>;
    fn list_requirements(&self, project_id: i64) -> Result<Vec<Requirement>>;
    /// When `relations` is `Some`, every existing outgoing edge is dropped
    /// and the submitted list recreated from scratch (wholesale replace).
    fn update_requirement(
        &self,
        req: &Requirement,
        relations: Option<&[RelationInput]>,
    ) -> Result<usize>;
    /// Soft-deletes the row and hard-deletes edges touching it in either
    /// direction.
    fn soft_delete_requirement(&self, id: i64) -> Result<()>;
    fn list_requirement_relations(&self, id: i64) -> Result<Vec<RelationEdge>>;

    // Use-case operations (parallel to requirements)
    fn create_use_case(
        &self,
        use_case: &NewUseCase,
        relations: &[RelationInput],
    ) -> Result<(i64, usize)>;
    fn get_use_case(&self, id: i64) -> Result<Option<UseCase>>;
    fn list_use_cases(&self, project_id: i64) -> Result<Vec<UseCase>>;
    fn update_use_case(
        &self,
        use_case: &UseCase,
        relations: Option<&[RelationInput]>,
    ) -> Result<usize>;
    fn soft_delete_use_case(&self, id: i64) -> Result<()>;
    /// Outgoing edges whose destination is still active.
    fn list_use_case_relations(&self, id: i64) -> Result<Vec<RelationEdge>>;

    // User-story operations
    /// Inserts the story plus valid estimation entries (no per-type
    /// deduplication on this path). Returns the new id and the created rows.
    fn create_story(
        &self,
        story: &NewUserStory,
        estimations: &[EstimationInput],
    ) -> Result<(i64, Vec<StoryEstimation>)>;
    fn get_story(&self, id: i64) -> Result<Option<UserStory>>;
    fn list_stories(&self, project_id: i64) -> Result<Vec<UserStory>>;
    /// When `estimations` is `Some`: deactivate everything, then upsert by
    /// (story, type) — reuse an existing row in any state over inserting.
    /// Returns the number of entries applied.
    fn update_story(
        &self,
        story: &UserStory,
        estimations: Option<&[EstimationInput]>,
    ) -> Result<usize>;
    /// Soft-deletes the story and hard-deletes all of its estimation rows,
    /// active or not.
    fn soft_delete_story(&self, id: i64) -> Result<()>;
    fn list_story_estimations(&self, story_id: i64) -> Result<Vec<StoryEstimation>>;
}
