use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::UserSummary;
use crate::projects::repo_types::Project;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub skills_required: Option<Vec<String>>,
    pub budget: Option<f64>,
    pub deadline: Option<String>,
    pub client_id: Option<Uuid>,
}

/// Partial update; absent fields stay as they are.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub client_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub skills_required: Option<Vec<String>>,
    pub budget: Option<f64>,
    pub deadline: Option<String>,
    pub status: Option<String>,
}

/// `GET /projects` filters, echoed back in the response. Status and category
/// are plain equality filters: blank means absent, unknown values match nothing.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProjectQuery {
    pub client_id: Option<Uuid>,
}

/// A project with its user references resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub client: Option<UserSummary>,
    pub freelancer: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub project: ProjectView,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectView>,
    pub total: usize,
    pub filters: ListProjectsQuery,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
