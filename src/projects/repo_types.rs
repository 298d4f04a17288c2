use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Open,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "open" => Some(Self::Open),
            "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_category")]
pub enum ProjectCategory {
    #[serde(rename = "Web Development")]
    #[sqlx(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Graphic Design")]
    #[sqlx(rename = "Graphic Design")]
    GraphicDesign,
    #[serde(rename = "Content Writing")]
    #[sqlx(rename = "Content Writing")]
    ContentWriting,
    #[serde(rename = "Digital Marketing")]
    #[sqlx(rename = "Digital Marketing")]
    DigitalMarketing,
    Other,
}

impl ProjectCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Web Development" => Some(Self::WebDevelopment),
            "Graphic Design" => Some(Self::GraphicDesign),
            "Content Writing" => Some(Self::ContentWriting),
            "Digital Marketing" => Some(Self::DigitalMarketing),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Project row. `assigned_freelancer` stays `None` while the project is open.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: ProjectCategory,
    pub skills_required: Vec<String>,
    pub budget: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub status: ProjectStatus,
    pub client_id: Uuid,
    pub assigned_freelancer: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub category: ProjectCategory,
    pub skills_required: Vec<String>,
    pub budget: f64,
    pub deadline: OffsetDateTime,
    pub client_id: Uuid,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProjectCategory>,
    pub skills_required: Option<Vec<String>>,
    pub budget: Option<f64>,
    pub deadline: Option<OffsetDateTime>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub category: Option<ProjectCategory>,
    pub client_id: Option<Uuid>,
}

/// The slice of a project embedded in proposal responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: Uuid,
    pub title: String,
    pub budget: f64,
    pub status: ProjectStatus,
    pub client_id: Uuid,
}

impl From<&Project> for ProjectSummary {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id,
            title: p.title.clone(),
            budget: p.budget,
            status: p.status,
            client_id: p.client_id,
        }
    }
}
