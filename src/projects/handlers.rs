use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::{parse_id, ApiError, AppJson, AppQuery},
    projects::{
        dto::{
            CreateProjectRequest, DeleteProjectQuery, ListProjectsQuery, MessageResponse,
            ProjectListResponse, ProjectResponse, UpdateProjectRequest,
        },
        services,
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/:id", get(get_project))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", post(create_project))
        .route("/projects/:id", put(update_project).delete(delete_project))
}

#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListProjectsQuery>,
) -> Result<Json<ProjectListResponse>, ApiError> {
    let projects = services::list_projects(&state, &query).await?;
    Ok(Json(ProjectListResponse {
        total: projects.len(),
        projects,
        filters: query,
    }))
}

#[instrument(skip(state))]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let id = parse_id(&id, "project")?;
    let project = services::get_project(&state, id).await?;
    Ok(Json(ProjectResponse {
        message: None,
        project,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    let project = services::create_project(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProjectResponse {
            message: Some("Project created successfully!".into()),
            project,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let id = parse_id(&id, "project")?;
    let project = services::update_project(&state, &user, id, payload).await?;
    Ok(Json(ProjectResponse {
        message: Some("Project updated successfully!".into()),
        project,
    }))
}

#[instrument(skip(state))]
pub async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppQuery(query): AppQuery<DeleteProjectQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, "project")?;
    services::delete_project(&state, &user, id, query.client_id).await?;
    Ok(Json(MessageResponse {
        message: "Project deleted successfully!".into(),
    }))
}
