use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        repo_types::{Role, UserSummary},
    },
    error::ApiError,
    projects::{
        dto::{CreateProjectRequest, ListProjectsQuery, ProjectView, UpdateProjectRequest},
        repo_types::{
            NewProject, Project, ProjectCategory, ProjectChanges, ProjectFilter, ProjectStatus,
        },
    },
    state::AppState,
    validation::{clean_list, parse_deadline, present, require_fields, Violations},
};

/// Hard cap on `GET /projects`.
pub const LIST_LIMIT: i64 = 50;

const BAD_CATEGORY: &str = "Category must be one of: Web Development, Graphic Design, \
     Content Writing, Digital Marketing, or Other";
const BAD_STATUS: &str = "Status must be: open, in-progress, or completed";

fn check_title(v: &mut Violations, title: &str) {
    v.length(
        title,
        5,
        100,
        "Title must be at least 5 characters",
        "Title cannot exceed 100 characters",
    );
}

fn check_description(v: &mut Violations, description: &str) {
    v.length(
        description,
        20,
        2000,
        "Description must be at least 20 characters",
        "Description cannot exceed 2000 characters",
    );
}

fn check_category(v: &mut Violations, raw: &str) -> Option<ProjectCategory> {
    let category = ProjectCategory::parse(raw);
    v.check(category.is_some(), BAD_CATEGORY);
    category
}

fn check_skills(v: &mut Violations, skills: &[String]) {
    v.check(
        (1..=10).contains(&skills.len()),
        "Project must have between 1 and 10 required skills",
    );
}

fn check_budget(v: &mut Violations, budget: f64) {
    if budget.is_nan() || budget < 5.0 {
        v.push("Minimum budget is $5");
    } else if budget > 50_000.0 {
        v.push("Maximum budget is $50,000");
    }
}

fn check_deadline(v: &mut Violations, raw: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
    match parse_deadline(raw) {
        Some(deadline) if deadline > now => Some(deadline),
        Some(_) => {
            v.push("Deadline must be in the future");
            None
        }
        None => {
            v.push("Deadline must be a valid date");
            None
        }
    }
}

fn validate_new(
    req: CreateProjectRequest,
    client_id: Uuid,
    now: OffsetDateTime,
) -> Result<NewProject, ApiError> {
    require_fields(
        "Missing required fields",
        &[
            ("title", present(&req.title)),
            ("description", present(&req.description)),
            ("category", present(&req.category)),
            ("budget", req.budget.is_some()),
            ("deadline", present(&req.deadline)),
        ],
    )?;

    let mut v = Violations::new();
    let title = req.title.unwrap_or_default().trim().to_string();
    check_title(&mut v, &title);
    let description = req.description.unwrap_or_default().trim().to_string();
    check_description(&mut v, &description);
    let category = check_category(&mut v, req.category.as_deref().unwrap_or_default());
    let skills_required = clean_list(req.skills_required.unwrap_or_default());
    check_skills(&mut v, &skills_required);
    let budget = req.budget.unwrap_or_default();
    check_budget(&mut v, budget);
    let deadline = check_deadline(&mut v, req.deadline.as_deref().unwrap_or_default(), now);

    let built = category.zip(deadline).map(|(category, deadline)| NewProject {
        title,
        description,
        category,
        skills_required,
        budget,
        deadline,
        client_id,
    });
    v.finish(built)
}

fn validate_changes(
    req: UpdateProjectRequest,
    existing: &Project,
    now: OffsetDateTime,
) -> Result<ProjectChanges, ApiError> {
    let mut v = Violations::new();
    let mut changes = ProjectChanges::default();

    if let Some(title) = req.title {
        let title = title.trim().to_string();
        check_title(&mut v, &title);
        changes.title = Some(title);
    }
    if let Some(description) = req.description {
        let description = description.trim().to_string();
        check_description(&mut v, &description);
        changes.description = Some(description);
    }
    if let Some(raw) = req.category {
        changes.category = check_category(&mut v, &raw);
    }
    if let Some(skills) = req.skills_required {
        let skills = clean_list(skills);
        check_skills(&mut v, &skills);
        changes.skills_required = Some(skills);
    }
    if let Some(budget) = req.budget {
        check_budget(&mut v, budget);
        changes.budget = Some(budget);
    }
    if let Some(raw) = req.deadline {
        changes.deadline = check_deadline(&mut v, &raw, now);
    }
    if let Some(raw) = req.status {
        match ProjectStatus::parse(&raw) {
            Some(ProjectStatus::Open) if existing.assigned_freelancer.is_some() => {
                v.push("Cannot reopen a project that has an assigned freelancer");
            }
            Some(status) => changes.status = Some(status),
            None => v.push(BAD_STATUS),
        }
    }

    v.finish(Some(changes))
}

/// `Some(None)` for a blank or absent value, `None` for one no project can carry.
fn equality_filter<T>(raw: Option<&str>, parse: fn(&str) -> Option<T>) -> Option<Option<T>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Some(None),
        Some(v) => parse(v).map(Some),
    }
}

/// Resolves client and assigned freelancer summaries with one batched lookup.
pub async fn resolve(state: &AppState, projects: Vec<Project>) -> Result<Vec<ProjectView>, ApiError> {
    let mut ids: Vec<Uuid> = projects
        .iter()
        .flat_map(|p| std::iter::once(p.client_id).chain(p.assigned_freelancer))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let users: HashMap<Uuid, UserSummary> = state
        .store
        .find_user_summaries(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(projects
        .into_iter()
        .map(|project| ProjectView {
            client: users.get(&project.client_id).cloned(),
            freelancer: project.assigned_freelancer.and_then(|id| users.get(&id).cloned()),
            project,
        })
        .collect())
}

async fn resolve_one(state: &AppState, project: Project) -> Result<ProjectView, ApiError> {
    resolve(state, vec![project])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("project vanished during resolution")))
}

async fn find_or_404(state: &AppState, id: Uuid) -> Result<Project, ApiError> {
    state
        .store
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))
}

pub async fn create_project(
    state: &AppState,
    actor: &AuthUser,
    req: CreateProjectRequest,
) -> Result<ProjectView, ApiError> {
    actor.require_role(Role::Client, "post projects")?;
    actor.ensure_is(req.client_id, "clientId")?;

    let new = validate_new(req, actor.id, OffsetDateTime::now_utc())?;
    let project = state.store.create_project(new).await?;
    info!(project_id = %project.id, client_id = %project.client_id, "project created");
    resolve_one(state, project).await
}

pub async fn get_project(state: &AppState, id: Uuid) -> Result<ProjectView, ApiError> {
    let project = find_or_404(state, id).await?;
    resolve_one(state, project).await
}

pub async fn list_projects(
    state: &AppState,
    query: &ListProjectsQuery,
) -> Result<Vec<ProjectView>, ApiError> {
    let (Some(status), Some(category)) = (
        equality_filter(query.status.as_deref(), ProjectStatus::parse),
        equality_filter(query.category.as_deref(), ProjectCategory::parse),
    ) else {
        info!(status = ?query.status, category = ?query.category, "filter matches no project");
        return Ok(Vec::new());
    };
    let filter = ProjectFilter {
        status,
        category,
        client_id: query.client_id,
    };
    let projects = state.store.list_projects(&filter, LIST_LIMIT).await?;
    info!(count = projects.len(), "projects listed");
    resolve(state, projects).await
}

pub async fn update_project(
    state: &AppState,
    actor: &AuthUser,
    id: Uuid,
    req: UpdateProjectRequest,
) -> Result<ProjectView, ApiError> {
    let existing = find_or_404(state, id).await?;
    actor.ensure_is(req.client_id, "clientId")?;
    if existing.client_id != actor.id {
        return Err(ApiError::Forbidden("You can only update your own projects".into()));
    }

    let changes = validate_changes(req, &existing, OffsetDateTime::now_utc())?;
    let updated = state
        .store
        .update_project(id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;
    info!(project_id = %id, "project updated");
    resolve_one(state, updated).await
}

pub async fn delete_project(
    state: &AppState,
    actor: &AuthUser,
    id: Uuid,
    client_id: Option<Uuid>,
) -> Result<(), ApiError> {
    let existing = find_or_404(state, id).await?;
    actor.ensure_is(client_id, "clientId")?;
    if existing.client_id != actor.id {
        return Err(ApiError::Forbidden("You can only delete your own projects".into()));
    }

    if !state.store.delete_project(id).await? {
        return Err(ApiError::NotFound("Project not found".into()));
    }
    info!(project_id = %id, "project deleted");
    Ok(())
}
