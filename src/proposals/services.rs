use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        repo_types::{Role, UserSummary},
    },
    db::StoreError,
    error::ApiError,
    projects::repo_types::{ProjectStatus, ProjectSummary},
    proposals::{
        dto::{CreateProposalRequest, ListProposalsQuery, ProposalView, UpdateProposalRequest},
        repo_types::{NewProposal, Proposal, ProposalFilter, ProposalStatus},
    },
    state::AppState,
    validation::{present, require_fields, Numeric, Violations},
};

const DUPLICATE: &str = "You have already submitted a proposal for this project";
const BAD_DECISION: &str = "Status must be accepted or rejected";

fn validate_new(req: CreateProposalRequest, freelancer_id: Uuid) -> Result<NewProposal, ApiError> {
    require_fields(
        "Missing required fields",
        &[
            ("projectId", req.project_id.is_some()),
            ("coverLetter", present(&req.cover_letter)),
            ("proposedRate", filled(&req.proposed_rate)),
            ("estimatedDuration", filled(&req.estimated_duration)),
        ],
    )?;

    let mut v = Violations::new();
    let message = req.cover_letter.unwrap_or_default().trim().to_string();
    v.length(
        &message,
        10,
        500,
        "Message must be at least 10 characters",
        "Message cannot exceed 500 characters",
    );

    let proposed_budget = req.proposed_rate.as_ref().and_then(Numeric::as_f64);
    match proposed_budget {
        None => v.push("Proposed budget must be a number"),
        Some(b) if b < 1.0 => v.push("Proposed budget must be at least $1"),
        Some(b) if b > 50_000.0 => v.push("Proposed budget cannot exceed $50,000"),
        Some(_) => {}
    }

    let delivery_days = match req.estimated_duration.as_ref().and_then(Numeric::as_whole) {
        None => {
            v.push("Delivery days must be a whole number");
            None
        }
        Some(d) if d < 1 => {
            v.push("Delivery must be at least 1 day");
            None
        }
        Some(d) if d > 365 => {
            v.push("Delivery cannot exceed 365 days");
            None
        }
        Some(d) => i32::try_from(d).ok(),
    };

    let built = req
        .project_id
        .zip(proposed_budget)
        .zip(delivery_days)
        .map(|((project_id, proposed_budget), delivery_days)| NewProposal {
            project_id,
            freelancer_id,
            message,
            proposed_budget,
            delivery_days,
        });
    v.finish(built)
}

fn filled(value: &Option<Numeric>) -> bool {
    value.as_ref().is_some_and(|n| !n.is_blank())
}

fn parse_decision(raw: Option<&str>) -> Result<ProposalStatus, ApiError> {
    match raw.map(str::trim) {
        Some("accepted") => Ok(ProposalStatus::Accepted),
        Some("rejected") => Ok(ProposalStatus::Rejected),
        Some(_) => Err(ApiError::validation(BAD_DECISION, Vec::new())),
        None => Err(ApiError::validation("Status is required", vec!["status".into()])),
    }
}

/// Resolves project summaries and freelancer profiles with one lookup each.
pub async fn resolve(state: &AppState, proposals: Vec<Proposal>) -> Result<Vec<ProposalView>, ApiError> {
    let mut project_ids: Vec<Uuid> = proposals.iter().map(|p| p.project_id).collect();
    project_ids.sort_unstable();
    project_ids.dedup();
    let mut freelancer_ids: Vec<Uuid> = proposals.iter().map(|p| p.freelancer_id).collect();
    freelancer_ids.sort_unstable();
    freelancer_ids.dedup();

    let projects: HashMap<Uuid, ProjectSummary> = state
        .store
        .find_projects_by_ids(&project_ids)
        .await?
        .iter()
        .map(|p| (p.id, ProjectSummary::from(p)))
        .collect();
    let freelancers: HashMap<Uuid, UserSummary> = state
        .store
        .find_user_summaries(&freelancer_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(proposals
        .into_iter()
        .map(|proposal| ProposalView {
            project: projects.get(&proposal.project_id).cloned(),
            freelancer: freelancers.get(&proposal.freelancer_id).cloned(),
            proposal,
        })
        .collect())
}

async fn resolve_one(state: &AppState, proposal: Proposal) -> Result<ProposalView, ApiError> {
    resolve(state, vec![proposal])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("proposal vanished during resolution")))
}

pub async fn create_proposal(
    state: &AppState,
    actor: &AuthUser,
    req: CreateProposalRequest,
) -> Result<ProposalView, ApiError> {
    actor.require_role(Role::Freelancer, "submit proposals")?;
    actor.ensure_is(req.freelancer_id, "freelancerId")?;
    let new = validate_new(req, actor.id)?;

    let project = state
        .store
        .find_project(new.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;
    if project.status != ProjectStatus::Open {
        return Err(ApiError::Conflict(
            "Project is no longer accepting proposals".into(),
        ));
    }

    if state
        .store
        .find_proposal_by_pair(new.project_id, new.freelancer_id)
        .await?
        .is_some()
    {
        warn!(project_id = %new.project_id, freelancer_id = %new.freelancer_id, "duplicate proposal");
        return Err(ApiError::Conflict(DUPLICATE.into()));
    }

    let proposal = state.store.create_proposal(new).await.map_err(|e| match e {
        StoreError::UniqueViolation(_) => ApiError::Conflict(DUPLICATE.into()),
        other => other.into(),
    })?;
    info!(proposal_id = %proposal.id, project_id = %proposal.project_id, "proposal submitted");
    resolve_one(state, proposal).await
}

pub async fn list_proposals(
    state: &AppState,
    query: &ListProposalsQuery,
) -> Result<Vec<ProposalView>, ApiError> {
    let filter = ProposalFilter {
        project_id: query.project_id,
        freelancer_id: query.freelancer_id,
    };
    let proposals = state.store.list_proposals(&filter).await?;
    let mut views = resolve(state, proposals).await?;

    // Ownership lives on the project, so this filter runs after resolution.
    if let Some(client_id) = query.client_id {
        views.retain(|v| v.project.as_ref().is_some_and(|p| p.client_id == client_id));
    }
    info!(count = views.len(), "proposals listed");
    Ok(views)
}

pub async fn get_proposal(state: &AppState, id: Uuid) -> Result<ProposalView, ApiError> {
    let proposal = state
        .store
        .find_proposal(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Proposal not found".into()))?;
    resolve_one(state, proposal).await
}

/// Accepts or rejects a pending proposal on behalf of the project's owner.
///
/// Acceptance moves the project to in-progress, assigns the proposal's
/// freelancer and rejects every other proposal on the project, atomically.
/// Accepted and rejected are terminal; deciding twice is a conflict.
pub async fn set_status(
    state: &AppState,
    actor: &AuthUser,
    id: Uuid,
    req: UpdateProposalRequest,
) -> Result<ProposalView, ApiError> {
    let decision = parse_decision(req.status.as_deref())?;
    actor.ensure_is(req.client_id, "clientId")?;

    let proposal = state
        .store
        .find_proposal(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Proposal not found".into()))?;
    let project = state
        .store
        .find_project(proposal.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    if project.client_id != actor.id {
        return Err(ApiError::Forbidden(
            "You can only update proposals for your own projects".into(),
        ));
    }
    if proposal.status != ProposalStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "Proposal has already been {}",
            proposal.status.as_str()
        )));
    }

    if decision == ProposalStatus::Accepted && project.status != ProjectStatus::Open {
        return Err(ApiError::Conflict(
            "Project is no longer accepting proposals".into(),
        ));
    }

    let updated = match decision {
        ProposalStatus::Accepted => state
            .store
            .accept_proposal(id)
            .await?
            .ok_or_else(|| ApiError::Conflict("Proposal can no longer be accepted".into()))?,
        _ => state
            .store
            .reject_proposal(id)
            .await?
            .ok_or_else(|| ApiError::Conflict("Proposal is no longer pending".into()))?,
    };

    info!(
        proposal_id = %id,
        project_id = %project.id,
        status = updated.status.as_str(),
        "proposal decided"
    );
    resolve_one(state, updated).await
}
