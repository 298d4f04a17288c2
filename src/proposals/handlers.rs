use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::{parse_id, ApiError, AppJson, AppQuery},
    proposals::{
        dto::{
            CreateProposalRequest, ListProposalsQuery, ProposalListResponse, ProposalResponse,
            UpdateProposalRequest,
        },
        services,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/proposals", get(list_proposals).post(create_proposal))
        .route("/proposals/:id", get(get_proposal).put(update_proposal))
}

#[instrument(skip(state))]
pub async fn list_proposals(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListProposalsQuery>,
) -> Result<Json<ProposalListResponse>, ApiError> {
    let proposals = services::list_proposals(&state, &query).await?;
    Ok(Json(ProposalListResponse {
        total: proposals.len(),
        proposals,
    }))
}

#[instrument(skip(state))]
pub async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let id = parse_id(&id, "proposal")?;
    let proposal = services::get_proposal(&state, id).await?;
    Ok(Json(ProposalResponse {
        message: None,
        proposal,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_proposal(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateProposalRequest>,
) -> Result<(StatusCode, Json<ProposalResponse>), ApiError> {
    let proposal = services::create_proposal(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProposalResponse {
            message: Some("Proposal submitted successfully!".into()),
            proposal,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_proposal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateProposalRequest>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let id = parse_id(&id, "proposal")?;
    let proposal = services::set_status(&state, &user, id, payload).await?;
    let message = format!("Proposal {} successfully!", proposal.proposal.status.as_str());
    Ok(Json(ProposalResponse {
        message: Some(message),
        proposal,
    }))
}
