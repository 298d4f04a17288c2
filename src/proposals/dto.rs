use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::UserSummary;
use crate::projects::repo_types::ProjectSummary;
use crate::proposals::repo_types::Proposal;
use crate::validation::Numeric;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    pub project_id: Option<Uuid>,
    pub freelancer_id: Option<Uuid>,
    pub cover_letter: Option<String>,
    pub proposed_rate: Option<Numeric>,
    pub estimated_duration: Option<Numeric>, // days
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProposalRequest {
    pub status: Option<String>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProposalsQuery {
    pub project_id: Option<Uuid>,
    pub freelancer_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

/// A proposal with its project and freelancer resolved.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalView {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub project: Option<ProjectSummary>,
    pub freelancer: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub proposal: ProposalView,
}

#[derive(Debug, Serialize)]
pub struct ProposalListResponse {
    pub proposals: Vec<ProposalView>,
    pub total: usize,
}
