//! Fixtures shared by the unit tests.

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        repo_types::{NewUser, Role},
    },
    projects::{dto::CreateProjectRequest, dto::ProjectView, services as projects},
    proposals::{dto::CreateProposalRequest, dto::ProposalView, services as proposals},
    state::AppState,
    validation::Numeric,
};

pub async fn seed_user(state: &AppState, name: &str, role: Role) -> AuthUser {
    let user = state
        .store
        .create_user(NewUser {
            name: name.into(),
            email: format!("{}-{}@uni.edu", name.to_lowercase(), Uuid::new_v4()),
            password_hash: "unused".into(),
            role,
        })
        .await
        .expect("seed user");
    AuthUser { id: user.id, role }
}

pub fn in_days(days: i64) -> String {
    (OffsetDateTime::now_utc() + Duration::days(days))
        .format(&time::format_description::well_known::Rfc3339)
        .expect("format deadline")
}

pub fn project_request(budget: f64) -> CreateProjectRequest {
    CreateProjectRequest {
        title: Some("Landing page for a campus club".into()),
        description: Some("Responsive single page site with a signup form and gallery.".into()),
        category: Some("Web Development".into()),
        skills_required: Some(vec!["html".into(), "css".into()]),
        budget: Some(budget),
        deadline: Some(in_days(30)),
        client_id: None,
    }
}

pub fn proposal_request(project_id: Uuid, budget: f64, days: i64) -> CreateProposalRequest {
    CreateProposalRequest {
        project_id: Some(project_id),
        freelancer_id: None,
        cover_letter: Some("I have built three club sites this year.".into()),
        proposed_rate: Some(Numeric::Number(budget)),
        estimated_duration: Some(Numeric::Number(days as f64)),
    }
}

pub async fn seed_project(state: &AppState, client: &AuthUser, budget: f64) -> ProjectView {
    projects::create_project(state, client, project_request(budget))
        .await
        .expect("seed project")
}

pub async fn seed_proposal(
    state: &AppState,
    freelancer: &AuthUser,
    project_id: Uuid,
    budget: f64,
    days: i64,
) -> ProposalView {
    proposals::create_proposal(state, freelancer, proposal_request(project_id, budget, days))
        .await
        .expect("seed proposal")
}
