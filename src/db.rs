use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserSummary};
use crate::config::AppConfig;
use crate::projects::repo_types::{NewProject, Project, ProjectChanges, ProjectFilter};
use crate::proposals::repo_types::{NewProposal, Proposal, ProposalFilter};

#[cfg(test)]
pub mod memory;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique index").to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Other(e.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `UniqueViolation` when the email (case-insensitive) is taken.
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Unknown ids are skipped.
    async fn find_user_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project>;
    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>>;
    async fn find_projects_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Project>>;
    /// Newest first, at most `limit` rows.
    async fn list_projects(&self, filter: &ProjectFilter, limit: i64) -> StoreResult<Vec<Project>>;
    async fn update_project(&self, id: Uuid, changes: ProjectChanges) -> StoreResult<Option<Project>>;
    /// Also removes the project's proposals. Returns `false` if nothing was deleted.
    async fn delete_project(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Fails with `UniqueViolation` when the (project, freelancer) pair exists.
    async fn create_proposal(&self, new: NewProposal) -> StoreResult<Proposal>;
    async fn find_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>>;
    async fn find_proposal_by_pair(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
    ) -> StoreResult<Option<Proposal>>;
    /// Newest first.
    async fn list_proposals(&self, filter: &ProposalFilter) -> StoreResult<Vec<Proposal>>;
    /// pending -> rejected. `None` if the proposal is missing or no longer pending.
    async fn reject_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>>;
    /// pending -> accepted, then assigns the project and rejects every sibling,
    /// all in one transaction. `None` if the proposal is missing or no longer
    /// pending, or its project is no longer open.
    async fn accept_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>>;
}

pub trait Store: UserStore + ProjectStore + ProposalStore {}

impl<T: UserStore + ProjectStore + ProposalStore> Store for T {}

#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}
