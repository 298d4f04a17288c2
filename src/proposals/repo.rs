use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{PgStore, ProposalStore, StoreResult};
use crate::projects::repo_types::ProjectStatus;
use crate::proposals::repo_types::{NewProposal, Proposal, ProposalFilter};

const PROPOSAL_COLUMNS: &str = "id, project_id, freelancer_id, message, proposed_budget, \
     delivery_days, status, created_at, updated_at";

#[async_trait]
impl ProposalStore for PgStore {
    async fn create_proposal(&self, new: NewProposal) -> StoreResult<Proposal> {
        let sql = format!(
            r#"
            INSERT INTO proposals (id, project_id, freelancer_id, message, proposed_budget,
                                   delivery_days)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PROPOSAL_COLUMNS}
            "#
        );
        let proposal = sqlx::query_as::<_, Proposal>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.project_id)
            .bind(new.freelancer_id)
            .bind(&new.message)
            .bind(new.proposed_budget)
            .bind(new.delivery_days)
            .fetch_one(&self.db)
            .await?;
        Ok(proposal)
    }

    async fn find_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let sql = format!("SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = $1");
        let proposal = sqlx::query_as::<_, Proposal>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(proposal)
    }

    async fn find_proposal_by_pair(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
    ) -> StoreResult<Option<Proposal>> {
        let sql = format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE project_id = $1 AND freelancer_id = $2"
        );
        let proposal = sqlx::query_as::<_, Proposal>(&sql)
            .bind(project_id)
            .bind(freelancer_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(proposal)
    }

    async fn list_proposals(&self, filter: &ProposalFilter) -> StoreResult<Vec<Proposal>> {
        let sql = format!(
            r#"
            SELECT {PROPOSAL_COLUMNS}
            FROM proposals
            WHERE ($1::uuid IS NULL OR project_id = $1)
              AND ($2::uuid IS NULL OR freelancer_id = $2)
            ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, Proposal>(&sql)
            .bind(filter.project_id)
            .bind(filter.freelancer_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn reject_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let sql = format!(
            r#"
            UPDATE proposals
               SET status = 'rejected', updated_at = now()
             WHERE id = $1 AND status = 'pending'
            RETURNING {PROPOSAL_COLUMNS}
            "#
        );
        let proposal = sqlx::query_as::<_, Proposal>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(proposal)
    }

    async fn accept_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let project_id: Option<Uuid> =
            sqlx::query_scalar("SELECT project_id FROM proposals WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(project_id) = project_id else {
            return Ok(None);
        };

        // Serializes concurrent decisions on the same project.
        let project_status: Option<ProjectStatus> =
            sqlx::query_scalar("SELECT status FROM projects WHERE id = $1 FOR UPDATE")
                .bind(project_id)
                .fetch_optional(&mut *tx)
                .await?;
        if project_status != Some(ProjectStatus::Open) {
            tx.rollback().await.context("rollback tx")?;
            return Ok(None);
        }

        let sql = format!(
            r#"
            UPDATE proposals
               SET status = 'accepted', updated_at = now()
             WHERE id = $1 AND status = 'pending'
            RETURNING {PROPOSAL_COLUMNS}
            "#
        );
        let accepted = sqlx::query_as::<_, Proposal>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(accepted) = accepted else {
            tx.rollback().await.context("rollback tx")?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE projects
               SET status = 'in-progress', assigned_freelancer = $2, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(project_id)
        .bind(accepted.freelancer_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE proposals
               SET status = 'rejected', updated_at = now()
             WHERE project_id = $1 AND id <> $2
            "#,
        )
        .bind(project_id)
        .bind(accepted.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(accepted))
    }
}
