use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{PgStore, ProjectStore, StoreResult};
use crate::projects::repo_types::{NewProject, Project, ProjectChanges, ProjectFilter};

const PROJECT_COLUMNS: &str = "id, title, description, category, skills_required, budget, \
     deadline, status, client_id, assigned_freelancer, created_at, updated_at";

#[async_trait]
impl ProjectStore for PgStore {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let sql = format!(
            r#"
            INSERT INTO projects (id, title, description, category, skills_required, budget,
                                  deadline, client_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PROJECT_COLUMNS}
            "#
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.title)
            .bind(&new.description)
            .bind(new.category)
            .bind(&new.skills_required)
            .bind(new.budget)
            .bind(new.deadline)
            .bind(new.client_id)
            .fetch_one(&self.db)
            .await?;
        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(project)
    }

    async fn find_projects_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Project>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, Project>(&sql)
            .bind(ids)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn list_projects(&self, filter: &ProjectFilter, limit: i64) -> StoreResult<Vec<Project>> {
        let sql = format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE ($1::project_status IS NULL OR status = $1)
              AND ($2::project_category IS NULL OR category = $2)
              AND ($3::uuid IS NULL OR client_id = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#
        );
        let rows = sqlx::query_as::<_, Project>(&sql)
            .bind(filter.status)
            .bind(filter.category)
            .bind(filter.client_id)
            .bind(limit)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn update_project(&self, id: Uuid, changes: ProjectChanges) -> StoreResult<Option<Project>> {
        let sql = format!(
            r#"
            UPDATE projects
               SET title           = COALESCE($2, title),
                   description     = COALESCE($3, description),
                   category        = COALESCE($4, category),
                   skills_required = COALESCE($5, skills_required),
                   budget          = COALESCE($6, budget),
                   deadline        = COALESCE($7, deadline),
                   status          = COALESCE($8, status),
                   updated_at      = now()
             WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.category)
            .bind(changes.skills_required)
            .bind(changes.budget)
            .bind(changes.deadline)
            .bind(changes.status)
            .fetch_optional(&self.db)
            .await?;
        Ok(project)
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        // proposals go with it through ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
