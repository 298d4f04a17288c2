//! In-process store backing unit tests. One mutex guards all three tables, so
//! every trait call is atomic.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{ProjectStore, ProposalStore, StoreError, StoreResult, UserStore};
use crate::auth::repo_types::{NewUser, User, UserSummary};
use crate::projects::repo_types::{NewProject, Project, ProjectChanges, ProjectFilter, ProjectStatus};
use crate::proposals::repo_types::{NewProposal, Proposal, ProposalFilter, ProposalStatus};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    projects: Vec<Project>,    // insertion order
    proposals: Vec<Proposal>,  // insertion order
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Other(anyhow::anyhow!("memory store poisoned")))
    }
}

fn project_matches(filter: &ProjectFilter, p: &Project) -> bool {
    filter.status.map_or(true, |s| p.status == s)
        && filter.category.map_or(true, |c| p.category == c)
        && filter.client_id.map_or(true, |id| p.client_id == id)
}

fn proposal_matches(filter: &ProposalFilter, p: &Proposal) -> bool {
    filter.project_id.map_or(true, |id| p.project_id == id)
        && filter.freelancer_id.map_or(true, |id| p.freelancer_id == id)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut t = self.lock()?;
        if t.users.iter().any(|u| u.email.eq_ignore_ascii_case(&new.email)) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            bio: String::new(),
            skills: Vec::new(),
            hourly_rate: 0.0,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.lock()?;
        Ok(t.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.lock()?;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_summaries(&self, ids: &[Uuid]) -> StoreResult<Vec<UserSummary>> {
        let t = self.lock()?;
        Ok(t.users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(UserSummary::from)
            .collect())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let mut t = self.lock()?;
        let now = OffsetDateTime::now_utc();
        let project = Project {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            category: new.category,
            skills_required: new.skills_required,
            budget: new.budget,
            deadline: new.deadline,
            status: ProjectStatus::Open,
            client_id: new.client_id,
            assigned_freelancer: None,
            created_at: now,
            updated_at: now,
        };
        t.projects.push(project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let t = self.lock()?;
        Ok(t.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn find_projects_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Project>> {
        let t = self.lock()?;
        Ok(t.projects.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    async fn list_projects(&self, filter: &ProjectFilter, limit: i64) -> StoreResult<Vec<Project>> {
        let t = self.lock()?;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(t.projects
            .iter()
            .rev()
            .filter(|p| project_matches(filter, p))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_project(&self, id: Uuid, changes: ProjectChanges) -> StoreResult<Option<Project>> {
        let mut t = self.lock()?;
        let Some(p) = t.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.title {
            p.title = v;
        }
        if let Some(v) = changes.description {
            p.description = v;
        }
        if let Some(v) = changes.category {
            p.category = v;
        }
        if let Some(v) = changes.skills_required {
            p.skills_required = v;
        }
        if let Some(v) = changes.budget {
            p.budget = v;
        }
        if let Some(v) = changes.deadline {
            p.deadline = v;
        }
        if let Some(v) = changes.status {
            p.status = v;
        }
        p.updated_at = OffsetDateTime::now_utc();
        Ok(Some(p.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let before = t.projects.len();
        t.projects.retain(|p| p.id != id);
        let deleted = t.projects.len() != before;
        if deleted {
            t.proposals.retain(|p| p.project_id != id);
        }
        Ok(deleted)
    }
}

#[async_trait]
impl ProposalStore for MemoryStore {
    async fn create_proposal(&self, new: NewProposal) -> StoreResult<Proposal> {
        let mut t = self.lock()?;
        if t.proposals
            .iter()
            .any(|p| p.project_id == new.project_id && p.freelancer_id == new.freelancer_id)
        {
            return Err(StoreError::UniqueViolation(
                "proposals_project_id_freelancer_id_key".into(),
            ));
        }
        let now = OffsetDateTime::now_utc();
        let proposal = Proposal {
            id: Uuid::new_v4(),
            project_id: new.project_id,
            freelancer_id: new.freelancer_id,
            message: new.message,
            proposed_budget: new.proposed_budget,
            delivery_days: new.delivery_days,
            status: ProposalStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        t.proposals.push(proposal.clone());
        Ok(proposal)
    }

    async fn find_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let t = self.lock()?;
        Ok(t.proposals.iter().find(|p| p.id == id).cloned())
    }

    async fn find_proposal_by_pair(
        &self,
        project_id: Uuid,
        freelancer_id: Uuid,
    ) -> StoreResult<Option<Proposal>> {
        let t = self.lock()?;
        Ok(t.proposals
            .iter()
            .find(|p| p.project_id == project_id && p.freelancer_id == freelancer_id)
            .cloned())
    }

    async fn list_proposals(&self, filter: &ProposalFilter) -> StoreResult<Vec<Proposal>> {
        let t = self.lock()?;
        Ok(t.proposals
            .iter()
            .rev()
            .filter(|p| proposal_matches(filter, p))
            .cloned()
            .collect())
    }

    async fn reject_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let mut t = self.lock()?;
        let Some(p) = t
            .proposals
            .iter_mut()
            .find(|p| p.id == id && p.status == ProposalStatus::Pending)
        else {
            return Ok(None);
        };
        p.status = ProposalStatus::Rejected;
        p.updated_at = OffsetDateTime::now_utc();
        Ok(Some(p.clone()))
    }

    async fn accept_proposal(&self, id: Uuid) -> StoreResult<Option<Proposal>> {
        let mut t = self.lock()?;
        let now = OffsetDateTime::now_utc();
        let Some(project_id) = t.proposals.iter().find(|p| p.id == id).map(|p| p.project_id) else {
            return Ok(None);
        };
        let open = t
            .projects
            .iter()
            .any(|p| p.id == project_id && p.status == ProjectStatus::Open);
        if !open {
            return Ok(None);
        }
        let Some(accepted) = t
            .proposals
            .iter_mut()
            .find(|p| p.id == id && p.status == ProposalStatus::Pending)
        else {
            return Ok(None);
        };
        accepted.status = ProposalStatus::Accepted;
        accepted.updated_at = now;
        let accepted = accepted.clone();

        if let Some(project) = t.projects.iter_mut().find(|p| p.id == project_id) {
            project.status = ProjectStatus::InProgress;
            project.assigned_freelancer = Some(accepted.freelancer_id);
            project.updated_at = now;
        }
        for sibling in t
            .proposals
            .iter_mut()
            .filter(|p| p.project_id == accepted.project_id && p.id != accepted.id)
        {
            sibling.status = ProposalStatus::Rejected;
            sibling.updated_at = now;
        }
        Ok(Some(accepted))
    }
}
