//! In-memory store
//!
//! A session holds the store lock for its whole lifetime and works on a copy
//! of the state, so sessions are serialisable and a dropped session leaves
//! no trace.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Directory, PrStore, ReviewerStore, Session, StatsStore, UnitOfWork};
use crate::error::{Conflict, Error, Resource, Result};
use crate::models::{
    PrStats, PullRequest, PullRequestShort, ReviewerWorkload, Team, User, UserAssignmentStats,
};
use crate::policy;
use crate::status::PrStatus;

#[derive(Debug, Clone, Default)]
struct State {
    teams: BTreeSet<String>,
    users: BTreeMap<String, User>,
    /// Stored without reviewers
    pull_requests: BTreeMap<String, PullRequest>,
    /// `(pr_id, reviewer_id)` in assignment order
    assignments: Vec<(String, String)>,
}

impl State {
    fn members_of<'a>(&'a self, team_name: &'a str) -> impl Iterator<Item = &'a User> + 'a {
        self.users.values().filter(move |u| u.team_name == team_name)
    }

    fn reviewers_of(&self, pr_id: &str) -> Vec<String> {
        self.assignments
            .iter()
            .filter(|(pr, _)| pr == pr_id)
            .map(|(_, reviewer)| reviewer.clone())
            .collect()
    }

    fn pr(&self, pr_id: &str) -> Result<&PullRequest> {
        self.pull_requests
            .get(pr_id)
            .ok_or_else(|| Error::NotFound(Resource::PullRequest(pr_id.to_string())))
    }

    fn with_reviewers(&self, pr_id: &str) -> Result<PullRequest> {
        let mut pr = self.pr(pr_id)?.clone();
        pr.assigned_reviewers = self.reviewers_of(pr_id);
        Ok(pr)
    }
}

/// Store keeping everything in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    type Session = InMemorySession;

    async fn begin(&self) -> Result<InMemorySession> {
        let guard = self.state.clone().lock_owned().await;
        let draft = guard.clone();
        Ok(InMemorySession { guard, draft })
    }
}

/// Session over an [`InMemoryStore`]
pub struct InMemorySession {
    guard: OwnedMutexGuard<State>,
    draft: State,
}

#[async_trait]
impl Session for InMemorySession {
    async fn commit(self) -> Result<()> {
        let InMemorySession { mut guard, draft } = self;
        *guard = draft;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Directory for InMemorySession {
    async fn team_exists(&mut self, team_name: &str) -> Result<bool> {
        Ok(self.draft.teams.contains(team_name))
    }

    async fn create_team(&mut self, team_name: &str) -> Result<()> {
        if !self.draft.teams.insert(team_name.to_string()) {
            return Err(Error::AlreadyExists(Resource::Team(team_name.to_string())));
        }
        Ok(())
    }

    async fn get_team(&mut self, team_name: &str) -> Result<Team> {
        if !self.draft.teams.contains(team_name) {
            return Err(Error::NotFound(Resource::Team(team_name.to_string())));
        }
        Ok(Team {
            team_name: team_name.to_string(),
            members: self.draft.members_of(team_name).cloned().collect(),
        })
    }

    async fn get_user(&mut self, user_id: &str) -> Result<User> {
        self.draft
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(Resource::User(user_id.to_string())))
    }

    async fn upsert_user(&mut self, user: &User) -> Result<()> {
        if !self.draft.teams.contains(&user.team_name) {
            return Err(Error::Internal(format!(
                "user {} references unknown team {}",
                user.user_id, user.team_name
            )));
        }
        self.draft.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<User> {
        let user = self
            .draft
            .users
            .get_mut(user_id)
            .ok_or_else(|| Error::NotFound(Resource::User(user_id.to_string())))?;
        user.is_active = is_active;
        Ok(user.clone())
    }
}

#[async_trait]
impl PrStore for InMemorySession {
    async fn pr_exists(&mut self, pr_id: &str) -> Result<bool> {
        Ok(self.draft.pull_requests.contains_key(pr_id))
    }

    async fn create_pr(&mut self, pr: &PullRequest) -> Result<()> {
        if self.draft.pull_requests.contains_key(&pr.pull_request_id) {
            return Err(Error::AlreadyExists(Resource::PullRequest(
                pr.pull_request_id.clone(),
            )));
        }
        if !self.draft.users.contains_key(&pr.author_id) {
            return Err(Error::Internal(format!(
                "pull request {} references unknown author {}",
                pr.pull_request_id, pr.author_id
            )));
        }
        let mut record = pr.clone();
        record.assigned_reviewers.clear();
        self.draft
            .pull_requests
            .insert(record.pull_request_id.clone(), record);
        Ok(())
    }

    async fn get_pr(&mut self, pr_id: &str) -> Result<PullRequest> {
        self.draft.pr(pr_id).cloned()
    }

    async fn get_pr_with_reviewers(&mut self, pr_id: &str) -> Result<PullRequest> {
        self.draft.with_reviewers(pr_id)
    }

    async fn merge_pr(&mut self, pr_id: &str, merged_at: DateTime<Utc>) -> Result<PullRequest> {
        let pr = self
            .draft
            .pull_requests
            .get_mut(pr_id)
            .ok_or_else(|| Error::NotFound(Resource::PullRequest(pr_id.to_string())))?;
        if pr.status == PrStatus::Open {
            pr.status = PrStatus::Merged;
            pr.merged_at = Some(merged_at);
        }
        self.draft.with_reviewers(pr_id)
    }

    async fn get_pr_author_id(&mut self, pr_id: &str) -> Result<String> {
        Ok(self.draft.pr(pr_id)?.author_id.clone())
    }
}

#[async_trait]
impl ReviewerStore for InMemorySession {
    async fn assign_reviewer(&mut self, pr_id: &str, reviewer_id: &str) -> Result<()> {
        let duplicate = self
            .draft
            .assignments
            .iter()
            .any(|(pr, reviewer)| pr == pr_id && reviewer == reviewer_id);
        if duplicate {
            return Err(Error::Internal(format!(
                "{} is already assigned to {}",
                reviewer_id, pr_id
            )));
        }
        self.draft
            .assignments
            .push((pr_id.to_string(), reviewer_id.to_string()));
        Ok(())
    }

    async fn replace_reviewer(
        &mut self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<()> {
        let slot = self
            .draft
            .assignments
            .iter_mut()
            .find(|(pr, reviewer)| pr == pr_id && reviewer == old_reviewer_id)
            .ok_or(Conflict::ReviewerNotAssigned)?;
        slot.1 = new_reviewer_id.to_string();
        Ok(())
    }

    async fn is_reviewer_assigned(&mut self, pr_id: &str, reviewer_id: &str) -> Result<bool> {
        Ok(self
            .draft
            .assignments
            .iter()
            .any(|(pr, reviewer)| pr == pr_id && reviewer == reviewer_id))
    }

    async fn assigned_reviewers(&mut self, pr_id: &str) -> Result<Vec<String>> {
        Ok(self.draft.reviewers_of(pr_id))
    }

    async fn find_candidates_for_new_pr(
        &mut self,
        team_name: &str,
        author_id: &str,
    ) -> Result<Vec<String>> {
        Ok(policy::new_pr_candidates(
            self.draft.members_of(team_name),
            author_id,
        ))
    }

    async fn find_candidates_for_reassignment(
        &mut self,
        team_name: &str,
        author_id: &str,
        pr_id: &str,
    ) -> Result<Vec<String>> {
        let assigned = self.draft.reviewers_of(pr_id);
        Ok(policy::reassignment_candidates(
            self.draft.members_of(team_name),
            author_id,
            &assigned,
        ))
    }

    async fn list_prs_by_reviewer(&mut self, reviewer_id: &str) -> Result<Vec<PullRequestShort>> {
        let mut prs: Vec<&PullRequest> = self
            .draft
            .assignments
            .iter()
            .filter(|(_, reviewer)| reviewer == reviewer_id)
            .filter_map(|(pr, _)| self.draft.pull_requests.get(pr))
            .collect();
        prs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.pull_request_id.cmp(&b.pull_request_id))
        });
        Ok(prs.into_iter().map(PullRequest::to_short).collect())
    }
}

#[async_trait]
impl StatsStore for InMemorySession {
    async fn user_assignment_stats(&mut self) -> Result<Vec<UserAssignmentStats>> {
        let mut stats: Vec<UserAssignmentStats> = self
            .draft
            .users
            .values()
            .map(|u| UserAssignmentStats {
                user_id: u.user_id.clone(),
                username: u.username.clone(),
                team_name: u.team_name.clone(),
                assignments_count: self
                    .draft
                    .assignments
                    .iter()
                    .filter(|(_, reviewer)| *reviewer == u.user_id)
                    .count() as i64,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.assignments_count
                .cmp(&a.assignments_count)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(stats)
    }

    async fn pr_stats(&mut self) -> Result<PrStats> {
        let total_prs = self.draft.pull_requests.len() as i64;
        let merged_prs = self
            .draft
            .pull_requests
            .values()
            .filter(|pr| pr.is_merged())
            .count() as i64;
        Ok(PrStats {
            total_prs,
            open_prs: total_prs - merged_prs,
            merged_prs,
        })
    }

    async fn reviewer_workload(&mut self) -> Result<Vec<ReviewerWorkload>> {
        let open: BTreeSet<&str> = self
            .draft
            .pull_requests
            .values()
            .filter(|pr| !pr.is_merged())
            .map(|pr| pr.pull_request_id.as_str())
            .collect();
        let mut workload: Vec<ReviewerWorkload> = self
            .draft
            .users
            .values()
            .map(|u| ReviewerWorkload {
                user_id: u.user_id.clone(),
                username: u.username.clone(),
                team_name: u.team_name.clone(),
                open_prs_count: self
                    .draft
                    .assignments
                    .iter()
                    .filter(|(pr, reviewer)| *reviewer == u.user_id && open.contains(pr.as_str()))
                    .count() as i64,
            })
            .collect();
        workload.sort_by(|a, b| {
            b.open_prs_count
                .cmp(&a.open_prs_count)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(workload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        let mut s = store.begin().await.unwrap();
        s.create_team("backend").await.unwrap();
        s.upsert_user(&User::new("u1", "alice", "backend")).await.unwrap();
        s.upsert_user(&User::new("u2", "bob", "backend")).await.unwrap();
        s.commit().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = seeded().await;

        let mut s = store.begin().await.unwrap();
        s.create_pr(&PullRequest::open("pr-1", "Add auth", "u1"))
            .await
            .unwrap();
        assert!(s.pr_exists("pr-1").await.unwrap());
        drop(s);

        let mut s = store.begin().await.unwrap();
        assert!(!s.pr_exists("pr-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_rollback_discards_draft() {
        let store = seeded().await;

        let mut s = store.begin().await.unwrap();
        s.set_user_active("u2", false).await.unwrap();
        s.rollback().await.unwrap();

        let mut s = store.begin().await.unwrap();
        assert!(s.get_user("u2").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_replace_keeps_slot() {
        let store = seeded().await;
        let mut s = store.begin().await.unwrap();
        s.upsert_user(&User::new("u3", "carol", "backend")).await.unwrap();
        s.create_pr(&PullRequest::open("pr-1", "Add auth", "u1"))
            .await
            .unwrap();
        s.assign_reviewer("pr-1", "u2").await.unwrap();
        s.assign_reviewer("pr-1", "u3").await.unwrap();

        s.replace_reviewer("pr-1", "u2", "u4").await.unwrap();
        assert_eq!(s.assigned_reviewers("pr-1").await.unwrap(), vec!["u4", "u3"]);

        let err = s.replace_reviewer("pr-1", "u2", "u5").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(Conflict::ReviewerNotAssigned)));
    }

    #[tokio::test]
    async fn test_merge_keeps_first_timestamp() {
        let store = seeded().await;
        let mut s = store.begin().await.unwrap();
        s.create_pr(&PullRequest::open("pr-1", "Add auth", "u1"))
            .await
            .unwrap();

        let first = s.merge_pr("pr-1", Utc::now()).await.unwrap();
        let later = first.merged_at.unwrap() + chrono::Duration::seconds(5);
        let second = s.merge_pr("pr-1", later).await.unwrap();
        assert_eq!(first.merged_at, second.merged_at);
        assert_eq!(second.status, PrStatus::Merged);
    }

    #[tokio::test]
    async fn test_unknown_team_rejected() {
        let store = InMemoryStore::new();
        let mut s = store.begin().await.unwrap();
        let err = s.get_team("ghosts").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(Resource::Team(_))));
        assert!(s
            .upsert_user(&User::new("u9", "ghost", "ghosts"))
            .await
            .is_err());
    }
}
