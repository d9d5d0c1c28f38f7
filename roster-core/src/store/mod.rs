//! Storage capabilities consumed by the engine
//!
//! Every store call goes through a [`Session`], the explicit handle of one
//! unit of work. Stores persist what they are told; business invariants are
//! enforced by the engine.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    PrStats, PullRequest, PullRequestShort, ReviewerWorkload, Team, User, UserAssignmentStats,
};

pub use memory::InMemoryStore;

/// Team and user membership
#[async_trait]
pub trait Directory: Send {
    async fn team_exists(&mut self, team_name: &str) -> Result<bool>;

    /// Fails with `AlreadyExists` on a duplicate name
    async fn create_team(&mut self, team_name: &str) -> Result<()>;

    /// Fails with `NotFound` if the team is absent
    async fn get_team(&mut self, team_name: &str) -> Result<Team>;

    async fn get_user(&mut self, user_id: &str) -> Result<User>;

    /// Insert the user or overwrite every field of an existing one
    async fn upsert_user(&mut self, user: &User) -> Result<()>;

    async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<User>;
}

/// Pull request records
#[async_trait]
pub trait PrStore: Send {
    async fn pr_exists(&mut self, pr_id: &str) -> Result<bool>;

    /// Fails with `AlreadyExists` on a duplicate id
    async fn create_pr(&mut self, pr: &PullRequest) -> Result<()>;

    /// Loads the record without its reviewers
    async fn get_pr(&mut self, pr_id: &str) -> Result<PullRequest>;

    async fn get_pr_with_reviewers(&mut self, pr_id: &str) -> Result<PullRequest>;

    /// Flip to `MERGED` in one write, keeping an earlier `merged_at`
    async fn merge_pr(&mut self, pr_id: &str, merged_at: DateTime<Utc>) -> Result<PullRequest>;

    async fn get_pr_author_id(&mut self, pr_id: &str) -> Result<String>;
}

/// The pull request to reviewer relation
#[async_trait]
pub trait ReviewerStore: Send {
    async fn assign_reviewer(&mut self, pr_id: &str, reviewer_id: &str) -> Result<()>;

    /// Swap one reviewer for another in a single step, keeping the slot
    async fn replace_reviewer(
        &mut self,
        pr_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<()>;

    async fn is_reviewer_assigned(&mut self, pr_id: &str, reviewer_id: &str) -> Result<bool>;

    async fn assigned_reviewers(&mut self, pr_id: &str) -> Result<Vec<String>>;

    /// Ordered by ascending user id
    async fn find_candidates_for_new_pr(
        &mut self,
        team_name: &str,
        author_id: &str,
    ) -> Result<Vec<String>>;

    /// Ordered by ascending user id
    async fn find_candidates_for_reassignment(
        &mut self,
        team_name: &str,
        author_id: &str,
        pr_id: &str,
    ) -> Result<Vec<String>>;

    async fn list_prs_by_reviewer(&mut self, reviewer_id: &str) -> Result<Vec<PullRequestShort>>;
}

/// Aggregate reads
#[async_trait]
pub trait StatsStore: Send {
    async fn user_assignment_stats(&mut self) -> Result<Vec<UserAssignmentStats>>;

    async fn pr_stats(&mut self) -> Result<PrStats>;

    async fn reviewer_workload(&mut self) -> Result<Vec<ReviewerWorkload>>;
}

/// One atomic scope over all stores
///
/// Reads observe the session's own writes; nothing is visible to other
/// sessions before `commit`. Dropping a session without committing rolls it
/// back.
#[async_trait]
pub trait Session: Directory + PrStore + ReviewerStore + StatsStore + Send {
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// Source of sessions
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Session: Session;

    async fn begin(&self) -> Result<Self::Session>;
}
