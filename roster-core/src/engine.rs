//! Reviewer assignment engine
//!
//! Creates, merges and reassigns pull requests. Every operation runs in one
//! unit of work and is bounded by the configured timeout; merge and
//! reassignment additionally hold the pull request's lock so concurrent
//! requests against the same pull request are applied one at a time.

use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;

use crate::config::EngineConfig;
use crate::error::{require, Conflict, Error, Resource, Result, ResultExt};
use crate::models::{PullRequest, PullRequestShort, Reassignment};
use crate::status::PrStatus;
use crate::store::{Directory, PrStore, ReviewerStore, UnitOfWork};
use crate::unit_of_work::{run, with_deadline, PrLocks};

/// Orchestrates the pull request lifecycle over a [`UnitOfWork`]
pub struct AssignmentEngine<U> {
    uow: U,
    locks: PrLocks,
    timeout: Duration,
}

impl<U: UnitOfWork> AssignmentEngine<U> {
    /// Create an engine with the default operation timeout
    pub fn new(uow: U) -> Self {
        Self::from_config(uow, &EngineConfig::default())
    }

    pub fn from_config(uow: U, config: &EngineConfig) -> Self {
        Self {
            uow,
            locks: PrLocks::new(),
            timeout: config.operation_timeout,
        }
    }

    /// Override the operation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Open a pull request and assign every eligible teammate of the author
    pub async fn create_pr(
        &self,
        pr_id: &str,
        pr_name: &str,
        author_id: &str,
    ) -> Result<PullRequest> {
        require(pr_id, "pull_request_id")?;
        require(pr_name, "pull_request_name")?;
        require(author_id, "author_id")?;

        let pr = PullRequest::open(pr_id, pr_name, author_id);

        let created = with_deadline(self.timeout, async {
            let _guard = self.locks.acquire(pr_id).await;
            run(&self.uow, move |s| {
                async move {
                    let id = pr.pull_request_id.as_str();
                    if s.pr_exists(id).await.context("check PR exists")? {
                        return Err(Error::AlreadyExists(Resource::PullRequest(id.to_string())));
                    }
                    let author = s.get_user(&pr.author_id).await?;

                    s.create_pr(&pr).await.context("create PR")?;

                    let candidates = s
                        .find_candidates_for_new_pr(&author.team_name, &author.user_id)
                        .await
                        .context("find candidates")?;
                    for candidate in &candidates {
                        s.assign_reviewer(id, candidate)
                            .await
                            .context(format!("assign reviewer {}", candidate))?;
                    }

                    s.get_pr_with_reviewers(id).await
                }
                .boxed()
            })
            .await
        })
        .await?;

        tracing::info!(
            pr_id = %created.pull_request_id,
            author = %created.author_id,
            reviewers = ?created.assigned_reviewers,
            "Pull request created"
        );
        Ok(created)
    }

    /// Mark a pull request as merged
    ///
    /// Merging a merged pull request returns it unchanged.
    pub async fn merge_pr(&self, pr_id: &str) -> Result<PullRequest> {
        require(pr_id, "pull_request_id")?;

        let merged_at = Utc::now();
        let id = pr_id.to_string();

        with_deadline(self.timeout, async {
            let _guard = self.locks.acquire(pr_id).await;
            run(&self.uow, move |s| {
                async move {
                    let current = s.get_pr(&id).await?;
                    if current.status.is_terminal() {
                        tracing::debug!(pr_id = %id, "Pull request already merged");
                        return s.get_pr_with_reviewers(&id).await;
                    }

                    let merged = s.merge_pr(&id, merged_at).await?;
                    debug_assert!(current.status.can_transition_to(&merged.status));
                    tracing::info!(
                        pr_id = %id,
                        from = ?current.status,
                        to = ?merged.status,
                        "Pull request status transition"
                    );
                    Ok(merged)
                }
                .boxed()
            })
            .await
        })
        .await
    }

    /// Replace one reviewer with the first eligible teammate
    pub async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<Reassignment> {
        require(pr_id, "pull_request_id")?;
        require(old_reviewer_id, "old_reviewer_id")?;

        let id = pr_id.to_string();
        let old = old_reviewer_id.to_string();

        let outcome = with_deadline(self.timeout, async {
            let _guard = self.locks.acquire(pr_id).await;
            run(&self.uow, move |s| {
                async move {
                    let pr = s.get_pr(&id).await?;
                    pr.status.ensure_open()?;

                    let assigned = s
                        .is_reviewer_assigned(&id, &old)
                        .await
                        .context("check reviewer assigned")?;
                    if !assigned {
                        return Err(Conflict::ReviewerNotAssigned.into());
                    }

                    let old_reviewer = s.get_user(&old).await?;
                    let author_id = s.get_pr_author_id(&id).await?;

                    let candidates = s
                        .find_candidates_for_reassignment(&old_reviewer.team_name, &author_id, &id)
                        .await
                        .context("find replacement candidates")?;
                    let replaced_by = candidates
                        .into_iter()
                        .next()
                        .ok_or(Conflict::NoCandidates)?;

                    s.replace_reviewer(&id, &old, &replaced_by)
                        .await
                        .context("replace reviewer")?;

                    let pull_request = s
                        .get_pr_with_reviewers(&id)
                        .await
                        .context("get updated PR")?;

                    Ok(Reassignment {
                        pull_request,
                        replaced_by,
                    })
                }
                .boxed()
            })
            .await
        })
        .await?;

        tracing::info!(
            pr_id = %pr_id,
            old_reviewer = %old_reviewer_id,
            new_reviewer = %outcome.replaced_by,
            "Reviewer reassigned"
        );
        Ok(outcome)
    }

    /// Pull requests the user currently reviews
    pub async fn get_reviewer_prs(&self, reviewer_id: &str) -> Result<Vec<PullRequestShort>> {
        require(reviewer_id, "reviewer_id")?;

        let id = reviewer_id.to_string();
        with_deadline(
            self.timeout,
            run(&self.uow, move |s| {
                async move {
                    s.list_prs_by_reviewer(&id)
                        .await
                        .context("list PRs by reviewer")
                }
                .boxed()
            }),
        )
        .await
    }

    /// Status of a pull request, for callers that only need the state
    pub async fn pr_status(&self, pr_id: &str) -> Result<PrStatus> {
        require(pr_id, "pull_request_id")?;

        let id = pr_id.to_string();
        with_deadline(
            self.timeout,
            run(&self.uow, move |s| {
                async move { Ok(s.get_pr(&id).await?.status) }.boxed()
            }),
        )
        .await
    }
}
