//! Assignment statistics

use std::time::Duration;

use futures::FutureExt;

use crate::config::EngineConfig;
use crate::error::{Result, ResultExt};
use crate::models::{PrStats, ReviewerWorkload, UserAssignmentStats};
use crate::store::{StatsStore, UnitOfWork};
use crate::unit_of_work::{run, with_deadline};

/// Read-only aggregate queries
pub struct StatsService<U> {
    uow: U,
    timeout: Duration,
}

impl<U: UnitOfWork> StatsService<U> {
    pub fn new(uow: U) -> Self {
        Self::from_config(uow, &EngineConfig::default())
    }

    pub fn from_config(uow: U, config: &EngineConfig) -> Self {
        Self {
            uow,
            timeout: config.operation_timeout,
        }
    }

    /// Assignments per user over all pull requests, busiest first
    pub async fn user_assignment_stats(&self) -> Result<Vec<UserAssignmentStats>> {
        with_deadline(
            self.timeout,
            run(&self.uow, |s| {
                async move {
                    s.user_assignment_stats()
                        .await
                        .context("get user assignment stats")
                }
                .boxed()
            }),
        )
        .await
    }

    pub async fn pr_stats(&self) -> Result<PrStats> {
        with_deadline(
            self.timeout,
            run(&self.uow, |s| {
                async move { s.pr_stats().await.context("get PR stats") }.boxed()
            }),
        )
        .await
    }

    /// Open reviews per user, busiest first
    pub async fn reviewer_workload(&self) -> Result<Vec<ReviewerWorkload>> {
        with_deadline(
            self.timeout,
            run(&self.uow, |s| {
                async move {
                    s.reviewer_workload()
                        .await
                        .context("get reviewer workload")
                }
                .boxed()
            }),
        )
        .await
    }
}
