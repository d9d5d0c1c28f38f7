//! Atomic execution scopes
//!
//! [`run`] hands the scoped closure an explicit session. The session commits
//! when the closure succeeds and rolls back otherwise; the closure's error is
//! returned unchanged.
//!
//! [`PrLocks`] serialises operations on the same pull request inside one
//! process, so read-check-write sequences such as reassignment cannot
//! interleave.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Error, Result, ResultExt};
use crate::store::{Session, UnitOfWork};

/// Run `f` inside one unit of work
pub async fn run<U, T, F>(uow: &U, f: F) -> Result<T>
where
    U: UnitOfWork + ?Sized,
    T: Send,
    F: for<'s> FnOnce(&'s mut U::Session) -> BoxFuture<'s, Result<T>> + Send,
{
    let mut session = uow.begin().await.context("begin transaction")?;
    tracing::debug!("Unit of work started");

    match f(&mut session).await {
        Ok(value) => {
            session.commit().await.context("commit transaction")?;
            tracing::debug!("Unit of work committed");
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback().await {
                tracing::warn!(error = %rollback_err, "Failed to roll back unit of work");
            }
            if err.is_domain() {
                tracing::debug!(code = err.code(), error = %err, "Unit of work rolled back");
            } else {
                tracing::warn!(code = err.code(), error = %err, "Unit of work rolled back");
            }
            Err(err)
        }
    }
}

/// Bound an operation by `timeout`
///
/// On expiry the operation future is dropped, which rolls back any open
/// session it owns.
pub async fn with_deadline<T, Fut>(timeout: Duration, op: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(?timeout, "Operation deadline exceeded");
            Err(Error::Timeout(timeout))
        }
    }
}

/// Per pull request advisory locks
#[derive(Debug, Default)]
pub struct PrLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Held for the duration of a pull request mutation
pub type PrGuard = OwnedMutexGuard<()>;

impl PrLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other operation holds `pr_id`
    pub async fn acquire(&self, pr_id: &str) -> PrGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only referenced by the table are idle
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(pr_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of pull requests with a live lock entry
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
