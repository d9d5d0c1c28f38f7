//! Error types for Roster

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for Roster operations
pub type Result<T> = std::result::Result<T, Error>;

/// A keyed record that an operation looked up or tried to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Team(String),
    User(String),
    PullRequest(String),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Team(name) => write!(f, "team '{}'", name),
            Resource::User(id) => write!(f, "user '{}'", id),
            Resource::PullRequest(id) => write!(f, "pull request '{}'", id),
        }
    }
}

/// State conflicts raised by the assignment engine
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// Mutation attempted on a merged pull request
    #[error("cannot modify merged pull request")]
    PrMerged,

    /// The reviewer to replace is not on the pull request
    #[error("reviewer is not assigned to this pull request")]
    ReviewerNotAssigned,

    /// Nobody in the team can take over the review
    #[error("no active replacement candidate in team")]
    NoCandidates,
}

/// Error type for Roster operations
#[derive(Error, Debug)]
pub enum Error {
    /// Duplicate team or pull request key
    #[error("{0} already exists")]
    AlreadyExists(Resource),

    /// Team, user or pull request is absent
    #[error("{0} not found")]
    NotFound(Resource),

    /// Operation is not allowed in the current state
    #[error(transparent)]
    Conflict(#[from] Conflict),

    /// Request rejected before touching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Deadline expired; the unit of work was rolled back
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Unclassified store or infrastructure failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Error::AlreadyExists(Resource::Team(_)) => "TEAM_EXISTS",
            Error::AlreadyExists(_) => "PR_EXISTS",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(Conflict::PrMerged) => "PR_MERGED",
            Error::Conflict(Conflict::ReviewerNotAssigned) => "NOT_ASSIGNED",
            Error::Conflict(Conflict::NoCandidates) => "NO_CANDIDATE",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Timeout(_) => "TIMEOUT",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error belongs to the business taxonomy rather than infrastructure
    pub fn is_domain(&self) -> bool {
        !matches!(self, Error::Internal(_) | Error::Timeout(_))
    }
}

/// Reject an empty required field before any store access
pub(crate) fn require(value: &str, field: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Attach operation context to infrastructure failures
///
/// Domain errors pass through unchanged so callers can still match on them.
pub trait ResultExt<T> {
    fn context(self, what: impl fmt::Display) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, what: impl fmt::Display) -> Result<T> {
        self.map_err(|e| match e {
            Error::Internal(cause) => Error::Internal(format!("{}: {}", what, cause)),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_internal_only() {
        let err: Result<()> = Err(Error::Internal("disk full".to_string()));
        let err = err.context("assign reviewer u2").unwrap_err();
        assert_eq!(err.to_string(), "Internal error: assign reviewer u2: disk full");

        let err: Result<()> = Err(Error::Conflict(Conflict::NoCandidates));
        let err = err.context("assign reviewer u2").unwrap_err();
        assert!(matches!(err, Error::Conflict(Conflict::NoCandidates)));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::AlreadyExists(Resource::Team("backend".into())).code(),
            "TEAM_EXISTS"
        );
        assert_eq!(
            Error::AlreadyExists(Resource::PullRequest("pr-1".into())).code(),
            "PR_EXISTS"
        );
        assert_eq!(Error::from(Conflict::PrMerged).code(), "PR_MERGED");
        assert_eq!(Error::NotFound(Resource::User("u1".into())).code(), "NOT_FOUND");
        assert!(!Error::Timeout(Duration::from_secs(1)).is_domain());
        assert!(!Error::Internal("disk full".into()).is_domain());
        assert!(Error::from(Conflict::NoCandidates).is_domain());
        assert!(Error::Validation("team_name is required".into()).is_domain());
    }

    #[test]
    fn test_display() {
        let err = Error::NotFound(Resource::PullRequest("pr-9".into()));
        assert_eq!(err.to_string(), "pull request 'pr-9' not found");
        assert_eq!(
            Error::from(Conflict::ReviewerNotAssigned).to_string(),
            "reviewer is not assigned to this pull request"
        );
    }
}
