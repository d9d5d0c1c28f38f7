//! Pull request lifecycle
//!
//! A pull request starts `OPEN` and ends `MERGED`. Merging is the only
//! transition; merging an already merged pull request is a no-op, which is
//! what makes `MergePR` idempotent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Conflict, Error, Result};

/// Lifecycle state of a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    /// Under review; reviewers may change
    Open,
    /// Terminal; the reviewer set is frozen
    Merged,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "OPEN",
            PrStatus::Merged => "MERGED",
        }
    }

    /// Check if a transition to the given status is valid
    pub fn can_transition_to(&self, to: &PrStatus) -> bool {
        matches!(
            (self, to),
            (PrStatus::Open, PrStatus::Merged) | (PrStatus::Merged, PrStatus::Merged)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PrStatus::Merged)
    }

    /// Guard for reviewer-mutating operations
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_terminal() {
            return Err(Conflict::PrMerged.into());
        }
        Ok(())
    }
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(PrStatus::Open),
            "MERGED" => Ok(PrStatus::Merged),
            other => Err(Error::Internal(format!(
                "unknown pull request status '{}'",
                other
            ))),
        }
    }
}
