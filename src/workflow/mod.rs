//! Document verification workflow
//!
//! The state machine a document moves through on its way to a ledger
//! anchor. Terminal states have no outgoing edges; every state change is
//! recorded in an append-only history.

pub mod engine;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnchorError;

pub use engine::WorkflowEngine;

/// Workflow lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationState {
    Submitted,
    Hashing,
    Analyzing,
    AwaitingBlockchain,
    Anchored,
    Failed,
    Rejected,
}

impl VerificationState {
    /// States reachable from this one
    pub fn allowed_transitions(&self) -> &'static [VerificationState] {
        use VerificationState::*;
        match self {
            Submitted => &[Hashing, Failed, Rejected],
            Hashing => &[Analyzing, Failed],
            Analyzing => &[AwaitingBlockchain, Failed, Rejected],
            AwaitingBlockchain => &[Anchored, Failed],
            Anchored | Failed | Rejected => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn can_transition_to(&self, target: VerificationState) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationState::Submitted => "SUBMITTED",
            VerificationState::Hashing => "HASHING",
            VerificationState::Analyzing => "ANALYZING",
            VerificationState::AwaitingBlockchain => "AWAITING_BLOCKCHAIN",
            VerificationState::Anchored => "ANCHORED",
            VerificationState::Failed => "FAILED",
            VerificationState::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationState {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMITTED" => Ok(VerificationState::Submitted),
            "HASHING" => Ok(VerificationState::Hashing),
            "ANALYZING" => Ok(VerificationState::Analyzing),
            "AWAITING_BLOCKCHAIN" => Ok(VerificationState::AwaitingBlockchain),
            "ANCHORED" => Ok(VerificationState::Anchored),
            "FAILED" => Ok(VerificationState::Failed),
            "REJECTED" => Ok(VerificationState::Rejected),
            other => Err(AnchorError::Validation(format!(
                "unknown workflow state '{other}'"
            ))),
        }
    }
}
