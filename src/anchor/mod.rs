//! Ledger anchoring
//!
//! The gateway owns ledger accounts and transactions: key generation,
//! test-network funding, fee estimation, single and batch hash
//! anchoring, and trust-minimizing verification against the public
//! ledger. The poller tracks a submitted transaction to a terminal
//! status within a fixed time budget.

pub mod gateway;
pub mod poller;

pub use gateway::{AnchoringGateway, CreatedAccount, FeeEstimate};
pub use poller::{ConfirmationPoller, PollOutcome};
