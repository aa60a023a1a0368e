//! Confirmation polling
//!
//! Tracks a submitted transaction until the ledger reports a terminal
//! status or the time budget runs out. The loop sleeps cooperatively
//! between attempts and always performs at least one lookup; transient
//! fetch errors are swallowed and retried until the configured attempt
//! budget is exhausted.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::db::transactions::{self, TxStatus};
use crate::db::Db;
use crate::error::Result;
use crate::ledger::{LedgerClient, Network};

/// Terminal outcome of a polling run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollOutcome {
    Success,
    Failed,
    Timeout,
}

impl PollOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollOutcome::Success => "success",
            PollOutcome::Failed => "failed",
            PollOutcome::Timeout => "timeout",
        }
    }
}

/// Timing knobs for the polling loop
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Sleep between successful-but-inconclusive lookups
    pub poll_interval: Duration,
    /// Total wall-clock budget before giving up with `timeout`
    pub confirmation_timeout: Duration,
    /// Consecutive transient errors tolerated before surfacing one
    pub retry_attempts: u32,
    /// Sleep after a transient error
    pub retry_delay: Duration,
}

pub struct ConfirmationPoller {
    db: Arc<Db>,
    ledger: Arc<dyn LedgerClient>,
    config: PollerConfig,
}

impl ConfirmationPoller {
    pub fn new(db: Arc<Db>, ledger: Arc<dyn LedgerClient>, config: PollerConfig) -> Self {
        Self { db, ledger, config }
    }

    /// Poll until the transaction is terminal or the budget elapses.
    ///
    /// The resolved status is persisted onto the local transaction rows
    /// before returning. A lookup that finds nothing yet is not an
    /// error; the loop sleeps and retries within the deadline.
    pub async fn poll_transaction_status(
        &self,
        transaction_hash: &str,
        network: Network,
    ) -> Result<PollOutcome> {
        let deadline = Instant::now() + self.config.confirmation_timeout;
        let mut consecutive_errors: u32 = 0;

        loop {
            match self.ledger.fetch_transaction(network, transaction_hash).await {
                Ok(Some(info)) if info.successful => {
                    let raw = info.raw.to_string();
                    self.persist(transaction_hash, network, TxStatus::Success, Some(&raw), None)?;
                    info!(transaction_hash = %transaction_hash, "Transaction confirmed");
                    return Ok(PollOutcome::Success);
                }
                Ok(Some(info)) => {
                    let raw = info.raw.to_string();
                    self.persist(transaction_hash, network, TxStatus::Failed, None, Some(&raw))?;
                    info!(transaction_hash = %transaction_hash, "Transaction failed on ledger");
                    return Ok(PollOutcome::Failed);
                }
                Ok(None) => {
                    consecutive_errors = 0;
                    debug!(transaction_hash = %transaction_hash, "Transaction not yet visible");
                }
                Err(err) => {
                    consecutive_errors += 1;
                    if consecutive_errors > self.config.retry_attempts {
                        return Err(err);
                    }
                    warn!(
                        transaction_hash = %transaction_hash,
                        attempt = consecutive_errors,
                        error = %err,
                        "Transient ledger error while polling"
                    );
                }
            }

            if Instant::now() >= deadline {
                self.persist(
                    transaction_hash,
                    network,
                    TxStatus::Timeout,
                    None,
                    Some("confirmation deadline elapsed"),
                )?;
                warn!(transaction_hash = %transaction_hash, "Confirmation timed out");
                return Ok(PollOutcome::Timeout);
            }

            let delay = if consecutive_errors > 0 {
                self.config.retry_delay
            } else {
                self.config.poll_interval
            };
            tokio::time::sleep(delay).await;
        }
    }

    fn persist(
        &self,
        transaction_hash: &str,
        network: Network,
        status: TxStatus,
        transaction_data: Option<&str>,
        error_data: Option<&str>,
    ) -> Result<()> {
        // Pending-guarded: an already-terminal row is left untouched
        let updated = self.db.with_conn(|conn| {
            transactions::update_status(
                conn,
                transaction_hash,
                network,
                status,
                transaction_data,
                error_data,
            )
        })?;
        if updated == 0 {
            debug!(
                transaction_hash = %transaction_hash,
                status = %status,
                "No pending rows to update"
            );
        }
        Ok(())
    }
}

// Sanity check only; the loop itself is exercised in tests/anchoring.rs
// against a scripted mock ledger.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_form() {
        assert_eq!(PollOutcome::Success.as_str(), "success");
        assert_eq!(PollOutcome::Failed.as_str(), "failed");
        assert_eq!(PollOutcome::Timeout.as_str(), "timeout");
        assert_eq!(
            serde_json::to_string(&PollOutcome::Timeout).unwrap(),
            "\"timeout\""
        );
    }
}
