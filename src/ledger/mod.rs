//! Ledger protocol layer
//!
//! Models the public ledger the service anchors against: networks,
//! account keys, transaction building/signing, and the Horizon-style
//! HTTP client. The `LedgerClient` trait is the seam between the
//! anchoring gateway and the network so tests can substitute an
//! in-memory ledger.

pub mod horizon;
pub mod keys;
pub mod tx;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AnchorError, Result};
use tx::TransactionEnvelope;

/// The two recognized ledger networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(AnchorError::Validation(format!(
                "network must be 'testnet' or 'mainnet', got '{other}'"
            ))),
        }
    }
}

/// Per-network endpoint configuration
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Horizon-style REST base URL
    pub horizon_url: String,
    /// Network passphrase mixed into every transaction hash
    pub passphrase: String,
    /// Faucet endpoint; only present on test networks
    pub friendbot_url: Option<String>,
}

/// Endpoint configuration for both networks
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub testnet: LedgerSettings,
    pub mainnet: LedgerSettings,
}

impl LedgerConfig {
    pub fn settings(&self, network: Network) -> &LedgerSettings {
        match network {
            Network::Testnet => &self.testnet,
            Network::Mainnet => &self.mainnet,
        }
    }
}

/// Account state as reported by the ledger
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub account_id: String,
    pub sequence: i64,
    pub balance: String,
}

/// A submitted transaction accepted by the ledger
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub hash: String,
    /// Raw ledger response, kept for audit
    pub raw: serde_json::Value,
}

/// A transaction as reported back by the ledger
#[derive(Debug, Clone)]
pub struct TransactionInfo {
    pub hash: String,
    pub successful: bool,
    pub memo: Option<String>,
    pub raw: serde_json::Value,
}

/// Network seam between the gateway/poller and the public ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Load current account state; `AccountNotFound` if the ledger has
    /// no record of the key
    async fn fetch_account(&self, network: Network, public_key: &str) -> Result<AccountInfo>;

    /// Submit a signed envelope. `Err(Ledger(..))` carries the raw
    /// rejection payload for audit storage.
    async fn submit(&self, network: Network, envelope: &TransactionEnvelope)
        -> Result<SubmitReceipt>;

    /// Fetch a transaction by hash; `None` means not yet visible
    async fn fetch_transaction(
        &self,
        network: Network,
        hash: &str,
    ) -> Result<Option<TransactionInfo>>;

    /// Ask the test-network faucet to fund an account
    async fn fund_account(&self, public_key: &str) -> Result<serde_json::Value>;

    /// Cheap connectivity probe for health reporting
    async fn ping(&self, network: Network) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parse() {
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_network_serde_roundtrip() {
        let json = serde_json::to_string(&Network::Testnet).unwrap();
        assert_eq!(json, "\"testnet\"");
        let back: Network = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Network::Testnet);
    }
}
