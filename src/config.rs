//! Configuration
//!
//! CLI arguments and environment variable handling using clap.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::anchor::gateway::FeeLimits;
use crate::anchor::poller::PollerConfig;
use crate::ledger::{LedgerConfig, LedgerSettings};

/// Anchorage - document verification and ledger anchoring service
#[derive(Parser, Debug, Clone)]
#[command(name = "anchorage")]
#[command(about = "Document verification workflow and ledger anchoring service")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "anchorage.db")]
    pub database_path: PathBuf,

    /// Horizon-style REST endpoint for the test network
    #[arg(long, env = "TESTNET_HORIZON_URL", default_value = "https://horizon-testnet.stellar.org")]
    pub testnet_horizon_url: String,

    /// Horizon-style REST endpoint for the main network
    #[arg(long, env = "MAINNET_HORIZON_URL", default_value = "https://horizon.stellar.org")]
    pub mainnet_horizon_url: String,

    /// Test network passphrase (mixed into transaction hashes)
    #[arg(long, env = "TESTNET_PASSPHRASE", default_value = "Test SDF Network ; September 2015")]
    pub testnet_passphrase: String,

    /// Main network passphrase
    #[arg(
        long,
        env = "MAINNET_PASSPHRASE",
        default_value = "Public Global Stellar Network ; September 2015"
    )]
    pub mainnet_passphrase: String,

    /// Faucet endpoint for funding test-network accounts
    #[arg(long, env = "FRIENDBOT_URL", default_value = "https://friendbot.stellar.org")]
    pub friendbot_url: String,

    /// Base fee per operation, in the ledger's smallest unit
    #[arg(long, env = "BASE_FEE", default_value = "100")]
    pub base_fee: u64,

    /// Upper bound on a single transaction's total fee
    #[arg(long, env = "MAX_FEE", default_value = "10000")]
    pub max_fee: u64,

    /// Timeout for ledger HTTP requests in seconds
    #[arg(long, env = "SUBMIT_TIMEOUT_SECS", default_value = "30")]
    pub submit_timeout_secs: u64,

    /// Sleep between confirmation polls in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "2000")]
    pub poll_interval_ms: u64,

    /// Total confirmation budget in seconds before a poll times out
    #[arg(long, env = "CONFIRMATION_TIMEOUT_SECS", default_value = "60")]
    pub confirmation_timeout_secs: u64,

    /// Consecutive transient errors tolerated while polling
    #[arg(long, env = "RETRY_ATTEMPTS", default_value = "3")]
    pub retry_attempts: u32,

    /// Sleep after a transient polling error in milliseconds
    #[arg(long, env = "RETRY_DELAY_MS", default_value = "1000")]
    pub retry_delay_ms: u64,

    /// 64 hex chars; encrypts account secrets at rest.
    /// Required unless --dev-mode is set.
    #[arg(long, env = "SECRET_STORE_KEY")]
    pub secret_store_key: Option<String>,

    /// Enable development mode (allows a default secret-store key)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration before startup
    pub fn validate(&self) -> Result<(), String> {
        if self.base_fee == 0 {
            return Err("BASE_FEE must be greater than 0".to_string());
        }
        if self.max_fee < self.base_fee {
            return Err("MAX_FEE must be at least BASE_FEE".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("POLL_INTERVAL_MS must be greater than 0".to_string());
        }
        if self.confirmation_timeout_secs == 0 {
            return Err("CONFIRMATION_TIMEOUT_SECS must be greater than 0".to_string());
        }
        if let Some(ref key) = self.secret_store_key {
            if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err("SECRET_STORE_KEY must be 64 hex characters".to_string());
            }
        } else if !self.dev_mode {
            return Err("SECRET_STORE_KEY is required in production mode".to_string());
        }
        Ok(())
    }

    /// Resolve the secret-store key, falling back to the dev-only
    /// default when --dev-mode is set
    pub fn secret_store_key_bytes(&self) -> Result<[u8; 32], String> {
        let hex_key = match &self.secret_store_key {
            Some(key) => key.clone(),
            None if self.dev_mode => "00".repeat(32),
            None => return Err("SECRET_STORE_KEY is required in production mode".to_string()),
        };

        let bytes = hex::decode(&hex_key).map_err(|_| "SECRET_STORE_KEY must be valid hex".to_string())?;
        let mut key = [0u8; 32];
        if bytes.len() != key.len() {
            return Err("SECRET_STORE_KEY must be 64 hex characters".to_string());
        }
        key.copy_from_slice(&bytes);
        Ok(key)
    }

    /// Per-network ledger endpoints
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            testnet: LedgerSettings {
                horizon_url: self.testnet_horizon_url.trim_end_matches('/').to_string(),
                passphrase: self.testnet_passphrase.clone(),
                friendbot_url: Some(self.friendbot_url.clone()),
            },
            mainnet: LedgerSettings {
                horizon_url: self.mainnet_horizon_url.trim_end_matches('/').to_string(),
                passphrase: self.mainnet_passphrase.clone(),
                friendbot_url: None,
            },
        }
    }

    pub fn fee_limits(&self) -> FeeLimits {
        FeeLimits {
            base_fee: self.base_fee,
            max_fee: self.max_fee,
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            retry_attempts: self.retry_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }
}
