//! Horizon-style HTTP ledger client
//!
//! Reads account state from `GET {horizon}/accounts/{key}`, submits
//! signed envelopes to `POST {horizon}/transactions`, fetches
//! transactions from `GET {horizon}/transactions/{hash}`, and funds
//! test-network accounts through a friendbot-style faucet.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AnchorError, Result};
use crate::ledger::tx::TransactionEnvelope;
use crate::ledger::{AccountInfo, LedgerClient, LedgerConfig, Network, SubmitReceipt, TransactionInfo};

/// Account record as Horizon renders it
#[derive(Debug, Deserialize)]
struct HorizonAccount {
    id: String,
    sequence: String,
    #[serde(default)]
    balances: Vec<HorizonBalance>,
}

#[derive(Debug, Deserialize)]
struct HorizonBalance {
    balance: String,
    #[serde(default)]
    asset_type: String,
}

/// Transaction record as Horizon renders it
#[derive(Debug, Deserialize)]
struct HorizonTransaction {
    hash: String,
    successful: bool,
    #[serde(default)]
    memo: Option<String>,
}

/// HTTP implementation of [`LedgerClient`]
pub struct HorizonClient {
    config: LedgerConfig,
    http: reqwest::Client,
}

impl HorizonClient {
    pub fn new(config: LedgerConfig, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AnchorError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    fn base_url(&self, network: Network) -> &str {
        &self.config.settings(network).horizon_url
    }
}

#[async_trait]
impl LedgerClient for HorizonClient {
    async fn fetch_account(&self, network: Network, public_key: &str) -> Result<AccountInfo> {
        let url = format!("{}/accounts/{}", self.base_url(network), public_key);
        let response = self.http.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AnchorError::AccountNotFound(public_key.to_string()));
        }
        if !response.status().is_success() {
            return Err(AnchorError::Ledger(format!(
                "account lookup returned HTTP {}",
                response.status()
            )));
        }

        let account: HorizonAccount = response.json().await?;
        let sequence = account.sequence.parse::<i64>().map_err(|_| {
            AnchorError::Ledger(format!("ledger returned non-numeric sequence for {}", account.id))
        })?;
        let balance = account
            .balances
            .iter()
            .find(|b| b.asset_type == "native")
            .or_else(|| account.balances.first())
            .map(|b| b.balance.clone())
            .unwrap_or_else(|| "0".to_string());

        Ok(AccountInfo {
            account_id: account.id,
            sequence,
            balance,
        })
    }

    async fn submit(
        &self,
        network: Network,
        envelope: &TransactionEnvelope,
    ) -> Result<SubmitReceipt> {
        let url = format!("{}/transactions", self.base_url(network));
        debug!(network = %network, "Submitting transaction envelope");

        let response = self.http.post(&url).json(envelope).send().await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();

        if !status.is_success() {
            warn!(network = %network, status = %status, "Ledger rejected transaction");
            return Err(AnchorError::Ledger(body.to_string()));
        }

        let hash = body
            .get("hash")
            .and_then(|h| h.as_str())
            .map(str::to_string)
            .unwrap_or_default();

        Ok(SubmitReceipt { hash, raw: body })
    }

    async fn fetch_transaction(
        &self,
        network: Network,
        hash: &str,
    ) -> Result<Option<TransactionInfo>> {
        let url = format!("{}/transactions/{}", self.base_url(network), hash);
        let response = self.http.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AnchorError::Ledger(format!(
                "transaction lookup returned HTTP {}",
                response.status()
            )));
        }

        let raw: serde_json::Value = response.json().await?;
        let record: HorizonTransaction = serde_json::from_value(raw.clone())
            .map_err(|e| AnchorError::Ledger(format!("unexpected transaction record: {e}")))?;

        Ok(Some(TransactionInfo {
            hash: record.hash,
            successful: record.successful,
            memo: record.memo,
            raw,
        }))
    }

    async fn fund_account(&self, public_key: &str) -> Result<serde_json::Value> {
        let friendbot = self
            .config
            .testnet
            .friendbot_url
            .as_deref()
            .ok_or_else(|| AnchorError::FundingFailed("no faucet configured".into()))?;

        let url = format!("{friendbot}?addr={public_key}");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AnchorError::FundingFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnchorError::FundingFailed(format!(
                "faucet returned HTTP {}",
                response.status()
            )));
        }

        Ok(response.json().await.unwrap_or_default())
    }

    async fn ping(&self, network: Network) -> bool {
        self.http
            .get(self.base_url(network))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
