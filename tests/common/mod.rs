//! Shared test fixtures: an in-memory ledger standing in for Horizon.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use anchorage::anchor::gateway::{AnchoringGateway, FeeLimits};
use anchorage::anchor::poller::{ConfirmationPoller, PollerConfig};
use anchorage::db::Db;
use anchorage::error::{AnchorError, Result};
use anchorage::ledger::keys::SecretStore;
use anchorage::ledger::tx::TransactionEnvelope;
use anchorage::ledger::{
    AccountInfo, LedgerClient, LedgerConfig, LedgerSettings, Network, SubmitReceipt,
    TransactionInfo,
};

pub const TEST_PASSPHRASE: &str = "Test SDF Network ; September 2015";

pub fn test_ledger_config() -> LedgerConfig {
    LedgerConfig {
        testnet: LedgerSettings {
            horizon_url: "http://horizon.local".to_string(),
            passphrase: TEST_PASSPHRASE.to_string(),
            friendbot_url: Some("http://friendbot.local".to_string()),
        },
        mainnet: LedgerSettings {
            horizon_url: "http://horizon-main.local".to_string(),
            passphrase: "Main Network".to_string(),
            friendbot_url: None,
        },
    }
}

#[derive(Default)]
struct MockState {
    accounts: HashMap<String, AccountInfo>,
    transactions: HashMap<String, TransactionInfo>,
    /// Fetches that must happen before a hash becomes visible
    visible_after: HashMap<String, u32>,
    submissions: Vec<TransactionEnvelope>,
    reject_submissions: bool,
    fail_funding: bool,
    fetch_errors_remaining: u32,
    fetch_count: u32,
}

/// In-memory ledger with scriptable behavior
pub struct MockLedger {
    passphrase: String,
    state: Mutex<MockState>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            passphrase: TEST_PASSPHRASE.to_string(),
            state: Mutex::new(MockState::default()),
        })
    }

    pub fn with_account(&self, public_key: &str, sequence: i64, balance: &str) {
        self.state.lock().unwrap().accounts.insert(
            public_key.to_string(),
            AccountInfo {
                account_id: public_key.to_string(),
                sequence,
                balance: balance.to_string(),
            },
        );
    }

    /// Register a transaction as visible on the ledger
    pub fn set_transaction(&self, hash: &str, successful: bool, memo: Option<&str>) {
        self.state.lock().unwrap().transactions.insert(
            hash.to_string(),
            TransactionInfo {
                hash: hash.to_string(),
                successful,
                memo: memo.map(str::to_string),
                raw: serde_json::json!({ "hash": hash, "successful": successful }),
            },
        );
    }

    /// Delay visibility of a hash until `fetches` lookups have occurred
    pub fn set_visible_after(&self, hash: &str, fetches: u32) {
        self.state
            .lock()
            .unwrap()
            .visible_after
            .insert(hash.to_string(), fetches);
    }

    pub fn reject_submissions(&self) {
        self.state.lock().unwrap().reject_submissions = true;
    }

    pub fn fail_funding(&self) {
        self.state.lock().unwrap().fail_funding = true;
    }

    pub fn fail_next_fetches(&self, count: u32) {
        self.state.lock().unwrap().fetch_errors_remaining = count;
    }

    pub fn submissions(&self) -> Vec<TransactionEnvelope> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn fetch_count(&self) -> u32 {
        self.state.lock().unwrap().fetch_count
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn fetch_account(&self, _network: Network, public_key: &str) -> Result<AccountInfo> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(public_key)
            .cloned()
            .ok_or_else(|| AnchorError::AccountNotFound(public_key.to_string()))
    }

    async fn submit(
        &self,
        _network: Network,
        envelope: &TransactionEnvelope,
    ) -> Result<SubmitReceipt> {
        let hash = envelope.tx.hash_hex(&self.passphrase)?;
        let mut state = self.state.lock().unwrap();
        state.submissions.push(envelope.clone());

        if state.reject_submissions {
            return Err(AnchorError::Ledger(
                "{\"title\":\"Transaction Failed\",\"extras\":{\"result_codes\":\"tx_failed\"}}"
                    .to_string(),
            ));
        }

        // Consume the source sequence like a real ledger
        if let Some(account) = state.accounts.get_mut(&envelope.tx.source_account) {
            account.sequence = envelope.tx.sequence;
        }

        let raw = serde_json::json!({ "hash": hash, "successful": true });
        state.transactions.insert(
            hash.clone(),
            TransactionInfo {
                hash: hash.clone(),
                successful: true,
                memo: envelope.tx.memo.text().map(str::to_string),
                raw: raw.clone(),
            },
        );

        Ok(SubmitReceipt { hash, raw })
    }

    async fn fetch_transaction(
        &self,
        _network: Network,
        hash: &str,
    ) -> Result<Option<TransactionInfo>> {
        let mut state = self.state.lock().unwrap();
        state.fetch_count += 1;

        if state.fetch_errors_remaining > 0 {
            state.fetch_errors_remaining -= 1;
            return Err(AnchorError::Ledger("connection reset".to_string()));
        }

        if let Some(remaining) = state.visible_after.get_mut(hash) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }

        Ok(state.transactions.get(hash).cloned())
    }

    async fn fund_account(&self, public_key: &str) -> Result<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        if state.fail_funding {
            return Err(AnchorError::FundingFailed("faucet returned HTTP 503".into()));
        }

        state.accounts.insert(
            public_key.to_string(),
            AccountInfo {
                account_id: public_key.to_string(),
                sequence: 0,
                balance: "10000.0000000".to_string(),
            },
        );
        Ok(serde_json::json!({ "funded": public_key }))
    }

    async fn ping(&self, _network: Network) -> bool {
        true
    }
}

/// A database, mock ledger, and gateway wired together
pub fn setup_gateway() -> (Arc<Db>, Arc<MockLedger>, AnchoringGateway) {
    let db = Arc::new(Db::open_in_memory().unwrap());
    let mock = MockLedger::new();
    let gateway = AnchoringGateway::new(
        db.clone(),
        mock.clone(),
        Arc::new(test_ledger_config()),
        SecretStore::new([1u8; 32]),
        FeeLimits {
            base_fee: 100,
            max_fee: 10_000,
        },
    );
    (db, mock, gateway)
}

/// A poller over the same database and mock ledger with fast timing
pub fn fast_poller(db: Arc<Db>, mock: Arc<MockLedger>, timeout_ms: u64) -> ConfirmationPoller {
    ConfirmationPoller::new(
        db,
        mock,
        PollerConfig {
            poll_interval: std::time::Duration::from_millis(10),
            confirmation_timeout: std::time::Duration::from_millis(timeout_ms),
            retry_attempts: 3,
            retry_delay: std::time::Duration::from_millis(5),
        },
    )
}

/// A 64-char hex document hash with a recognizable prefix byte
pub fn doc_hash(seed: u8) -> String {
    hex::encode([seed; 32])
}
