//! Anchoring gateway
//!
//! Secret keys exist here only for the duration of a single call: the
//! generated seed is returned to the caller exactly once at account
//! creation (encrypted before it touches the database), and anchoring
//! signs with a caller-supplied seed that is dropped when the call
//! returns. Nothing in this module logs key material.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::db::transactions::{self, NewTransaction, TransactionRow, TxStatus};
use crate::db::{accounts, Db};
use crate::error::{AnchorError, Result};
use crate::ledger::keys::{self, SecretStore};
use crate::ledger::tx::{TxBuilder, MIN_PAYMENT_AMOUNT};
use crate::ledger::{LedgerClient, LedgerConfig, Network};

/// Fee bounds applied to every built transaction
#[derive(Debug, Clone)]
pub struct FeeLimits {
    pub base_fee: u64,
    pub max_fee: u64,
}

/// Key pair handed to the caller at creation; the secret is not
/// retrievable again through this interface
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAccount {
    pub public_key: String,
    pub secret_key: String,
    pub network: Network,
}

/// Result of a fee estimation; `cost = fee × operation count`
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub fee: u64,
    pub cost: u64,
}

pub struct AnchoringGateway {
    db: Arc<Db>,
    ledger: Arc<dyn LedgerClient>,
    networks: Arc<LedgerConfig>,
    secrets: SecretStore,
    fees: FeeLimits,
}

impl AnchoringGateway {
    pub fn new(
        db: Arc<Db>,
        ledger: Arc<dyn LedgerClient>,
        networks: Arc<LedgerConfig>,
        secrets: SecretStore,
        fees: FeeLimits,
    ) -> Self {
        Self {
            db,
            ledger,
            networks,
            secrets,
            fees,
        }
    }

    /// Generate a fresh key pair and persist an unfunded account.
    /// The plaintext secret is returned here and never again.
    pub fn create_account(&self, network: Network) -> Result<CreatedAccount> {
        let pair = keys::generate_keypair();
        let encrypted = self.secrets.encrypt(&pair.secret_key)?;

        self.db
            .with_conn(|conn| accounts::insert_account(conn, &pair.public_key, &encrypted, network))?;

        info!(public_key = %pair.public_key, network = %network, "Ledger account created");

        Ok(CreatedAccount {
            public_key: pair.public_key,
            secret_key: pair.secret_key.to_string(),
            network,
        })
    }

    /// Fund an account through the test-network faucet. One attempt; a
    /// failed call leaves the account unfunded.
    pub async fn fund_account(&self, public_key: &str, network: Network) -> Result<String> {
        if network != Network::Testnet {
            return Err(AnchorError::Validation(
                "account funding is only available on testnet".into(),
            ));
        }

        self.db
            .with_conn(|conn| accounts::find_account(conn, public_key))?
            .ok_or_else(|| AnchorError::NotFound(format!("account {public_key}")))?;

        self.ledger.fund_account(public_key).await?;

        // Read the credited balance back from the ledger
        let account = self.ledger.fetch_account(network, public_key).await?;
        self.db
            .with_conn(|conn| accounts::mark_funded(conn, public_key, &account.balance))?;

        info!(public_key = %public_key, balance = %account.balance, "Account funded");
        Ok(account.balance)
    }

    /// Current balance straight from the ledger, not the cached row
    pub async fn get_account_balance(&self, public_key: &str, network: Network) -> Result<String> {
        let account = self.ledger.fetch_account(network, public_key).await?;
        Ok(account.balance)
    }

    /// Build (but never submit) a minimal anchoring transaction and
    /// report its fee
    pub fn estimate_transaction_fee(
        &self,
        source_public_key: &str,
        document_hash: &str,
        _network: Network,
    ) -> Result<FeeEstimate> {
        let tx = TxBuilder::new(source_public_key, 0, self.fees.base_fee)
            .payment(source_public_key, MIN_PAYMENT_AMOUNT)
            .memo_text(document_hash)
            .build()?;

        let operation_count = tx.operations.len() as u64;
        Ok(FeeEstimate {
            fee: self.fees.base_fee,
            cost: self.fees.base_fee * operation_count,
        })
    }

    /// Anchor a single document hash. Exactly one transaction row is
    /// written regardless of outcome; a rejected submission flips it to
    /// `failed` and re-raises.
    pub async fn anchor_document_hash(
        &self,
        source_public_key: &str,
        source_secret_key: &str,
        document_hash: &str,
        network: Network,
    ) -> Result<TransactionRow> {
        self.anchor(source_public_key, source_secret_key, &[document_hash], network)
            .await
            .map(|mut rows| rows.remove(0))
    }

    /// Anchor several document hashes in one transaction: one payment
    /// per hash, but the ledger allows a single memo, so only the FIRST
    /// hash is memo-verifiable. One row per hash is persisted, sharing
    /// `transaction_hash`, `status`, and `fee`.
    pub async fn batch_anchor_documents(
        &self,
        source_public_key: &str,
        source_secret_key: &str,
        document_hashes: &[&str],
        network: Network,
    ) -> Result<Vec<TransactionRow>> {
        if document_hashes.is_empty() {
            return Err(AnchorError::Validation(
                "at least one document hash is required".into(),
            ));
        }
        self.anchor(source_public_key, source_secret_key, document_hashes, network)
            .await
    }

    async fn anchor(
        &self,
        source_public_key: &str,
        source_secret_key: &str,
        document_hashes: &[&str],
        network: Network,
    ) -> Result<Vec<TransactionRow>> {
        let settings = self.networks.settings(network);

        // Current sequence state comes from the ledger, not local rows
        let account = self.ledger.fetch_account(network, source_public_key).await?;

        let memo = document_hashes[0];
        let mut builder = TxBuilder::new(source_public_key, account.sequence + 1, self.fees.base_fee)
            .memo_text(memo);
        for _ in document_hashes {
            builder = builder.payment(source_public_key, MIN_PAYMENT_AMOUNT);
        }
        if builder.fee() > self.fees.max_fee {
            return Err(AnchorError::Validation(format!(
                "transaction fee {} exceeds configured maximum {}",
                builder.fee(),
                self.fees.max_fee
            )));
        }

        let tx = builder.build()?;
        let fee = tx.fee;
        let transaction_hash = tx.hash_hex(&settings.passphrase)?;

        let signing_key = keys::signing_key_from_secret(source_secret_key)?;
        let envelope = tx.sign(&settings.passphrase, &signing_key)?;
        let envelope_json = serde_json::to_string(&envelope)?;

        // Persist pending rows BEFORE submission so a crash mid-submit
        // still leaves an auditable trace
        let mut rows = Vec::with_capacity(document_hashes.len());
        for hash in document_hashes {
            let row = self.db.with_conn(|conn| {
                transactions::insert_transaction(
                    conn,
                    &NewTransaction {
                        transaction_hash: transaction_hash.clone(),
                        document_hash: hash.to_string(),
                        memo: memo.to_string(),
                        network,
                        fee,
                        source_account: source_public_key.to_string(),
                        destination_account: source_public_key.to_string(),
                        transaction_data: Some(envelope_json.clone()),
                    },
                )
            })?;
            rows.push(row);
        }

        match self.ledger.submit(network, &envelope).await {
            Ok(receipt) => {
                let raw = receipt.raw.to_string();
                self.db.with_conn(|conn| {
                    transactions::update_status(
                        conn,
                        &transaction_hash,
                        network,
                        TxStatus::Success,
                        Some(&raw),
                        None,
                    )
                })?;
                info!(
                    transaction_hash = %transaction_hash,
                    network = %network,
                    hashes = document_hashes.len(),
                    "Document hash anchored"
                );

                self.db.with_conn(|conn| {
                    transactions::find_by_hash_on_network(conn, &transaction_hash, network)
                })
            }
            Err(err) => {
                let detail = err.to_string();
                self.db.with_conn(|conn| {
                    transactions::update_status(
                        conn,
                        &transaction_hash,
                        network,
                        TxStatus::Failed,
                        None,
                        Some(&detail),
                    )
                })?;
                warn!(
                    transaction_hash = %transaction_hash,
                    network = %network,
                    "Ledger rejected anchoring transaction"
                );
                Err(AnchorError::AnchorFailed(detail))
            }
        }
    }

    /// Trust-minimizing verification: local rows alone are never
    /// sufficient, every candidate is re-checked against the ledger and
    /// must carry the document hash as its memo.
    pub async fn verify_document(&self, document_hash: &str, network: Network) -> Result<bool> {
        let rows = self.db.with_conn(|conn| {
            transactions::find_by_document_hash(conn, document_hash, Some(network))
        })?;
        if rows.is_empty() {
            return Ok(false);
        }

        let mut seen = std::collections::HashSet::new();
        for row in &rows {
            if !seen.insert(row.transaction_hash.clone()) {
                continue;
            }
            match self.ledger.fetch_transaction(network, &row.transaction_hash).await {
                Ok(Some(info)) if info.successful && info.memo.as_deref() == Some(document_hash) => {
                    return Ok(true);
                }
                Ok(_) => {}
                Err(err) => {
                    // An unreachable record cannot prove anything; try the rest
                    warn!(
                        transaction_hash = %row.transaction_hash,
                        error = %err,
                        "Skipping unverifiable ledger record"
                    );
                }
            }
        }
        Ok(false)
    }

    /// Read-only lookup by transaction hash
    pub fn get_transaction(&self, transaction_hash: &str) -> Result<Option<TransactionRow>> {
        self.db
            .with_conn(|conn| transactions::find_by_hash(conn, transaction_hash))
    }

    /// Read-only lookup of every anchoring of a document hash
    pub fn get_transactions_by_document_hash(
        &self,
        document_hash: &str,
    ) -> Result<Vec<TransactionRow>> {
        self.db
            .with_conn(|conn| transactions::find_by_document_hash(conn, document_hash, None))
    }
}
