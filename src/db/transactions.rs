//! Ledger transaction rows
//!
//! Status only ever moves `pending -> {success, failed, timeout}`; the
//! update statement guards on the pending state so a terminal status can
//! never regress, even under concurrent pollers.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{AnchorError, Result};
use crate::ledger::Network;

/// Lifecycle status of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
    Timeout,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Success => "success",
            TxStatus::Failed => "failed",
            TxStatus::Timeout => "timeout",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxStatus {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(TxStatus::Pending),
            "success" => Ok(TxStatus::Success),
            "failed" => Ok(TxStatus::Failed),
            "timeout" => Ok(TxStatus::Timeout),
            other => Err(AnchorError::Internal(format!(
                "unknown transaction status '{other}'"
            ))),
        }
    }
}

/// Ledger transaction row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRow {
    pub transaction_hash: String,
    pub document_hash: String,
    pub memo: String,
    pub status: TxStatus,
    pub network: Network,
    pub fee: u64,
    pub source_account: String,
    pub destination_account: String,
    pub submitted_at: String,
    pub confirmed_at: Option<String>,
    pub transaction_data: Option<String>,
    pub error_data: Option<String>,
}

impl TransactionRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        let status: String = row.get("status")?;
        let network: String = row.get("network")?;
        let bad_column = |name: &str| {
            rusqlite::Error::InvalidColumnType(0, name.into(), rusqlite::types::Type::Text)
        };
        Ok(Self {
            transaction_hash: row.get("transaction_hash")?,
            document_hash: row.get("document_hash")?,
            memo: row.get("memo")?,
            status: status.parse().map_err(|_| bad_column("status"))?,
            network: network.parse().map_err(|_| bad_column("network"))?,
            fee: row.get::<_, i64>("fee")? as u64,
            source_account: row.get("source_account")?,
            destination_account: row.get("destination_account")?,
            submitted_at: row.get("submitted_at")?,
            confirmed_at: row.get("confirmed_at")?,
            transaction_data: row.get("transaction_data")?,
            error_data: row.get("error_data")?,
        })
    }
}

/// Input for persisting a pending transaction
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub transaction_hash: String,
    pub document_hash: String,
    pub memo: String,
    pub network: Network,
    pub fee: u64,
    pub source_account: String,
    pub destination_account: String,
    pub transaction_data: Option<String>,
}

/// Insert a transaction row with `pending` status
pub fn insert_transaction(conn: &Connection, input: &NewTransaction) -> Result<TransactionRow> {
    let submitted_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO ledger_transactions
         (transaction_hash, document_hash, memo, status, network, fee,
          source_account, destination_account, submitted_at, transaction_data)
         VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            input.transaction_hash,
            input.document_hash,
            input.memo,
            input.network.as_str(),
            input.fee as i64,
            input.source_account,
            input.destination_account,
            submitted_at,
            input.transaction_data,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AnchorError::Validation(format!(
                "transaction {} already recorded for this document hash",
                input.transaction_hash
            ))
        }
        other => AnchorError::Database(format!("Transaction insert failed: {other}")),
    })?;

    Ok(TransactionRow {
        transaction_hash: input.transaction_hash.clone(),
        document_hash: input.document_hash.clone(),
        memo: input.memo.clone(),
        status: TxStatus::Pending,
        network: input.network,
        fee: input.fee,
        source_account: input.source_account.clone(),
        destination_account: input.destination_account.clone(),
        submitted_at,
        confirmed_at: None,
        transaction_data: input.transaction_data.clone(),
        error_data: None,
    })
}

/// Move all pending rows for a hash to a terminal status.
///
/// Returns the number of rows updated; already-terminal rows are left
/// untouched.
pub fn update_status(
    conn: &Connection,
    transaction_hash: &str,
    network: Network,
    status: TxStatus,
    transaction_data: Option<&str>,
    error_data: Option<&str>,
) -> Result<usize> {
    let confirmed_at = if status == TxStatus::Success {
        Some(Utc::now().to_rfc3339())
    } else {
        None
    };

    conn.execute(
        "UPDATE ledger_transactions
         SET status = ?3,
             confirmed_at = COALESCE(?4, confirmed_at),
             transaction_data = COALESCE(?5, transaction_data),
             error_data = COALESCE(?6, error_data)
         WHERE transaction_hash = ?1 AND network = ?2 AND status = 'pending'",
        params![
            transaction_hash,
            network.as_str(),
            status.as_str(),
            confirmed_at,
            transaction_data,
            error_data,
        ],
    )
    .map_err(|e| AnchorError::Database(format!("Status update failed: {e}")))
}

/// First row recorded for a transaction hash, any network
pub fn find_by_hash(conn: &Connection, transaction_hash: &str) -> Result<Option<TransactionRow>> {
    conn.query_row(
        "SELECT * FROM ledger_transactions WHERE transaction_hash = ?1
         ORDER BY document_hash LIMIT 1",
        params![transaction_hash],
        TransactionRow::from_row,
    )
    .optional()
    .map_err(|e| AnchorError::Database(format!("Transaction lookup failed: {e}")))
}

/// All rows for a transaction hash on one network
pub fn find_by_hash_on_network(
    conn: &Connection,
    transaction_hash: &str,
    network: Network,
) -> Result<Vec<TransactionRow>> {
    query_rows(
        conn,
        "SELECT * FROM ledger_transactions
         WHERE transaction_hash = ?1 AND network = ?2
         ORDER BY document_hash",
        params![transaction_hash, network.as_str()],
    )
}

/// All rows anchoring a document hash, newest first
pub fn find_by_document_hash(
    conn: &Connection,
    document_hash: &str,
    network: Option<Network>,
) -> Result<Vec<TransactionRow>> {
    match network {
        Some(network) => query_rows(
            conn,
            "SELECT * FROM ledger_transactions
             WHERE document_hash = ?1 AND network = ?2
             ORDER BY submitted_at DESC",
            params![document_hash, network.as_str()],
        ),
        None => query_rows(
            conn,
            "SELECT * FROM ledger_transactions
             WHERE document_hash = ?1
             ORDER BY submitted_at DESC",
            params![document_hash],
        ),
    }
}

/// All rows in a given status, newest first
pub fn find_by_status(conn: &Connection, status: TxStatus) -> Result<Vec<TransactionRow>> {
    query_rows(
        conn,
        "SELECT * FROM ledger_transactions WHERE status = ?1 ORDER BY submitted_at DESC",
        params![status.as_str()],
    )
}

fn query_rows<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<TransactionRow>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| AnchorError::Database(format!("Prepare failed: {e}")))?;

    let rows = stmt
        .query_map(params, TransactionRow::from_row)
        .map_err(|e| AnchorError::Database(format!("Query failed: {e}")))?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AnchorError::Database(format!("Row parse failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;

    fn sample(hash: &str, doc: &str) -> NewTransaction {
        NewTransaction {
            transaction_hash: hash.to_string(),
            document_hash: doc.to_string(),
            memo: doc.to_string(),
            network: Network::Testnet,
            fee: 100,
            source_account: "GABC".to_string(),
            destination_account: "GABC".to_string(),
            transaction_data: None,
        }
    }

    #[test]
    fn test_insert_starts_pending() {
        let db = Db::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let row = insert_transaction(conn, &sample("tx1", "doc1"))?;
            assert_eq!(row.status, TxStatus::Pending);
            assert!(row.confirmed_at.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_duplicate_hash_and_document_rejected() {
        let db = Db::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert_transaction(conn, &sample("tx1", "doc1"))?;
            // Same hash, different document: allowed (batch rows)
            insert_transaction(conn, &sample("tx1", "doc2"))?;
            // Exact duplicate: rejected
            let err = insert_transaction(conn, &sample("tx1", "doc1")).unwrap_err();
            assert!(matches!(err, AnchorError::Validation(_)));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_status_never_regresses() {
        let db = Db::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert_transaction(conn, &sample("tx1", "doc1"))?;

            let updated = update_status(conn, "tx1", Network::Testnet, TxStatus::Success, None, None)?;
            assert_eq!(updated, 1);

            // A later failed/timeout report must not overwrite success
            let updated = update_status(conn, "tx1", Network::Testnet, TxStatus::Failed, None, None)?;
            assert_eq!(updated, 0);

            let row = find_by_hash(conn, "tx1")?.unwrap();
            assert_eq!(row.status, TxStatus::Success);
            assert!(row.confirmed_at.is_some());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_batch_rows_update_together() {
        let db = Db::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert_transaction(conn, &sample("tx1", "doc1"))?;
            insert_transaction(conn, &sample("tx1", "doc2"))?;
            insert_transaction(conn, &sample("tx1", "doc3"))?;

            let updated = update_status(conn, "tx1", Network::Testnet, TxStatus::Failed, None, Some("boom"))?;
            assert_eq!(updated, 3);

            let rows = find_by_hash_on_network(conn, "tx1", Network::Testnet)?;
            assert!(rows.iter().all(|r| r.status == TxStatus::Failed));
            assert!(rows.iter().all(|r| r.error_data.as_deref() == Some("boom")));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_find_by_document_and_status() {
        let db = Db::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert_transaction(conn, &sample("tx1", "doc1"))?;
            insert_transaction(conn, &sample("tx2", "doc1"))?;
            insert_transaction(conn, &sample("tx3", "doc2"))?;

            let rows = find_by_document_hash(conn, "doc1", Some(Network::Testnet))?;
            assert_eq!(rows.len(), 2);

            assert!(find_by_document_hash(conn, "doc1", Some(Network::Mainnet))?.is_empty());

            let pending = find_by_status(conn, TxStatus::Pending)?;
            assert_eq!(pending.len(), 3);
            Ok(())
        })
        .unwrap();
    }
}
