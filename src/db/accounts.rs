//! Ledger account rows

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{AnchorError, Result};
use crate::ledger::Network;

/// Ledger account row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRow {
    pub public_key: String,
    /// Nonce + ciphertext, hex; never serialized to API responses
    #[serde(skip_serializing)]
    pub encrypted_secret_key: String,
    pub network: Network,
    pub balance: String,
    pub is_funded: bool,
    pub last_funded_at: Option<String>,
    pub created_at: String,
}

impl AccountRow {
    fn from_row(row: &Row) -> std::result::Result<Self, rusqlite::Error> {
        let network: String = row.get("network")?;
        Ok(Self {
            public_key: row.get("public_key")?,
            encrypted_secret_key: row.get("encrypted_secret_key")?,
            network: network.parse().map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    0,
                    "network".into(),
                    rusqlite::types::Type::Text,
                )
            })?,
            balance: row.get("balance")?,
            is_funded: row.get::<_, i64>("is_funded")? != 0,
            last_funded_at: row.get("last_funded_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Persist a freshly created, unfunded account
pub fn insert_account(
    conn: &Connection,
    public_key: &str,
    encrypted_secret_key: &str,
    network: Network,
) -> Result<AccountRow> {
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO ledger_accounts
         (public_key, encrypted_secret_key, network, balance, is_funded, created_at)
         VALUES (?1, ?2, ?3, '0', 0, ?4)",
        params![public_key, encrypted_secret_key, network.as_str(), created_at],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AnchorError::Validation(format!("account {public_key} already exists"))
        }
        other => AnchorError::Database(format!("Account insert failed: {other}")),
    })?;

    Ok(AccountRow {
        public_key: public_key.to_string(),
        encrypted_secret_key: encrypted_secret_key.to_string(),
        network,
        balance: "0".to_string(),
        is_funded: false,
        last_funded_at: None,
        created_at,
    })
}

/// Look up an account by public key
pub fn find_account(conn: &Connection, public_key: &str) -> Result<Option<AccountRow>> {
    conn.query_row(
        "SELECT * FROM ledger_accounts WHERE public_key = ?1",
        params![public_key],
        AccountRow::from_row,
    )
    .optional()
    .map_err(|e| AnchorError::Database(format!("Account lookup failed: {e}")))
}

/// Record a successful funding call
pub fn mark_funded(conn: &Connection, public_key: &str, balance: &str) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE ledger_accounts
             SET is_funded = 1, balance = ?2, last_funded_at = ?3
             WHERE public_key = ?1",
            params![public_key, balance, Utc::now().to_rfc3339()],
        )
        .map_err(|e| AnchorError::Database(format!("Funding update failed: {e}")))?;

    if updated == 0 {
        return Err(AnchorError::NotFound(format!("account {public_key}")));
    }
    Ok(())
}
