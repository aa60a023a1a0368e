//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::error::{AnchorError, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| AnchorError::Database(format!("Failed to create schema_version table: {e}")))?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| AnchorError::Database(format!("Failed to clear schema_version: {e}")))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .map_err(|e| AnchorError::Database(format!("Failed to set schema_version: {e}")))?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(WORKFLOW_SCHEMA)
        .map_err(|e| AnchorError::Database(format!("Failed to create workflow tables: {e}")))?;

    conn.execute_batch(LEDGER_SCHEMA)
        .map_err(|e| AnchorError::Database(format!("Failed to create ledger tables: {e}")))?;

    conn.execute_batch(INDEXES_SCHEMA)
        .map_err(|e| AnchorError::Database(format!("Failed to create indexes: {e}")))?;

    Ok(())
}

fn migrate_schema(conn: &Connection, _from_version: i32) -> Result<()> {
    // Migration steps go here as the schema evolves
    set_schema_version(conn, SCHEMA_VERSION)
}

/// Verification workflow tables
const WORKFLOW_SCHEMA: &str = r#"
-- One row per verification workflow; rows are never deleted
CREATE TABLE IF NOT EXISTS workflows (
    id TEXT PRIMARY KEY NOT NULL,
    document_id TEXT NOT NULL,
    current_state TEXT NOT NULL,
    stellar_transaction_id TEXT,
    error_message TEXT,
    submitted_at TEXT NOT NULL,
    completed_at TEXT
);

-- Append-only state history; highest seq always matches current_state
CREATE TABLE IF NOT EXISTS workflow_history (
    workflow_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    state TEXT NOT NULL,
    note TEXT,
    recorded_at TEXT NOT NULL,
    PRIMARY KEY (workflow_id, seq),
    FOREIGN KEY (workflow_id) REFERENCES workflows(id) ON DELETE CASCADE
);
"#;

/// Ledger account and transaction tables
const LEDGER_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ledger_accounts (
    public_key TEXT PRIMARY KEY NOT NULL,
    encrypted_secret_key TEXT NOT NULL,
    network TEXT NOT NULL,
    balance TEXT NOT NULL DEFAULT '0',
    is_funded INTEGER NOT NULL DEFAULT 0,
    last_funded_at TEXT,
    created_at TEXT NOT NULL
);

-- Batch anchoring persists one row per document hash sharing a
-- transaction_hash, so uniqueness includes the document hash
CREATE TABLE IF NOT EXISTS ledger_transactions (
    transaction_hash TEXT NOT NULL,
    document_hash TEXT NOT NULL,
    memo TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    network TEXT NOT NULL,
    fee INTEGER NOT NULL,
    source_account TEXT NOT NULL,
    destination_account TEXT NOT NULL,
    submitted_at TEXT NOT NULL,
    confirmed_at TEXT,
    transaction_data TEXT,
    error_data TEXT,
    UNIQUE (transaction_hash, document_hash, network)
);
"#;

/// Index definitions for fast queries
const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_workflows_document_id ON workflows(document_id);
CREATE INDEX IF NOT EXISTS idx_workflows_state ON workflows(current_state);
CREATE INDEX IF NOT EXISTS idx_workflows_submitted_at ON workflows(submitted_at);

CREATE INDEX IF NOT EXISTS idx_accounts_network ON ledger_accounts(network);

CREATE INDEX IF NOT EXISTS idx_tx_hash ON ledger_transactions(transaction_hash);
CREATE INDEX IF NOT EXISTS idx_tx_document_hash ON ledger_transactions(document_hash);
CREATE INDEX IF NOT EXISTS idx_tx_status ON ledger_transactions(status);
"#;
