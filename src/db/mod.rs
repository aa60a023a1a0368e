//! SQLite persistence layer
//!
//! Owns the ledger account, ledger transaction, and workflow tables.
//! Account and transaction rows belong to the anchoring gateway;
//! workflow rows belong to the workflow engine. A workflow references a
//! transaction by hash only, so transactions can be audited
//! independently of any workflow.

pub mod accounts;
pub mod schema;
pub mod transactions;
pub mod workflows;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{AnchorError, Result};

/// SQLite database handle shared across components
pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    /// Open or create the database file
    pub fn open(path: &Path) -> Result<Self> {
        info!("Opening SQLite database at {:?}", path);

        let conn = Connection::open(path)
            .map_err(|e| AnchorError::Database(format!("Failed to open SQLite: {e}")))?;

        // WAL for concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| AnchorError::Database(format!("Failed to set PRAGMA: {e}")))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| AnchorError::Database(format!("Failed to open in-memory SQLite: {e}")))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.with_conn(|conn| schema::init_schema(conn))
    }

    /// Run a read operation against the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AnchorError::Database(format!("Lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Run a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| AnchorError::Database(format!("Lock poisoned: {e}")))?;
        f(&mut conn)
    }
}
