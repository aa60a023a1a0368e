//! Anchorage - document verification and ledger anchoring service
//!
//! Proves a document existed at a point in time by anchoring its
//! SHA-256 hash in a ledger transaction memo, and tracks that proof
//! through a strict verification workflow.
//!
//! ## Components
//!
//! - **WorkflowEngine**: the document-verification state machine
//! - **AnchoringGateway**: ledger accounts, anchoring, verification
//! - **ConfirmationPoller**: time-boxed confirmation tracking
//! - **Db**: SQLite store for accounts, transactions, and workflows
//!
//! The dependency graph is wired explicitly at startup: the store
//! depends on nothing, the gateway on the store and a ledger client,
//! the poller on the gateway's read path, and the workflow engine on
//! the store alone.

pub mod anchor;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod routes;
pub mod validate;
pub mod workflow;

pub use config::Args;
pub use error::{AnchorError, Result};
pub use routes::{app, AppState};
