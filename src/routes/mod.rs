//! HTTP surface
//!
//! Route handlers validate input at the boundary, then delegate to the
//! workflow engine, anchoring gateway, and confirmation poller. Errors
//! map to JSON `{"error": ...}` bodies via `AnchorError`.

pub mod health;
pub mod ledger;
pub mod workflows;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::anchor::{AnchoringGateway, ConfirmationPoller};
use crate::ledger::LedgerClient;
use crate::workflow::WorkflowEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
    pub gateway: Arc<AnchoringGateway>,
    pub poller: Arc<ConfirmationPoller>,
    pub ledger: Arc<dyn LedgerClient>,
}

/// Build the service router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/verification-workflows",
            post(workflows::initiate).get(workflows::list),
        )
        .route(
            "/verification-workflows/document/:document_id",
            get(workflows::latest_for_document),
        )
        .route(
            "/verification-workflows/:id/transition",
            patch(workflows::transition),
        )
        .route(
            "/verification-workflows/:id/anchor",
            patch(workflows::record_anchor),
        )
        .route("/stellar/accounts", post(ledger::create_account))
        .route("/stellar/accounts/fund", post(ledger::fund_account))
        .route(
            "/stellar/accounts/:public_key/balance",
            get(ledger::account_balance),
        )
        .route("/stellar/estimate-fee", post(ledger::estimate_fee))
        .route("/stellar/anchor", post(ledger::anchor))
        .route("/stellar/anchor/batch", post(ledger::anchor_batch))
        .route(
            "/stellar/transactions/:transaction_hash/status",
            get(ledger::transaction_status),
        )
        .route(
            "/stellar/transactions/:transaction_hash",
            get(ledger::transaction),
        )
        .route(
            "/stellar/transactions/document/:document_hash",
            get(ledger::transactions_for_document),
        )
        .route("/stellar/verify", post(ledger::verify))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
