//! Health check endpoint

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::ledger::Network;
use crate::routes::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub ledger: LedgerHealth,
}

#[derive(Debug, Serialize)]
pub struct LedgerHealth {
    pub testnet: bool,
    pub mainnet: bool,
}

/// GET /health
///
/// Degrades rather than fails when the ledger is unreachable; the
/// service itself can still serve local reads.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let testnet = state.ledger.ping(Network::Testnet).await;
    let mainnet = state.ledger.ping(Network::Mainnet).await;

    let status = if testnet || mainnet {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        ledger: LedgerHealth { testnet, mainnet },
    })
}
