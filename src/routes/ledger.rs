//! Ledger account and anchoring endpoints
//!
//! Keys, hashes, and networks are validated here, before any database
//! or ledger traffic. Secret keys pass through to the gateway and are
//! never logged or persisted in clear.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::anchor::gateway::{CreatedAccount, FeeEstimate};
use crate::db::transactions::TransactionRow;
use crate::error::{AnchorError, Result};
use crate::ledger::Network;
use crate::routes::AppState;
use crate::validate;

#[derive(Debug, Deserialize)]
pub struct NetworkQuery {
    pub network: Network,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub network: Network,
}

/// POST /stellar/accounts
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<CreatedAccount>)> {
    let account = state.gateway.create_account(req.network)?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundAccountRequest {
    pub public_key: String,
    pub network: Network,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundAccountResponse {
    pub public_key: String,
    pub network: Network,
    pub balance: String,
    pub is_funded: bool,
}

/// POST /stellar/accounts/fund (testnet only)
pub async fn fund_account(
    State(state): State<AppState>,
    Json(req): Json<FundAccountRequest>,
) -> Result<Json<FundAccountResponse>> {
    validate::public_key(&req.public_key)?;

    let balance = state.gateway.fund_account(&req.public_key, req.network).await?;
    Ok(Json(FundAccountResponse {
        public_key: req.public_key,
        network: req.network,
        balance,
        is_funded: true,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub public_key: String,
    pub network: Network,
    pub balance: String,
}

/// GET /stellar/accounts/:publicKey/balance?network=
pub async fn account_balance(
    State(state): State<AppState>,
    Path(public_key): Path<String>,
    Query(query): Query<NetworkQuery>,
) -> Result<Json<BalanceResponse>> {
    validate::public_key(&public_key)?;

    let balance = state
        .gateway
        .get_account_balance(&public_key, query.network)
        .await?;
    Ok(Json(BalanceResponse {
        public_key,
        network: query.network,
        balance,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateFeeRequest {
    pub source_public_key: String,
    pub document_hash: String,
    pub network: Network,
}

/// POST /stellar/estimate-fee
pub async fn estimate_fee(
    State(state): State<AppState>,
    Json(req): Json<EstimateFeeRequest>,
) -> Result<Json<FeeEstimate>> {
    validate::public_key(&req.source_public_key)?;
    let document_hash = validate::document_hash(&req.document_hash)?;

    let estimate =
        state
            .gateway
            .estimate_transaction_fee(&req.source_public_key, &document_hash, req.network)?;
    Ok(Json(estimate))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRequest {
    pub source_public_key: String,
    pub source_secret_key: String,
    pub document_hash: String,
    pub network: Network,
}

/// POST /stellar/anchor
pub async fn anchor(
    State(state): State<AppState>,
    Json(req): Json<AnchorRequest>,
) -> Result<(StatusCode, Json<TransactionRow>)> {
    validate::public_key(&req.source_public_key)?;
    validate::secret_key(&req.source_secret_key)?;
    let document_hash = validate::document_hash(&req.document_hash)?;

    let row = state
        .gateway
        .anchor_document_hash(
            &req.source_public_key,
            &req.source_secret_key,
            &document_hash,
            req.network,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAnchorRequest {
    pub source_public_key: String,
    pub source_secret_key: String,
    pub document_hashes: Vec<String>,
    pub network: Network,
}

/// POST /stellar/anchor/batch
pub async fn anchor_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchAnchorRequest>,
) -> Result<(StatusCode, Json<Vec<TransactionRow>>)> {
    validate::public_key(&req.source_public_key)?;
    validate::secret_key(&req.source_secret_key)?;

    let mut hashes = Vec::with_capacity(req.document_hashes.len());
    for hash in &req.document_hashes {
        hashes.push(validate::document_hash(hash)?);
    }
    let hash_refs: Vec<&str> = hashes.iter().map(String::as_str).collect();

    let rows = state
        .gateway
        .batch_anchor_documents(
            &req.source_public_key,
            &req.source_secret_key,
            &hash_refs,
            req.network,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(rows)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub transaction_hash: String,
    pub network: Network,
    pub status: &'static str,
}

/// GET /stellar/transactions/:transactionHash/status?network=
///
/// Runs the confirmation poller to a terminal outcome; the response can
/// take up to the configured confirmation timeout.
pub async fn transaction_status(
    State(state): State<AppState>,
    Path(transaction_hash): Path<String>,
    Query(query): Query<NetworkQuery>,
) -> Result<Json<StatusResponse>> {
    let transaction_hash = validate::transaction_hash(&transaction_hash)?;

    let outcome = state
        .poller
        .poll_transaction_status(&transaction_hash, query.network)
        .await?;
    Ok(Json(StatusResponse {
        transaction_hash,
        network: query.network,
        status: outcome.as_str(),
    }))
}

/// GET /stellar/transactions/:transactionHash
pub async fn transaction(
    State(state): State<AppState>,
    Path(transaction_hash): Path<String>,
) -> Result<Json<TransactionRow>> {
    let transaction_hash = validate::transaction_hash(&transaction_hash)?;

    state
        .gateway
        .get_transaction(&transaction_hash)?
        .map(Json)
        .ok_or_else(|| AnchorError::NotFound(format!("transaction {transaction_hash}")))
}

/// GET /stellar/transactions/document/:documentHash
pub async fn transactions_for_document(
    State(state): State<AppState>,
    Path(document_hash): Path<String>,
) -> Result<Json<Vec<TransactionRow>>> {
    let document_hash = validate::document_hash(&document_hash)?;
    Ok(Json(
        state.gateway.get_transactions_by_document_hash(&document_hash)?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub document_hash: String,
    pub network: Network,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub document_hash: String,
    pub network: Network,
    pub verified: bool,
}

/// POST /stellar/verify
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let document_hash = validate::document_hash(&req.document_hash)?;

    let verified = state
        .gateway
        .verify_document(&document_hash, req.network)
        .await?;
    Ok(Json(VerifyResponse {
        document_hash,
        network: req.network,
        verified,
    }))
}
