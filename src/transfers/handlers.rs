use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    accounts::services::LEDGER_ADDRESS_PREFIX,
    auth::services::AuthUser,
    ledger::{EthTransaction, Transaction},
    state::AppState,
    transfers::{
        dto::{
            BridgeTransferResponse, EthTransactionQuery, LedgerTransferResponse, TransactionQuery,
            TransferRequest,
        },
        error::TransferError,
        repo,
        services::{self, BridgeReceipt},
    },
};

pub fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/transfer", post(ledger_transfer))
}

pub fn bridge_routes() -> Router<AppState> {
    Router::new()
        .route("/eth-transactions", get(list_eth_transactions))
        .route("/eth-transactions/transfer", post(bridge_transfer))
        .route("/transfer", post(transfer))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn ledger_created(transaction: Transaction) -> (StatusCode, Json<LedgerTransferResponse>) {
    (
        StatusCode::CREATED,
        Json(LedgerTransferResponse {
            success: true,
            transaction,
        }),
    )
}

fn bridge_created(receipt: BridgeReceipt) -> (StatusCode, Json<BridgeTransferResponse>) {
    (
        StatusCode::CREATED,
        Json(BridgeTransferResponse {
            success: true,
            address: receipt.address,
            amount: receipt.amount,
            fee: receipt.fee,
            transaction: receipt.transaction,
        }),
    )
}

#[instrument(skip(state, q))]
pub async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, (StatusCode, String)> {
    let rows = repo::list_transactions(&state.db, user_id, &q)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state, q))]
pub async fn list_eth_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<EthTransactionQuery>,
) -> Result<Json<Vec<EthTransaction>>, (StatusCode, String)> {
    let rows = repo::list_eth_transactions(&state.db, user_id, &q)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

pub async fn ledger_transfer(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<TransferRequest>,
) -> Result<Response, TransferError> {
    let tx = services::ledger_transfer(&state, user_id, &req).await?;
    Ok(ledger_created(tx).into_response())
}

pub async fn bridge_transfer(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<TransferRequest>,
) -> Result<Response, TransferError> {
    let receipt = services::bridge_transfer(&state, user_id, &req).await?;
    Ok(bridge_created(receipt).into_response())
}

/// Ledger addresses go through the ledger, anything else over the bridge.
pub async fn transfer(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<TransferRequest>,
) -> Result<Response, TransferError> {
    let to_ledger = req
        .address
        .as_deref()
        .map(|a| a.trim().starts_with(LEDGER_ADDRESS_PREFIX))
        .unwrap_or(false);

    if to_ledger {
        let tx = services::ledger_transfer(&state, user_id, &req).await?;
        Ok(ledger_created(tx).into_response())
    } else {
        let receipt = services::bridge_transfer(&state, user_id, &req).await?;
        Ok(bridge_created(receipt).into_response())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;
    use crate::chain::fake::FakeChain;
    use crate::state::testing::{harness_with, RecordingNotifier, CUSTODIAL};

    fn body(address: &str, amount: &str) -> Json<TransferRequest> {
        Json(TransferRequest {
            address: Some(address.to_string()),
            amount: Some(amount.parse().unwrap()),
        })
    }

    async fn seeded() -> (crate::state::testing::Harness, Uuid) {
        let h = harness_with(FakeChain::new(), RecordingNotifier::default());
        let alice = Uuid::new_v4();
        h.ledger
            .add_account(alice, &format!("UT{}", "a".repeat(40)), Decimal::from(50))
            .await;
        h.ledger
            .add_account(Uuid::new_v4(), &format!("UT{}", "b".repeat(40)), Decimal::ZERO)
            .await;
        h.ledger.add_eth_account(Uuid::new_v4(), CUSTODIAL, "pw").await;
        (h, alice)
    }

    #[tokio::test]
    async fn dispatch_routes_ledger_addresses_off_chain() {
        let (h, alice) = seeded().await;

        let res = transfer(
            State(h.state.clone()),
            AuthUser(alice),
            body(&format!("UT{}", "b".repeat(40)), "1.5"),
        )
        .await
        .unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(h.ledger.transactions().await.len(), 1);
        assert!(h.ledger.eth_transactions().await.is_empty());
        assert!(h.chain.calls().is_empty());
    }

    #[tokio::test]
    async fn dispatch_routes_chain_addresses_over_bridge() {
        let (h, alice) = seeded().await;

        let res = transfer(
            State(h.state.clone()),
            AuthUser(alice),
            body("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359", "1.5"),
        )
        .await
        .unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        assert!(h.ledger.transactions().await.is_empty());
        assert_eq!(h.ledger.eth_transactions().await.len(), 1);
    }

    #[tokio::test]
    async fn failures_render_as_bad_request() {
        let (h, alice) = seeded().await;

        let err = ledger_transfer(
            State(h.state.clone()),
            AuthUser(alice),
            body(&format!("UT{}", "b".repeat(40)), "50.001"),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
