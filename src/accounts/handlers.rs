use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    accounts::{
        dto::{BalanceResponse, CreateContractRequest, QrCodeResponse},
        repo,
        repo_types::{Account, Contract, EthAccount},
        services,
    },
    auth::services::AuthUser,
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/eth-accounts", get(list_eth_accounts))
        .route("/eth-accounts/:address/balance", get(get_balance))
        .route("/eth-accounts/:address/qrcode", get(get_qrcode))
}

pub fn contract_routes() -> Router<AppState> {
    Router::new()
        .route("/contracts", get(list_contracts).post(create_contract))
        .route("/contracts/:address", get(get_contract))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn owned_eth_account(
    state: &AppState,
    user_id: uuid::Uuid,
    address: &str,
) -> Result<EthAccount, (StatusCode, String)> {
    repo::find_owned_eth_account(&state.db, user_id, address)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Account not found".to_string()))
}

#[instrument(skip(state))]
pub async fn list_accounts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Account>>, (StatusCode, String)> {
    let rows = repo::list_accounts_by_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn list_eth_accounts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<EthAccount>>, (StatusCode, String)> {
    let rows = repo::list_eth_accounts_by_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_balance(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, (StatusCode, String)> {
    let account = owned_eth_account(&state, user_id, &address).await?;
    let balance = services::query_balance(state.chain.as_ref(), &account.address)
        .await
        .map_err(|e| {
            error!(error = %e, address = %account.address, "balance query failed");
            (StatusCode::BAD_GATEWAY, "Blockchain node unavailable".to_string())
        })?;
    Ok(Json(balance))
}

#[instrument(skip(state))]
pub async fn get_qrcode(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(address): Path<String>,
) -> Result<Json<QrCodeResponse>, (StatusCode, String)> {
    let account = owned_eth_account(&state, user_id, &address).await?;

    let (key, created) = services::ensure_qrcode(state.storage.as_ref(), &account)
        .await
        .map_err(|e| {
            error!(error = %e, address = %account.address, "qrcode generation failed");
            internal(e)
        })?;
    if created {
        repo::set_qrcode(&state.db, account.id, &key)
            .await
            .map_err(internal)?;
    }

    let qrcode_url = services::presign_qrcode(state.storage.as_ref(), &key)
        .await
        .map_err(internal)?;
    Ok(Json(QrCodeResponse {
        address: account.address,
        qrcode_url,
    }))
}

#[instrument(skip(state))]
pub async fn list_contracts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Contract>>, (StatusCode, String)> {
    let rows = repo::list_contracts_by_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_contract(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(address): Path<String>,
) -> Result<Json<Contract>, (StatusCode, String)> {
    repo::find_contract_by_address(&state.db, &address)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Contract not found".to_string()))
}

#[instrument(skip(state, body))]
pub async fn create_contract(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<Contract>), (StatusCode, String)> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".into()));
    }
    if !state.chain.is_address(&body.address) {
        warn!(address = %body.address, "invalid contract address");
        return Err((StatusCode::BAD_REQUEST, "Invalid address".into()));
    }

    let contract = repo::insert_contract(&state.db, user_id, &body.address, name)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::CONFLICT, "Contract already registered".to_string()))?;
    Ok((StatusCode::CREATED, Json(contract)))
}
