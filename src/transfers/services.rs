//! Off-chain and bridge transfers.
//!
//! A ledger transfer never touches the network. A bridge transfer talks to
//! the node first and only debits the ledger once the node has accepted the
//! transaction, so a failure before submission leaves the ledger untouched.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::accounts::repo_types::Account;
use crate::accounts::services::{is_ledger_address, to_token_units, TOKEN_DECIMALS};
use crate::chain::{TransferEvent, TxInfo};
use crate::ledger::{EthTransaction, NewEthTransaction, Transaction};
use crate::state::AppState;
use crate::transfers::dto::TransferRequest;
use crate::transfers::error::TransferError;

/// Bridge fee, in token units, that the custodial balance must cover on top of the amount.
pub const BRIDGE_FEE_UNITS: u64 = 1;

/// Smallest amount the bridge will send: one token unit.
pub fn min_bridge_amount() -> Decimal {
    Decimal::new(1, TOKEN_DECIMALS)
}

pub fn bridge_fee() -> Decimal {
    Decimal::new(BRIDGE_FEE_UNITS as i64, TOKEN_DECIMALS)
}

#[derive(Debug)]
pub struct BridgeReceipt {
    pub address: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub transaction: EthTransaction,
}

fn require_fields(req: &TransferRequest) -> Result<(String, Decimal), TransferError> {
    let address = req
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());
    let amount = req.amount.filter(|a| !a.is_zero());
    match (address, amount) {
        (Some(address), Some(amount)) => Ok((address.to_string(), amount)),
        _ => Err(TransferError::validation("Address or amount is missing")),
    }
}

fn require_units(amount: Decimal) -> Result<u64, TransferError> {
    to_token_units(amount)
        .filter(|units| *units > 0)
        .ok_or_else(|| TransferError::validation("Invalid amount"))
}

async fn sender_account(state: &AppState, user_id: Uuid) -> Result<Account, TransferError> {
    state
        .ledger
        .account_by_user(user_id)
        .await?
        .ok_or_else(|| TransferError::validation("Account not found"))
}

/// Re-reads the sender once its guard is held; a transfer that held the
/// guard before may have just committed.
async fn reload_sender(state: &AppState, account_id: Uuid) -> Result<Account, TransferError> {
    state
        .ledger
        .account_by_id(account_id)
        .await?
        .ok_or_else(|| TransferError::validation("Account not found"))
}

/// Moves `amount` between two ledger accounts.
#[instrument(skip(state, req))]
pub async fn ledger_transfer(
    state: &AppState,
    user_id: Uuid,
    req: &TransferRequest,
) -> Result<Transaction, TransferError> {
    let (to_address, amount) = require_fields(req)?;
    require_units(amount)?;

    if !is_ledger_address(&to_address) {
        warn!(%to_address, "malformed ledger address");
        return Err(TransferError::validation("Invalid address"));
    }

    let sender = sender_account(state, user_id).await?;
    if sender.address == to_address {
        return Err(TransferError::validation("Cannot transfer to your own address"));
    }

    // Same guard as the bridge flow, so a ledger transfer cannot spend a
    // balance a bridge transfer has already checked and sent on chain.
    let _guard = state.locks.acquire(sender.id).await;
    let sender = reload_sender(state, sender.id).await?;

    let Some(recipient) = state.ledger.account_by_address(&to_address).await? else {
        warn!(%to_address, "unknown ledger address");
        return Err(TransferError::validation("Invalid address"));
    };

    if sender.balance < amount {
        warn!(balance = %sender.balance, %amount, "transfer exceeds balance");
        return Err(TransferError::InsufficientFunds);
    }

    // The store re-checks the balance with both rows locked.
    let record = state
        .ledger
        .transfer(sender.id, recipient.id, amount)
        .await
        .map_err(|e| {
            warn!(error = %e, "ledger transfer rejected");
            TransferError::from(e)
        })?;

    info!(tx_id = record.id, from = %record.from_address, to = %record.to_address, %amount, "ledger transfer done");
    Ok(record)
}

/// Sends tokens from the custodial account to an external address and
/// debits the sender's ledger balance once the node has accepted the
/// transaction.
#[instrument(skip(state, req))]
pub async fn bridge_transfer(
    state: &AppState,
    user_id: Uuid,
    req: &TransferRequest,
) -> Result<BridgeReceipt, TransferError> {
    let (to_address, amount) = require_fields(req)?;
    if amount < min_bridge_amount() {
        warn!(%amount, "bridge amount below minimum");
        return Err(TransferError::validation("Invalid amount"));
    }
    let amount_int = require_units(amount)?;

    if !state.chain.is_address(&to_address) {
        warn!(%to_address, "malformed chain address");
        return Err(TransferError::InvalidAddress);
    }

    let sender = sender_account(state, user_id).await?;
    let _guard = state.locks.acquire(sender.id).await;
    let sender = reload_sender(state, sender.id).await?;
    if sender.balance < amount {
        warn!(balance = %sender.balance, %amount, "bridge transfer exceeds ledger balance");
        return Err(TransferError::InsufficientFunds);
    }

    let chain_cfg = &state.config.chain;
    let custodial = state
        .ledger
        .eth_account_by_address(&chain_cfg.custodial_address)
        .await?
        .ok_or_else(|| {
            error!(address = %chain_cfg.custodial_address, "custodial account is not registered");
            TransferError::Unlock("custodial account is not registered".into())
        })?;

    let custodial_units = state
        .chain
        .token_balance(&custodial.address)
        .await
        .map_err(|e| {
            warn!(error = %e, "custodial balance query failed");
            TransferError::ChainTransaction {
                submitted: false,
                tx_hash: None,
                reason: e.to_string(),
            }
        })?;
    if custodial_units < U256::from(amount_int) + U256::from(BRIDGE_FEE_UNITS) {
        warn!(%custodial_units, amount_int, "custodial balance cannot cover transfer and fee");
        return Err(TransferError::InsufficientFunds);
    }

    let unlocked = state
        .chain
        .unlock_account(&custodial.address, &custodial.password, chain_cfg.unlock_duration())
        .await;
    match unlocked {
        Ok(true) => {}
        Ok(false) => {
            warn!(address = %custodial.address, "node refused to unlock custodial account");
            return Err(TransferError::Unlock("node refused unlock".into()));
        }
        Err(e) => {
            warn!(error = %e, address = %custodial.address, "unlock request failed");
            return Err(TransferError::Unlock(e.to_string()));
        }
    }

    let submitted = state
        .chain
        .transfer_token(&custodial.address, &to_address, amount_int)
        .await;

    // Never leave the signing key open longer than the call needs.
    if let Err(e) = state.chain.lock_account(&custodial.address).await {
        warn!(error = %e, address = %custodial.address, "failed to re-lock custodial account");
    }

    let tx_hash = submitted.map_err(|e| {
        warn!(error = %e, %to_address, amount_int, "transfer was not submitted");
        TransferError::ChainTransaction {
            submitted: false,
            tx_hash: None,
            reason: e.to_string(),
        }
    })?;
    info!(%tx_hash, %to_address, amount_int, "transfer submitted on chain");

    // From here on the chain is authoritative; failures below are logged loudly.
    let info = match state.chain.transaction_info(&tx_hash).await {
        Ok(info) => info,
        Err(e) => {
            warn!(error = %e, %tx_hash, "transaction lookup failed, recording without gas data");
            TxInfo::default()
        }
    };

    let record = new_eth_transaction(user_id, &tx_hash, &custodial.address, &to_address, amount_int, &info)
        .map_err(|reason| {
            error!(%tx_hash, %reason, "submitted on chain but ledger write failed");
            TransferError::ChainTransaction {
                submitted: true,
                tx_hash: Some(tx_hash.clone()),
                reason,
            }
        })?;

    let transaction = state
        .ledger
        .debit_for_chain_transfer(sender.id, amount, record)
        .await
        .map_err(|e| {
            error!(error = %e, %tx_hash, account_id = %sender.id, "submitted on chain but ledger write failed");
            TransferError::ChainTransaction {
                submitted: true,
                tx_hash: Some(tx_hash.clone()),
                reason: e.to_string(),
            }
        })?;

    let event = TransferEvent {
        tx_hash: tx_hash.clone(),
        from_address: custodial.address.clone(),
        to_address: to_address.clone(),
        amount_int,
        amount,
    };
    if let Err(e) = state.notifier.notify(&event).await {
        warn!(error = %e, %tx_hash, "transfer callback failed");
    }

    Ok(BridgeReceipt {
        address: to_address,
        amount,
        fee: bridge_fee(),
        transaction,
    })
}

fn new_eth_transaction(
    user_id: Uuid,
    tx_hash: &str,
    from_address: &str,
    to_address: &str,
    amount_int: u64,
    info: &TxInfo,
) -> Result<NewEthTransaction, String> {
    let wei = |v: U256| {
        Decimal::from_str_exact(&v.to_string())
            .map_err(|_| format!("{} wei does not fit a decimal column", v))
    };
    Ok(NewEthTransaction {
        user_id,
        tx_hash: tx_hash.to_string(),
        from_address: from_address.to_string(),
        to_address: to_address.to_string(),
        amount: i64::try_from(amount_int).map_err(|e| e.to_string())?,
        gas: i64::try_from(info.gas).map_err(|e| e.to_string())?,
        gas_price: wei(info.gas_price)?,
        value: wei(info.value)?,
        network_id: info.network_id.clone(),
    })
}
