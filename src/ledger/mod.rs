//! Off-chain balance bookkeeping.
//!
//! Every balance change goes through [`LedgerStore`], whose implementations
//! apply the debit, the credit (if any) and the history row as one unit.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::accounts::repo_types::{Account, EthAccount};

pub mod locks;
#[cfg(test)]
pub(crate) mod memory;
pub mod repo;
pub mod repo_types;

pub use locks::AccountLocks;
pub use repo::PgLedger;
pub use repo_types::{EthTransaction, NewEthTransaction, Transaction};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("account {0} not found")]
    AccountNotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, LedgerError>;

    async fn account_by_user(&self, user_id: Uuid) -> Result<Option<Account>, LedgerError>;

    async fn account_by_address(&self, address: &str) -> Result<Option<Account>, LedgerError>;

    async fn eth_account_by_address(
        &self,
        address: &str,
    ) -> Result<Option<EthAccount>, LedgerError>;

    /// Moves `amount` between two accounts and records one [`Transaction`].
    /// The sender's balance is re-checked under lock.
    async fn transfer(
        &self,
        from_id: Uuid,
        to_id: Uuid,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError>;

    /// Debits `amount` from an account and records the on-chain transfer it paid for.
    async fn debit_for_chain_transfer(
        &self,
        account_id: Uuid,
        amount: Decimal,
        record: NewEthTransaction,
    ) -> Result<EthTransaction, LedgerError>;
}
