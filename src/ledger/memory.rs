use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{EthTransaction, LedgerError, LedgerStore, NewEthTransaction, Transaction};
use crate::accounts::repo_types::{Account, EthAccount};

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    eth_accounts: Vec<EthAccount>,
    transactions: Vec<Transaction>,
    eth_transactions: Vec<EthTransaction>,
}

/// In-memory ledger with the same all-or-nothing semantics as [`super::PgLedger`].
#[derive(Default)]
pub struct MemoryLedger {
    tables: Mutex<Tables>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_account(&self, user_id: Uuid, address: &str, balance: Decimal) -> Account {
        let now = OffsetDateTime::now_utc();
        let account = Account {
            id: Uuid::new_v4(),
            user_id,
            address: address.to_string(),
            balance,
            created_at: now,
            modified_at: now,
        };
        self.tables.lock().await.accounts.push(account.clone());
        account
    }

    pub async fn add_eth_account(&self, user_id: Uuid, address: &str, password: &str) -> EthAccount {
        let now = OffsetDateTime::now_utc();
        let account = EthAccount {
            id: Uuid::new_v4(),
            user_id,
            address: address.to_string(),
            password: password.to_string(),
            qrcode: None,
            created_at: now,
            modified_at: now,
        };
        self.tables.lock().await.eth_accounts.push(account.clone());
        account
    }

    pub async fn balance(&self, account_id: Uuid) -> Decimal {
        let tables = self.tables.lock().await;
        tables
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.tables.lock().await.transactions.clone()
    }

    pub async fn eth_transactions(&self) -> Vec<EthTransaction> {
        self.tables.lock().await.eth_transactions.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, LedgerError> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn account_by_user(&self, user_id: Uuid) -> Result<Option<Account>, LedgerError> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.iter().find(|a| a.user_id == user_id).cloned())
    }

    async fn account_by_address(&self, address: &str) -> Result<Option<Account>, LedgerError> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.iter().find(|a| a.address == address).cloned())
    }

    async fn eth_account_by_address(
        &self,
        address: &str,
    ) -> Result<Option<EthAccount>, LedgerError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .eth_accounts
            .iter()
            .find(|a| a.address.eq_ignore_ascii_case(address))
            .cloned())
    }

    async fn transfer(
        &self,
        from_id: Uuid,
        to_id: Uuid,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError> {
        let mut tables = self.tables.lock().await;
        let from = tables
            .accounts
            .iter()
            .position(|a| a.id == from_id)
            .ok_or(LedgerError::AccountNotFound(from_id))?;
        let to = tables
            .accounts
            .iter()
            .position(|a| a.id == to_id)
            .ok_or(LedgerError::AccountNotFound(to_id))?;
        if tables.accounts[from].balance < amount {
            return Err(LedgerError::InsufficientFunds);
        }

        tables.accounts[from].balance -= amount;
        tables.accounts[to].balance += amount;
        let record = Transaction {
            id: tables.transactions.len() as i64 + 1,
            from_address: tables.accounts[from].address.clone(),
            to_address: tables.accounts[to].address.clone(),
            amount,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.transactions.push(record.clone());
        Ok(record)
    }

    async fn debit_for_chain_transfer(
        &self,
        account_id: Uuid,
        amount: Decimal,
        record: NewEthTransaction,
    ) -> Result<EthTransaction, LedgerError> {
        let mut tables = self.tables.lock().await;
        let idx = tables
            .accounts
            .iter()
            .position(|a| a.id == account_id)
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        if tables.accounts[idx].balance < amount {
            return Err(LedgerError::InsufficientFunds);
        }

        tables.accounts[idx].balance -= amount;
        let row = EthTransaction {
            id: tables.eth_transactions.len() as i64 + 1,
            user_id: Some(record.user_id),
            tx_hash: record.tx_hash,
            from_address: record.from_address,
            to_address: record.to_address,
            amount: record.amount,
            gas: record.gas,
            gas_price: record.gas_price,
            value: record.value,
            network_id: record.network_id,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.eth_transactions.push(row.clone());
        Ok(row)
    }
}
