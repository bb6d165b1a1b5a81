use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{EthTransaction, LedgerError, LedgerStore, NewEthTransaction, Transaction};
use crate::accounts::repo_types::{Account, EthAccount};

const ACCOUNT_COLUMNS: &str = "id, user_id, address, balance, created_at, modified_at";

/// Postgres-backed ledger. Balance changes run inside a single transaction
/// with the touched account rows locked.
#[derive(Clone)]
pub struct PgLedger {
    db: PgPool,
}

impl PgLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_account(&self, column: &str, value: &str) -> Result<Option<Account>, LedgerError> {
        let sql = format!("SELECT {} FROM accounts WHERE {} = $1", ACCOUNT_COLUMNS, column);
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, LedgerError> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn account_by_user(&self, user_id: Uuid) -> Result<Option<Account>, LedgerError> {
        let sql = format!("SELECT {} FROM accounts WHERE user_id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, Account>(&sql)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn account_by_address(&self, address: &str) -> Result<Option<Account>, LedgerError> {
        self.fetch_account("address", address).await
    }

    async fn eth_account_by_address(
        &self,
        address: &str,
    ) -> Result<Option<EthAccount>, LedgerError> {
        let row = sqlx::query_as::<_, EthAccount>(
            r#"
            SELECT id, user_id, address, password, qrcode, created_at, modified_at
            FROM eth_accounts
            WHERE lower(address) = lower($1)
            "#,
        )
        .bind(address)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn transfer(
        &self,
        from_id: Uuid,
        to_id: Uuid,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError> {
        let mut tx = self.db.begin().await?;

        // Lock both rows in id order so opposing transfers cannot deadlock.
        let sql = format!(
            "SELECT {} FROM accounts WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            ACCOUNT_COLUMNS
        );
        let locked = sqlx::query_as::<_, Account>(&sql)
            .bind(vec![from_id, to_id])
            .fetch_all(&mut *tx)
            .await?;

        let sender = locked
            .iter()
            .find(|a| a.id == from_id)
            .ok_or(LedgerError::AccountNotFound(from_id))?;
        let recipient = locked
            .iter()
            .find(|a| a.id == to_id)
            .ok_or(LedgerError::AccountNotFound(to_id))?;

        if sender.balance < amount {
            // dropping `tx` rolls back and releases the locks
            return Err(LedgerError::InsufficientFunds);
        }

        sqlx::query(
            "UPDATE accounts SET balance = balance - $1, modified_at = now() WHERE id = $2",
        )
        .bind(amount)
        .bind(sender.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE accounts SET balance = balance + $1, modified_at = now() WHERE id = $2",
        )
        .bind(amount)
        .bind(recipient.id)
        .execute(&mut *tx)
        .await?;

        let record = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (from_address, to_address, amount)
            VALUES ($1, $2, $3)
            RETURNING id, from_address, to_address, amount, is_active, created_at
            "#,
        )
        .bind(&sender.address)
        .bind(&recipient.address)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(tx_id = record.id, "ledger transfer committed");
        Ok(record)
    }

    #[instrument(skip(self, record), fields(tx_hash = %record.tx_hash))]
    async fn debit_for_chain_transfer(
        &self,
        account_id: Uuid,
        amount: Decimal,
        record: NewEthTransaction,
    ) -> Result<EthTransaction, LedgerError> {
        let mut tx = self.db.begin().await?;

        // Compare-and-swap: the debit only lands if the balance still covers it.
        let debited = sqlx::query(
            r#"
            UPDATE accounts
               SET balance = balance - $1, modified_at = now()
             WHERE id = $2 AND balance >= $1
            "#,
        )
        .bind(amount)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM accounts WHERE id = $1")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => LedgerError::InsufficientFunds,
                None => LedgerError::AccountNotFound(account_id),
            });
        }

        let row = sqlx::query_as::<_, EthTransaction>(
            r#"
            INSERT INTO eth_transactions
                (user_id, tx_hash, from_address, to_address, amount, gas, gas_price, value, network_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, tx_hash, from_address, to_address, amount, gas,
                      gas_price, value, network_id, is_active, created_at
            "#,
        )
        .bind(record.user_id)
        .bind(&record.tx_hash)
        .bind(&record.from_address)
        .bind(&record.to_address)
        .bind(record.amount)
        .bind(record.gas)
        .bind(record.gas_price)
        .bind(record.value)
        .bind(&record.network_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }
}
