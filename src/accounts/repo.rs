use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::accounts::repo_types::{Account, Contract, EthAccount};

const ETH_ACCOUNT_COLUMNS: &str =
    "id, user_id, address, password, qrcode, created_at, modified_at";
const CONTRACT_COLUMNS: &str = "id, user_id, address, name, is_active, is_verified, is_banned, \
     verified_at, created_at, modified_at";

pub async fn insert_account_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    address: &str,
) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO accounts (user_id, address) VALUES ($1, $2)")
        .bind(user_id)
        .bind(address)
        .execute(&mut **tx)
        .await
        .context("insert account")?;
    Ok(())
}

pub async fn insert_eth_account_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    address: &str,
    password: &str,
) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO eth_accounts (user_id, address, password) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(address)
        .bind(password)
        .execute(&mut **tx)
        .await
        .context("insert eth account")?;
    Ok(())
}

pub async fn find_account_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Account>> {
    let row = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, user_id, address, balance, created_at, modified_at
          FROM accounts
         WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("find account by user")?;
    Ok(row)
}

pub async fn list_accounts_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Account>> {
    let rows = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, user_id, address, balance, created_at, modified_at
          FROM accounts
         WHERE user_id = $1
         ORDER BY created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list accounts by user")?;
    Ok(rows)
}

pub async fn find_eth_account_by_user(
    db: &PgPool,
    user_id: Uuid,
) -> anyhow::Result<Option<EthAccount>> {
    let sql = format!("SELECT {} FROM eth_accounts WHERE user_id = $1", ETH_ACCOUNT_COLUMNS);
    let row = sqlx::query_as::<_, EthAccount>(&sql)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find eth account by user")?;
    Ok(row)
}

pub async fn list_eth_accounts_by_user(
    db: &PgPool,
    user_id: Uuid,
) -> anyhow::Result<Vec<EthAccount>> {
    let sql = format!(
        "SELECT {} FROM eth_accounts WHERE user_id = $1 ORDER BY created_at ASC",
        ETH_ACCOUNT_COLUMNS
    );
    let rows = sqlx::query_as::<_, EthAccount>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list eth accounts by user")?;
    Ok(rows)
}

/// The caller's own node account with this address, if any.
pub async fn find_owned_eth_account(
    db: &PgPool,
    user_id: Uuid,
    address: &str,
) -> anyhow::Result<Option<EthAccount>> {
    let sql = format!(
        "SELECT {} FROM eth_accounts WHERE user_id = $1 AND lower(address) = lower($2)",
        ETH_ACCOUNT_COLUMNS
    );
    let row = sqlx::query_as::<_, EthAccount>(&sql)
        .bind(user_id)
        .bind(address)
        .fetch_optional(db)
        .await
        .context("find owned eth account")?;
    Ok(row)
}

/// Only fills an empty slot; a key already cached by a concurrent request wins.
pub async fn set_qrcode(db: &PgPool, eth_account_id: Uuid, key: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE eth_accounts
           SET qrcode = $2, modified_at = now()
         WHERE id = $1 AND qrcode IS NULL
        "#,
    )
    .bind(eth_account_id)
    .bind(key)
    .execute(db)
    .await
    .context("set qrcode")?;
    Ok(())
}

pub async fn list_contracts_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Contract>> {
    let sql = format!(
        "SELECT {} FROM contracts WHERE user_id = $1 ORDER BY created_at DESC",
        CONTRACT_COLUMNS
    );
    let rows = sqlx::query_as::<_, Contract>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list contracts by user")?;
    Ok(rows)
}

pub async fn find_contract_by_address(
    db: &PgPool,
    address: &str,
) -> anyhow::Result<Option<Contract>> {
    let sql = format!(
        "SELECT {} FROM contracts WHERE lower(address) = lower($1)",
        CONTRACT_COLUMNS
    );
    let row = sqlx::query_as::<_, Contract>(&sql)
        .bind(address)
        .fetch_optional(db)
        .await
        .context("find contract by address")?;
    Ok(row)
}

/// Returns `None` when the address is already registered.
pub async fn insert_contract(
    db: &PgPool,
    user_id: Uuid,
    address: &str,
    name: &str,
) -> anyhow::Result<Option<Contract>> {
    let sql = format!(
        r#"
        INSERT INTO contracts (user_id, address, name)
        VALUES ($1, $2, $3)
        ON CONFLICT (address) DO NOTHING
        RETURNING {}
        "#,
        CONTRACT_COLUMNS
    );
    let row = sqlx::query_as::<_, Contract>(&sql)
        .bind(user_id)
        .bind(address)
        .bind(name)
        .fetch_optional(db)
        .await
        .context("insert contract")?;
    Ok(row)
}
