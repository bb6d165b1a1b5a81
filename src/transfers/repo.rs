use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::ledger::{EthTransaction, Transaction};
use crate::transfers::dto::{EthTransactionQuery, TransactionQuery};

pub const MAX_PAGE_SIZE: i64 = 100;

const TRANSACTION_ORDERING: &[&str] = &["id", "amount", "created_at"];
const ETH_TRANSACTION_ORDERING: &[&str] = &["id", "amount", "gas", "gas_price", "value", "created_at"];

/// Maps `field` or `-field` to an ORDER BY clause. Fields outside `allowed`
/// are ignored and the newest-first default applies.
pub fn parse_ordering(raw: Option<&str>, allowed: &[&str]) -> String {
    let raw = raw.map(str::trim).unwrap_or_default();
    let (field, dir) = match raw.strip_prefix('-') {
        Some(field) => (field, "DESC"),
        None => (raw, "ASC"),
    };
    match allowed.iter().find(|f| **f == field) {
        // tie-break on id so pages stay stable
        Some(f) if *f == "id" => format!("id {}", dir),
        Some(f) => format!("{} {}, id {}", f, dir, dir),
        None => "created_at DESC, id DESC".to_string(),
    }
}

fn page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
}

/// Ledger transfers where one of the caller's accounts is sender or recipient.
pub async fn list_transactions(
    db: &PgPool,
    user_id: Uuid,
    q: &TransactionQuery,
) -> anyhow::Result<Vec<Transaction>> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT id, from_address, to_address, amount, is_active, created_at FROM transactions \
         WHERE (from_address IN (SELECT address FROM accounts WHERE user_id = ",
    );
    qb.push_bind(user_id);
    qb.push(") OR to_address IN (SELECT address FROM accounts WHERE user_id = ");
    qb.push_bind(user_id);
    qb.push("))");

    if let Some(from) = &q.from_address {
        qb.push(" AND from_address = ").push_bind(from.clone());
    }
    if let Some(to) = &q.to_address {
        qb.push(" AND to_address = ").push_bind(to.clone());
    }
    if let Some(amount) = q.amount {
        qb.push(" AND amount = ").push_bind(amount);
    }
    if let Some(active) = q.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }

    let (limit, offset) = page(q.limit, q.offset);
    qb.push(" ORDER BY ")
        .push(parse_ordering(q.ordering.as_deref(), TRANSACTION_ORDERING));
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let rows = qb.build_query_as::<Transaction>().fetch_all(db).await?;
    Ok(rows)
}

/// Bridge transfers the caller sent, or that touch one of the caller's chain addresses.
pub async fn list_eth_transactions(
    db: &PgPool,
    user_id: Uuid,
    q: &EthTransactionQuery,
) -> anyhow::Result<Vec<EthTransaction>> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT id, user_id, tx_hash, from_address, to_address, amount, gas, gas_price, value, \
         network_id, is_active, created_at FROM eth_transactions WHERE (user_id = ",
    );
    qb.push_bind(user_id);
    qb.push(
        " OR lower(from_address) IN (SELECT lower(address) FROM eth_accounts WHERE user_id = ",
    );
    qb.push_bind(user_id);
    qb.push(") OR lower(to_address) IN (SELECT lower(address) FROM eth_accounts WHERE user_id = ");
    qb.push_bind(user_id);
    qb.push("))");

    if let Some(hash) = &q.tx_hash {
        qb.push(" AND tx_hash = ").push_bind(hash.clone());
    }
    if let Some(from) = &q.from_address {
        qb.push(" AND lower(from_address) = lower(")
            .push_bind(from.clone())
            .push(")");
    }
    if let Some(to) = &q.to_address {
        qb.push(" AND lower(to_address) = lower(")
            .push_bind(to.clone())
            .push(")");
    }
    if let Some(network) = &q.network_id {
        qb.push(" AND network_id = ").push_bind(network.clone());
    }
    if let Some(active) = q.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }

    let (limit, offset) = page(q.limit, q.offset);
    qb.push(" ORDER BY ")
        .push(parse_ordering(q.ordering.as_deref(), ETH_TRANSACTION_ORDERING));
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let rows = qb.build_query_as::<EthTransaction>().fetch_all(db).await?;
    Ok(rows)
}
