use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Off-chain transfer record. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub from_address: String,
    pub to_address: String,
    pub amount: Decimal,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

/// On-chain transfer record. `amount` is in token units (1/1000 UTCoin),
/// `gas_price` and `value` in wei.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EthTransaction {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: i64,
    pub gas: i64,
    pub gas_price: Decimal,
    pub value: Decimal,
    pub network_id: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewEthTransaction {
    pub user_id: Uuid,
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: i64,
    pub gas: i64,
    pub gas_price: Decimal,
    pub value: Decimal,
    pub network_id: String,
}
