use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Off-chain ledger account, one per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: String, // "UT" + 40 hex chars
    pub balance: Decimal,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

/// Key held by the node on behalf of a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EthAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    #[serde(skip_serializing)]
    pub password: String, // node unlock password, never exposed in JSON
    pub qrcode: Option<String>, // storage key of the cached QR image
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    pub name: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_banned: bool,
    pub verified_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}
