use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub address: String,
    /// Decimal strings; on-chain values are 256-bit and can exceed any fixed-point type.
    pub eth_balance: String,
    pub balance: String,
    pub balance_int: String,
}

#[derive(Debug, Serialize)]
pub struct QrCodeResponse {
    pub address: String,
    pub qrcode_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateContractRequest {
    pub address: String,
    pub name: String,
}
