use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{EthTransaction, Transaction};

/// Body of every transfer endpoint. Amount accepts JSON numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct LedgerTransferResponse {
    pub success: bool,
    pub transaction: Transaction,
}

#[derive(Debug, Serialize)]
pub struct BridgeTransferResponse {
    pub success: bool,
    pub address: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub transaction: EthTransaction,
}

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub amount: Option<Decimal>,
    pub is_active: Option<bool>,
    pub ordering: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct EthTransactionQuery {
    pub tx_hash: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub network_id: Option<String>,
    pub is_active: Option<bool>,
    pub ordering: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_accepts_numbers_and_strings() {
        let req: TransferRequest =
            serde_json::from_str(r#"{"address":"UTx","amount":30.5}"#).unwrap();
        assert_eq!(req.amount, Some(Decimal::new(305, 1)));

        let req: TransferRequest =
            serde_json::from_str(r#"{"address":"UTx","amount":"30.500"}"#).unwrap();
        assert_eq!(req.amount, Some(Decimal::new(30_500, 3)));

        let req: TransferRequest = serde_json::from_str(r#"{"address":"UTx"}"#).unwrap();
        assert!(req.amount.is_none());
    }

    #[test]
    fn failure_body_shape() {
        let json = serde_json::to_value(FailureResponse {
            success: false,
            detail: "Invalid address".into(),
        })
        .unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["detail"], "Invalid address");
    }
}
