use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::transfers::dto::FailureResponse;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid address")]
    InvalidAddress,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("failed to unlock account: {0}")]
    Unlock(String),

    /// `submitted` tells whether the node accepted the transaction before the failure,
    /// in which case the chain may already reflect the transfer.
    #[error("transaction failed: {reason}")]
    ChainTransaction {
        submitted: bool,
        tx_hash: Option<String>,
        reason: String,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

impl TransferError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidAddress | Self::InsufficientFunds => {
                StatusCode::BAD_REQUEST
            }
            Self::Unlock(_) | Self::ChainTransaction { .. } => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Node and database internals stay in the logs.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::InvalidAddress => "Invalid address".into(),
            Self::InsufficientFunds => "Insufficient funds".into(),
            Self::Unlock(_) => "Failed to unlock account".into(),
            Self::ChainTransaction {
                submitted: true,
                tx_hash,
                ..
            } => match tx_hash {
                Some(hash) => format!("Transaction {} was submitted but could not be recorded", hash),
                None => "Transaction was submitted but could not be recorded".into(),
            },
            Self::ChainTransaction { .. } => "Transaction failed".into(),
            Self::Storage(_) => "Internal error".into(),
        }
    }
}

impl From<LedgerError> for TransferError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientFunds => Self::InsufficientFunds,
            LedgerError::AccountNotFound(_) => Self::validation("Account not found"),
            LedgerError::Database(e) => Self::Storage(e.to_string()),
        }
    }
}

impl IntoResponse for TransferError {
    fn into_response(self) -> Response {
        let body = FailureResponse {
            success: false,
            detail: self.detail(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_split_client_and_upstream_failures() {
        assert_eq!(TransferError::InvalidAddress.status(), StatusCode::BAD_REQUEST);
        assert_eq!(TransferError::InsufficientFunds.status(), StatusCode::BAD_REQUEST);
        assert_eq!(TransferError::Unlock("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            TransferError::Storage("pool timed out".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn detail_hides_internals() {
        let err = TransferError::Storage("relation \"accounts\" does not exist".into());
        assert_eq!(err.detail(), "Internal error");

        let err = TransferError::ChainTransaction {
            submitted: false,
            tx_hash: None,
            reason: "insufficient funds for gas".into(),
        };
        assert_eq!(err.detail(), "Transaction failed");

        let err = TransferError::ChainTransaction {
            submitted: true,
            tx_hash: Some("0xabc".into()),
            reason: "db down".into(),
        };
        assert!(err.detail().contains("0xabc"));
    }

    #[test]
    fn ledger_errors_map_to_transfer_errors() {
        assert!(matches!(
            TransferError::from(LedgerError::InsufficientFunds),
            TransferError::InsufficientFunds
        ));
        assert!(matches!(
            TransferError::from(LedgerError::AccountNotFound(uuid::Uuid::new_v4())),
            TransferError::Validation(_)
        ));
    }
}
