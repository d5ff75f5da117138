use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("Failed to retrieve wallet state")]
    WalletStateUnavailable,
    #[error("Request to fetch wallet state took too long")]
    Timeout,
    #[error("Deserializing JSON failed: {0}")]
    InvalidJson(String),
    #[error("Wallet state URL is not configured for {0}")]
    WalletStateUrlMissing(String),
}

#[derive(Debug, Serialize, Deserialize, TS, Clone)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RpcError {
    pub error: String,
    pub detail: String,
    pub error_code: Option<ErrorCode>,
}

impl RpcError {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            error: err.to_string(),
            detail: format!("{err:?}"),
            error_code: get_error_code(err),
        }
    }
}

fn get_error_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.downcast_ref().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_add_error() {
        let err = anyhow::anyhow!("connection refused").context(ErrorCode::WalletStateUnavailable);
        let code = get_error_code(&err);
        assert_eq!(code, Some(ErrorCode::WalletStateUnavailable));
        assert_eq!(err.to_string(), "Failed to retrieve wallet state");
    }

    #[test]
    fn test_just_error_code() {
        let err = anyhow::anyhow!(ErrorCode::Timeout);
        let rpc_error = RpcError::from_anyhow(&err);
        assert_eq!(rpc_error.error_code, Some(ErrorCode::Timeout));
        assert_eq!(rpc_error.error, "Request to fetch wallet state took too long");
    }

    #[test]
    fn test_plain_error_has_no_code() {
        let err = anyhow::anyhow!("Missing buyer or seller data in response");
        assert_eq!(RpcError::from_anyhow(&err).error_code, None);
    }
}
