use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One side of the payment as reported by the wallet state endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletParticipantV0 {
    pub address: String,
    pub balance: f64,
}

/// Body of `GET /api/wallet/state`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletStateV0 {
    pub buyer: WalletParticipantV0,
    pub seller: WalletParticipantV0,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletStateError {
    #[error("Invalid wallet state response")]
    NotAnObject,
    #[error("Missing buyer or seller data in response")]
    MissingParticipant,
}

impl WalletStateV0 {
    /// Parses a wallet state body, tolerating malformed fields.
    ///
    /// Only a body that is not an object, or that lacks the buyer or seller
    /// object entirely, is rejected. A missing or non-string address becomes
    /// empty and a missing or non-numeric balance becomes zero.
    pub fn from_json_lenient(value: &Value) -> Result<Self, WalletStateError> {
        let object = value.as_object().ok_or(WalletStateError::NotAnObject)?;
        let (Some(buyer), Some(seller)) = (
            object.get("buyer").filter(|v| v.is_object()),
            object.get("seller").filter(|v| v.is_object()),
        ) else {
            return Err(WalletStateError::MissingParticipant);
        };

        Ok(Self {
            buyer: WalletParticipantV0::from_json_lenient(buyer),
            seller: WalletParticipantV0::from_json_lenient(seller),
        })
    }
}

impl WalletParticipantV0 {
    fn from_json_lenient(value: &Value) -> Self {
        Self {
            address: value
                .get("address")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            balance: value.get("balance").and_then(Value::as_f64).unwrap_or(0.0),
        }
    }
}
