use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which tool results carry protocol metadata.
pub const TOOL_OUTPUT_META_KEY: &str = "_meta";
/// Namespaced metadata key of the payment confirmation.
pub const PAYMENT_RESPONSE_META_KEY: &str = "x402/payment-response";

/// Payment confirmation attached by a paid tool to its result. Every field is
/// optional; only an explicit `success: false` changes how a flow runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponseV0 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<PaymentTransaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

/// Settlement reference, either a bare transaction hash or a receipt object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentTransaction {
    Hash(String),
    Receipt {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hash: Option<String>,
    },
}

impl PaymentTransaction {
    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::Hash(hash) => Some(hash),
            Self::Receipt { hash } => hash.as_deref(),
        }
    }
}

impl PaymentResponseV0 {
    /// Looks up the payment confirmation nested in a tool output.
    ///
    /// Returns `Ok(None)` when the output carries no confirmation at all and
    /// an error when one is present but does not match the schema.
    pub fn from_tool_output(output: &Value) -> Result<Option<Self>, serde_json::Error> {
        let Some(payment) = output
            .get(TOOL_OUTPUT_META_KEY)
            .and_then(|meta| meta.get(PAYMENT_RESPONSE_META_KEY))
        else {
            return Ok(None);
        };

        // arrays would otherwise deserialize positionally
        if !payment.is_object() {
            return Ok(None);
        }

        serde_json::from_value(payment.clone()).map(Some)
    }

    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }

    pub fn transaction_hash(&self) -> Option<&str> {
        self.transaction.as_ref().and_then(PaymentTransaction::hash)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payment_with_hash_string() -> anyhow::Result<()> {
        let output = json!({
            "content": [{ "type": "text", "text": "sunny" }],
            "_meta": {
                "x402/payment-response": {
                    "success": true,
                    "transaction": "0xabc123def4567890",
                    "network": "base-sepolia",
                    "payer": "0xBuyer"
                }
            }
        });

        let payment = PaymentResponseV0::from_tool_output(&output)?.expect("payment present");
        assert_eq!(payment.transaction_hash(), Some("0xabc123def4567890"));
        assert_eq!(payment.network.as_deref(), Some("base-sepolia"));
        assert_eq!(payment.payer.as_deref(), Some("0xBuyer"));
        assert!(!payment.is_rejected());
        Ok(())
    }

    #[test]
    fn test_payment_with_receipt_object() -> anyhow::Result<()> {
        let output = json!({
            "_meta": {
                "x402/payment-response": {
                    "transaction": { "hash": "0xfeed", "blockNumber": 12 }
                }
            }
        });
        let payment = PaymentResponseV0::from_tool_output(&output)?.expect("payment present");
        assert_eq!(payment.transaction_hash(), Some("0xfeed"));
        assert_eq!(payment.success, None);

        let output = json!({ "_meta": { "x402/payment-response": { "transaction": {} } } });
        let payment = PaymentResponseV0::from_tool_output(&output)?.expect("payment present");
        assert_eq!(payment.transaction_hash(), None);
        Ok(())
    }

    #[test]
    fn test_missing_payment() -> anyhow::Result<()> {
        assert!(PaymentResponseV0::from_tool_output(&json!({ "content": [] }))?.is_none());
        assert!(PaymentResponseV0::from_tool_output(&json!({ "_meta": {} }))?.is_none());
        assert!(
            PaymentResponseV0::from_tool_output(&json!({ "_meta": { "x402/payment-response": null } }))?
                .is_none()
        );
        assert!(
            PaymentResponseV0::from_tool_output(&json!({ "_meta": { "x402/payment-response": [true] } }))?
                .is_none()
        );
        Ok(())
    }

    #[test]
    fn test_invalid_payment_schema() {
        let output = json!({ "_meta": { "x402/payment-response": { "success": "yes" } } });
        assert!(PaymentResponseV0::from_tool_output(&output).is_err());
    }

    #[test]
    fn test_rejected_payment() -> anyhow::Result<()> {
        let output = json!({ "_meta": { "x402/payment-response": { "success": false } } });
        let payment = PaymentResponseV0::from_tool_output(&output)?.expect("payment present");
        assert!(payment.is_rejected());
        Ok(())
    }
}
