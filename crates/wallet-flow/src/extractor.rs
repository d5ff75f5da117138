use api_types::chat::{ChatMessage, MessagePart};
use api_types::payment_response::PaymentResponseV0;
use runtime::constants::TX_REFERENCE_DISPLAY_LENGTH;
use runtime::utils::truncate_chars;
use tracing::debug;

/// A payment confirmation found in a completed tool result, together with the
/// key that identifies it across re-renders of the conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentDescriptor {
    pub key: String,
    pub payment: PaymentResponseV0,
}

/// Identity of a payment: the transaction hash when known, otherwise the
/// tool call, otherwise the message carrying it.
pub fn payment_key(payment: &PaymentResponseV0, part: &MessagePart, message_id: &str) -> String {
    payment
        .transaction_hash()
        .filter(|hash| !hash.is_empty())
        .or(part.tool_call_id.as_deref().filter(|id| !id.is_empty()))
        .unwrap_or(message_id)
        .to_owned()
}

/// Short form of the transaction hash used in narration, `None` if the
/// payment carries no usable hash.
pub fn transaction_label(payment: &PaymentResponseV0) -> Option<&str> {
    payment
        .transaction_hash()
        .filter(|hash| !hash.is_empty())
        .map(|hash| truncate_chars(hash, TX_REFERENCE_DISPLAY_LENGTH))
}

/// Collects every payment confirmation in `messages`, in message order and
/// then part order. Tool parts that have not finished, or whose output has
/// no confirmation, are skipped. Duplicates are kept; deduplication belongs
/// to the caller.
pub fn extract_payment_descriptors(messages: &[ChatMessage]) -> Vec<PaymentDescriptor> {
    messages
        .iter()
        .flat_map(|message| {
            message
                .parts
                .iter()
                .filter(|part| part.is_tool())
                .filter_map(move |part| {
                    let output = part.available_output()?;
                    let payment = match PaymentResponseV0::from_tool_output(output) {
                        Ok(payment) => payment?,
                        Err(err) => {
                            debug!(message_id = %message.id, %err, "ignoring malformed payment response");
                            return None;
                        }
                    };
                    Some(PaymentDescriptor {
                        key: payment_key(&payment, part, &message.id),
                        payment,
                    })
                })
        })
        .collect()
}
