//! Shapes of the chat messages streamed by the chat transport. Only the
//! fields needed to locate tool results are modelled, everything else in a
//! part (text, reasoning, tool input) is ignored on deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Part type used by tools registered at runtime.
pub const DYNAMIC_TOOL_PART_TYPE: &str = "dynamic-tool";
/// Statically known tools are tagged `tool-<name>`.
pub const TOOL_PART_TYPE_PREFIX: &str = "tool-";
/// Terminal tool state in which `output` is populated.
pub const OUTPUT_AVAILABLE_STATE: &str = "output-available";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl MessagePart {
    pub fn is_tool(&self) -> bool {
        self.part_type == DYNAMIC_TOOL_PART_TYPE || self.part_type.starts_with(TOOL_PART_TYPE_PREFIX)
    }

    /// Output of a tool part, only once the tool reached its terminal state.
    pub fn available_output(&self) -> Option<&Value> {
        if self.state.as_deref() != Some(OUTPUT_AVAILABLE_STATE) {
            return None;
        }
        self.output.as_ref()
    }
}
