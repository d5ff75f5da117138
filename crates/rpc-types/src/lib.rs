use api_types::wallet_state::{WalletParticipantV0, WalletStateV0};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use ts_rs::TS;

pub mod error;
pub mod event;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WalletParticipant {
    /// Opaque wallet identifier, empty until the first successful snapshot.
    pub address: String,
    pub balance: f64,
}

/// Point-in-time reading of both sides of the payment. Always replaced as a
/// whole, never patched field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WalletFlowSnapshot {
    pub buyer: WalletParticipant,
    pub seller: WalletParticipant,
}

impl From<WalletParticipantV0> for WalletParticipant {
    fn from(value: WalletParticipantV0) -> Self {
        Self {
            address: value.address,
            balance: value.balance,
        }
    }
}

impl From<WalletStateV0> for WalletFlowSnapshot {
    fn from(value: WalletStateV0) -> Self {
        Self {
            buyer: value.buyer.into(),
            seller: value.seller.into(),
        }
    }
}

/// Lifecycle of a payment flow.
///
/// The declaration order is the progress order shown to users; `Failed` is
/// absorbing and may be entered from any phase after `Idle` except
/// `Settled`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    TS,
    Display,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
#[ts(export)]
pub enum WalletFlowPhase {
    #[default]
    Idle,
    Initiated,
    Holding,
    Releasing,
    Settled,
    Failed,
}

impl WalletFlowPhase {
    /// Phases a successful flow walks through, in order.
    pub const PROGRESS: [WalletFlowPhase; 4] = [
        WalletFlowPhase::Initiated,
        WalletFlowPhase::Holding,
        WalletFlowPhase::Releasing,
        WalletFlowPhase::Settled,
    ];

    /// Position in [`Self::PROGRESS`], `None` for idle and failed.
    pub fn progress_step(self) -> Option<usize> {
        Self::PROGRESS.iter().position(|phase| *phase == self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Failed)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
#[ts(export)]
pub enum WalletFlowEventTone {
    #[default]
    Info,
    Success,
    Error,
}

/// Entry of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WalletFlowEvent {
    pub id: String,
    /// Unix milliseconds. Informational, the log is ordered by insertion.
    #[ts(type = "number")]
    pub timestamp: u64,
    pub label: String,
    pub tone: WalletFlowEventTone,
}

/// Last structural mutation applied to the flow state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", tag = "type")]
#[ts(export)]
pub enum TimelineEvent {
    Start { snapshot: WalletFlowSnapshot },
    Phase { phase: WalletFlowPhase },
    Balances { snapshot: WalletFlowSnapshot },
    Complete { snapshot: WalletFlowSnapshot },
    Error { message: Option<String> },
}

/// Everything an observer of the payment flow may read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WalletFlowState {
    pub phase: WalletFlowPhase,
    pub snapshot: WalletFlowSnapshot,
    pub is_animating: bool,
    pub is_hydrated: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
    /// Bumped on every structural restart (start, failure, reset).
    #[ts(type = "number")]
    pub timeline_version: u64,
    /// Bumped on every state change. Updates may reach observers out of
    /// order, use this field to drop stale ones.
    #[ts(type = "number")]
    pub update_index: u64,
    /// Activity log, oldest first.
    pub events: Vec<WalletFlowEvent>,
    pub last_event: Option<TimelineEvent>,
}

impl WalletFlowState {
    /// The `n` most recent activity events, oldest first.
    pub fn recent_events(&self, n: usize) -> &[WalletFlowEvent] {
        &self.events[self.events.len().saturating_sub(n)..]
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_phase_progress_order() {
        let phases: Vec<_> = WalletFlowPhase::iter().collect();
        assert!(phases.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(WalletFlowPhase::Idle.progress_step(), None);
        assert_eq!(WalletFlowPhase::Holding.progress_step(), Some(1));
        assert_eq!(WalletFlowPhase::Failed.progress_step(), None);
        assert!(WalletFlowPhase::Settled.is_terminal());
        assert!(!WalletFlowPhase::Releasing.is_terminal());
    }

    #[test]
    fn test_state_json_shape() -> anyhow::Result<()> {
        let state = WalletFlowState {
            phase: WalletFlowPhase::Holding,
            last_event: Some(TimelineEvent::Phase {
                phase: WalletFlowPhase::Holding,
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&state)?;
        assert_eq!(json["phase"], "holding");
        assert_eq!(json["isAnimating"], false);
        assert_eq!(json["timelineVersion"], 0);
        assert_eq!(json["lastEvent"]["type"], "phase");
        assert_eq!(json["lastEvent"]["phase"], "holding");
        assert_eq!(WalletFlowPhase::Releasing.to_string(), "releasing");
        Ok(())
    }

    #[test]
    fn test_recent_events() {
        let state = WalletFlowState {
            events: (0..5)
                .map(|i| WalletFlowEvent {
                    id: i.to_string(),
                    timestamp: i,
                    label: format!("event {i}"),
                    tone: WalletFlowEventTone::Info,
                })
                .collect(),
            ..Default::default()
        };
        let ids: Vec<_> = state.recent_events(2).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4"]);
        assert_eq!(state.recent_events(10).len(), 5);
    }
}
