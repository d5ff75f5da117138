use std::sync::Arc;

use serde::Serialize;
use ts_rs::TS;

use crate::WalletFlowState;

/// Sends events to the host layer (native shell, web view, CLI)
pub trait IEventSink: Send + Sync + 'static {
    /// Send event. Body is JSON-serialized
    fn event(&self, event_type: String, body: String);
    fn events(&self) -> Vec<(String, String)> {
        panic!("IEventSink.events() is only for testing")
    }
    fn num_events_of_type(&self, _event_type: String) -> usize {
        panic!("IEventSink.num_events_of_type() is only for testing")
    }
}

pub type EventSink = Arc<dyn IEventSink>;

#[derive(Serialize, Clone, Debug, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WalletFlowUpdateEvent {
    pub state: WalletFlowState,
}

#[derive(Debug)]
pub enum Event {
    WalletFlowUpdate(Box<WalletFlowUpdateEvent>),
}

impl Event {
    pub fn wallet_flow_update(state: WalletFlowState) -> Self {
        Self::WalletFlowUpdate(Box::new(WalletFlowUpdateEvent { state }))
    }
}

pub trait TypedEventExt: IEventSink {
    fn typed_event(&self, event: &Event) {
        match event {
            Event::WalletFlowUpdate(event) => {
                let body = serde_json::to_string(&event).expect("failed to json serialize");
                IEventSink::event(self, "walletFlowUpdate".into(), body);
            }
        }
    }
}

impl<T: IEventSink + ?Sized> TypedEventExt for T {}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::WalletFlowPhase;

    #[derive(Default)]
    struct RecordingEventSink(Mutex<Vec<(String, String)>>);

    impl IEventSink for RecordingEventSink {
        fn event(&self, event_type: String, body: String) {
            self.0.lock().unwrap().push((event_type, body));
        }

        fn events(&self) -> Vec<(String, String)> {
            self.0.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_wallet_flow_update_event() -> anyhow::Result<()> {
        let sink: EventSink = Arc::new(RecordingEventSink::default());
        let state = WalletFlowState {
            phase: WalletFlowPhase::Settled,
            update_index: 7,
            ..Default::default()
        };
        sink.typed_event(&Event::wallet_flow_update(state));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "walletFlowUpdate");
        let body: serde_json::Value = serde_json::from_str(&events[0].1)?;
        assert_eq!(body["state"]["phase"], "settled");
        assert_eq!(body["state"]["updateIndex"], 7);
        Ok(())
    }
}
