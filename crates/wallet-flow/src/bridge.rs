use rpc_types::event::{Event, EventSink, TypedEventExt};

use crate::store::{Subscription, WalletFlowStore};

/// Forwards every state change of `store` to `event_sink` as a
/// `walletFlowUpdate` event, until the returned subscription is dropped.
pub fn forward_to_event_sink(store: &WalletFlowStore, event_sink: EventSink) -> Subscription {
    store.subscribe(move |state| {
        event_sink.typed_event(&Event::wallet_flow_update(state.clone()));
    })
}
