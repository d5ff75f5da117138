//! Keeps a visual model of a payment in step with the chat conversation
//! that triggered it.
//!
//! [`WalletFlow`] bundles the observable [`WalletFlowStore`] with the
//! [`WalletFlowSync`] that feeds it from chat messages and the wallet API
//! used to read balances.

use std::sync::Arc;

use api_types::chat::ChatMessage;
use rpc_types::event::EventSink;
use runtime::api::IWalletApi;
use runtime::config::WalletFlowConfig;
use tracing::warn;

pub mod bridge;
pub mod extractor;
pub mod store;
pub mod sync;
#[cfg(test)]
mod test_utils;

use store::{Subscription, WalletFlowStore};
use sync::WalletFlowSync;

pub struct WalletFlow {
    store: WalletFlowStore,
    sync: WalletFlowSync,
    api: Arc<dyn IWalletApi>,
}

impl WalletFlow {
    pub fn new(api: Arc<dyn IWalletApi>, config: &WalletFlowConfig) -> Self {
        let store = WalletFlowStore::new(config.event_history_limit);
        let sync = WalletFlowSync::new(store.clone(), api.clone(), config);
        Self { store, sync, api }
    }

    pub fn store(&self) -> &WalletFlowStore {
        &self.store
    }

    /// Loads the initial balances. A failure raises the store's error flag
    /// instead of failing a flow, and is returned to the caller as well.
    pub async fn hydrate(&self) -> anyhow::Result<()> {
        match self.api.fetch_wallet_snapshot().await {
            Ok(snapshot) => {
                self.store.update_balances(snapshot);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "initial wallet state fetch failed");
                self.store.set_error(err.to_string());
                Err(err)
            }
        }
    }

    /// See [`WalletFlowSync::on_messages`].
    pub fn on_messages(&self, messages: &[ChatMessage]) {
        self.sync.on_messages(messages);
    }

    pub fn teardown(&self) {
        self.sync.teardown();
    }

    pub fn active_flows(&self) -> usize {
        self.sync.active_flows()
    }

    pub async fn wait_for_flows(&self) {
        self.sync.wait_for_flows().await;
    }

    pub fn forward_to_event_sink(&self, event_sink: EventSink) -> Subscription {
        bridge::forward_to_event_sink(&self.store, event_sink)
    }
}
