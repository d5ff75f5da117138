use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rpc_types::event::IEventSink;
use rpc_types::WalletFlowSnapshot;
use runtime::api::IWalletApi;
use runtime::utils::PoisonedLockExt;

/// Wallet API returning scripted results in order.
#[derive(Default)]
pub struct MockWalletApi {
    results: Mutex<VecDeque<anyhow::Result<WalletFlowSnapshot>>>,
    calls: AtomicUsize,
}

impl MockWalletApi {
    pub fn push_result(&self, result: anyhow::Result<WalletFlowSnapshot>) {
        self.results.ensure_lock().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IWalletApi for MockWalletApi {
    async fn fetch_wallet_snapshot(&self) -> anyhow::Result<WalletFlowSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .ensure_lock()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted wallet state left")))
    }
}

/// Wallet API whose requests never complete.
pub struct PendingWalletApi;

#[async_trait::async_trait]
impl IWalletApi for PendingWalletApi {
    async fn fetch_wallet_snapshot(&self) -> anyhow::Result<WalletFlowSnapshot> {
        std::future::pending().await
    }
}

#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<(String, String)>>,
}

impl IEventSink for RecordingEventSink {
    fn event(&self, event_type: String, body: String) {
        self.events.ensure_lock().push((event_type, body));
    }

    fn events(&self) -> Vec<(String, String)> {
        self.events.ensure_lock().clone()
    }

    fn num_events_of_type(&self, event_type: String) -> usize {
        self.events
            .ensure_lock()
            .iter()
            .filter(|(ty, _)| *ty == event_type)
            .count()
    }
}
