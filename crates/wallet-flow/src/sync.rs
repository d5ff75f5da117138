//! Drives the [`WalletFlowStore`] from the chat message stream.
//!
//! Every payment confirmation is handled at most once per session. A handled
//! payment owns a cancellable scope for as long as its timed phase sequence
//! and balance fetch run; clearing the conversation cancels all of them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_types::chat::ChatMessage;
use rpc_types::{WalletFlowEventTone, WalletFlowPhase};
use runtime::api::IWalletApi;
use runtime::config::WalletFlowConfig;
use runtime::utils::PoisonedLockExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::extractor::{extract_payment_descriptors, transaction_label, PaymentDescriptor};
use crate::store::WalletFlowStore;

const ACTIVE_FLOW_WARN_LIMIT: usize = 8;

pub struct WalletFlowSync {
    store: WalletFlowStore,
    api: Arc<dyn IWalletApi>,
    phase_steps: [(Duration, WalletFlowPhase); 2],
    state: Arc<Mutex<SyncState>>,
    tracker: TaskTracker,
    // `close`/`reopen` of the tracker is shared state, one waiter at a time
    flows_waiter: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct SyncState {
    processed: HashSet<String>,
    scopes: HashMap<String, FlowScope>,
    next_flow_id: u64,
    last_message_count: Option<usize>,
}

struct FlowScope {
    flow_id: u64,
    token: CancellationToken,
}

impl WalletFlowSync {
    pub fn new(store: WalletFlowStore, api: Arc<dyn IWalletApi>, config: &WalletFlowConfig) -> Self {
        Self {
            store,
            api,
            phase_steps: [
                (config.holding_delay, WalletFlowPhase::Holding),
                (config.releasing_delay, WalletFlowPhase::Releasing),
            ],
            state: Arc::new(Mutex::new(SyncState::default())),
            tracker: TaskTracker::new(),
            flows_waiter: tokio::sync::Mutex::new(()),
        }
    }

    /// Reacts to the current message list. Must be called from within a
    /// tokio runtime since flows run as background tasks.
    ///
    /// An empty list tears the session down, once per transition to empty.
    pub fn on_messages(&self, messages: &[ChatMessage]) {
        let previous_count = self
            .state
            .ensure_lock()
            .last_message_count
            .replace(messages.len());

        if messages.is_empty() {
            if previous_count != Some(0) {
                self.teardown();
            }
            return;
        }

        for descriptor in extract_payment_descriptors(messages) {
            self.process(descriptor);
        }
    }

    fn process(&self, PaymentDescriptor { key, payment }: PaymentDescriptor) {
        let scope = {
            let mut state = self.state.ensure_lock();
            if !state.processed.insert(key.clone()) {
                return;
            }
            if payment.is_rejected() {
                None
            } else {
                state.next_flow_id += 1;
                let flow_id = state.next_flow_id;
                let token = CancellationToken::new();
                let scope = FlowScope {
                    flow_id,
                    token: token.clone(),
                };
                if let Some(stale) = state.scopes.insert(key.clone(), scope) {
                    stale.token.cancel();
                }
                let active_flows = state.scopes.len();
                if ACTIVE_FLOW_WARN_LIMIT < active_flows {
                    warn!(%active_flows, "unusually many payment flows in flight");
                }
                Some((flow_id, token))
            }
        };

        let Some((flow_id, token)) = scope else {
            info!(%key, "payment rejected");
            self.store.fail_flow(Some("Payment failed"));
            self.store
                .log_event("Payment rejected by issuer", WalletFlowEventTone::Error);
            return;
        };

        info!(%key, flow_id, "payment flow started");
        self.store.start_flow(self.store.snapshot());
        self.store
            .log_event("Awaiting authorization confirmation", WalletFlowEventTone::Info);
        if let Some(network) = payment.network.as_deref().filter(|n| !n.is_empty()) {
            self.store
                .log_event(format!("Network: {network}"), WalletFlowEventTone::Info);
        }
        if let Some(payer) = payment.payer.as_deref().filter(|p| !p.is_empty()) {
            self.store
                .log_event(format!("Buyer wallet: {payer}"), WalletFlowEventTone::Info);
        }
        if let Some(reference) = transaction_label(&payment) {
            self.store
                .log_event(format!("Tx reference {reference}"), WalletFlowEventTone::Info);
        }

        let store = self.store.clone();
        let api = self.api.clone();
        let state = self.state.clone();
        let phase_steps = self.phase_steps;
        self.tracker.spawn(async move {
            run_flow(&store, api.as_ref(), phase_steps, &token).await;
            release_scope(&state, &key, flow_id);
        });
    }

    /// Cancels every running flow, forgets handled payments and resets the
    /// store to `idle`.
    pub fn teardown(&self) {
        let scopes = {
            let mut state = self.state.ensure_lock();
            state.processed.clear();
            std::mem::take(&mut state.scopes)
        };
        if !scopes.is_empty() {
            debug!(cancelled = scopes.len(), "cancelling payment flows");
        }
        for scope in scopes.into_values() {
            scope.token.cancel();
        }
        self.store.reset();
    }

    /// Number of flows whose phase sequence or fetch is still running.
    pub fn active_flows(&self) -> usize {
        self.state.ensure_lock().scopes.len()
    }

    /// Waits until every flow spawned so far has exited. Concurrent
    /// callers take turns, each waiting for the flows live at its turn.
    pub async fn wait_for_flows(&self) {
        let _waiter = self.flows_waiter.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl Drop for WalletFlowSync {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run_flow(
    store: &WalletFlowStore,
    api: &dyn IWalletApi,
    phase_steps: [(Duration, WalletFlowPhase); 2],
    token: &CancellationToken,
) {
    let writer = store.guarded(token);

    for (delay, phase) in phase_steps {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(?phase, "payment flow cancelled while waiting");
                return;
            }
            () = tokio::time::sleep(delay) => {}
        }
        writer.set_phase(phase);
    }

    writer.log_event("Verification checks passed", WalletFlowEventTone::Info);

    let result = tokio::select! {
        biased;
        () = token.cancelled() => {
            debug!("payment flow cancelled while fetching balances");
            return;
        }
        result = api.fetch_wallet_snapshot() => result,
    };
    if token.is_cancelled() {
        return;
    }

    match result {
        Ok(snapshot) => {
            writer.update_balances(snapshot.clone());
            writer.complete_flow(snapshot);
            info!("payment flow settled");
        }
        Err(err) => {
            warn!(%err, "payment flow failed");
            writer.fail_flow(Some(&err.to_string()));
        }
    }
}

fn release_scope(state: &Mutex<SyncState>, key: &str, flow_id: u64) {
    let mut state = state.ensure_lock();
    if state
        .scopes
        .get(key)
        .is_some_and(|scope| scope.flow_id == flow_id)
    {
        state.scopes.remove(key);
    }
}
