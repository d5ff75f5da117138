//! Observable state of the payment flow.
//!
//! The store is the only writer of [`WalletFlowState`]. Every operation
//! replaces the state under a single lock, so observers never see a half
//! applied mutation, and then notifies the `watch` channel and the
//! subscribed listeners.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use rpc_types::{
    TimelineEvent, WalletFlowEvent, WalletFlowEventTone, WalletFlowPhase, WalletFlowSnapshot,
    WalletFlowState,
};
use runtime::constants::EVENT_HISTORY_LIMIT;
use runtime::utils::{unix_now_millis, PoisonedLockExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

type Listener = Arc<dyn Fn(&WalletFlowState) + Send + Sync>;

/// Shared handle to the flow state. Clones point at the same state.
#[derive(Clone)]
pub struct WalletFlowStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: Mutex<StoreState>,
    listeners: Mutex<BTreeMap<u64, Listener>>,
    next_listener_id: AtomicU64,
    watch_tx: watch::Sender<WalletFlowState>,
    event_history_limit: usize,
}

struct StoreState {
    view: WalletFlowState,
    // survives `reset` so timestamps never go backwards
    last_timestamp: u64,
}

impl StoreState {
    fn push_event(&mut self, limit: usize, label: impl Into<String>, tone: WalletFlowEventTone) {
        let timestamp = unix_now_millis()
            .unwrap_or_default()
            .max(self.last_timestamp);
        self.last_timestamp = timestamp;

        let events = &mut self.view.events;
        events.push(WalletFlowEvent {
            id: hex::encode(rand::random::<[u8; 8]>()),
            timestamp,
            label: label.into(),
            tone,
        });
        if events.len() > limit {
            let excess = events.len() - limit;
            events.drain(..excess);
        }
    }

    fn start_flow(&mut self, limit: usize, snapshot: WalletFlowSnapshot) {
        let view = &mut self.view;
        view.snapshot = snapshot.clone();
        view.phase = WalletFlowPhase::Initiated;
        view.is_animating = true;
        view.is_hydrated = true;
        view.has_error = false;
        view.error_message = None;
        view.timeline_version += 1;
        view.last_event = Some(TimelineEvent::Start { snapshot });
        self.push_event(limit, "Transaction initiated", WalletFlowEventTone::Info);
    }

    fn set_phase(&mut self, limit: usize, phase: WalletFlowPhase) -> bool {
        if self.view.phase == phase {
            return false;
        }
        self.view.phase = phase;
        self.view.last_event = Some(TimelineEvent::Phase { phase });
        self.push_event(limit, phase_label(phase), phase_tone(phase));
        true
    }

    fn update_balances(&mut self, limit: usize, snapshot: WalletFlowSnapshot) {
        let view = &mut self.view;
        view.snapshot = snapshot.clone();
        view.is_hydrated = true;
        view.has_error = false;
        view.error_message = None;
        view.last_event = Some(TimelineEvent::Balances { snapshot });
        self.push_event(limit, "Balances refreshed", WalletFlowEventTone::Info);
    }

    fn complete_flow(&mut self, limit: usize, snapshot: WalletFlowSnapshot) {
        let view = &mut self.view;
        view.snapshot = snapshot.clone();
        view.phase = WalletFlowPhase::Settled;
        view.is_animating = false;
        view.is_hydrated = true;
        view.has_error = false;
        view.error_message = None;
        view.last_event = Some(TimelineEvent::Complete { snapshot });
        self.push_event(
            limit,
            "Transaction settled successfully",
            WalletFlowEventTone::Success,
        );
    }

    fn fail_flow(&mut self, limit: usize, message: Option<&str>) {
        let view = &mut self.view;
        view.phase = WalletFlowPhase::Failed;
        view.is_animating = false;
        view.is_hydrated = true;
        view.timeline_version += 1;
        view.last_event = Some(TimelineEvent::Error {
            message: message.map(str::to_owned),
        });
        self.push_event(
            limit,
            message.unwrap_or("Transaction failed"),
            WalletFlowEventTone::Error,
        );
    }
}

fn phase_label(phase: WalletFlowPhase) -> &'static str {
    match phase {
        WalletFlowPhase::Holding => "Authorization approved",
        WalletFlowPhase::Releasing => "Deliverables under review",
        WalletFlowPhase::Settled => "Funds released to seller",
        WalletFlowPhase::Failed => "Transaction failed",
        WalletFlowPhase::Idle | WalletFlowPhase::Initiated => "Flow updated",
    }
}

fn phase_tone(phase: WalletFlowPhase) -> WalletFlowEventTone {
    match phase {
        WalletFlowPhase::Failed => WalletFlowEventTone::Error,
        WalletFlowPhase::Settled => WalletFlowEventTone::Success,
        _ => WalletFlowEventTone::Info,
    }
}

impl Default for WalletFlowStore {
    fn default() -> Self {
        Self::new(EVENT_HISTORY_LIMIT)
    }
}

impl WalletFlowStore {
    pub fn new(event_history_limit: usize) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    view: WalletFlowState::default(),
                    last_timestamp: 0,
                }),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener_id: AtomicU64::new(0),
                watch_tx: watch::Sender::new(WalletFlowState::default()),
                event_history_limit,
            }),
        }
    }

    /// Applies `mutation` atomically. The mutation returns `false` to signal
    /// that nothing changed, in which case observers are not notified.
    ///
    /// With a `guard`, the mutation is dropped if the token is cancelled by
    /// the time the lock is held.
    fn update(
        &self,
        guard: Option<&CancellationToken>,
        mutation: impl FnOnce(&mut StoreState, usize) -> bool,
    ) {
        let next = {
            let mut state = self.inner.state.ensure_lock();
            if guard.is_some_and(CancellationToken::is_cancelled) {
                return;
            }
            if !mutation(&mut state, self.inner.event_history_limit) {
                return;
            }
            state.view.update_index += 1;
            let next = state.view.clone();
            // sent under the lock so the channel never goes back in time
            self.inner.watch_tx.send_replace(next.clone());
            next
        };
        self.notify(&next);
    }

    fn notify(&self, state: &WalletFlowState) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .ensure_lock()
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(state);
        }
    }

    /// Writer whose changes are discarded once `token` is cancelled.
    pub fn guarded<'a>(&'a self, token: &'a CancellationToken) -> FlowWriter<'a> {
        FlowWriter { store: self, token }
    }

    /// Begins a new flow instance from `snapshot`.
    pub fn start_flow(&self, snapshot: WalletFlowSnapshot) {
        self.update(None, |state, limit| {
            state.start_flow(limit, snapshot);
            true
        });
    }

    /// Moves to `phase`, logging exactly one event. No-op if already there.
    pub fn set_phase(&self, phase: WalletFlowPhase) {
        self.update(None, |state, limit| state.set_phase(limit, phase));
    }

    /// Adopts fresh balances without touching the phase.
    pub fn update_balances(&self, snapshot: WalletFlowSnapshot) {
        self.update(None, |state, limit| {
            state.update_balances(limit, snapshot);
            true
        });
    }

    pub fn complete_flow(&self, snapshot: WalletFlowSnapshot) {
        self.update(None, |state, limit| {
            state.complete_flow(limit, snapshot);
            true
        });
    }

    /// Ends the current flow instance as failed. Balances are kept.
    pub fn fail_flow(&self, message: Option<&str>) {
        self.update(None, |state, limit| {
            state.fail_flow(limit, message);
            true
        });
    }

    /// Back to `idle` with an empty log. The last known balances stay
    /// visible.
    pub fn reset(&self) {
        self.update(None, |state, _| {
            let view = &mut state.view;
            view.phase = WalletFlowPhase::Idle;
            view.is_animating = false;
            view.has_error = false;
            view.error_message = None;
            view.timeline_version += 1;
            view.events.clear();
            view.last_event = None;
            true
        });
    }

    pub fn set_hydrated(&self) {
        self.update(None, |state, _| {
            let changed = !state.view.is_hydrated;
            state.view.is_hydrated = true;
            changed
        });
    }

    /// Raises the standalone error flag, independent of any flow.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(None, |state, _| {
            state.view.has_error = true;
            state.view.error_message = Some(message);
            state.view.is_hydrated = true;
            true
        });
    }

    /// Appends narration to the activity log, leaving phase and balances
    /// alone.
    pub fn log_event(&self, label: impl Into<String>, tone: WalletFlowEventTone) {
        let label = label.into();
        self.update(None, |state, limit| {
            state.push_event(limit, label, tone);
            true
        });
    }

    pub fn state(&self) -> WalletFlowState {
        self.inner.state.ensure_lock().view.clone()
    }

    pub fn phase(&self) -> WalletFlowPhase {
        self.inner.state.ensure_lock().view.phase
    }

    pub fn snapshot(&self) -> WalletFlowSnapshot {
        self.inner.state.ensure_lock().view.snapshot.clone()
    }

    pub fn timeline_version(&self) -> u64 {
        self.inner.state.ensure_lock().view.timeline_version
    }

    /// The `n` most recent activity events, oldest first.
    pub fn events(&self, n: usize) -> Vec<WalletFlowEvent> {
        self.inner.state.ensure_lock().view.recent_events(n).to_vec()
    }

    /// Receiver that always holds the latest state.
    pub fn watch(&self) -> watch::Receiver<WalletFlowState> {
        self.inner.watch_tx.subscribe()
    }

    /// Calls `listener` with the new state after every change, until the
    /// returned [`Subscription`] is dropped.
    ///
    /// Listeners run on the thread that applied the change, after the state
    /// lock is released. Concurrent changes may reach a listener out of
    /// order; compare `update_index` to discard stale states.
    pub fn subscribe(
        &self,
        listener: impl Fn(&WalletFlowState) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .ensure_lock()
            .insert(id, Arc::new(listener));
        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }
}

/// Keeps a listener attached to a [`WalletFlowStore`].
#[must_use = "dropping the subscription detaches the listener"]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.listeners.ensure_lock().remove(&self.id);
        }
    }
}

/// Store handle of a single flow instance, see [`WalletFlowStore::guarded`].
///
/// Cancellation is checked while the store lock is held. A canceller that
/// resets the store after cancelling therefore never sees a write from this
/// flow land after the reset.
pub struct FlowWriter<'a> {
    store: &'a WalletFlowStore,
    token: &'a CancellationToken,
}

impl FlowWriter<'_> {
    pub fn set_phase(&self, phase: WalletFlowPhase) {
        self.store
            .update(Some(self.token), |state, limit| state.set_phase(limit, phase));
    }

    pub fn update_balances(&self, snapshot: WalletFlowSnapshot) {
        self.store.update(Some(self.token), |state, limit| {
            state.update_balances(limit, snapshot);
            true
        });
    }

    pub fn complete_flow(&self, snapshot: WalletFlowSnapshot) {
        self.store.update(Some(self.token), |state, limit| {
            state.complete_flow(limit, snapshot);
            true
        });
    }

    pub fn fail_flow(&self, message: Option<&str>) {
        self.store.update(Some(self.token), |state, limit| {
            state.fail_flow(limit, message);
            true
        });
    }

    pub fn log_event(&self, label: impl Into<String>, tone: WalletFlowEventTone) {
        let label = label.into();
        self.store.update(Some(self.token), |state, limit| {
            state.push_event(limit, label, tone);
            true
        });
    }
}
