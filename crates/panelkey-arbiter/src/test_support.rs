//! In-process backend doubles for driving an [`Arbitrator`] without the OS.
//! Public so integration tests and embedders can use them.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use crossbeam_channel::{Sender, unbounded};
use keycombo::{Combo, Modifiers};
use mac_hotkey::{Activation, policy};
use parking_lot::Mutex;

use crate::{Arbitrator, RegistryApi, StrategyError, TapApi};

/// Mutable state behind [`MockRegistry`].
#[derive(Default)]
struct RegistryState {
    /// id → claimed combo.
    live: HashMap<u32, Combo>,
    /// Combos owned by "another application".
    occupied: HashSet<Combo>,
    /// Combos that fail with an OS error.
    broken: HashMap<Combo, String>,
    /// Every `register` call, successful or not.
    attempts: Vec<(u32, Combo)>,
}

/// Exclusive registry double.
///
/// Claims conflict with [`Self::occupy`]-ed combos and with each other, like
/// the real registry does for two listeners in one process.
pub struct MockRegistry {
    /// Activation queue shared with the arbitrator.
    tx: Sender<Activation>,
    /// Claims and scripted failures.
    state: Mutex<RegistryState>,
}

impl MockRegistry {
    /// A registry that queues presses onto `tx`.
    pub fn new(tx: Sender<Activation>) -> Self {
        Self {
            tx,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Make `combo` owned by someone else.
    pub fn occupy(&self, combo: Combo) {
        self.state.lock().occupied.insert(combo);
    }

    /// Release a combo taken with [`Self::occupy`].
    pub fn vacate(&self, combo: Combo) {
        self.state.lock().occupied.remove(&combo);
    }

    /// Make `combo` fail with an unexpected OS error.
    pub fn break_combo(&self, combo: Combo, message: &str) {
        self.state.lock().broken.insert(combo, message.to_string());
    }

    /// Live claims, sorted by id.
    pub fn live(&self) -> Vec<(u32, Combo)> {
        let mut v: Vec<_> = self.state.lock().live.iter().map(|(i, c)| (*i, *c)).collect();
        v.sort_by_key(|(i, _)| *i);
        v
    }

    /// Number of live claims.
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Every `register` call so far.
    pub fn attempts(&self) -> Vec<(u32, Combo)> {
        self.state.lock().attempts.clone()
    }

    /// Simulate a physical press of `combo`. Queues an activation when some
    /// id holds it and returns whether one did.
    pub fn press(&self, combo: Combo) -> bool {
        let id = self
            .state
            .lock()
            .live
            .iter()
            .find(|(_, c)| **c == combo)
            .map(|(i, _)| *i);
        match id {
            Some(id) => self.tx.send(Activation::HotKey(id)).is_ok(),
            None => false,
        }
    }
}

impl RegistryApi for MockRegistry {
    fn register(&self, id: u32, combo: Combo) -> Result<(), StrategyError> {
        let mut st = self.state.lock();
        st.attempts.push((id, combo));
        st.live.remove(&id);
        if let Some(msg) = st.broken.get(&combo) {
            return Err(StrategyError::Os(msg.clone()));
        }
        if st.occupied.contains(&combo) || st.live.values().any(|c| *c == combo) {
            return Err(StrategyError::Conflict);
        }
        st.live.insert(id, combo);
        Ok(())
    }

    fn unregister(&self, id: u32) {
        self.state.lock().live.remove(&id);
    }
}

/// Input tap double.
pub struct MockTap {
    /// Activation queue shared with the arbitrator.
    tx: Sender<Activation>,
    /// Whether the permission is granted.
    authorized: AtomicBool,
    /// Whether a request grants the permission.
    grant_on_request: AtomicBool,
    /// Number of authorization requests.
    requests: AtomicUsize,
    /// Armed combo while running.
    armed: Mutex<Option<Combo>>,
}

impl MockTap {
    /// An unauthorized, stopped tap that queues matches onto `tx`.
    pub fn new(tx: Sender<Activation>) -> Self {
        Self {
            tx,
            authorized: AtomicBool::new(false),
            grant_on_request: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            armed: Mutex::new(None),
        }
    }

    /// Grant or revoke the permission.
    pub fn set_authorized(&self, on: bool) {
        self.authorized.store(on, Ordering::SeqCst);
    }

    /// Whether the next [`TapApi::request_authorization`] grants the permission.
    pub fn grant_on_request(&self, on: bool) {
        self.grant_on_request.store(on, Ordering::SeqCst);
    }

    /// Number of authorization requests so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Combo the tap is armed with.
    pub fn armed(&self) -> Option<Combo> {
        *self.armed.lock()
    }

    /// Simulate a key-down with `held` modifiers. Queues an activation and
    /// returns true when the event would be consumed.
    pub fn key_down(&self, key_code: u32, held: Modifiers) -> bool {
        let decision = policy::classify(self.armed(), key_code, held, false);
        if decision.emit && self.tx.send(Activation::Tap).is_err() {
            return false;
        }
        decision.consume
    }
}

impl TapApi for MockTap {
    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    fn request_authorization(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.grant_on_request.load(Ordering::SeqCst) {
            self.set_authorized(true);
        }
        self.is_authorized()
    }

    fn start(&self, combo: Combo) -> Result<(), StrategyError> {
        if !self.is_authorized() {
            return Err(StrategyError::PermissionDenied);
        }
        *self.armed.lock() = Some(combo);
        Ok(())
    }

    fn stop(&self) {
        self.armed.lock().take();
    }
}

/// An arbitrator wired to fresh doubles sharing one activation queue.
pub fn mock_arbitrator() -> (Arbitrator, Arc<MockRegistry>, Arc<MockTap>) {
    let (tx, rx) = unbounded();
    let registry = Arc::new(MockRegistry::new(tx.clone()));
    let tap = Arc::new(MockTap::new(tx));
    let arb = Arbitrator::new(registry.clone(), tap.clone(), rx);
    (arb, registry, tap)
}
