//! Panelkey arbitration core.
//!
//! [`Arbitrator`] owns every live OS claim the process holds for its global
//! shortcuts and is the only thing that changes them:
//! - the registry-only slots (panel toggles, quick add), one exclusive claim each
//! - the overlay shortcut, which may fall back from the exclusive registry to
//!   the input tap when compatibility mode is on
//!
//! It runs on one sequencing context. OS callbacks never reach it directly:
//! they queue [`Activation`]s that [`Arbitrator::pump`] drains, and each
//! action then passes its own [`Debouncer`] before its trigger runs. Status
//! changes of the overlay shortcut are broadcast in order through a
//! [`StatusChannel`].
//!
//! The OS backends sit behind [`RegistryApi`] and [`TapApi`]; the doubles in
//! [`test_support`] let everything here run without touching the OS.
use std::{collections::HashMap, sync::Arc, time::Instant};

use crossbeam_channel::Receiver;
use keycombo::Combo;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace, warn};

mod debounce;
mod deps;
mod error;
mod reconcile;
mod slots;
mod status;
pub mod test_support;

pub use debounce::{DEBOUNCE_WINDOW, Debouncer};
#[cfg(target_os = "macos")]
pub use deps::{MacRegistry, MacTap, mac_backends};
pub use deps::{RegistryApi, TapApi};
pub use error::{Result, StartError, StrategyError};
pub use mac_hotkey::Activation;
pub use reconcile::{ReconcileReport, Reconciler};
pub use slots::{SlotAction, SlotId};
pub use status::{Status, StatusChannel, Strategy, Tone};

use slots::SlotBindings;

/// Bound action callback.
type Trigger = Box<dyn FnMut() + Send>;

/// Owner of the process's global shortcut claims.
pub struct Arbitrator {
    /// Registry claims, one per slot.
    bindings: SlotBindings,
    /// Input tap backend.
    tap: Arc<dyn TapApi>,
    /// Combo the input tap is armed with, while running.
    tap_combo: Option<Combo>,
    /// Queue filled by the OS callbacks.
    activations: Receiver<Activation>,
    /// Overlay status broadcast.
    status: StatusChannel,
    /// Whether the overlay may fall back to the input tap.
    compat: bool,
    /// Last requested overlay combo and preferred strategy.
    overlay: Option<(Combo, Strategy)>,
    /// Last requested combo for each registry-only slot.
    requested: HashMap<SlotId, Combo>,
    /// Bound action callbacks.
    triggers: HashMap<SlotAction, Trigger>,
    /// One debounce gate per action.
    gates: HashMap<SlotAction, Debouncer>,
}

impl Arbitrator {
    /// Create an idle arbitrator over the given backends.
    ///
    /// `activations` must be the queue both backends push onto.
    pub fn new(
        registry: Arc<dyn RegistryApi>,
        tap: Arc<dyn TapApi>,
        activations: Receiver<Activation>,
    ) -> Self {
        Self {
            bindings: SlotBindings::new(registry),
            tap,
            tap_combo: None,
            activations,
            status: StatusChannel::default(),
            compat: false,
            overlay: None,
            requested: HashMap::new(),
            triggers: HashMap::new(),
            gates: HashMap::new(),
        }
    }

    // ---- Overlay lifecycle ----

    /// Arm the overlay shortcut with `combo`, trying `preferred` first.
    ///
    /// A combo without modifiers is rejected before anything else happens;
    /// the previous claim and status are left as they were. Otherwise any
    /// overlay claim is released first, then:
    /// - registry success is `Active(ExclusiveRegistry)`
    /// - a registry conflict is `Conflict`, followed by an input tap attempt
    ///   only when compatibility mode is on
    /// - an input tap without permission is `PermissionDenied`
    ///
    /// Every failure returns a typed error after the status is updated.
    pub fn start(&mut self, combo: Combo, preferred: Strategy) -> Result<Strategy> {
        combo.validate()?;
        self.release_overlay();
        self.status.set(Status::Inactive);
        self.overlay = Some((combo, preferred));
        self.arm_overlay(combo, preferred, false)
    }

    /// Release the overlay claim, whichever strategy holds it, and go
    /// `Inactive`. Idempotent.
    pub fn stop(&mut self) {
        self.overlay = None;
        self.release_overlay();
        self.status.set(Status::Inactive);
    }

    /// Toggle compatibility mode.
    ///
    /// Turning it on while in `Conflict` retries the overlay with the input
    /// tap; turning it off while the tap is active retries the exclusive
    /// registry. Otherwise only the flag changes. Returns the outcome of the
    /// retry, if one happened.
    pub fn enable_compatibility_mode(&mut self, on: bool) -> Option<Result<Strategy>> {
        let was = self.compat;
        self.compat = on;
        if was != on {
            info!(on, "compatibility_mode");
        }
        let (combo, _) = self.overlay?;
        let retry = match (self.status.get(), on) {
            (Status::Conflict, true) => Strategy::InputTap,
            (Status::Active(Strategy::InputTap), false) => Strategy::ExclusiveRegistry,
            _ => return None,
        };
        debug!(?retry, combo = %combo, "compatibility_retry");
        self.release_overlay();
        self.status.set(Status::Inactive);
        Some(self.arm_overlay(combo, retry, false))
    }

    /// Whether compatibility mode is on.
    pub fn compatibility_mode(&self) -> bool {
        self.compat
    }

    /// Try the strategies for an already-released overlay slot.
    ///
    /// A `quiet` attempt publishes only the final status and logs its
    /// failures at debug.
    fn arm_overlay(&mut self, combo: Combo, preferred: Strategy, quiet: bool) -> Result<Strategy> {
        if preferred == Strategy::ExclusiveRegistry {
            match self.bindings.bind(SlotId::Overlay, combo) {
                Ok(()) => {
                    info!(combo = %combo, "overlay_active_registry");
                    self.status.set(Status::Active(Strategy::ExclusiveRegistry));
                    return Ok(Strategy::ExclusiveRegistry);
                }
                Err(StrategyError::Conflict) if !self.compat => {
                    return Err(self.fail(StrategyError::Conflict, quiet));
                }
                Err(StrategyError::Conflict) => {
                    if !quiet {
                        self.status.set(Status::Conflict);
                    }
                    debug!(combo = %combo, "overlay_conflict_falling_back");
                }
                Err(e) => return Err(self.fail(e, quiet)),
            }
        }

        match self.tap.start(combo) {
            Ok(()) => {
                self.tap_combo = Some(combo);
                info!(combo = %combo, "overlay_active_tap");
                self.status.set(Status::Active(Strategy::InputTap));
                Ok(Strategy::InputTap)
            }
            Err(e) => Err(self.fail(e, quiet)),
        }
    }

    /// Publish the status for a failed attempt and convert it.
    fn fail(&mut self, e: StrategyError, quiet: bool) -> StartError {
        if quiet {
            debug!(error = %e, "overlay_still_unavailable");
        } else {
            warn!(error = %e, "overlay_start_failed");
        }
        let status = match &e {
            StrategyError::Conflict => Status::Conflict,
            StrategyError::PermissionDenied => Status::PermissionDenied,
            StrategyError::Os(m) => Status::Error(m.clone()),
        };
        self.status.set(status);
        e.into()
    }

    /// Release both overlay strategies, registry first.
    fn release_overlay(&mut self) {
        self.bindings.unbind(SlotId::Overlay);
        if self.tap_combo.take().is_some() {
            self.tap.stop();
            trace!("overlay_tap_stopped");
        }
    }

    // ---- Registry-only slots ----

    /// Configure one slot.
    ///
    /// The slot's prior claim is always released. A disabled or empty slot
    /// stays unbound. Otherwise the combo is validated and claimed; a failure
    /// leaves the slot unbound and is returned without touching the status.
    /// The overlay slot is routed through [`Self::start`] / [`Self::stop`].
    pub fn apply_slot(&mut self, slot: SlotId, combo: Option<Combo>, enabled: bool) -> Result<()> {
        let combo = combo.filter(|_| enabled);
        if slot == SlotId::Overlay {
            return match combo {
                Some(c) => self.start(c, Strategy::ExclusiveRegistry).map(|_| ()),
                None => {
                    self.stop();
                    Ok(())
                }
            };
        }

        self.bindings.unbind(slot);
        let Some(combo) = combo else {
            self.requested.remove(&slot);
            return Ok(());
        };
        combo.validate()?;
        self.requested.insert(slot, combo);
        self.bindings.bind(slot, combo).map_err(|e| {
            warn!(%slot, combo = %combo, error = %e, "slot_registration_failed");
            StartError::from(e)
        })
    }

    /// Release every registry-only slot, leaving the overlay alone.
    ///
    /// Callers replacing several slots at once release first so that a combo
    /// moving between slots never conflicts with our own earlier claim.
    pub fn release_slots(&mut self) {
        self.bindings.unbind_where(|slot| slot != SlotId::Overlay);
        self.requested.clear();
    }

    /// Re-apply the last requested configuration when nothing is armed.
    ///
    /// A retry publishes only a changed outcome: an overlay that is still
    /// taken stays `Conflict` without passing through `Inactive` again.
    /// Returns whether a re-arm was attempted.
    pub fn ensure_armed(&mut self) -> bool {
        if !self.bindings.is_empty() || self.tap_combo.is_some() {
            return false;
        }
        if self.requested.is_empty() && self.overlay.is_none() {
            return false;
        }
        trace!("rearming_hotkeys");
        let mut requested: Vec<_> = self.requested.iter().map(|(s, c)| (*s, *c)).collect();
        requested.sort_by_key(|(slot, _)| *slot);
        for (slot, combo) in requested {
            match self.bindings.bind(slot, combo) {
                Ok(()) => info!(%slot, combo = %combo, "slot_rearmed"),
                Err(e) => trace!(%slot, error = %e, "rearm_slot_failed"),
            }
        }
        if let Some((combo, preferred)) = self.overlay
            && self.arm_overlay(combo, preferred, true).is_ok()
        {
            debug!(combo = %combo, "overlay_rearmed");
        }
        true
    }

    // ---- Status ----

    /// Current overlay status.
    pub fn current_status(&self) -> Status {
        self.status.get().clone()
    }

    /// Subscribe to overlay status; the current value arrives first.
    pub fn subscribe(&mut self) -> UnboundedReceiver<Status> {
        self.status.subscribe()
    }

    // ---- Triggers ----

    /// Bind the callback for `action`, replacing any previous one.
    pub fn set_trigger(&mut self, action: SlotAction, f: impl FnMut() + Send + 'static) {
        self.triggers.insert(action, Box::new(f));
    }

    /// Run the trigger for `action` once, bypassing OS capture and debounce.
    /// Returns whether a trigger was bound.
    pub fn fire_for_test(&mut self, action: SlotAction) -> bool {
        match self.triggers.get_mut(&action) {
            Some(f) => {
                debug!(%action, "fire_for_test");
                f();
                true
            }
            None => false,
        }
    }

    /// Route one activation that arrived at `now` to its action, through the
    /// action's debounce gate. Returns whether a trigger ran.
    pub fn dispatch_at(&mut self, activation: Activation, now: Instant) -> bool {
        let action = match activation {
            Activation::HotKey(id) => match SlotId::from_id(id) {
                Some(slot) if self.bindings.is_bound(slot) => slot.action(),
                _ => {
                    trace!(id, "stale_hotkey_activation");
                    return false;
                }
            },
            Activation::Tap if self.tap_combo.is_some() => SlotAction::ToggleOverlay,
            Activation::Tap => {
                trace!("stale_tap_activation");
                return false;
            }
        };
        let gate = self.gates.entry(action).or_default();
        let triggers = &mut self.triggers;
        let mut ran = false;
        let admitted = gate.fire_at(now, || {
            if let Some(f) = triggers.get_mut(&action) {
                debug!(%action, "trigger");
                f();
                ran = true;
            }
        });
        if !admitted {
            trace!(%action, "debounced");
        } else if !ran {
            trace!(%action, "no_trigger_bound");
        }
        ran
    }

    /// Drain queued activations. Returns how many triggers ran.
    pub fn pump(&mut self) -> usize {
        let pending: Vec<Activation> = self.activations.try_iter().collect();
        pending
            .into_iter()
            .filter(|a| self.dispatch_at(*a, Instant::now()))
            .count()
    }

    // ---- Permissions ----

    /// Whether the input tap may run.
    pub fn tap_authorized(&self) -> bool {
        self.tap.is_authorized()
    }

    /// Ask the OS for the input tap permission. The grant may arrive later;
    /// call [`Self::enable_compatibility_mode`] or [`Self::start`] again then.
    pub fn request_tap_authorization(&self) -> bool {
        self.tap.request_authorization()
    }

    // ---- Introspection ----

    /// Registry claims currently held, in slot order.
    pub fn bindings_snapshot(&self) -> Vec<(SlotId, Combo)> {
        self.bindings.snapshot()
    }

    /// Combo the input tap is armed with.
    pub fn tap_combo(&self) -> Option<Combo> {
        self.tap_combo
    }

    /// Overlay combo last passed to [`Self::start`], until [`Self::stop`].
    pub fn overlay_combo(&self) -> Option<Combo> {
        self.overlay.map(|(c, _)| c)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use keycombo::{Modifiers, keys};

    use super::*;
    use crate::test_support::mock_arbitrator;

    fn cmd_opt_space() -> Combo {
        Combo::new(keys::SPACE, Modifiers::COMMAND | Modifiers::OPTION)
    }

    #[test]
    fn stale_activations_are_ignored() {
        let (mut arb, _reg, _tap) = mock_arbitrator();
        let n = Arc::new(AtomicUsize::new(0));
        let n2 = n.clone();
        arb.set_trigger(SlotAction::ToggleOverlay, move || {
            n2.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!arb.dispatch_at(Activation::HotKey(SlotId::Overlay.id()), Instant::now()));
        assert!(!arb.dispatch_at(Activation::Tap, Instant::now()));
        assert!(!arb.dispatch_at(Activation::HotKey(99), Instant::now()));
        assert_eq!(n.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fire_for_test_bypasses_debounce() {
        let (mut arb, _reg, _tap) = mock_arbitrator();
        let n = Arc::new(AtomicUsize::new(0));
        let n2 = n.clone();
        arb.set_trigger(SlotAction::QuickAdd, move || {
            n2.fetch_add(1, Ordering::SeqCst);
        });
        assert!(arb.fire_for_test(SlotAction::QuickAdd));
        assert!(arb.fire_for_test(SlotAction::QuickAdd));
        assert!(!arb.fire_for_test(SlotAction::TogglePanel));
        assert_eq!(n.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn overlay_slot_routes_through_start() {
        let (mut arb, reg, _tap) = mock_arbitrator();
        arb.apply_slot(SlotId::Overlay, Some(cmd_opt_space()), true)
            .expect("overlay");
        assert_eq!(
            arb.current_status(),
            Status::Active(Strategy::ExclusiveRegistry)
        );
        arb.apply_slot(SlotId::Overlay, Some(cmd_opt_space()), false)
            .expect("disable");
        assert_eq!(arb.current_status(), Status::Inactive);
        assert_eq!(reg.live_count(), 0);
    }
}
