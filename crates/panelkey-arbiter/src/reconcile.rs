//! Bring the arbitrator in line with the persisted settings.

use settings::{DEFAULT_OVERLAY, HotkeySettings, SettingsStore};
use tracing::{info, warn};

use crate::{Arbitrator, Result, SlotId, StartError, Strategy};

/// What happened during one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Registry-only slots that could not be claimed.
    pub slot_failures: Vec<(SlotId, StartError)>,
    /// Outcome for the configured overlay combo; `None` when the overlay is
    /// disabled or unset.
    pub overlay: Option<Result<Strategy>>,
    /// Outcome of the retry with the built-in default, when the configured
    /// overlay combo failed and was reverted.
    pub reverted: Option<Result<Strategy>>,
}

impl ReconcileReport {
    /// Whether every configured shortcut came up as requested.
    pub fn is_clean(&self) -> bool {
        self.slot_failures.is_empty()
            && self.reverted.is_none()
            && !matches!(self.overlay, Some(Err(_)))
    }

    /// Every failure worth surfacing to the user, in the order it happened.
    pub fn failures(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .slot_failures
            .iter()
            .map(|(slot, e)| format!("{slot}: {e}"))
            .collect();
        if let Some(Err(e)) = &self.overlay {
            out.push(format!("{}: {e}", SlotId::Overlay));
        }
        if let Some(Err(e)) = &self.reverted {
            out.push(format!("{} (default {DEFAULT_OVERLAY}): {e}", SlotId::Overlay));
        }
        out
    }
}

/// Applies settings from a store to an [`Arbitrator`], reverting a failing
/// overlay combo to the built-in default.
pub struct Reconciler<S> {
    /// Settings source and sink.
    store: S,
}

impl<S: SettingsStore> Reconciler<S> {
    /// Reconcile against `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the settings and apply them. Returns the applied (possibly
    /// reverted) settings alongside the report.
    pub fn reconcile(
        &self,
        arb: &mut Arbitrator,
    ) -> settings::Result<(HotkeySettings, ReconcileReport)> {
        let mut settings = self.store.load()?;
        let report = self.apply(arb, &mut settings);
        Ok((settings, report))
    }

    /// Apply `settings`.
    ///
    /// The overlay is stopped before the compatibility flag changes so the
    /// flag never triggers a retry with a stale combo. Every old claim is
    /// released before any new one is made, so combos can move between
    /// slots. When the overlay combo
    /// fails even after fallback, it is replaced by the default in `settings`
    /// and in the store, and started again.
    pub fn apply(&self, arb: &mut Arbitrator, settings: &mut HotkeySettings) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        arb.stop();
        arb.release_slots();
        arb.enable_compatibility_mode(settings.compatibility_mode);

        let slots = [
            (SlotId::PanelPrimary, settings.toggle_primary),
            (SlotId::PanelFallback, settings.toggle_fallback),
            (SlotId::QuickAdd, settings.quick_add_global),
        ];
        for (slot, spec) in slots {
            let (combo, enabled) = match spec {
                Some(s) => (Some(s.combo), s.enabled),
                None => (None, false),
            };
            if let Err(e) = arb.apply_slot(slot, combo, enabled) {
                report.slot_failures.push((slot, e));
            }
        }

        let Some(combo) = settings.overlay_combo() else {
            return report;
        };
        let first = arb.start(combo, Strategy::ExclusiveRegistry);
        let failed = first.is_err();
        report.overlay = Some(first);
        if failed && combo != DEFAULT_OVERLAY {
            warn!(combo = %combo, default = %DEFAULT_OVERLAY, "overlay_reverting_to_default");
            settings.revert_overlay();
            self.store.save(settings);
            report.reverted = Some(arb.start(DEFAULT_OVERLAY, Strategy::ExclusiveRegistry));
        }
        info!(status = %arb.current_status(), "reconciled");
        report
    }
}
