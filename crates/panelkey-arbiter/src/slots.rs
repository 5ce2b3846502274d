//! Hotkey slots and the registry-backed bindings that serve them.

use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
    sync::Arc,
    time::Instant,
};

use keycombo::Combo;
use tracing::{debug, trace, warn};

use crate::{StrategyError, deps::RegistryApi};

/// Threshold for warning about slow registry calls.
const BIND_WARN_MS: u128 = 10;

/// One independently configurable shortcut. The discriminant is the opaque
/// id handed to the exclusive registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotId {
    /// Primary panel toggle.
    PanelPrimary = 1,
    /// Secondary panel toggle.
    PanelFallback = 2,
    /// Global quick add.
    QuickAdd = 3,
    /// Overlay toggle, the only slot with strategy fallback.
    Overlay = 4,
}

impl SlotId {
    /// Every slot in id order.
    pub const ALL: [Self; 4] = [
        Self::PanelPrimary,
        Self::PanelFallback,
        Self::QuickAdd,
        Self::Overlay,
    ];

    /// Registry id.
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Slot for a registry id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// The action this slot fires.
    pub const fn action(self) -> SlotAction {
        match self {
            Self::PanelPrimary | Self::PanelFallback => SlotAction::TogglePanel,
            Self::QuickAdd => SlotAction::QuickAdd,
            Self::Overlay => SlotAction::ToggleOverlay,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PanelPrimary => "panel-primary",
            Self::PanelFallback => "panel-fallback",
            Self::QuickAdd => "quick-add",
            Self::Overlay => "overlay",
        })
    }
}

/// What a slot does when it fires. Each action has its own debounce gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotAction {
    /// Show or hide the panel.
    TogglePanel,
    /// Open the quick-add composer.
    QuickAdd,
    /// Show or hide the overlay.
    ToggleOverlay,
}

impl SlotAction {
    /// Stable name used on the command line and in logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TogglePanel => "toggle-panel",
            Self::QuickAdd => "quick-add",
            Self::ToggleOverlay => "toggle-overlay",
        }
    }
}

impl fmt::Display for SlotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SlotAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::TogglePanel, Self::QuickAdd, Self::ToggleOverlay]
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| format!("unknown action: {s}"))
    }
}

/// Live exclusive-registry claims, at most one per slot.
pub struct SlotBindings {
    /// Registry backend.
    api: Arc<dyn RegistryApi>,
    /// Slot → combo currently claimed for it.
    live: BTreeMap<SlotId, Combo>,
}

impl SlotBindings {
    /// Empty bindings over `api`.
    pub fn new(api: Arc<dyn RegistryApi>) -> Self {
        Self {
            api,
            live: BTreeMap::new(),
        }
    }

    /// Claim `combo` for `slot`, releasing the slot's prior claim first.
    ///
    /// On failure the slot is left unbound.
    pub fn bind(&mut self, slot: SlotId, combo: Combo) -> Result<(), StrategyError> {
        self.unbind(slot);
        let start = Instant::now();
        let res = self.api.register(slot.id(), combo);
        let ms = start.elapsed().as_millis();
        if ms > BIND_WARN_MS {
            warn!(%slot, ms, "slow_registry_call");
        }
        match &res {
            Ok(()) => {
                debug!(%slot, combo = %combo, "slot_bound");
                self.live.insert(slot, combo);
            }
            Err(e) => debug!(%slot, combo = %combo, error = %e, "slot_bind_failed"),
        }
        res
    }

    /// Release the claim held for `slot`, if any.
    pub fn unbind(&mut self, slot: SlotId) {
        if let Some(combo) = self.live.remove(&slot) {
            self.api.unregister(slot.id());
            trace!(%slot, combo = %combo, "slot_unbound");
        }
    }

    /// Whether `slot` holds a claim.
    pub fn is_bound(&self, slot: SlotId) -> bool {
        self.live.contains_key(&slot)
    }

    /// Release every claim whose slot matches `pred`, all before returning.
    pub fn unbind_where(&mut self, pred: impl Fn(SlotId) -> bool) {
        let slots: Vec<SlotId> = self.live.keys().copied().filter(|s| pred(*s)).collect();
        for slot in slots {
            self.unbind(slot);
        }
    }

    /// Whether no slot holds a claim.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Current claims in slot order.
    pub fn snapshot(&self) -> Vec<(SlotId, Combo)> {
        self.live.iter().map(|(s, c)| (*s, *c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_and_share_toggle() {
        for s in SlotId::ALL {
            assert_eq!(SlotId::from_id(s.id()), Some(s));
        }
        assert_eq!(SlotId::from_id(0), None);
        assert_eq!(SlotId::from_id(5), None);
        assert_eq!(SlotId::PanelPrimary.action(), SlotId::PanelFallback.action());
        assert_eq!(SlotId::Overlay.id(), 4);
    }

    #[test]
    fn action_names_parse() {
        for a in [
            SlotAction::TogglePanel,
            SlotAction::QuickAdd,
            SlotAction::ToggleOverlay,
        ] {
            assert_eq!(a.name().parse::<SlotAction>(), Ok(a));
        }
        assert!("toggle".parse::<SlotAction>().is_err());
    }
}
