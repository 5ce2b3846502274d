use keycombo::{Combo, Modifiers, keys};

use crate::{HotkeySettings, HotkeySpec};

/// ⌥Space: primary panel toggle.
pub const DEFAULT_PANEL_PRIMARY: Combo = Combo::new(keys::SPACE, Modifiers::OPTION);

/// ⌘⌥Space: secondary panel toggle for setups where ⌥Space is taken.
pub const DEFAULT_PANEL_FALLBACK: Combo = Combo::new(
    keys::SPACE,
    Modifiers::from_bits_truncate(Modifiers::COMMAND.bits() | Modifiers::OPTION.bits()),
);

/// ⌘⇧M: overlay toggle, and the known-good combo the overlay reverts to.
pub const DEFAULT_OVERLAY: Combo = Combo::new(
    keys::M,
    Modifiers::from_bits_truncate(Modifiers::COMMAND.bits() | Modifiers::SHIFT.bits()),
);

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            toggle_primary: Some(HotkeySpec::enabled(DEFAULT_PANEL_PRIMARY)),
            toggle_fallback: Some(HotkeySpec::enabled(DEFAULT_PANEL_FALLBACK)),
            quick_add_global: None,
            overlay: Some(HotkeySpec::enabled(DEFAULT_OVERLAY)),
            compatibility_mode: false,
        }
    }
}
