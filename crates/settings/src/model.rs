use keycombo::Combo;
use serde::{Deserialize, Serialize};

use crate::DEFAULT_OVERLAY;

/// One persisted shortcut: `{keyCode, modifierMask, enabled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeySpec {
    /// Key and modifiers.
    #[serde(flatten)]
    pub combo: Combo,
    /// Whether the shortcut should be registered at all.
    pub enabled: bool,
}

impl HotkeySpec {
    /// An enabled spec for `combo`.
    pub const fn enabled(combo: Combo) -> Self {
        Self {
            combo,
            enabled: true,
        }
    }

    /// The combo, if this spec is enabled.
    pub fn active_combo(&self) -> Option<Combo> {
        self.enabled.then_some(self.combo)
    }
}

/// Hotkey section of the host settings document.
///
/// Missing fields take their defaults; an explicit `null` leaves that slot
/// unconfigured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HotkeySettings {
    /// Primary panel toggle.
    pub toggle_primary: Option<HotkeySpec>,
    /// Secondary panel toggle.
    pub toggle_fallback: Option<HotkeySpec>,
    /// Global quick-add shortcut.
    pub quick_add_global: Option<HotkeySpec>,
    /// Overlay toggle; the only shortcut that may fall back to the input tap.
    pub overlay: Option<HotkeySpec>,
    /// Allow the overlay shortcut to fall back to the input tap.
    pub compatibility_mode: bool,
}

impl HotkeySettings {
    /// The overlay combo to arm, if configured and enabled.
    pub fn overlay_combo(&self) -> Option<Combo> {
        self.overlay.and_then(|s| s.active_combo())
    }

    /// Replace the overlay combo with the built-in default, keeping it enabled.
    pub fn revert_overlay(&mut self) {
        self.overlay = Some(HotkeySpec::enabled(DEFAULT_OVERLAY));
    }
}

#[cfg(test)]
mod tests {
    use keycombo::{Modifiers, keys};
    use serde_json::json;

    use super::*;
    use crate::{DEFAULT_PANEL_FALLBACK, DEFAULT_PANEL_PRIMARY};

    #[test]
    fn defaults() {
        let s = HotkeySettings::default();
        assert_eq!(s.toggle_primary.map(|h| h.combo), Some(DEFAULT_PANEL_PRIMARY));
        assert_eq!(s.toggle_fallback.map(|h| h.combo), Some(DEFAULT_PANEL_FALLBACK));
        assert_eq!(s.quick_add_global, None);
        assert_eq!(s.overlay_combo(), Some(DEFAULT_OVERLAY));
        assert!(!s.compatibility_mode);
        assert_eq!(DEFAULT_OVERLAY.label(), "⌘⇧M");
        assert_eq!(DEFAULT_PANEL_FALLBACK.label(), "⌘⌥Space");
    }

    #[test]
    fn on_disk_shape() {
        let s = HotkeySettings {
            toggle_primary: None,
            toggle_fallback: None,
            quick_add_global: Some(HotkeySpec {
                combo: Combo::new(keys::N, Modifiers::COMMAND | Modifiers::SHIFT),
                enabled: false,
            }),
            overlay: Some(HotkeySpec::enabled(DEFAULT_OVERLAY)),
            compatibility_mode: true,
        };
        let v = serde_json::to_value(&s).expect("serialize");
        assert_eq!(
            v,
            json!({
                "togglePrimary": null,
                "toggleFallback": null,
                "quickAddGlobal": {"keyCode": 45, "modifierMask": 768, "enabled": false},
                "overlay": {"keyCode": 46, "modifierMask": 768, "enabled": true},
                "compatibilityMode": true,
            })
        );
        let back: HotkeySettings = serde_json::from_value(v).expect("deserialize");
        assert_eq!(back, s);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let s: HotkeySettings =
            serde_json::from_value(json!({"compatibilityMode": true})).expect("deserialize");
        assert!(s.compatibility_mode);
        assert_eq!(s.overlay_combo(), Some(DEFAULT_OVERLAY));
        assert_eq!(s.toggle_primary, HotkeySettings::default().toggle_primary);
    }

    #[test]
    fn disabled_overlay_has_no_combo() {
        let mut s = HotkeySettings::default();
        s.overlay = Some(HotkeySpec {
            combo: DEFAULT_OVERLAY,
            enabled: false,
        });
        assert_eq!(s.overlay_combo(), None);
        s.revert_overlay();
        assert_eq!(s.overlay_combo(), Some(DEFAULT_OVERLAY));
    }
}
