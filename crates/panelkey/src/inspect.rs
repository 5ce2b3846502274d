//! Read-only commands: `status` and `format`.

use std::path::Path;

use keycombo::Combo;
use panelkey_arbiter::SlotId;
use permissions::PermissionsStatus;
use serde_json::json;
use settings::{HotkeySettings, HotkeySpec, JsonStore, SettingsStore};

use crate::Error;

/// Settings at `path`, without seeding a missing document.
pub fn read_settings(path: &Path) -> Result<HotkeySettings, Error> {
    if !path.exists() {
        return Ok(HotkeySettings::default());
    }
    Ok(JsonStore::new(path).load()?)
}

/// One slot's configured spec.
fn slot_spec(s: &HotkeySettings, slot: SlotId) -> Option<HotkeySpec> {
    match slot {
        SlotId::PanelPrimary => s.toggle_primary,
        SlotId::PanelFallback => s.toggle_fallback,
        SlotId::QuickAdd => s.quick_add_global,
        SlotId::Overlay => s.overlay,
    }
}

fn granted(ok: bool) -> &'static str {
    if ok { "granted" } else { "missing" }
}

/// Human-readable status report.
pub fn render_status(perms: &PermissionsStatus, s: &HotkeySettings) -> String {
    let mut lines = vec![
        format!("Input Monitoring:   {}", granted(perms.input_ok)),
        format!("Accessibility:      {}", granted(perms.accessibility_ok)),
        format!(
            "Compatibility mode: {}",
            if s.compatibility_mode { "on" } else { "off" }
        ),
    ];
    for slot in SlotId::ALL {
        let desc = match slot_spec(s, slot) {
            None => "(unset)".to_string(),
            Some(spec) if spec.enabled => spec.combo.label(),
            Some(spec) => format!("{} (disabled)", spec.combo.label()),
        };
        lines.push(format!("{:<15} {}", slot.to_string(), desc));
    }
    lines.join("\n") + "\n"
}

/// `status` command.
pub fn status(path: &Path, as_json: bool) -> Result<(), Error> {
    let s = read_settings(path)?;
    let perms = permissions::check_permissions();
    if as_json {
        let doc = json!({ "permissions": perms, "settings": s });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", render_status(&perms, &s));
    }
    Ok(())
}

/// Label for a raw combo, with a note when it could not be registered.
pub fn render_format(key_code: u32, modifier_mask: u32) -> String {
    let combo = Combo::from_raw(key_code, modifier_mask);
    match combo.validate() {
        Ok(()) => combo.label(),
        Err(e) => format!("{} ({e})", combo.label()),
    }
}
