//! keycombo: key combinations for global hotkeys.
//!
//! - `Combo`: a physical key code plus a `Modifiers` mask. Immutable once
//!   built; replaced wholesale on reconfiguration.
//! - `Modifiers`: the command/option/shift/control bit-set. Bits use the
//!   Carbon modifier layout so persisted masks can be handed to the OS as-is.
//! - `key_label` / `Combo::label`: deterministic human-readable labels.
//!
//! Key codes are macOS virtual key codes (the `kVK_*` values from HIToolbox);
//! `keys` names the ones the application cares about.

mod combo;
pub mod keys;
mod modifiers;

pub use combo::{Combo, InvalidCombo};
pub use keys::key_label;
pub use modifiers::Modifiers;
