use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::{Modifiers, key_label};

/// A combo was rejected before any OS interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidCombo {
    /// A bare key with no modifier would capture ordinary typing.
    #[error("combo {0} has no modifier")]
    NoModifier(Combo),
}

/// A physical key plus the modifiers held with it.
///
/// Equality is structural. A `Combo` with an empty mask is a valid value;
/// [`Combo::validate`] is what rejects it at the point a user supplies one for
/// registration.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combo {
    /// Platform virtual key code.
    pub key_code: u32,
    /// Held modifiers, persisted as the raw Carbon mask.
    #[serde(rename = "modifierMask", with = "mask_bits")]
    pub modifiers: Modifiers,
}

impl Combo {
    /// Build a combo from a key code and modifier mask.
    pub const fn new(key_code: u32, modifiers: Modifiers) -> Self {
        Self {
            key_code,
            modifiers,
        }
    }

    /// Build a combo from persisted integers. Unknown mask bits are dropped.
    pub const fn from_raw(key_code: u32, modifier_mask: u32) -> Self {
        Self::new(key_code, Modifiers::from_bits_truncate(modifier_mask))
    }

    /// Check that the combo may be handed to the OS for registration.
    pub fn validate(&self) -> Result<(), InvalidCombo> {
        if self.modifiers.is_empty() {
            return Err(InvalidCombo::NoModifier(*self));
        }
        Ok(())
    }

    /// Does a key-down with `key_code` and `held` trigger this combo?
    ///
    /// Matching uses mask containment: extra held modifiers do not prevent a
    /// match, missing required ones do.
    pub fn matches(&self, key_code: u32, held: Modifiers) -> bool {
        self.key_code == key_code && held.contains_all(self.modifiers)
    }

    /// Modifier symbols followed by the key label, e.g. `⌘⌥Space`.
    pub fn label(&self) -> String {
        let mut s = self.modifiers.symbols();
        s.push_str(&key_label(self.key_code));
        s
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Serialize `Modifiers` as its raw integer mask.
mod mask_bits {
    use super::*;

    /// Write the raw bits.
    pub fn serialize<S: Serializer>(m: &Modifiers, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(m.bits())
    }

    /// Read raw bits, dropping any we do not model.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Modifiers, D::Error> {
        let bits = u32::deserialize(d)?;
        Ok(Modifiers::from_bits_truncate(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;

    #[test]
    fn bare_key_is_rejected() {
        let c = Combo::new(keys::SPACE, Modifiers::empty());
        assert_eq!(c.validate(), Err(InvalidCombo::NoModifier(c)));
        let ok = Combo::new(keys::SPACE, Modifiers::OPTION);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn labels() {
        let cases = [
            (
                Combo::new(keys::SPACE, Modifiers::COMMAND | Modifiers::OPTION),
                "⌘⌥Space",
            ),
            (Combo::new(keys::SPACE, Modifiers::OPTION), "⌥Space"),
            (
                Combo::new(keys::N, Modifiers::COMMAND | Modifiers::SHIFT),
                "⌘⇧N",
            ),
            (
                Combo::new(keys::RETURN, Modifiers::CONTROL | Modifiers::SHIFT),
                "⇧⌃↩",
            ),
            (Combo::new(0x60, Modifiers::CONTROL), "⌃Key(96)"),
        ];
        for (combo, want) in cases {
            assert_eq!(combo.label(), want);
            assert_eq!(combo.to_string(), want);
        }
    }

    #[test]
    fn modifiers_precede_key_in_label() {
        let label = Combo::new(keys::SPACE, Modifiers::COMMAND | Modifiers::OPTION).label();
        let cmd = label.find('⌘').expect("command symbol");
        let opt = label.find('⌥').expect("option symbol");
        let key = label.find("Space").expect("key name");
        assert!(cmd < key && opt < key);
    }

    #[test]
    fn containment_matching() {
        let combo = Combo::new(keys::SPACE, Modifiers::COMMAND | Modifiers::OPTION);
        let held = Modifiers::COMMAND | Modifiers::OPTION | Modifiers::SHIFT;
        assert!(combo.matches(keys::SPACE, held));
        assert!(!combo.matches(keys::SPACE, Modifiers::COMMAND));
        assert!(!combo.matches(keys::N, held));
    }

    #[test]
    fn persisted_shape() {
        let c = Combo::new(keys::SPACE, Modifiers::OPTION);
        let json = serde_json::to_value(c).expect("serialize");
        assert_eq!(json, serde_json::json!({"keyCode": 49, "modifierMask": 2048}));
        let back: Combo =
            serde_json::from_value(serde_json::json!({"keyCode": 46, "modifierMask": 768}))
                .expect("deserialize");
        assert_eq!(back, Combo::new(keys::M, Modifiers::COMMAND | Modifiers::SHIFT));
    }

    #[test]
    fn unknown_mask_bits_are_dropped() {
        let c = Combo::from_raw(keys::SPACE, Modifiers::OPTION.bits() | 1);
        assert_eq!(c.modifiers, Modifiers::OPTION);
    }
}
