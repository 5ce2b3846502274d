//! Per-event decisions for the input tap: whether a key-down fires the
//! armed combo and whether it is swallowed.
use keycombo::{Combo, Modifiers};

/// What the tap should do with one key-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Queue an activation for the main context.
    pub emit: bool,
    /// Swallow the event so no other app sees it.
    pub consume: bool,
}

impl Decision {
    /// Leave the event alone.
    pub const PASS: Self = Self {
        emit: false,
        consume: false,
    };
    /// Fire and swallow.
    pub const FIRE: Self = Self {
        emit: true,
        consume: true,
    };
}

/// Classify how the tap should handle a key-down.
///
/// - Events posted by this process are never matched.
/// - With no armed combo, nothing is emitted or consumed.
/// - A match (equal key code, held mask containing the combo mask) is emitted
///   and consumed; everything else passes through untouched.
pub fn classify(armed: Option<Combo>, key_code: u32, held: Modifiers, own_event: bool) -> Decision {
    if own_event {
        return Decision::PASS;
    }
    match armed {
        Some(combo) if combo.matches(key_code, held) => Decision::FIRE,
        _ => Decision::PASS,
    }
}

#[cfg(test)]
mod tests {
    use keycombo::keys;
    use proptest::prelude::*;

    use super::*;

    fn cmd_opt_space() -> Option<Combo> {
        Some(Combo::new(
            keys::SPACE,
            Modifiers::COMMAND | Modifiers::OPTION,
        ))
    }

    #[test]
    fn unarmed_passes_everything() {
        let d = classify(None, keys::SPACE, Modifiers::all(), false);
        assert_eq!(d, Decision::PASS);
    }

    #[test]
    fn extra_modifiers_still_match() {
        let held = Modifiers::COMMAND | Modifiers::OPTION | Modifiers::SHIFT;
        assert_eq!(
            classify(cmd_opt_space(), keys::SPACE, held, false),
            Decision::FIRE
        );
    }

    #[test]
    fn missing_modifier_passes() {
        assert_eq!(
            classify(cmd_opt_space(), keys::SPACE, Modifiers::COMMAND, false),
            Decision::PASS
        );
    }

    #[test]
    fn wrong_key_passes() {
        let held = Modifiers::COMMAND | Modifiers::OPTION;
        assert_eq!(classify(cmd_opt_space(), keys::N, held, false), Decision::PASS);
    }

    #[test]
    fn own_events_are_ignored() {
        let held = Modifiers::COMMAND | Modifiers::OPTION;
        assert_eq!(
            classify(cmd_opt_space(), keys::SPACE, held, true),
            Decision::PASS
        );
    }

    proptest! {
        #[test]
        fn fires_iff_mask_contains_combo(
            key in 0u32..128,
            event_key in 0u32..128,
            combo_bits in 0u32..16,
            held_bits in 0u32..16,
        ) {
            // Spread 4 bits over the four modifier flags.
            let spread = |b: u32| {
                let all = [
                    Modifiers::COMMAND,
                    Modifiers::SHIFT,
                    Modifiers::OPTION,
                    Modifiers::CONTROL,
                ];
                all.iter()
                    .enumerate()
                    .filter(|(i, _)| b & (1 << i) != 0)
                    .fold(Modifiers::empty(), |acc, (_, m)| acc | *m)
            };
            let combo = Combo::new(key, spread(combo_bits));
            let held = spread(held_bits);
            let d = classify(Some(combo), event_key, held, false);
            let expect = key == event_key && (held & combo.modifiers) == combo.modifiers;
            prop_assert_eq!(d.emit, expect);
            prop_assert_eq!(d.consume, expect);
        }
    }
}
