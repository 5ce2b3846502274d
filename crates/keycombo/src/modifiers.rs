use bitflags::bitflags;

bitflags! {
    /// Modifier keys that may be held for a combo.
    ///
    /// Bit values match the Carbon `cmdKey`/`shiftKey`/`optionKey`/`controlKey`
    /// constants, which is also the on-disk representation.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
    pub struct Modifiers: u32 {
        /// Command (⌘).
        const COMMAND = 1 << 8;
        /// Shift (⇧).
        const SHIFT = 1 << 9;
        /// Option / Alt (⌥).
        const OPTION = 1 << 11;
        /// Control (⌃).
        const CONTROL = 1 << 12;
    }
}

/// CGEventFlags bits for the four primary modifiers.
const CG_SHIFT: u64 = 1 << 17;
const CG_CONTROL: u64 = 1 << 18;
const CG_OPTION: u64 = 1 << 19;
const CG_COMMAND: u64 = 1 << 20;

/// Display order and symbol for each modifier.
const SYMBOLS: [(Modifiers, &str); 4] = [
    (Modifiers::COMMAND, "⌘"),
    (Modifiers::OPTION, "⌥"),
    (Modifiers::SHIFT, "⇧"),
    (Modifiers::CONTROL, "⌃"),
];

impl Modifiers {
    /// Construct a mask from macOS CGEventFlags bits.
    ///
    /// Only the primary matching bits are considered; device-dependent and
    /// lock bits (caps lock, fn, numeric pad) are ignored.
    pub fn from_cg_flags(flags: u64) -> Self {
        let mut m = Self::empty();
        if flags & CG_SHIFT != 0 {
            m |= Self::SHIFT;
        }
        if flags & CG_CONTROL != 0 {
            m |= Self::CONTROL;
        }
        if flags & CG_OPTION != 0 {
            m |= Self::OPTION;
        }
        if flags & CG_COMMAND != 0 {
            m |= Self::COMMAND;
        }
        m
    }

    /// True when every modifier in `required` is also held in `self`.
    ///
    /// Extra modifiers in `self` do not affect the result.
    pub fn contains_all(self, required: Self) -> bool {
        self & required == required
    }

    /// Symbols for the held modifiers in canonical order: ⌘ ⌥ ⇧ ⌃.
    pub fn symbols(self) -> String {
        SYMBOLS
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, s)| *s)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carbon_bit_layout() {
        assert_eq!(Modifiers::COMMAND.bits(), 256);
        assert_eq!(Modifiers::SHIFT.bits(), 512);
        assert_eq!(Modifiers::OPTION.bits(), 2048);
        assert_eq!(Modifiers::CONTROL.bits(), 4096);
    }

    #[test]
    fn cg_flags_map_to_mask() {
        let flags = (1 << 20) | (1 << 19) | (1 << 16);
        assert_eq!(
            Modifiers::from_cg_flags(flags),
            Modifiers::COMMAND | Modifiers::OPTION
        );
        assert_eq!(Modifiers::from_cg_flags(0), Modifiers::empty());
        assert_eq!(
            Modifiers::from_cg_flags((1 << 17) | (1 << 18)),
            Modifiers::SHIFT | Modifiers::CONTROL
        );
    }

    #[test]
    fn containment_ignores_extra_modifiers() {
        let required = Modifiers::COMMAND | Modifiers::OPTION;
        assert!((required | Modifiers::SHIFT).contains_all(required));
        assert!(required.contains_all(required));
        assert!(!Modifiers::COMMAND.contains_all(required));
    }

    #[test]
    fn symbols_in_canonical_order() {
        let all = Modifiers::all();
        assert_eq!(all.symbols(), "⌘⌥⇧⌃");
        assert_eq!((Modifiers::CONTROL | Modifiers::COMMAND).symbols(), "⌘⌃");
        assert_eq!(Modifiers::empty().symbols(), "");
    }
}
