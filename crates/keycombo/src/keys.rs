//! macOS virtual key codes and their display labels.

use std::borrow::Cow;

// One table drives both the named constants and the label lookup.
// Extend this list to give more keys a readable label.
macro_rules! key_table {
    ( $( $(#[$meta:meta])* $name:ident = $code:literal => $label:literal, )* ) => {
        $(
            $(#[$meta])*
            pub const $name: u32 = $code;
        )*

        fn known_label(code: u32) -> Option<&'static str> {
            match code {
                $( $code => Some($label), )*
                _ => None,
            }
        }
    };
}

key_table! {
    /// `kVK_ANSI_A`
    A = 0x00 => "A",
    /// `kVK_ANSI_S`
    S = 0x01 => "S",
    /// `kVK_ANSI_D`
    D = 0x02 => "D",
    /// `kVK_ANSI_F`
    F = 0x03 => "F",
    /// `kVK_ANSI_H`
    H = 0x04 => "H",
    /// `kVK_ANSI_G`
    G = 0x05 => "G",
    /// `kVK_ANSI_Z`
    Z = 0x06 => "Z",
    /// `kVK_ANSI_X`
    X = 0x07 => "X",
    /// `kVK_ANSI_C`
    C = 0x08 => "C",
    /// `kVK_ANSI_V`
    V = 0x09 => "V",
    /// `kVK_ANSI_B`
    B = 0x0B => "B",
    /// `kVK_ANSI_Q`
    Q = 0x0C => "Q",
    /// `kVK_ANSI_W`
    W = 0x0D => "W",
    /// `kVK_ANSI_E`
    E = 0x0E => "E",
    /// `kVK_ANSI_R`
    R = 0x0F => "R",
    /// `kVK_ANSI_Y`
    Y = 0x10 => "Y",
    /// `kVK_ANSI_T`
    T = 0x11 => "T",
    /// `kVK_ANSI_1`
    DIGIT1 = 0x12 => "1",
    /// `kVK_ANSI_2`
    DIGIT2 = 0x13 => "2",
    /// `kVK_ANSI_3`
    DIGIT3 = 0x14 => "3",
    /// `kVK_ANSI_4`
    DIGIT4 = 0x15 => "4",
    /// `kVK_ANSI_6`
    DIGIT6 = 0x16 => "6",
    /// `kVK_ANSI_5`
    DIGIT5 = 0x17 => "5",
    /// `kVK_ANSI_9`
    DIGIT9 = 0x19 => "9",
    /// `kVK_ANSI_7`
    DIGIT7 = 0x1A => "7",
    /// `kVK_ANSI_8`
    DIGIT8 = 0x1C => "8",
    /// `kVK_ANSI_0`
    DIGIT0 = 0x1D => "0",
    /// `kVK_ANSI_O`
    O = 0x1F => "O",
    /// `kVK_ANSI_U`
    U = 0x20 => "U",
    /// `kVK_ANSI_I`
    I = 0x22 => "I",
    /// `kVK_ANSI_P`
    P = 0x23 => "P",
    /// `kVK_Return`
    RETURN = 0x24 => "↩",
    /// `kVK_ANSI_L`
    L = 0x25 => "L",
    /// `kVK_ANSI_J`
    J = 0x26 => "J",
    /// `kVK_ANSI_K`
    K = 0x28 => "K",
    /// `kVK_ANSI_N`
    N = 0x2D => "N",
    /// `kVK_ANSI_M`
    M = 0x2E => "M",
    /// `kVK_Tab`
    TAB = 0x30 => "⇥",
    /// `kVK_Space`
    SPACE = 0x31 => "Space",
    /// `kVK_Delete`
    DELETE = 0x33 => "⌫",
    /// `kVK_Escape`
    ESCAPE = 0x35 => "⎋",
}

/// Human-readable label for a key code.
///
/// Known keys use the fixed table above; anything else renders as
/// `Key(<code>)`.
pub fn key_label(code: u32) -> Cow<'static, str> {
    match known_label(code) {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(format!("Key({code})")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_labels() {
        let cases = [
            (SPACE, "Space"),
            (RETURN, "↩"),
            (ESCAPE, "⎋"),
            (TAB, "⇥"),
            (DELETE, "⌫"),
            (DIGIT1, "1"),
            (DIGIT6, "6"),
            (DIGIT0, "0"),
            (N, "N"),
            (M, "M"),
            (A, "A"),
        ];
        for (code, want) in cases {
            assert_eq!(key_label(code), want, "code {code}");
        }
    }

    #[test]
    fn unmapped_codes_fall_back() {
        assert_eq!(key_label(0x7A), "Key(122)");
        assert_eq!(key_label(9999), "Key(9999)");
    }
}
