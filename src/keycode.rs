// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Raw key codes.
//!
//! Every physical key and mouse button is identified by its Win32 virtual-key code. All keys the
//! emulator cares about fit in one byte, so the alphabet has at most 256 entries and can be used
//! directly as an array index.

use std::fmt::{self, Display, Formatter};

/// Win32 virtual-key code of a key or mouse button.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KeyCode(pub u8);

impl KeyCode {
    /// Sentinel meaning "not bound to anything".
    pub const UNBOUND: KeyCode = KeyCode(0xFF);

    pub const LBUTTON: KeyCode = KeyCode(0x01);
    pub const RBUTTON: KeyCode = KeyCode(0x02);
    pub const MBUTTON: KeyCode = KeyCode(0x04);
    pub const XBUTTON1: KeyCode = KeyCode(0x05);
    pub const XBUTTON2: KeyCode = KeyCode(0x06);

    /// Returns `true` unless this is the `UNBOUND` sentinel.
    pub fn is_bound(self) -> bool {
        self != Self::UNBOUND
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Parses key name as used in configuration files. Names are case-insensitive. Besides the
    /// names in the table below, single letters and digits, `F1`-`F24`, `Numpad0`-`Numpad9` and
    /// hexadecimal codes (`0x41`) are accepted.
    pub fn from_name(name: &str) -> Option<KeyCode> {
        let name = name.trim();
        let lower = name.to_ascii_lowercase();

        if lower.len() == 1 {
            let c = lower.as_bytes()[0];
            if c.is_ascii_lowercase() {
                return Some(KeyCode(c.to_ascii_uppercase()));
            }
            if c.is_ascii_digit() {
                return Some(KeyCode(c));
            }
        }

        if let Some(hex) = lower.strip_prefix("0x") {
            return u8::from_str_radix(hex, 16)
                .ok()
                .map(KeyCode)
                .filter(|code| code.is_bound());
        }

        if let Some(n) = numbered(&lower, "numpad", 0, 9) {
            return Some(KeyCode(0x60 + n));
        }

        if let Some(n) = numbered(&lower, "f", 1, 24) {
            return Some(KeyCode(0x70 + n - 1));
        }

        NAMED_KEYS
            .iter()
            .find(|&&(key_name, _)| key_name == lower)
            .map(|&(_, code)| KeyCode(code))
    }
}

fn numbered(name: &str, prefix: &str, min: u8, max: u8) -> Option<u8> {
    name.strip_prefix(prefix)
        .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|rest| rest.parse::<u8>().ok())
        .filter(|n| (min..=max).contains(n))
}

impl Default for KeyCode {
    fn default() -> Self {
        KeyCode::UNBOUND
    }
}

impl Display for KeyCode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.0 {
            0xFF => f.write_str("unbound"),
            c @ b'0'..=b'9' | c @ b'A'..=b'Z' => write!(f, "{}", c as char),
            c @ 0x60..=0x69 => write!(f, "Numpad{}", c - 0x60),
            c @ 0x70..=0x87 => write!(f, "F{}", c - 0x70 + 1),
            c => match DISPLAY_NAMES.iter().find(|&&(_, code)| code == c) {
                Some(&(name, _)) => f.write_str(name),
                None => write!(f, "0x{:02X}", c),
            },
        }
    }
}

// Lowercase lookup names. Aliases share a code.
static NAMED_KEYS: [(&str, u8); 74] = [
    ("lbutton", 0x01),
    ("mouseleft", 0x01),
    ("rbutton", 0x02),
    ("mouseright", 0x02),
    ("mbutton", 0x04),
    ("mousemiddle", 0x04),
    ("xbutton1", 0x05),
    ("mouse4", 0x05),
    ("xbutton2", 0x06),
    ("mouse5", 0x06),
    ("backspace", 0x08),
    ("tab", 0x09),
    ("enter", 0x0D),
    ("return", 0x0D),
    ("shift", 0x10),
    ("ctrl", 0x11),
    ("control", 0x11),
    ("alt", 0x12),
    ("pause", 0x13),
    ("capslock", 0x14),
    ("esc", 0x1B),
    ("escape", 0x1B),
    ("space", 0x20),
    ("pageup", 0x21),
    ("pagedown", 0x22),
    ("end", 0x23),
    ("home", 0x24),
    ("left", 0x25),
    ("up", 0x26),
    ("right", 0x27),
    ("down", 0x28),
    ("printscreen", 0x2C),
    ("insert", 0x2D),
    ("ins", 0x2D),
    ("delete", 0x2E),
    ("del", 0x2E),
    ("lwin", 0x5B),
    ("rwin", 0x5C),
    ("apps", 0x5D),
    ("multiply", 0x6A),
    ("add", 0x6B),
    ("separator", 0x6C),
    ("subtract", 0x6D),
    ("decimal", 0x6E),
    ("divide", 0x6F),
    ("numlock", 0x90),
    ("scrolllock", 0x91),
    ("lshift", 0xA0),
    ("rshift", 0xA1),
    ("lctrl", 0xA2),
    ("lcontrol", 0xA2),
    ("rctrl", 0xA3),
    ("rcontrol", 0xA3),
    ("lalt", 0xA4),
    ("ralt", 0xA5),
    ("semicolon", 0xBA),
    (";", 0xBA),
    ("equals", 0xBB),
    ("=", 0xBB),
    ("comma", 0xBC),
    (",", 0xBC),
    ("minus", 0xBD),
    ("-", 0xBD),
    ("period", 0xBE),
    (".", 0xBE),
    ("slash", 0xBF),
    ("/", 0xBF),
    ("backtick", 0xC0),
    ("`", 0xC0),
    ("lbracket", 0xDB),
    ("backslash", 0xDC),
    ("rbracket", 0xDD),
    ("apostrophe", 0xDE),
    ("'", 0xDE),
];

// Canonical spelling used by `Display`, one entry per code.
static DISPLAY_NAMES: [(&str, u8); 54] = [
    ("LButton", 0x01),
    ("RButton", 0x02),
    ("MButton", 0x04),
    ("XButton1", 0x05),
    ("XButton2", 0x06),
    ("Backspace", 0x08),
    ("Tab", 0x09),
    ("Enter", 0x0D),
    ("Shift", 0x10),
    ("Ctrl", 0x11),
    ("Alt", 0x12),
    ("Pause", 0x13),
    ("CapsLock", 0x14),
    ("Esc", 0x1B),
    ("Space", 0x20),
    ("PageUp", 0x21),
    ("PageDown", 0x22),
    ("End", 0x23),
    ("Home", 0x24),
    ("Left", 0x25),
    ("Up", 0x26),
    ("Right", 0x27),
    ("Down", 0x28),
    ("PrintScreen", 0x2C),
    ("Insert", 0x2D),
    ("Delete", 0x2E),
    ("LWin", 0x5B),
    ("RWin", 0x5C),
    ("Apps", 0x5D),
    ("Multiply", 0x6A),
    ("Add", 0x6B),
    ("Separator", 0x6C),
    ("Subtract", 0x6D),
    ("Decimal", 0x6E),
    ("Divide", 0x6F),
    ("NumLock", 0x90),
    ("ScrollLock", 0x91),
    ("LShift", 0xA0),
    ("RShift", 0xA1),
    ("LCtrl", 0xA2),
    ("RCtrl", 0xA3),
    ("LAlt", 0xA4),
    ("RAlt", 0xA5),
    ("Semicolon", 0xBA),
    ("Equals", 0xBB),
    ("Comma", 0xBC),
    ("Minus", 0xBD),
    ("Period", 0xBE),
    ("Slash", 0xBF),
    ("Backtick", 0xC0),
    ("LBracket", 0xDB),
    ("Backslash", 0xDC),
    ("RBracket", 0xDD),
    ("Apostrophe", 0xDE),
];
