// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Gamepad controls and input events.
//!
//! `Button`, `Stick` and `Direction` name the logical controls of the emulated gamepad.
//! `InputEvent` is what the device layer feeds into
//! [`StateStore::handle_event`](crate::StateStore::handle_event). Raw input
//! reports can be turned into events with `InputEvent::from_raw_keyboard` and
//! `InputEvent::from_raw_mouse`.

use crate::keycode::KeyCode;

/// Digital button of the emulated gamepad.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum Button {
    // Action pad
    A,
    B,
    X,
    Y,
    // Shoulders
    LeftShoulder,
    RightShoulder,
    // Triggers. These are analog on a real gamepad, here they are either released or fully
    // pressed.
    LeftTrigger,
    RightTrigger,
    // Menu pad
    Start,
    Back,
    // D-Pad
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    // Sticks
    LeftThumb,
    RightThumb,
}

impl Button {
    pub const COUNT: usize = 16;

    pub const ALL: [Button; Button::COUNT] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::LeftShoulder,
        Button::RightShoulder,
        Button::LeftTrigger,
        Button::RightTrigger,
        Button::Start,
        Button::Back,
        Button::DPadUp,
        Button::DPadDown,
        Button::DPadLeft,
        Button::DPadRight,
        Button::LeftThumb,
        Button::RightThumb,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_trigger(self) -> bool {
        matches!(self, Button::LeftTrigger | Button::RightTrigger)
    }
}

/// Analog stick.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum Stick {
    Left,
    Right,
}

impl Stick {
    pub const ALL: [Stick; 2] = [Stick::Left, Stick::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Button generated by pressing this stick.
    pub fn thumb_button(self) -> Button {
        match self {
            Stick::Left => Button::LeftThumb,
            Stick::Right => Button::RightThumb,
        }
    }
}

/// One of four directions of a stick driven by keys.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

/// Input delivered by the device layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Key or mouse button changed state.
    Key { code: KeyCode, pressed: bool },
    /// Relative mouse motion in device units.
    MouseMove { dx: i32, dy: i32 },
}

// RAWKEYBOARD.Flags
const RI_KEY_BREAK: u16 = 0x01;
// RAWMOUSE.usFlags
const MOUSE_MOVE_ABSOLUTE: u16 = 0x01;

// RAWMOUSE.usButtonFlags, (down, up, key) for every button
const MOUSE_BUTTONS: [(u16, u16, KeyCode); 5] = [
    (0x0001, 0x0002, KeyCode::LBUTTON),
    (0x0004, 0x0008, KeyCode::RBUTTON),
    (0x0010, 0x0020, KeyCode::MBUTTON),
    (0x0040, 0x0080, KeyCode::XBUTTON1),
    (0x0100, 0x0200, KeyCode::XBUTTON2),
];

impl InputEvent {
    /// Decodes keyboard report. Returns `None` for reports that do not carry a usable virtual key:
    /// `0xFF` is sent for parts of longer make-code sequences and codes above `0xFF` are outside
    /// of supported alphabet.
    pub fn from_raw_keyboard(vkey: u16, flags: u16) -> Option<InputEvent> {
        if vkey >= 0xFF {
            trace!("Ignoring keyboard report with virtual key {:#x}", vkey);
            return None;
        }

        Some(InputEvent::Key {
            code: KeyCode(vkey as u8),
            pressed: flags & RI_KEY_BREAK == 0,
        })
    }

    /// Decodes mouse report into button transitions followed by motion. For each button, press
    /// comes before release when both are reported at once. Absolute motion is not supported and
    /// is dropped.
    pub fn from_raw_mouse(flags: u16, button_flags: u16, last_x: i32, last_y: i32) -> Vec<InputEvent> {
        let mut events = Vec::new();

        for &(down, up, code) in MOUSE_BUTTONS.iter() {
            if button_flags & down != 0 {
                events.push(InputEvent::Key { code, pressed: true });
            }
            if button_flags & up != 0 {
                events.push(InputEvent::Key { code, pressed: false });
            }
        }

        if flags & MOUSE_MOVE_ABSOLUTE != 0 {
            debug!("Mouse reported absolute coordinates, not supported");
        } else if last_x != 0 || last_y != 0 {
            events.push(InputEvent::MouseMove { dx: last_x, dy: last_y });
        }

        events
    }
}
