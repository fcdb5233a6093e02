// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::ev::{Button, Stick};

/// Change token of a slot.
///
/// Epoch is increased every time state of a slot changes. It can wrap around, so the only
/// meaningful comparison is equality: different epoch means that something changed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Epoch(u32);

impl Epoch {
    pub(crate) fn inc(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// Raw value, e.g. for XInput's packet number.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Snapshot of emulated gamepad.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct GamepadState {
    // bit n is Button::ALL[n]
    buttons: u16,
    sticks: [(i16, i16); 2],
}

impl GamepadState {
    /// Released buttons and centered sticks.
    pub fn new() -> Self {
        GamepadState::default()
    }

    pub fn is_pressed(&self, btn: Button) -> bool {
        self.buttons & (1 << btn.index()) != 0
    }

    /// Returns `(x, y)` of `stick`. Positive x is right, positive y is up.
    pub fn stick(&self, stick: Stick) -> (i16, i16) {
        self.sticks[stick.index()]
    }

    pub(crate) fn set_btn(&mut self, btn: Button, pressed: bool) {
        if pressed {
            self.buttons |= 1 << btn.index();
        } else {
            self.buttons &= !(1 << btn.index());
        }
    }

    pub(crate) fn set_stick(&mut self, stick: Stick, axes: (i16, i16)) {
        self.sticks[stick.index()] = axes;
    }

    /// Converts to the layout returned by `XInputGetState`.
    pub fn to_xinput(&self) -> XInputGamepad {
        let mut buttons = 0;
        for &btn in Button::ALL.iter().filter(|btn| !btn.is_trigger()) {
            if self.is_pressed(btn) {
                buttons |= xinput_mask(btn);
            }
        }

        let trigger = |btn| if self.is_pressed(btn) { 255 } else { 0 };
        let (thumb_lx, thumb_ly) = self.stick(Stick::Left);
        let (thumb_rx, thumb_ry) = self.stick(Stick::Right);

        XInputGamepad {
            buttons,
            left_trigger: trigger(Button::LeftTrigger),
            right_trigger: trigger(Button::RightTrigger),
            thumb_lx,
            thumb_ly,
            thumb_rx,
            thumb_ry,
        }
    }
}

pub mod xinput_buttons {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;
}

fn xinput_mask(btn: Button) -> u16 {
    use self::xinput_buttons::*;

    match btn {
        Button::A => A,
        Button::B => B,
        Button::X => X,
        Button::Y => Y,
        Button::LeftShoulder => LEFT_SHOULDER,
        Button::RightShoulder => RIGHT_SHOULDER,
        // Not part of the mask, reported as trigger values
        Button::LeftTrigger | Button::RightTrigger => 0,
        Button::Start => START,
        Button::Back => BACK,
        Button::DPadUp => DPAD_UP,
        Button::DPadDown => DPAD_DOWN,
        Button::DPadLeft => DPAD_LEFT,
        Button::DPadRight => DPAD_RIGHT,
        Button::LeftThumb => LEFT_THUMB,
        Button::RightThumb => RIGHT_THUMB,
    }
}

/// Same layout as `XINPUT_GAMEPAD`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct XInputGamepad {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

/// Same layout as `XINPUT_STATE`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct XInputState {
    pub packet_number: u32,
    pub gamepad: XInputGamepad,
}
