// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! User profiles: which keys drive which gamepad controls.

use crate::ev::{Button, Direction, Stick};
use crate::keycode::KeyCode;

use fnv::FnvHashMap;

use std::sync::Arc;
use std::time::Duration;

/// Which input drives a stick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum StickMode {
    /// Four keys and fixed speed.
    #[default]
    Keyboard,
    /// Relative mouse motion.
    Mouse,
}

/// Stick driven by four direction keys.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KeyboardStick {
    pub up: KeyCode,
    pub down: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    /// Fraction of full deflection used when a direction is held. Range: [0, 1].
    pub speed: f32,
}

impl KeyboardStick {
    pub fn key(&self, dir: Direction) -> KeyCode {
        match dir {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }
}

impl Default for KeyboardStick {
    fn default() -> Self {
        KeyboardStick {
            up: KeyCode::UNBOUND,
            down: KeyCode::UNBOUND,
            left: KeyCode::UNBOUND,
            right: KeyCode::UNBOUND,
            speed: 1.0,
        }
    }
}

/// Stick driven by mouse motion.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct MouseStick {
    /// Motion (in device units per sample) that deflects the stick fully. Lower value means
    /// higher sensitivity.
    pub sensitivity: f32,
    /// Response curve exponent. 1.0 is linear, values below 1 make the center more sensitive.
    pub non_linear: f32,
    /// Range: [0, 1].
    pub deadzone: f32,
    /// How often (Hz) an idle mouse stick is checked and returned to the center.
    pub check_frequency: u32,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl MouseStick {
    /// Time between two idle checks.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.check_frequency.max(1)))
    }
}

impl Default for MouseStick {
    fn default() -> Self {
        MouseStick {
            sensitivity: 15.0,
            non_linear: 1.0,
            deadzone: 0.0,
            check_frequency: 75,
            invert_x: false,
            invert_y: false,
        }
    }
}

/// Stick configuration.
///
/// Settings of both modes are kept so switching `mode` back and forth does not lose previously
/// entered values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct StickConfig {
    pub mode: StickMode,
    pub keyboard: KeyboardStick,
    pub mouse: MouseStick,
}

/// Named set of bindings.
///
/// Profiles are built once (usually by [`Config`](crate::Config)) and then shared
/// immutably through `ProfileRegistry`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Profile {
    name: String,
    buttons: [KeyCode; Button::COUNT],
    sticks: [StickConfig; 2],
}

impl Profile {
    /// Creates profile with nothing bound.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Profile {
            name: name.into(),
            buttons: [KeyCode::UNBOUND; Button::COUNT],
            sticks: [StickConfig::default(); 2],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn button(&self, btn: Button) -> KeyCode {
        self.buttons[btn.index()]
    }

    pub fn stick(&self, stick: Stick) -> &StickConfig {
        &self.sticks[stick.index()]
    }

    /// Binds `btn` to `code`. Binding to `KeyCode::UNBOUND` clears it.
    pub fn with_button(mut self, btn: Button, code: KeyCode) -> Self {
        self.buttons[btn.index()] = code;
        self
    }

    /// Puts `stick` in keyboard mode with given settings. Mouse settings are kept. Speed is
    /// clamped to [0, 1].
    pub fn with_keyboard_stick(mut self, stick: Stick, mut kbd: KeyboardStick) -> Self {
        kbd.speed = clamp_unit(kbd.speed);
        let cfg = &mut self.sticks[stick.index()];
        cfg.mode = StickMode::Keyboard;
        cfg.keyboard = kbd;
        self
    }

    /// Puts `stick` in mouse mode with given settings. Keyboard settings are kept. Deadzone is
    /// clamped to [0, 1].
    pub fn with_mouse_stick(mut self, stick: Stick, mut mouse: MouseStick) -> Self {
        mouse.deadzone = clamp_unit(mouse.deadzone);
        let cfg = &mut self.sticks[stick.index()];
        cfg.mode = StickMode::Mouse;
        cfg.mouse = mouse;
        self
    }

    /// Changes active mode of `stick` without touching settings of either mode.
    pub fn with_stick_mode(mut self, stick: Stick, mode: StickMode) -> Self {
        self.sticks[stick.index()].mode = mode;
        self
    }

    /// Replaces whole stick configuration, e.g. one parsed from a file.
    pub(crate) fn with_stick_config(mut self, stick: Stick, mut cfg: StickConfig) -> Self {
        cfg.keyboard.speed = clamp_unit(cfg.keyboard.speed);
        cfg.mouse.deadzone = clamp_unit(cfg.mouse.deadzone);
        self.sticks[stick.index()] = cfg;
        self
    }
}

fn clamp_unit(val: f32) -> f32 {
    if val.is_nan() {
        0.0
    } else {
        val.clamp(0.0, 1.0)
    }
}

/// Profiles by name.
///
/// Slots bound to a profile keep their own `Arc`, so dropping or replacing the registry does not
/// invalidate them. Rebind slots after loading new registry to pick up changes.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: FnvHashMap<String, Arc<Profile>>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        ProfileRegistry::default()
    }

    /// Adds profile. Returns `false` and keeps the existing entry if profile with the same name
    /// is already registered.
    pub fn insert(&mut self, profile: Profile) -> bool {
        if self.profiles.contains_key(profile.name()) {
            return false;
        }

        self.profiles.insert(profile.name().to_owned(), Arc::new(profile));
        true
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Profile>> {
        self.profiles.get(name)
    }

    /// Names of all profiles, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
