// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Lookup tables translating raw key codes into gamepad controls.

use crate::ev::{Button, Direction, Stick};
use crate::keycode::KeyCode;
use crate::profile::{Profile, StickMode};

/// Gamepad control a key code is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Control {
    #[default]
    Unbound,
    Button(Button),
    Stick(Stick, Direction),
}

/// Directions of a keyboard stick that are currently held down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeldDirections {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldDirections {
    pub(crate) fn set(&mut self, dir: Direction, held: bool) {
        match dir {
            Direction::Up => self.up = held,
            Direction::Down => self.down = held,
            Direction::Left => self.left = held,
            Direction::Right => self.right = held,
        }
    }

    /// Axis values for stick deflected by `val` in every held direction. Opposite directions
    /// cancel each other.
    pub fn axes(&self, val: i16) -> (i16, i16) {
        let axis = |pos: bool, neg: bool| match (pos, neg) {
            (true, false) => val,
            (false, true) => -val,
            _ => 0,
        };

        (axis(self.right, self.left), axis(self.up, self.down))
    }
}

/// Per slot translation table derived from a `Profile`.
///
/// Indexed directly by `KeyCode`. Each code maps to at most one control.
#[derive(Clone)]
pub struct TranslationTable {
    controls: [Control; 256],
    modes: [StickMode; 2],
    held: [HeldDirections; 2],
}

impl TranslationTable {
    /// Table with every code unbound.
    pub fn empty() -> Self {
        TranslationTable {
            controls: [Control::Unbound; 256],
            modes: [StickMode::Keyboard; 2],
            held: [HeldDirections::default(); 2],
        }
    }

    /// Builds table for `profile`. Buttons are registered first, then directions of sticks in
    /// keyboard mode. If the same code is bound more than once, the last registration wins.
    pub fn build(profile: &Profile) -> Self {
        let mut table = TranslationTable::empty();

        for &btn in Button::ALL.iter() {
            table.register(profile.button(btn), Control::Button(btn));
        }

        for &stick in Stick::ALL.iter() {
            let cfg = profile.stick(stick);
            table.modes[stick.index()] = cfg.mode;

            if cfg.mode == StickMode::Keyboard {
                for &dir in Direction::ALL.iter() {
                    table.register(cfg.keyboard.key(dir), Control::Stick(stick, dir));
                }
            }
        }

        table
    }

    fn register(&mut self, code: KeyCode, control: Control) {
        if !code.is_bound() {
            return;
        }

        let entry = &mut self.controls[code.index()];
        if *entry != Control::Unbound {
            trace!("{} bound to both {:?} and {:?}, using the latter", code, entry, control);
        }
        *entry = control;
    }

    /// Returns control bound to `code`. `KeyCode::UNBOUND` always maps to `Control::Unbound`.
    pub fn lookup(&self, code: KeyCode) -> Control {
        self.controls[code.index()]
    }

    pub fn stick_mode(&self, stick: Stick) -> StickMode {
        self.modes[stick.index()]
    }

    pub fn held(&self, stick: Stick) -> &HeldDirections {
        &self.held[stick.index()]
    }

    pub(crate) fn held_mut(&mut self, stick: Stick) -> &mut HeldDirections {
        &mut self.held[stick.index()]
    }

    /// Returns `true` if any stick is driven by the mouse.
    pub fn uses_mouse(&self) -> bool {
        self.modes.contains(&StickMode::Mouse)
    }

    /// Iterates over all bound codes.
    pub fn bindings(&self) -> impl Iterator<Item = (KeyCode, Control)> + '_ {
        self.controls
            .iter()
            .enumerate()
            .filter(|&(_, control)| *control != Control::Unbound)
            .map(|(code, &control)| (KeyCode(code as u8), control))
    }
}

impl Default for TranslationTable {
    fn default() -> Self {
        TranslationTable::empty()
    }
}

impl std::fmt::Debug for TranslationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TranslationTable")
            .field("bindings", &self.bindings().collect::<Vec<_>>())
            .field("modes", &self.modes)
            .field("held", &self.held)
            .finish()
    }
}
