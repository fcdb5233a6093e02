// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Reduction of input events into slot state.
//!
//! All functions here run with exclusive access to the slot and return `true` if they changed it.
//! Every change increments the slot's epoch exactly once, no matter how many fields were touched.

use crate::ev::Stick;
use crate::keycode::KeyCode;
use crate::mapping::Control;
use crate::profile::{MouseStick, StickMode};
use crate::store::Slot;
use crate::utils::axis_from_unit;

use std::mem;

/// Applies key transition to one slot.
pub(crate) fn key(slot: &mut Slot, code: KeyCode, pressed: bool) -> bool {
    let profile = match slot.profile {
        Some(ref profile) if slot.enabled => profile,
        _ => return false,
    };

    match slot.table.lookup(code) {
        Control::Unbound => return false,
        Control::Button(btn) => slot.state.set_btn(btn, pressed),
        Control::Stick(stick, dir) => {
            // Mode is checked when the table is built; only keyboard sticks have directions.
            let held = slot.table.held_mut(stick);
            held.set(dir, pressed);
            let val = axis_from_unit(profile.stick(stick).keyboard.speed);
            let axes = held.axes(val);
            slot.state.set_stick(stick, axes);
        }
    }

    slot.epoch.inc();
    true
}

/// Applies relative mouse motion to sticks of one slot that are in mouse mode.
pub(crate) fn mouse_motion(slot: &mut Slot, dx: i32, dy: i32) -> bool {
    let profile = match slot.profile {
        Some(ref profile) if slot.enabled => profile,
        _ => return false,
    };

    let mut changed = false;
    for &stick in Stick::ALL.iter() {
        if slot.table.stick_mode(stick) != StickMode::Mouse {
            continue;
        }

        let cfg = &profile.stick(stick).mouse;
        let axes = mouse_axes(dx, dy, cfg);
        slot.state.set_stick(stick, axes);
        changed = true;
    }

    if changed {
        slot.mouse_moved = true;
        slot.epoch.inc();
    }
    changed
}

/// Centers mouse sticks that did not move since the last call.
pub(crate) fn recenter(slot: &mut Slot) -> bool {
    if !slot.enabled || mem::replace(&mut slot.mouse_moved, false) {
        return false;
    }

    let mut changed = false;
    for &stick in Stick::ALL.iter() {
        if slot.table.stick_mode(stick) == StickMode::Mouse && slot.state.stick(stick) != (0, 0) {
            slot.state.set_stick(stick, (0, 0));
            changed = true;
        }
    }

    if changed {
        slot.epoch.inc();
    }
    changed
}

/// Stick position for one motion sample. Screen Y grows downward, stick Y grows upward.
pub(crate) fn mouse_axes(dx: i32, dy: i32, cfg: &MouseStick) -> (i16, i16) {
    let mut x = mouse_response(dx as f32, cfg);
    let mut y = mouse_response(-(dy as f32), cfg);

    if cfg.invert_x {
        x = -x;
    }
    if cfg.invert_y {
        y = -y;
    }

    (axis_from_unit(x), axis_from_unit(y))
}

/// Maps motion along one axis to [-1, 1]. Deadzone is cut out first, rest of the range is
/// rescaled and shaped by the `non_linear` exponent.
fn mouse_response(delta: f32, cfg: &MouseStick) -> f32 {
    if !(cfg.sensitivity > 0.0) {
        return 0.0;
    }

    let norm = (delta / cfg.sensitivity).clamp(-1.0, 1.0);
    let magnitude = norm.abs();
    if magnitude <= cfg.deadzone || cfg.deadzone >= 1.0 {
        return 0.0;
    }

    let exp = if cfg.non_linear > 0.0 { cfg.non_linear } else { 1.0 };
    let shaped = ((magnitude - cfg.deadzone) / (1.0 - cfg.deadzone)).powf(exp);
    shaped.copysign(norm)
}
