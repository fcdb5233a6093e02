// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! XiEmu - keyboard and mouse to XInput emulation
//! ==============================================
//!
//! XiEmu turns raw keyboard and mouse input into the state of up to eight virtual XInput
//! gamepads. Each gamepad slot is bound to a user profile which says which key presses which
//! button and how sticks follow the keyboard or the mouse. Game threads poll slots concurrently
//! while input and configuration threads update them.
//!
//! Example
//! -------
//!
//! ```
//! use std::sync::Arc;
//! use xiemu::{Button, Config, InputEvent, StateStore, Stick};
//!
//! let config = Config::from_toml_str(r#"
//!     [[UserProfiles]]
//!     Name = "Default"
//!     A = "Space"
//!     LStick = { Type = "keyboard", Up = "W", Down = "S", Left = "A", Right = "D" }
//!
//!     [Binding]
//!     Gamepad0 = "Default"
//! "#).unwrap();
//!
//! let store = Arc::new(StateStore::new());
//! config.apply(&store);
//!
//! // Raw input thread
//! for event in InputEvent::from_raw_keyboard(b'W' as u16, 0) {
//!     store.handle_event(&event);
//! }
//!
//! // Game thread
//! if let Some(state) = store.xinput_state(0) {
//!     assert_eq!(state.gamepad.thumb_ly, 32767);
//! }
//! assert!(!store.snapshot(0).unwrap().1.is_pressed(Button::A));
//! assert_eq!(store.snapshot(0).unwrap().1.stick(Stick::Left), (0, 32767));
//! ```
//!
//! Mouse sticks
//! ------------
//!
//! Sticks in mouse mode follow relative mouse motion and return to the center once the mouse
//! stops. Recentering is done by [`StateStore::recenter_idle`], usually called from
//! [`MouseTicker`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;
extern crate fnv;
extern crate vec_map;

mod config;
mod ev;
mod gamepad;
mod keycode;
mod mapping;
mod profile;
mod reduce;
mod store;
mod ticker;

pub mod utils;

pub use crate::config::{Config, ConfigError};
pub use crate::ev::{Button, Direction, InputEvent, Stick};
pub use crate::gamepad::{xinput_buttons, Epoch, GamepadState, XInputGamepad, XInputState};
pub use crate::keycode::KeyCode;
pub use crate::mapping::{Control, HeldDirections, TranslationTable};
pub use crate::profile::{KeyboardStick, MouseStick, Profile, ProfileRegistry, StickConfig,
                         StickMode};
pub use crate::store::{ChangeHook, StateStore, MAX_SLOTS, SLOT_COUNT};
pub use crate::ticker::MouseTicker;
