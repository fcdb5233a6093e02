// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Loading profiles and slot bindings from TOML.
//!
//! ```toml
//! [[UserProfiles]]
//! Name = "Default"
//! A = "Space"
//! B = "LCtrl"
//! LStick = { Type = "keyboard", Button = "LShift", Up = "W", Down = "S", Left = "A", Right = "D", Speed = 1.0 }
//! RStick = { Type = "mouse", Button = "MButton", Sensitivity = 15.0, Deadzone = 0.1 }
//!
//! [Binding]
//! Gamepad0 = "Default"
//! ```
//!
//! Configuration problems inside a well-formed file never fail the load: unknown key names leave
//! the control unbound, out of range values are clamped or replaced by defaults, and profiles
//! without a name are skipped. Every such case is logged.

use crate::ev::{Button, Stick};
use crate::keycode::KeyCode;
use crate::profile::{KeyboardStick, MouseStick, Profile, ProfileRegistry, StickConfig, StickMode};
use crate::store::StateStore;

use fnv::FnvHashMap;
use toml::Value;
use vec_map::VecMap;

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Profiles and slot bindings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub profiles: ProfileRegistry,
    /// Slot index → profile name.
    pub bindings: VecMap<String>,
}

impl Config {
    /// Reads and parses configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Config::from_toml_str(&text)?;
        info!(
            "Loaded {} profile(s) and {} binding(s) from {}",
            config.profiles.len(),
            config.bindings.len(),
            path.display()
        );

        Ok(config)
    }

    /// Parses configuration. Only malformed TOML, or a document whose top level has the wrong
    /// shape, is an error. Bad values inside profiles and bindings are logged and replaced.
    pub fn from_toml_str(text: &str) -> Result<Config, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        let mut config = Config::default();

        for value in raw.user_profiles.into_iter() {
            let raw_profile: RawProfile = match value.try_into() {
                Ok(raw_profile) => raw_profile,
                Err(e) => {
                    warn!("Skipping user profile: {}", e);
                    continue;
                }
            };

            let name = match string_field("User profile", "Name", &raw_profile.name).map(str::trim)
            {
                Some(name) if !name.is_empty() => name,
                _ => {
                    debug!("User profile can not have empty name, skipping");
                    continue;
                }
            };

            if !config.profiles.insert(raw_profile.to_profile(name)) {
                warn!("Duplicate user profile {:?}, keeping the first one", name);
            }
        }

        for (key, value) in raw.binding.iter() {
            let slot = match slot_from_key(key) {
                Some(slot) => slot,
                None => {
                    warn!("Unknown binding {:?}, expected GamepadN", key);
                    continue;
                }
            };

            match *value {
                Value::String(ref name) => {
                    config.bindings.insert(slot, name.trim().to_owned());
                }
                ref other => wrong_type("Binding", key, "a profile name", other),
            }
        }

        Ok(config)
    }

    /// Binds every slot according to `bindings`, in one step.
    pub fn apply(&self, store: &StateStore) {
        store.rebind_all(&self.profiles, &self.bindings);
    }

    /// Records binding of `slot` to profile `name` and binds it in `store`. Returns `false` and
    /// changes nothing if there is no such profile.
    pub fn bind_profile(&mut self, store: &StateStore, slot: usize, name: &str) -> bool {
        let profile = match self.profiles.get(name) {
            Some(profile) => Arc::clone(profile),
            None => {
                warn!("Can not bind unknown profile {:?} to slot {}", name, slot);
                return false;
            }
        };

        self.bindings.insert(slot, name.to_owned());
        store.bind(slot, &profile);
        true
    }
}

fn slot_from_key(key: &str) -> Option<usize> {
    key.strip_prefix("Gamepad")
        .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|n| n.parse().ok())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawConfig {
    #[serde(default)]
    user_profiles: Vec<Value>,
    #[serde(default)]
    binding: FnvHashMap<String, Value>,
}

// Leaf values are kept as `Value` so one bad field does not reject the whole file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawProfile {
    name: Option<Value>,
    a: Option<Value>,
    b: Option<Value>,
    x: Option<Value>,
    y: Option<Value>,
    #[serde(rename = "LB")]
    lb: Option<Value>,
    #[serde(rename = "RB")]
    rb: Option<Value>,
    #[serde(rename = "LT")]
    lt: Option<Value>,
    #[serde(rename = "RT")]
    rt: Option<Value>,
    start: Option<Value>,
    back: Option<Value>,
    dpad_up: Option<Value>,
    dpad_down: Option<Value>,
    dpad_left: Option<Value>,
    dpad_right: Option<Value>,
    l_stick: Option<Value>,
    r_stick: Option<Value>,
}

impl RawProfile {
    fn to_profile(&self, name: &str) -> Profile {
        let buttons = [
            (Button::A, "A", &self.a),
            (Button::B, "B", &self.b),
            (Button::X, "X", &self.x),
            (Button::Y, "Y", &self.y),
            (Button::LeftShoulder, "LB", &self.lb),
            (Button::RightShoulder, "RB", &self.rb),
            (Button::LeftTrigger, "LT", &self.lt),
            (Button::RightTrigger, "RT", &self.rt),
            (Button::Start, "Start", &self.start),
            (Button::Back, "Back", &self.back),
            (Button::DPadUp, "DpadUp", &self.dpad_up),
            (Button::DPadDown, "DpadDown", &self.dpad_down),
            (Button::DPadLeft, "DpadLeft", &self.dpad_left),
            (Button::DPadRight, "DpadRight", &self.dpad_right),
        ];

        let mut profile = Profile::new(name);
        for &(btn, field, value) in buttons.iter() {
            profile = profile.with_button(btn, parse_key(name, field, value));
        }

        let sticks = [
            (Stick::Left, "LStick", &self.l_stick),
            (Stick::Right, "RStick", &self.r_stick),
        ];
        for &(stick, field, value) in sticks.iter() {
            let value = match *value {
                Some(ref value) => value.clone(),
                None => continue,
            };
            let ctx = format!("{}: {}", name, field);
            let raw: RawStick = match value.try_into() {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("{}: {}, leaving stick unbound", ctx, e);
                    continue;
                }
            };

            profile = profile
                .with_button(stick.thumb_button(), parse_key(&ctx, "Button", &raw.button))
                .with_stick_config(stick, raw.to_stick_config(&ctx));
        }

        profile
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawStick {
    #[serde(rename = "Type")]
    kind: Option<Value>,
    button: Option<Value>,
    // Keyboard mode
    up: Option<Value>,
    down: Option<Value>,
    left: Option<Value>,
    right: Option<Value>,
    speed: Option<Value>,
    // Mouse mode
    sensitivity: Option<Value>,
    non_linear: Option<Value>,
    deadzone: Option<Value>,
    check_frequency: Option<Value>,
    invert_x: Option<Value>,
    invert_y: Option<Value>,
}

impl RawStick {
    fn to_stick_config(&self, ctx: &str) -> StickConfig {
        let kind = string_field(ctx, "Type", &self.kind).map(str::to_ascii_lowercase);
        let mode = match kind.as_deref() {
            Some("keyboard") => StickMode::Keyboard,
            Some("mouse") => StickMode::Mouse,
            other => {
                if let Some(kind) = other {
                    warn!("{}: unknown stick type {:?}, resetting stick", ctx, kind);
                }
                return StickConfig::default();
            }
        };

        let kbd_default = KeyboardStick::default();
        let keyboard = KeyboardStick {
            up: parse_key(ctx, "Up", &self.up),
            down: parse_key(ctx, "Down", &self.down),
            left: parse_key(ctx, "Left", &self.left),
            right: parse_key(ctx, "Right", &self.right),
            speed: unit_range(
                ctx,
                "Speed",
                float_field(ctx, "Speed", &self.speed),
                kbd_default.speed,
            ),
        };

        let mouse_default = MouseStick::default();
        let mouse = MouseStick {
            sensitivity: positive(
                ctx,
                "Sensitivity",
                float_field(ctx, "Sensitivity", &self.sensitivity),
                mouse_default.sensitivity,
            ),
            non_linear: positive(
                ctx,
                "NonLinear",
                float_field(ctx, "NonLinear", &self.non_linear),
                mouse_default.non_linear,
            ),
            deadzone: unit_range(
                ctx,
                "Deadzone",
                float_field(ctx, "Deadzone", &self.deadzone),
                mouse_default.deadzone,
            ),
            check_frequency: match int_field(ctx, "CheckFrequency", &self.check_frequency) {
                Some(v) if v > 0 && v <= i64::from(u32::MAX) => v as u32,
                Some(v) => {
                    warn!("{}: CheckFrequency must be positive, got {}", ctx, v);
                    mouse_default.check_frequency
                }
                None => mouse_default.check_frequency,
            },
            invert_x: bool_field(ctx, "InvertX", &self.invert_x).unwrap_or(mouse_default.invert_x),
            invert_y: bool_field(ctx, "InvertY", &self.invert_y).unwrap_or(mouse_default.invert_y),
        };

        StickConfig {
            mode,
            keyboard,
            mouse,
        }
    }
}

fn wrong_type(ctx: &str, field: &str, expected: &str, value: &Value) {
    warn!("{}: {} should be {}, got {}, ignoring it", ctx, field, expected, value.type_str());
}

fn string_field<'a>(ctx: &str, field: &str, value: &'a Option<Value>) -> Option<&'a str> {
    match *value {
        None => None,
        Some(Value::String(ref s)) => Some(s),
        Some(ref other) => {
            wrong_type(ctx, field, "a string", other);
            None
        }
    }
}

fn float_field(ctx: &str, field: &str, value: &Option<Value>) -> Option<f32> {
    match *value {
        None => None,
        Some(Value::Float(v)) => Some(v as f32),
        Some(Value::Integer(v)) => Some(v as f32),
        Some(ref other) => {
            wrong_type(ctx, field, "a number", other);
            None
        }
    }
}

fn int_field(ctx: &str, field: &str, value: &Option<Value>) -> Option<i64> {
    match *value {
        None => None,
        Some(Value::Integer(v)) => Some(v),
        Some(ref other) => {
            wrong_type(ctx, field, "an integer", other);
            None
        }
    }
}

fn bool_field(ctx: &str, field: &str, value: &Option<Value>) -> Option<bool> {
    match *value {
        None => None,
        Some(Value::Boolean(v)) => Some(v),
        Some(ref other) => {
            wrong_type(ctx, field, "a boolean", other);
            None
        }
    }
}

fn parse_key(ctx: &str, field: &str, value: &Option<Value>) -> KeyCode {
    match string_field(ctx, field, value).map(str::trim) {
        None | Some("") => KeyCode::UNBOUND,
        Some(name) => KeyCode::from_name(name).unwrap_or_else(|| {
            warn!("{}: unknown key {:?} for {}, leaving it unbound", ctx, name, field);
            KeyCode::UNBOUND
        }),
    }
}

fn positive(ctx: &str, field: &str, val: Option<f32>, default: f32) -> f32 {
    match val {
        Some(v) if v > 0.0 && v.is_finite() => v,
        Some(v) => {
            warn!("{}: {} must be positive, got {}", ctx, field, v);
            default
        }
        None => default,
    }
}

fn unit_range(ctx: &str, field: &str, val: Option<f32>, default: f32) -> f32 {
    match val {
        Some(v) if (0.0..=1.0).contains(&v) => v,
        Some(v) if v.is_nan() => {
            warn!("{}: {} is NaN, using {}", ctx, field, default);
            default
        }
        Some(v) => {
            let clamped = v.clamp(0.0, 1.0);
            warn!("{}: {} {} out of range [0, 1], using {}", ctx, field, v, clamped);
            clamped
        }
        None => default,
    }
}

/// Error that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read.
    Io(io::Error),
    /// File is not valid TOML or has wrong structure.
    Parse(toml::de::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref e) => write!(f, "can not read configuration: {}", e),
            ConfigError::Parse(ref e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            ConfigError::Io(ref e) => Some(e),
            ConfigError::Parse(ref e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}
