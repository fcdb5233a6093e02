// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Replays recorded raw input against a configuration and prints what a game would see.
//!
//! Usage: `cargo run --example replay [config.toml]`

extern crate env_logger;
extern crate xiemu;

use xiemu::{Config, InputEvent, MouseTicker, StateStore, Stick};

use std::env;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEFAULT_CONFIG: &str = r#"
[[UserProfiles]]
Name = "Shooter"
A = "Space"
B = "LCtrl"
X = "R"
Y = "E"
LT = "RButton"
RT = "LButton"
Start = "Escape"
LStick = { Type = "keyboard", Button = "LShift", Up = "W", Down = "S", Left = "A", Right = "D" }
RStick = { Type = "mouse", Button = "MButton", Sensitivity = 20, Deadzone = 0.05, CheckFrequency = 60 }

[Binding]
Gamepad0 = "Shooter"
"#;

const RI_KEY_BREAK: u16 = 1;

enum Raw {
    Key(u8, u16),
    Mouse(u16, i32, i32),
    Idle(u64),
}

fn main() {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => Config::load(path),
        None => Config::from_toml_str(DEFAULT_CONFIG),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let mut names = config.profiles.names().collect::<Vec<_>>();
    names.sort_unstable();
    println!("profiles: {}", names.join(", "));

    let store = Arc::new(StateStore::new());
    store.set_change_hook(|slot, profile| match profile {
        Some(name) => println!("slot {} bound to {:?}", slot, name),
        None => println!("slot {} disabled", slot),
    });
    config.apply(&store);

    let ticker = match MouseTicker::spawn(store.clone()) {
        Ok(ticker) => ticker,
        Err(e) => {
            eprintln!("Failed to start mouse ticker: {}", e);
            process::exit(1);
        }
    };

    let recording = [
        Raw::Key(b'W', 0),
        Raw::Key(b'D', 0),
        Raw::Key(0x20, 0),
        Raw::Mouse(0x0001, 12, -4),
        Raw::Key(0x20, RI_KEY_BREAK),
        Raw::Key(b'W', RI_KEY_BREAK),
        Raw::Mouse(0x0002, 0, 0),
        Raw::Idle(100),
        Raw::Key(b'D', RI_KEY_BREAK),
    ];

    for raw in recording.iter() {
        let events = match *raw {
            Raw::Key(vkey, flags) => InputEvent::from_raw_keyboard(u16::from(vkey), flags)
                .into_iter()
                .collect(),
            Raw::Mouse(buttons, dx, dy) => InputEvent::from_raw_mouse(0, buttons, dx, dy),
            Raw::Idle(ms) => {
                thread::sleep(Duration::from_millis(ms));
                Vec::new()
            }
        };

        for event in events.iter() {
            store.handle_event(event);
        }
        print_slots(&store);
    }

    ticker.stop();
}

fn print_slots(store: &StateStore) {
    for slot in 0..store.slot_count() {
        if let Some((epoch, state)) = store.snapshot(slot) {
            println!(
                "[{}] epoch {:>3}  left {:?}  right {:?}  {:?}",
                slot,
                epoch.raw(),
                state.stick(Stick::Left),
                state.stick(Stick::Right),
                state.to_xinput()
            );
        }
    }
}
