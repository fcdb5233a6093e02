// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Shared state of all emulated gamepads.
//!
//! `StateStore` owns a fixed number of slots. Every slot is either disabled, in which case
//! queries for it should be forwarded to the real device, or bound to a profile. Pollers read
//! slots concurrently with [`snapshot`](struct.StateStore.html#method.snapshot) while the input
//! thread applies events and the configuration thread rebinds slots. All of it goes through one
//! reader/writer lock; writers only do short in-memory work while holding it.
//!
//! ```
//! use std::sync::Arc;
//! use xiemu::{Button, InputEvent, KeyCode, Profile, StateStore};
//!
//! let store = StateStore::new();
//! let profile = Arc::new(Profile::new("default").with_button(Button::A, KeyCode(0x20)));
//! store.bind(0, &profile);
//!
//! store.handle_event(&InputEvent::Key { code: KeyCode(0x20), pressed: true });
//!
//! let (_epoch, state) = store.snapshot(0).unwrap();
//! assert!(state.is_pressed(Button::A));
//! assert!(store.snapshot(1).is_none());
//! ```

use crate::ev::{InputEvent, Stick};
use crate::gamepad::{Epoch, GamepadState, XInputState};
use crate::keycode::KeyCode;
use crate::mapping::TranslationTable;
use crate::profile::{MouseStick, Profile, ProfileRegistry, StickMode};
use crate::reduce;

use vec_map::VecMap;

use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Number of slots in a store created with `StateStore::new()`. Same as `XUSER_MAX_COUNT`.
pub const SLOT_COUNT: usize = 4;

/// Upper bound for `StateStore::with_slot_count()`.
pub const MAX_SLOTS: usize = 8;

/// Called with slot index and name of newly bound profile (`None` when slot was disabled).
pub type ChangeHook = Box<dyn Fn(usize, Option<&str>) + Send + Sync>;

pub(crate) struct Slot {
    pub(crate) enabled: bool,
    pub(crate) profile: Option<Arc<Profile>>,
    pub(crate) state: GamepadState,
    pub(crate) epoch: Epoch,
    pub(crate) table: TranslationTable,
    // Set by mouse motion, cleared by recentering
    pub(crate) mouse_moved: bool,
}

impl Slot {
    fn new() -> Self {
        Slot {
            enabled: false,
            profile: None,
            state: GamepadState::new(),
            epoch: Epoch::default(),
            table: TranslationTable::empty(),
            mouse_moved: false,
        }
    }

    /// Returns `true` if the slot was bound to a different profile (or none) before.
    fn bind(&mut self, profile: &Arc<Profile>, table: TranslationTable) -> bool {
        let changed = match self.profile {
            Some(ref old) => !Arc::ptr_eq(old, profile),
            None => true,
        };

        self.enabled = true;
        self.state = GamepadState::new();
        self.table = table;
        self.profile = Some(profile.clone());
        self.mouse_moved = false;
        self.epoch.inc();
        changed
    }

    /// Returns `true` if the slot was enabled before.
    fn disable(&mut self) -> bool {
        let changed = self.enabled;

        self.enabled = false;
        self.state = GamepadState::new();
        self.table = TranslationTable::empty();
        self.profile = None;
        self.mouse_moved = false;
        self.epoch.inc();
        changed
    }

    fn profile_name(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.name())
    }
}

struct Inner {
    slots: Vec<Slot>,
    hook: Option<ChangeHook>,
}

impl Inner {
    fn notify(&self, slot: usize) {
        if let Some(ref hook) = self.hook {
            hook(slot, self.slots[slot].profile_name());
        }
    }
}

// Outcome of binding one slot, logged after the lock is released.
enum Rebound<'a> {
    Bound(&'a str),
    Missing(&'a str),
    NoBinding,
}

/// Per slot gamepad state, translation tables and bindings behind one lock.
///
/// Share it between threads with `Arc<StateStore>`. Nothing is logged while the lock is held.
pub struct StateStore {
    inner: RwLock<Inner>,
    // Never changes after construction
    slot_count: usize,
}

impl StateStore {
    /// Creates store with `SLOT_COUNT` disabled slots.
    pub fn new() -> Self {
        StateStore::with_slot_count(SLOT_COUNT)
    }

    /// Creates store with `count` disabled slots. `count` is clamped to `1..=MAX_SLOTS`.
    pub fn with_slot_count(count: usize) -> Self {
        let clamped = count.clamp(1, MAX_SLOTS);
        if clamped != count {
            warn!("Requested {} slots, using {}", count, clamped);
        }

        StateStore {
            inner: RwLock::new(Inner {
                slots: (0..clamped).map(|_| Slot::new()).collect(),
                hook: None,
            }),
            slot_count: clamped,
        }
    }

    // Nothing in a critical section can leave a slot half-updated on panic, so a poisoned lock is
    // still usable.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Installs hook called whenever a slot gets bound to a different profile or gets disabled.
    /// Rebinding a slot to the profile it already uses does not call the hook. The hook runs while
    /// the store is locked for writing and must not call back into the store.
    pub fn set_change_hook<F>(&self, hook: F)
    where
        F: Fn(usize, Option<&str>) + Send + Sync + 'static,
    {
        self.write().hook = Some(Box::new(hook));
    }

    pub fn clear_change_hook(&self) {
        self.write().hook = None;
    }

    /// Enables `slot` with `profile`, zeroes its state and rebuilds its translation table.
    /// Out of range `slot` is logged and ignored.
    pub fn bind(&self, slot: usize, profile: &Arc<Profile>) {
        if slot >= self.slot_count {
            warn!("Can not bind profile {:?} to slot {}: no such slot", profile.name(), slot);
            return;
        }

        let table = TranslationTable::build(profile);
        {
            let mut inner = self.write();
            if inner.slots[slot].bind(profile, table) {
                inner.notify(slot);
            }
        }
        info!("Slot {} bound to profile {:?}", slot, profile.name());
    }

    /// Disables `slot`. Queries for disabled slots should go to the real device.
    pub fn unbind(&self, slot: usize) {
        if slot >= self.slot_count {
            warn!("Can not unbind slot {}: no such slot", slot);
            return;
        }

        {
            let mut inner = self.write();
            if inner.slots[slot].disable() {
                inner.notify(slot);
            }
        }
        info!("Slot {} disabled", slot);
    }

    /// Applies complete slot → profile name mapping at once. Slots without binding, and slots
    /// bound to a profile that is not in `registry`, are disabled.
    pub fn rebind_all(&self, registry: &ProfileRegistry, bindings: &VecMap<String>) {
        for (slot, name) in bindings.iter() {
            if slot >= self.slot_count {
                warn!("Ignoring binding of profile {:?} to slot {}: no such slot", name, slot);
            }
        }

        // Tables are built before taking the lock.
        let plan = (0..self.slot_count)
            .map(|slot| match bindings.get(slot).map(String::as_str) {
                Some(name) if !name.is_empty() => match registry.get(name) {
                    Some(profile) => {
                        let table = TranslationTable::build(profile);
                        (Rebound::Bound(name), Some((profile, table)))
                    }
                    None => (Rebound::Missing(name), None),
                },
                _ => (Rebound::NoBinding, None),
            })
            .collect::<Vec<_>>();

        let mut outcomes = Vec::with_capacity(plan.len());
        {
            let mut inner = self.write();
            for (slot, (outcome, target)) in plan.into_iter().enumerate() {
                let changed = match target {
                    Some((profile, table)) => inner.slots[slot].bind(profile, table),
                    None => inner.slots[slot].disable(),
                };
                if changed {
                    inner.notify(slot);
                }
                outcomes.push(outcome);
            }
        }

        for (slot, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Rebound::Bound(name) => info!("Slot {} bound to profile {:?}", slot, name),
                Rebound::Missing(name) => {
                    warn!("Profile {:?} for slot {} does not exist, slot disabled", name, slot)
                }
                Rebound::NoBinding => debug!("Slot {} has no binding, slot disabled", slot),
            }
        }
    }

    /// Returns epoch and copy of state of `slot`, or `None` if the slot is disabled or does not
    /// exist.
    pub fn snapshot(&self, slot: usize) -> Option<(Epoch, GamepadState)> {
        if slot >= self.slot_count {
            debug!("Snapshot of slot {} requested: no such slot", slot);
            return None;
        }

        let inner = self.read();
        let s = &inner.slots[slot];
        if s.enabled {
            Some((s.epoch, s.state))
        } else {
            None
        }
    }

    /// Same as `snapshot()`, converted to `XINPUT_STATE` layout with epoch as packet number.
    pub fn xinput_state(&self, slot: usize) -> Option<XInputState> {
        self.snapshot(slot).map(|(epoch, state)| XInputState {
            packet_number: epoch.raw(),
            gamepad: state.to_xinput(),
        })
    }

    pub fn is_enabled(&self, slot: usize) -> bool {
        self.read().slots.get(slot).map(|s| s.enabled).unwrap_or(false)
    }

    /// Profile bound to `slot`.
    pub fn bound_profile(&self, slot: usize) -> Option<Arc<Profile>> {
        self.read().slots.get(slot).and_then(|s| s.profile.clone())
    }

    /// Copy of translation table of `slot`, including currently held directions.
    pub fn translation_table(&self, slot: usize) -> Option<TranslationTable> {
        self.read().slots.get(slot).map(|s| s.table.clone())
    }

    /// Feeds one input event to every enabled slot.
    pub fn handle_event(&self, event: &InputEvent) {
        match *event {
            InputEvent::Key { code, pressed } => self.handle_key(code, pressed),
            InputEvent::MouseMove { dx, dy } => self.handle_mouse_move(dx, dy),
        }
    }

    /// Applies key or mouse button transition to every enabled slot that binds `code`.
    pub fn handle_key(&self, code: KeyCode, pressed: bool) {
        let mut inner = self.write();
        for slot in inner.slots.iter_mut() {
            reduce::key(slot, code, pressed);
        }
    }

    /// Applies relative mouse motion to every enabled slot with a stick in mouse mode.
    pub fn handle_mouse_move(&self, dx: i32, dy: i32) {
        let mut inner = self.write();
        for slot in inner.slots.iter_mut() {
            reduce::mouse_motion(slot, dx, dy);
        }
    }

    /// Centers mouse sticks that got no motion since the previous call. Mouse reports only
    /// motion, so this is what returns the stick to the center when the mouse stops. Call it
    /// every `mouse_check_interval()`, e.g. with [`MouseTicker`](crate::MouseTicker).
    pub fn recenter_idle(&self) {
        let mut inner = self.write();
        for slot in inner.slots.iter_mut() {
            reduce::recenter(slot);
        }
    }

    /// Shortest check interval requested by mouse sticks of bound profiles. If no stick is in
    /// mouse mode, interval for the default check frequency is returned.
    pub fn mouse_check_interval(&self) -> Duration {
        let inner = self.read();
        inner
            .slots
            .iter()
            .filter(|s| s.enabled)
            .filter_map(|s| s.profile.as_ref())
            .flat_map(|p| {
                Stick::ALL
                    .iter()
                    .map(move |&stick| p.stick(stick))
                    .filter(|cfg| cfg.mode == StickMode::Mouse)
                    .map(|cfg| cfg.mouse.check_interval())
            })
            .min()
            .unwrap_or_else(|| MouseStick::default().check_interval())
    }
}

impl Default for StateStore {
    fn default() -> Self {
        StateStore::new()
    }
}

impl Debug for StateStore {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let inner = self.read();
        let mut list = f.debug_list();
        for slot in inner.slots.iter() {
            list.entry(&(slot.enabled, slot.profile_name(), slot.epoch, slot.state));
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ev::{Button, Direction};
    use crate::mapping::Control;
    use crate::profile::KeyboardStick;

    use log::Log;

    use std::cell::Cell;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, Once};
    use std::thread;
    use std::time::Instant;

    thread_local! {
        static SLOW_LOGGING: Cell<bool> = Cell::new(false);
    }

    // Forwards to env_logger. Threads that set SLOW_LOGGING stall on every record, like a logger
    // stuck on a full pipe.
    struct TestLogger {
        inner: env_logger::Logger,
    }

    impl Log for TestLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if SLOW_LOGGING.with(Cell::get) {
                thread::sleep(Duration::from_millis(300));
            }
            if self.inner.matches(record) {
                self.inner.log(record);
            }
        }

        fn flush(&self) {
            self.inner.flush();
        }
    }

    fn init_logger() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let inner = env_logger::Builder::from_default_env().is_test(true).build();
            let logger: &'static TestLogger = Box::leak(Box::new(TestLogger { inner }));
            if log::set_logger(logger).is_ok() {
                log::set_max_level(log::LevelFilter::Trace);
            }
        });
    }

    const SPACE: KeyCode = KeyCode(0x20);
    const W: KeyCode = KeyCode(b'W');
    const A: KeyCode = KeyCode(b'A');
    const S: KeyCode = KeyCode(b'S');
    const D: KeyCode = KeyCode(b'D');

    fn profile(name: &str, speed: f32) -> Arc<Profile> {
        let kbd = KeyboardStick {
            up: W,
            down: S,
            left: A,
            right: D,
            speed,
        };
        Arc::new(
            Profile::new(name)
                .with_button(Button::A, SPACE)
                .with_button(Button::RightTrigger, KeyCode::LBUTTON)
                .with_keyboard_stick(Stick::Left, kbd),
        )
    }

    fn mouse_profile(name: &str) -> Arc<Profile> {
        let mouse = MouseStick {
            sensitivity: 10.0,
            check_frequency: 200,
            ..MouseStick::default()
        };
        Arc::new(
            Profile::new(name)
                .with_button(Button::B, SPACE)
                .with_mouse_stick(Stick::Right, mouse),
        )
    }

    fn epoch(store: &StateStore, slot: usize) -> u32 {
        store.read().slots[slot].epoch.raw()
    }

    #[test]
    fn bind_zeroes_state_and_builds_table() {
        let store = StateStore::new();
        let p = profile("p", 1.0);
        store.bind(1, &p);
        store.handle_key(SPACE, true);
        store.handle_key(D, true);
        store.bind(1, &p);

        let (_, state) = store.snapshot(1).unwrap();
        assert_eq!(state, GamepadState::new());

        let table = store.translation_table(1).unwrap();
        let mut bindings = table.bindings().collect::<Vec<_>>();
        bindings.sort_by_key(|&(code, _)| code);
        assert_eq!(
            bindings,
            vec![
                (KeyCode::LBUTTON, Control::Button(Button::RightTrigger)),
                (SPACE, Control::Button(Button::A)),
                (A, Control::Stick(Stick::Left, Direction::Left)),
                (D, Control::Stick(Stick::Left, Direction::Right)),
                (S, Control::Stick(Stick::Left, Direction::Down)),
                (W, Control::Stick(Stick::Left, Direction::Up)),
            ]
        );
        assert_eq!(table.held(Stick::Left), &Default::default());
        assert!(store.is_enabled(1));
        assert!(!store.is_enabled(0));
    }

    #[test]
    fn press_release_bumps_epoch_twice() {
        let store = StateStore::new();
        store.bind(0, &profile("p", 1.0));
        let before = epoch(&store, 0);

        store.handle_key(SPACE, true);
        assert!(store.snapshot(0).unwrap().1.is_pressed(Button::A));
        store.handle_key(SPACE, false);

        let (e, state) = store.snapshot(0).unwrap();
        assert!(!state.is_pressed(Button::A));
        assert_eq!(e.raw(), before + 2);
    }

    #[test]
    fn unmapped_code_keeps_epoch() {
        let store = StateStore::new();
        store.bind(0, &profile("p", 1.0));
        store.bind(2, &mouse_profile("m"));
        let before = (epoch(&store, 0), epoch(&store, 2));

        store.handle_key(KeyCode(b'Q'), true);
        store.handle_key(KeyCode(b'Q'), false);
        store.handle_key(KeyCode::UNBOUND, true);
        store.handle_key(W, true);

        assert_eq!(epoch(&store, 0), before.0 + 1);
        assert_eq!(epoch(&store, 2), before.1);
    }

    #[test]
    fn events_reach_every_enabled_slot() {
        let store = StateStore::new();
        store.bind(0, &profile("p", 1.0));
        store.bind(3, &mouse_profile("m"));

        store.handle_event(&InputEvent::Key { code: SPACE, pressed: true });

        assert!(store.snapshot(0).unwrap().1.is_pressed(Button::A));
        let (_, state) = store.snapshot(3).unwrap();
        assert!(state.is_pressed(Button::B));
        assert!(!state.is_pressed(Button::A));
        // Disabled slots are not touched
        assert_eq!(store.read().slots[1].epoch.raw(), 0);
    }

    #[test]
    fn duplicate_press_does_not_leak() {
        let store = StateStore::new();
        store.bind(0, &profile("p", 1.0));

        store.handle_key(A, true);
        store.handle_key(A, true);
        assert_eq!(store.snapshot(0).unwrap().1.stick(Stick::Left), (-32767, 0));
        store.handle_key(A, false);

        assert_eq!(store.snapshot(0).unwrap().1.stick(Stick::Left), (0, 0));
        assert_eq!(store.translation_table(0).unwrap().held(Stick::Left), &Default::default());
    }

    #[test]
    fn keyboard_stick_values() {
        let store = StateStore::new();
        store.bind(0, &profile("p", 0.5));

        store.handle_key(D, true);
        assert_eq!(store.snapshot(0).unwrap().1.stick(Stick::Left), (16384, 0));

        store.handle_key(A, true);
        assert_eq!(store.snapshot(0).unwrap().1.stick(Stick::Left), (0, 0));

        store.handle_key(D, false);
        store.handle_key(W, true);
        assert_eq!(store.snapshot(0).unwrap().1.stick(Stick::Left), (-16384, 16384));

        store.handle_key(S, true);
        assert_eq!(store.snapshot(0).unwrap().1.stick(Stick::Left), (-16384, 0));
        assert_eq!(store.snapshot(0).unwrap().1.stick(Stick::Right), (0, 0));
    }

    #[test]
    fn mouse_stick_follows_motion_and_recenters() {
        let store = StateStore::new();
        store.bind(0, &mouse_profile("m"));
        store.bind(1, &profile("p", 1.0));
        let before = epoch(&store, 1);

        store.handle_mouse_move(5, 10);
        let (e, state) = store.snapshot(0).unwrap();
        assert_eq!(state.stick(Stick::Right), (16384, -32767));
        assert_eq!(epoch(&store, 1), before);

        // Motion since the last check keeps the stick deflected
        store.recenter_idle();
        assert_eq!(store.snapshot(0).unwrap().0, e);

        store.recenter_idle();
        let (e2, state) = store.snapshot(0).unwrap();
        assert_eq!(state.stick(Stick::Right), (0, 0));
        assert_eq!(e2.raw(), e.raw() + 1);

        // Already centered
        store.recenter_idle();
        assert_eq!(store.snapshot(0).unwrap().0, e2);
    }

    #[test]
    fn mouse_check_interval() {
        let store = StateStore::new();
        assert_eq!(store.mouse_check_interval(), MouseStick::default().check_interval());
        store.bind(2, &mouse_profile("m"));
        assert_eq!(store.mouse_check_interval(), Duration::from_millis(5));
        store.unbind(2);
        assert_eq!(store.mouse_check_interval(), MouseStick::default().check_interval());
    }

    #[test]
    fn unbind_disables_slot() {
        let store = StateStore::new();
        store.bind(0, &profile("p", 1.0));
        store.handle_key(SPACE, true);
        store.unbind(0);

        assert!(store.snapshot(0).is_none());
        assert!(store.bound_profile(0).is_none());
        assert_eq!(store.read().slots[0].state, GamepadState::new());

        let before = epoch(&store, 0);
        store.handle_key(SPACE, false);
        assert_eq!(epoch(&store, 0), before);
    }

    #[test]
    fn out_of_range_slots() {
        let store = StateStore::new();
        let p = profile("p", 1.0);
        store.bind(SLOT_COUNT, &p);
        store.unbind(SLOT_COUNT + 3);

        assert!(store.snapshot(SLOT_COUNT).is_none());
        assert!(store.xinput_state(usize::MAX).is_none());
        assert!(!store.is_enabled(SLOT_COUNT));
        assert_eq!(store.slot_count(), SLOT_COUNT);
        assert!((0..SLOT_COUNT).all(|slot| !store.is_enabled(slot)));
    }

    #[test]
    fn slot_count_is_clamped() {
        assert_eq!(StateStore::with_slot_count(0).slot_count(), 1);
        assert_eq!(StateStore::with_slot_count(6).slot_count(), 6);
        assert_eq!(StateStore::with_slot_count(100).slot_count(), MAX_SLOTS);
    }

    #[test]
    fn xinput_state_uses_epoch() {
        let store = StateStore::new();
        store.bind(0, &profile("p", 1.0));
        store.handle_key(KeyCode::LBUTTON, true);

        let (e, _) = store.snapshot(0).unwrap();
        let xi = store.xinput_state(0).unwrap();
        assert_eq!(xi.packet_number, e.raw());
        assert_eq!(xi.gamepad.right_trigger, 255);
        assert_eq!(xi.gamepad.buttons, 0);
    }

    #[test]
    fn rebind_all_disables_missing_profiles() {
        let store = StateStore::with_slot_count(6);
        let mut registry = ProfileRegistry::new();
        for name in ["a", "b", "c", "d"].iter() {
            registry.insert(Profile::new(*name).with_button(Button::X, SPACE));
        }

        store.bind(4, &profile("old", 1.0));

        let mut bindings = VecMap::new();
        bindings.insert(0, "a".to_owned());
        bindings.insert(1, "b".to_owned());
        bindings.insert(2, "c".to_owned());
        bindings.insert(3, "d".to_owned());
        bindings.insert(4, "missing".to_owned());
        bindings.insert(9, "a".to_owned());
        store.rebind_all(&registry, &bindings);

        for (slot, name) in ["a", "b", "c", "d"].iter().enumerate() {
            assert!(store.is_enabled(slot));
            assert_eq!(store.bound_profile(slot).unwrap().name(), *name);
            assert_eq!(
                store.translation_table(slot).unwrap().lookup(SPACE),
                Control::Button(Button::X)
            );
        }
        assert!(!store.is_enabled(4));
        assert!(store.snapshot(4).is_none());
        assert_eq!(store.translation_table(4).unwrap().bindings().count(), 0);
        assert!(!store.is_enabled(5));
    }

    #[test]
    fn change_hook_sees_every_binding_change() {
        let store = StateStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        store.set_change_hook(move |slot, name| {
            seen2.lock().unwrap().push((slot, name.map(str::to_owned)));
        });

        let p = profile("p", 1.0);
        store.bind(2, &p);
        // Same profile again, and disabling a disabled slot: no change
        store.bind(2, &p);
        store.unbind(2);
        store.unbind(2);
        store.bind(7, &p);

        let mut registry = ProfileRegistry::new();
        registry.insert(Profile::new("q"));
        let mut bindings = VecMap::new();
        bindings.insert(1, "q".to_owned());
        store.rebind_all(&registry, &bindings);
        store.rebind_all(&registry, &bindings);

        // Reloaded registry holds a new profile under the same name
        let mut reloaded = ProfileRegistry::new();
        reloaded.insert(Profile::new("q"));
        store.rebind_all(&reloaded, &bindings);
        store.rebind_all(&reloaded, &VecMap::new());

        store.clear_change_hook();
        store.unbind(0);
        store.bind(1, &p);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (2, Some("p".to_owned())),
                (2, None),
                (1, Some("q".to_owned())),
                (1, Some("q".to_owned())),
                (1, None),
            ]
        );
    }

    // Writer repeats bind, press, release. Bind, press and release each bump the epoch by one,
    // so the stick must be deflected exactly when epoch % 3 == 2.
    #[test]
    fn concurrent_pollers_never_see_torn_state() {
        init_logger();

        const READERS: usize = 4;
        let store = Arc::new(StateStore::new());
        let p = profile("p", 0.5);
        let done = Arc::new(AtomicBool::new(false));

        let readers = (0..READERS)
            .map(|_| {
                let store = store.clone();
                let done = done.clone();
                thread::spawn(move || {
                    let mut last = 0;
                    let mut observed = 0usize;
                    while !done.load(Ordering::Acquire) {
                        if let Some((e, state)) = store.snapshot(0) {
                            let e = e.raw();
                            assert!(e >= last, "epoch went back from {} to {}", last, e);
                            last = e;

                            let expected = if e % 3 == 2 { (16384, 0) } else { (0, 0) };
                            assert_eq!(state.stick(Stick::Left), expected, "epoch {}", e);
                            observed += 1;
                        }
                    }
                    observed
                })
            })
            .collect::<Vec<_>>();

        for _ in 0..334 {
            store.bind(0, &p);
            store.handle_key(D, true);
            store.handle_key(D, false);
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(epoch(&store, 0), 334 * 3);
    }

    #[test]
    fn pollers_do_not_wait_for_logging() {
        init_logger();

        let store = Arc::new(StateStore::new());
        let p = profile("p", 1.0);
        store.bind(1, &p);

        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                SLOW_LOGGING.with(|slow| slow.set(true));
                let mut registry = ProfileRegistry::new();
                registry.insert(Profile::new("q"));
                let mut bindings = VecMap::new();
                bindings.insert(0, "q".to_owned());
                bindings.insert(2, "missing".to_owned());

                store.bind(0, &p);
                store.unbind(0);
                store.rebind_all(&registry, &bindings);
            })
        };

        for _ in 0..10 {
            thread::sleep(Duration::from_millis(50));
            let t1 = Instant::now();
            assert!(store.snapshot(3).is_none());
            let blocked = t1.elapsed();
            assert!(blocked < Duration::from_millis(150), "poller blocked for {:?}", blocked);
        }

        writer.join().unwrap();
        assert_eq!(store.bound_profile(0).unwrap().name(), "q");
        assert!(!store.is_enabled(1));
        assert!(!store.is_enabled(2));
    }

    #[test]
    fn concurrent_rebind_is_atomic() {
        let store = Arc::new(StateStore::with_slot_count(5));
        let mut registry = ProfileRegistry::new();
        registry.insert(Profile::new("x").with_button(Button::X, SPACE));
        registry.insert(Profile::new("y").with_button(Button::Y, SPACE));

        let mut bindings_x = VecMap::new();
        let mut bindings_y = VecMap::new();
        for slot in 0..4 {
            bindings_x.insert(slot, "x".to_owned());
            bindings_y.insert(slot, "y".to_owned());
        }
        bindings_x.insert(4, "missing".to_owned());
        bindings_y.insert(4, "missing".to_owned());

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let store = store.clone();
            let done = done.clone();
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let inner = store.read();
                    let slots = &inner.slots;
                    assert!(!slots[4].enabled);

                    // Profile and table of every slot come from the same rebind
                    let controls = slots[..4]
                        .iter()
                        .map(|s| (s.profile_name().map(str::to_owned), s.table.lookup(SPACE)))
                        .collect::<Vec<_>>();
                    for (name, control) in controls.iter() {
                        let expected = match name.as_deref() {
                            Some("x") => Control::Button(Button::X),
                            Some("y") => Control::Button(Button::Y),
                            _ => Control::Unbound,
                        };
                        assert_eq!(*control, expected);
                    }
                    assert!(
                        controls.iter().all(|c| *c == controls[0]),
                        "mixed bindings: {:?}",
                        controls
                    );
                }
            })
        };

        for i in 0..500 {
            let bindings = if i % 2 == 0 { &bindings_x } else { &bindings_y };
            store.rebind_all(&registry, bindings);
        }
        done.store(true, Ordering::Release);
        reader.join().unwrap();

        assert_eq!(store.bound_profile(0).unwrap().name(), "y");
        assert!(!store.is_enabled(4));
    }
}
