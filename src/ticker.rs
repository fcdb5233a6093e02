// Copyright 2024 XiEmu Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Background thread returning idle mouse sticks to the center.

use crate::store::StateStore;

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Calls [`StateStore::recenter_idle`](crate::StateStore::recenter_idle)
/// every `StateStore::mouse_check_interval()` until stopped or dropped.
#[derive(Debug)]
pub struct MouseTicker {
    tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl MouseTicker {
    pub fn spawn(store: Arc<StateStore>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("xiemu-mouse-ticker".to_owned())
            .spawn(move || run(&store, rx))?;

        Ok(MouseTicker {
            tx,
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Thread may already be gone; nothing to do then.
        let _ = self.tx.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Mouse ticker thread panicked");
            }
        }
    }
}

impl Drop for MouseTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(store: &StateStore, rx: Receiver<()>) {
    debug!("Mouse ticker started");

    loop {
        let interval = store.mouse_check_interval();
        match rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let t1 = Instant::now();
                store.recenter_idle();
                let dur = Instant::now().duration_since(t1);
                if dur > interval {
                    warn!("Recentering mouse sticks took {:?}, longer than {:?}", dur, interval);
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Mouse ticker stopped");
}
