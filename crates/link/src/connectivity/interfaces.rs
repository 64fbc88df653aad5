// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network interface sources.

use std::sync::Mutex;

use rideline_core::{ConnectionType, Result};
use tokio::sync::broadcast;

use crate::lock;

/// Where the monitor learns which interface is up.
pub trait InterfaceSource: Send + Sync {
    /// The interface in use right now.
    fn current(&self) -> Result<ConnectionType>;

    /// Raw interface reports. Repeats are allowed; the monitor de-duplicates.
    fn changes(&self) -> broadcast::Receiver<ConnectionType>;
}

/// Interface source fed by the embedding platform.
///
/// The host app (or an OS integration layer) calls [`report`](Self::report)
/// whenever its network callback fires.
pub struct PlatformInterfaces {
    current: Mutex<ConnectionType>,
    tx: broadcast::Sender<ConnectionType>,
}

impl PlatformInterfaces {
    pub fn new(initial: ConnectionType) -> Self {
        let (tx, _) = broadcast::channel(16);
        PlatformInterfaces {
            current: Mutex::new(initial),
            tx,
        }
    }

    /// Records the interface now in use and notifies listeners.
    pub fn report(&self, kind: ConnectionType) {
        *lock(&self.current) = kind;
        // No listener yet is fine; `current()` already reflects the report
        let _ = self.tx.send(kind);
    }
}

impl InterfaceSource for PlatformInterfaces {
    fn current(&self) -> Result<ConnectionType> {
        Ok(*lock(&self.current))
    }

    fn changes(&self) -> broadcast::Receiver<ConnectionType> {
        self.tx.subscribe()
    }
}
