// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed push handler registries.

use std::sync::Arc;

use rideline_core::{PushMessage, TripStatusChange, VehiclePositionUpdate, VehicleQueueUpdate};

/// Receives decoded push records of one type.
///
/// Any `Fn(&T) + Send + Sync` closure is a handler.
pub(crate) trait MessageHandler<T>: Send + Sync {
    fn handle(&self, message: &T);
}

impl<T, F> MessageHandler<T> for F
where
    F: Fn(&T) + Send + Sync,
{
    fn handle(&self, message: &T) {
        self(message)
    }
}

/// Ordered list of handlers for one record type.
pub(crate) struct HandlerList<T> {
    handlers: Vec<Arc<dyn MessageHandler<T>>>,
}

impl<T> HandlerList<T> {
    fn new() -> Self {
        HandlerList {
            handlers: Vec::new(),
        }
    }

    fn push(&mut self, handler: Arc<dyn MessageHandler<T>>) {
        self.handlers.push(handler);
    }

    /// Calls every handler in registration order.
    fn dispatch(&self, message: &T) -> usize {
        for handler in &self.handlers {
            handler.handle(message);
        }
        self.handlers.len()
    }

    fn clear(&mut self) {
        self.handlers.clear();
    }
}

/// A handler on its way to the registry.
pub(crate) enum Registration {
    VehicleQueueUpdate(Arc<dyn MessageHandler<VehicleQueueUpdate>>),
    VehiclePositionUpdate(Arc<dyn MessageHandler<VehiclePositionUpdate>>),
    TripStatusChange(Arc<dyn MessageHandler<TripStatusChange>>),
}

/// Handlers for every push target.
pub(crate) struct PushHandlers {
    queue: HandlerList<VehicleQueueUpdate>,
    position: HandlerList<VehiclePositionUpdate>,
    trip: HandlerList<TripStatusChange>,
}

impl PushHandlers {
    pub(crate) fn new() -> Self {
        PushHandlers {
            queue: HandlerList::new(),
            position: HandlerList::new(),
            trip: HandlerList::new(),
        }
    }

    pub(crate) fn register(&mut self, registration: Registration) {
        match registration {
            Registration::VehicleQueueUpdate(h) => self.queue.push(h),
            Registration::VehiclePositionUpdate(h) => self.position.push(h),
            Registration::TripStatusChange(h) => self.trip.push(h),
        }
    }

    /// Returns how many handlers saw the message.
    pub(crate) fn dispatch(&self, message: &PushMessage) -> usize {
        match message {
            PushMessage::VehicleQueueUpdate(m) => self.queue.dispatch(m),
            PushMessage::VehiclePositionUpdate(m) => self.position.dispatch(m),
            PushMessage::TripStatusChange(m) => self.trip.dispatch(m),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
        self.position.clear();
        self.trip.clear();
    }
}
