//! Redirect events and their subscribers.
//!
//! Listeners are invoked synchronously, in subscription order, on the task
//! that resolved the request. Subscribing swaps in a new listener list so
//! delivery never takes a lock.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::redirect::table::RouteKey;

/// Something observable happened while resolving a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RedirectEvent {
    /// A redirect was issued.
    Redirected {
        from: String,
        location: String,
        status: u16,
        host: Option<String>,
        route: String,
    },
    /// A 404 with no matching redirect passed through.
    Missed { path: String, host: Option<String> },
    /// Dynamic rules collided with registered ones.
    Duplicate { keys: Vec<RouteKey> },
}

/// Receives redirect events.
pub trait RedirectListener: Send + Sync {
    fn on_event(&self, event: &RedirectEvent);
}

impl<F> RedirectListener for F
where
    F: Fn(&RedirectEvent) + Send + Sync,
{
    fn on_event(&self, event: &RedirectEvent) {
        self(event)
    }
}

#[derive(Default)]
pub struct EventBus {
    listeners: ArcSwap<Vec<Arc<dyn RedirectListener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn RedirectListener>) {
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(listener.clone());
            next
        });
    }

    pub fn emit(&self, event: &RedirectEvent) {
        for listener in self.listeners.load().iter() {
            listener.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.len())
            .finish()
    }
}
