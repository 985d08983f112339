//! Listener registry that fans gesture events out to subscribers.

use log::{Level, log};
use std::collections::HashSet;

use crate::gestures::{GestureEvent, GestureKind};

pub trait GestureListener {
    fn on_gesture(&mut self, event: &GestureEvent);
}

impl<F> GestureListener for F
where
    F: FnMut(&GestureEvent),
{
    fn on_gesture(&mut self, event: &GestureEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    // None = every kind
    kinds: Option<HashSet<GestureKind>>,
    listener: Box<dyn GestureListener>,
}

/// Listeners are called in registration order.
#[derive(Default)]
pub struct Dispatcher {
    entries: Vec<Entry>,
    next_id: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: impl GestureListener + 'static) -> ListenerId {
        self.push(None, Box::new(listener))
    }

    /// Register a listener that only hears the given kinds of event.
    pub fn register_for(
        &mut self,
        kinds: impl IntoIterator<Item = GestureKind>,
        listener: impl GestureListener + 'static,
    ) -> ListenerId {
        self.push(Some(kinds.into_iter().collect()), Box::new(listener))
    }

    fn push(
        &mut self,
        kinds: Option<HashSet<GestureKind>>,
        listener: Box<dyn GestureListener>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, kinds, listener });
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dispatch<'a>(&mut self, events: impl IntoIterator<Item = &'a GestureEvent>) {
        for ev in events {
            let kind = ev.kind();
            for entry in &mut self.entries {
                if entry.kinds.as_ref().is_none_or(|k| k.contains(&kind)) {
                    entry.listener.on_gesture(ev);
                }
            }
        }
    }
}

/// Logs every gesture it hears: two-pointer deltas at `info`, the rest at
/// `debug`.
pub struct LogListener;

impl LogListener {
    fn level(event: &GestureEvent) -> Level {
        match event {
            GestureEvent::TwoPointerDelta { .. } => Level::Info,
            _ => Level::Debug,
        }
    }
}

impl GestureListener for LogListener {
    fn on_gesture(&mut self, event: &GestureEvent) {
        let level = Self::level(event);
        match event {
            GestureEvent::TwoPointerDelta { delta } => log!(level, "two-pointer delta {delta:+.1}"),
            other => log!(level, "{other:?}"),
        }
    }
}
