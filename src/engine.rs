//! Per-tick driver tying samples, the tracker, the aggregator and listeners.

use log::{trace, warn};

use crate::config::Thresholds;
use crate::dispatch::{Dispatcher, GestureListener, ListenerId};
use crate::error::GestureError;
use crate::geometry::Vec2;
use crate::gestures::{GestureEvent, GestureKind, TwoPointerAggregator};
use crate::input::{ButtonState, MouseFrame, TickInput, TouchPhase, TouchSample};
use crate::tracker::PointerTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Touch,
    Mouse,
}

pub struct GestureEngine {
    tracker: PointerTracker,
    aggregator: TwoPointerAggregator,
    dispatcher: Dispatcher,
    queue: Vec<GestureEvent>,
}

impl GestureEngine {
    pub fn new(th: &Thresholds) -> Self {
        Self {
            tracker: PointerTracker::new(th),
            aggregator: TwoPointerAggregator::new(),
            dispatcher: Dispatcher::new(),
            queue: Vec::new(),
        }
    }

    pub fn tracker(&self) -> &PointerTracker {
        &self.tracker
    }

    pub fn register(&mut self, listener: impl GestureListener + 'static) -> ListenerId {
        self.dispatcher.register(listener)
    }

    pub fn register_for(
        &mut self,
        kinds: impl IntoIterator<Item = GestureKind>,
        listener: impl GestureListener + 'static,
    ) -> ListenerId {
        self.dispatcher.register_for(kinds, listener)
    }

    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.dispatcher.unregister(id)
    }

    /// Run one tick and deliver its events. Touch samples take precedence;
    /// the mouse is only consulted when no touch is reported.
    ///
    /// Returns the number of events dispatched.
    pub fn update(&mut self, tick: &TickInput) -> usize {
        self.tracker.begin_tick();
        self.aggregator.begin_tick();

        if !tick.touches.is_empty() {
            for sample in &tick.touches {
                self.process_touch(sample, tick.time);
            }
        } else if let Some(mouse) = &tick.mouse {
            self.process_mouse(mouse, tick.time);
        }

        self.queue.extend(self.tracker.drain_events());
        if let Some(ev) = self.aggregator.finish_tick() {
            self.queue.push(ev);
        }
        self.dispatcher.dispatch(&self.queue);
        let n = self.queue.len();
        self.queue.clear();
        n
    }

    fn process_touch(&mut self, s: &TouchSample, now: f32) {
        let res = match s.phase {
            TouchPhase::Began => self.tracker.on_down(s.id, s.position, now),
            TouchPhase::Moved | TouchPhase::Stationary => self.pointer_move(s.id, s.position, now),
            TouchPhase::Ended => self.tracker.on_up(s.id, s.position, now),
            TouchPhase::Canceled => self.tracker.on_cancel(s.id, s.position, now),
        };
        if let Err(e) = res {
            report(Source::Touch, e);
        }
    }

    fn process_mouse(&mut self, mouse: &MouseFrame, now: f32) {
        for (id, state) in (0i32..).zip(mouse.buttons) {
            let res = match state {
                ButtonState::Pressed => self.tracker.on_down(id, mouse.position, now),
                ButtonState::Held => self.pointer_move(id, mouse.position, now),
                ButtonState::Released => self.tracker.on_up(id, mouse.position, now),
                ButtonState::Idle => Ok(()),
            };
            if let Err(e) = res {
                report(Source::Mouse, e);
            }
        }
    }

    fn pointer_move(
        &mut self,
        id: i32,
        position: Vec2,
        now: f32,
    ) -> Result<(), GestureError> {
        if self.tracker.on_move(id, position, now)? {
            if let Some(state) = self.tracker.slot(id) {
                self.aggregator
                    .observe(self.tracker.drag_pointer_count(), state);
            }
        }
        Ok(())
    }
}

fn report(source: Source, e: GestureError) {
    match (source, &e) {
        (Source::Mouse, GestureError::OutOfOrderSample { .. }) => trace!("mouse: {e}"),
        _ => warn!("dropping {source:?} sample: {e}"),
    }
}
