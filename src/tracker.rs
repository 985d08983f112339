//! Per-slot pointer state and the press/drag/flick/release state machine.

use log::trace;

use crate::config::Thresholds;
use crate::error::{GestureError, SampleKind};
use crate::geometry::Vec2;
use crate::gestures::GestureEvent;

/// Presses of the same slot closer together than this count as a multi-click.
pub const MULTI_CLICK_WINDOW: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    None,
    Began,
    DragStarted,
    Dragging,
    DragEnded,
    Flicked,
    Ended,
    Canceled,
}

#[derive(Debug, Clone)]
pub struct PointerState {
    pub id: i32,
    pub phase: Phase,
    pub position: Vec2,
    pub press_position: Vec2,
    pub drag_start_position: Vec2,
    pub delta: Vec2,
    pub drag_start_time: f32,
    pub click_count: u32,
    pub click_time: Option<f32>,
    // set on DragStarted, cleared on Began
    dragged: bool,
}

impl PointerState {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            phase: Phase::None,
            position: Vec2::ZERO,
            press_position: Vec2::ZERO,
            drag_start_position: Vec2::ZERO,
            delta: Vec2::ZERO,
            drag_start_time: 0.0,
            click_count: 0,
            click_time: None,
            dragged: false,
        }
    }

    pub fn is_moving(&self) -> bool {
        !self.delta.is_zero()
    }

    /// Whether this gesture has passed through `DragStarted` since its press.
    pub fn has_dragged(&self) -> bool {
        self.dragged
    }
}

#[derive(Debug)]
pub struct PointerTracker {
    slots: Vec<PointerState>,
    drag_threshold: f32,
    flick_threshold: f32,
    flick_time: f32,
    drag_pointer_count: usize,
    events: Vec<GestureEvent>,
}

impl PointerTracker {
    pub fn new(th: &Thresholds) -> Self {
        let slots = (0..th.max_pointer_count)
            .map(|i| PointerState::new(i as i32))
            .collect();
        Self {
            slots,
            drag_threshold: th.drag_threshold,
            flick_threshold: th.flick_threshold,
            flick_time: th.flick_time,
            drag_pointer_count: 0,
            events: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, id: i32) -> Option<&PointerState> {
        usize::try_from(id).ok().and_then(|i| self.slots.get(i))
    }

    pub fn slots(&self) -> &[PointerState] {
        &self.slots
    }

    /// Number of slots that dragged so far in the current tick.
    pub fn drag_pointer_count(&self) -> usize {
        self.drag_pointer_count
    }

    pub fn begin_tick(&mut self) {
        self.drag_pointer_count = 0;
    }

    /// Take every event emitted since the last drain, in emission order.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GestureEvent> {
        self.events.drain(..)
    }

    fn index(&self, id: i32) -> Result<usize, GestureError> {
        usize::try_from(id)
            .ok()
            .filter(|&i| i < self.slots.len())
            .ok_or(GestureError::InvalidSlot {
                id,
                capacity: self.slots.len(),
            })
    }

    pub fn on_down(&mut self, id: i32, position: Vec2, now: f32) -> Result<(), GestureError> {
        let idx = self.index(id)?;
        let s = &mut self.slots[idx];
        s.press_position = position;
        s.delta = Vec2::ZERO;
        s.dragged = false;
        s.click_count = match s.click_time {
            Some(t) if now - t < MULTI_CLICK_WINDOW => s.click_count + 1,
            _ => 1,
        };
        s.click_time = Some(now);
        self.transition(idx, Phase::Began, position);
        Ok(())
    }

    /// Returns `true` when the sample produced a `Drag`, i.e. the slot counts
    /// toward this tick's dragging pointers.
    pub fn on_move(&mut self, id: i32, position: Vec2, now: f32) -> Result<bool, GestureError> {
        let idx = self.index(id)?;
        let drag_sq = self.drag_threshold * self.drag_threshold;
        let s = &mut self.slots[idx];
        if s.phase == Phase::None {
            return Err(GestureError::OutOfOrderSample {
                id,
                kind: SampleKind::Move,
            });
        }

        s.delta = position - s.position;
        s.position = position;

        if s.phase == Phase::Began && position.distance_squared(s.press_position) > drag_sq {
            s.drag_start_time = now;
            s.drag_start_position = position;
            s.dragged = true;
            self.transition(idx, Phase::DragStarted, position);
        }

        let s = &self.slots[idx];
        if matches!(s.phase, Phase::DragStarted | Phase::Dragging) && s.is_moving() {
            self.drag_pointer_count += 1;
            self.transition(idx, Phase::Dragging, position);
            return Ok(true);
        }
        Ok(false)
    }

    pub fn on_up(&mut self, id: i32, position: Vec2, now: f32) -> Result<(), GestureError> {
        self.release(id, position, now, Phase::Ended)
    }

    /// Same sequence as [`on_up`](Self::on_up) for a contact the host aborted.
    pub fn on_cancel(&mut self, id: i32, position: Vec2, now: f32) -> Result<(), GestureError> {
        self.release(id, position, now, Phase::Canceled)
    }

    fn release(
        &mut self,
        id: i32,
        position: Vec2,
        now: f32,
        terminal: Phase,
    ) -> Result<(), GestureError> {
        let idx = self.index(id)?;
        if self.slots[idx].phase == Phase::None {
            return Err(GestureError::OutOfOrderSample {
                id,
                kind: SampleKind::Up,
            });
        }
        self.slots[idx].position = position;

        if self.slots[idx].phase == Phase::Dragging {
            self.transition(idx, Phase::DragEnded, position);
        }
        if self.is_flicked(&self.slots[idx], now) {
            self.transition(idx, Phase::Flicked, position);
        }
        self.transition(idx, terminal, position);
        self.slots[idx].phase = Phase::None;
        Ok(())
    }

    fn is_flicked(&self, s: &PointerState, now: f32) -> bool {
        s.dragged
            && s.position.distance_squared(s.drag_start_position)
                > self.flick_threshold * self.flick_threshold
            && now - s.drag_start_time < self.flick_time
    }

    /// Enter `phase` at `position` and emit the event that phase implies.
    fn transition(&mut self, idx: usize, phase: Phase, position: Vec2) {
        let s = &mut self.slots[idx];
        trace!("pointer {}: {:?} -> {:?}", s.id, s.phase, phase);
        s.phase = phase;
        s.position = position;

        let ev = match phase {
            Phase::Began => GestureEvent::Press {
                id: s.id,
                position,
                press_position: s.press_position,
                click_count: s.click_count,
            },
            Phase::DragStarted => GestureEvent::DragStart {
                id: s.id,
                position,
                drag_start_position: s.drag_start_position,
                drag_start_time: s.drag_start_time,
            },
            Phase::Dragging => GestureEvent::Drag {
                id: s.id,
                position,
                delta: s.delta,
            },
            Phase::DragEnded => GestureEvent::DragEnd { id: s.id, position },
            Phase::Flicked => GestureEvent::Flick {
                id: s.id,
                position,
                direction: (position - s.drag_start_position).normalized(),
            },
            Phase::Ended | Phase::Canceled => GestureEvent::Release { id: s.id, position },
            Phase::None => return,
        };
        self.events.push(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gestures::GestureKind;

    fn thresholds(drag: f32, flick: f32, flick_time: f32) -> Thresholds {
        Thresholds {
            drag_threshold: drag,
            flick_threshold: flick,
            flick_time,
            max_pointer_count: 4,
            tap_max_allowed_drag: 3.0,
        }
    }

    fn kinds(t: &mut PointerTracker) -> Vec<GestureKind> {
        t.drain_events().map(|e| e.kind()).collect()
    }

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn press_move_release_scenario_without_flick() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        assert_eq!(kinds(&mut t), vec![GestureKind::Press]);

        assert!(!t.on_move(0, v(2.0, 0.0), 0.05).unwrap());
        assert!(kinds(&mut t).is_empty());

        assert!(t.on_move(0, v(10.0, 0.0), 0.10).unwrap());
        assert_eq!(
            kinds(&mut t),
            vec![GestureKind::DragStart, GestureKind::Drag]
        );

        // released where the drag started: no travel, no flick
        t.on_up(0, v(10.0, 0.0), 0.20).unwrap();
        assert_eq!(
            kinds(&mut t),
            vec![GestureKind::DragEnd, GestureKind::Release]
        );
        assert_eq!(t.slot(0).unwrap().phase, Phase::None);
    }

    #[test]
    fn release_can_emit_drag_end_flick_and_release() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        t.on_move(0, v(2.0, 0.0), 0.05).unwrap();
        t.on_move(0, v(10.0, 0.0), 0.10).unwrap();
        t.drain_events().for_each(drop);

        t.on_up(0, v(20.0, 0.0), 0.20).unwrap();
        let events: Vec<_> = t.drain_events().collect();
        assert_eq!(
            events.iter().map(|e| e.kind()).collect::<Vec<_>>(),
            vec![GestureKind::DragEnd, GestureKind::Flick, GestureKind::Release]
        );
        assert_eq!(
            events[1],
            GestureEvent::Flick {
                id: 0,
                position: v(20.0, 0.0),
                direction: v(1.0, 0.0),
            }
        );
    }

    #[test]
    fn drag_threshold_is_strict() {
        let mut t = PointerTracker::new(&thresholds(5.0, 10.0, 0.5));
        t.on_down(1, v(0.0, 0.0), 0.0).unwrap();
        // exactly 5 away
        assert!(!t.on_move(1, v(3.0, 4.0), 0.1).unwrap());
        assert_eq!(t.slot(1).unwrap().phase, Phase::Began);
        assert!(t.on_move(1, v(3.0, 4.5), 0.2).unwrap());
        assert_eq!(t.slot(1).unwrap().phase, Phase::Dragging);
    }

    #[test]
    fn slow_drag_is_not_a_flick() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        t.on_move(0, v(10.0, 0.0), 0.5).unwrap();
        t.drain_events().for_each(drop);
        // exactly flick_time after drag start
        t.on_up(0, v(40.0, 0.0), 1.0).unwrap();
        assert_eq!(
            kinds(&mut t),
            vec![GestureKind::DragEnd, GestureKind::Release]
        );
    }

    #[test]
    fn short_drag_is_not_a_flick() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        t.on_move(0, v(10.0, 0.0), 0.1).unwrap();
        t.drain_events().for_each(drop);
        // exactly flick_threshold from drag start
        t.on_up(0, v(16.0, 0.0), 0.2).unwrap();
        assert_eq!(
            kinds(&mut t),
            vec![GestureKind::DragEnd, GestureKind::Release]
        );
    }

    #[test]
    fn no_flick_without_a_drag_in_this_gesture() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        t.on_move(0, v(10.0, 0.0), 0.1).unwrap();
        t.on_up(0, v(10.0, 0.0), 0.2).unwrap();
        t.drain_events().for_each(drop);

        // second gesture never drags; stale drag start would be 30 away
        t.on_down(0, v(40.0, 0.0), 0.25).unwrap();
        t.on_up(0, v(40.0, 0.0), 0.3).unwrap();
        assert_eq!(kinds(&mut t), vec![GestureKind::Press, GestureKind::Release]);
    }

    fn tap(t: &mut PointerTracker, at: f32) -> u32 {
        t.on_down(0, v(0.0, 0.0), at).unwrap();
        t.on_up(0, v(0.0, 0.0), at).unwrap();
        t.slot(0).unwrap().click_count
    }

    #[test]
    fn click_count_uses_window() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        assert_eq!(tap(&mut t, 0.0), 1);
        assert_eq!(tap(&mut t, 0.2), 2);
        assert_eq!(tap(&mut t, 0.4), 3);
        assert_eq!(tap(&mut t, 1.0), 1);
    }

    #[test]
    fn click_gap_of_exactly_the_window_resets() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        assert_eq!(tap(&mut t, 0.0), 1);
        assert_eq!(tap(&mut t, 0.3), 1);
    }

    #[test]
    fn click_count_is_per_slot() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        t.on_down(1, v(0.0, 0.0), 0.1).unwrap();
        assert_eq!(t.slot(0).unwrap().click_count, 1);
        assert_eq!(t.slot(1).unwrap().click_count, 1);
    }

    #[test]
    fn press_event_carries_click_count() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(2, v(1.0, 2.0), 0.0).unwrap();
        let ev: Vec<_> = t.drain_events().collect();
        assert_eq!(
            ev,
            vec![GestureEvent::Press {
                id: 2,
                position: v(1.0, 2.0),
                press_position: v(1.0, 2.0),
                click_count: 1,
            }]
        );
    }

    #[test]
    fn release_on_idle_slot_is_rejected_and_silent() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        t.on_up(0, v(0.0, 0.0), 0.1).unwrap();
        t.drain_events().for_each(drop);

        assert_eq!(
            t.on_up(0, v(0.0, 0.0), 0.2),
            Err(GestureError::OutOfOrderSample {
                id: 0,
                kind: SampleKind::Up
            })
        );
        assert!(kinds(&mut t).is_empty());
    }

    #[test]
    fn move_on_idle_slot_is_rejected() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        assert!(matches!(
            t.on_move(0, v(50.0, 0.0), 0.0),
            Err(GestureError::OutOfOrderSample { .. })
        ));
        assert_eq!(t.slot(0).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn ids_outside_capacity_are_rejected() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        assert_eq!(
            t.on_down(4, v(0.0, 0.0), 0.0),
            Err(GestureError::InvalidSlot { id: 4, capacity: 4 })
        );
        assert_eq!(
            t.on_down(-1, v(0.0, 0.0), 0.0),
            Err(GestureError::InvalidSlot {
                id: -1,
                capacity: 4
            })
        );
        assert!(kinds(&mut t).is_empty());
    }

    #[test]
    fn stationary_drag_does_not_count() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        t.on_move(0, v(10.0, 0.0), 0.1).unwrap();
        t.begin_tick();
        t.drain_events().for_each(drop);
        assert!(!t.on_move(0, v(10.0, 0.0), 0.2).unwrap());
        assert_eq!(t.drag_pointer_count(), 0);
        assert!(kinds(&mut t).is_empty());
    }

    #[test]
    fn drag_counter_resets_per_tick() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        t.on_down(1, v(50.0, 0.0), 0.0).unwrap();
        t.on_move(0, v(10.0, 0.0), 0.1).unwrap();
        t.on_move(1, v(60.0, 0.0), 0.1).unwrap();
        assert_eq!(t.drag_pointer_count(), 2);
        t.begin_tick();
        assert_eq!(t.drag_pointer_count(), 0);
    }

    #[test]
    fn cancel_emits_release_and_resets() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        t.on_move(0, v(10.0, 0.0), 0.1).unwrap();
        t.drain_events().for_each(drop);
        t.on_cancel(0, v(11.0, 0.0), 0.2).unwrap();
        assert_eq!(
            kinds(&mut t),
            vec![GestureKind::DragEnd, GestureKind::Release]
        );
        assert_eq!(t.slot(0).unwrap().phase, Phase::None);
    }

    #[test]
    fn drag_reports_delta_between_samples() {
        let mut t = PointerTracker::new(&thresholds(5.0, 6.0, 0.5));
        t.on_down(0, v(0.0, 0.0), 0.0).unwrap();
        t.on_move(0, v(10.0, 0.0), 0.1).unwrap();
        t.drain_events().for_each(drop);
        t.on_move(0, v(12.0, 3.0), 0.2).unwrap();
        let ev: Vec<_> = t.drain_events().collect();
        assert_eq!(
            ev,
            vec![GestureEvent::Drag {
                id: 0,
                position: v(12.0, 3.0),
                delta: v(2.0, 3.0),
            }]
        );
    }
}
