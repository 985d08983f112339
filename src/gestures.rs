use serde::Serialize;

use crate::geometry::Vec2;
use crate::tracker::PointerState;

/// Semantic events produced from raw pointer samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GestureEvent {
    Press {
        id: i32,
        position: Vec2,
        press_position: Vec2,
        click_count: u32,
    },
    DragStart {
        id: i32,
        position: Vec2,
        drag_start_position: Vec2,
        drag_start_time: f32,
    },
    Drag {
        id: i32,
        position: Vec2,
        delta: Vec2,
    },
    DragEnd {
        id: i32,
        position: Vec2,
    },
    Flick {
        id: i32,
        position: Vec2,
        direction: Vec2,
    },
    Release {
        id: i32,
        position: Vec2,
    },
    /// Change in squared distance between two dragging pointers since the
    /// previous sample. Positive when separating.
    TwoPointerDelta { delta: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Press,
    DragStart,
    Drag,
    DragEnd,
    Flick,
    Release,
    TwoPointerDelta,
}

impl GestureEvent {
    pub fn kind(&self) -> GestureKind {
        match self {
            GestureEvent::Press { .. } => GestureKind::Press,
            GestureEvent::DragStart { .. } => GestureKind::DragStart,
            GestureEvent::Drag { .. } => GestureKind::Drag,
            GestureEvent::DragEnd { .. } => GestureKind::DragEnd,
            GestureEvent::Flick { .. } => GestureKind::Flick,
            GestureEvent::Release { .. } => GestureKind::Release,
            GestureEvent::TwoPointerDelta { .. } => GestureKind::TwoPointerDelta,
        }
    }

    /// Pointer the event belongs to; `None` for aggregate signals.
    pub fn pointer_id(&self) -> Option<i32> {
        match self {
            GestureEvent::Press { id, .. }
            | GestureEvent::DragStart { id, .. }
            | GestureEvent::Drag { id, .. }
            | GestureEvent::DragEnd { id, .. }
            | GestureEvent::Flick { id, .. }
            | GestureEvent::Release { id, .. } => Some(*id),
            GestureEvent::TwoPointerDelta { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DragSnapshot {
    position: Vec2,
    delta: Vec2,
}

impl DragSnapshot {
    fn previous_position(&self) -> Vec2 {
        self.position - self.delta
    }
}

/// Watches which slots drag during a tick and derives the two-pointer delta.
///
/// Slots are recorded by their position in the tick's drag order: the first
/// dragging slot, then the second. Any further dragging slots are ignored.
#[derive(Debug, Default)]
pub struct TwoPointerAggregator {
    first: Option<DragSnapshot>,
    second: Option<DragSnapshot>,
}

impl TwoPointerAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_tick(&mut self) {
        self.first = None;
        self.second = None;
    }

    /// Record a slot that just dragged. `drag_count` is the tracker's
    /// active-drag counter after counting this slot.
    pub fn observe(&mut self, drag_count: usize, state: &PointerState) {
        let snap = DragSnapshot {
            position: state.position,
            delta: state.delta,
        };
        match drag_count {
            1 => self.first = Some(snap),
            2 => self.second = Some(snap),
            _ => {}
        }
    }

    /// Signal for the tick, available once two slots have dragged in it.
    pub fn finish_tick(&self) -> Option<GestureEvent> {
        let (first, second) = (self.first?, self.second?);
        let current = first.position.distance_squared(second.position);
        let previous = first
            .previous_position()
            .distance_squared(second.previous_position());
        Some(GestureEvent::TwoPointerDelta {
            delta: current - previous,
        })
    }
}
