use thiserror::Error;

/// Recoverable per-sample conditions raised by the pointer tracker.
///
/// None of these are fatal: the offending sample is dropped for its slot and
/// every other slot keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GestureError {
    #[error("pointer id {id} is outside the configured capacity of {capacity} slots")]
    InvalidSlot { id: i32, capacity: usize },

    #[error("{kind} sample for pointer {id} with no gesture in progress")]
    OutOfOrderSample { id: i32, kind: SampleKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Move,
    Up,
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleKind::Move => f.write_str("move"),
            SampleKind::Up => f.write_str("up"),
        }
    }
}
