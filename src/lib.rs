//! Pointer gesture recognition: raw touch/mouse samples in, press, drag,
//! flick, release and two-pointer events out.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod gestures;
pub mod input;
pub mod logging;
pub mod pipeline;
pub mod tracker;

pub use config::Thresholds;
pub use dispatch::{Dispatcher, GestureListener, ListenerId};
pub use engine::GestureEngine;
pub use error::GestureError;
pub use gestures::{GestureEvent, GestureKind};
pub use input::TickInput;
