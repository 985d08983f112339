//! Host-side pointer samples: recorded sessions and evdev multitouch devices.

use anyhow::{Result, anyhow};
use evdev::{AbsoluteAxisCode, Device, EventType};
use log::warn;
use serde::Deserialize;
use std::io::BufRead;

use crate::geometry::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchPhase {
    Began,
    Moved,
    Stationary,
    Ended,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TouchSample {
    pub id: i32,
    pub position: Vec2,
    pub phase: TouchPhase,
}

/// Per-tick state of a mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonState {
    #[default]
    Idle,
    /// Went down this tick.
    Pressed,
    Held,
    /// Went up this tick.
    Released,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MouseFrame {
    pub position: Vec2,
    #[serde(default)]
    pub buttons: [ButtonState; 2],
}

/// Everything the host observed for one update tick.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TickInput {
    /// Monotonic time in seconds.
    pub time: f32,
    #[serde(default)]
    pub touches: Vec<TouchSample>,
    #[serde(default)]
    pub mouse: Option<MouseFrame>,
}

/// Read a recorded session: one JSON tick per line, blank lines and lines
/// starting with `#` skipped.
pub fn read_ticks(reader: impl BufRead) -> Result<Vec<TickInput>> {
    let mut ticks = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tick: TickInput =
            serde_json::from_str(line).map_err(|e| anyhow!("line {}: {e}", n + 1))?;
        if let Some(prev) = ticks.last().map(|t: &TickInput| t.time) {
            if tick.time < prev {
                return Err(anyhow!(
                    "line {}: time {} goes backwards (previous {prev})",
                    n + 1,
                    tick.time
                ));
            }
        }
        ticks.push(tick);
    }
    Ok(ticks)
}

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
}

pub fn discover_multitouch() -> Vec<DeviceInfo> {
    let mut out = vec![];
    if let Ok(rd) = std::fs::read_dir("/dev/input") {
        for e in rd.flatten() {
            let p = e.path();
            if p.file_name()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.starts_with("event"))
            {
                if let Ok(dev) = Device::open(&p) {
                    if is_multitouch(&dev) {
                        out.push(DeviceInfo {
                            path: p.display().to_string(),
                            name: dev.name().unwrap_or("unknown").to_string(),
                        });
                    }
                }
            }
        }
    }
    out
}

fn is_multitouch(dev: &Device) -> bool {
    let has_abs = dev.supported_events().contains(EventType::ABSOLUTE);
    let has_mt = dev.supported_absolute_axes().is_some_and(|a| {
        a.contains(AbsoluteAxisCode::ABS_MT_SLOT)
            && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_X)
            && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_Y)
    });
    has_abs && has_mt
}

pub fn open_multitouch(path: &str) -> Result<Device> {
    let dev = Device::open(path).map_err(|e| anyhow!("failed to open {path}: {e}"))?;
    if !is_multitouch(&dev) {
        return Err(anyhow!("{path} is not a multitouch device"));
    }
    Ok(dev)
}

// upper bound on MT slots we keep state for
const MAX_MT_SLOTS: usize = 64;

#[derive(Debug, Clone, Default)]
struct Contact {
    tracking_id: i32,
    position: Vec2,
    active: bool,
    began: bool,
    ended: bool,
    moved: bool,
}

/// Folds multitouch protocol-B events into one [`TickInput`] per
/// `SYN_REPORT`. The MT slot index is used as the pointer id.
#[derive(Debug, Default)]
pub struct MtAccumulator {
    slots: Vec<Contact>,
    cur_slot: usize,
}

impl MtAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&mut self) -> &mut Contact {
        if self.cur_slot >= self.slots.len() {
            self.slots.resize(self.cur_slot + 1, Contact::default());
        }
        &mut self.slots[self.cur_slot]
    }

    pub fn on_slot(&mut self, slot: i32) {
        match usize::try_from(slot) {
            Ok(s) if s < MAX_MT_SLOTS => self.cur_slot = s,
            _ => warn!("ignoring out-of-range MT slot {slot}"),
        }
    }

    pub fn on_tracking_id(&mut self, tracking_id: i32) {
        let c = self.current();
        if tracking_id < 0 {
            if c.active {
                c.active = false;
                c.ended = true;
            }
        } else {
            // a lift and a new landing in the same frame: the old contact is over
            if !c.active {
                c.ended = false;
            }
            c.tracking_id = tracking_id;
            c.active = true;
            c.began = true;
            c.moved = false;
        }
    }

    pub fn on_pos_x(&mut self, raw: i32) {
        let c = self.current();
        c.position.x = raw as f32;
        c.moved = true;
    }

    pub fn on_pos_y(&mut self, raw: i32) {
        let c = self.current();
        c.position.y = raw as f32;
        c.moved = true;
    }

    /// Close the current frame. A contact that begins and ends inside one
    /// frame reports `Began` now and `Ended` on the next report.
    pub fn on_syn_report(&mut self, time: f32) -> TickInput {
        let mut touches = Vec::new();
        for (idx, c) in self.slots.iter_mut().enumerate() {
            let phase = if c.began {
                c.began = false;
                TouchPhase::Began
            } else if c.ended {
                c.ended = false;
                TouchPhase::Ended
            } else if c.active && c.moved {
                TouchPhase::Moved
            } else if c.active {
                TouchPhase::Stationary
            } else {
                continue;
            };
            c.moved = false;
            touches.push(TouchSample {
                id: idx as i32,
                position: c.position,
                phase,
            });
        }
        TickInput {
            time,
            touches,
            mouse: None,
        }
    }

    pub fn active_tracking_ids(&self) -> Vec<i32> {
        self.slots
            .iter()
            .filter(|c| c.active)
            .map(|c| c.tracking_id)
            .collect()
    }
}
