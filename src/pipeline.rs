use anyhow::Result;
use evdev::{AbsoluteAxisCode, EventType, SynchronizationCode};
use log::{debug, info, warn};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::{thread, time::Duration, time::Instant};

use crate::config::Thresholds;
use crate::dispatch::{GestureListener, LogListener};
use crate::engine::GestureEngine;
use crate::gestures::GestureEvent;
use crate::input::{self, MtAccumulator};

/// Feed a recorded session through the engine, writing each event as one
/// JSON line. Returns the number of events written.
pub fn run_replay(
    th: &Thresholds,
    reader: impl BufRead,
    out: impl Write + 'static,
) -> Result<usize> {
    let ticks = input::read_ticks(reader)?;
    info!("replaying {} ticks", ticks.len());

    let mut engine = GestureEngine::new(th);
    engine.register(JsonLines::new(out));

    let mut total = 0;
    for tick in &ticks {
        total += engine.update(tick);
    }
    Ok(total)
}

struct JsonLines<W: Write> {
    out: W,
    failed: bool,
}

impl<W: Write> JsonLines<W> {
    fn new(out: W) -> Self {
        Self { out, failed: false }
    }
}

impl<W: Write> GestureListener for JsonLines<W> {
    fn on_gesture(&mut self, event: &GestureEvent) {
        if self.failed {
            return;
        }
        let res = serde_json::to_writer(&mut self.out, event)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"));
        if let Err(e) = res {
            warn!("event output failed, further events dropped: {e}");
            self.failed = true;
        }
    }
}

/// Drive the engine from a live multitouch device until `stop` is set.
pub fn run_watch(th: &Thresholds, device: Option<String>, stop: Arc<AtomicBool>) -> Result<()> {
    let path = match device {
        Some(p) => p,
        None => {
            let found = input::discover_multitouch();
            let first = found
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("no multitouch devices detected"))?;
            info!("using {} ({})", first.name, first.path);
            first.path
        }
    };

    let mut dev = input::open_multitouch(&path)?;
    if let Err(e) = dev.set_nonblocking(true) {
        warn!("could not make {path} non-blocking: {e}");
    }

    let mut engine = GestureEngine::new(th);
    engine.register(LogListener);
    let mut acc = MtAccumulator::new();
    let start = Instant::now();

    info!("watching {path}; ctrl-c to stop");
    while !stop.load(Ordering::Relaxed) {
        let mut any_event = false;
        if let Ok(events) = dev.fetch_events() {
            for ev in events {
                any_event = true;
                if ev.event_type() == EventType::ABSOLUTE {
                    match ev.code() {
                        c if c == AbsoluteAxisCode::ABS_MT_SLOT.0 => acc.on_slot(ev.value()),
                        c if c == AbsoluteAxisCode::ABS_MT_TRACKING_ID.0 => {
                            acc.on_tracking_id(ev.value())
                        }
                        c if c == AbsoluteAxisCode::ABS_MT_POSITION_X.0 => acc.on_pos_x(ev.value()),
                        c if c == AbsoluteAxisCode::ABS_MT_POSITION_Y.0 => acc.on_pos_y(ev.value()),
                        _ => {}
                    }
                } else if ev.event_type() == EventType::SYNCHRONIZATION
                    && ev.code() == SynchronizationCode::SYN_REPORT.0
                {
                    let tick = acc.on_syn_report(start.elapsed().as_secs_f32());
                    let n = engine.update(&tick);
                    if n > 0 {
                        debug!(
                            "{} events; active contacts {:?}",
                            n,
                            acc.active_tracking_ids()
                        );
                    }
                }
            }
        }
        if !any_event {
            thread::sleep(Duration::from_millis(4));
        }
    }
    info!("watch stopped");
    Ok(())
}
