use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Accumulates `-progress pipe:1` key/value pairs for one block.
#[derive(Debug, Default, Clone)]
pub struct ProgressState {
    pub out_time_secs: f64,
    pub finished: bool,
}

impl ProgressState {
    /// Feed one `key=value` pair. Returns true when a block is complete.
    pub fn update(&mut self, key: &str, value: &str) -> bool {
        match key {
            // both are microseconds despite the name
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<i64>() {
                    if us >= 0 {
                        self.out_time_secs = us as f64 / 1_000_000.0;
                    }
                }
                false
            }
            "out_time" => {
                if let Some(secs) = parse_clock(value) {
                    self.out_time_secs = secs;
                }
                false
            }
            "progress" => {
                self.finished = value.trim() == "end";
                true
            }
            _ => false,
        }
    }

    /// Completion fraction against an expected duration.
    pub fn fraction(&self, expected_duration: Option<f64>) -> Option<f64> {
        if self.finished {
            return Some(1.0);
        }
        let total = expected_duration?;
        (total > 0.0).then(|| (self.out_time_secs / total).clamp(0.0, 1.0))
    }
}

/// Parse `HH:MM:SS.micro` into seconds.
pub fn parse_clock(value: &str) -> Option<f64> {
    let mut parts = value.trim().split(':');
    let h: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let s: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || h < 0.0 || m < 0.0 || s < 0.0 {
        return None;
    }
    Some(h * 3600.0 + m * 60.0 + s)
}

/// Turns fractional progress into monotonically increasing integer percent.
pub struct ProgressReporter<'a> {
    callback: &'a (dyn Fn(u8) + Send + Sync),
    last: AtomicU8,
    started: AtomicBool,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(callback: &'a (dyn Fn(u8) + Send + Sync)) -> Self {
        Self {
            callback,
            last: AtomicU8::new(0),
            started: AtomicBool::new(false),
        }
    }

    /// Emit 0% once.
    pub fn start(&self) {
        if !self.started.swap(true, Ordering::SeqCst) {
            (self.callback)(0);
        }
    }

    pub fn report_fraction(&self, fraction: f64) {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self.report_percent((fraction * 100.0).round() as u8);
    }

    pub fn report_percent(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            self.start();
            (self.callback)(percent);
        }
    }

    pub fn finish(&self) {
        self.report_percent(100);
    }

    pub fn last_percent(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }
}
