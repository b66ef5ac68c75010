//! Progress reporting for long comparison loops.
//!
//! A [`ProgressCounter`] is shared by reference between worker threads; each
//! completed unit calls [`ProgressCounter::update`]. Reports fire when the
//! completed fraction crosses the next multiple of the trigger fraction, and
//! only one thread wins each crossing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Fires each time progress crosses another `fraction` of the total.
#[derive(Debug)]
pub struct PercentTrigger {
    fraction: f64,
    next: AtomicUsize,
}

impl PercentTrigger {
    pub fn new(fraction: f64) -> Self {
        let fraction = if fraction.is_finite() && fraction > 0.0 {
            fraction.min(1.0)
        } else {
            0.1
        };
        Self {
            fraction,
            next: AtomicUsize::new(0),
        }
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    fn step(&self, total: usize) -> usize {
        ((self.fraction * total as f64).ceil() as usize).max(1)
    }

    fn reset(&self, total: usize) {
        self.next.store(self.step(total), Ordering::Relaxed);
    }

    fn fire(&self, done: usize, total: usize) -> bool {
        let step = self.step(total);
        let mut next = self.next.load(Ordering::Relaxed);
        while done >= next {
            let after = (done / step + 1) * step;
            match self
                .next
                .compare_exchange(next, after, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(current) => next = current,
            }
        }
        false
    }
}

impl Default for PercentTrigger {
    fn default() -> Self {
        Self::new(0.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSink {
    Disabled,
    /// `log::info!` lines.
    Log,
    /// One JSON object per line on stderr.
    Ndjson,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub done: usize,
    pub total: usize,
    pub percent: f64,
    pub elapsed: Duration,
    pub remaining: Option<Duration>,
}

impl ProgressReport {
    fn to_json(&self, event: &str) -> String {
        serde_json::json!({
            "event": event,
            "done": self.done,
            "total": self.total,
            "percent": self.percent,
            "elapsed_ms": self.elapsed.as_millis() as u64,
            "remaining_ms": self.remaining.map(|r| r.as_millis() as u64),
        })
        .to_string()
    }
}

/// Estimating counter over a known number of work units.
#[derive(Debug)]
pub struct ProgressCounter {
    label: String,
    total: usize,
    done: AtomicUsize,
    trigger: PercentTrigger,
    sink: ProgressSink,
    start: Instant,
}

impl ProgressCounter {
    pub fn new(label: impl Into<String>, total: usize, trigger: PercentTrigger, sink: ProgressSink) -> Self {
        trigger.reset(total);
        Self {
            label: label.into(),
            total,
            done: AtomicUsize::new(0),
            trigger,
            sink,
            start: Instant::now(),
        }
    }

    pub fn disabled(total: usize) -> Self {
        Self::new("", total, PercentTrigger::default(), ProgressSink::Disabled)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn start(&mut self) {
        self.start = Instant::now();
        self.done.store(0, Ordering::Relaxed);
        self.trigger.reset(self.total);
        match self.sink {
            ProgressSink::Disabled => {}
            ProgressSink::Log => log::info!("{}: {} comparisons", self.label, self.total),
            ProgressSink::Ndjson => {
                let json = serde_json::json!({
                    "event": "started",
                    "label": self.label,
                    "total": self.total,
                });
                eprintln!("{json}");
            }
        }
    }

    /// Records one completed unit; returns the report if this update crossed
    /// a trigger threshold.
    pub fn update(&self) -> Option<ProgressReport> {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.trigger.fire(done, self.total) {
            return None;
        }
        let report = self.report(done);
        self.emit(&report, "progress");
        Some(report)
    }

    pub fn finish(&self) -> ProgressReport {
        let report = self.report(self.done());
        match self.sink {
            ProgressSink::Disabled => {}
            ProgressSink::Log => log::info!(
                "{}: finished {} of {} in {:.2}s",
                self.label,
                report.done,
                report.total,
                report.elapsed.as_secs_f64()
            ),
            ProgressSink::Ndjson => eprintln!("{}", report.to_json("finished")),
        }
        report
    }

    fn report(&self, done: usize) -> ProgressReport {
        let elapsed = self.start.elapsed();
        let percent = if self.total == 0 {
            100.0
        } else {
            100.0 * done as f64 / self.total as f64
        };
        let remaining = if done == 0 {
            None
        } else {
            let left = self.total.saturating_sub(done) as f64;
            Some(elapsed.mul_f64(left / done as f64))
        };
        ProgressReport {
            done,
            total: self.total,
            percent,
            elapsed,
            remaining,
        }
    }

    fn emit(&self, report: &ProgressReport, event: &str) {
        match self.sink {
            ProgressSink::Disabled => {}
            ProgressSink::Log => log::info!(
                "{}: {:.0}% ({}/{}), elapsed {:.1}s, remaining ~{:.1}s",
                self.label,
                report.percent,
                report.done,
                report.total,
                report.elapsed.as_secs_f64(),
                report.remaining.map(|r| r.as_secs_f64()).unwrap_or(0.0)
            ),
            ProgressSink::Ndjson => eprintln!("{}", report.to_json(event)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_tenth() {
        let mut counter = ProgressCounter::disabled(100);
        counter.start();
        let fired: Vec<usize> = (0..100)
            .filter_map(|_| counter.update().map(|r| r.done))
            .collect();
        assert_eq!(fired, vec![10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        assert_eq!(counter.finish().done, 100);
    }

    #[test]
    fn small_totals_fire_every_unit() {
        let counter = ProgressCounter::new("t", 3, PercentTrigger::new(0.1), ProgressSink::Disabled);
        let fired = (0..3).filter(|_| counter.update().is_some()).count();
        assert_eq!(fired, 3);
    }

    #[test]
    fn concurrent_updates_count_every_unit() {
        let counter = ProgressCounter::new("t", 4000, PercentTrigger::new(0.25), ProgressSink::Disabled);
        let fired = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        if counter.update().is_some() {
                            fired.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        assert_eq!(counter.done(), 4000);
        // late threads may merge two crossings into one report
        let fired = fired.load(Ordering::Relaxed);
        assert!((1..=4).contains(&fired), "fired {fired}");
    }

    #[test]
    fn json_report_is_well_formed() {
        let report = ProgressReport {
            done: 5,
            total: 10,
            percent: 50.0,
            elapsed: Duration::from_millis(1500),
            remaining: None,
        };
        let value: serde_json::Value = serde_json::from_str(&report.to_json("progress")).unwrap();
        assert_eq!(value["event"], "progress");
        assert_eq!(value["elapsed_ms"], 1500);
        assert!(value["remaining_ms"].is_null());
    }

    #[test]
    fn invalid_fraction_falls_back() {
        assert_eq!(PercentTrigger::new(0.0).fraction(), 0.1);
        assert_eq!(PercentTrigger::new(2.0).fraction(), 1.0);
    }
}
