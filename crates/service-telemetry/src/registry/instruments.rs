//! In-process instrumentation primitives.
//!
//! All instruments are safe to update from any thread while a report cycle
//! is reading them.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Monotonic-by-convention integer count.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn dec(&self, n: i64) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    #[must_use]
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Integer value that can go up or down.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    #[must_use]
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Floating point value that can go up or down.
#[derive(Debug)]
pub struct GaugeFloat64 {
    bits: AtomicU64,
}

impl Default for GaugeFloat64 {
    fn default() -> Self {
        Self {
            bits: AtomicU64::new(0.0_f64.to_bits()),
        }
    }
}

impl GaugeFloat64 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Running statistics, accumulated with Welford's method.
#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    count: i64,
    min: i64,
    max: i64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn observe(&mut self, value: i64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        let delta = value as f64 - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value as f64 - self.mean);
    }

    fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }
}

/// Point-in-time read of a [`Timer`]. Durations are in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimerSnapshot {
    pub count: i64,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    pub stddev: f64,
    pub variance: f64,
}

/// Duration distribution.
#[derive(Debug, Default)]
pub struct Timer {
    stats: Mutex<RunningStats>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one duration.
    pub fn update(&self, elapsed: Duration) {
        let nanos = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        self.stats.lock().observe(nanos);
    }

    /// Record the duration since `start`.
    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Run `f` and record how long it took.
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.update_since(start);
        result
    }

    /// Start a guard that records the elapsed time when dropped.
    #[must_use]
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            timer: self,
            start: Instant::now(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> TimerSnapshot {
        let stats = *self.stats.lock();
        let variance = stats.variance();
        TimerSnapshot {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean,
            stddev: variance.sqrt(),
            variance,
        }
    }
}

/// Records into its [`Timer`] on drop.
pub struct TimerGuard<'a> {
    timer: &'a Timer,
    start: Instant,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.update_since(self.start);
    }
}

/// Point-in-time read of a [`Histogram`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistogramSnapshot {
    pub count: i64,
    pub sum: f64,
}

impl HistogramSnapshot {
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Distribution of arbitrary integer samples.
#[derive(Debug, Default)]
pub struct Histogram {
    stats: Mutex<RunningStats>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: i64) {
        self.stats.lock().observe(value);
    }

    #[must_use]
    pub fn snapshot(&self) -> HistogramSnapshot {
        let stats = *self.stats.lock();
        HistogramSnapshot {
            count: stats.count,
            sum: stats.mean * stats.count as f64,
        }
    }
}

/// Point-in-time read of a [`Meter`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterSnapshot {
    pub count: i64,
    /// Events per second since the meter was created.
    pub rate_mean: f64,
}

/// Event rate.
#[derive(Debug)]
pub struct Meter {
    count: AtomicI64,
    started: Instant,
}

impl Default for Meter {
    fn default() -> Self {
        Self {
            count: AtomicI64::new(0),
            started: Instant::now(),
        }
    }
}

impl Meter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MeterSnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let elapsed = self.started.elapsed().as_secs_f64();
        MeterSnapshot {
            count,
            rate_mean: if elapsed > 0.0 { count as f64 / elapsed } else { 0.0 },
        }
    }
}
