//! Log sampling for high-volume scenarios
//!
//! [`Sampler`] wraps another core and caps the CPU and I/O spent on
//! repetitive messages. Within each tick, the first `first` entries with a
//! given level and message are logged, then every `thereafter`-th entry after
//! that. Everything else is dropped.
//!
//! Counting is approximate on purpose: messages are bucketed by a hash into a
//! fixed table per level, so distinct messages can collide and share a count.
//!
//! # Example
//!
//! ```
//! use rust_logger_core::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let sink = Arc::new(rust_logger_core::sinks::lock(Vec::new()));
//! let core = new_core(JsonEncoder::new(EncoderConfig::production()), sink, Level::Info);
//!
//! // Log the first 100 identical messages per second, then every 100th
//! let sampled = Sampler::builder(core)
//!     .tick(Duration::from_secs(1))
//!     .first(100)
//!     .thereafter(100)
//!     .build();
//! assert_eq!(sampled.metrics().total_count(), 0);
//! ```

use super::entry::{CheckedEntry, Entry};
use super::error::Result;
use super::field::Field;
use super::level::{Level, LevelEnabler};
use super::log_core::Core;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters kept per level.
const COUNTERS_PER_LEVEL: usize = 4096;

/// Configuration for log sampling
///
/// # Example
///
/// ```
/// use rust_logger_core::SamplingConfig;
///
/// let config: SamplingConfig =
///     serde_json::from_str(r#"{"tickMs": 500, "first": 10, "thereafter": 50}"#).unwrap();
/// assert_eq!(config.first, 10);
/// assert!(!config.report);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplingConfig {
    /// Length of a sampling window in milliseconds
    pub tick_ms: u64,

    /// Entries logged per window before sampling kicks in
    pub first: u64,

    /// After `first`, log every `thereafter`-th entry. Zero drops them all.
    pub thereafter: u64,

    /// Emit a summary of dropped entries at the start of each new window
    pub report: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            first: 100,
            thereafter: 100,
            report: false,
        }
    }
}

impl SamplingConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Outcome of a sampling decision, passed to the sampler hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingDecision {
    Sampled,
    Dropped,
}

/// Observes every sampling decision.
pub type SamplerHook = Arc<dyn Fn(&Entry, SamplingDecision) + Send + Sync>;

/// Metrics for sampling observability
///
/// Tracks how many logs were sampled vs dropped, allowing monitoring
/// of sampling effectiveness.
///
/// # Example
///
/// ```
/// use rust_logger_core::SamplerMetrics;
///
/// let metrics = SamplerMetrics::new();
/// assert_eq!(metrics.sampled_count(), 0);
/// assert_eq!(metrics.dropped_count(), 0);
/// ```
#[derive(Debug)]
pub struct SamplerMetrics {
    sampled_count: AtomicU64,
    dropped_count: AtomicU64,
    total_count: AtomicU64,
}

impl SamplerMetrics {
    pub const fn new() -> Self {
        Self {
            sampled_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            total_count: AtomicU64::new(0),
        }
    }

    /// Get the number of sampled (logged) entries
    #[inline]
    pub fn sampled_count(&self) -> u64 {
        self.sampled_count.load(Ordering::Relaxed)
    }

    /// Get the number of dropped entries
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Get the total number of entries processed
    #[inline]
    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_sampled(&self) {
        self.sampled_count.fetch_add(1, Ordering::Relaxed);
        self.total_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
        self.total_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the effective sample rate based on actual sampling
    ///
    /// Returns 1.0 if no logs have been processed yet.
    pub fn effective_sample_rate(&self) -> f64 {
        let sampled = self.sampled_count() as f64;
        let total = self.total_count() as f64;

        if total == 0.0 {
            1.0
        } else {
            sampled / total
        }
    }
}

impl Default for SamplerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A windowed counter for one (level, message hash) bucket.
#[derive(Debug, Default)]
struct Counter {
    reset_at: AtomicI64,
    count: AtomicU64,
}

impl Counter {
    /// Count one entry at `now` (nanoseconds).
    ///
    /// Returns the count within the current window and, when this call
    /// opened a new window, the final count of the previous one.
    fn inc_check_reset(&self, now: i64, tick: i64) -> (u64, Option<u64>) {
        let reset_after = self.reset_at.load(Ordering::Acquire);
        if reset_after > now {
            return (self.count.fetch_add(1, Ordering::AcqRel) + 1, None);
        }

        let previous = self.count.swap(1, Ordering::AcqRel);
        let new_reset_after = now.saturating_add(tick);
        if self
            .reset_at
            .compare_exchange(reset_after, new_reset_after, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // another thread opened the window first
            return (self.count.fetch_add(1, Ordering::AcqRel) + 1, None);
        }
        (1, Some(previous))
    }
}

struct Counters {
    table: Box<[Counter]>,
}

impl Counters {
    fn new() -> Self {
        let table = (0..Level::COUNT * COUNTERS_PER_LEVEL)
            .map(|_| Counter::default())
            .collect();
        Self { table }
    }

    fn get(&self, level: Level, message: &str) -> &Counter {
        let bucket = fnv32a(message) as usize % COUNTERS_PER_LEVEL;
        &self.table[level.index() * COUNTERS_PER_LEVEL + bucket]
    }
}

/// 32-bit FNV-1a
fn fnv32a(s: &str) -> u32 {
    const OFFSET32: u32 = 2_166_136_261;
    const PRIME32: u32 = 16_777_619;

    let mut hash = OFFSET32;
    for b in s.bytes() {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(PRIME32);
    }
    hash
}

/// A core that samples entries before handing them to an inner core.
///
/// Children created with [`with`](Core::with) share the parent's counters,
/// so adding context does not reset the sampling budget.
pub struct Sampler {
    inner: Arc<dyn Core>,
    counts: Arc<Counters>,
    metrics: Arc<SamplerMetrics>,
    tick: Duration,
    first: u64,
    thereafter: u64,
    hook: Option<SamplerHook>,
    report: bool,
}

impl Sampler {
    /// A sampler with no hook and no drop reporting.
    pub fn new(inner: Arc<dyn Core>, tick: Duration, first: u64, thereafter: u64) -> Arc<Self> {
        Self::builder(inner)
            .tick(tick)
            .first(first)
            .thereafter(thereafter)
            .build()
    }

    pub fn from_config(inner: Arc<dyn Core>, config: &SamplingConfig) -> Arc<Self> {
        Self::builder(inner)
            .tick(config.tick())
            .first(config.first)
            .thereafter(config.thereafter)
            .reporting(config.report)
            .build()
    }

    pub fn builder(inner: Arc<dyn Core>) -> SamplerBuilder {
        SamplerBuilder {
            inner,
            tick: Duration::from_secs(1),
            first: 100,
            thereafter: 100,
            hook: None,
            report: false,
        }
    }

    /// Decision counters shared by this sampler and its children.
    pub fn metrics(&self) -> &SamplerMetrics {
        &self.metrics
    }

    fn tick_nanos(&self) -> i64 {
        i64::try_from(self.tick.as_nanos()).unwrap_or(i64::MAX)
    }

    fn is_dropped(&self, n: u64) -> bool {
        n > self.first && (self.thereafter == 0 || (n - self.first) % self.thereafter != 0)
    }

    fn decide(&self, entry: &Entry, decision: SamplingDecision) {
        match decision {
            SamplingDecision::Sampled => self.metrics.record_sampled(),
            SamplingDecision::Dropped => self.metrics.record_dropped(),
        }
        if let Some(hook) = &self.hook {
            hook(entry, decision);
        }
    }

    /// Entries dropped from a window that ended with `count` entries.
    fn dropped_in_window(&self, count: u64) -> u64 {
        let over = count.saturating_sub(self.first);
        if self.thereafter == 0 {
            over
        } else {
            over - over / self.thereafter
        }
    }

    fn report_dropped(&self, entry: &Entry, previous: u64) {
        if previous <= self.first {
            return;
        }
        let summary = Entry {
            level: Level::Info,
            time: entry.time,
            logger_name: entry.logger_name.clone(),
            message: "sampler dropped log messages".to_string(),
            caller: None,
            stack: String::new(),
        };
        let fields = [
            Field::string("sampledMessage", entry.message.clone()),
            Field::string("sampledLevel", entry.level.as_str()),
            Field::u64("dropped", self.dropped_in_window(previous)),
        ];
        if let Some(mut checked) = Arc::clone(&self.inner).check(&summary, None) {
            // write failures are already reported by the checked entry
            let _ = checked.write(&fields);
        }
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("tick", &self.tick)
            .field("first", &self.first)
            .field("thereafter", &self.thereafter)
            .field("report", &self.report)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl LevelEnabler for Sampler {
    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }
}

impl Core for Sampler {
    fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
        Arc::new(Sampler {
            inner: self.inner.with(fields),
            counts: Arc::clone(&self.counts),
            metrics: Arc::clone(&self.metrics),
            tick: self.tick,
            first: self.first,
            thereafter: self.thereafter,
            hook: self.hook.clone(),
            report: self.report,
        })
    }

    fn check(self: Arc<Self>, entry: &Entry, checked: Option<CheckedEntry>) -> Option<CheckedEntry> {
        if !self.enabled(entry.level) {
            return checked;
        }

        let now = entry
            .time
            .timestamp_nanos_opt()
            .unwrap_or_else(|| entry.time.timestamp().saturating_mul(1_000_000_000));
        let counter = self.counts.get(entry.level, &entry.message);
        let (n, previous) = counter.inc_check_reset(now, self.tick_nanos());

        if self.report {
            if let Some(previous) = previous {
                self.report_dropped(entry, previous);
            }
        }

        if self.is_dropped(n) {
            self.decide(entry, SamplingDecision::Dropped);
            return checked;
        }
        self.decide(entry, SamplingDecision::Sampled);
        Arc::clone(&self.inner).check(entry, checked)
    }

    fn write(&self, entry: &Entry, fields: &[Field]) -> Result<()> {
        self.inner.write(entry, fields)
    }

    fn sync(&self) -> Result<()> {
        self.inner.sync()
    }
}

/// Builder for [`Sampler`].
pub struct SamplerBuilder {
    inner: Arc<dyn Core>,
    tick: Duration,
    first: u64,
    thereafter: u64,
    hook: Option<SamplerHook>,
    report: bool,
}

impl SamplerBuilder {
    #[must_use]
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[must_use]
    pub fn first(mut self, first: u64) -> Self {
        self.first = first;
        self
    }

    #[must_use]
    pub fn thereafter(mut self, thereafter: u64) -> Self {
        self.thereafter = thereafter;
        self
    }

    /// Observe every sampling decision.
    #[must_use]
    pub fn hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Entry, SamplingDecision) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Emit a summary entry at Info when a window that dropped entries ends.
    #[must_use]
    pub fn reporting(mut self, report: bool) -> Self {
        self.report = report;
        self
    }

    /// # Panics
    ///
    /// With reporting enabled, panics if the inner core does not accept
    /// `Info` entries, since the summaries could never be written.
    pub fn build(self) -> Arc<Sampler> {
        if self.report && !self.inner.enabled(Level::Info) {
            panic!("sampler drop reporting requires the inner core to enable the info level");
        }
        Arc::new(Sampler {
            inner: self.inner,
            counts: Arc::new(Counters::new()),
            metrics: Arc::new(SamplerMetrics::new()),
            tick: self.tick,
            first: self.first,
            thereafter: self.thereafter,
            hook: self.hook,
            report: self.report,
        })
    }
}
