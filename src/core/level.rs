//! Log levels and level enablers

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI8, Ordering};
use std::sync::Arc;

/// Severity of a log entry. Higher is more important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(i8)]
pub enum Level {
    Debug = -1,
    #[default]
    Info = 0,
    Warn = 1,
    Error = 2,
    /// Like `Error`, but a higher layer may choose to panic in development.
    DPanic = 3,
    Panic = 4,
    Fatal = 5,
}

impl Level {
    /// All levels in ascending order of severity.
    pub const ALL: [Level; 7] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::DPanic,
        Level::Panic,
        Level::Fatal,
    ];

    /// Number of distinct levels.
    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::DPanic => "dpanic",
            Level::Panic => "panic",
            Level::Fatal => "fatal",
        }
    }

    pub fn capital_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::DPanic => "DPANIC",
            Level::Panic => "PANIC",
            Level::Fatal => "FATAL",
        }
    }

    #[cfg(feature = "color")]
    pub fn color(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            Level::Debug => Magenta,
            Level::Info => Blue,
            Level::Warn => Yellow,
            Level::Error | Level::DPanic | Level::Panic | Level::Fatal => Red,
        }
    }

    /// Zero-based position of this level, used to index per-level tables.
    #[inline]
    pub fn index(&self) -> usize {
        (*self as i8 - Level::Debug as i8) as usize
    }

    fn from_i8(value: i8) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| *l as i8 == value)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" | "" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "dpanic" => Ok(Level::DPanic),
            "panic" => Ok(Level::Panic),
            "fatal" => Ok(Level::Fatal),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Decides whether a given level is logged.
pub trait LevelEnabler: Send + Sync {
    fn enabled(&self, level: Level) -> bool;
}

/// A plain `Level` enables itself and everything more severe.
impl LevelEnabler for Level {
    #[inline]
    fn enabled(&self, level: Level) -> bool {
        level >= *self
    }
}

impl<T: LevelEnabler + ?Sized> LevelEnabler for Arc<T> {
    fn enabled(&self, level: Level) -> bool {
        (**self).enabled(level)
    }
}

/// Adapts a closure into a [`LevelEnabler`].
pub struct LevelEnablerFn<F>(pub F);

impl<F> LevelEnabler for LevelEnablerFn<F>
where
    F: Fn(Level) -> bool + Send + Sync,
{
    fn enabled(&self, level: Level) -> bool {
        (self.0)(level)
    }
}

/// Minimum level enabled by `enabler`, or `None` if nothing is enabled.
pub fn level_of(enabler: &dyn LevelEnabler) -> Option<Level> {
    Level::ALL.iter().copied().find(|l| enabler.enabled(*l))
}

/// A level that can be changed at runtime and shared between cores.
///
/// Clones share the same underlying value.
///
/// # Example
///
/// ```
/// use rust_logger_core::{AtomicLevel, Level, LevelEnabler};
///
/// let level = AtomicLevel::new(Level::Info);
/// assert!(!level.enabled(Level::Debug));
///
/// level.set_level(Level::Debug);
/// assert!(level.enabled(Level::Debug));
/// ```
#[derive(Debug, Clone)]
pub struct AtomicLevel {
    level: Arc<AtomicI8>,
}

impl AtomicLevel {
    pub fn new(level: Level) -> Self {
        Self {
            level: Arc::new(AtomicI8::new(level as i8)),
        }
    }

    pub fn level(&self) -> Level {
        Level::from_i8(self.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as i8, Ordering::Relaxed);
    }
}

impl Default for AtomicLevel {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

impl LevelEnabler for AtomicLevel {
    #[inline]
    fn enabled(&self, level: Level) -> bool {
        self.level().enabled(level)
    }
}

impl fmt::Display for AtomicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.level().fmt(f)
    }
}

impl FromStr for AtomicLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(AtomicLevel::new)
    }
}
