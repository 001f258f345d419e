//! Encoder configuration
//!
//! Controls the key names used for the fixed entry metadata and how levels,
//! timestamps, durations, callers and logger names are rendered. All types
//! here are serde-friendly so the configuration can be loaded from a file by
//! higher layers.

use super::PrimitiveArrayEncoder;
use crate::core::entry::EntryCaller;
use crate::core::level::Level;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

/// How the level is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelEncoder {
    /// `info`
    #[default]
    Lowercase,
    /// `INFO`
    Capital,
    /// `info` wrapped in ANSI color codes
    #[serde(rename = "color")]
    LowercaseColor,
    /// `INFO` wrapped in ANSI color codes
    CapitalColor,
}

impl LevelEncoder {
    pub fn encode(&self, level: Level, enc: &mut dyn PrimitiveArrayEncoder) {
        match self {
            LevelEncoder::Lowercase => enc.append_str(level.as_str()),
            LevelEncoder::Capital => enc.append_str(level.capital_str()),
            LevelEncoder::LowercaseColor => enc.append_str(&colorize(level, level.as_str())),
            LevelEncoder::CapitalColor => enc.append_str(&colorize(level, level.capital_str())),
        }
    }
}

#[cfg(feature = "color")]
fn colorize(level: Level, text: &str) -> String {
    use colored::Colorize;
    text.color(level.color()).to_string()
}

#[cfg(not(feature = "color"))]
fn colorize(_level: Level, text: &str) -> String {
    text.to_string()
}

/// How timestamps are rendered.
///
/// # Examples
///
/// ```
/// use rust_logger_core::encoders::TimeEncoder;
///
/// // Apache log format
/// let format = TimeEncoder::Layout("%d/%b/%Y:%H:%M:%S %z".to_string());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeEncoder {
    /// Floating-point seconds since the Unix epoch: `1736332245.123456`
    #[default]
    Epoch,
    /// Floating-point milliseconds since the Unix epoch: `1736332245123.456`
    Millis,
    /// Integer nanoseconds since the Unix epoch
    Nanos,
    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    #[serde(alias = "ISO8601")]
    Iso8601,
    /// RFC 3339 with second precision: `2025-01-08T10:30:45Z`
    #[serde(alias = "RFC3339")]
    Rfc3339,
    /// RFC 3339 with trailing zeros trimmed: `2025-01-08T10:30:45.123456Z`
    #[serde(alias = "rfc3339nano", alias = "RFC3339Nano")]
    Rfc3339Nano,
    /// Custom strftime layout. Invalid layouts fall back to RFC 3339.
    Layout(String),
}

impl TimeEncoder {
    pub fn encode(&self, t: DateTime<Utc>, enc: &mut dyn PrimitiveArrayEncoder) {
        match self {
            TimeEncoder::Epoch => {
                let secs = t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1e9;
                enc.append_f64(secs);
            }
            TimeEncoder::Millis => {
                let sub_millis = f64::from(t.timestamp_subsec_nanos() % 1_000_000) / 1e6;
                enc.append_f64(t.timestamp_millis() as f64 + sub_millis);
            }
            TimeEncoder::Nanos => enc.append_i64(
                t.timestamp_nanos_opt()
                    .unwrap_or_else(|| t.timestamp().saturating_mul(1_000_000_000)),
            ),
            TimeEncoder::Iso8601 => {
                enc.append_str(&t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            }
            TimeEncoder::Rfc3339 => enc.append_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            TimeEncoder::Rfc3339Nano => {
                enc.append_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            TimeEncoder::Layout(layout) => {
                let mut out = String::new();
                if write!(out, "{}", t.format(layout)).is_err() {
                    out = t.to_rfc3339_opts(SecondsFormat::Secs, true);
                }
                enc.append_str(&out);
            }
        }
    }
}

/// How durations are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DurationEncoder {
    /// Floating-point seconds: `1.5`
    #[default]
    Seconds,
    /// Integer nanoseconds: `1500000000`
    Nanos,
    /// Floating-point milliseconds: `1500`
    #[serde(rename = "ms", alias = "millis")]
    Millis,
    /// Human-readable: `1.5s`
    String,
}

impl DurationEncoder {
    pub fn encode(&self, d: Duration, enc: &mut dyn PrimitiveArrayEncoder) {
        match self {
            DurationEncoder::Seconds => enc.append_f64(d.as_secs_f64()),
            DurationEncoder::Nanos => {
                enc.append_i64(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
            }
            DurationEncoder::Millis => enc.append_f64(d.as_secs_f64() * 1e3),
            DurationEncoder::String => enc.append_str(&format!("{:?}", d)),
        }
    }
}

/// How the caller location is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallerEncoder {
    /// Last directory and file name: `core/io_core.rs:42`
    #[default]
    Short,
    /// Full source path: `/src/app/core/io_core.rs:42`
    Full,
}

impl CallerEncoder {
    pub fn encode(&self, caller: &EntryCaller, enc: &mut dyn PrimitiveArrayEncoder) {
        match self {
            CallerEncoder::Short => enc.append_str(&caller.trimmed_path()),
            CallerEncoder::Full => enc.append_str(&caller.full_path()),
        }
    }
}

/// How logger names are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NameEncoder {
    #[default]
    Full,
}

impl NameEncoder {
    pub fn encode(&self, name: &str, enc: &mut dyn PrimitiveArrayEncoder) {
        match self {
            NameEncoder::Full => enc.append_str(name),
        }
    }
}

/// Key names and value renderers shared by the built-in encoders.
///
/// An empty key omits that piece of metadata from the output entirely.
///
/// # Example
///
/// ```
/// use rust_logger_core::encoders::{EncoderConfig, TimeEncoder};
///
/// let config = EncoderConfig::production()
///     .with_time_encoder(TimeEncoder::Iso8601)
///     .with_message_key("message");
/// assert_eq!(config.level_key, "level");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoderConfig {
    pub message_key: String,
    pub level_key: String,
    pub time_key: String,
    pub name_key: String,
    pub caller_key: String,
    pub function_key: String,
    pub stacktrace_key: String,
    pub skip_line_ending: bool,
    /// Terminator for each entry. Empty means `\n`.
    pub line_ending: String,
    #[serde(rename = "levelEncoder")]
    pub encode_level: LevelEncoder,
    #[serde(rename = "timeEncoder")]
    pub encode_time: TimeEncoder,
    #[serde(rename = "durationEncoder")]
    pub encode_duration: DurationEncoder,
    #[serde(rename = "callerEncoder")]
    pub encode_caller: CallerEncoder,
    #[serde(rename = "nameEncoder")]
    pub encode_name: NameEncoder,
    /// Separator between the console encoder's preamble elements. Empty means tab.
    pub console_separator: String,
}

impl EncoderConfig {
    /// Short lowercase keys, epoch timestamps and lowercase levels.
    pub fn production() -> Self {
        Self {
            message_key: "msg".to_string(),
            level_key: "level".to_string(),
            time_key: "ts".to_string(),
            name_key: "logger".to_string(),
            caller_key: "caller".to_string(),
            function_key: String::new(),
            stacktrace_key: "stacktrace".to_string(),
            skip_line_ending: false,
            line_ending: "\n".to_string(),
            encode_level: LevelEncoder::Lowercase,
            encode_time: TimeEncoder::Epoch,
            encode_duration: DurationEncoder::Seconds,
            encode_caller: CallerEncoder::Short,
            encode_name: NameEncoder::Full,
            console_separator: "\t".to_string(),
        }
    }

    /// Single-letter keys, capital levels, ISO 8601 timestamps and
    /// human-readable durations.
    pub fn development() -> Self {
        Self {
            message_key: "M".to_string(),
            level_key: "L".to_string(),
            time_key: "T".to_string(),
            name_key: "N".to_string(),
            caller_key: "C".to_string(),
            function_key: String::new(),
            stacktrace_key: "S".to_string(),
            encode_level: LevelEncoder::Capital,
            encode_time: TimeEncoder::Iso8601,
            encode_duration: DurationEncoder::String,
            ..Self::production()
        }
    }

    /// The terminator actually written after each entry.
    #[must_use]
    pub fn line_ending(&self) -> &str {
        if self.skip_line_ending {
            ""
        } else if self.line_ending.is_empty() {
            "\n"
        } else {
            &self.line_ending
        }
    }

    /// The separator actually used between console preamble elements.
    #[must_use]
    pub fn console_separator(&self) -> &str {
        if self.console_separator.is_empty() {
            "\t"
        } else {
            &self.console_separator
        }
    }

    pub fn with_message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = key.into();
        self
    }

    pub fn with_level_key(mut self, key: impl Into<String>) -> Self {
        self.level_key = key.into();
        self
    }

    pub fn with_time_key(mut self, key: impl Into<String>) -> Self {
        self.time_key = key.into();
        self
    }

    pub fn with_name_key(mut self, key: impl Into<String>) -> Self {
        self.name_key = key.into();
        self
    }

    pub fn with_caller_key(mut self, key: impl Into<String>) -> Self {
        self.caller_key = key.into();
        self
    }

    pub fn with_function_key(mut self, key: impl Into<String>) -> Self {
        self.function_key = key.into();
        self
    }

    pub fn with_stacktrace_key(mut self, key: impl Into<String>) -> Self {
        self.stacktrace_key = key.into();
        self
    }

    pub fn with_line_ending(mut self, ending: impl Into<String>) -> Self {
        self.line_ending = ending.into();
        self
    }

    pub fn with_skip_line_ending(mut self, skip: bool) -> Self {
        self.skip_line_ending = skip;
        self
    }

    pub fn with_level_encoder(mut self, encoder: LevelEncoder) -> Self {
        self.encode_level = encoder;
        self
    }

    pub fn with_time_encoder(mut self, encoder: TimeEncoder) -> Self {
        self.encode_time = encoder;
        self
    }

    pub fn with_duration_encoder(mut self, encoder: DurationEncoder) -> Self {
        self.encode_duration = encoder;
        self
    }

    pub fn with_caller_encoder(mut self, encoder: CallerEncoder) -> Self {
        self.encode_caller = encoder;
        self
    }

    pub fn with_console_separator(mut self, separator: impl Into<String>) -> Self {
        self.console_separator = separator.into();
        self
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::production()
    }
}
