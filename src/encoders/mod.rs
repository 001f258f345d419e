//! Encoders turn entries and fields into bytes
//!
//! Field values reach an encoder through [`ObjectEncoder`] (keyed) and
//! [`ArrayEncoder`] (positional). A full [`Encoder`] additionally renders a
//! complete entry and can be cloned to carry accumulated context.

pub mod buffer;
pub mod config;
pub mod console;
pub mod json;
pub mod logfmt;
pub mod memory;

pub use buffer::{Buffer, BufferPool};
pub use config::{
    CallerEncoder, DurationEncoder, EncoderConfig, LevelEncoder, NameEncoder, TimeEncoder,
};
pub use console::ConsoleEncoder;
pub use json::JsonEncoder;
pub use logfmt::LogfmtEncoder;
pub use memory::{MapObjectEncoder, SliceArrayEncoder};

use crate::core::entry::Entry;
use crate::core::error::Result;
use crate::core::field::{Field, Reflected};
use crate::core::marshaler::{ArrayMarshaler, ObjectMarshaler};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Positional writer for primitive values.
///
/// This is all the level, time, duration, caller and name encoders need, so
/// they also work against the console encoder's delimited preamble.
pub trait PrimitiveArrayEncoder {
    fn append_bool(&mut self, value: bool);
    fn append_byte_string(&mut self, value: &[u8]);
    fn append_f64(&mut self, value: f64);
    fn append_f32(&mut self, value: f32);
    fn append_i64(&mut self, value: i64);
    fn append_u64(&mut self, value: u64);
    fn append_str(&mut self, value: &str);
}

/// Positional writer for arbitrary values.
pub trait ArrayEncoder: PrimitiveArrayEncoder {
    fn append_duration(&mut self, value: Duration);
    fn append_time(&mut self, value: DateTime<Utc>);
    fn append_array(&mut self, value: &dyn ArrayMarshaler) -> Result<()>;
    fn append_object(&mut self, value: &dyn ObjectMarshaler) -> Result<()>;
    fn append_reflected(&mut self, value: &dyn Reflected) -> Result<()>;
}

/// Keyed writer for field values.
pub trait ObjectEncoder {
    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()>;
    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()>;
    fn add_binary(&mut self, key: &str, value: &[u8]);
    fn add_byte_string(&mut self, key: &str, value: &[u8]);
    fn add_bool(&mut self, key: &str, value: bool);
    fn add_duration(&mut self, key: &str, value: Duration);
    fn add_f64(&mut self, key: &str, value: f64);
    fn add_f32(&mut self, key: &str, value: f32);
    fn add_i64(&mut self, key: &str, value: i64);
    fn add_u64(&mut self, key: &str, value: u64);
    /// Serialize an arbitrary value. Nothing is written if serialization fails.
    fn add_reflected(&mut self, key: &str, value: &dyn Reflected) -> Result<()>;
    /// Nest every subsequent field under `key` until the enclosing object ends.
    fn open_namespace(&mut self, key: &str);
    fn add_str(&mut self, key: &str, value: &str);
    fn add_time(&mut self, key: &str, value: DateTime<Utc>);
}

/// A complete entry encoder.
///
/// Fields added through the [`ObjectEncoder`] methods become context that is
/// emitted with every entry this encoder renders afterwards.
pub trait Encoder: ObjectEncoder + Send + Sync {
    /// Deep copy, including accumulated context.
    fn clone_encoder(&self) -> Box<dyn Encoder>;

    /// Render `entry` and `fields` into a fresh buffer.
    ///
    /// Context already held by the encoder is emitted before `fields`. The
    /// encoder itself is left unchanged.
    fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> Result<Buffer>;

    fn as_object_encoder(&mut self) -> &mut dyn ObjectEncoder;
}
