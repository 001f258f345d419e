//! JSON encoder
//!
//! Produces one JSON object per entry, written straight into a pooled
//! [`Buffer`] without building an intermediate document. Strings are escaped
//! in place; invalid UTF-8 in byte strings becomes `�`.
//!
//! # Example
//!
//! ```
//! use rust_logger_core::encoders::{Encoder, EncoderConfig, JsonEncoder, ObjectEncoder};
//! use rust_logger_core::{Entry, Field, Level};
//! use chrono::{TimeZone, Utc};
//!
//! let mut enc = JsonEncoder::new(EncoderConfig::production());
//! enc.add_str("foo", "bar");
//!
//! let entry = Entry::new(Level::Info, "hello").with_time(Utc.timestamp_opt(0, 0).unwrap());
//! let buf = enc.encode_entry(&entry, &[]).unwrap();
//! assert_eq!(
//!     buf.as_string(),
//!     "{\"level\":\"info\",\"ts\":0,\"msg\":\"hello\",\"foo\":\"bar\"}\n"
//! );
//! ```

use super::buffer::{self, Buffer};
use super::config::EncoderConfig;
use super::{ArrayEncoder, Encoder, ObjectEncoder, PrimitiveArrayEncoder};
use crate::core::entry::Entry;
use crate::core::error::Result;
use crate::core::field::{add_fields, Field, Reflected};
use crate::core::marshaler::{self, ArrayMarshaler, ObjectMarshaler};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Encodes entries as single-line JSON objects.
pub struct JsonEncoder {
    config: Arc<EncoderConfig>,
    buf: Buffer,
    open_namespaces: usize,
}

impl JsonEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self::with_shared_config(Arc::new(config))
    }

    pub(crate) fn with_shared_config(config: Arc<EncoderConfig>) -> Self {
        Self {
            config,
            buf: buffer::get(),
            open_namespaces: 0,
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// The context accumulated so far, without the surrounding braces.
    pub fn context(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    pub(crate) fn clone_json(&self) -> JsonEncoder {
        JsonEncoder {
            config: Arc::clone(&self.config),
            buf: self.buf.clone(),
            open_namespaces: self.open_namespaces,
        }
    }

    pub(crate) fn into_buffer(self) -> Buffer {
        self.buf
    }

    pub(crate) fn close_open_namespaces(&mut self) {
        for _ in 0..self.open_namespaces {
            self.buf.append_byte(b'}');
        }
        self.open_namespaces = 0;
    }

    fn add_key(&mut self, key: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        write_escaped_str(&mut self.buf, key);
        self.buf.append_str("\":");
    }

    fn add_element_separator(&mut self) {
        match self.buf.last_byte() {
            None | Some(b'{') | Some(b'[') | Some(b':') | Some(b',') | Some(b' ') => {}
            Some(_) => self.buf.append_byte(b','),
        }
    }

    fn append_float(&mut self, f: f64) {
        self.add_element_separator();
        append_json_float(&mut self.buf, f, |buf| buf.append_f64(f));
    }

    fn write_reflected(&self, value: &dyn Reflected) -> Result<Buffer> {
        let mut scratch = buffer::get();
        value.encode_json(&mut scratch)?;
        scratch.trim_newline();
        Ok(scratch)
    }
}

/// Quote non-finite floats; JSON has no literal for them.
fn append_json_float(buf: &mut Buffer, f: f64, finite: impl FnOnce(&mut Buffer)) {
    if f.is_nan() {
        buf.append_str("\"NaN\"");
    } else if f == f64::INFINITY {
        buf.append_str("\"+Inf\"");
    } else if f == f64::NEG_INFINITY {
        buf.append_str("\"-Inf\"");
    } else {
        finite(buf);
    }
}

/// Append `s` with JSON string escaping, without the surrounding quotes.
pub(crate) fn write_escaped_str(buf: &mut Buffer, s: &str) {
    let bytes = s.as_bytes();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b >= 0x20 && b != b'\\' && b != b'"' {
            continue;
        }
        buf.append_bytes(&bytes[start..i]);
        write_escaped_byte(buf, b);
        start = i + 1;
    }
    buf.append_bytes(&bytes[start..]);
}

/// Like [`write_escaped_str`], replacing each invalid UTF-8 byte with `�`.
pub(crate) fn write_escaped_bytes(buf: &mut Buffer, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                write_escaped_str(buf, valid);
                return;
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    write_escaped_str(buf, valid);
                }
                buf.append_str("\\ufffd");
                bytes = &rest[1..];
            }
        }
    }
}

fn write_escaped_byte(buf: &mut Buffer, b: u8) {
    match b {
        b'\\' | b'"' => {
            buf.append_byte(b'\\');
            buf.append_byte(b);
        }
        b'\n' => buf.append_str("\\n"),
        b'\r' => buf.append_str("\\r"),
        b'\t' => buf.append_str("\\t"),
        _ => {
            buf.append_str("\\u00");
            buf.append_byte(HEX[usize::from(b >> 4)]);
            buf.append_byte(HEX[usize::from(b & 0xF)]);
        }
    }
}

impl PrimitiveArrayEncoder for JsonEncoder {
    fn append_bool(&mut self, value: bool) {
        self.add_element_separator();
        self.buf.append_bool(value);
    }

    fn append_byte_string(&mut self, value: &[u8]) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        write_escaped_bytes(&mut self.buf, value);
        self.buf.append_byte(b'"');
    }

    fn append_f64(&mut self, value: f64) {
        self.append_float(value);
    }

    fn append_f32(&mut self, value: f32) {
        self.add_element_separator();
        append_json_float(&mut self.buf, f64::from(value), |buf| buf.append_f32(value));
    }

    fn append_i64(&mut self, value: i64) {
        self.add_element_separator();
        self.buf.append_int(value);
    }

    fn append_u64(&mut self, value: u64) {
        self.add_element_separator();
        self.buf.append_uint(value);
    }

    fn append_str(&mut self, value: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        write_escaped_str(&mut self.buf, value);
        self.buf.append_byte(b'"');
    }
}

impl ArrayEncoder for JsonEncoder {
    fn append_duration(&mut self, value: Duration) {
        let encode = self.config.encode_duration;
        encode.encode(value, self);
    }

    fn append_time(&mut self, value: DateTime<Utc>) {
        let config = Arc::clone(&self.config);
        config.encode_time.encode(value, self);
    }

    fn append_array(&mut self, value: &dyn ArrayMarshaler) -> Result<()> {
        self.add_element_separator();
        self.buf.append_byte(b'[');
        let result = marshaler::marshal_array(value, self);
        self.buf.append_byte(b']');
        result
    }

    fn append_object(&mut self, value: &dyn ObjectMarshaler) -> Result<()> {
        // namespaces opened inside the object close with it
        let outer = std::mem::replace(&mut self.open_namespaces, 0);
        self.add_element_separator();
        self.buf.append_byte(b'{');
        let result = marshaler::marshal_object(value, self);
        self.close_open_namespaces();
        self.buf.append_byte(b'}');
        self.open_namespaces = outer;
        result
    }

    fn append_reflected(&mut self, value: &dyn Reflected) -> Result<()> {
        let scratch = self.write_reflected(value)?;
        self.add_element_separator();
        self.buf.append_bytes(&scratch);
        Ok(())
    }
}

impl ObjectEncoder for JsonEncoder {
    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()> {
        self.add_key(key);
        self.append_array(value)
    }

    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()> {
        self.add_key(key);
        self.append_object(value)
    }

    fn add_binary(&mut self, key: &str, value: &[u8]) {
        self.add_str(key, &BASE64.encode(value));
    }

    fn add_byte_string(&mut self, key: &str, value: &[u8]) {
        self.add_key(key);
        self.append_byte_string(value);
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.add_key(key);
        self.append_bool(value);
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.add_key(key);
        self.append_duration(value);
    }

    fn add_f64(&mut self, key: &str, value: f64) {
        self.add_key(key);
        self.append_f64(value);
    }

    fn add_f32(&mut self, key: &str, value: f32) {
        self.add_key(key);
        self.append_f32(value);
    }

    fn add_i64(&mut self, key: &str, value: i64) {
        self.add_key(key);
        self.append_i64(value);
    }

    fn add_u64(&mut self, key: &str, value: u64) {
        self.add_key(key);
        self.append_u64(value);
    }

    fn add_reflected(&mut self, key: &str, value: &dyn Reflected) -> Result<()> {
        let scratch = self.write_reflected(value)?;
        self.add_key(key);
        self.buf.append_bytes(&scratch);
        Ok(())
    }

    fn open_namespace(&mut self, key: &str) {
        self.add_key(key);
        self.buf.append_byte(b'{');
        self.open_namespaces += 1;
    }

    fn add_str(&mut self, key: &str, value: &str) {
        self.add_key(key);
        self.append_str(value);
    }

    fn add_time(&mut self, key: &str, value: DateTime<Utc>) {
        self.add_key(key);
        self.append_time(value);
    }
}

impl Encoder for JsonEncoder {
    fn clone_encoder(&self) -> Box<dyn Encoder> {
        Box::new(self.clone_json())
    }

    fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> Result<Buffer> {
        let config = Arc::clone(&self.config);
        let mut fin = JsonEncoder {
            config: Arc::clone(&config),
            buf: buffer::get(),
            open_namespaces: self.open_namespaces,
        };

        fin.buf.append_byte(b'{');
        if !config.level_key.is_empty() {
            fin.add_key(&config.level_key);
            config.encode_level.encode(entry.level, &mut fin);
        }
        if !config.time_key.is_empty() {
            fin.add_time(&config.time_key, entry.time);
        }
        if !entry.logger_name.is_empty() && !config.name_key.is_empty() {
            fin.add_key(&config.name_key);
            config.encode_name.encode(&entry.logger_name, &mut fin);
        }
        if let Some(caller) = &entry.caller {
            if !config.caller_key.is_empty() {
                fin.add_key(&config.caller_key);
                config.encode_caller.encode(caller, &mut fin);
            }
            if !config.function_key.is_empty() {
                fin.add_str(&config.function_key, &caller.function);
            }
        }
        if !config.message_key.is_empty() {
            fin.add_str(&config.message_key, &entry.message);
        }
        if !self.buf.is_empty() {
            fin.add_element_separator();
            fin.buf.append_bytes(&self.buf);
        }
        add_fields(&mut fin, fields);
        fin.close_open_namespaces();
        if !entry.stack.is_empty() && !config.stacktrace_key.is_empty() {
            fin.add_str(&config.stacktrace_key, &entry.stack);
        }
        fin.buf.append_byte(b'}');
        fin.buf.append_str(config.line_ending());
        Ok(fin.into_buffer())
    }

    fn as_object_encoder(&mut self) -> &mut dyn ObjectEncoder {
        self
    }
}
