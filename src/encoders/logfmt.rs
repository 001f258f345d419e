//! Logfmt encoder (`key=value` pairs)
//!
//! Compatible with log aggregation tools that parse logfmt (Loki, Heroku,
//! Splunk). Nested objects and namespaces are flattened into dotted keys;
//! arrays and reflected values are written as JSON text.
//!
//! ```text
//! ts=1736332245.123 level=info msg="request served" http.method=GET http.status=200
//! ```

use super::buffer::{self, Buffer};
use super::config::EncoderConfig;
use super::json::{write_escaped_bytes, write_escaped_str, JsonEncoder};
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

/// Encodes entries as a single line of logfmt pairs.
pub struct LogfmtEncoder {
    config: Arc<EncoderConfig>,
    buf: Buffer,
    namespaces: Vec<String>,
}

impl LogfmtEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config: Arc::new(config),
            buf: buffer::get(),
            namespaces: Vec::new(),
        }
    }

    fn begin_pair(&mut self) {
        if !self.buf.is_empty() {
            self.buf.append_byte(b' ');
        }
    }

    /// A key qualified by the open namespaces.
    fn add_key(&mut self, key: &str) {
        self.begin_pair();
        for ns in &self.namespaces {
            write_key(&mut self.buf, ns);
            self.buf.append_byte(b'.');
        }
        write_key(&mut self.buf, key);
        self.buf.append_byte(b'=');
    }

    /// A top-level key for entry metadata.
    fn add_plain_key(&mut self, key: &str) {
        self.begin_pair();
        write_key(&mut self.buf, key);
        self.buf.append_byte(b'=');
    }

    fn write_value(&mut self, value: &str) {
        if needs_quoting(value) {
            self.write_quoted(value);
        } else {
            self.buf.append_str(value);
        }
    }

    fn write_quoted(&mut self, value: &str) {
        self.buf.append_byte(b'"');
        write_escaped_str(&mut self.buf, value);
        self.buf.append_byte(b'"');
    }
}

/// Keep only characters that cannot confuse a logfmt parser.
fn write_key(buf: &mut Buffer, key: &str) {
    for c in key.chars() {
        if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
            let mut utf8 = [0_u8; 4];
            buf.append_str(c.encode_utf8(&mut utf8));
        }
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .bytes()
            .any(|b| b <= b' ' || b == b'=' || b == b'"' || b == b'\\' || b == 0x7f)
}

impl PrimitiveArrayEncoder for LogfmtEncoder {
    fn append_bool(&mut self, value: bool) {
        self.buf.append_bool(value);
    }

    fn append_byte_string(&mut self, value: &[u8]) {
        match std::str::from_utf8(value) {
            Ok(s) => self.write_value(s),
            Err(_) => {
                self.buf.append_byte(b'"');
                write_escaped_bytes(&mut self.buf, value);
                self.buf.append_byte(b'"');
            }
        }
    }

    fn append_f64(&mut self, value: f64) {
        if value.is_nan() {
            self.buf.append_str("NaN");
        } else if value.is_infinite() {
            self.buf.append_str(if value > 0.0 { "+Inf" } else { "-Inf" });
        } else {
            self.buf.append_f64(value);
        }
    }

    fn append_f32(&mut self, value: f32) {
        if value.is_finite() {
            self.buf.append_f32(value);
        } else {
            self.append_f64(f64::from(value));
        }
    }

    fn append_i64(&mut self, value: i64) {
        self.buf.append_int(value);
    }

    fn append_u64(&mut self, value: u64) {
        self.buf.append_uint(value);
    }

    fn append_str(&mut self, value: &str) {
        self.write_value(value);
    }
}

impl ObjectEncoder for LogfmtEncoder {
    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()> {
        let mut json = JsonEncoder::with_shared_config(Arc::clone(&self.config));
        let result = json.append_array(value);
        self.add_key(key);
        self.write_value(&String::from_utf8_lossy(json.context()));
        result
    }

    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()> {
        let depth = self.namespaces.len();
        self.namespaces.push(key.to_string());
        let result = marshaler::marshal_object(value, self);
        self.namespaces.truncate(depth);
        result
    }

    fn add_binary(&mut self, key: &str, value: &[u8]) {
        self.add_key(key);
        self.write_value(&BASE64.encode(value));
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
        let encode = self.config.encode_duration;
        encode.encode(value, self);
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
        let mut scratch = buffer::get();
        value.encode_json(&mut scratch)?;
        scratch.trim_newline();
        self.add_key(key);
        self.write_value(&String::from_utf8_lossy(&scratch));
        Ok(())
    }

    fn open_namespace(&mut self, key: &str) {
        self.namespaces.push(key.to_string());
    }

    fn add_str(&mut self, key: &str, value: &str) {
        self.add_key(key);
        self.write_value(value);
    }

    fn add_time(&mut self, key: &str, value: DateTime<Utc>) {
        self.add_key(key);
        let config = Arc::clone(&self.config);
        config.encode_time.encode(value, self);
    }
}

impl Encoder for LogfmtEncoder {
    fn clone_encoder(&self) -> Box<dyn Encoder> {
        Box::new(LogfmtEncoder {
            config: Arc::clone(&self.config),
            buf: self.buf.clone(),
            namespaces: self.namespaces.clone(),
        })
    }

    fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> Result<Buffer> {
        let config = Arc::clone(&self.config);
        let mut fin = LogfmtEncoder {
            config: Arc::clone(&config),
            buf: buffer::get(),
            namespaces: self.namespaces.clone(),
        };

        if !config.time_key.is_empty() {
            fin.add_plain_key(&config.time_key);
            config.encode_time.encode(entry.time, &mut fin);
        }
        if !config.level_key.is_empty() {
            fin.add_plain_key(&config.level_key);
            config.encode_level.encode(entry.level, &mut fin);
        }
        if !entry.logger_name.is_empty() && !config.name_key.is_empty() {
            fin.add_plain_key(&config.name_key);
            config.encode_name.encode(&entry.logger_name, &mut fin);
        }
        if let Some(caller) = &entry.caller {
            if !config.caller_key.is_empty() {
                fin.add_plain_key(&config.caller_key);
                config.encode_caller.encode(caller, &mut fin);
            }
            if !config.function_key.is_empty() {
                fin.add_plain_key(&config.function_key);
                fin.write_value(&caller.function);
            }
        }
        if !config.message_key.is_empty() {
            // always quoted
            fin.add_plain_key(&config.message_key);
            fin.write_quoted(&entry.message);
        }
        if !self.buf.is_empty() {
            fin.begin_pair();
            fin.buf.append_bytes(&self.buf);
        }
        add_fields(&mut fin, fields);
        if !entry.stack.is_empty() && !config.stacktrace_key.is_empty() {
            fin.add_plain_key(&config.stacktrace_key);
            fin.write_quoted(&entry.stack);
        }
        fin.buf.append_str(config.line_ending());
        Ok(fin.buf)
    }

    fn as_object_encoder(&mut self) -> &mut dyn ObjectEncoder {
        self
    }
}
