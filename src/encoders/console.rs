//! Human-readable console encoder
//!
//! Output looks like:
//!
//! ```text
//! 2025-01-08T10:30:45.123Z	INFO	api	server/handler.rs:12	request served	{"status":200}
//! ```
//!
//! The preamble (time, level, name, caller, function) is written as plain
//! separator-delimited text, the message follows unescaped, and any context
//! or fields are appended as a single JSON object.

use super::buffer::{self, Buffer};
use super::config::EncoderConfig;
use super::json::JsonEncoder;
use super::{Encoder, ObjectEncoder, PrimitiveArrayEncoder};
use crate::core::entry::Entry;
use crate::core::error::Result;
use crate::core::field::{add_fields, Field, Reflected};
use crate::core::marshaler::{ArrayMarshaler, ObjectMarshaler};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Writes primitive values into the line, separated by the configured
/// console separator, without quoting or escaping.
struct Preamble<'a> {
    line: &'a mut Buffer,
    separator: &'a str,
}

impl Preamble<'_> {
    fn begin(&mut self) {
        if !self.line.is_empty() {
            self.line.append_str(self.separator);
        }
    }
}

impl PrimitiveArrayEncoder for Preamble<'_> {
    fn append_bool(&mut self, value: bool) {
        self.begin();
        self.line.append_bool(value);
    }

    fn append_byte_string(&mut self, value: &[u8]) {
        self.begin();
        self.line.append_str(&String::from_utf8_lossy(value));
    }

    fn append_f64(&mut self, value: f64) {
        self.begin();
        if value.is_nan() {
            self.line.append_str("NaN");
        } else if value.is_infinite() {
            self.line.append_str(if value > 0.0 { "+Inf" } else { "-Inf" });
        } else {
            self.line.append_f64(value);
        }
    }

    fn append_f32(&mut self, value: f32) {
        self.append_f64(f64::from(value));
    }

    fn append_i64(&mut self, value: i64) {
        self.begin();
        self.line.append_int(value);
    }

    fn append_u64(&mut self, value: u64) {
        self.begin();
        self.line.append_uint(value);
    }

    fn append_str(&mut self, value: &str) {
        self.begin();
        self.line.append_str(value);
    }
}

/// Encodes entries for humans reading a terminal.
///
/// Context added through [`ObjectEncoder`] is kept as JSON and printed after
/// the message.
pub struct ConsoleEncoder {
    json: JsonEncoder,
}

impl ConsoleEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            json: JsonEncoder::with_shared_config(Arc::new(config)),
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        self.json.config()
    }

    fn write_context(&self, line: &mut Buffer, fields: &[Field]) {
        let mut context = self.json.clone_json();
        add_fields(&mut context, fields);
        context.close_open_namespaces();

        let context = context.into_buffer();
        if context.is_empty() {
            return;
        }
        if !line.is_empty() {
            line.append_str(self.config().console_separator());
        }
        line.append_byte(b'{');
        line.append_bytes(&context);
        line.append_byte(b'}');
    }
}

impl ObjectEncoder for ConsoleEncoder {
    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()> {
        self.json.add_array(key, value)
    }

    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()> {
        self.json.add_object(key, value)
    }

    fn add_binary(&mut self, key: &str, value: &[u8]) {
        self.json.add_binary(key, value)
    }

    fn add_byte_string(&mut self, key: &str, value: &[u8]) {
        self.json.add_byte_string(key, value)
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.json.add_bool(key, value)
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.json.add_duration(key, value)
    }

    fn add_f64(&mut self, key: &str, value: f64) {
        self.json.add_f64(key, value)
    }

    fn add_f32(&mut self, key: &str, value: f32) {
        self.json.add_f32(key, value)
    }

    fn add_i64(&mut self, key: &str, value: i64) {
        self.json.add_i64(key, value)
    }

    fn add_u64(&mut self, key: &str, value: u64) {
        self.json.add_u64(key, value)
    }

    fn add_reflected(&mut self, key: &str, value: &dyn Reflected) -> Result<()> {
        self.json.add_reflected(key, value)
    }

    fn open_namespace(&mut self, key: &str) {
        self.json.open_namespace(key)
    }

    fn add_str(&mut self, key: &str, value: &str) {
        self.json.add_str(key, value)
    }

    fn add_time(&mut self, key: &str, value: DateTime<Utc>) {
        self.json.add_time(key, value)
    }
}

impl Encoder for ConsoleEncoder {
    fn clone_encoder(&self) -> Box<dyn Encoder> {
        Box::new(ConsoleEncoder {
            json: self.json.clone_json(),
        })
    }

    fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> Result<Buffer> {
        let config = self.config();
        let mut line = buffer::get();

        {
            let mut preamble = Preamble {
                line: &mut line,
                separator: config.console_separator(),
            };
            if !config.time_key.is_empty() {
                config.encode_time.encode(entry.time, &mut preamble);
            }
            if !config.level_key.is_empty() {
                config.encode_level.encode(entry.level, &mut preamble);
            }
            if !entry.logger_name.is_empty() && !config.name_key.is_empty() {
                config.encode_name.encode(&entry.logger_name, &mut preamble);
            }
            if let Some(caller) = &entry.caller {
                if !config.caller_key.is_empty() {
                    config.encode_caller.encode(caller, &mut preamble);
                }
                if !config.function_key.is_empty() {
                    preamble.append_str(&caller.function);
                }
            }
            if !config.message_key.is_empty() {
                preamble.append_str(&entry.message);
            }
        }

        self.write_context(&mut line, fields);

        if !entry.stack.is_empty() && !config.stacktrace_key.is_empty() {
            line.append_byte(b'\n');
            line.append_str(&entry.stack);
        }
        line.append_str(config.line_ending());
        Ok(line)
    }

    fn as_object_encoder(&mut self) -> &mut dyn ObjectEncoder {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entry::EntryCaller;
    use crate::core::level::Level;
    use crate::encoders::config::TimeEncoder;
    use chrono::TimeZone;

    fn epoch_entry(level: Level, msg: &str) -> Entry {
        Entry::new(level, msg).with_time(Utc.timestamp_opt(0, 0).unwrap())
    }

    fn dev_config() -> EncoderConfig {
        EncoderConfig::development().with_time_encoder(TimeEncoder::Rfc3339)
    }

    #[test]
    fn test_preamble_message_and_context() {
        let mut enc = ConsoleEncoder::new(dev_config());
        enc.add_str("svc", "api");

        let entry = epoch_entry(Level::Info, "request \"served\"")
            .with_logger_name("http")
            .with_caller(EntryCaller::new("/src/server/handler.rs", 12));
        let out = enc.encode_entry(&entry, &[Field::u64("status", 200)]).unwrap();
        assert_eq!(
            out.as_string(),
            "1970-01-01T00:00:00Z\tINFO\thttp\tserver/handler.rs:12\trequest \"served\"\t{\"svc\":\"api\",\"status\":200}\n"
        );
    }

    #[test]
    fn test_no_context_no_braces() {
        let enc = ConsoleEncoder::new(dev_config());
        let out = enc.encode_entry(&epoch_entry(Level::Warn, "plain"), &[]).unwrap();
        assert_eq!(out.as_string(), "1970-01-01T00:00:00Z\tWARN\tplain\n");
    }

    #[test]
    fn test_custom_separator_and_stack() {
        let config = dev_config()
            .with_console_separator(" | ")
            .with_time_key("");
        let enc = ConsoleEncoder::new(config);
        let entry = epoch_entry(Level::Error, "failed").with_stack("at main");
        let out = enc
            .encode_entry(&entry, &[Field::namespace("ns"), Field::bool("x", true)])
            .unwrap();
        assert_eq!(
            out.as_string(),
            "ERROR | failed | {\"ns\":{\"x\":true}}\nat main\n"
        );
    }

    #[test]
    fn test_epoch_time_in_preamble() {
        let enc = ConsoleEncoder::new(EncoderConfig::production());
        let out = enc.encode_entry(&epoch_entry(Level::Debug, "m"), &[]).unwrap();
        assert_eq!(out.as_string(), "0\tdebug\tm\n");
    }

    #[test]
    fn test_clone_keeps_context_separate() {
        let mut parent = ConsoleEncoder::new(dev_config().with_time_key(""));
        parent.add_i64("a", 1);
        let mut child = parent.clone_encoder();
        child.add_i64("b", 2);

        let entry = epoch_entry(Level::Info, "m");
        assert_eq!(
            parent.encode_entry(&entry, &[]).unwrap().as_string(),
            "INFO\tm\t{\"a\":1}\n"
        );
        assert_eq!(
            child.encode_entry(&entry, &[]).unwrap().as_string(),
            "INFO\tm\t{\"a\":1,\"b\":2}\n"
        );
    }
}
