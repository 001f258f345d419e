//! Strongly-typed key/value pairs attached to log entries
//!
//! A [`Field`] is a key plus a [`FieldValue`]. The value enum covers the
//! primitive types directly so that encoding them never allocates; anything
//! richer goes through a marshaler or a serde-backed reflected value.

use super::error::{LoggerError, Result};
use super::marshaler::{self, ArrayMarshaler, ObjectMarshaler};
use crate::encoders::ObjectEncoder;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// A value of arbitrary type, serialized through serde at encode time.
///
/// Implemented for every `Serialize` type; implement it by hand only for types
/// that need a custom JSON representation.
pub trait Reflected: Send + Sync {
    fn encode_json(&self, writer: &mut dyn io::Write) -> serde_json::Result<()>;
}

impl<T: Serialize + Send + Sync + ?Sized> Reflected for T {
    fn encode_json(&self, writer: &mut dyn io::Write) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }
}

/// The typed payload of a [`Field`].
#[derive(Clone)]
pub enum FieldValue {
    /// Encodes nothing.
    Skip,
    /// Every field added after this one nests under its key.
    Namespace,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    F32(f32),
    String(Cow<'static, str>),
    /// Opaque bytes, base64-encoded by text encoders.
    Binary(Arc<[u8]>),
    /// UTF-8 text held as bytes; invalid sequences are replaced when encoded.
    ByteString(Arc<[u8]>),
    Duration(Duration),
    Time(DateTime<Utc>),
    Error(Arc<dyn StdError + Send + Sync>),
    /// Rendered with `Display` at encode time.
    Stringer(Arc<dyn fmt::Display + Send + Sync>),
    Object(Arc<dyn ObjectMarshaler>),
    Array(Arc<dyn ArrayMarshaler>),
    /// An object whose fields are merged into the enclosing object.
    Inline(Arc<dyn ObjectMarshaler>),
    Reflected(Arc<dyn Reflected>),
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Skip => f.write_str("Skip"),
            FieldValue::Namespace => f.write_str("Namespace"),
            FieldValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            FieldValue::I64(v) => f.debug_tuple("I64").field(v).finish(),
            FieldValue::U64(v) => f.debug_tuple("U64").field(v).finish(),
            FieldValue::F64(v) => f.debug_tuple("F64").field(v).finish(),
            FieldValue::F32(v) => f.debug_tuple("F32").field(v).finish(),
            FieldValue::String(v) => f.debug_tuple("String").field(v).finish(),
            FieldValue::Binary(v) => f.debug_tuple("Binary").field(&v.len()).finish(),
            FieldValue::ByteString(v) => f
                .debug_tuple("ByteString")
                .field(&String::from_utf8_lossy(v))
                .finish(),
            FieldValue::Duration(v) => f.debug_tuple("Duration").field(v).finish(),
            FieldValue::Time(v) => f.debug_tuple("Time").field(v).finish(),
            FieldValue::Error(v) => f.debug_tuple("Error").field(v).finish(),
            FieldValue::Stringer(_) => f.write_str("Stringer(..)"),
            FieldValue::Object(_) => f.write_str("Object(..)"),
            FieldValue::Array(_) => f.write_str("Array(..)"),
            FieldValue::Inline(_) => f.write_str("Inline(..)"),
            FieldValue::Reflected(_) => f.write_str("Reflected(..)"),
        }
    }
}

/// A key/value pair attached to a log entry.
///
/// Fields are immutable and cheap to clone, so the same field may be passed to
/// many log calls from many threads.
///
/// # Example
///
/// ```
/// use rust_logger_core::{Field, encoders::MapObjectEncoder};
/// use std::time::Duration;
///
/// let fields = vec![
///     Field::string("user", "alice"),
///     Field::i64("attempt", 3),
///     Field::duration("backoff", Duration::from_millis(250)),
/// ];
///
/// let mut enc = MapObjectEncoder::new();
/// rust_logger_core::add_fields(&mut enc, &fields);
/// assert_eq!(enc.fields()["user"], "alice");
/// ```
#[derive(Debug, Clone)]
pub struct Field {
    pub key: Cow<'static, str>,
    pub value: FieldValue,
}

type Key = Cow<'static, str>;

impl Field {
    pub fn new(key: impl Into<Key>, value: FieldValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// A field that encodes nothing.
    pub fn skip() -> Self {
        Self::new("", FieldValue::Skip)
    }

    /// Nest all subsequent fields under `key`.
    pub fn namespace(key: impl Into<Key>) -> Self {
        Self::new(key, FieldValue::Namespace)
    }

    pub fn bool(key: impl Into<Key>, value: bool) -> Self {
        Self::new(key, FieldValue::Bool(value))
    }

    pub fn i64(key: impl Into<Key>, value: i64) -> Self {
        Self::new(key, FieldValue::I64(value))
    }

    pub fn i32(key: impl Into<Key>, value: i32) -> Self {
        Self::new(key, FieldValue::I64(i64::from(value)))
    }

    pub fn u64(key: impl Into<Key>, value: u64) -> Self {
        Self::new(key, FieldValue::U64(value))
    }

    pub fn u32(key: impl Into<Key>, value: u32) -> Self {
        Self::new(key, FieldValue::U64(u64::from(value)))
    }

    pub fn usize(key: impl Into<Key>, value: usize) -> Self {
        Self::new(key, FieldValue::U64(value as u64))
    }

    pub fn f64(key: impl Into<Key>, value: f64) -> Self {
        Self::new(key, FieldValue::F64(value))
    }

    pub fn f32(key: impl Into<Key>, value: f32) -> Self {
        Self::new(key, FieldValue::F32(value))
    }

    pub fn string(key: impl Into<Key>, value: impl Into<Cow<'static, str>>) -> Self {
        Self::new(key, FieldValue::String(value.into()))
    }

    pub fn binary(key: impl Into<Key>, value: impl Into<Arc<[u8]>>) -> Self {
        Self::new(key, FieldValue::Binary(value.into()))
    }

    pub fn byte_string(key: impl Into<Key>, value: impl Into<Arc<[u8]>>) -> Self {
        Self::new(key, FieldValue::ByteString(value.into()))
    }

    pub fn duration(key: impl Into<Key>, value: Duration) -> Self {
        Self::new(key, FieldValue::Duration(value))
    }

    pub fn time(key: impl Into<Key>, value: DateTime<Utc>) -> Self {
        Self::new(key, FieldValue::Time(value))
    }

    /// An error under the conventional `error` key.
    pub fn error<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::named_error("error", err)
    }

    pub fn named_error<E: StdError + Send + Sync + 'static>(key: impl Into<Key>, err: E) -> Self {
        Self::new(key, FieldValue::Error(Arc::new(err)))
    }

    pub fn stringer<T: fmt::Display + Send + Sync + 'static>(key: impl Into<Key>, value: T) -> Self {
        Self::new(key, FieldValue::Stringer(Arc::new(value)))
    }

    pub fn object<T: ObjectMarshaler + 'static>(key: impl Into<Key>, value: T) -> Self {
        Self::new(key, FieldValue::Object(Arc::new(value)))
    }

    pub fn array<T: ArrayMarshaler + 'static>(key: impl Into<Key>, value: T) -> Self {
        Self::new(key, FieldValue::Array(Arc::new(value)))
    }

    /// An object made of other fields. An empty group is skipped rather than
    /// written as `{}`.
    pub fn dict(key: impl Into<Key>, fields: Vec<Field>) -> Self {
        if fields.is_empty() {
            return Self::skip();
        }
        Self::object(key, fields)
    }

    /// Merge `value`'s fields into the enclosing object.
    pub fn inline<T: ObjectMarshaler + 'static>(value: T) -> Self {
        Self::new("", FieldValue::Inline(Arc::new(value)))
    }

    /// Any serializable value.
    pub fn any<T: Serialize + Send + Sync + 'static>(key: impl Into<Key>, value: T) -> Self {
        Self::new(key, FieldValue::Reflected(Arc::new(value)))
    }

    /// Write this field into `enc`.
    ///
    /// Failures from marshalers, reflection or `Display` implementations do
    /// not abort the entry: they are recorded as a string field named
    /// `<key>Error` next to where the value would have been.
    pub fn add_to(&self, enc: &mut dyn ObjectEncoder) {
        let key = self.key.as_ref();
        let result = match &self.value {
            FieldValue::Skip => Ok(()),
            FieldValue::Namespace => {
                enc.open_namespace(key);
                Ok(())
            }
            FieldValue::Bool(v) => {
                enc.add_bool(key, *v);
                Ok(())
            }
            FieldValue::I64(v) => {
                enc.add_i64(key, *v);
                Ok(())
            }
            FieldValue::U64(v) => {
                enc.add_u64(key, *v);
                Ok(())
            }
            FieldValue::F64(v) => {
                enc.add_f64(key, *v);
                Ok(())
            }
            FieldValue::F32(v) => {
                enc.add_f32(key, *v);
                Ok(())
            }
            FieldValue::String(v) => {
                enc.add_str(key, v);
                Ok(())
            }
            FieldValue::Binary(v) => {
                enc.add_binary(key, v);
                Ok(())
            }
            FieldValue::ByteString(v) => {
                enc.add_byte_string(key, v);
                Ok(())
            }
            FieldValue::Duration(v) => {
                enc.add_duration(key, *v);
                Ok(())
            }
            FieldValue::Time(v) => {
                enc.add_time(key, *v);
                Ok(())
            }
            FieldValue::Error(err) => encode_error(key, err.as_ref(), enc),
            FieldValue::Stringer(v) => encode_stringer(key, v.as_ref(), enc),
            FieldValue::Object(obj) => enc.add_object(key, obj.as_ref()),
            FieldValue::Array(arr) => enc.add_array(key, arr.as_ref()),
            FieldValue::Inline(obj) => marshaler::marshal_object(obj.as_ref(), enc),
            FieldValue::Reflected(v) => enc.add_reflected(key, v.as_ref()),
        };

        if let Err(err) = result {
            enc.add_str(&format!("{}Error", key), &err.to_string());
        }
    }
}

/// Add every field in order.
pub fn add_fields(enc: &mut dyn ObjectEncoder, fields: &[Field]) {
    for field in fields {
        field.add_to(enc);
    }
}

impl ObjectMarshaler for Vec<Field> {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        add_fields(enc, self);
        Ok(())
    }
}

fn encode_stringer(
    key: &str,
    value: &(dyn fmt::Display + Send + Sync),
    enc: &mut dyn ObjectEncoder,
) -> Result<()> {
    let rendered = panic::catch_unwind(AssertUnwindSafe(|| value.to_string()))
        .map_err(|payload| marshaler::panic_error(payload.as_ref()))?;
    enc.add_str(key, &rendered);
    Ok(())
}

fn encode_error(
    key: &str,
    err: &(dyn StdError + Send + Sync + 'static),
    enc: &mut dyn ObjectEncoder,
) -> Result<()> {
    let basic = panic::catch_unwind(AssertUnwindSafe(|| err.to_string()))
        .map_err(|payload| marshaler::panic_error(payload.as_ref()))?;
    enc.add_str(key, &basic);

    let causes: Vec<String> = match err.downcast_ref::<LoggerError>() {
        Some(LoggerError::Multiple(errs)) => errs.iter().map(ToString::to_string).collect(),
        _ => {
            let mut causes = Vec::new();
            let mut source = err.source();
            while let Some(cause) = source {
                causes.push(cause.to_string());
                source = cause.source();
            }
            causes
        }
    };
    if causes.is_empty() {
        return Ok(());
    }
    enc.add_array(&format!("{}Causes", key), &causes)
}
