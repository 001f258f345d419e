//! Deferred serialization of nested objects and arrays
//!
//! A marshaler is handed the encoder it should write into and is invoked
//! exactly once, at encode time. Nesting depth comes from marshalers calling
//! `add_object` / `append_array` on the encoder they were given.

use super::error::{LoggerError, Result};
use crate::encoders::{ArrayEncoder, ObjectEncoder};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// A type that can write itself as a set of keyed fields.
pub trait ObjectMarshaler: Send + Sync {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()>;
}

/// A type that can write itself as a sequence of elements.
pub trait ArrayMarshaler: Send + Sync {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()>;
}

/// Run an object marshaler, reporting a panic as a marshal error.
///
/// Encoders call this for every nested scope so a panic is caught by the
/// innermost scope, which then closes normally.
pub(crate) fn marshal_object(
    value: &dyn ObjectMarshaler,
    enc: &mut dyn ObjectEncoder,
) -> Result<()> {
    panic::catch_unwind(AssertUnwindSafe(|| value.marshal_log_object(enc)))
        .unwrap_or_else(|payload| Err(panic_error(payload.as_ref())))
}

/// Run an array marshaler, reporting a panic as a marshal error.
pub(crate) fn marshal_array(
    value: &dyn ArrayMarshaler,
    enc: &mut dyn ArrayEncoder,
) -> Result<()> {
    panic::catch_unwind(AssertUnwindSafe(|| value.marshal_log_array(enc)))
        .unwrap_or_else(|payload| Err(panic_error(payload.as_ref())))
}

/// Render a caught panic payload as `PANIC=<message>`.
pub(crate) fn panic_error(payload: &(dyn Any + Send)) -> LoggerError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    LoggerError::marshal(format!("PANIC={}", message))
}

/// Adapts a closure into an [`ObjectMarshaler`].
///
/// # Example
///
/// ```
/// use rust_logger_core::{Field, ObjectMarshalerFn};
///
/// let user = ObjectMarshalerFn(|enc: &mut dyn rust_logger_core::ObjectEncoder| {
///     enc.add_str("name", "alice");
///     enc.add_i64("age", 30);
///     Ok(())
/// });
/// let field = Field::object("user", user);
/// ```
pub struct ObjectMarshalerFn<F>(pub F);

impl<F> ObjectMarshaler for ObjectMarshalerFn<F>
where
    F: Fn(&mut dyn ObjectEncoder) -> Result<()> + Send + Sync,
{
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        (self.0)(enc)
    }
}

/// Adapts a closure into an [`ArrayMarshaler`].
pub struct ArrayMarshalerFn<F>(pub F);

impl<F> ArrayMarshaler for ArrayMarshalerFn<F>
where
    F: Fn(&mut dyn ArrayEncoder) -> Result<()> + Send + Sync,
{
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        (self.0)(enc)
    }
}

/// A value that can be appended to an array without a key.
pub trait ArrayElement: Send + Sync {
    fn append_to(&self, enc: &mut dyn ArrayEncoder);
}

macro_rules! array_element {
    ($ty:ty, $enc:ident, $v:ident => $body:expr) => {
        impl ArrayElement for $ty {
            fn append_to(&self, $enc: &mut dyn ArrayEncoder) {
                let $v = self;
                $body
            }
        }
    };
}

array_element!(bool, enc, v => enc.append_bool(*v));
array_element!(i64, enc, v => enc.append_i64(*v));
array_element!(i32, enc, v => enc.append_i64(i64::from(*v)));
array_element!(u64, enc, v => enc.append_u64(*v));
array_element!(u32, enc, v => enc.append_u64(u64::from(*v)));
array_element!(f64, enc, v => enc.append_f64(*v));
array_element!(f32, enc, v => enc.append_f32(*v));
array_element!(String, enc, v => enc.append_str(v));
array_element!(&'static str, enc, v => enc.append_str(v));
array_element!(Duration, enc, v => enc.append_duration(*v));
array_element!(DateTime<Utc>, enc, v => enc.append_time(*v));

impl<T: ArrayElement> ArrayMarshaler for Vec<T> {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        for v in self {
            v.append_to(enc);
        }
        Ok(())
    }
}

/// An array of objects.
pub struct Objects<T>(pub Vec<T>);

impl<T: ObjectMarshaler> ArrayMarshaler for Objects<T> {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        for v in &self.0 {
            enc.append_object(v)?;
        }
        Ok(())
    }
}
