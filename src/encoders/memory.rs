//! In-memory encoders that build a `serde_json::Value` tree
//!
//! Useful for inspecting what a marshaler or field emits without going
//! through text, and for tests.

use super::{ArrayEncoder, ObjectEncoder, PrimitiveArrayEncoder};
use crate::core::error::Result;
use crate::core::field::Reflected;
use crate::core::marshaler::{self, ArrayMarshaler, ObjectMarshaler};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use std::time::Duration;

fn float_value(f: f64) -> Value {
    match Number::from_f64(f) {
        Some(n) => Value::Number(n),
        None if f.is_nan() => Value::String("NaN".to_string()),
        None if f > 0.0 => Value::String("+Inf".to_string()),
        None => Value::String("-Inf".to_string()),
    }
}

fn time_value(t: DateTime<Utc>) -> Value {
    Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn duration_value(d: Duration) -> Value {
    Value::from(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
}

fn reflected_value(value: &dyn Reflected) -> Result<Value> {
    let mut bytes = Vec::new();
    value.encode_json(&mut bytes)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// An [`ObjectEncoder`] backed by a JSON map.
///
/// Times are stored as RFC 3339 strings and durations as nanoseconds.
#[derive(Debug, Default, Clone)]
pub struct MapObjectEncoder {
    fields: Map<String, Value>,
    namespace: Vec<String>,
}

impl MapObjectEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything added so far, namespaces included.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    fn insert(&mut self, key: &str, value: Value) {
        let mut map = &mut self.fields;
        for ns in &self.namespace {
            let slot = map
                .entry(ns.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            map = match slot {
                Value::Object(next) => next,
                _ => return,
            };
        }
        map.insert(key.to_string(), value);
    }
}

impl ObjectEncoder for MapObjectEncoder {
    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()> {
        let mut arr = SliceArrayEncoder::new();
        let result = marshaler::marshal_array(value, &mut arr);
        self.insert(key, Value::Array(arr.elems));
        result
    }

    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()> {
        let mut obj = MapObjectEncoder::new();
        let result = marshaler::marshal_object(value, &mut obj);
        self.insert(key, Value::Object(obj.fields));
        result
    }

    fn add_binary(&mut self, key: &str, value: &[u8]) {
        self.insert(key, Value::String(BASE64.encode(value)));
    }

    fn add_byte_string(&mut self, key: &str, value: &[u8]) {
        self.insert(key, Value::String(String::from_utf8_lossy(value).into_owned()));
    }

    fn add_bool(&mut self, key: &str, value: bool) {
        self.insert(key, Value::Bool(value));
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.insert(key, duration_value(value));
    }

    fn add_f64(&mut self, key: &str, value: f64) {
        self.insert(key, float_value(value));
    }

    fn add_f32(&mut self, key: &str, value: f32) {
        self.insert(key, float_value(f64::from(value)));
    }

    fn add_i64(&mut self, key: &str, value: i64) {
        self.insert(key, Value::from(value));
    }

    fn add_u64(&mut self, key: &str, value: u64) {
        self.insert(key, Value::from(value));
    }

    fn add_reflected(&mut self, key: &str, value: &dyn Reflected) -> Result<()> {
        let value = reflected_value(value)?;
        self.insert(key, value);
        Ok(())
    }

    fn open_namespace(&mut self, key: &str) {
        self.insert(key, Value::Object(Map::new()));
        self.namespace.push(key.to_string());
    }

    fn add_str(&mut self, key: &str, value: &str) {
        self.insert(key, Value::String(value.to_string()));
    }

    fn add_time(&mut self, key: &str, value: DateTime<Utc>) {
        self.insert(key, time_value(value));
    }
}

/// An [`ArrayEncoder`] backed by a vector of JSON values.
#[derive(Debug, Default, Clone)]
pub struct SliceArrayEncoder {
    elems: Vec<Value>,
}

impl SliceArrayEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[Value] {
        &self.elems
    }

    pub fn into_elements(self) -> Vec<Value> {
        self.elems
    }
}

impl PrimitiveArrayEncoder for SliceArrayEncoder {
    fn append_bool(&mut self, value: bool) {
        self.elems.push(Value::Bool(value));
    }

    fn append_byte_string(&mut self, value: &[u8]) {
        self.elems
            .push(Value::String(String::from_utf8_lossy(value).into_owned()));
    }

    fn append_f64(&mut self, value: f64) {
        self.elems.push(float_value(value));
    }

    fn append_f32(&mut self, value: f32) {
        self.elems.push(float_value(f64::from(value)));
    }

    fn append_i64(&mut self, value: i64) {
        self.elems.push(Value::from(value));
    }

    fn append_u64(&mut self, value: u64) {
        self.elems.push(Value::from(value));
    }

    fn append_str(&mut self, value: &str) {
        self.elems.push(Value::String(value.to_string()));
    }
}

impl ArrayEncoder for SliceArrayEncoder {
    fn append_duration(&mut self, value: Duration) {
        self.elems.push(duration_value(value));
    }

    fn append_time(&mut self, value: DateTime<Utc>) {
        self.elems.push(time_value(value));
    }

    fn append_array(&mut self, value: &dyn ArrayMarshaler) -> Result<()> {
        let mut arr = SliceArrayEncoder::new();
        let result = marshaler::marshal_array(value, &mut arr);
        self.elems.push(Value::Array(arr.elems));
        result
    }

    fn append_object(&mut self, value: &dyn ObjectMarshaler) -> Result<()> {
        let mut obj = MapObjectEncoder::new();
        let result = marshaler::marshal_object(value, &mut obj);
        self.elems.push(Value::Object(obj.fields));
        result
    }

    fn append_reflected(&mut self, value: &dyn Reflected) -> Result<()> {
        let value = reflected_value(value)?;
        self.elems.push(value);
        Ok(())
    }
}
