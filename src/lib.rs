//! # Rust Logger Core
//!
//! A structured, leveled logging core built around a small set of
//! composable pieces:
//!
//! - **Fields**: typed key/value attributes, encoded lazily
//! - **Encoders**: JSON, console and logfmt output into pooled buffers
//! - **Cores**: level gating, context accumulation and the check/write
//!   protocol, with sampling, tee, hook and lazy-context decorators
//! - **Sinks**: thread-safe write/sync destinations, including a buffered
//!   writer with periodic background flush
//!
//! ## Example
//!
//! ```
//! use rust_logger_core::prelude::*;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(rust_logger_core::sinks::lock(Vec::new()));
//! let core = new_core(JsonEncoder::new(EncoderConfig::production()), sink.clone(), Level::Info);
//! let core = core.with(&[Field::string("service", "api")]);
//!
//! let entry = Entry::new(Level::Info, "request served");
//! if let Some(mut checked) = Arc::clone(&core).check(&entry, None) {
//!     checked.write(&[Field::u64("status", 200)]).unwrap();
//! }
//!
//! let out = String::from_utf8(sink.lock_inner().clone()).unwrap();
//! assert!(out.contains(r#""service":"api","status":200"#));
//! ```

pub mod core;
pub mod encoders;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        increase_level, lazy_with, new_core, new_tee, nop_core, register_hooks, AtomicLevel,
        CheckWriteAction, CheckedEntry, Core, Entry, EntryCaller, EntryHook, Field, Level,
        LevelEnabler, LoggerError, ObjectMarshaler, ObjectMarshalerFn, Result, Sampler,
        SamplingConfig,
    };
    pub use crate::encoders::{
        ConsoleEncoder, Encoder, EncoderConfig, JsonEncoder, LogfmtEncoder, ObjectEncoder,
    };
    pub use crate::sinks::{BufferedWriteSyncer, WriteSyncer};
}

pub use crate::core::{
    add_fields, increase_level, lazy_with, level_of, new_core, new_tee, nop_core,
    register_hooks, ArrayElement, ArrayMarshaler, ArrayMarshalerFn, AtomicLevel,
    CheckWriteAction, CheckWriteHook, CheckWriteHookFn, CheckedEntry, Core, Entry, EntryCaller,
    EntryHook, Field, FieldValue, HookedCore, IncreaseLevelCore, IoCore, LazyCore, Level,
    LevelEnabler, LevelEnablerFn, LoggerError, NopCore, ObjectMarshaler, ObjectMarshalerFn,
    Objects, Reflected, Result, Sampler, SamplerBuilder, SamplerHook, SamplerMetrics,
    SamplingConfig, SamplingDecision, Tee,
};
pub use crate::encoders::{ArrayEncoder, Encoder, ObjectEncoder, PrimitiveArrayEncoder};
pub use crate::sinks::{multi_write_syncer, BufferedWriteSyncer, WriteSyncer};
