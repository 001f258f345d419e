//! Core logging types and traits

pub mod entry;
pub mod error;
pub mod field;
pub mod hook;
pub mod increase_level;
pub mod io_core;
pub mod lazy;
pub mod level;
pub mod log_core;
pub mod marshaler;
pub mod sampler;
pub mod tee;

pub use entry::{
    CheckWriteAction, CheckWriteHook, CheckWriteHookFn, CheckedEntry, Entry, EntryCaller,
};
pub use error::{LoggerError, Result};
pub use field::{add_fields, Field, FieldValue, Reflected};
pub use hook::{register_hooks, EntryHook, HookedCore};
pub use increase_level::{increase_level, IncreaseLevelCore};
pub use io_core::{new_core, IoCore};
pub use lazy::{lazy_with, LazyCore};
pub use level::{level_of, AtomicLevel, Level, LevelEnabler, LevelEnablerFn};
pub use log_core::{nop_core, Core, NopCore};
pub use marshaler::{
    ArrayElement, ArrayMarshaler, ArrayMarshalerFn, ObjectMarshaler, ObjectMarshalerFn, Objects,
};
pub use sampler::{
    Sampler, SamplerBuilder, SamplerHook, SamplerMetrics, SamplingConfig, SamplingDecision,
};
pub use tee::{new_tee, Tee};
