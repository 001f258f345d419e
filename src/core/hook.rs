//! Side-effect hooks around a core

use super::entry::{CheckedEntry, Entry};
use super::error::{append_error, into_result, Result};
use super::field::Field;
use super::level::{Level, LevelEnabler};
use super::log_core::Core;
use std::sync::Arc;

/// Called with every entry the wrapped core writes. Fields are not passed.
pub type EntryHook = Arc<dyn Fn(&Entry) -> Result<()> + Send + Sync>;

/// Runs hooks for every entry the inner core accepts, e.g. to count entries
/// per level.
pub struct HookedCore {
    inner: Arc<dyn Core>,
    hooks: Arc<[EntryHook]>,
}

/// Wrap `core` so that `hooks` run each time it logs an entry.
///
/// # Example
///
/// ```
/// use rust_logger_core::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let errors = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&errors);
/// let hook: EntryHook = Arc::new(move |entry: &Entry| {
///     if entry.level >= Level::Error {
///         counter.fetch_add(1, Ordering::Relaxed);
///     }
///     Ok(())
/// });
///
/// let sink = Arc::new(rust_logger_core::sinks::lock(Vec::new()));
/// let core = new_core(JsonEncoder::new(EncoderConfig::production()), sink, Level::Info);
/// let core = register_hooks(core, vec![hook]);
///
/// let entry = Entry::new(Level::Error, "failed");
/// if let Some(mut checked) = Arc::clone(&core).check(&entry, None) {
///     checked.write(&[]).unwrap();
/// }
/// assert_eq!(errors.load(Ordering::Relaxed), 1);
/// ```
pub fn register_hooks(core: Arc<dyn Core>, hooks: Vec<EntryHook>) -> Arc<dyn Core> {
    Arc::new(HookedCore {
        inner: core,
        hooks: hooks.into(),
    })
}

impl LevelEnabler for HookedCore {
    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }
}

impl Core for HookedCore {
    fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
        Arc::new(HookedCore {
            inner: self.inner.with(fields),
            hooks: Arc::clone(&self.hooks),
        })
    }

    fn check(self: Arc<Self>, entry: &Entry, checked: Option<CheckedEntry>) -> Option<CheckedEntry> {
        let before = checked.as_ref().map_or(0, CheckedEntry::core_count);
        let checked = Arc::clone(&self.inner).check(entry, checked)?;
        // hooks only fire when the inner core actually accepted the entry
        if checked.core_count() > before {
            return Some(CheckedEntry::add_core(Some(checked), entry, self));
        }
        Some(checked)
    }

    fn write(&self, entry: &Entry, _fields: &[Field]) -> Result<()> {
        let mut err = None;
        for hook in self.hooks.iter() {
            if let Err(e) = hook(entry) {
                err = append_error(err, e);
            }
        }
        into_result(err)
    }

    fn sync(&self) -> Result<()> {
        self.inner.sync()
    }
}
