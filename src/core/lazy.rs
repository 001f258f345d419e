//! Deferred context application

use super::entry::{CheckedEntry, Entry};
use super::error::Result;
use super::field::Field;
use super::level::{Level, LevelEnabler};
use super::log_core::Core;
use std::sync::{Arc, OnceLock};

/// A core that postpones [`Core::with`] on its base until the first entry is
/// actually checked or written.
///
/// Building request-scoped children is cheap this way when most of them never
/// log anything. Chained `with` calls collapse into a single batch of fields.
pub struct LazyCore {
    base: Arc<dyn Core>,
    pending: Vec<Field>,
    resolved: OnceLock<Arc<dyn Core>>,
}

/// Wrap `core` so that `fields` are only encoded once they are needed.
pub fn lazy_with(core: Arc<dyn Core>, fields: Vec<Field>) -> Arc<dyn Core> {
    Arc::new(LazyCore {
        base: core,
        pending: fields,
        resolved: OnceLock::new(),
    })
}

impl LazyCore {
    fn core(&self) -> &Arc<dyn Core> {
        self.resolved.get_or_init(|| {
            if self.pending.is_empty() {
                Arc::clone(&self.base)
            } else {
                self.base.with(&self.pending)
            }
        })
    }

    /// Whether the pending fields have been applied yet.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

impl LevelEnabler for LazyCore {
    fn enabled(&self, level: Level) -> bool {
        self.base.enabled(level)
    }
}

impl Core for LazyCore {
    fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
        let (base, pending) = match self.resolved.get() {
            Some(core) => (Arc::clone(core), fields.to_vec()),
            None => {
                let mut pending = Vec::with_capacity(self.pending.len() + fields.len());
                pending.extend_from_slice(&self.pending);
                pending.extend_from_slice(fields);
                (Arc::clone(&self.base), pending)
            }
        };
        lazy_with(base, pending)
    }

    fn check(self: Arc<Self>, entry: &Entry, checked: Option<CheckedEntry>) -> Option<CheckedEntry> {
        if !self.enabled(entry.level) {
            return checked;
        }
        Arc::clone(self.core()).check(entry, checked)
    }

    fn write(&self, entry: &Entry, fields: &[Field]) -> Result<()> {
        self.core().write(entry, fields)
    }

    fn sync(&self) -> Result<()> {
        self.base.sync()
    }
}
