//! Raising the minimum level of an existing core

use super::entry::{CheckedEntry, Entry};
use super::error::{LoggerError, Result};
use super::field::Field;
use super::level::{Level, LevelEnabler};
use super::log_core::Core;
use std::sync::Arc;

/// A core that only lets through entries enabled by both a level and the
/// wrapped core.
pub struct IncreaseLevelCore {
    inner: Arc<dyn Core>,
    level: Arc<dyn LevelEnabler>,
}

/// Restrict `core` to the levels enabled by `level`.
///
/// Fails with [`LoggerError::InvalidConfiguration`] if `level` would enable
/// anything the core itself does not, since that would lower its level.
pub fn increase_level<L>(core: Arc<dyn Core>, level: L) -> Result<Arc<dyn Core>>
where
    L: LevelEnabler + 'static,
{
    for l in Level::ALL.iter().rev().copied() {
        if !core.enabled(l) && level.enabled(l) {
            return Err(LoggerError::config(
                "IncreaseLevel",
                format!(
                    "invalid increase level, as level \"{}\" is allowed by increased level, but not by existing core",
                    l
                ),
            ));
        }
    }
    Ok(Arc::new(IncreaseLevelCore {
        inner: core,
        level: Arc::new(level),
    }))
}

impl LevelEnabler for IncreaseLevelCore {
    fn enabled(&self, level: Level) -> bool {
        self.level.enabled(level)
    }
}

impl Core for IncreaseLevelCore {
    fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
        Arc::new(IncreaseLevelCore {
            inner: self.inner.with(fields),
            level: Arc::clone(&self.level),
        })
    }

    fn check(self: Arc<Self>, entry: &Entry, checked: Option<CheckedEntry>) -> Option<CheckedEntry> {
        if !self.level.enabled(entry.level) {
            return checked;
        }
        Arc::clone(&self.inner).check(entry, checked)
    }

    fn write(&self, entry: &Entry, fields: &[Field]) -> Result<()> {
        self.inner.write(entry, fields)
    }

    fn sync(&self) -> Result<()> {
        self.inner.sync()
    }
}
