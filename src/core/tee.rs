//! Fan-out to several cores

use super::entry::{CheckedEntry, Entry};
use super::error::{append_error, into_result, Result};
use super::field::Field;
use super::level::{Level, LevelEnabler};
use super::log_core::Core;
use std::sync::Arc;

/// Duplicates entries into every child core.
///
/// Each child still applies its own level and sampling rules in `check`, so
/// a tee of a debug-level file core and an error-level stderr core sends each
/// entry only where it belongs.
pub struct Tee {
    cores: Vec<Arc<dyn Core>>,
}

/// Combine `cores` into one.
pub fn new_tee(cores: Vec<Arc<dyn Core>>) -> Arc<dyn Core> {
    Arc::new(Tee { cores })
}

impl LevelEnabler for Tee {
    fn enabled(&self, level: Level) -> bool {
        self.cores.iter().any(|c| c.enabled(level))
    }
}

impl Core for Tee {
    fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
        Arc::new(Tee {
            cores: self.cores.iter().map(|c| c.with(fields)).collect(),
        })
    }

    fn check(self: Arc<Self>, entry: &Entry, mut checked: Option<CheckedEntry>) -> Option<CheckedEntry> {
        for core in &self.cores {
            checked = Arc::clone(core).check(entry, checked);
        }
        checked
    }

    fn write(&self, entry: &Entry, fields: &[Field]) -> Result<()> {
        let mut err = None;
        for core in &self.cores {
            if let Err(e) = core.write(entry, fields) {
                err = append_error(err, e);
            }
        }
        into_result(err)
    }

    fn sync(&self) -> Result<()> {
        let mut err = None;
        for core in &self.cores {
            if let Err(e) = core.sync() {
                err = append_error(err, e);
            }
        }
        into_result(err)
    }
}
