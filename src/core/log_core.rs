//! The `Core` trait
//!
//! A core is the minimal logging backend: it decides which entries it wants,
//! writes them together with their fields, and flushes on demand. Cores
//! compose: tees fan out, samplers and level filters wrap, and context is
//! attached by deriving a child with [`Core::with`].

use super::entry::{CheckedEntry, Entry};
use super::error::Result;
use super::field::Field;
use super::level::{Level, LevelEnabler};
use std::sync::Arc;

/// A logging backend.
///
/// Cores are shared as `Arc<dyn Core>`. [`check`](Core::check) consumes an
/// `Arc` so the core can register itself on the checked entry; call it as
/// `Arc::clone(&core).check(&entry, None)`.
pub trait Core: LevelEnabler + Send + Sync {
    /// A child core that adds `fields` to every entry it writes. The
    /// receiver is left untouched.
    fn with(&self, fields: &[Field]) -> Arc<dyn Core>;

    /// Register this core on `checked` if it wants to log `entry`.
    ///
    /// Cores that decline return `checked` unchanged.
    fn check(self: Arc<Self>, entry: &Entry, checked: Option<CheckedEntry>) -> Option<CheckedEntry>;

    /// Serialize and emit the entry unconditionally.
    fn write(&self, entry: &Entry, fields: &[Field]) -> Result<()>;

    /// Flush any buffered output.
    fn sync(&self) -> Result<()>;
}

/// A core that is never enabled and discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopCore;

impl LevelEnabler for NopCore {
    fn enabled(&self, _level: Level) -> bool {
        false
    }
}

impl Core for NopCore {
    fn with(&self, _fields: &[Field]) -> Arc<dyn Core> {
        Arc::new(NopCore)
    }

    fn check(self: Arc<Self>, _entry: &Entry, checked: Option<CheckedEntry>) -> Option<CheckedEntry> {
        checked
    }

    fn write(&self, _entry: &Entry, _fields: &[Field]) -> Result<()> {
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

/// Shorthand for a shared [`NopCore`].
pub fn nop_core() -> Arc<dyn Core> {
    Arc::new(NopCore)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nop_core() {
        let core = nop_core();
        for level in Level::ALL {
            assert!(!core.enabled(level));
        }

        let entry = Entry::new(Level::Fatal, "ignored");
        assert!(Arc::clone(&core).check(&entry, None).is_none());
        assert!(core.write(&entry, &[Field::bool("k", true)]).is_ok());
        assert!(core.with(&[Field::i64("n", 1)]).sync().is_ok());
    }
}
