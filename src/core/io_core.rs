//! The standard core: encoder + write syncer + level filter

use super::entry::{CheckedEntry, Entry};
use super::error::{LoggerError, Result};
use super::field::{add_fields, Field};
use super::level::{Level, LevelEnabler};
use super::log_core::Core;
use crate::encoders::Encoder;
use crate::sinks::WriteSyncer;
use std::sync::Arc;

/// Encodes entries and writes them to a [`WriteSyncer`].
///
/// Entries above [`Level::Error`] are synced immediately, since the process
/// is likely about to go down.
pub struct IoCore {
    level: Arc<dyn LevelEnabler>,
    encoder: Box<dyn Encoder>,
    out: Arc<dyn WriteSyncer>,
}

impl IoCore {
    pub fn new<E, L>(encoder: E, out: Arc<dyn WriteSyncer>, level: L) -> Self
    where
        E: Encoder + 'static,
        L: LevelEnabler + 'static,
    {
        Self {
            level: Arc::new(level),
            encoder: Box::new(encoder),
            out,
        }
    }
}

/// Build a shared [`IoCore`].
pub fn new_core<E, L>(encoder: E, out: Arc<dyn WriteSyncer>, level: L) -> Arc<dyn Core>
where
    E: Encoder + 'static,
    L: LevelEnabler + 'static,
{
    Arc::new(IoCore::new(encoder, out, level))
}

impl LevelEnabler for IoCore {
    fn enabled(&self, level: Level) -> bool {
        self.level.enabled(level)
    }
}

impl Core for IoCore {
    fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
        let mut encoder = self.encoder.clone_encoder();
        add_fields(encoder.as_object_encoder(), fields);
        Arc::new(IoCore {
            level: Arc::clone(&self.level),
            encoder,
            out: Arc::clone(&self.out),
        })
    }

    fn check(self: Arc<Self>, entry: &Entry, checked: Option<CheckedEntry>) -> Option<CheckedEntry> {
        if self.enabled(entry.level) {
            return Some(CheckedEntry::add_core(checked, entry, self));
        }
        checked
    }

    fn write(&self, entry: &Entry, fields: &[Field]) -> Result<()> {
        let buf = self.encoder.encode_entry(entry, fields)?;
        let written = self.out.write(&buf)?;
        if written < buf.len() {
            return Err(LoggerError::short_write(written, buf.len()));
        }
        drop(buf);

        if entry.level > Level::Error {
            // best effort; the entry itself was already written
            let _ = self.sync();
        }
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.out.sync()
    }
}
