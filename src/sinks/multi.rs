//! Duplicating writes across several sinks

use super::WriteSyncer;
use crate::core::error::{append_error, into_result, Result};
use std::sync::Arc;

/// Writes every buffer to all of its sinks.
///
/// A failing sink does not stop the others; failures are combined into one
/// error.
pub struct MultiWriteSyncer {
    sinks: Vec<Arc<dyn WriteSyncer>>,
}

/// Combine `sinks`. A single sink is returned as-is.
pub fn multi_write_syncer(mut sinks: Vec<Arc<dyn WriteSyncer>>) -> Arc<dyn WriteSyncer> {
    if sinks.len() == 1 {
        if let Some(only) = sinks.pop() {
            return only;
        }
    }
    Arc::new(MultiWriteSyncer { sinks })
}

impl WriteSyncer for MultiWriteSyncer {
    /// Returns the smallest count any sink reported, so a short write by one
    /// sink is visible to the caller.
    fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut err = None;
        let mut written = 0;
        for sink in &self.sinks {
            match sink.write(buf) {
                Ok(n) => {
                    if written == 0 || (n > 0 && n < written) {
                        written = n;
                    }
                }
                Err(e) => err = append_error(err, e),
            }
        }
        into_result(err).map(|()| written)
    }

    fn sync(&self) -> Result<()> {
        let mut err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.sync() {
                err = append_error(err, e);
            }
        }
        into_result(err)
    }
}
