//! Output destinations
//!
//! A [`WriteSyncer`] is anything that accepts encoded bytes and can be
//! flushed. Standard streams and files implement it directly; any other
//! `io::Write` can be adapted with [`lock`].

pub mod buffered;
pub mod multi;

pub use buffered::{BufferedWriteSyncer, BufferedWriteSyncerBuilder};
pub use multi::{multi_write_syncer, MultiWriteSyncer};

use crate::core::error::Result;
use parking_lot::{Mutex, MutexGuard};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// A thread-safe byte sink that can be flushed.
///
/// `write` returns the number of bytes accepted. Implementations should
/// accept all of them or return an error; a short count is reported by the
/// caller as an incomplete write.
pub trait WriteSyncer: Send + Sync {
    fn write(&self, buf: &[u8]) -> Result<usize>;
    fn sync(&self) -> Result<()>;
}

impl<T: WriteSyncer + ?Sized> WriteSyncer for Arc<T> {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn sync(&self) -> Result<()> {
        (**self).sync()
    }
}

impl WriteSyncer for io::Stdout {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn sync(&self) -> Result<()> {
        self.lock().flush()?;
        Ok(())
    }
}

impl WriteSyncer for io::Stderr {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn sync(&self) -> Result<()> {
        self.lock().flush()?;
        Ok(())
    }
}

impl WriteSyncer for File {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut file: &File = self;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn sync(&self) -> Result<()> {
        self.sync_all()?;
        Ok(())
    }
}

/// Open `path` for appending, creating it if needed.
///
/// # Examples
///
/// ```no_run
/// use rust_logger_core::sinks::open_file;
///
/// let out = open_file("/var/log/app.log").unwrap();
/// ```
pub fn open_file(path: impl AsRef<Path>) -> Result<Arc<dyn WriteSyncer>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Arc::new(file))
}

/// Standard output as a shared sink.
pub fn stdout() -> Arc<dyn WriteSyncer> {
    Arc::new(io::stdout())
}

/// Standard error as a shared sink.
pub fn stderr() -> Arc<dyn WriteSyncer> {
    Arc::new(io::stderr())
}

/// Serializes access to a plain `io::Write`.
pub struct LockedWriteSyncer<W> {
    inner: Mutex<W>,
}

/// Wrap `writer` in a mutex so it can be shared between threads.
pub fn lock<W: Write + Send>(writer: W) -> LockedWriteSyncer<W> {
    LockedWriteSyncer {
        inner: Mutex::new(writer),
    }
}

impl<W> LockedWriteSyncer<W> {
    /// Direct access to the wrapped writer.
    pub fn lock_inner(&self) -> MutexGuard<'_, W> {
        self.inner.lock()
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W: Write + Send> WriteSyncer for LockedWriteSyncer<W> {
    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.inner.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn sync(&self) -> Result<()> {
        self.inner.lock().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_locked_vec() {
        let sink = lock(Vec::new());
        assert_eq!(sink.write(b"abc").unwrap(), 3);
        sink.sync().unwrap();
        assert_eq!(sink.into_inner(), b"abc");
    }

    #[test]
    fn test_open_file_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        std::fs::write(&path, "existing\n").unwrap();

        let out = open_file(&path).unwrap();
        out.write(b"appended\n").unwrap();
        out.sync().unwrap();

        let mut contents = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "existing\nappended\n");
    }

    #[test]
    fn test_open_file_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("app.log");
        assert!(matches!(
            open_file(&path),
            Err(crate::core::error::LoggerError::Io(_))
        ));
    }
}
