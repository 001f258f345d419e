//! Buffering sink with periodic background flush
//!
//! Writes are collected in memory and pushed to the wrapped sink when the
//! buffer would overflow, when [`WriteSyncer::sync`] is called, or when the
//! flush interval elapses. The flush thread is started on the first write
//! and torn down by [`BufferedWriteSyncer::stop`] (or on drop).

use super::WriteSyncer;
use crate::core::error::{LoggerError, Result};
use crossbeam_channel::{select, tick, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default buffer capacity (256 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Default interval between background flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

struct BufferedState {
    ws: Arc<dyn WriteSyncer>,
    buf: Vec<u8>,
    size: usize,
    initialized: bool,
}

impl BufferedState {
    /// Push buffered bytes to the wrapped sink. On failure the bytes stay
    /// buffered so a later flush can retry them.
    fn flush(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let written = self.ws.write(&self.buf)?;
        if written < self.buf.len() {
            let expected = self.buf.len();
            self.buf.drain(..written);
            return Err(LoggerError::short_write(written, expected));
        }
        self.buf.clear();
        Ok(())
    }
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// A [`WriteSyncer`] that batches writes in memory.
///
/// # Examples
///
/// ```
/// use rust_logger_core::sinks::{lock, BufferedWriteSyncer, WriteSyncer};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let out = BufferedWriteSyncer::builder(Arc::new(lock(Vec::new())))
///     .size(64 * 1024)
///     .flush_interval(Duration::from_secs(5))
///     .build();
///
/// out.write(b"hello\n").unwrap();
/// out.stop().unwrap();
/// ```
pub struct BufferedWriteSyncer {
    state: Arc<Mutex<BufferedState>>,
    worker: Mutex<Option<Worker>>,
    interval: Duration,
}

impl BufferedWriteSyncer {
    /// Wrap `ws` with the default size and interval.
    pub fn new(ws: Arc<dyn WriteSyncer>) -> Self {
        Self::builder(ws).build()
    }

    pub fn builder(ws: Arc<dyn WriteSyncer>) -> BufferedWriteSyncerBuilder {
        BufferedWriteSyncerBuilder {
            ws,
            size: DEFAULT_BUFFER_SIZE,
            interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    /// Bytes currently waiting to be flushed.
    pub fn buffered(&self) -> usize {
        self.state.lock().buf.len()
    }

    fn start_worker(&self) {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let state = Arc::clone(&self.state);
        let ticker = tick(self.interval);

        let handle = thread::spawn(move || loop {
            select! {
                recv(ticker) -> _ => {
                    if let Err(e) = state.lock().flush() {
                        eprintln!("[LOGGER ERROR] Buffered flush failed: {}", e);
                    }
                }
                // Disconnection of the stop sender ends the loop.
                recv(stop_rx) -> _ => break,
            }
        });

        *self.worker.lock() = Some(Worker { stop_tx, handle });
    }

    /// Stop the background flush and flush whatever is buffered.
    ///
    /// Safe to call more than once, and on a writer that was never written
    /// to.
    pub fn stop(&self) -> Result<()> {
        let worker = {
            let mut state = self.state.lock();
            // Block a later first write from starting a new worker.
            state.initialized = true;
            self.worker.lock().take()
        };

        if let Some(worker) = worker {
            drop(worker.stop_tx);
            if worker.handle.join().is_err() {
                eprintln!("[LOGGER ERROR] Buffered flush thread panicked");
            }
        }

        self.sync()
    }
}

impl WriteSyncer for BufferedWriteSyncer {
    fn write(&self, bs: &[u8]) -> Result<usize> {
        let mut state = self.state.lock();
        if !state.initialized {
            state.initialized = true;
            self.start_worker();
        }

        // Flush first rather than split this write across two flushes.
        if bs.len() > state.size.saturating_sub(state.buf.len()) && !state.buf.is_empty() {
            state.flush()?;
        }

        if bs.len() > state.size {
            // Too large to ever fit; bypass the buffer.
            return state.ws.write(bs);
        }

        state.buf.extend_from_slice(bs);
        Ok(bs.len())
    }

    fn sync(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.flush()?;
        state.ws.sync()
    }
}

impl Drop for BufferedWriteSyncer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            eprintln!("[LOGGER ERROR] Final buffered flush failed: {}", e);
        }
    }
}

/// Builder for [`BufferedWriteSyncer`].
pub struct BufferedWriteSyncerBuilder {
    ws: Arc<dyn WriteSyncer>,
    size: usize,
    interval: Duration,
}

impl BufferedWriteSyncerBuilder {
    /// Buffer capacity in bytes. Zero selects the default.
    pub fn size(mut self, size: usize) -> Self {
        self.size = if size == 0 { DEFAULT_BUFFER_SIZE } else { size };
        self
    }

    /// Background flush interval. Zero selects the default.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.interval = if interval.is_zero() {
            DEFAULT_FLUSH_INTERVAL
        } else {
            interval
        };
        self
    }

    pub fn build(self) -> BufferedWriteSyncer {
        BufferedWriteSyncer {
            state: Arc::new(Mutex::new(BufferedState {
                ws: self.ws,
                buf: Vec::with_capacity(self.size),
                size: self.size,
                initialized: false,
            })),
            worker: Mutex::new(None),
            interval: self.interval,
        }
    }
}
