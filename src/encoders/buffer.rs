//! Reusable byte buffers
//!
//! Every encoded entry is rendered into a [`Buffer`]. Buffers obtained from a
//! [`BufferPool`] hand their allocation back to the pool when dropped, so the
//! steady-state hot path does not allocate.

use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::ops::Deref;

/// Initial capacity of freshly allocated buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Buffers that grew past this size are not retained by the pool.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// Upper bound on idle buffers kept by one pool.
const MAX_POOLED: usize = 256;

static DEFAULT_POOL: BufferPool = BufferPool::new();

/// Get a buffer from the process-wide pool.
pub fn get() -> Buffer {
    DEFAULT_POOL.get()
}

/// A free-list of byte vectors.
///
/// Pools are meant to live in statics; buffers keep a `'static` reference to
/// the pool they came from.
///
/// # Example
///
/// ```
/// use rust_logger_core::encoders::BufferPool;
///
/// static POOL: BufferPool = BufferPool::new();
///
/// let mut buf = POOL.get();
/// buf.append_str("hello");
/// drop(buf);
/// assert_eq!(POOL.idle(), 1);
/// ```
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub const fn new() -> Self {
        Self {
            free: parking_lot::const_mutex(Vec::new()),
        }
    }

    /// Take an empty buffer from the pool, allocating if none are idle.
    pub fn get(&'static self) -> Buffer {
        let bs = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(DEFAULT_BUFFER_SIZE));
        Buffer {
            bs,
            pool: Some(self),
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn put(&self, mut bs: Vec<u8>) {
        if bs.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        bs.clear();
        let mut free = self.free.lock();
        if free.len() < MAX_POOLED {
            free.push(bs);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A growable byte buffer with allocation-free append helpers.
pub struct Buffer {
    bs: Vec<u8>,
    pool: Option<&'static BufferPool>,
}

impl Buffer {
    /// An unpooled buffer.
    pub fn new() -> Self {
        Self {
            bs: Vec::with_capacity(DEFAULT_BUFFER_SIZE),
            pool: None,
        }
    }

    #[inline]
    pub fn append_byte(&mut self, b: u8) {
        self.bs.push(b);
    }

    #[inline]
    pub fn append_bytes(&mut self, bs: &[u8]) {
        self.bs.extend_from_slice(bs);
    }

    #[inline]
    pub fn append_str(&mut self, s: &str) {
        self.bs.extend_from_slice(s.as_bytes());
    }

    pub fn append_int(&mut self, i: i64) {
        let _ = fmt::Write::write_fmt(self, format_args!("{}", i));
    }

    pub fn append_uint(&mut self, u: u64) {
        let _ = fmt::Write::write_fmt(self, format_args!("{}", u));
    }

    pub fn append_bool(&mut self, b: bool) {
        self.append_str(if b { "true" } else { "false" });
    }

    /// Shortest decimal representation that round-trips, never in exponent form.
    pub fn append_f64(&mut self, f: f64) {
        let _ = fmt::Write::write_fmt(self, format_args!("{}", f));
    }

    /// Like [`append_f64`](Self::append_f64) but shortest for 32-bit precision.
    pub fn append_f32(&mut self, f: f32) {
        let _ = fmt::Write::write_fmt(self, format_args!("{}", f));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bs.capacity()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bs
    }

    #[inline]
    pub fn last_byte(&self) -> Option<u8> {
        self.bs.last().copied()
    }

    /// Lossy view of the contents, mostly useful in tests.
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.bs).into_owned()
    }

    pub fn reset(&mut self) {
        self.bs.clear();
    }

    pub fn truncate(&mut self, len: usize) {
        self.bs.truncate(len);
    }

    /// Remove a single trailing `\n`, if present.
    pub fn trim_newline(&mut self) {
        if self.bs.last() == Some(&b'\n') {
            self.bs.pop();
        }
    }

    /// Detach the bytes from the pool.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.pool = None;
        std::mem::take(&mut self.bs)
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Self {
        let mut clone = match self.pool {
            Some(pool) => pool.get(),
            None => Buffer::new(),
        };
        clone.append_bytes(&self.bs);
        clone
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.put(std::mem::take(&mut self.bs));
        }
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bs
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.bs
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("contents", &String::from_utf8_lossy(&self.bs))
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_str(s);
        Ok(())
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
