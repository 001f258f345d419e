//! Log entries and the checked-entry write protocol
//!
//! Logging is two-phase. A [`Core`] first *checks* an [`Entry`]; every core
//! willing to write it registers itself on a [`CheckedEntry`]. The caller then
//! builds its fields and calls [`CheckedEntry::write`] once, which fans out to
//! the registered cores. Disabled entries never cost more than the level check.

use super::error::{append_error, into_result, LoggerError, Result};
use super::field::Field;
use super::level::Level;
use super::log_core::Core;
use crate::sinks::WriteSyncer;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// The source location that produced an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCaller {
    pub file: Cow<'static, str>,
    pub line: u32,
    /// Fully-qualified function name, if known.
    pub function: String,
}

impl EntryCaller {
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            function: String::new(),
        }
    }

    /// The location of the code calling this function.
    #[track_caller]
    pub fn here() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line())
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    /// `file:line` with the full path.
    pub fn full_path(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }

    /// `dir/file:line`, keeping only the last directory.
    pub fn trimmed_path(&self) -> String {
        let is_sep = |c: char| c == '/' || c == '\\';
        let file = self.file.as_ref();
        let Some(last) = file.rfind(is_sep) else {
            return self.full_path();
        };
        let start = file[..last].rfind(is_sep).map_or(0, |i| i + 1);
        format!("{}:{}", &file[start..], self.line)
    }
}

impl fmt::Display for EntryCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.trimmed_path())
    }
}

/// A single log event, minus its fields.
#[derive(Debug, Clone)]
pub struct Entry {
    pub level: Level,
    pub time: DateTime<Utc>,
    pub logger_name: String,
    pub message: String,
    pub caller: Option<EntryCaller>,
    pub stack: String,
}

impl Entry {
    /// Create an entry stamped with the current time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            time: Utc::now(),
            logger_name: String::new(),
            message: message.into(),
            caller: None,
            stack: String::new(),
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = name.into();
        self
    }

    pub fn with_caller(mut self, caller: EntryCaller) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }
}

/// Runs after a checked entry has been written to all of its cores.
pub trait CheckWriteHook: Send + Sync {
    fn on_write(&self, entry: &Entry, fields: &[Field]);
}

/// Built-in terminal actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckWriteAction {
    #[default]
    Noop,
    /// Panic with the entry's message.
    Panic,
    /// Exit the process with status 1.
    Fatal,
}

impl CheckWriteHook for CheckWriteAction {
    fn on_write(&self, entry: &Entry, _fields: &[Field]) {
        match self {
            CheckWriteAction::Noop => {}
            CheckWriteAction::Panic => panic!("{}", entry.message),
            CheckWriteAction::Fatal => std::process::exit(1),
        }
    }
}

/// Adapts a closure into a [`CheckWriteHook`].
pub struct CheckWriteHookFn<F>(pub F);

impl<F> CheckWriteHook for CheckWriteHookFn<F>
where
    F: Fn(&Entry, &[Field]) + Send + Sync,
{
    fn on_write(&self, entry: &Entry, fields: &[Field]) {
        (self.0)(entry, fields)
    }
}

type CoreList = Vec<Arc<dyn Core>>;

const MAX_POOLED_LISTS: usize = 64;

static CORE_LISTS: Mutex<Vec<CoreList>> = parking_lot::const_mutex(Vec::new());

fn get_core_list() -> CoreList {
    CORE_LISTS.lock().pop().unwrap_or_default()
}

fn put_core_list(mut cores: CoreList) {
    if cores.capacity() == 0 {
        return;
    }
    cores.clear();
    let mut lists = CORE_LISTS.lock();
    if lists.len() < MAX_POOLED_LISTS {
        lists.push(cores);
    }
}

/// An entry together with the cores that agreed to log it.
///
/// Produced by [`Core::check`]; consumed by a single call to
/// [`write`](CheckedEntry::write). The list of cores is recycled through a
/// pool once the entry has been written or dropped.
///
/// # Example
///
/// ```
/// use rust_logger_core::prelude::*;
/// use std::sync::Arc;
///
/// let sink = Arc::new(rust_logger_core::sinks::lock(Vec::new()));
/// let core = new_core(JsonEncoder::new(EncoderConfig::production()), sink, Level::Info);
///
/// let entry = Entry::new(Level::Debug, "too verbose");
/// assert!(Arc::clone(&core).check(&entry, None).is_none());
///
/// let entry = Entry::new(Level::Info, "hello");
/// if let Some(mut checked) = Arc::clone(&core).check(&entry, None) {
///     checked.write(&[Field::string("user", "alice")]).unwrap();
/// }
/// ```
pub struct CheckedEntry {
    entry: Entry,
    cores: CoreList,
    error_output: Option<Arc<dyn WriteSyncer>>,
    after: Option<Arc<dyn CheckWriteHook>>,
    dirty: bool,
}

impl CheckedEntry {
    fn new(entry: &Entry) -> Self {
        Self {
            entry: entry.clone(),
            cores: get_core_list(),
            error_output: None,
            after: None,
            dirty: false,
        }
    }

    /// Register `core` to write `entry`, creating the checked entry if this
    /// is the first core to accept it.
    pub fn add_core(checked: Option<CheckedEntry>, entry: &Entry, core: Arc<dyn Core>) -> Self {
        let mut checked = checked.unwrap_or_else(|| CheckedEntry::new(entry));
        checked.cores.push(core);
        checked
    }

    /// Attach a hook that runs after the entry is written, creating the
    /// checked entry if needed. A later call replaces an earlier hook.
    pub fn after(
        checked: Option<CheckedEntry>,
        entry: &Entry,
        hook: Arc<dyn CheckWriteHook>,
    ) -> Self {
        let mut checked = checked.unwrap_or_else(|| CheckedEntry::new(entry));
        checked.after = Some(hook);
        checked
    }

    /// Where write failures and misuse are reported. Defaults to stderr.
    pub fn with_error_output(mut self, out: Arc<dyn WriteSyncer>) -> Self {
        self.error_output = Some(out);
        self
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Number of cores that will receive this entry.
    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    /// Write the entry and `fields` to every registered core.
    ///
    /// All cores are attempted even if some fail; failures are reported to
    /// the error output and returned together. The after-write hook runs last,
    /// so a `Panic` or `Fatal` action only fires once the entry is on its way.
    ///
    /// Writing the same checked entry twice is a bug in the caller. The second
    /// call writes nothing, reports the misuse and returns
    /// [`LoggerError::EntryReused`].
    pub fn write(&mut self, fields: &[Field]) -> Result<()> {
        if self.dirty {
            self.report(&format!(
                "{} Unsafe CheckedEntry re-use near Entry {:?}.\n",
                Utc::now().to_rfc3339(),
                self.entry
            ));
            return Err(LoggerError::EntryReused);
        }
        self.dirty = true;

        let cores = std::mem::take(&mut self.cores);
        let mut err = None;
        for core in &cores {
            if let Err(e) = core.write(&self.entry, fields) {
                err = append_error(err, e);
            }
        }
        put_core_list(cores);

        if let Some(e) = &err {
            self.report(&format!(
                "{} write error: {}\n",
                self.entry.time.to_rfc3339(),
                e
            ));
        }

        if let Some(hook) = self.after.take() {
            hook.on_write(&self.entry, fields);
        }
        into_result(err)
    }

    fn report(&self, msg: &str) {
        match &self.error_output {
            Some(out) => {
                let _ = out.write(msg.as_bytes());
                let _ = out.sync();
            }
            None => eprint!("[LOGGER ERROR] {}", msg),
        }
    }
}

impl Drop for CheckedEntry {
    fn drop(&mut self) {
        put_core_list(std::mem::take(&mut self.cores));
    }
}

impl fmt::Debug for CheckedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckedEntry")
            .field("entry", &self.entry)
            .field("cores", &self.cores.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}
