//! Integration tests for the logging core
//!
//! These tests verify:
//! - Log injection prevention in JSON output
//! - Tee fan-out to file and memory sinks
//! - Buffered output with explicit and implicit flushes
//! - Console and logfmt output end to end
//! - Sampling with drop reporting
//! - Hooks, lazy context and level increases through the check/write path

use chrono::TimeZone;
use rust_logger_core::encoders::TimeEncoder;
use rust_logger_core::prelude::*;
use rust_logger_core::sinks::{lock, open_file, LockedWriteSyncer};
use rust_logger_core::{multi_write_syncer, ArrayMarshalerFn, ArrayEncoder};
use serde_json::Value;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn memory_sink() -> Arc<LockedWriteSyncer<Vec<u8>>> {
    Arc::new(lock(Vec::new()))
}

fn contents(sink: &LockedWriteSyncer<Vec<u8>>) -> String {
    String::from_utf8(sink.lock_inner().clone()).expect("output is utf-8")
}

fn json_lines(output: &str) -> Vec<Value> {
    output
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is a JSON object"))
        .collect()
}

fn log(core: &Arc<dyn Core>, entry: Entry, fields: &[Field]) -> bool {
    match Arc::clone(core).check(&entry, None) {
        Some(mut checked) => {
            checked.write(fields).expect("write succeeds");
            true
        }
        None => false,
    }
}

fn epoch() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc.timestamp_opt(0, 0).unwrap()
}

#[test]
fn test_log_injection_prevention() {
    // Newlines in messages and values must not start a new record
    let sink = memory_sink();
    let core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        sink.clone(),
        Level::Info,
    );

    let malicious = "User login\n{\"level\":\"error\",\"msg\":\"Fake error injected\"}";
    log(
        &core,
        Entry::new(Level::Info, malicious),
        &[Field::string("user", "bob\r\nadmin")],
    );

    let output = contents(&sink);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 1, "Log should be a single line, not multiple");

    let record: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["msg"], malicious);
    assert_eq!(record["user"], "bob\r\nadmin");
}

#[test]
fn test_context_reuse_on_same_encoder() {
    let sink = memory_sink();
    let mut encoder = JsonEncoder::new(EncoderConfig::production());
    encoder.add_str("foo", "bar");
    let core = new_core(encoder, sink.clone(), Level::Debug);

    for _ in 0..2 {
        log(&core, Entry::new(Level::Info, "hello").with_time(epoch()), &[]);
    }

    assert_eq!(
        contents(&sink),
        "{\"level\":\"info\",\"ts\":0,\"msg\":\"hello\",\"foo\":\"bar\"}\n".repeat(2)
    );
}

#[test]
fn test_tee_to_file_and_memory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("tee.log");

    let file_core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        open_file(&log_file).expect("Failed to open log file"),
        Level::Warn,
    );
    let memory = memory_sink();
    let memory_core = new_core(
        ConsoleEncoder::new(EncoderConfig::development().with_time_key("")),
        memory.clone(),
        Level::Debug,
    );
    let core = new_tee(vec![file_core, memory_core]).with(&[Field::string("svc", "api")]);

    assert!(log(&core, Entry::new(Level::Debug, "verbose"), &[]));
    assert!(log(
        &core,
        Entry::new(Level::Error, "failed"),
        &[Field::i64("code", 7)]
    ));
    core.sync().expect("Failed to sync");

    let file_lines = json_lines(&fs::read_to_string(&log_file).expect("Failed to read log file"));
    assert_eq!(file_lines.len(), 1);
    assert_eq!(file_lines[0]["level"], "error");
    assert_eq!(file_lines[0]["svc"], "api");
    assert_eq!(file_lines[0]["code"], 7);

    assert_eq!(
        contents(&memory),
        "DEBUG\tverbose\t{\"svc\":\"api\"}\nERROR\tfailed\t{\"svc\":\"api\",\"code\":7}\n"
    );
}

#[test]
fn test_buffered_file_output() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("buffered.log");

    let buffered = Arc::new(
        BufferedWriteSyncer::builder(open_file(&log_file).unwrap())
            .size(1024)
            .flush_interval(Duration::from_secs(60))
            .build(),
    );
    let core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        buffered.clone(),
        Level::Debug,
    );

    for i in 0..10 {
        log(&core, Entry::new(Level::Info, format!("Message {}", i)), &[]);
    }
    assert_eq!(fs::read_to_string(&log_file).unwrap(), "");

    // Writes above error level sync the sink immediately
    log(&core, Entry::new(Level::DPanic, "boom"), &[]);
    let lines = json_lines(&fs::read_to_string(&log_file).unwrap());
    assert_eq!(lines.len(), 11);
    assert_eq!(lines[10]["msg"], "boom");

    log(&core, Entry::new(Level::Info, "tail"), &[]);
    buffered.stop().expect("Failed to stop buffered writer");
    let lines = json_lines(&fs::read_to_string(&log_file).unwrap());
    assert_eq!(lines.len(), 12);
}

#[test]
fn test_multi_write_syncer_under_core() {
    let a = memory_sink();
    let b = memory_sink();
    let out = multi_write_syncer(vec![
        a.clone() as Arc<dyn WriteSyncer>,
        b.clone() as Arc<dyn WriteSyncer>,
    ]);
    let core = new_core(
        LogfmtEncoder::new(EncoderConfig::production().with_time_key("")),
        out,
        Level::Info,
    );

    log(
        &core,
        Entry::new(Level::Info, "copied"),
        &[Field::string("to", "both")],
    );
    assert_eq!(contents(&a), "level=info msg=\"copied\" to=both\n");
    assert_eq!(contents(&a), contents(&b));
}

#[test]
fn test_console_with_caller_and_stack() {
    let sink = memory_sink();
    let config = EncoderConfig::development()
        .with_time_encoder(TimeEncoder::Rfc3339)
        .with_function_key("F");
    let core = new_core(ConsoleEncoder::new(config), sink.clone(), Level::Debug);

    let entry = Entry::new(Level::Warn, "slow query")
        .with_time(epoch())
        .with_logger_name("db")
        .with_caller(EntryCaller::new("/app/src/db/pool.rs", 88).with_function("acquire"))
        .with_stack("pool.rs:88\nmain.rs:10");
    log(
        &core,
        entry,
        &[Field::duration("elapsed", Duration::from_millis(1500))],
    );

    assert_eq!(
        contents(&sink),
        "1970-01-01T00:00:00Z\tWARN\tdb\tdb/pool.rs:88\tacquire\tslow query\t{\"elapsed\":\"1.5s\"}\npool.rs:88\nmain.rs:10\n"
    );
}

#[test]
fn test_nested_objects_and_errors() {
    let sink = memory_sink();
    let core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        sink.clone(),
        Level::Info,
    );

    let broken = ObjectMarshalerFn(|enc: &mut dyn ObjectEncoder| {
        enc.add_str("partial", "yes");
        Err(LoggerError::marshal("cannot finish"))
    });
    let ids = ArrayMarshalerFn(|enc: &mut dyn ArrayEncoder| {
        enc.append_i64(1);
        enc.append_i64(2);
        Ok(())
    });
    log(
        &core,
        Entry::new(Level::Info, "nested"),
        &[
            Field::object("broken", broken),
            Field::array("ids", ids),
            Field::namespace("req"),
            Field::string("method", "GET"),
            Field::error(std::io::Error::new(std::io::ErrorKind::Other, "reset")),
        ],
    );

    let record = &json_lines(&contents(&sink))[0];
    assert_eq!(record["broken"]["partial"], "yes");
    assert!(record["brokenError"]
        .as_str()
        .unwrap()
        .contains("cannot finish"));
    assert_eq!(record["ids"], serde_json::json!([1, 2]));
    assert_eq!(record["req"]["method"], "GET");
    assert_eq!(record["req"]["error"], "reset");
}

/// A panicking marshaler costs one field, not the entry or the other cores
#[test]
fn test_panicking_marshaler_through_tee() {
    let json_sink = memory_sink();
    let logfmt_sink = memory_sink();
    let core = new_tee(vec![
        new_core(
            JsonEncoder::new(EncoderConfig::production()),
            json_sink.clone(),
            Level::Info,
        ),
        new_core(
            LogfmtEncoder::new(EncoderConfig::production().with_time_key("")),
            logfmt_sink.clone(),
            Level::Info,
        ),
    ]);

    let exploding = ObjectMarshalerFn(|_: &mut dyn ObjectEncoder| -> Result<()> {
        panic!("boom")
    });
    assert!(log(
        &core,
        Entry::new(Level::Info, "survives"),
        &[Field::object("user", exploding), Field::u64("status", 200)],
    ));

    let record = &json_lines(&contents(&json_sink))[0];
    assert_eq!(record["msg"], "survives");
    assert_eq!(record["user"], serde_json::json!({}));
    assert_eq!(record["userError"], "PANIC=boom");
    assert_eq!(record["status"], 200);

    let line = contents(&logfmt_sink);
    assert!(line.contains("msg=\"survives\""));
    assert!(line.contains("userError=\"PANIC=boom\""));
    assert!(line.contains("status=200"));
}

#[test]
fn test_sampling_end_to_end() {
    let sink = memory_sink();
    let core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        sink.clone(),
        Level::Debug,
    );
    let sampled: Arc<dyn Core> = Sampler::builder(core)
        .tick(Duration::from_secs(1))
        .first(2)
        .thereafter(3)
        .reporting(true)
        .build();

    let start = chrono::Utc.timestamp_opt(1_000, 0).unwrap();
    let mut written = 0;
    for _ in 0..10 {
        if log(&sampled, Entry::new(Level::Info, "repeat").with_time(start), &[]) {
            written += 1;
        }
    }
    // n = 1, 2, 5, 8
    assert_eq!(written, 4);

    // A new window reports what was dropped from the previous one
    let later = start + chrono::Duration::seconds(2);
    assert!(log(
        &sampled,
        Entry::new(Level::Info, "repeat").with_time(later),
        &[]
    ));

    let lines = json_lines(&contents(&sink));
    assert_eq!(lines.len(), 6);
    let report = &lines[4];
    assert_eq!(report["msg"], "sampler dropped log messages");
    assert_eq!(report["sampledMessage"], "repeat");
    assert_eq!(report["sampledLevel"], "info");
    assert_eq!(report["dropped"], 6);
    assert_eq!(lines[5]["msg"], "repeat");
}

#[test]
fn test_sampler_ignores_disabled_levels() {
    let sink = memory_sink();
    let core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        sink.clone(),
        Level::Info,
    );
    let sampler = Sampler::new(core, Duration::from_secs(1), 1, 0);
    let sampled: Arc<dyn Core> = sampler.clone();

    for _ in 0..5 {
        assert!(!log(&sampled, Entry::new(Level::Debug, "noise"), &[]));
    }
    assert_eq!(sampler.metrics().total_count(), 0);
    assert!(log(&sampled, Entry::new(Level::Info, "first"), &[]));
    assert!(!log(&sampled, Entry::new(Level::Info, "first"), &[]));
}

#[test]
fn test_hooks_lazy_and_increase_level() {
    let sink = memory_sink();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let hook: EntryHook = Arc::new(move |_entry: &Entry| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        sink.clone(),
        Level::Debug,
    );
    let core = register_hooks(core, vec![hook]);
    let core = lazy_with(core, vec![Field::string("request", "r-1")]);
    let core = increase_level(core, Level::Warn).expect("raising the level is allowed");

    assert!(!log(&core, Entry::new(Level::Info, "skipped"), &[]));
    assert!(log(&core, Entry::new(Level::Warn, "kept"), &[]));
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    let lines = json_lines(&contents(&sink));
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["request"], "r-1");

    let lowered = increase_level(core, Level::Debug);
    assert!(matches!(
        lowered,
        Err(LoggerError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_atomic_level_changes_apply_to_children() {
    let sink = memory_sink();
    let level = AtomicLevel::new(Level::Error);
    let core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        sink.clone(),
        level.clone(),
    );
    let child = core.with(&[Field::bool("child", true)]);

    assert!(!log(&child, Entry::new(Level::Info, "quiet"), &[]));
    level.set_level(Level::Info);
    assert!(log(&child, Entry::new(Level::Info, "loud"), &[]));

    let lines = json_lines(&contents(&sink));
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["child"], true);
}

#[test]
fn test_checked_entry_reuse_is_rejected() {
    let sink = memory_sink();
    let errors = memory_sink();
    let core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        sink.clone(),
        Level::Info,
    );

    let mut checked = Arc::clone(&core)
        .check(&Entry::new(Level::Info, "once"), None)
        .expect("info is enabled")
        .with_error_output(errors.clone());
    checked.write(&[]).unwrap();
    assert!(matches!(checked.write(&[]), Err(LoggerError::EntryReused)));

    assert_eq!(json_lines(&contents(&sink)).len(), 1);
    assert!(contents(&errors).contains("Unsafe CheckedEntry re-use"));
}
