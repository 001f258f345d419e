//! Stress tests for concurrent use of the logging core
//!
//! These tests verify:
//! - Shared fields can be encoded from many threads at once
//! - Concurrent writes through one core never interleave records
//! - The sampler's shared counters stay consistent under contention
//! - The buffered writer keeps every record under concurrent writes

use rust_logger_core::encoders::MapObjectEncoder;
use rust_logger_core::prelude::*;
use rust_logger_core::sinks::{lock, open_file, LockedWriteSyncer};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const THREADS: usize = 100;

fn memory_sink() -> Arc<LockedWriteSyncer<Vec<u8>>> {
    Arc::new(lock(Vec::new()))
}

fn parse_lines(bytes: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is a whole record"))
        .collect()
}

/// A single set of fields reused by every thread must encode identically
#[test]
fn test_shared_fields_across_threads() {
    let user = ObjectMarshalerFn(|enc: &mut dyn ObjectEncoder| {
        enc.add_str("name", "alice");
        enc.add_u64("id", 42);
        Ok(())
    });
    let fields = Arc::new(vec![
        Field::string("service", "api"),
        Field::object("user", user),
        Field::array("ports", vec![80_i64, 443]),
        Field::duration("timeout", Duration::from_secs(5)),
        Field::any("meta", serde_json::json!({"region": "eu"})),
        Field::error(std::io::Error::new(std::io::ErrorKind::Other, "timeout")),
    ]);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let fields = Arc::clone(&fields);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut enc = MapObjectEncoder::new();
                rust_logger_core::add_fields(&mut enc, &fields);
                Value::Object(enc.into_fields())
            })
        })
        .collect();

    let results: Vec<Value> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .collect();
    assert!(results.iter().all(|r| r == &results[0]));
    assert_eq!(results[0]["user"]["name"], "alice");
    assert_eq!(results[0]["meta"]["region"], "eu");
}

/// Concurrent entries through one core produce one valid line each
#[test]
fn test_concurrent_writes_are_whole_lines() {
    let sink = memory_sink();
    let root = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        sink.clone(),
        Level::Debug,
    )
    .with(&[Field::string("app", "stress")]);

    let per_thread = 50;
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let root = Arc::clone(&root);
            thread::spawn(move || {
                let core = root.with(&[Field::usize("thread", t)]);
                for i in 0..per_thread {
                    let entry = Entry::new(Level::Info, format!("message {}", i));
                    if let Some(mut checked) = Arc::clone(&core).check(&entry, None) {
                        checked.write(&[Field::usize("seq", i)]).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let records = parse_lines(&sink.lock_inner());
    assert_eq!(records.len(), THREADS * per_thread);

    let mut seen = HashSet::new();
    for record in &records {
        assert_eq!(record["app"], "stress");
        let key = (record["thread"].as_u64().unwrap(), record["seq"].as_u64().unwrap());
        assert!(seen.insert(key), "duplicate record {:?}", key);
    }
}

/// Children of one sampler share its counters
#[test]
fn test_sampler_under_contention() {
    let sink = memory_sink();
    let core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        sink.clone(),
        Level::Debug,
    );
    let sampler = Sampler::new(core, Duration::from_secs(3600), 10, 0);
    let root: Arc<dyn Core> = sampler.clone();
    let written = Arc::new(AtomicUsize::new(0));

    // Open the counting window before the threads race for it
    let entry = Entry::new(Level::Warn, "hot path");
    if let Some(mut checked) = Arc::clone(&root).check(&entry, None) {
        checked.write(&[]).unwrap();
        written.fetch_add(1, Ordering::SeqCst);
    }

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let core = root.with(&[Field::usize("thread", t)]);
            let written = Arc::clone(&written);
            thread::spawn(move || {
                for _ in 0..20 {
                    let entry = Entry::new(Level::Warn, "hot path");
                    if let Some(mut checked) = Arc::clone(&core).check(&entry, None) {
                        checked.write(&[]).unwrap();
                        written.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    assert_eq!(written.load(Ordering::SeqCst), 10);
    assert_eq!(sampler.metrics().sampled_count(), 10);
    assert_eq!(sampler.metrics().total_count(), (THREADS * 20 + 1) as u64);
    assert_eq!(parse_lines(&sink.lock_inner()).len(), 10);
}

/// No record is lost or torn when many threads share a buffered file
#[test]
fn test_buffered_file_under_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("buffered_stress.log");

    let buffered = Arc::new(
        BufferedWriteSyncer::builder(open_file(&log_file).unwrap())
            .size(4096)
            .flush_interval(Duration::from_millis(5))
            .build(),
    );
    let core = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        buffered.clone(),
        Level::Info,
    );

    let per_thread = 30;
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let core = Arc::clone(&core);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let entry = Entry::new(Level::Info, "buffered");
                    if let Some(mut checked) = Arc::clone(&core).check(&entry, None) {
                        checked
                            .write(&[Field::usize("thread", t), Field::usize("seq", i)])
                            .unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }
    buffered.stop().expect("Failed to stop buffered writer");

    let content = std::fs::read(&log_file).expect("Failed to read log file");
    assert_eq!(parse_lines(&content).len(), THREADS * per_thread);
}

/// Tee children keep working when one of them fails every write
#[test]
fn test_tee_isolates_failures_under_load() {
    struct Failing;

    impl WriteSyncer for Failing {
        fn write(&self, _buf: &[u8]) -> Result<usize> {
            Err(LoggerError::other("unavailable"))
        }

        fn sync(&self) -> Result<()> {
            Ok(())
        }
    }

    let healthy = memory_sink();
    let errors = memory_sink();
    let core = new_tee(vec![
        new_core(
            JsonEncoder::new(EncoderConfig::production()),
            Arc::new(Failing),
            Level::Info,
        ),
        new_core(
            JsonEncoder::new(EncoderConfig::production()),
            healthy.clone(),
            Level::Info,
        ),
    ]);

    let failures = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..THREADS / 4)
        .map(|_| {
            let core = Arc::clone(&core);
            let errors = Arc::clone(&errors);
            let failures = Arc::clone(&failures);
            thread::spawn(move || {
                for _ in 0..10 {
                    let entry = Entry::new(Level::Info, "fan-out");
                    if let Some(checked) = Arc::clone(&core).check(&entry, None) {
                        let mut checked = checked.with_error_output(errors.clone());
                        if checked.write(&[]).is_err() {
                            failures.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let total = THREADS / 4 * 10;
    assert_eq!(failures.load(Ordering::SeqCst), total);
    assert_eq!(parse_lines(&healthy.lock_inner()).len(), total);
    assert_eq!(
        String::from_utf8_lossy(&errors.lock_inner()).lines().count(),
        total
    );
}
