//! Basic core usage example
//!
//! Demonstrates building cores with different encoders, accumulating
//! context, sampling, and fanning out to several destinations.
//!
//! Run with: cargo run --example basic_usage

use rust_logger_core::prelude::*;
use rust_logger_core::sinks;
use std::sync::Arc;
use std::time::Duration;

fn log(core: &Arc<dyn Core>, level: Level, message: &str, fields: &[Field]) -> Result<()> {
    let entry = Entry::new(level, message).with_caller(EntryCaller::here());
    match Arc::clone(core).check(&entry, None) {
        Some(mut checked) => checked.write(fields),
        None => Ok(()),
    }
}

fn main() -> Result<()> {
    println!("=== Rust Logger Core - Basic Usage Example ===\n");

    // JSON to stdout at info and above
    let level = AtomicLevel::new(Level::Info);
    let json = new_core(
        JsonEncoder::new(EncoderConfig::production()),
        sinks::stdout(),
        level.clone(),
    );

    println!("1. JSON output at different levels:");
    log(&json, Level::Debug, "This is a debug message (hidden)", &[])?;
    log(&json, Level::Info, "This is an info message", &[])?;
    log(&json, Level::Warn, "This is a warning message", &[])?;
    log(&json, Level::Error, "This is an error message", &[])?;

    println!("\n2. Changing the level at runtime:");
    level.set_level(Level::Debug);
    log(&json, Level::Debug, "Debug message (now visible)", &[])?;

    println!("\n3. Context and structured fields:");
    let request = json.with(&[
        Field::string("request_id", "req-42"),
        Field::namespace("http"),
    ]);
    log(
        &request,
        Level::Info,
        "request served",
        &[
            Field::string("method", "GET"),
            Field::u64("status", 200),
            Field::duration("elapsed", Duration::from_millis(37)),
        ],
    )?;

    println!("\n4. Console output for humans:");
    let console = new_core(
        ConsoleEncoder::new(EncoderConfig::development()),
        sinks::stdout(),
        Level::Debug,
    );
    log(
        &console,
        Level::Warn,
        "disk space low",
        &[Field::u64("free_mb", 512)],
    )?;

    println!("\n5. Sampling repeated messages (first 2, then every 5th):");
    let sampler = Sampler::builder(Arc::clone(&console))
        .tick(Duration::from_secs(1))
        .first(2)
        .thereafter(5)
        .build();
    let sampled: Arc<dyn Core> = sampler.clone();
    for i in 0..12 {
        log(&sampled, Level::Info, "polling", &[Field::i64("attempt", i)])?;
    }
    let metrics = sampler.metrics();
    println!(
        "   kept {} of {} ({:.0}%)",
        metrics.sampled_count(),
        metrics.total_count(),
        metrics.effective_sample_rate() * 100.0
    );

    println!("\n6. Fan-out to JSON and logfmt:");
    let logfmt = new_core(
        LogfmtEncoder::new(EncoderConfig::production()),
        sinks::stdout(),
        Level::Info,
    );
    let tee = new_tee(vec![Arc::clone(&json), logfmt]);
    log(&tee, Level::Info, "written twice", &[Field::bool("tee", true)])?;

    tee.sync()?;
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
