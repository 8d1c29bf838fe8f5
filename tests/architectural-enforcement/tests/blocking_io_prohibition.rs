//! Integration Test: Blocking I/O Prohibition
//!
//! Async code must use `tokio::fs` and `tokio::net`. Blocking calls are
//! allowed in synchronous functions (configuration loading runs before any
//! socket is opened) and in test code.

use architectural_enforcement::{blocking_io_violations, production_sources};

#[test]
fn test_no_blocking_io_in_async_code() {
    let violations: Vec<_> = production_sources()
        .iter()
        .flat_map(blocking_io_violations)
        .collect();

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O found in async code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nRequired async equivalents:");
        eprintln!("  - tokio::fs::write().await instead of std::fs::write()");
        eprintln!("  - tokio::net::TcpStream instead of std::net::TcpStream");

        panic!(
            "\nFound {} blocking I/O violation(s) in async code.",
            violations.len()
        );
    }
}

#[test]
fn test_telemetry_writer_is_async() {
    let telemetry = production_sources()
        .into_iter()
        .find(|file| file.path.ends_with("telemetry.rs"))
        .expect("telemetry.rs not found");

    let uses_async_write = telemetry
        .lines
        .iter()
        .any(|line| line.contains("tokio::fs::write"));
    assert!(uses_async_write, "telemetry flush must go through tokio::fs");
}
