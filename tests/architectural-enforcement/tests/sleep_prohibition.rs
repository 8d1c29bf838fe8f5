//! Integration Test: Sleep Prohibition
//!
//! Production code in the bridge and the CLI must not call sleep. Waiting
//! happens on I/O, channels, `Notify`, or `tokio::time::interval`.

use architectural_enforcement::{production_sources, sleep_violations};

#[test]
fn test_no_sleep_in_production_code() {
    let sources = production_sources();
    assert!(
        !sources.is_empty(),
        "No production sources found; check PRODUCTION_ROOTS"
    );

    let violations: Vec<_> = sources.iter().flat_map(sleep_violations).collect();

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nAcceptable alternatives:");
        eprintln!("  - tokio::time::interval() for periodic work");
        eprintln!("  - awaiting a channel, Notify, or socket read");
        eprintln!("  - tokio::time::timeout() around the awaited event (tests)");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}
