//! Test log setup, pulled into the other test targets with `mod logging_;`.
#![allow(dead_code)]

use tracing_subscriber::EnvFilter;

/// Installs a `RUST_LOG`-filtered subscriber that writes through the test harness.
pub fn init() {
	// Fails if another test in the same binary got there first, which is fine.
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init()
		.ok();
}
