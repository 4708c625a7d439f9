//! Fixtures shared by the integration tests: a small social graph of users, their friends
//! and the reviews they wrote.

pub mod mock_graph;

pub use mock_graph::{social_metadata, MockGraph};

/// Send `log` output to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
