//! Test support utilities for delivery tests

pub mod doubles;
#[path = "../../../ferry-lmtp/tests/support/mock_server.rs"]
pub mod mock_server;
