//! Test support utilities for LMTP sessions

pub mod mock_server;
