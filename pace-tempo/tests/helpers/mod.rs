//! Test Helper Utilities
//!
//! Shared utilities for testing pace-tempo

#![allow(dead_code)]

pub mod log_capture;
pub mod lookup_server;
pub mod mocks;

pub use log_capture::LogCapture;
pub use lookup_server::{LookupServer, Reply};
pub use mocks::{
    result_record, EchoLookup, LibraryCall, MockCache, MockCatalog, MockLibrary, MockLookup,
};
