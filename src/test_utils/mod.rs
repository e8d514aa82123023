//! Shared fixtures for unit and integration tests.

mod scripted_transport;

pub use scripted_transport::*;
