//! TTL session lifecycle: create, keep alive, recreate on expiry, destroy.

mod session;
pub use session::*;

#[cfg(test)]
mod session_test;
