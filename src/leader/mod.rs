//! Leader election over a Consul KV lock key.

mod elector;
mod observer;
pub use elector::*;
pub use observer::*;
