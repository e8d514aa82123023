//! Client-side coordination recipes for Consul.
//!
//! The crate is built around a long-poll watch engine ([`ConsulWatcher`]) that
//! keeps one blocking-query loop alive per watched endpoint, plus the recipes
//! layered on top of it:
//! - [`Session`] - TTL-bound ephemeral session with periodic renewal
//! - [`LeaderElector`] - distributed mutual exclusion over a Consul lock key
//! - [`EndpointWatcher`] - typed watches with a pluggable JSON decoder
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//!
//! use consul_recipes::ConsulRecipes;
//! use consul_recipes::RecipesConfig;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let recipes = ConsulRecipes::from_config(RecipesConfig::default()).unwrap();
//!
//!     let watcher = Arc::new(recipes.consul_watcher().unwrap());
//!     let handle = watcher.watch_endpoint(
//!         "/v1/catalog/services",
//!         |result| println!("catalog changed at index {}", result.index()),
//!         |error| eprintln!("watch failure: {error}"),
//!     );
//!
//!     // ... later
//!     handle.cancel();
//!     watcher.close().await;
//! }
//! ```

mod config;
mod errors;
mod leader;
mod recipes;
mod session;
pub mod test_utils;
mod transport;
mod watch;

#[cfg(test)]
mod recipes_test;

pub use config::*;
pub use errors::*;
pub use leader::*;
pub use recipes::*;
pub use session::*;
pub use transport::*;
pub use watch::*;
