//! Long-polling client for the Apollo configuration center.
//!
//! Loads a set of namespaces for one application, keeps them in an
//! in-process cache, and watches the server for changes on a dedicated
//! background thread. Every committed change is reported to a listener as a
//! [`ChangeSet`] computed by [`diff`].
//!
//! Building blocks, leaves first:
//! - [`diff`]: snapshot differ
//! - [`NamespaceState`]: per-namespace cache entry
//! - [`HttpClient`]: HTTP/1.1 transport with phase timeouts and a watchdog
//! - [`ApolloClient`]: the long-polling engine

mod changes;
mod client;
mod config;
pub mod constants;
mod errors;
mod namespace;
mod network;
mod protocol;

pub use changes::*;
pub use client::*;
pub use config::*;
pub use errors::*;
pub use namespace::*;
pub use network::*;
pub use protocol::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
