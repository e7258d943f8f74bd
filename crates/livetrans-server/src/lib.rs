//! # livetrans-server
//!
//! Axum HTTP + `WebSocket` front end for the translation relay.
//!
//! - `WebSocket` endpoint: one debounce session per connection, fragments in,
//!   translation results out
//! - HTTP endpoints: `/health` and a JSON `/metrics` snapshot
//! - Heartbeat pings with missed-pong disconnects
//! - Graceful shutdown via `CancellationToken` + `TaskTracker`

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod context;
pub mod health;
pub mod heartbeat;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use context::RelayContext;
pub use server::RelayServer;
pub use shutdown::ShutdownCoordinator;
