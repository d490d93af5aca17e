//! Poll blackhole threat feeds and announce their prefixes as BGP routes.

pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod feeds;
pub mod handler;
pub mod rib;
pub mod route;
pub mod stats;
mod utils;

pub use config::ServerConfig;
pub use handler::{serve, Server};
