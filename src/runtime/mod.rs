//! Host HTTP runtime: configuration and the hyper server.

pub mod config;
pub mod server;

pub use config::ServerConfig;
pub use server::Server;
