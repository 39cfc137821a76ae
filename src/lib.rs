pub mod server;
pub mod session;
pub mod codec;
pub mod cas;
pub mod config;
pub mod error;
