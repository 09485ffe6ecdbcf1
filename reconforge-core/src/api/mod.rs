//! HTTP API surface over the engine

pub mod http;
pub mod types;

pub use http::ApiServer;
