//! Client implementations of the external service boundaries.

pub mod http;
pub mod sse;

pub use http::HttpPipelineClient;
