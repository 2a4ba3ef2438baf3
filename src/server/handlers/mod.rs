//! HTTP handlers for the server.

pub mod results;
pub mod watermark;
