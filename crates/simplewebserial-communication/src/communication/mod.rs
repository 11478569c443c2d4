//! Host-side communication with the device
//!
//! - [`serial`]: port discovery and raw port access
//! - [`transformer`]: byte decoding and line splitting
//! - [`connection`]: the connection, its read loop and event dispatch

pub mod connection;
pub mod serial;
pub mod transformer;
