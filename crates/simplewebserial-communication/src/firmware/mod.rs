//! Device-side helpers
//!
//! Code meant to run on (or stand in for) the microcontroller end of the
//! serial link.

mod simple_web_serial;

pub use simple_web_serial::{SimpleWebSerial, INSTANCE_CREATED_MESSAGE};
