//! # SimpleWebSerial Core
//!
//! Core types shared by the SimpleWebSerial crates:
//! - the error hierarchy used by every public API
//! - JSON value helpers (string to number coercion)
//! - the line-delimited JSON message protocol
//! - the named event listener registry

pub mod error;
pub mod listener;
pub mod protocol;
pub mod value;

pub use error::{ConnectionError, Error, ListenerError, ProtocolError, Result};
pub use listener::{Listener, ListenerCallback, ListenerId, ListenerRegistry};
pub use protocol::{
    SerialMessage, DATA_MARKER, DATA_EVENT, ERROR_MARKER, EVENT_MARKER, LOG_MARKER,
    WARNING_MARKER,
};
pub use value::{parse_as_number, JsonArray, JsonObject, JsonValue};
