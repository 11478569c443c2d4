//! Error handling for SimpleWebSerial
//!
//! Provides error types for all layers of the library:
//! - Connection errors (opening and using serial ports)
//! - Protocol errors (encoding and decoding line messages)
//! - Listener errors (event registry misuse)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Represents errors related to serial port access and the connection
/// lifecycle.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// The connection has not been started
    #[error("Serial connection has not been established")]
    NotConnected,

    /// The connection has already been started
    #[error("Serial connection has already been established.")]
    AlreadyConnected,

    /// No port matched the configured name or filters
    #[error("Port not found: {port}")]
    PortNotFound {
        /// The port name or filter description that was searched for.
        port: String,
    },

    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Port enumeration failed
    #[error("Failed to enumerate ports: {reason}")]
    Enumeration {
        /// The reason enumeration failed.
        reason: String,
    },

    /// Connection lost while reading or writing
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// Invalid connection parameters
    #[error("Invalid connection parameters: {reason}")]
    InvalidParameters {
        /// The reason the parameters are invalid.
        reason: String,
    },
}

/// Protocol error type
///
/// Represents errors while turning messages into lines and back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line was not valid JSON
    #[error("Malformed message: {reason}")]
    Malformed {
        /// The parser error.
        reason: String,
    },

    /// The JSON document does not describe a message
    #[error("Unsupported message shape: {line}")]
    UnsupportedShape {
        /// The offending line.
        line: String,
    },
}

/// Listener error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// No listener has ever been registered for this event name
    #[error("There is no listener named {name}.")]
    NoListener {
        /// The event name.
        name: String,
    },
}

/// Main error type for SimpleWebSerial
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Listener error
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a protocol error
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }

    /// Check if this is a listener error
    pub fn is_listener_error(&self) -> bool {
        matches!(self, Error::Listener(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
