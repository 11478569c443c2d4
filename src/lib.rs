//! # SimpleWebSerial
//!
//! Talk to a microcontroller over a serial port using named JSON events.
//!
//! ## Architecture
//!
//! SimpleWebSerial is organized as a workspace with multiple crates:
//!
//! 1. **simplewebserial-core** - Errors, message protocol, event listeners
//! 2. **simplewebserial-settings** - Connection configuration and its files
//! 3. **simplewebserial-communication** - Serial ports, read loop, device helper
//! 4. **simplewebserial** - Command line tool that integrates all crates
//!
//! ## Example
//!
//! ```no_run
//! use simplewebserial::{setup_serial_connection, ConnectionConfiguration};
//!
//! # fn main() -> simplewebserial::Result<()> {
//! let mut connection = setup_serial_connection(ConnectionConfiguration::default())?;
//! connection.start_connection()?;
//! connection.on("temperature", |value| println!("{}", value));
//! connection.send("led", Some(serde_json::json!(1)))?;
//! # Ok(())
//! # }
//! ```

pub use simplewebserial_communication::{
    communication, firmware, list_ports, setup_serial_connection, LineBreakTransformer,
    RealSerialPort, SerialConnection, SerialPort, SerialPortInfo, SimpleWebSerial,
    Utf8ChunkDecoder, INSTANCE_CREATED_MESSAGE,
};

pub use simplewebserial_core::{
    parse_as_number, ConnectionError, Error, JsonValue, Listener, ListenerError, ListenerId,
    ListenerRegistry, ProtocolError, Result, SerialMessage, DATA_EVENT, DATA_MARKER,
    ERROR_MARKER, EVENT_MARKER, LOG_MARKER, WARNING_MARKER,
};

pub use simplewebserial_settings::{
    ConnectionConfiguration, SerialPortFilter, SettingsError, SettingsResult, DEFAULT_BAUDRATE,
    DEFAULT_LINE_DELIMITER, DEFAULT_NEW_LINE_CHARACTER,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging
///
/// Console output to stderr, filtered by `RUST_LOG`. Without `RUST_LOG`
/// the level is INFO, or DEBUG when `verbose` is set.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true)
        .with_thread_names(verbose)
        .with_line_number(verbose);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
