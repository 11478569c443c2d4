//! SimpleWebSerial Settings Crate
//!
//! Handles the connection configuration and its persistence.

pub mod config;
pub mod error;

pub use config::{
    ConnectionConfiguration, SerialPortFilter, DEFAULT_BAUDRATE, DEFAULT_LINE_DELIMITER,
    DEFAULT_NEW_LINE_CHARACTER,
};
pub use error::{ConfigError, SettingsError, SettingsResult};
