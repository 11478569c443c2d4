//! # SimpleWebSerial Communication
//!
//! Serial communication between a host application and a microcontroller.
//! Messages are line-delimited JSON events; the host side opens the port,
//! splits incoming text into lines, decodes messages and dispatches them to
//! named listeners. The `firmware` module holds the device-side helper.

pub mod communication;
pub mod firmware;

pub use communication::{
    connection::{setup_serial_connection, SerialConnection},
    serial::{list_ports, RealSerialPort, SerialPort, SerialPortInfo},
    transformer::{LineBreakTransformer, Utf8ChunkDecoder},
};

pub use firmware::{SimpleWebSerial, INSTANCE_CREATED_MESSAGE};

pub use simplewebserial_core::{JsonValue, Listener, SerialMessage};
pub use simplewebserial_settings::{ConnectionConfiguration, SerialPortFilter, DEFAULT_BAUDRATE};
