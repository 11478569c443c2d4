//! Device-side SimpleWebSerial helper
//!
//! Announces itself on the serial output when created. Event registration
//! and sending on the device are not implemented yet: [`SimpleWebSerial::on`]
//! and [`SimpleWebSerial::send`] are placeholders without behavior.

use simplewebserial_core::Result;
use std::io::Write;

/// Line printed when a helper instance is created
pub const INSTANCE_CREATED_MESSAGE: &str = "Library instance created!";

/// Line ending of the device's `println`
const PRINTLN_ENDING: &str = "\r\n";

/// Device-side helper bound to a serial output
#[derive(Debug)]
pub struct SimpleWebSerial<W: Write> {
    serial: W,
}

impl<W: Write> SimpleWebSerial<W> {
    /// Create the helper, printing [`INSTANCE_CREATED_MESSAGE`] to `serial`
    pub fn new(mut serial: W) -> Result<Self> {
        let line = format!("{}{}", INSTANCE_CREATED_MESSAGE, PRINTLN_ENDING);
        serial.write_all(line.as_bytes())?;
        tracing::trace!("Device helper announced on serial output");
        Ok(Self { serial })
    }

    /// Placeholder for registering an event callback (event name, callback)
    pub fn on(&mut self) {}

    /// Placeholder for sending an event (event name and data, or just data)
    pub fn send(&mut self) {}

    /// Give back the serial output
    pub fn into_inner(self) -> W {
        self.serial
    }
}
