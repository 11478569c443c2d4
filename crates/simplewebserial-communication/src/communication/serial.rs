//! Serial port access
//!
//! Provides low-level serial port operations for a direct connection to a
//! microcontroller board via USB or RS-232.
//!
//! Supports:
//! - Port enumeration, restricted to board-like devices
//! - USB vendor/product filters
//! - Baud rate configuration
//! - Blocking read/write with a short read timeout

use simplewebserial_core::{ConnectionError, Result};
use simplewebserial_settings::SerialPortFilter;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Read timeout of real ports; the read loop polls at this rate
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyACM0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Arduino Uno")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// Serial number if available
    pub serial_number: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set serial number
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }

    /// Check this port against a filter list; an empty list accepts every port
    pub fn matches_filters(&self, filters: &[SerialPortFilter]) -> bool {
        filters.is_empty() || filters.iter().any(|f| f.matches(self.vid, self.pid))
    }
}

/// List serial ports a board could be attached to
///
/// Ports are restricted to board-like names:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
///
/// and then to those matching any of `filters` (all when empty).
pub fn list_ports(filters: &[SerialPortFilter]) -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        ConnectionError::Enumeration {
            reason: e.to_string(),
        }
    })?;

    let port_infos = ports
        .iter()
        .filter(|port| is_candidate_port(&port.port_name))
        .map(to_port_info)
        .filter(|info| info.matches_filters(filters))
        .collect();

    Ok(port_infos)
}

fn to_port_info(port: &serialport::SerialPortInfo) -> SerialPortInfo {
    let info = SerialPortInfo::new(&port.port_name, get_port_description(port));

    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            let mut info = info.with_usb_ids(usb_info.vid, usb_info.pid);
            if let Some(ref mfg) = usb_info.manufacturer {
                info = info.with_manufacturer(mfg);
            }
            if let Some(ref serial) = usb_info.serial_number {
                info = info.with_serial_number(serial);
            }
            info
        }
        _ => info,
    }
}

/// Check if a port name looks like a board connection
fn is_candidate_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    if port_name.starts_with("/dev/ttyUSB") || port_name.starts_with("/dev/ttyACM") {
        return true;
    }

    port_name.starts_with("/dev/cu.usbserial-") || port_name.starts_with("/dev/cu.usbmodem")
}

/// Get a user-friendly description for a port
fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Low-level serial port interface
///
/// `read` is expected to return `ErrorKind::TimedOut` (or `WouldBlock`)
/// when no data is available, and `Ok(0)` once the stream has ended.
pub trait SerialPort: Send {
    /// Write data to the port
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read data from the port
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Get the port name
    fn name(&self) -> String;

    /// Close the port
    fn close(&mut self) -> io::Result<()>;

    /// Write the whole buffer
    fn write_all(&mut self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            match self.write(data) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ))
                }
                Ok(n) => data = &data[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Trait for serial port I/O operations
pub trait ReadWrite: Read + Write + Send {}
impl<T: Read + Write + Send> ReadWrite for T {}

/// Real serial port implementation using serialport crate
pub struct RealSerialPort {
    name: String,
    port: Box<dyn ReadWrite>,
}

impl RealSerialPort {
    /// Open a serial port at the given baud rate (8N1, no flow control)
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let builder = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None);

        match builder.open_native() {
            Ok(port) => {
                tracing::info!("Opened serial port {} at {} baud", port_name, baud_rate);
                Ok(RealSerialPort {
                    name: port_name.to_string(),
                    port: Box::new(port),
                })
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", port_name, e);
                Err(ConnectionError::FailedToOpen {
                    port: port_name.to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }
}

impl std::fmt::Debug for RealSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealSerialPort")
            .field("name", &self.name)
            .finish()
    }
}

impl SerialPort for RealSerialPort {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.port.write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn close(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}
