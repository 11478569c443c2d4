//! Serial connection to a device
//!
//! A [`SerialConnection`] owns the port, a background read loop and the
//! listener registry. Incoming lines are decoded into [`SerialMessage`]s:
//! device log lines go to `tracing`, events go to the listeners registered
//! with [`SerialConnection::on`] and every message is broadcast to
//! [`SerialConnection::subscribe`] receivers.

use crate::communication::serial::{list_ports, RealSerialPort, SerialPort};
use crate::communication::transformer::{LineBreakTransformer, Utf8ChunkDecoder};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use simplewebserial_core::{
    parse_as_number, ConnectionError, Error, JsonValue, Listener, ListenerRegistry, Result,
    SerialMessage, DATA_MARKER, EVENT_MARKER,
};
use simplewebserial_settings::ConnectionConfiguration;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::broadcast;

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

const READ_BUFFER_SIZE: usize = 1024;
const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Create a connection from a configuration (or just a baud rate)
///
/// The connection is not opened yet; call
/// [`SerialConnection::start_connection`] to open the port.
pub fn setup_serial_connection(
    configuration: impl Into<ConnectionConfiguration>,
) -> Result<SerialConnection> {
    SerialConnection::new(configuration.into())
}

/// Background read loop
struct ReadLoop {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Everything the read loop needs, shared with the connection
#[derive(Clone)]
struct Dispatcher {
    configuration: Arc<RwLock<ConnectionConfiguration>>,
    listeners: ListenerRegistry,
    messages: broadcast::Sender<SerialMessage>,
}

impl Dispatcher {
    /// Decode a received line and dispatch it
    fn handle_line(&self, line: &str) {
        let log_incoming = self.configuration.read().log_incoming_serial_data;

        match SerialMessage::decode(line) {
            Ok(Some(message)) => {
                if log_incoming {
                    tracing::info!("<< {:?}", message);
                }
                self.dispatch(message);
            }
            Ok(None) => {
                if log_incoming {
                    tracing::info!("<< {}", line);
                }
            }
            Err(e) => {
                if log_incoming {
                    tracing::info!("<< {}", line);
                }
                tracing::trace!("Ignoring line: {}", e);
            }
        }
    }

    fn dispatch(&self, message: SerialMessage) {
        match &message {
            SerialMessage::Warning(text) => tracing::warn!("[ARDUINO] {}", text),
            SerialMessage::Log(text) => tracing::info!("[ARDUINO] {}", text),
            SerialMessage::Error(text) => tracing::error!("[ARDUINO] {}", text),
            SerialMessage::Data(_) | SerialMessage::Event { .. } => {
                self.listeners.dispatch(&message);
            }
        }

        if self.messages.receiver_count() > 0 {
            let _ = self.messages.send(message);
        }
    }
}

/// A serial connection speaking the SimpleWebSerial protocol
pub struct SerialConnection {
    dispatcher: Dispatcher,
    port: Option<SharedPort>,
    port_name: Option<String>,
    reader: Option<ReadLoop>,
}

impl SerialConnection {
    /// Create a connection that is not opened yet
    pub fn new(configuration: ConnectionConfiguration) -> Result<Self> {
        configuration
            .validate()
            .map_err(|e| ConnectionError::InvalidParameters {
                reason: e.to_string(),
            })?;

        let listeners = ListenerRegistry::new();
        listeners.set_warn_about_unregistered_events(configuration.warn_about_unregistered_events);
        let (messages, _) = broadcast::channel(MESSAGE_CHANNEL_CAPACITY);

        Ok(Self {
            dispatcher: Dispatcher {
                configuration: Arc::new(RwLock::new(configuration)),
                listeners,
                messages,
            },
            port: None,
            port_name: None,
            reader: None,
        })
    }

    /// Current configuration
    pub fn configuration(&self) -> ConnectionConfiguration {
        self.dispatcher.configuration.read().clone()
    }

    /// Replace the configuration.
    ///
    /// Logging, number parsing and warning flags apply immediately; port,
    /// baud rate and line delimiter apply to the next connection.
    pub fn set_configuration(&self, configuration: ConnectionConfiguration) -> Result<()> {
        configuration
            .validate()
            .map_err(|e| ConnectionError::InvalidParameters {
                reason: e.to_string(),
            })?;
        self.dispatcher
            .listeners
            .set_warn_about_unregistered_events(configuration.warn_about_unregistered_events);
        *self.dispatcher.configuration.write() = configuration;
        Ok(())
    }

    /// Open the configured port and start reading.
    ///
    /// Without a configured port name the first port matching the
    /// configured filters is used.
    pub fn start_connection(&mut self) -> Result<()> {
        if self.ready() {
            return Err(ConnectionError::AlreadyConnected.into());
        }

        let configuration = self.configuration();
        let port_name = match configuration.port {
            Some(port) => port,
            None => list_ports(&configuration.filters)?
                .into_iter()
                .next()
                .map(|info| info.port_name)
                .ok_or_else(|| ConnectionError::PortNotFound {
                    port: describe_filters(&configuration),
                })?,
        };

        let port = RealSerialPort::open(&port_name, configuration.baud_rate).map_err(|e| {
            tracing::error!(
                "There was an error trying to open a serial connection. \
                 Please make sure the port is not occupied in another process. Error message: {}",
                e
            );
            e
        })?;

        self.start_with_port(Box::new(port))
    }

    /// Start reading from an already opened port
    pub fn start_with_port(&mut self, port: Box<dyn SerialPort>) -> Result<()> {
        if self.ready() {
            return Err(ConnectionError::AlreadyConnected.into());
        }
        // A previous read loop may have ended on its own
        self.close()?;

        let name = port.name();
        let port: SharedPort = Arc::new(Mutex::new(port));
        let stop = Arc::new(AtomicBool::new(false));
        let delimiter = self.dispatcher.configuration.read().line_delimiter.clone();

        let handle = {
            let port = port.clone();
            let stop = stop.clone();
            let dispatcher = self.dispatcher.clone();
            thread::Builder::new()
                .name("simplewebserial-reader".to_string())
                .spawn(move || read_loop(port, dispatcher, stop, &delimiter))?
        };

        tracing::info!("Serial connection established on {}", name);
        self.port = Some(port);
        self.port_name = Some(name);
        self.reader = Some(ReadLoop { stop, handle });
        Ok(())
    }

    /// Whether the port is open and the read loop is running
    pub fn ready(&self) -> bool {
        self.port.is_some()
            && self
                .reader
                .as_ref()
                .is_some_and(|reader| !reader.handle.is_finished())
    }

    /// Name of the open port
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Send an event to the device.
    ///
    /// With data the line is `[name, data]`; without data `name` itself is
    /// sent as unnamed data (`["_d", name]`). Does nothing while the
    /// connection is not [`ready`](Self::ready).
    pub fn send(&self, name: &str, data: Option<JsonValue>) -> Result<()> {
        let port = match &self.port {
            Some(port) if self.ready() => port,
            _ => {
                tracing::debug!("Not connected, dropping outgoing event '{}'", name);
                return Ok(());
            }
        };

        let (parse_numbers, log_outgoing, new_line) = {
            let configuration = self.dispatcher.configuration.read();
            (
                configuration.parse_strings_as_numbers,
                configuration.log_outgoing_serial_data,
                configuration.new_line_character.clone(),
            )
        };
        let coerce = |value: JsonValue| {
            if parse_numbers {
                parse_as_number(value)
            } else {
                value
            }
        };

        let message = match data {
            Some(data) => SerialMessage::event(name, coerce(data)),
            None => {
                if log_outgoing {
                    tracing::info!(">> {}", name);
                }
                SerialMessage::Data(coerce(Value::String(name.to_string())))
            }
        };

        let mut line = message.encode();
        if log_outgoing {
            tracing::info!(">> {}", line);
        }
        line.push_str(&new_line);

        port.lock().write_all(line.as_bytes()).map_err(|e| {
            tracing::error!("Failed to write to serial port: {}", e);
            Error::from(ConnectionError::ConnectionLost {
                reason: e.to_string(),
            })
        })
    }

    /// Send a bare event name (`["_e", name]`)
    pub fn send_event(&self, name: &str) -> Result<()> {
        self.send(EVENT_MARKER, Some(Value::String(name.to_string())))
    }

    /// Send unnamed data (`["_d", data]`)
    pub fn send_data(&self, data: JsonValue) -> Result<()> {
        self.send(DATA_MARKER, Some(data))
    }

    /// Register a listener for an incoming event
    pub fn on<F>(&self, name: impl Into<String>, callback: F) -> Listener
    where
        F: Fn(&JsonValue) + Send + Sync + 'static,
    {
        self.dispatcher.listeners.on(name, callback)
    }

    /// Remove a single listener; see [`ListenerRegistry::remove_listener`]
    pub fn remove_listener(&self, listener: &Listener) -> Result<bool> {
        Ok(self.dispatcher.listeners.remove_listener(listener)?)
    }

    /// Remove every listener of an event
    pub fn remove_listeners(&self, name: &str) -> bool {
        self.dispatcher.listeners.remove_listeners(name)
    }

    /// Call the listeners of `name` as if the event had been received
    pub fn emit(&self, name: &str, data: &JsonValue) -> bool {
        self.dispatcher.listeners.emit(name, data)
    }

    /// Registry backing [`on`](Self::on) and [`emit`](Self::emit)
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.dispatcher.listeners
    }

    /// Receive every decoded incoming message
    pub fn subscribe(&self) -> broadcast::Receiver<SerialMessage> {
        self.dispatcher.messages.subscribe()
    }

    /// Stop the read loop and release the port.
    ///
    /// Called from a listener (on the read loop's own thread) the loop is
    /// only told to stop; it exits once the listener returns.
    pub fn close(&mut self) -> Result<()> {
        let mut result = Ok(());

        if let Some(reader) = self.reader.take() {
            reader.stop.store(true, Ordering::SeqCst);
            if reader.handle.thread().id() == thread::current().id() {
                tracing::debug!("Closing from the read loop, not waiting for it");
            } else if reader.handle.join().is_err() {
                result = Err(Error::other("Serial read loop panicked"));
            }
        }

        if let Some(port) = self.port.take() {
            if let Err(e) = port.lock().close() {
                tracing::warn!("Failed to close serial port: {}", e);
            }
            if let Some(name) = self.port_name.take() {
                tracing::info!("Serial connection on {} closed", name);
            }
        }

        result
    }
}

impl Drop for SerialConnection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("{}", e);
        }
    }
}

impl std::fmt::Debug for SerialConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialConnection")
            .field("port", &self.port_name)
            .field("ready", &self.ready())
            .field("configuration", &*self.dispatcher.configuration.read())
            .field("listeners", &self.dispatcher.listeners)
            .finish()
    }
}

fn describe_filters(configuration: &ConnectionConfiguration) -> String {
    if configuration.filters.is_empty() {
        return "any serial device".to_string();
    }
    configuration
        .filters
        .iter()
        .map(|f| {
            format!(
                "vid={} pid={}",
                f.usb_vendor_id
                    .map_or_else(|| "*".to_string(), |v| format!("{:04x}", v)),
                f.usb_product_id
                    .map_or_else(|| "*".to_string(), |p| format!("{:04x}", p))
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn read_loop(port: SharedPort, dispatcher: Dispatcher, stop: Arc<AtomicBool>, delimiter: &str) {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut decoder = Utf8ChunkDecoder::new();
    let mut transformer = LineBreakTransformer::with_delimiter(delimiter);

    while !stop.load(Ordering::SeqCst) {
        // Release the lock before dispatching so listeners can send
        let read = port.lock().read(&mut buffer);
        match read {
            Ok(0) => break,
            Ok(n) => {
                let text = decoder.decode(&buffer[..n]);
                for line in transformer.transform(&text) {
                    dispatcher.handle_line(&line);
                }
            }
            Err(ref e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                let baud_rate = dispatcher.configuration.read().baud_rate;
                tracing::error!(
                    "Could not read serial data. Please make sure the same baud rate is used on \
                     device (Serial.begin()) and library. Library currently uses baud rate {}. \
                     Please also make sure you're not sending too much serial data. Consider \
                     using (a higher) delay() to throttle the amount of data sent.",
                    baud_rate
                );
                tracing::error!("{}", e);
                break;
            }
        }
    }

    let rest = decoder.finish();
    let mut lines = transformer.transform(&rest);
    lines.extend(transformer.flush());
    for line in lines {
        dispatcher.handle_line(&line);
    }
    tracing::debug!("[readLoop] DONE");
}
