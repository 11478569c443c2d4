use anyhow::Context;
use clap::{Parser, Subcommand};
use simplewebserial::{
    init_logging, list_ports, setup_serial_connection, ConnectionConfiguration, JsonValue,
    SerialConnection, SerialMessage,
};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

const DISCONNECT_CHECK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "simplewebserial")]
#[command(about = "Exchange JSON events with a microcontroller over serial", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Serial port to open (first matching board when omitted)
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Baud rate, must match Serial.begin() on the device
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Configuration file (JSON or TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports a board could be attached to
    Ports,

    /// Print every message received from the device
    Monitor,

    /// Send a single event to the device
    Send {
        /// Event name (sent as unnamed data when no data is given)
        event: String,

        /// Event data as JSON; plain text is sent as a string
        data: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let configuration = load_configuration(&cli)?;

    match cli.command {
        Commands::Ports => print_ports(&configuration),
        Commands::Monitor => monitor(configuration).await,
        Commands::Send { event, data } => send(configuration, &event, data.as_deref()),
    }
}

fn load_configuration(cli: &Cli) -> anyhow::Result<ConnectionConfiguration> {
    let mut configuration = match &cli.config {
        Some(path) => ConnectionConfiguration::load_from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => match ConnectionConfiguration::default_path() {
            Ok(path) => ConnectionConfiguration::load_or_default(&path)?,
            Err(_) => ConnectionConfiguration::default(),
        },
    };

    if let Some(port) = &cli.port {
        configuration = configuration.with_port(port.clone());
    }
    if let Some(baud) = cli.baud {
        configuration = configuration.with_baud_rate(baud);
    }

    Ok(configuration)
}

fn print_ports(configuration: &ConnectionConfiguration) -> anyhow::Result<()> {
    let ports = list_ports(&configuration.filters)?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => {
                println!("{}\t{}\t{:04x}:{:04x}", port.port_name, port.description, vid, pid)
            }
            _ => println!("{}\t{}", port.port_name, port.description),
        }
    }
    Ok(())
}

fn connect(configuration: ConnectionConfiguration) -> anyhow::Result<SerialConnection> {
    let mut connection = setup_serial_connection(configuration)?;
    connection.start_connection()?;
    Ok(connection)
}

async fn monitor(configuration: ConnectionConfiguration) -> anyhow::Result<()> {
    let mut connection = connect(configuration)?;
    // Unregistered events are printed here, no need to warn about them
    connection.listeners().set_warn_about_unregistered_events(false);
    let messages = connection.subscribe();

    watch(&connection, messages, tokio::signal::ctrl_c(), print_message).await;

    connection.close()?;
    Ok(())
}

/// Hand every received message to `on_message` until `shutdown` completes
/// or the device goes away
async fn watch(
    connection: &SerialConnection,
    mut messages: broadcast::Receiver<SerialMessage>,
    shutdown: impl Future,
    mut on_message: impl FnMut(&SerialMessage),
) {
    let mut check = tokio::time::interval(DISCONNECT_CHECK_INTERVAL);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = check.tick() => {
                if !connection.ready() {
                    tracing::info!("Device disconnected");
                    break;
                }
            }
            message = messages.recv() => match message {
                Ok(message) => on_message(&message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Skipped {} messages", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

fn print_message(message: &SerialMessage) {
    let time = chrono::Local::now().format("%H:%M:%S%.3f");
    match message {
        SerialMessage::Event { name, data } => println!("{} {} {}", time, name, data),
        SerialMessage::Data(data) => println!("{} data {}", time, data),
        // Device log lines are already reported through tracing
        _ => {}
    }
}

fn send(configuration: ConnectionConfiguration, event: &str, data: Option<&str>) -> anyhow::Result<()> {
    let mut connection = connect(configuration)?;
    let data = data.map(|text| {
        serde_json::from_str::<JsonValue>(text)
            .unwrap_or_else(|_| JsonValue::String(text.to_string()))
    });
    connection.send(event, data)?;
    connection.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use simplewebserial::SerialPort;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Port that never has data and ends when told to
    struct QuietPort {
        ended: Arc<AtomicBool>,
    }

    impl SerialPort for QuietPort {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            Ok(data.len())
        }

        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            if self.ended.load(Ordering::SeqCst) {
                return Ok(0);
            }
            std::thread::sleep(Duration::from_millis(1));
            Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
        }

        fn name(&self) -> String {
            "quiet".to_string()
        }

        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn quiet_connection() -> (SerialConnection, Arc<AtomicBool>) {
        let ended = Arc::new(AtomicBool::new(false));
        let mut connection = setup_serial_connection(ConnectionConfiguration::default()).unwrap();
        connection
            .start_with_port(Box::new(QuietPort {
                ended: ended.clone(),
            }))
            .unwrap();
        (connection, ended)
    }

    #[tokio::test]
    async fn test_watch_shutdown_survives_other_wakeups() {
        let (connection, _ended) = quiet_connection();
        let messages = connection.subscribe();
        // Outlives several disconnect checks
        let shutdown = tokio::time::sleep(DISCONNECT_CHECK_INTERVAL * 3 / 2);

        let watched = tokio::time::timeout(
            Duration::from_secs(2),
            watch(&connection, messages, shutdown, |_| {}),
        )
        .await;

        assert!(watched.is_ok());
        assert!(connection.ready());
    }

    #[tokio::test]
    async fn test_watch_stops_when_device_goes_away() {
        let (connection, ended) = quiet_connection();
        let messages = connection.subscribe();
        ended.store(true, Ordering::SeqCst);

        let watched = tokio::time::timeout(
            Duration::from_secs(2),
            watch(&connection, messages, std::future::pending::<()>(), |_| {}),
        )
        .await;

        assert!(watched.is_ok());
        assert!(!connection.ready());
    }
}
