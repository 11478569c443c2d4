//! What a connection reports through `tracing`
//!
//! The read loop logs from its own thread, so the capturing subscriber is
//! installed globally for this test binary. Every test uses its own event
//! names to find its lines.

mod common;

use common::{wait_for, MockPortHandle};
use parking_lot::Mutex;
use serde_json::json;
use simplewebserial_communication::{
    setup_serial_connection, ConnectionConfiguration, SerialConnection,
};
use std::io;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn logs() -> &'static CapturedLogs {
    static LOGS: OnceLock<CapturedLogs> = OnceLock::new();
    LOGS.get_or_init(|| {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("another global subscriber is installed");
        logs
    })
}

/// First captured line containing `needle`, waiting for it to show up
fn log_line(needle: &str) -> Option<String> {
    let find = || {
        String::from_utf8_lossy(&logs().0.lock())
            .lines()
            .find(|line| line.contains(needle))
            .map(str::to_string)
    };
    wait_for(|| find().is_some());
    find()
}

fn connected(configuration: ConnectionConfiguration) -> (SerialConnection, MockPortHandle) {
    logs();
    let mock = MockPortHandle::default();
    let mut connection = setup_serial_connection(configuration).unwrap();
    connection.start_with_port(mock.port()).unwrap();
    (connection, mock)
}

#[test]
fn test_device_messages_logged_at_their_level() {
    let (_connection, mock) = connected(ConnectionConfiguration::default());

    mock.push("[\"_w\", \"battery at 7%\"]\r\n");
    mock.push("[\"_l\", \"booted in 7ms\"]\r\n");
    mock.push("[\"_e\", \"sensor 7 missing\"]\r\n");

    let warning = log_line("[ARDUINO] battery at 7%").expect("warning not logged");
    assert!(warning.contains("WARN"), "{}", warning);
    let log = log_line("[ARDUINO] booted in 7ms").expect("log not logged");
    assert!(log.contains("INFO"), "{}", log);
    let error = log_line("[ARDUINO] sensor 7 missing").expect("error not logged");
    assert!(error.contains("ERROR"), "{}", error);
}

#[test]
fn test_unregistered_event_warning() {
    let (_connection, mock) = connected(ConnectionConfiguration::default());

    mock.push("[\"unheard-dial\", 3]\r\n");

    let line = log_line("Event unheard-dial").expect("warning not logged");
    assert!(line.contains("WARN"), "{}", line);
    assert!(line.ends_with(
        "Event unheard-dial has been received, but it has never been registered as listener."
    ));
}

#[test]
fn test_unregistered_event_warning_disabled() {
    let (connection, mock) = connected(ConnectionConfiguration {
        warn_about_unregistered_events: false,
        ..Default::default()
    });
    let seen = Arc::new(Mutex::new(false));
    let s = seen.clone();
    connection.on("silent-done", move |_| *s.lock() = true);

    mock.push("[\"silent-dial\", 3]\r\n[\"silent-done\"]\r\n");

    assert!(wait_for(|| *seen.lock()));
    let output = String::from_utf8_lossy(&logs().0.lock()).into_owned();
    assert!(!output.contains("silent-dial"));
}

#[test]
fn test_serial_data_logging() {
    let (connection, mock) = connected(ConnectionConfiguration {
        log_incoming_serial_data: true,
        log_outgoing_serial_data: true,
        ..Default::default()
    });
    connection.on("logged-knob", |_| {});

    connection.send("logged-led", Some(json!("1"))).unwrap();
    mock.push("[\"logged-knob\", 4]\r\n");

    let outgoing = log_line("logged-led").expect("outgoing data not logged");
    assert!(outgoing.contains("INFO"), "{}", outgoing);
    assert!(outgoing.ends_with(">> [\"logged-led\",1]"), "{}", outgoing);

    let incoming = log_line("logged-knob").expect("incoming data not logged");
    assert!(incoming.contains("INFO"), "{}", incoming);
    assert!(incoming.contains("<< "), "{}", incoming);
}

#[test]
fn test_serial_data_not_logged_by_default() {
    let (connection, mock) = connected(ConnectionConfiguration::default());
    let seen = Arc::new(Mutex::new(false));
    let s = seen.clone();
    connection.on("quiet-knob", move |_| *s.lock() = true);

    connection.send("quiet-led", Some(json!(1))).unwrap();
    mock.push("[\"quiet-knob\", 4]\r\n");

    assert!(wait_for(|| *seen.lock()));
    let output = String::from_utf8_lossy(&logs().0.lock()).into_owned();
    assert!(!output.contains("quiet-led"));
    assert!(!output.contains("quiet-knob"));
}

#[test]
fn test_read_failure_reports_baud_rate() {
    let (connection, mock) = connected(ConnectionConfiguration::from(9600));

    mock.fail();

    assert!(wait_for(|| !connection.ready()));
    let line = log_line("Library currently uses baud rate 9600").expect("hint not logged");
    assert!(line.contains("ERROR"), "{}", line);
    assert!(line.contains("Serial.begin()"), "{}", line);
}
