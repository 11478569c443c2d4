//! Line-delimited JSON message protocol
//!
//! Every message is a single JSON document on its own line. Events are sent
//! as a two element array `[name, data]`. Names starting with an underscore
//! are reserved markers:
//!
//! | marker | device → host         | host → device     |
//! |--------|-----------------------|-------------------|
//! | `_w`   | warning text          |                   |
//! | `_l`   | log text              |                   |
//! | `_e`   | error text            | bare event name   |
//! | `_d`   | data without a name   | data without name |
//!
//! A bare JSON string received from the device is an event without data.

use crate::error::ProtocolError;
use crate::value::JsonValue;
use serde_json::Value;

/// Marker for warnings reported by the device
pub const WARNING_MARKER: &str = "_w";
/// Marker for log lines reported by the device
pub const LOG_MARKER: &str = "_l";
/// Marker for errors reported by the device
pub const ERROR_MARKER: &str = "_e";
/// Marker for bare events sent to the device (shares the error marker)
pub const EVENT_MARKER: &str = ERROR_MARKER;
/// Marker for unnamed data
pub const DATA_MARKER: &str = "_d";
/// Event name under which unnamed data is emitted
pub const DATA_EVENT: &str = "data";

/// A decoded protocol message
#[derive(Debug, Clone, PartialEq)]
pub enum SerialMessage {
    /// Device warning (`["_w", text]`)
    Warning(String),
    /// Device log line (`["_l", text]`)
    Log(String),
    /// Device error (`["_e", text]`)
    Error(String),
    /// Unnamed data (`["_d", data]`)
    Data(JsonValue),
    /// Named event (`[name, data]` or `"name"`)
    Event {
        /// Event name
        name: String,
        /// Event payload, `null` when absent
        data: JsonValue,
    },
}

impl SerialMessage {
    /// Create a named event message
    pub fn event(name: impl Into<String>, data: JsonValue) -> Self {
        Self::Event {
            name: name.into(),
            data,
        }
    }

    /// Decode one line received from the device.
    ///
    /// Returns `Ok(None)` for JSON documents that carry nothing (`null`,
    /// `false`, `0`, `""`).
    pub fn decode(line: &str) -> Result<Option<Self>, ProtocolError> {
        let json: Value = serde_json::from_str(line).map_err(|e| ProtocolError::Malformed {
            reason: e.to_string(),
        })?;

        if is_falsy(&json) {
            return Ok(None);
        }

        match json {
            Value::Array(mut items) if !items.is_empty() => {
                let data = if items.len() > 1 {
                    items.swap_remove(1)
                } else {
                    Value::Null
                };
                let message = match &items[0] {
                    Value::String(marker) if marker == WARNING_MARKER => {
                        Self::Warning(display_text(&data))
                    }
                    Value::String(marker) if marker == LOG_MARKER => Self::Log(display_text(&data)),
                    Value::String(marker) if marker == ERROR_MARKER => {
                        Self::Error(display_text(&data))
                    }
                    Value::String(marker) if marker == DATA_MARKER => Self::Data(data),
                    name => Self::Event {
                        name: display_text(name),
                        data,
                    },
                };
                Ok(Some(message))
            }
            Value::String(name) => Ok(Some(Self::Event {
                name,
                data: Value::Null,
            })),
            _ => Err(ProtocolError::UnsupportedShape {
                line: line.to_string(),
            }),
        }
    }

    /// Encode this message as a JSON line, without the line terminator
    pub fn encode(&self) -> String {
        let (name, data) = match self {
            Self::Warning(text) => (WARNING_MARKER, Value::String(text.clone())),
            Self::Log(text) => (LOG_MARKER, Value::String(text.clone())),
            Self::Error(text) => (ERROR_MARKER, Value::String(text.clone())),
            Self::Data(data) => (DATA_MARKER, data.clone()),
            Self::Event { name, data } => (name.as_str(), data.clone()),
        };
        Value::Array(vec![Value::String(name.to_string()), data]).to_string()
    }

    /// Name under which this message is emitted to listeners, if any
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::Data(_) => Some(DATA_EVENT),
            Self::Event { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// `null`, `false`, `0` and `""` carry no message
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Text form of a value: strings verbatim, everything else as JSON
fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
