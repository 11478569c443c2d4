//! Connection configuration for SimpleWebSerial
//!
//! Provides the settings of a serial connection, their defaults, file
//! handling and validation. Supports JSON and TOML files; missing fields in
//! a file fall back to their defaults so partial configurations are valid.

use crate::error::{ConfigError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default baud rate used by the device library
pub const DEFAULT_BAUDRATE: u32 = 57600;

/// Terminator appended to every outgoing message
pub const DEFAULT_NEW_LINE_CHARACTER: &str = "\n";

/// Delimiter that separates incoming messages (the device's `println`)
pub const DEFAULT_LINE_DELIMITER: &str = "\r\n";

const CONFIG_DIR_NAME: &str = "simplewebserial";
const CONFIG_FILE_NAME: &str = "config.toml";

/// USB filter restricting which ports are offered for connection
///
/// A port matches when every set field equals the port's USB descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialPortFilter {
    /// USB vendor ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usb_vendor_id: Option<u16>,
    /// USB product ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usb_product_id: Option<u16>,
}

impl SerialPortFilter {
    /// Filter on vendor ID only
    pub fn vendor(vid: u16) -> Self {
        Self {
            usb_vendor_id: Some(vid),
            usb_product_id: None,
        }
    }

    /// Filter on vendor and product ID
    pub fn vendor_product(vid: u16, pid: u16) -> Self {
        Self {
            usb_vendor_id: Some(vid),
            usb_product_id: Some(pid),
        }
    }

    /// Check a port's USB IDs against this filter
    pub fn matches(&self, vid: Option<u16>, pid: Option<u16>) -> bool {
        let vendor_ok = self.usb_vendor_id.is_none() || self.usb_vendor_id == vid;
        let product_ok = self.usb_product_id.is_none() || self.usb_product_id == pid;
        vendor_ok && product_ok
    }
}

/// Settings of a serial connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfiguration {
    /// Port to open; when unset the first port matching `filters` is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Baud rate, must match `Serial.begin()` on the device
    pub baud_rate: u32,
    /// Log every incoming message
    pub log_incoming_serial_data: bool,
    /// Log every outgoing message
    pub log_outgoing_serial_data: bool,
    /// Convert numeric strings in outgoing data into numbers
    pub parse_strings_as_numbers: bool,
    /// Warn when an event arrives that nobody listens to
    pub warn_about_unregistered_events: bool,
    /// Terminator appended to outgoing messages
    pub new_line_character: String,
    /// Delimiter splitting incoming messages
    pub line_delimiter: String,
    /// USB filters used when choosing a port automatically
    pub filters: Vec<SerialPortFilter>,
}

impl Default for ConnectionConfiguration {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUDRATE,
            log_incoming_serial_data: false,
            log_outgoing_serial_data: false,
            parse_strings_as_numbers: true,
            warn_about_unregistered_events: true,
            new_line_character: DEFAULT_NEW_LINE_CHARACTER.to_string(),
            line_delimiter: DEFAULT_LINE_DELIMITER.to_string(),
            filters: Vec::new(),
        }
    }
}

impl From<u32> for ConnectionConfiguration {
    fn from(baud_rate: u32) -> Self {
        Self::default().with_baud_rate(baud_rate)
    }
}

impl ConnectionConfiguration {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the port to open
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Add a USB filter
    pub fn with_filter(mut self, filter: SerialPortFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Default location of the configuration file
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory(
                    "no configuration directory on this platform".to_string(),
                )
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded connection configuration from {}", path.display());
        Ok(config)
    }

    /// Load config from file, or the defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("{}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.baud_rate == 0 {
            return Err(invalid("baud_rate", "must be > 0"));
        }

        if self.new_line_character.is_empty() {
            return Err(invalid("new_line_character", "must not be empty"));
        }

        if self.line_delimiter.is_empty() {
            return Err(invalid("line_delimiter", "must not be empty"));
        }

        if self.port.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(invalid("port", "must not be blank"));
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidSetting {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfiguration::default();
        assert_eq!(config.baud_rate, 57600);
        assert_eq!(config.port, None);
        assert!(!config.log_incoming_serial_data);
        assert!(!config.log_outgoing_serial_data);
        assert!(config.parse_strings_as_numbers);
        assert!(config.warn_about_unregistered_events);
        assert_eq!(config.new_line_character, "\n");
        assert_eq!(config.line_delimiter, "\r\n");
        assert!(config.filters.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_baud_rate() {
        let config = ConnectionConfiguration::from(115200);
        assert_eq!(
            config,
            ConnectionConfiguration {
                baud_rate: 115200,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ConnectionConfiguration =
            serde_json::from_str(r#"{"baud_rate": 38400, "log_incoming_serial_data": true}"#)
                .unwrap();
        assert_eq!(
            config,
            ConnectionConfiguration {
                baud_rate: 38400,
                log_incoming_serial_data: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_validate() {
        let config = ConnectionConfiguration::from(0);
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { ref key, .. }) if key == "baud_rate"
        ));

        let config = ConnectionConfiguration {
            new_line_character: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectionConfiguration::new().with_port("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_filter_matching() {
        let any = SerialPortFilter::default();
        assert!(any.matches(None, None));

        let arduino = SerialPortFilter::vendor(0x2341);
        assert!(arduino.matches(Some(0x2341), Some(0x0043)));
        assert!(!arduino.matches(Some(0x1a86), Some(0x7523)));
        assert!(!arduino.matches(None, None));

        let uno = SerialPortFilter::vendor_product(0x2341, 0x0043);
        assert!(uno.matches(Some(0x2341), Some(0x0043)));
        assert!(!uno.matches(Some(0x2341), Some(0x0001)));
    }

    #[test]
    fn test_unsupported_format() {
        let err = ConnectionConfiguration::default()
            .save_to_file(Path::new("config.yaml"))
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Config(ConfigError::UnsupportedFormat(_))
        ));
    }
}
