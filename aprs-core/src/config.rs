//! Configuration file for the station daemon.
//!
//! Plain `KEY value` tokens, whitespace separated, keys case-insensitive.
//! Blank lines and `#` comments are skipped. Example:
//!
//! ```text
//! # SBAprs.cfg
//! MYCALL N7MKO
//! LAT 47.60
//! LON 122.30
//! GPSD false
//! DATAFILE data/kissutil.log
//! ```

use std::path::Path;

use tracing::{info, warn};

use crate::distance::RadiusMode;
use crate::station::DEFAULT_CALL;
use crate::types::{AprsError, Position, Result, StationId};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "SBAprs.cfg";

/// Default kissutil FIFO.
pub const DEFAULT_FIFO: &str = "/tmp/sbaprs.fifo";

/// Default gpsd endpoint.
pub const DEFAULT_GPSD_ADDR: &str = "localhost:2947";

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub station: StationConfig,
    pub gpsd: GpsdConfig,
    pub input: InputConfig,
    pub api: ApiConfig,
    pub units: RadiusMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    pub call: StationId,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpsdConfig {
    pub enabled: bool,
    pub addr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputConfig {
    /// Capture file to read instead of following the FIFO.
    pub data_file: Option<String>,
    pub fifo: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            station: StationConfig {
                call: DEFAULT_CALL.into(),
                lat: 0.0,
                lon: 0.0,
            },
            gpsd: GpsdConfig {
                enabled: false,
                addr: DEFAULT_GPSD_ADDR.into(),
            },
            input: InputConfig {
                data_file: None,
                fifo: DEFAULT_FIFO.into(),
            },
            api: ApiConfig {
                host: "0.0.0.0".into(),
                port: 8000,
            },
            units: RadiusMode::Miles,
        }
    }
}

impl Config {
    /// Configured fixed position of the local station.
    pub fn position(&self) -> Position {
        Position::fixed(self.station.lat, self.station.lon)
    }
}

/// Load and parse a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    info!(path = %path.display(), "loading config");
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Parse config text. Missing or unparsable values are errors; unknown
/// keys are logged and skipped.
pub fn parse_config(text: &str) -> Result<Config> {
    let mut config = Config::default();

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        parse_config_line(&mut config, stripped)?;
    }

    Ok(config)
}

/// Apply every `KEY value` pair on one line.
pub fn parse_config_line(config: &mut Config, line: &str) -> Result<()> {
    let mut tokens = line.split_whitespace();

    while let Some(key) = tokens.next() {
        let key = key.to_ascii_uppercase();
        match key.as_str() {
            "MYCALL" => config.station.call = next_value(&mut tokens, &key)?.to_string(),
            "LAT" => config.station.lat = parse_value(&mut tokens, &key)?,
            "LON" => config.station.lon = parse_value(&mut tokens, &key)?,
            "GPSD" => config.gpsd.enabled = parse_value(&mut tokens, &key)?,
            "GPSD_ADDR" => config.gpsd.addr = next_value(&mut tokens, &key)?.to_string(),
            "DATAFILE" => config.input.data_file = Some(next_value(&mut tokens, &key)?.to_string()),
            "FIFO" => config.input.fifo = next_value(&mut tokens, &key)?.to_string(),
            "HOST" => config.api.host = next_value(&mut tokens, &key)?.to_string(),
            "PORT" => config.api.port = parse_value(&mut tokens, &key)?,
            "UNITS" => {
                let val = next_value(&mut tokens, &key)?;
                config.units = val.parse().map_err(AprsError::Config)?;
            }
            _ => warn!(key = %key, "unknown config parameter"),
        }
    }

    Ok(())
}

fn next_value<'a>(tokens: &mut impl Iterator<Item = &'a str>, key: &str) -> Result<&'a str> {
    tokens
        .next()
        .ok_or_else(|| AprsError::Config(format!("{key} requires a value")))
}

fn parse_value<'a, T: std::str::FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    key: &str,
) -> Result<T> {
    let val = next_value(tokens, key)?;
    val.to_ascii_lowercase()
        .parse()
        .map_err(|_| AprsError::Config(format!("invalid value for {key}: {val}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.station.call, "NOCALL");
        assert_eq!(config.api.port, 8000);
        assert_eq!(config.input.fifo, "/tmp/sbaprs.fifo");
        assert!(config.input.data_file.is_none());
        assert!(!config.gpsd.enabled);
        assert_eq!(config.units, RadiusMode::Miles);
    }

    #[test]
    fn test_parse_config() {
        let text = r#"
# station settings
MYCALL N7MKO
lat 47.60
LON 122.30
GPSD true
DATAFILE /var/log/kissutil.log

Port 9000
UNITS km
"#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.station.call, "N7MKO");
        assert_eq!(config.station.lat, 47.6);
        assert_eq!(config.station.lon, 122.3);
        assert!(config.gpsd.enabled);
        assert_eq!(config.input.data_file.as_deref(), Some("/var/log/kissutil.log"));
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.units, RadiusMode::Kilometers);
        assert_eq!(config.position(), Position::fixed(47.6, 122.3));
    }

    #[test]
    fn test_several_keys_on_one_line() {
        let config = parse_config("MYCALL K7XYZ LAT 45.5 LON 122.6").unwrap();
        assert_eq!(config.station.call, "K7XYZ");
        assert_eq!(config.station.lat, 45.5);
        assert_eq!(config.station.lon, 122.6);
    }

    #[test]
    fn test_callsign_case_preserved() {
        let config = parse_config("mycall n7mko-9").unwrap();
        assert_eq!(config.station.call, "n7mko-9");
    }

    #[test]
    fn test_missing_value() {
        let mut config = Config::default();
        let err = parse_config_line(&mut config, "MYCALL").unwrap_err();
        assert!(matches!(err, AprsError::Config(_)));
    }

    #[test]
    fn test_invalid_number() {
        let err = parse_config("LAT north").unwrap_err();
        assert!(matches!(err, AprsError::Config(_)));
        let err = parse_config("GPSD maybe").unwrap_err();
        assert!(matches!(err, AprsError::Config(_)));
    }

    #[test]
    fn test_unknown_key_ignored() {
        let config = parse_config("BEACON 42\nMYCALL N7MKO").unwrap();
        assert_eq!(config.station.call, "N7MKO");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/SBAprs.cfg")).unwrap_err();
        assert!(matches!(err, AprsError::Io(_)));
    }
}
