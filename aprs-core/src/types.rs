//! Shared types, error enum, and position report types for aprs-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by aprs-core.
#[derive(Debug, Error)]
pub enum AprsError {
    #[error("malformed frame: {0}")]
    Format(String),
    #[error("non-numeric {field}: {value:?}")]
    Numeric { field: &'static str, value: String },
    #[error("unsupported topology: {count} digipeaters used")]
    UnsupportedTopology { count: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AprsError>;

// ---------------------------------------------------------------------------
// Station identifiers
// ---------------------------------------------------------------------------

/// Callsign token identifying a station. Case-sensitive; no format checks.
pub type StationId = String;

// ---------------------------------------------------------------------------
// APRS report types
// ---------------------------------------------------------------------------

/// APRS report kind, selected by the first payload character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Weather,
    Fixed,
    Mobile,
    MicE,
    Telemetry,
    Message,
    DirectionFinding,
    Unknown,
}

impl ReportType {
    /// True for the kinds that carry a decodable position.
    pub fn carries_position(&self) -> bool {
        matches!(self, ReportType::Fixed | ReportType::Mobile | ReportType::MicE)
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReportType::Weather => "weather",
            ReportType::Fixed => "fixed",
            ReportType::Mobile => "mobile",
            ReportType::MicE => "mic-e",
            ReportType::Telemetry => "telemetry",
            ReportType::Message => "message",
            ReportType::DirectionFinding => "direction-finding",
            ReportType::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// Decoded position carried by an APRS report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub kind: ReportType,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    /// Symbol table/code character, when present in the report.
    pub symbol: Option<char>,
}

/// A position of the local station (fixed from config, or from gpsd).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub gps: bool,
}

impl Position {
    pub fn fixed(lat: f64, lon: f64) -> Self {
        Position {
            lat,
            lon,
            alt: 0.0,
            gps: false,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.lat, self.lon, self.alt)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
