//! gpsd client: one 3D fix for the local station position.
//!
//! Protocol per https://gpsd.gitlab.io/gpsd/client-howto.html: send a
//! `?WATCH` request, then read JSON reports until a `TPV` with `mode` 3.

use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

use aprs_core::Position;

/// Watch request enabling JSON reports.
pub const WATCH_REQUEST: &str = "?WATCH={\"enable\":true,\"json\":true}\n";

/// Give up waiting for a fix after this long.
pub const FIX_TIMEOUT: Duration = Duration::from_secs(30);

/// Subset of a gpsd TPV (time-position-velocity) report.
#[derive(Debug, Deserialize)]
struct Tpv {
    class: String,
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    #[serde(rename = "altHAE")]
    alt_hae: Option<f64>,
}

/// Parse one gpsd report line. `Some` only for a TPV with a 3D fix.
pub fn parse_tpv(line: &str) -> Option<Position> {
    let tpv: Tpv = serde_json::from_str(line).ok()?;
    if tpv.class != "TPV" || tpv.mode != 3 {
        return None;
    }
    Some(Position {
        lat: tpv.lat?,
        lon: tpv.lon?,
        alt: tpv.alt.or(tpv.alt_hae).unwrap_or(0.0),
        gps: true,
    })
}

/// Connect to gpsd and wait for a 3D fix.
pub async fn fetch_position(addr: &str) -> std::io::Result<Position> {
    tokio::time::timeout(FIX_TIMEOUT, watch_for_fix(addr))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no gpsd fix"))?
}

async fn watch_for_fix(addr: &str) -> std::io::Result<Position> {
    info!(addr, "connecting to gpsd");
    let stream = TcpStream::connect(addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(WATCH_REQUEST.as_bytes()).await?;

    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(pos) = parse_tpv(&line) {
            info!(lat = pos.lat, lon = pos.lon, alt = pos.alt, "gpsd fix");
            return Ok(pos);
        }
        debug!(report = %line, "gpsd report");
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "gpsd closed before a fix",
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
