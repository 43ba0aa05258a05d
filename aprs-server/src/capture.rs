//! Capture and file I/O for APRS traffic.
//!
//! Input modes:
//! - kissutil capture files: one TNC2 line per row behind a 4-char
//!   channel prefix such as `[0] `
//! - APRS-IS dumps: plain TNC2 lines, `#` comments allowed
//! - kissutil FIFO: followed forever, polling once a second when idle

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use aprs_core::{AprsPacket, StationContext};

/// Width of the kissutil channel prefix (`[0] `).
pub const KISSUTIL_PREFIX_LEN: usize = 4;

/// Idle wait between FIFO polls.
pub const FIFO_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Line format of a capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureFormat {
    #[default]
    Kissutil,
    AprsIs,
}

/// Totals from reading one capture source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    pub lines: u64,
    pub decoded: u64,
    pub errors: u64,
}

pub fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Extract the TNC2 text from one raw capture line.
///
/// Returns `None` for lines that carry no frame.
pub fn clean_line(line: &str, format: CaptureFormat) -> Option<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    match format {
        CaptureFormat::Kissutil => {
            let text = line.get(KISSUTIL_PREFIX_LEN..)?;
            (!text.is_empty()).then_some(text)
        }
        CaptureFormat::AprsIs => (!line.starts_with('#')).then_some(line),
    }
}

/// Decode and store one raw line. Failures are logged and skipped.
pub fn ingest_one(
    ctx: &StationContext,
    line: &str,
    format: CaptureFormat,
    summary: &mut CaptureSummary,
) -> Option<AprsPacket> {
    let text = clean_line(line, format)?;
    summary.lines += 1;
    debug!(packet = %text, "read");

    match ctx.ingest_line(text, now()) {
        Ok(packet) => {
            summary.decoded += 1;
            Some(packet)
        }
        Err(e) => {
            summary.errors += 1;
            warn!(error = %e, line = %text, "skipping line");
            None
        }
    }
}

/// Ingest every line from a reader.
pub fn ingest_reader<R: BufRead>(
    ctx: &StationContext,
    reader: R,
    format: CaptureFormat,
) -> io::Result<CaptureSummary> {
    let mut summary = CaptureSummary::default();
    for line in reader.lines() {
        match line {
            Ok(line) => {
                ingest_one(ctx, &line, format, &mut summary);
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                summary.lines += 1;
                summary.errors += 1;
                warn!(error = %e, "non-UTF-8 line skipped");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(summary)
}

/// Ingest a whole capture file.
pub fn read_capture(
    ctx: &StationContext,
    path: &Path,
    format: CaptureFormat,
) -> io::Result<CaptureSummary> {
    info!(path = %path.display(), ?format, "reading capture file");
    let file = File::open(path)?;
    let summary = ingest_reader(ctx, BufReader::new(file), format)?;
    info!(
        lines = summary.lines,
        decoded = summary.decoded,
        errors = summary.errors,
        "capture file done"
    );
    Ok(summary)
}

/// Follow a kissutil FIFO forever, sleeping while no data is ready.
///
/// Blocks the calling thread; run it on a dedicated one.
pub fn follow_fifo(ctx: &StationContext, path: &Path, format: CaptureFormat) -> io::Result<()> {
    info!(path = %path.display(), "following FIFO");
    let mut reader = BufReader::new(File::open(path)?);
    let mut summary = CaptureSummary::default();
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => std::thread::sleep(FIFO_POLL_INTERVAL),
            Ok(_) => {
                ingest_one(ctx, &line, format, &mut summary);
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(error = %e, "non-UTF-8 line skipped");
            }
            Err(e) => return Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
