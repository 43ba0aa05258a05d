//! Local station context: heard list, distances, and the station graph.
//!
//! One `StationContext` is shared (behind `Arc`) by every ingestion source
//! and by the status API. All methods take `&self`; the heard list and the
//! local position sit behind their own `RwLock`s and the graph locks
//! internally. Timestamps are Unix seconds supplied by the caller.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use crate::distance::{haversine_distance, RadiusMode};
use crate::graph::StationGraph;
use crate::position::{decode_packet, AprsPacket};
use crate::types::{Position, Result, StationId};

/// Callsign used until one is configured.
pub const DEFAULT_CALL: &str = "NOCALL";

// ---------------------------------------------------------------------------
// Heard list entries
// ---------------------------------------------------------------------------

/// One row of the heard ("mheard") list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeardStation {
    pub call: StationId,
    pub first_heard: f64,
    pub last_heard: f64,
    pub packets: u64,
    /// Distance from the local station to the last reported position.
    pub distance: Option<f64>,
}

/// Ingestion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub lines: u64,
    pub decoded: u64,
    pub errors: u64,
}

// ---------------------------------------------------------------------------
// StationContext
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StationContext {
    my_call: StationId,
    radius_mode: RadiusMode,
    position: RwLock<Position>,
    heard: RwLock<BTreeMap<StationId, HeardStation>>,
    graph: StationGraph,
    lines: AtomicU64,
    decoded: AtomicU64,
    errors: AtomicU64,
}

impl StationContext {
    pub fn new(my_call: impl Into<StationId>, position: Position, radius_mode: RadiusMode) -> Self {
        StationContext {
            my_call: my_call.into(),
            radius_mode,
            position: RwLock::new(position),
            heard: RwLock::new(BTreeMap::new()),
            graph: StationGraph::new(),
            lines: AtomicU64::new(0),
            decoded: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn my_call(&self) -> &str {
        &self.my_call
    }

    pub fn radius_mode(&self) -> RadiusMode {
        self.radius_mode
    }

    pub fn graph(&self) -> &StationGraph {
        &self.graph
    }

    pub fn position(&self) -> Position {
        *self.position.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the local position (e.g. after a gpsd fix).
    pub fn set_position(&self, position: Position) {
        info!(lat = position.lat, lon = position.lon, gps = position.gps, "local position set");
        *self.position.write().unwrap_or_else(PoisonError::into_inner) = position;
    }

    /// Record a decoded packet: heard list, distance, then graph edges.
    ///
    /// Returns the number of new graph edges. Unsupported paths are logged
    /// by the graph and still count as heard.
    pub fn store(&self, packet: &AprsPacket, timestamp: f64) -> usize {
        let src = packet.src();

        let distance = if packet.has_position() {
            packet.position.as_ref().map(|report| {
                let me = self.position();
                haversine_distance(me.lat, me.lon, report.lat, report.lon, self.radius_mode)
            })
        } else {
            None
        };

        {
            let mut heard = self.heard.write().unwrap_or_else(PoisonError::into_inner);
            let entry = heard.entry(src.to_string()).or_insert_with(|| HeardStation {
                call: src.to_string(),
                first_heard: timestamp,
                last_heard: timestamp,
                packets: 0,
                distance: None,
            });
            entry.last_heard = timestamp;
            entry.packets += 1;
            if distance.is_some() {
                entry.distance = distance;
            }
        }

        if let Some(d) = distance {
            info!(
                station = %src,
                distance = %format!("{d:.2}"),
                unit = self.radius_mode.unit(),
                "position report"
            );
        }

        self.graph.observe(&self.my_call, &packet.frame)
    }

    /// Decode one TNC2 line and store it.
    ///
    /// Decode errors are counted and returned; nothing is stored for them.
    pub fn ingest_line(&self, line: &str, timestamp: f64) -> Result<AprsPacket> {
        self.lines.fetch_add(1, Ordering::Relaxed);
        let packet = match decode_packet(line) {
            Ok(p) => p,
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        self.decoded.fetch_add(1, Ordering::Relaxed);
        debug!(src = %packet.src(), kind = %packet.report_type, "packet decoded");
        self.store(&packet, timestamp);
        Ok(packet)
    }

    /// Heard list sorted by callsign.
    pub fn heard(&self) -> Vec<HeardStation> {
        self.heard
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn heard_count(&self) -> usize {
        self.heard.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }

    /// Largest recorded distance, `None` until a position has been heard.
    pub fn max_distance(&self) -> Option<f64> {
        self.heard
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter_map(|h| h.distance)
            .filter(|d| !d.is_nan())
            .reduce(f64::max)
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            lines: self.lines.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for StationContext {
    fn default() -> Self {
        StationContext::new(DEFAULT_CALL, Position::default(), RadiusMode::Miles)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
