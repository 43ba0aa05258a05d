//! aprs-core: Pure decode + station graph library for AX.25/APRS text frames.
//!
//! No async, no I/O beyond reading a config file. Just algorithms. This
//! crate is the shared core used by `aprs-server` (CLI, ingestion, web API).

pub mod config;
pub mod distance;
pub mod frame;
pub mod graph;
pub mod position;
pub mod station;
pub mod types;

// Re-export commonly used types at crate root
pub use distance::{haversine_distance, RadiusMode};
pub use frame::{decode_frame, DigiEntry, Frame};
pub use graph::{Edge, StationGraph};
pub use position::{classify, decode_packet, decode_position, AprsPacket};
pub use station::{HeardStation, IngestStats, StationContext};
pub use types::*;
