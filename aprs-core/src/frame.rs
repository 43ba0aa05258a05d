//! Parse TNC2 address-line text into structured AX.25 frames.
//!
//! Input looks like `SRC>DST,DIGI1,DIGI2*,WIDE2:payload`:
//! - Split on the first `:` into header and payload
//! - Split the header on the first `>` into source and address field
//! - Address field is `DST[,DIGI...]`; a trailing `*` marks a used hop

use serde::Serialize;

use crate::types::{AprsError, Result, StationId};

/// Separates the address header from the payload.
pub const PAYLOAD_SEPARATOR: char = ':';

/// Separates the source callsign from the address list.
pub const SOURCE_SEPARATOR: char = '>';

/// Marks a digipeater that has relayed the frame.
pub const USED_MARKER: char = '*';

// ---------------------------------------------------------------------------
// Digipeater path entries
// ---------------------------------------------------------------------------

/// One entry of the digipeater path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigiEntry {
    /// Callsign or alias, without the relay marker.
    pub id: StationId,
    /// Set when this hop carried the relay marker.
    pub used: bool,
}

impl DigiEntry {
    fn parse(token: &str) -> Self {
        match token.strip_suffix(USED_MARKER) {
            Some(id) => DigiEntry {
                id: id.to_string(),
                used: true,
            },
            None => DigiEntry {
                id: token.to_string(),
                used: false,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A decoded AX.25 frame in TNC2 text form. Immutable after decode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Original line as received.
    pub raw: String,
    pub header: String,
    pub payload: String,
    pub src: StationId,
    pub dst: StationId,
    pub digis: Vec<DigiEntry>,
}

impl Frame {
    /// Digipeater id at path position `n` (0-based).
    pub fn digi_at(&self, n: usize) -> Option<&str> {
        self.digis.get(n).map(|d| d.id.as_str())
    }

    /// True if any hop carries the relay marker.
    pub fn has_digi_path(&self) -> bool {
        self.digis.iter().any(|d| d.used)
    }

    /// 1-based path position of the last used hop, 0 if heard direct.
    ///
    /// Hops before the marked one are assumed to have relayed too.
    pub fn digi_count(&self) -> usize {
        self.digis
            .iter()
            .rposition(|d| d.used)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Id of the last used hop, `None` if no hop is marked.
    pub fn last_digi(&self) -> Option<&str> {
        self.digis
            .iter()
            .rev()
            .find(|d| d.used)
            .map(|d| d.id.as_str())
    }

    /// Digipeater path rendered back to text, markers included.
    pub fn path_string(&self) -> String {
        self.digis
            .iter()
            .map(|d| {
                if d.used {
                    format!("{}{USED_MARKER}", d.id)
                } else {
                    d.id.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

// ---------------------------------------------------------------------------
// Frame decoding
// ---------------------------------------------------------------------------

/// Decode one line of TNC2 text into a `Frame`.
///
/// Fails with `AprsError::Format` when the payload or source separator is
/// missing. Nothing else about the callsigns is validated.
pub fn decode_frame(text: &str) -> Result<Frame> {
    let (header, payload) = text.split_once(PAYLOAD_SEPARATOR).ok_or_else(|| {
        AprsError::Format(format!("missing '{PAYLOAD_SEPARATOR}' in {text:?}"))
    })?;

    let (src, addresses) = header.split_once(SOURCE_SEPARATOR).ok_or_else(|| {
        AprsError::Format(format!("missing '{SOURCE_SEPARATOR}' in {header:?}"))
    })?;

    let mut fields = addresses.split(',');
    // split() always yields at least one item
    let dst = fields.next().unwrap_or_default();
    let digis = fields.map(DigiEntry::parse).collect();

    Ok(Frame {
        raw: text.to_string(),
        header: header.to_string(),
        payload: payload.to_string(),
        src: src.to_string(),
        dst: dst.to_string(),
        digis,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
