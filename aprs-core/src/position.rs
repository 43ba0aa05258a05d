//! Classify APRS payloads and extract position reports.
//!
//! Report type comes from the first payload character:
//! - `!` / `=`: fixed position (no timestamp)
//! - `@`:       mobile position, optionally with a 7-char timestamp
//! - anything else: unknown (compressed and mic-e decoding not done here)
//!
//! Latitude/longitude are read as the literal `ddmm.hh` / `dddmm.hh`
//! digits and divided by 100. That is not a degrees-minutes to decimal
//! degrees conversion; callers get the shifted value as-is.

use std::ops::Range;

use serde::Serialize;

use crate::frame::{decode_frame, Frame};
use crate::types::{AprsError, PositionReport, ReportType, Result};

/// Byte range of the latitude digits in an untimestamped report.
const LAT_FIELD: Range<usize> = 1..8;

/// Byte range of the longitude digits in an untimestamped report.
const LON_FIELD: Range<usize> = 10..18;

/// Symbol code follows the longitude hemisphere letter.
const SYMBOL_CODE_POS: usize = 19;

/// Length of a `DDHHMMz` style timestamp.
const TIMESTAMP_LEN: usize = 7;

/// Timestamp suffix characters: zulu DHM, local DHM, HMS.
const TIMESTAMP_SUFFIXES: &[u8] = b"z/h";

/// Altitude extension in the comment: `/A=aaaaaa` feet.
const ALTITUDE_TAG: &str = "/A=";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a frame's APRS report type from its first payload character.
pub fn classify(frame: &Frame) -> ReportType {
    match frame.payload.as_bytes().first() {
        Some(b'!') | Some(b'=') => ReportType::Fixed,
        Some(b'@') => ReportType::Mobile,
        _ => ReportType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Position extraction
// ---------------------------------------------------------------------------

/// Decode the position carried by a frame.
///
/// Only fixed and mobile reports are parsed. Other kinds come back with a
/// zero latitude, which `AprsPacket::has_position` treats as no position.
pub fn decode_position(frame: &Frame) -> Result<PositionReport> {
    let kind = classify(frame);
    let payload = frame.payload.as_str();

    let offset = match kind {
        ReportType::Fixed => 0,
        ReportType::Mobile if has_timestamp(payload) => TIMESTAMP_LEN,
        ReportType::Mobile => 0,
        _ => {
            return Ok(PositionReport {
                kind,
                lat: 0.0,
                lon: 0.0,
                alt: 0.0,
                symbol: None,
            })
        }
    };

    let lat = numeric_field(payload, shift(LAT_FIELD, offset), "latitude")?;
    let lon = numeric_field(payload, shift(LON_FIELD, offset), "longitude")?;

    Ok(PositionReport {
        kind,
        lat: lat / 100.0,
        lon: lon / 100.0,
        alt: comment_altitude(payload).unwrap_or(0.0),
        symbol: payload
            .get(SYMBOL_CODE_POS + offset..)
            .and_then(|rest| rest.chars().next()),
    })
}

fn has_timestamp(payload: &str) -> bool {
    payload
        .as_bytes()
        .get(TIMESTAMP_LEN)
        .is_some_and(|c| TIMESTAMP_SUFFIXES.contains(c))
}

fn shift(range: Range<usize>, offset: usize) -> Range<usize> {
    range.start + offset..range.end + offset
}

fn numeric_field(payload: &str, range: Range<usize>, field: &'static str) -> Result<f64> {
    let digits = payload.get(range).ok_or_else(|| AprsError::Numeric {
        field,
        value: payload.to_string(),
    })?;
    digits.trim().parse::<f64>().map_err(|_| AprsError::Numeric {
        field,
        value: digits.to_string(),
    })
}

/// Altitude in feet from a `/A=` comment extension, if present.
fn comment_altitude(payload: &str) -> Option<f64> {
    let start = payload.find(ALTITUDE_TAG)? + ALTITUDE_TAG.len();
    let digits = payload.get(start..start + 6)?;
    digits.parse::<i32>().ok().map(f64::from)
}

// ---------------------------------------------------------------------------
// AprsPacket
// ---------------------------------------------------------------------------

/// A frame plus its APRS interpretation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AprsPacket {
    pub frame: Frame,
    pub report_type: ReportType,
    /// Set once `decode_position` has run for a position-carrying kind.
    pub position: Option<PositionReport>,
}

impl AprsPacket {
    /// Wrap a frame without decoding any position.
    pub fn new(frame: Frame) -> Self {
        let report_type = classify(&frame);
        AprsPacket {
            frame,
            report_type,
            position: None,
        }
    }

    /// Decode and attach the position report for fixed/mobile/mic-e kinds.
    pub fn decode_position(&mut self) -> Result<()> {
        if self.report_type.carries_position() {
            self.position = Some(decode_position(&self.frame)?);
        }
        Ok(())
    }

    /// True iff a decoded latitude is strictly positive.
    ///
    /// Southern-hemisphere and equator reports read as "no position".
    pub fn has_position(&self) -> bool {
        self.position.as_ref().is_some_and(|p| p.lat > 0.0)
    }

    pub fn src(&self) -> &str {
        &self.frame.src
    }
}

/// Decode a TNC2 line into a frame and attach any position report.
pub fn decode_packet(text: &str) -> Result<AprsPacket> {
    let mut packet = AprsPacket::new(decode_frame(text)?);
    packet.decode_position()?;
    Ok(packet)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FIXED_PKT: &str =
        "BALDI>APOT21,WIDE2-1:!4713.13N/12150.61W_PHG7830/W2,WAn,Baldi N7FSP";

    #[test]
    fn test_classify_fixed() {
        let frame = decode_frame(FIXED_PKT).unwrap();
        assert_eq!(classify(&frame), ReportType::Fixed);

        let frame = decode_frame("N7MKO>APRS:=4713.13N/12150.61W-").unwrap();
        assert_eq!(classify(&frame), ReportType::Fixed);
    }

    #[test]
    fn test_classify_mobile_and_unknown() {
        let frame = decode_frame("N7MKO>APRS:@092345z4903.50N/07201.75W>").unwrap();
        assert_eq!(classify(&frame), ReportType::Mobile);

        let frame = decode_frame("W7OMR>TW5PPS,JUPITR*:`2?vm\"Ak/").unwrap();
        assert_eq!(classify(&frame), ReportType::Unknown);

        let frame = decode_frame("W7OMR>APRS:").unwrap();
        assert_eq!(classify(&frame), ReportType::Unknown);
    }

    #[test]
    fn test_has_position_after_decode() {
        let mut packet = AprsPacket::new(decode_frame(FIXED_PKT).unwrap());
        assert!(!packet.has_position());
        packet.decode_position().unwrap();
        assert!(packet.has_position());
        assert_eq!(packet.report_type, ReportType::Fixed);
    }

    #[test]
    fn test_fixed_position_values() {
        let packet = decode_packet(FIXED_PKT).unwrap();
        let pos = packet.position.unwrap();
        assert!((pos.lat - 47.1313).abs() < 1e-9, "lat={}", pos.lat);
        assert!((pos.lon - 121.5061).abs() < 1e-9, "lon={}", pos.lon);
        assert_eq!(pos.symbol, Some('_'));
        assert_eq!(pos.alt, 0.0);
    }

    #[test]
    fn test_mobile_with_timestamp() {
        let packet = decode_packet("N7MKO>APRS:@092345z4903.50N/07201.75W>").unwrap();
        let pos = packet.position.unwrap();
        assert_eq!(pos.kind, ReportType::Mobile);
        assert!((pos.lat - 49.035).abs() < 1e-9);
        assert!((pos.lon - 72.0175).abs() < 1e-9);
        assert_eq!(pos.symbol, Some('>'));
    }

    #[test]
    fn test_mobile_local_and_hms_timestamps() {
        for text in [
            "N7MKO>APRS:@092345/4903.50N/07201.75W>",
            "N7MKO>APRS:@234517h4903.50N/07201.75W>",
        ] {
            let pos = decode_packet(text).unwrap().position.unwrap();
            assert!((pos.lat - 49.035).abs() < 1e-9, "{text}: lat={}", pos.lat);
            assert!((pos.lon - 72.0175).abs() < 1e-9, "{text}: lon={}", pos.lon);
            assert_eq!(pos.symbol, Some('>'));
        }
    }

    #[test]
    fn test_mobile_without_timestamp() {
        let packet = decode_packet("N7MKO>APRS:@4903.50N/07201.75W>").unwrap();
        let pos = packet.position.unwrap();
        assert!((pos.lat - 49.035).abs() < 1e-9);
    }

    #[test]
    fn test_comment_altitude() {
        let packet =
            decode_packet("N7MKO>APRS:!4713.13N/12150.61W>088/036/A=001234 mobile").unwrap();
        assert_eq!(packet.position.unwrap().alt, 1234.0);
    }

    #[test]
    fn test_non_numeric_latitude() {
        let err = decode_packet("N7MKO>APRS:!47x3.13N/12150.61W_").unwrap_err();
        assert!(matches!(err, AprsError::Numeric { field: "latitude", .. }));
    }

    #[test]
    fn test_truncated_report() {
        let err = decode_packet("N7MKO>APRS:!4713.13N/121").unwrap_err();
        assert!(matches!(err, AprsError::Numeric { field: "longitude", .. }));
    }

    #[test]
    fn test_unknown_report_has_no_position() {
        let packet = decode_packet("W7OMR>TW5PPS,JUPITR*:`2?vm\"Ak/\"4u}13.2V").unwrap();
        assert!(packet.position.is_none());
        assert!(!packet.has_position());
    }

    #[test]
    fn test_equator_latitude_reads_as_no_position() {
        let packet = decode_packet("5H3XY>APRS:!0000.00N/03912.00E-").unwrap();
        assert!(packet.position.is_some());
        assert!(!packet.has_position());
    }

    #[test]
    fn test_packet_serializes() {
        let packet = decode_packet(FIXED_PKT).unwrap();
        let json = serde_json::to_value(&packet).unwrap();
        assert_eq!(json["report_type"], "fixed");
        assert_eq!(json["frame"]["src"], "BALDI");
    }
}
