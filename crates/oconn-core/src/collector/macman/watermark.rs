// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Watermark state: read, parse, advance.
//!
//! Watermarks live in OPC UA only; the bridge keeps no local state. A
//! missing or unreadable watermark collapses to 1970-01-01 local time, which
//! makes the first run collect everything the controller still holds.
//!
//! Write-back uses a typed-fallback cascade because fleet servers disagree
//! on the node's declared type: a formatted local-time string first, then a
//! native timestamp, then Unix seconds as 64-bit, then as 32-bit. The first
//! accepted write wins.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::address::NodeId;
use crate::control::ControlPlane;
use crate::types::PlaneValue;

/// The local-time format written as the first cascade preference and
/// accepted back on read.
pub const WATERMARK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// The epoch watermark: 1970-01-01 00:00:00 local.
pub fn epoch() -> DateTime<Local> {
    Local
        .from_local_datetime(
            &NaiveDate::from_ymd_opt(1970, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
        .single()
        .unwrap_or_else(|| Local.timestamp_opt(0, 0).unwrap())
}

/// Reads a screen's watermark, collapsing absence and garbage to the epoch.
///
/// Accepted encodings: native timestamps, integer Unix seconds (UTC,
/// converted to local), and parseable strings.
pub async fn read(plane: &dyn ControlPlane, node: &NodeId) -> DateTime<Local> {
    let Some(value) = plane.read(node).await else {
        debug!(%node, "Watermark absent, starting from epoch");
        return epoch();
    };

    let parsed = match &value {
        PlaneValue::DateTime(utc) => Some(utc.with_timezone(&Local)),
        PlaneValue::Int32(secs) => unix_to_local(*secs as i64),
        PlaneValue::Int64(secs) => unix_to_local(*secs),
        PlaneValue::String(s) => parse_datetime(s, None),
        _ => None,
    };

    match parsed {
        Some(ts) => ts,
        None => {
            warn!(%node, value = %value, "Unparseable watermark, starting from epoch");
            epoch()
        }
    }
}

/// Advances a watermark through the typed-fallback cascade. Returns `true`
/// when any branch was accepted.
pub async fn advance(plane: &dyn ControlPlane, node: &NodeId, ts: DateTime<Local>) -> bool {
    let candidates = [
        PlaneValue::String(ts.format(WATERMARK_FORMAT).to_string()),
        PlaneValue::DateTime(ts.with_timezone(&Utc)),
        PlaneValue::Int64(ts.timestamp()),
        PlaneValue::Int32(ts.timestamp() as i32),
    ];

    for candidate in candidates {
        let type_name = candidate.type_name();
        if plane.write(node, candidate).await {
            debug!(%node, %ts, type_name, "Watermark advanced");
            return true;
        }
    }

    warn!(%node, %ts, "All watermark write fallbacks rejected");
    false
}

fn unix_to_local(secs: i64) -> Option<DateTime<Local>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|t| t.with_timezone(&Local))
}

/// Parses a MacMan date (optionally with a separate time part).
///
/// Attempts, in order: compact `yyyyMMdd`+`HHmmss`, `yyyy/MM/dd HH:mm:ss`,
/// `yyyy-MM-dd HH:mm:ss`, then RFC 3339 (the general parse). Date-only
/// inputs land on midnight.
pub fn parse_datetime(date: &str, time: Option<&str>) -> Option<DateTime<Local>> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }

    let combined = match time {
        Some(t) => format!("{} {}", date, t.trim()),
        None => date.to_string(),
    };

    if let Some(t) = time {
        let compact = format!("{}{}", date, t.trim());
        if let Ok(naive) = NaiveDateTime::parse_from_str(&compact, "%Y%m%d%H%M%S") {
            return local_from_naive(naive);
        }
    }

    for format in ["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", WATERMARK_FORMAT] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&combined, format) {
            return local_from_naive(naive);
        }
    }

    // Date-only forms fall to midnight.
    for format in ["%Y%m%d", "%Y/%m/%d", "%Y-%m-%d"] {
        if let Ok(day) = NaiveDate::parse_from_str(date, format) {
            if time.is_none() {
                return local_from_naive(day.and_hms_opt(0, 0, 0)?);
            }
        }
    }

    DateTime::parse_from_rfc3339(&combined)
        .ok()
        .map(|t| t.with_timezone(&Local))
}

fn local_from_naive(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&naive).single()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn expect(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_compact() {
        assert_eq!(
            parse_datetime("20250901", Some("142549")),
            Some(expect(2025, 9, 1, 14, 25, 49))
        );
    }

    #[test]
    fn test_parse_slash_and_dash() {
        assert_eq!(
            parse_datetime("2025/09/01", Some("14:25:49")),
            Some(expect(2025, 9, 1, 14, 25, 49))
        );
        assert_eq!(
            parse_datetime("2025-09-01", Some("14:25:49")),
            Some(expect(2025, 9, 1, 14, 25, 49))
        );
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        assert_eq!(
            parse_datetime("20250901", None),
            Some(expect(2025, 9, 1, 0, 0, 0))
        );
        assert_eq!(
            parse_datetime("2025/09/01", None),
            Some(expect(2025, 9, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_parse_watermark_format_round_trip() {
        let ts = expect(2025, 9, 2, 14, 25, 49);
        let written = ts.format(WATERMARK_FORMAT).to_string();
        assert_eq!(parse_datetime(&written, None), Some(ts));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_datetime("not a date", None), None);
        assert_eq!(parse_datetime("", Some("142549")), None);
    }

    #[test]
    fn test_epoch() {
        let e = epoch();
        assert_eq!(e.date_naive(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
    }
}
