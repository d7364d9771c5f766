// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-screen collection tables.
//!
//! Each MacMan screen is described by a static [`ScreenSpec`]: the probe
//! that yields the available-record count, the date/time field addresses,
//! the additional record fields, and the watermark comparator. All record
//! reads go through `(subsystem = 1, major, record index, 0, style = 9)`.
//!
//! The machining report runs in PERIOD mode; its numbered field majors are
//! derived from the base majors with the period offset. The arithmetic is
//! the controller's contract and is kept exactly as-is.

use crate::osp::OspAddress;
use crate::types::ScreenKind;

/// PERIOD-mode offset applied to the machining report's numbered fields.
pub const PERIOD_OFFSET: i32 = 2;

const MACHINING_MAIN_PROGRAM_MAJOR: i32 = 5001 + PERIOD_OFFSET * 2;
const MACHINING_WORK_COUNT_MAJOR: i32 = 3042 + PERIOD_OFFSET * 12;
const MACHINING_OPERATING_TIME_MAJOR: i32 = 3043 + PERIOD_OFFSET * 12;
const MACHINING_CUTTING_TIME_MAJOR: i32 = 3044 + PERIOD_OFFSET * 12;

/// How a record's timestamp is compared against the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkRule {
    /// Collect while `record >= watermark`. Re-emits a boundary record when
    /// the watermark lands exactly on an existing record.
    IncludeEqual,
    /// Collect while `record > watermark`.
    Strict,
    /// Collect unconditionally (single-record summary screens).
    ForceAll,
}

impl WatermarkRule {
    /// Returns `true` if a record with `record_ts` is still in range.
    pub fn accepts(
        &self,
        record_ts: chrono::DateTime<chrono::Local>,
        watermark: chrono::DateTime<chrono::Local>,
    ) -> bool {
        match self {
            WatermarkRule::IncludeEqual => record_ts >= watermark,
            WatermarkRule::Strict => record_ts > watermark,
            WatermarkRule::ForceAll => true,
        }
    }
}

/// Date/time field addressing for one screen.
#[derive(Debug, Clone, Copy)]
pub struct DateSpec {
    /// Field name of the date part.
    pub date_name: &'static str,
    /// Major index of the date part.
    pub date_major: i32,
    /// Time part, absent for date-only screens.
    pub time: Option<(&'static str, i32)>,
}

/// A non-date record field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name as published.
    pub name: &'static str,
    /// Major index.
    pub major: i32,
}

/// The full collection description of one screen.
#[derive(Debug, Clone, Copy)]
pub struct ScreenSpec {
    /// The screen.
    pub kind: ScreenKind,
    /// Available-record count probe; `None` means the screen always has
    /// exactly one record.
    pub count_probe: Option<OspAddress>,
    /// Date/time addressing.
    pub date: DateSpec,
    /// Additional record fields.
    pub fields: &'static [FieldSpec],
    /// Watermark comparator.
    pub rule: WatermarkRule,
}

impl ScreenSpec {
    /// Builds the record-field address at a record index.
    pub const fn field_address(major: i32, index: i32) -> OspAddress {
        OspAddress::new(1, major, index, 0, 9)
    }

    /// Returns the collection table for a screen.
    pub fn of(kind: ScreenKind) -> &'static ScreenSpec {
        match kind {
            ScreenKind::AlarmHistory => &ALARM_HISTORY,
            ScreenKind::MachiningReport => &MACHINING_REPORT,
            ScreenKind::NcStatusAtAlarm => &NC_STATUS_AT_ALARM,
            ScreenKind::OperatingReport => &OPERATING_REPORT,
            ScreenKind::OperationHistory => &OPERATION_HISTORY,
        }
    }
}

/// Machining report: period-mode counters keyed by start day/time.
/// Boundary records re-emit (`>=`).
pub static MACHINING_REPORT: ScreenSpec = ScreenSpec {
    kind: ScreenKind::MachiningReport,
    count_probe: Some(OspAddress::new(1, 2094, 0, 0, 9)),
    date: DateSpec {
        date_name: "StartDay",
        date_major: 5061,
        time: Some(("StartTime", 5062)),
    },
    fields: &[
        FieldSpec {
            name: "MainProgramName",
            major: MACHINING_MAIN_PROGRAM_MAJOR,
        },
        FieldSpec {
            name: "WorkCount",
            major: MACHINING_WORK_COUNT_MAJOR,
        },
        FieldSpec {
            name: "OperatingTime",
            major: MACHINING_OPERATING_TIME_MAJOR,
        },
        FieldSpec {
            name: "CuttingTime",
            major: MACHINING_CUTTING_TIME_MAJOR,
        },
    ],
    rule: WatermarkRule::IncludeEqual,
};

/// Alarm occurrence ledger.
pub static ALARM_HISTORY: ScreenSpec = ScreenSpec {
    kind: ScreenKind::AlarmHistory,
    count_probe: Some(OspAddress::new(1, 2094, 0, 0, 9)),
    date: DateSpec {
        date_name: "Date",
        date_major: 5063,
        time: Some(("Time", 5064)),
    },
    fields: &[
        FieldSpec {
            name: "AlarmNumber",
            major: 5070,
        },
        FieldSpec {
            name: "AlarmMessage",
            major: 5071,
        },
    ],
    rule: WatermarkRule::Strict,
};

/// Operator action ledger.
pub static OPERATION_HISTORY: ScreenSpec = ScreenSpec {
    kind: ScreenKind::OperationHistory,
    count_probe: Some(OspAddress::new(1, 2095, 0, 0, 9)),
    date: DateSpec {
        date_name: "Date",
        date_major: 5065,
        time: Some(("Time", 5066)),
    },
    fields: &[FieldSpec {
        name: "Operation",
        major: 5067,
    }],
    rule: WatermarkRule::Strict,
};

/// NC state snapshots captured at alarm time.
pub static NC_STATUS_AT_ALARM: ScreenSpec = ScreenSpec {
    kind: ScreenKind::NcStatusAtAlarm,
    count_probe: Some(OspAddress::new(1, 2096, 0, 0, 9)),
    date: DateSpec {
        date_name: "Date",
        date_major: 5068,
        time: Some(("Time", 5069)),
    },
    fields: &[
        FieldSpec {
            name: "AlarmNumber",
            major: 5072,
        },
        FieldSpec {
            name: "MainProgramName",
            major: 5073,
        },
        FieldSpec {
            name: "SequenceNumber",
            major: 5074,
        },
    ],
    rule: WatermarkRule::Strict,
};

/// Operating report: one summary record, date only, always collected.
pub static OPERATING_REPORT: ScreenSpec = ScreenSpec {
    kind: ScreenKind::OperatingReport,
    count_probe: None,
    date: DateSpec {
        date_name: "Date",
        date_major: 5056,
        time: None,
    },
    fields: &[
        FieldSpec {
            name: "PowerOnTime",
            major: 5050,
        },
        FieldSpec {
            name: "OperatingTime",
            major: 5051,
        },
        FieldSpec {
            name: "CuttingTime",
            major: 5052,
        },
        FieldSpec {
            name: "WorkCount",
            major: 5053,
        },
        FieldSpec {
            name: "MainProgramName",
            major: 5054,
        },
    ],
    rule: WatermarkRule::ForceAll,
};

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    #[test]
    fn test_period_offset_arithmetic() {
        // PERIOD mode with offset 2 lands on the 5005/3066 family.
        assert_eq!(MACHINING_REPORT.fields[0].major, 5005);
        assert_eq!(MACHINING_REPORT.fields[1].major, 3066);
        assert_eq!(MACHINING_REPORT.fields[2].major, 3067);
        assert_eq!(MACHINING_REPORT.fields[3].major, 3068);
    }

    #[test]
    fn test_probe_addresses() {
        assert_eq!(
            MACHINING_REPORT.count_probe.unwrap(),
            OspAddress::new(1, 2094, 0, 0, 9)
        );
        assert_eq!(
            OPERATION_HISTORY.count_probe.unwrap(),
            OspAddress::new(1, 2095, 0, 0, 9)
        );
        assert_eq!(
            NC_STATUS_AT_ALARM.count_probe.unwrap(),
            OspAddress::new(1, 2096, 0, 0, 9)
        );
        assert!(OPERATING_REPORT.count_probe.is_none());
    }

    #[test]
    fn test_date_majors() {
        assert_eq!(MACHINING_REPORT.date.date_major, 5061);
        assert_eq!(ALARM_HISTORY.date.date_major, 5063);
        assert_eq!(OPERATION_HISTORY.date.date_major, 5065);
        assert_eq!(NC_STATUS_AT_ALARM.date.date_major, 5068);
        assert_eq!(OPERATING_REPORT.date.date_major, 5056);
        assert!(OPERATING_REPORT.date.time.is_none());
    }

    #[test]
    fn test_field_address_iterates_subscript() {
        let a = ScreenSpec::field_address(5063, 4);
        assert_eq!(a, OspAddress::new(1, 5063, 4, 0, 9));
    }

    #[test]
    fn test_watermark_rules() {
        let wm = Local.with_ymd_and_hms(2025, 9, 2, 14, 25, 49).unwrap();
        let same = wm;
        let older = wm - chrono::Duration::seconds(1);
        let newer = wm + chrono::Duration::seconds(1);

        assert!(WatermarkRule::IncludeEqual.accepts(same, wm));
        assert!(WatermarkRule::IncludeEqual.accepts(newer, wm));
        assert!(!WatermarkRule::IncludeEqual.accepts(older, wm));

        assert!(!WatermarkRule::Strict.accepts(same, wm));
        assert!(WatermarkRule::Strict.accepts(newer, wm));

        assert!(WatermarkRule::ForceAll.accepts(older, wm));
    }

    #[test]
    fn test_screen_rules() {
        assert_eq!(MACHINING_REPORT.rule, WatermarkRule::IncludeEqual);
        assert_eq!(ALARM_HISTORY.rule, WatermarkRule::Strict);
        assert_eq!(OPERATION_HISTORY.rule, WatermarkRule::Strict);
        assert_eq!(NC_STATUS_AT_ALARM.rule, WatermarkRule::Strict);
        assert_eq!(OPERATING_REPORT.rule, WatermarkRule::ForceAll);
    }

    #[test]
    fn test_spec_lookup_covers_all_screens() {
        for kind in ScreenKind::ALL {
            assert_eq!(ScreenSpec::of(kind).kind, kind);
        }
    }
}
