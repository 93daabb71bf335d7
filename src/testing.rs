//! Test-only helpers shared across unit test modules.

use chrono::offset::MappedLocalTime;
use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

const WINTER_SECS: i32 = 3600;
const SUMMER_SECS: i32 = 2 * 3600;

/// Central European time for 2026: UTC+1, with summer time (UTC+2) from
/// 2026-03-29 01:00 UTC until 2026-10-25 01:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CentralEurope;

fn winter() -> FixedOffset {
    FixedOffset::east_opt(WINTER_SECS).unwrap()
}

fn summer() -> FixedOffset {
    FixedOffset::east_opt(SUMMER_SECS).unwrap()
}

fn utc_instant(month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, month, day)
        .unwrap()
        .and_hms_opt(1, 0, 0)
        .unwrap()
}

impl TimeZone for CentralEurope {
    type Offset = FixedOffset;

    fn from_offset(_offset: &FixedOffset) -> Self {
        CentralEurope
    }

    fn offset_from_local_date(&self, local: &NaiveDate) -> MappedLocalTime<FixedOffset> {
        self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> MappedLocalTime<FixedOffset> {
        let fits = |offset: FixedOffset| {
            let utc = *local - Duration::seconds(i64::from(offset.local_minus_utc()));
            self.offset_from_utc_datetime(&utc) == offset
        };
        match (fits(summer()), fits(winter())) {
            (true, true) => MappedLocalTime::Ambiguous(summer(), winter()),
            (true, false) => MappedLocalTime::Single(summer()),
            (false, true) => MappedLocalTime::Single(winter()),
            (false, false) => MappedLocalTime::None,
        }
    }

    fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
        self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
        if *utc >= utc_instant(3, 29) && *utc < utc_instant(10, 25) {
            summer()
        } else {
            winter()
        }
    }
}

#[test]
fn central_europe_switches_offsets() {
    let before = CentralEurope.with_ymd_and_hms(2026, 3, 28, 12, 0, 0).unwrap();
    let after = CentralEurope.with_ymd_and_hms(2026, 3, 30, 0, 0, 0).unwrap();
    assert_eq!(before.offset().local_minus_utc(), WINTER_SECS);
    assert_eq!(after.offset().local_minus_utc(), SUMMER_SECS);

    // 02:30 on the spring-forward night does not exist.
    assert_eq!(CentralEurope.with_ymd_and_hms(2026, 3, 29, 2, 30, 0), MappedLocalTime::None);
}
