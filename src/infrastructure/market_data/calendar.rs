//! Per-realm trading calendars.
//!
//! Weekends plus the fixed-date and floating holidays of each venue.
//! Lunar-calendar KR holidays shift year to year and come from a small
//! table of known dates rather than an algorithm.

use crate::domain::market::ticker::Realm;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc, Weekday};

/// KR lunar holidays (Seollal, Chuseok blocks and substitutes) by date.
/// Extend this table as new years are published.
const KR_LUNAR_HOLIDAYS: &[(i32, u32, u32)] = &[
    (2024, 2, 9),
    (2024, 2, 12),
    (2024, 9, 16),
    (2024, 9, 17),
    (2024, 9, 18),
    (2025, 1, 28),
    (2025, 1, 29),
    (2025, 1, 30),
    (2025, 10, 6),
    (2025, 10, 7),
    (2025, 10, 8),
    (2026, 2, 16),
    (2026, 2, 17),
    (2026, 2, 18),
    (2026, 9, 24),
    (2026, 9, 25),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct MarketCalendar;

impl MarketCalendar {
    pub fn is_trading_day(&self, realm: Realm, date: NaiveDate) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        match realm {
            Realm::Kr => !self.is_kr_holiday(date),
            Realm::Us => !self.is_us_holiday(date),
        }
    }

    /// Latest trading day at or before `date`.
    pub fn nearest_past_trading_day(&self, realm: Realm, date: NaiveDate) -> NaiveDate {
        let mut d = date;
        while !self.is_trading_day(realm, d) {
            d = d - Days::new(1);
        }
        d
    }

    pub fn previous_trading_day(&self, realm: Realm, date: NaiveDate) -> NaiveDate {
        self.nearest_past_trading_day(realm, date - Days::new(1))
    }

    /// Whether the venue's regular session has closed by `now`.
    pub fn is_after_close(&self, realm: Realm, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&realm.timezone());
        let close = match realm {
            Realm::Kr => NaiveTime::from_hms_opt(15, 30, 0),
            Realm::Us => NaiveTime::from_hms_opt(16, 0, 0),
        };
        match close {
            Some(close) => local.time() >= close,
            None => false,
        }
    }

    /// The completed trading day to analyze: today once the session has
    /// closed, otherwise the previous trading day.
    pub fn reference_date(&self, realm: Realm, now: DateTime<Utc>) -> NaiveDate {
        let today = now.with_timezone(&realm.timezone()).date_naive();
        if self.is_trading_day(realm, today) && self.is_after_close(realm, now) {
            today
        } else {
            self.previous_trading_day(realm, today)
        }
    }

    fn is_kr_holiday(&self, date: NaiveDate) -> bool {
        let fixed = matches!(
            (date.month(), date.day()),
            (1, 1) | (3, 1) | (5, 1) | (5, 5) | (6, 6) | (8, 15) | (10, 3) | (10, 9) | (12, 25)
        );
        // Year-end market closure
        let closure = date.month() == 12 && date.day() == 31;
        fixed
            || closure
            || KR_LUNAR_HOLIDAYS
                .iter()
                .any(|&(y, m, d)| date.year() == y && date.month() == m && date.day() == d)
    }

    fn is_us_holiday(&self, date: NaiveDate) -> bool {
        let (m, d) = (date.month(), date.day());
        // Fixed-date holidays (observation shifts ignored for simplicity)
        if matches!((m, d), (1, 1) | (6, 19) | (7, 4) | (12, 25)) {
            return true;
        }
        // Floating: MLK (3rd Mon Jan), Presidents (3rd Mon Feb),
        // Memorial (last Mon May), Labor (1st Mon Sep),
        // Thanksgiving (4th Thu Nov)
        let nth = (d - 1) / 7 + 1;
        let weekday = date.weekday();
        match (m, weekday) {
            (1, Weekday::Mon) if nth == 3 => true,
            (2, Weekday::Mon) if nth == 3 => true,
            (5, Weekday::Mon) => date + Days::new(7) > last_day_of_month(date),
            (9, Weekday::Mon) if nth == 1 => true,
            (11, Weekday::Thu) if nth == 4 => true,
            _ => false,
        }
    }
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (y, m) = (date.year(), date.month());
    let first_next = if m == 12 {
        NaiveDate::from_ymd_opt(y + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(y, m + 1, 1)
    };
    first_next.map(|d| d - Days::new(1)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekends_are_closed() {
        let cal = MarketCalendar;
        // 2025-06-07 is a Saturday
        assert!(!cal.is_trading_day(Realm::Us, date(2025, 6, 7)));
        assert!(!cal.is_trading_day(Realm::Kr, date(2025, 6, 8)));
        assert!(cal.is_trading_day(Realm::Us, date(2025, 6, 9)));
    }

    #[test]
    fn test_fixed_holidays() {
        let cal = MarketCalendar;
        assert!(!cal.is_trading_day(Realm::Us, date(2025, 7, 4)));
        assert!(!cal.is_trading_day(Realm::Kr, date(2025, 5, 1)));
        assert!(!cal.is_trading_day(Realm::Kr, date(2025, 12, 25)));
    }

    #[test]
    fn test_floating_us_holidays() {
        let cal = MarketCalendar;
        // Thanksgiving 2025: Nov 27 (4th Thursday)
        assert!(!cal.is_trading_day(Realm::Us, date(2025, 11, 27)));
        // Labor Day 2025: Sep 1 (1st Monday)
        assert!(!cal.is_trading_day(Realm::Us, date(2025, 9, 1)));
        // Memorial Day 2025: May 26 (last Monday)
        assert!(!cal.is_trading_day(Realm::Us, date(2025, 5, 26)));
        // An ordinary Monday trades
        assert!(cal.is_trading_day(Realm::Us, date(2025, 6, 2)));
    }

    #[test]
    fn test_nearest_past_skips_weekend() {
        let cal = MarketCalendar;
        // Sunday resolves back to Friday
        assert_eq!(
            cal.nearest_past_trading_day(Realm::Us, date(2025, 6, 8)),
            date(2025, 6, 6)
        );
        // A trading day resolves to itself
        assert_eq!(
            cal.nearest_past_trading_day(Realm::Us, date(2025, 6, 6)),
            date(2025, 6, 6)
        );
    }

    #[test]
    fn test_reference_date_during_and_after_hours() {
        let cal = MarketCalendar;
        // 2025-06-03 14:00 ET = 18:00 UTC: during US market hours
        let during = Utc.with_ymd_and_hms(2025, 6, 3, 18, 0, 0).unwrap();
        assert_eq!(cal.reference_date(Realm::Us, during), date(2025, 6, 2));

        // 2025-06-03 17:00 ET = 21:00 UTC: after the close
        let after = Utc.with_ymd_and_hms(2025, 6, 3, 21, 0, 0).unwrap();
        assert_eq!(cal.reference_date(Realm::Us, after), date(2025, 6, 3));
    }
}
