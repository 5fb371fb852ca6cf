use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

use crate::errors::{range_error, Result, WmmError};

/// A year in decimal form such as 2017.5.
///
/// The fractional part is the fraction of the containing calendar year that has
/// elapsed, counted against that year's own length (365 or 366 days) with
/// day 0 being January 1st, 00:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct DecimalYear(f64);

impl DecimalYear {
    pub fn new(year: f64) -> Self {
        DecimalYear(year)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// The UTC instant this decimal year denotes, resolved to the millisecond.
    pub fn to_datetime(self) -> Result<OffsetDateTime> {
        let year = self.0.floor();
        if !year.is_finite() || year < i16::MIN as f64 || year > i16::MAX as f64 {
            return Err(range_error("decimal year", self.0, "a representable calendar year"));
        }
        let year = year as i32;
        let start = start_of_year(year)?;
        let millis = ((self.0 - year as f64) * (secs_in_year(year) * 1000) as f64).round() as i64;
        Ok(start + Duration::milliseconds(millis))
    }
}

impl From<f64> for DecimalYear {
    fn from(year: f64) -> Self {
        DecimalYear(year)
    }
}

impl From<OffsetDateTime> for DecimalYear {
    fn from(dt: OffsetDateTime) -> Self {
        let dt = dt.to_offset(UtcOffset::UTC);
        let year = dt.year();
        let start = Date::from_calendar_date(year, Month::January, 1)
            .map(|d| d.midnight().assume_utc())
            .unwrap_or(dt);
        let elapsed = (dt - start).as_seconds_f64();
        DecimalYear(year as f64 + elapsed / secs_in_year(year) as f64)
    }
}

impl From<Date> for DecimalYear {
    fn from(date: Date) -> Self {
        DecimalYear::from(date.midnight().assume_utc())
    }
}

/// Accepts either a decimal year ("2017.5") or a calendar date ("2017-07-02").
impl FromStr for DecimalYear {
    type Err = WmmError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(year) = s.parse::<f64>() {
            return Ok(DecimalYear(year));
        }
        let invalid = || WmmError::Date(s.to_string());
        let mut parts = s.splitn(3, '-');
        let year: i32 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let month: u8 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let day: u8 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let month = Month::try_from(month).map_err(|_| invalid())?;
        let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;
        Ok(DecimalYear::from(date))
    }
}

impl fmt::Display for DecimalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn secs_in_year(year: i32) -> i64 {
    time::util::days_in_year(year) as i64 * 24 * 60 * 60
}

fn start_of_year(year: i32) -> Result<OffsetDateTime> {
    let date = Date::from_calendar_date(year, Month::January, 1)
        .map_err(|_| range_error("year", year, "-9999..=9999"))?;
    Ok(date.midnight().assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use time::macros::datetime;

    #[test]
    fn test_decimal_year_to_datetime() {
        let cases = [
            (1995.0, datetime!(1995-01-01 00:00 UTC)),
            (1996.0 - 1.0 / 365.0, datetime!(1995-12-31 00:00 UTC)),
            (1997.0 - 1.0 / 366.0, datetime!(1996-12-31 00:00 UTC)),
            (2004.0, datetime!(2004-01-01 00:00 UTC)),
            (2017.5, datetime!(2017-07-02 12:00 UTC)),
        ];
        for (year, expected) in cases {
            assert_eq!(DecimalYear::new(year).to_datetime().unwrap(), expected);
        }
    }

    #[test]
    fn test_datetime_to_decimal_year() {
        let cases = [
            (datetime!(1995-01-01 00:00 UTC), 1995.0),
            (datetime!(1995-12-31 00:00 UTC), 1996.0 - 1.0 / 365.0),
            (datetime!(1996-12-31 00:00 UTC), 1997.0 - 1.0 / 366.0),
            (datetime!(2017-07-02 12:00 UTC), 2017.5),
        ];
        for (dt, expected) in cases {
            assert_float_eq!(DecimalYear::from(dt).value(), expected, abs <= 1e-9);
        }
    }

    #[test]
    fn test_offset_is_normalized_to_utc() {
        let local = datetime!(1995-01-01 2:00 +2);
        assert_float_eq!(DecimalYear::from(local).value(), 1995.0, abs <= 1e-12);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("2017.5".parse::<DecimalYear>().unwrap(), DecimalYear::new(2017.5));
        assert_eq!(" 2020 ".parse::<DecimalYear>().unwrap(), DecimalYear::new(2020.0));
        let parsed: DecimalYear = "1995-12-31".parse().unwrap();
        assert_float_eq!(parsed.value(), 1996.0 - 1.0 / 365.0, abs <= 1e-9);
        assert!(matches!("2017-13-01".parse::<DecimalYear>(), Err(WmmError::Date(_))));
        assert!(matches!("yesterday".parse::<DecimalYear>(), Err(WmmError::Date(_))));
    }
}
