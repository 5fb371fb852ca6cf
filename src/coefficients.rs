//! Spherical harmonic coefficients of the World Magnetic Model, as published in `.COF` files.
//!
//! A COF file starts with a header line `<epoch> <model name> <MM/DD/YYYY>` followed by
//! one line per degree/order: `<n> <m> <g> <h> <dg> <dh>`, the Gauss coefficients at the
//! epoch in nT and their secular variation in nT/year. Lines with fewer than six fields
//! (such as the trailing `9999...` markers) are not data and are skipped.

use std::fs;
use std::path::Path;
use time::{Date, Month};
use tracing::{debug, warn};

use crate::errors::{parse_error, range_error, Result, ValidityWarning, WmmError};
use crate::utils::DecimalYear;

pub const MAX_DEGREE: usize = 12;

/// Years after the epoch a coefficient set is documented to be valid for.
pub const DEFAULT_VALIDITY_YEARS: f64 = 5.0;

pub(crate) const WMM2015_COF: &str = include_str!("../data/WMM2015v1.COF");

type Table = [[f64; MAX_DEGREE + 1]; MAX_DEGREE + 1];

/// Coefficients of one (n,m) term at a given date.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoefficientSample {
    pub g: f64,
    pub h: f64,
    pub dg: f64,
    pub dh: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientSet {
    g: Table,
    h: Table,
    delta_g: Table,
    delta_h: Table,
    epoch: DecimalYear,
    name: String,
    valid_from: Date,
    validity_years: f64,
}

impl CoefficientSet {
    /// The original release of WMM-2015, epoch 2015.0, valid from 12/15/2014.
    pub fn wmm2015() -> Result<Self> {
        CoefficientSet::parse(WMM2015_COF, "WMM2015v1.COF")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        CoefficientSet::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, source_name: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

        let (header_no, header) = lines
            .next()
            .ok_or_else(|| WmmError::MissingHeader(source_name.to_string()))?;
        let line = header_no + 1;
        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(parse_error(source_name, line, "header", header));
        }
        let epoch: f64 = fields[0]
            .parse()
            .map_err(|_| parse_error(source_name, line, "epoch", fields[0]))?;
        let date_field = fields[fields.len() - 1];
        let valid_from = parse_mdy(date_field)
            .ok_or_else(|| parse_error(source_name, line, "valid-from date", date_field))?;
        let name = fields[1..fields.len() - 1].join(" ");

        let mut set = CoefficientSet {
            g: [[0.0; MAX_DEGREE + 1]; MAX_DEGREE + 1],
            h: [[0.0; MAX_DEGREE + 1]; MAX_DEGREE + 1],
            delta_g: [[0.0; MAX_DEGREE + 1]; MAX_DEGREE + 1],
            delta_h: [[0.0; MAX_DEGREE + 1]; MAX_DEGREE + 1],
            epoch: DecimalYear::new(epoch),
            name,
            valid_from,
            validity_years: DEFAULT_VALIDITY_YEARS,
        };

        let mut rows = 0;
        for (line_no, text) in lines {
            let fields: Vec<&str> = text.split_whitespace().collect();
            if fields.len() < 6 {
                continue;
            }
            let line = line_no + 1;
            let n: usize = fields[0]
                .parse()
                .map_err(|_| parse_error(source_name, line, "degree", fields[0]))?;
            let m: usize = fields[1]
                .parse()
                .map_err(|_| parse_error(source_name, line, "order", fields[1]))?;
            check_index(n, m)?;

            let mut values = [0.0f64; 4];
            for (i, field) in ["g", "h", "dg", "dh"].into_iter().enumerate() {
                values[i] = fields[i + 2]
                    .parse()
                    .map_err(|_| parse_error(source_name, line, field, fields[i + 2]))?;
            }
            set.g[n][m] = values[0];
            set.h[n][m] = values[1];
            set.delta_g[n][m] = values[2];
            set.delta_h[n][m] = values[3];
            rows += 1;
        }

        debug!(source_name, name = %set.name, epoch, rows, "loaded coefficients");
        Ok(set)
    }

    pub fn with_validity_years(mut self, years: f64) -> Self {
        self.validity_years = years;
        self
    }

    pub fn epoch(&self) -> DecimalYear {
        self.epoch
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn valid_from(&self) -> Date {
        self.valid_from
    }

    pub fn validity_years(&self) -> f64 {
        self.validity_years
    }

    pub fn valid_until(&self) -> DecimalYear {
        DecimalYear::new(self.epoch.value() + self.validity_years)
    }

    /// A warning if `date` lies before the first valid date or past the end of the validity window.
    pub fn validity(&self, date: DecimalYear) -> Option<ValidityWarning> {
        let valid_from = DecimalYear::from(self.valid_from);
        let valid_until = self.valid_until();
        if date < valid_from || date > valid_until {
            warn!(
                requested = %date,
                name = %self.name,
                "date outside of coefficient validity period"
            );
            Some(ValidityWarning { requested: date, valid_from, valid_until })
        } else {
            None
        }
    }

    /// G(n,m), H(n,m) linearly extrapolated from the epoch to `date`,
    /// and their rates dG(n,m), dH(n,m).
    ///
    /// Dates outside of the validity window still produce values;
    /// the warning is returned alongside.
    pub fn coefficients(
        &self,
        n: usize,
        m: usize,
        date: DecimalYear,
    ) -> Result<(CoefficientSample, Option<ValidityWarning>)> {
        check_index(n, m)?;
        let warning = self.validity(date);
        Ok((self.sample(n, m, self.years_since_epoch(date)), warning))
    }

    pub(crate) fn years_since_epoch(&self, date: DecimalYear) -> f64 {
        date.value() - self.epoch.value()
    }

    // caller guarantees m <= n <= MAX_DEGREE
    pub(crate) fn sample(&self, n: usize, m: usize, dt: f64) -> CoefficientSample {
        CoefficientSample {
            g: self.g[n][m] + dt * self.delta_g[n][m],
            h: self.h[n][m] + dt * self.delta_h[n][m],
            dg: self.delta_g[n][m],
            dh: self.delta_h[n][m],
        }
    }
}

fn check_index(n: usize, m: usize) -> Result<()> {
    if n > MAX_DEGREE {
        return Err(range_error("degree n", n, format!("0..={MAX_DEGREE}")));
    }
    if m > n {
        return Err(range_error("order m", m, format!("0..={n}")));
    }
    Ok(())
}

// MM/DD/YYYY
fn parse_mdy(s: &str) -> Option<Date> {
    let mut parts = s.split('/');
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}
