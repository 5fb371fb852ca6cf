//! Angle and length unit helpers, and parsing of latitude/longitude strings.

use crate::errors::{Result, WmmError};

/// Radians per degree
pub const DEG: f64 = 1.0 / 57.29577951308232;
/// Meters per foot
pub const FT: f64 = 0.3048;

/// Decimal degrees from degrees, minutes and seconds.
///
/// Only the first non-zero component carries the sign, so 0°-12'54" is -0.215°.
pub fn dms_to_degrees(d: f64, m: f64, s: f64) -> f64 {
    let sign = [d, m, s]
        .into_iter()
        .find(|v| *v != 0.0)
        .map_or(1.0, |v| v.signum());
    sign * (d.abs() + m.abs() / 60.0 + s.abs() / 3600.0)
}

/// Inverse of [`dms_to_degrees`], with the sign on the first non-zero component.
pub fn degrees_to_dms(x: f64) -> (f64, f64, f64) {
    let sign = x.signum();
    let x = x.abs();
    let d = x.trunc();
    let m = ((x - d) * 60.0).trunc();
    let s = (x - d - m / 60.0) * 3600.0;
    if d != 0.0 {
        (sign * d, m, s)
    } else if m != 0.0 {
        (0.0, sign * m, s)
    } else {
        (0.0, 0.0, sign * s)
    }
}

/// Parses a latitude or longitude in decimal degrees, given as
/// `-45.5`, `45 30 0`, `45°30'0"`, `45:30`, and optionally with a hemisphere
/// letter in front or behind (`S45.5`, `45 30W`). S and W yield negative values.
pub fn parse_lat_lng(text: &str) -> Result<f64> {
    let invalid = || WmmError::Coordinate(text.to_string());
    let mut s = text.trim().to_uppercase();

    let mut negate = false;
    for hemisphere in ['N', 'S', 'E', 'W'] {
        if let Some(rest) = s.strip_prefix(hemisphere).or_else(|| s.strip_suffix(hemisphere)) {
            negate = matches!(hemisphere, 'S' | 'W');
            s = rest.to_string();
            break;
        }
    }

    let cleaned: String = s
        .chars()
        .map(|c| if matches!(c, '°' | '\'' | '"' | ':' | '′' | '″') { ' ' } else { c })
        .collect();
    let parts = cleaned
        .split_whitespace()
        .map(|p| p.parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<f64>>>()?;

    let value = match parts.as_slice() {
        [d] => *d,
        [d, m] => dms_to_degrees(*d, *m, 0.0),
        [d, m, s] => dms_to_degrees(*d, *m, *s),
        _ => return Err(invalid()),
    };
    Ok(if negate { -value.abs() } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn test_dms_to_degrees() {
        let ds = [59.0, 30.0, 20.0, -12.0, -89.0, 0.0, 0.0, 0.0, 0.0];
        let ms = [59.0, 12.0, 18.0, 45.0, 59.0, 6.0, -12.0, 0.0, 0.0];
        let ss = [59.999, 46.0, 31.0, 12.0, 1.25, 0.0, 54.0, -45.0, 18.0];
        let dds = [
            59.999999722,
            30.212777778,
            20.308611111,
            -12.753333333,
            -89.983680556,
            0.1,
            -0.215,
            -0.0125,
            0.005,
        ];
        for i in 0..ds.len() {
            assert_float_eq!(dms_to_degrees(ds[i], ms[i], ss[i]), dds[i], abs <= 1e-8);
        }
    }

    #[test]
    fn test_degrees_to_dms() {
        let (d, m, s) = degrees_to_dms(-12.753333333333);
        assert_eq!(d, -12.0);
        assert_eq!(m, 45.0);
        assert_float_eq!(s, 12.0, abs <= 1e-6);

        let (d, m, s) = degrees_to_dms(-0.215);
        assert_eq!((d, m), (0.0, -12.0));
        assert_float_eq!(s, 54.0, abs <= 1e-6);
    }

    #[test]
    fn test_units() {
        assert_float_eq!(180.0 * DEG, std::f64::consts::PI, abs <= 1e-12);
        assert_float_eq!(1000.0 * FT, 304.8, abs <= 1e-9);
    }

    #[test]
    fn test_parse_lat_lng() {
        assert_float_eq!(parse_lat_lng("-45.5").unwrap(), -45.5, abs <= 1e-12);
        assert_float_eq!(parse_lat_lng("45 30 0").unwrap(), 45.5, abs <= 1e-12);
        assert_float_eq!(parse_lat_lng("45°30'36\"").unwrap(), 45.51, abs <= 1e-9);
        assert_float_eq!(parse_lat_lng("45:30").unwrap(), 45.5, abs <= 1e-12);
        assert_float_eq!(parse_lat_lng("S45.5").unwrap(), -45.5, abs <= 1e-12);
        assert_float_eq!(parse_lat_lng("122 15W").unwrap(), -122.25, abs <= 1e-12);
        assert_float_eq!(parse_lat_lng("n 10").unwrap(), 10.0, abs <= 1e-12);
        assert_float_eq!(parse_lat_lng("240E").unwrap(), 240.0, abs <= 1e-12);
    }

    #[test]
    fn test_parse_lat_lng_errors() {
        assert!(matches!(parse_lat_lng(""), Err(WmmError::Coordinate(_))));
        assert!(matches!(parse_lat_lng("north"), Err(WmmError::Coordinate(_))));
        assert!(matches!(parse_lat_lng("1 2 3 4"), Err(WmmError::Coordinate(_))));
    }
}
