//! WGS84 locations and the EGM96 geoid height grid.
//!
//! A [`Location`] is stored in geodetic form (latitude, longitude and height above the
//! WGS84 ellipsoid). The geocentric spherical form used by the magnetic model is derived
//! on demand. Heights above mean sea level are converted through a [`GeoidGrid`], the
//! NGA 15'x15' raster of geoid undulations, which is interpolated bilinearly.

use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::errors::{parse_error, range_error, Result, WmmError};

/// Equatorial radius of the WGS84 reference ellipsoid in meters
pub const A: f64 = 6378137.0;
/// Flattening of the WGS84 reference ellipsoid
pub const F: f64 = 1.0 / 298.257223563;
/// Eccentricity squared of the WGS84 reference ellipsoid
pub const E2: f64 = F * (2.0 - F);

/// A position given by geodetic latitude and longitude (radians)
/// and height above the ellipsoid (meters).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    height: f64,
}

impl Location {
    /// Location from latitude and longitude in degrees and height above the WGS84 ellipsoid
    /// in meters. Values are not range checked.
    pub fn from_geodetic(lat_deg: f64, lon_deg: f64, height: f64) -> Self {
        Location {
            latitude: lat_deg.to_radians(),
            longitude: lon_deg.to_radians(),
            height,
        }
    }

    /// Location from latitude and longitude in degrees and height above mean sea level in meters.
    pub fn from_msl(
        lat_deg: f64,
        lon_deg: f64,
        height_msl: f64,
        geoid: &GeoidGrid,
    ) -> Result<Self> {
        let n = geoid.undulation(lat_deg, lon_deg)?;
        Ok(Location::from_geodetic(lat_deg, lon_deg, height_msl + n))
    }

    /// (latitude, longitude, height) as stored: radians, radians, meters above the ellipsoid.
    pub fn geodetic(&self) -> (f64, f64, f64) {
        (self.latitude, self.longitude, self.height)
    }

    /// (latitude′, longitude, radius) in the geocentric spherical frame: radians, radians, meters.
    pub fn spherical(&self) -> (f64, f64, f64) {
        let (sin_phi, cos_phi) = self.latitude.sin_cos();
        let rc = A / (1.0 - E2 * sin_phi * sin_phi).sqrt();
        let p = (rc + self.height) * cos_phi;
        let z = (rc * (1.0 - E2) + self.height) * sin_phi;
        let r = (p * p + z * z).sqrt();
        ((z / r).asin(), self.longitude, r)
    }

    /// Height above mean sea level in meters.
    pub fn height_above_msl(&self, geoid: &GeoidGrid) -> Result<f64> {
        let n = geoid.undulation(self.latitude.to_degrees(), self.longitude.to_degrees())?;
        Ok(self.height - n)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}, {:.1}m)",
            self.latitude.to_degrees(),
            self.longitude.to_degrees(),
            self.height
        )
    }
}

/// A regular latitude/longitude grid of geoid undulations in meters.
///
/// Rows run from north to south, each row from west to east, as in the NGA `WW15MGH.GRD` file.
/// No grid is compiled into the crate: load the EGM96 file with [`GeoidGrid::from_path`] or
/// through the `geoid` entry of [`ModelConfig`](crate::config::ModelConfig), then pass it to
/// [`Location::from_msl`] and [`Location::height_above_msl`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeoidGrid {
    south: f64,
    north: f64,
    west: f64,
    east: f64,
    dlat: f64,
    dlon: f64,
    rows: usize,
    cols: usize,
    heights: Vec<f64>,
}

impl GeoidGrid {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        GeoidGrid::parse(&text, &path.display().to_string())
    }

    /// Parses a grid whose first line is `south north west east dlat dlon` (degrees),
    /// followed by whitespace separated heights.
    pub fn parse(text: &str, source_name: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

        let (header_no, header) = lines
            .next()
            .ok_or_else(|| WmmError::MissingHeader(source_name.to_string()))?;
        let fields: Vec<&str> = header.split_whitespace().collect();
        const NAMES: [&str; 6] = ["south", "north", "west", "east", "dlat", "dlon"];
        if fields.len() < NAMES.len() {
            return Err(parse_error(source_name, header_no + 1, "grid header", header));
        }
        let mut bounds = [0.0f64; 6];
        for (i, name) in NAMES.iter().enumerate() {
            bounds[i] = fields[i]
                .parse()
                .map_err(|_| parse_error(source_name, header_no + 1, *name, fields[i]))?;
        }
        let [south, north, west, east, dlat, dlon] = bounds;
        if !(dlat > 0.0 && dlon > 0.0 && north > south && east > west) {
            return Err(parse_error(source_name, header_no + 1, "grid header", header));
        }

        let rows = ((north - south) / dlat).round() as usize + 1;
        let cols = ((east - west) / dlon).round() as usize + 1;
        if rows < 2 || cols < 2 {
            return Err(parse_error(source_name, header_no + 1, "grid header", header));
        }

        let mut heights = Vec::with_capacity(rows * cols);
        for (line_no, line) in lines {
            for tok in line.split_whitespace() {
                let h: f64 = tok
                    .parse()
                    .map_err(|_| parse_error(source_name, line_no + 1, "geoid height", tok))?;
                heights.push(h);
            }
        }
        if heights.len() != rows * cols {
            return Err(parse_error(
                source_name,
                header_no + 1,
                "grid size",
                &format!("{} values for {}x{} grid", heights.len(), rows, cols),
            ));
        }

        debug!(source_name, rows, cols, "loaded geoid grid");
        Ok(GeoidGrid { south, north, west, east, dlat, dlon, rows, cols, heights })
    }

    /// (rows, cols)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// The stored height at a grid node, row 0 being the northern edge.
    pub fn node(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.heights[row * self.cols + col])
        } else {
            None
        }
    }

    /// Geoid height above the WGS84 ellipsoid in meters at the given latitude/longitude (degrees),
    /// bilinearly interpolated between the four surrounding nodes.
    pub fn undulation(&self, lat_deg: f64, lon_deg: f64) -> Result<f64> {
        if !(lat_deg >= self.south && lat_deg <= self.north) {
            let valid = format!("[{}, {}]", self.south, self.north);
            return Err(range_error("latitude", lat_deg, valid));
        }
        let lon = self.west + (lon_deg - self.west).rem_euclid(360.0);
        if !(lon >= self.west && lon <= self.east) {
            let valid = format!("[{}, {}]", self.west, self.east);
            return Err(range_error("longitude", lon_deg, valid));
        }

        let (i, y) = cell_index((self.north - lat_deg) / self.dlat, self.rows);
        let (j, x) = cell_index((lon - self.west) / self.dlon, self.cols);

        let h00 = self.heights[i * self.cols + j];
        let h10 = self.heights[i * self.cols + j + 1];
        let h01 = self.heights[(i + 1) * self.cols + j];
        let h11 = self.heights[(i + 1) * self.cols + j + 1];
        Ok(bilinear(x, y, h00, h10, h01, h11))
    }
}

// lower node index of the cell containing a fractional grid position, and the offset within it
fn cell_index(pos: f64, len: usize) -> (usize, f64) {
    let i = (pos.floor().max(0.0) as usize).min(len - 2);
    (i, pos - i as f64)
}

/// Value at offsets (x,y) within a cell with corner values h00, h10 (x+1), h01 (y+1) and h11.
pub fn bilinear(x: f64, y: f64, h00: f64, h10: f64, h01: f64, h11: f64) -> f64 {
    (1.0 - x) * (1.0 - y) * h00 + x * (1.0 - y) * h10 + (1.0 - x) * y * h01 + x * y * h11
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    // 5x5 nodes covering 10S..10N, 0E..20E, height = lat + 2*lon
    fn linear_grid() -> GeoidGrid {
        let mut text = String::from("-10.0 10.0 0.0 20.0 5.0 5.0\n");
        for lat in [10.0, 5.0, 0.0, -5.0, -10.0] {
            let row: Vec<String> = [0.0, 5.0, 10.0, 15.0, 20.0]
                .iter()
                .map(|lon| format!("{:.3}", lat + 2.0 * lon))
                .collect();
            text.push_str(&row.join(" "));
            text.push('\n');
        }
        GeoidGrid::parse(&text, "linear").unwrap()
    }

    #[test]
    fn test_spherical_equator_and_pole() {
        let (lat, lon, r) = Location::from_geodetic(0.0, 30.0, 0.0).spherical();
        assert_float_eq!(lat, 0.0, abs <= 1e-12);
        assert_float_eq!(lon, 30f64.to_radians(), abs <= 1e-12);
        assert_float_eq!(r, A, abs <= 1e-6);

        let (lat, _, r) = Location::from_geodetic(90.0, 0.0, 0.0).spherical();
        assert_float_eq!(lat, std::f64::consts::FRAC_PI_2, abs <= 1e-9);
        assert_float_eq!(r, A * (1.0 - F), abs <= 1e-6);
    }

    #[test]
    fn test_spherical_latitude_on_ellipsoid() {
        // on the ellipsoid surface tan φ′ = (1 - e²) tan φ
        let loc = Location::from_geodetic(45.0, 0.0, 0.0);
        let (lat_s, _, _) = loc.spherical();
        let (lat_g, _, _) = loc.geodetic();
        assert_float_eq!(lat_s.tan(), (1.0 - E2) * lat_g.tan(), abs <= 1e-12);
        assert!(lat_s < lat_g);
    }

    #[test]
    fn test_geodetic_is_stored_unchanged() {
        let loc = Location::from_geodetic(-80.0, 240.0, 100e3);
        let (lat, lon, h) = loc.geodetic();
        assert_float_eq!(lat, -80f64.to_radians(), abs <= 1e-12);
        assert_float_eq!(lon, 4.1887902048, abs <= 5e-5);
        assert_eq!(h, 100e3);
    }

    #[test]
    fn test_bilinear_corners() {
        assert_eq!(bilinear(0.0, 0.0, 1.0, 2.0, 3.0, 4.0), 1.0);
        assert_eq!(bilinear(1.0, 0.0, 1.0, 2.0, 3.0, 4.0), 2.0);
        assert_eq!(bilinear(0.0, 1.0, 1.0, 2.0, 3.0, 4.0), 3.0);
        assert_eq!(bilinear(1.0, 1.0, 1.0, 2.0, 3.0, 4.0), 4.0);
        assert_float_eq!(bilinear(0.5, 0.5, 1.0, 2.0, 3.0, 4.0), 2.5, abs <= 1e-12);
    }

    #[test]
    fn test_grid_nodes_are_exact() {
        let grid = linear_grid();
        assert_eq!(grid.dimensions(), (5, 5));
        assert_eq!(grid.node(0, 0), Some(10.0));
        assert_eq!(grid.node(4, 4), Some(30.0));
        assert_eq!(grid.node(5, 0), None);

        assert_eq!(grid.undulation(5.0, 10.0).unwrap(), 25.0);
        assert_eq!(grid.undulation(10.0, 0.0).unwrap(), 10.0);
        assert_eq!(grid.undulation(-10.0, 20.0).unwrap(), 30.0);
    }

    #[test]
    fn test_grid_interpolates_linear_surface() {
        let grid = linear_grid();
        assert_float_eq!(grid.undulation(2.5, 7.5).unwrap(), 17.5, abs <= 1e-9);
        assert_float_eq!(grid.undulation(-7.3, 13.1).unwrap(), -7.3 + 26.2, abs <= 1e-9);
    }

    #[test]
    fn test_grid_out_of_range() {
        let grid = linear_grid();
        let outside = |lat, lon| match grid.undulation(lat, lon) {
            Err(WmmError::Range { what, .. }) => what,
            other => panic!("expected a range error, got {other:?}"),
        };
        assert_eq!(outside(10.5, 5.0), "latitude");
        assert_eq!(outside(0.0, 25.0), "longitude");
        assert_eq!(outside(0.0, -5.0), "longitude");
        assert!(Location::from_msl(-11.0, 5.0, 0.0, &grid).is_err());
    }

    #[test]
    fn test_grid_longitude_wraps() {
        let grid = linear_grid();
        assert_eq!(grid.undulation(5.0, 370.0).unwrap(), grid.undulation(5.0, 10.0).unwrap());
        assert_eq!(grid.undulation(5.0, -350.0).unwrap(), grid.undulation(5.0, 10.0).unwrap());
    }

    #[test]
    fn test_msl_round_trip() {
        let grid = linear_grid();
        let loc = Location::from_msl(5.0, 10.0, 1234.5, &grid).unwrap();
        assert_float_eq!(loc.geodetic().2, 1234.5 + 25.0, abs <= 1e-9);
        assert_float_eq!(loc.height_above_msl(&grid).unwrap(), 1234.5, abs <= 1e-6);

        let loc = Location::from_msl(-3.3, 17.2, 20.0, &grid).unwrap();
        assert_float_eq!(loc.height_above_msl(&grid).unwrap(), 20.0, abs <= 1e-6);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(GeoidGrid::parse("", "empty"), Err(WmmError::MissingHeader(_))));
        assert!(matches!(
            GeoidGrid::parse("-10 10 0 x 5 5\n", "bad"),
            Err(WmmError::Parse { field: "east", .. })
        ));
        assert!(matches!(
            GeoidGrid::parse("0 5 0 5 5 5\n1 2 3\n", "short"),
            Err(WmmError::Parse { field: "grid size", .. })
        ));
        assert!(matches!(
            GeoidGrid::parse("0 5 0 5 5 5\n1 2 3 zz\n", "junk"),
            Err(WmmError::Parse { field: "geoid height", line: 2, .. })
        ));
    }
}
