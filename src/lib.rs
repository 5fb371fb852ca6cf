//! Evaluation of the World Magnetic Model (WMM), the spherical harmonic model of the
//! Earth's main magnetic field and its slow drift over time (secular variation).
//!
//! ```no_run
//! use wmm_rs::{geoid::Location, model::MagneticModel, utils::DecimalYear, MagneticField};
//!
//! let model = MagneticModel::wmm2015()?;
//! let location = Location::from_geodetic(-80.0, 240.0, 100e3);
//! let field = MagneticField::new(&model, &location, DecimalYear::new(2017.5));
//! println!("D = {:.2}°, I = {:.2}°", field.declination(), field.inclination());
//! # Ok::<(), wmm_rs::errors::WmmError>(())
//! ```

pub mod coefficients;
pub mod config;
pub mod errors;
pub mod geoid;
pub mod model;
pub mod polynomial;
pub mod units;
pub mod utils;

use serde::Serialize;

use coefficients::MAX_DEGREE;
use errors::ValidityWarning;
use geoid::Location;
use model::MagneticModel;
use utils::DecimalYear;

/// Geomagnetic reference radius in meters
pub const A_GEO: f64 = 6371200.0;

// WMM global average uncertainties
const ERR_X: f64 = 131.0; // nT
const ERR_Y: f64 = 94.0; // nT
const ERR_Z: f64 = 157.0; // nT
const ERR_H: f64 = 128.0; // nT
const ERR_F: f64 = 148.0; // nT
const ERR_I: f64 = 0.21; // deg
const ERR_DA: f64 = 0.26; // deg, D error away from the poles
const ERR_DB: f64 = 5625.0; // nT, H scale of the D error near the poles

/// Field components in nT (north, east, down) and their rates of change in nT/year.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FieldVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

/// One-sigma uncertainties: nT for the intensities, degrees for the angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Uncertainty {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub h: f64,
    pub f: f64,
    pub i: f64,
    pub d: f64,
}

/// All derived observables of a field in the ellipsoidal frame. Intensities are in nT,
/// angles in degrees, rates per year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observables {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub h: f64,
    pub f: f64,
    pub i: f64,
    pub d: f64,
    pub gv: f64,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub dh: f64,
    pub df: f64,
    pub di: f64,
    pub dd: f64,
    pub dgv: f64,
}

/// The main magnetic field at one location and date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagneticField {
    location: Location,
    date: DecimalYear,
    spherical: FieldVector,
    warning: Option<ValidityWarning>,
}

impl MagneticField {
    /// Sums the spherical harmonic expansion of the model's active coefficients at
    /// `location` and `date`.
    ///
    /// Dates outside the validity window of the coefficients are extrapolated; the
    /// resulting warning is available through [`MagneticField::validity_warning`].
    pub fn new(model: &MagneticModel, location: &Location, date: impl Into<DecimalYear>) -> Self {
        let date = date.into();
        let coeff = model.snapshot();
        let legendre = model.legendre();
        let warning = coeff.validity(date);
        let years_since_epoch = coeff.years_since_epoch(date);

        let (gc_lat_rad, gc_lon_rad, gc_radius) = location.spherical();
        let sin_lat = gc_lat_rad.sin();

        let mut relative_radius_power = [0.0; MAX_DEGREE + 3];
        relative_radius_power[0] = 1.0;
        for n in 1..relative_radius_power.len() {
            relative_radius_power[n] = relative_radius_power[n - 1] * A_GEO / gc_radius;
        }

        let mut sin_lon = [0.0; MAX_DEGREE + 1];
        let mut cos_lon = [0.0; MAX_DEGREE + 1];
        cos_lon[0] = 1.0;
        sin_lon[1] = gc_lon_rad.sin();
        cos_lon[1] = gc_lon_rad.cos();
        for m in 2..=MAX_DEGREE {
            let x = m >> 1;
            sin_lon[m] = sin_lon[m - x] * cos_lon[x] + cos_lon[m - x] * sin_lon[x];
            cos_lon[m] = cos_lon[m - x] * cos_lon[x] - sin_lon[m - x] * sin_lon[x];
        }

        let mut v = FieldVector::default();
        for n in 1..=MAX_DEGREE {
            let rr = relative_radius_power[n + 2];
            for m in 0..=n {
                let c = coeff.sample(n, m, years_since_epoch);
                let p = legendre.associated(n, m, sin_lat);

                let gh = c.g * cos_lon[m] + c.h * sin_lon[m];
                let dgh = c.dg * cos_lon[m] + c.dh * sin_lon[m];
                v.x -= rr * gh * p.dp;
                v.dx -= rr * dgh * p.dp;
                v.z -= (n + 1) as f64 * rr * gh * p.p;
                v.dz -= (n + 1) as f64 * rr * dgh * p.p;

                if m > 0 {
                    let mf = m as f64;
                    v.y += rr * mf * (c.g * sin_lon[m] - c.h * cos_lon[m]) * p.p_over_cos;
                    v.dy += rr * mf * (c.dg * sin_lon[m] - c.dh * cos_lon[m]) * p.p_over_cos;
                }
            }
        }

        MagneticField {
            location: *location,
            date,
            spherical: v,
            warning,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn date(&self) -> DecimalYear {
        self.date
    }

    /// Set if the evaluation date was outside of the coefficients' validity window.
    pub fn validity_warning(&self) -> Option<&ValidityWarning> {
        self.warning.as_ref()
    }

    /// The field in geocentric spherical axes.
    ///
    /// These axes won't typically be used for navigation on or near the
    /// Earth's surface, but might be used in space.
    pub fn spherical(&self) -> FieldVector {
        self.spherical
    }

    /// The field in ellipsoidal axes, i.e. with the horizontal plane parallel to the
    /// WGS84 ellipsoid. This is what the derived observables are computed from.
    ///
    /// The rates are rotated by the same angle as the field. The rotation angle itself
    /// does not change over time, so this matches the WMM technical report.
    pub fn ellipsoidal(&self) -> FieldVector {
        let (lat_s, _, _) = self.location.spherical();
        let (lat_g, _, _) = self.location.geodetic();
        let (sin_dphi, cos_dphi) = (lat_s - lat_g).sin_cos();
        let s = &self.spherical;
        FieldVector {
            x: s.x * cos_dphi - s.z * sin_dphi,
            y: s.y,
            z: s.x * sin_dphi + s.z * cos_dphi,
            dx: s.dx * cos_dphi - s.dz * sin_dphi,
            dy: s.dy,
            dz: s.dx * sin_dphi + s.dz * cos_dphi,
        }
    }

    /// H in nT
    pub fn horizontal_intensity(&self) -> f64 {
        let v = self.ellipsoidal();
        v.x.hypot(v.y)
    }

    /// F in nT
    pub fn total_intensity(&self) -> f64 {
        let v = self.ellipsoidal();
        (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
    }

    /// I in degrees, positive downwards
    pub fn inclination(&self) -> f64 {
        let v = self.ellipsoidal();
        v.z.atan2(self.horizontal_intensity()).to_degrees()
    }

    /// D in degrees, positive east of true north
    pub fn declination(&self) -> f64 {
        let v = self.ellipsoidal();
        v.y.atan2(v.x).to_degrees()
    }

    /// Grid variation in degrees: the declination relative to grid north, which only differs from
    /// the declination in the polar regions beyond 55° latitude.
    pub fn grid_variation(&self) -> f64 {
        let (lat, lon, _) = self.location.geodetic();
        let d = self.declination();
        if lat > 55f64.to_radians() {
            d - lon.to_degrees()
        } else if lat < -55f64.to_radians() {
            d + lon.to_degrees()
        } else {
            d
        }
    }

    /// dH/dt in nT/year
    pub fn horizontal_intensity_rate(&self) -> f64 {
        let v = self.ellipsoidal();
        (v.x * v.dx + v.y * v.dy) / self.horizontal_intensity()
    }

    /// dF/dt in nT/year
    pub fn total_intensity_rate(&self) -> f64 {
        let v = self.ellipsoidal();
        (v.x * v.dx + v.y * v.dy + v.z * v.dz) / self.total_intensity()
    }

    /// dI/dt in degrees/year
    pub fn inclination_rate(&self) -> f64 {
        let v = self.ellipsoidal();
        let h = self.horizontal_intensity();
        let f = self.total_intensity();
        ((h * v.dz - self.horizontal_intensity_rate() * v.z) / (f * f)).to_degrees()
    }

    /// dD/dt in degrees/year
    pub fn declination_rate(&self) -> f64 {
        let v = self.ellipsoidal();
        let h = self.horizontal_intensity();
        ((v.x * v.dy - v.dx * v.y) / (h * h)).to_degrees()
    }

    /// dGV/dt in degrees/year
    pub fn grid_variation_rate(&self) -> f64 {
        self.declination_rate()
    }

    /// Global average uncertainties of the model. Only the declination uncertainty depends on the
    /// location, growing as the horizontal intensity gets weak near the magnetic poles.
    pub fn uncertainty(&self) -> Uncertainty {
        let h = self.horizontal_intensity();
        Uncertainty {
            x: ERR_X,
            y: ERR_Y,
            z: ERR_Z,
            h: ERR_H,
            f: ERR_F,
            i: ERR_I,
            d: (ERR_DA * ERR_DA + (ERR_DB / h) * (ERR_DB / h)).sqrt(),
        }
    }

    pub fn observables(&self) -> Observables {
        let v = self.ellipsoidal();
        Observables {
            x: v.x,
            y: v.y,
            z: v.z,
            h: self.horizontal_intensity(),
            f: self.total_intensity(),
            i: self.inclination(),
            d: self.declination(),
            gv: self.grid_variation(),
            dx: v.dx,
            dy: v.dy,
            dz: v.dz,
            dh: self.horizontal_intensity_rate(),
            df: self.total_intensity_rate(),
            di: self.inclination_rate(),
            dd: self.declination_rate(),
            dgv: self.grid_variation_rate(),
        }
    }
}
