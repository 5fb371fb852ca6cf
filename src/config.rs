use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::coefficients::DEFAULT_VALIDITY_YEARS;
use crate::errors::Result;
use crate::geoid::GeoidGrid;

/// Where to get model data from, e.g.
/// ```text
/// ModelConfig(
///     coefficients: Some("WMM2020.COF"),
///     geoid: Some("WW15MGH.GRD"),
///     validity_years: 5.0,
/// )
/// ```
/// Without `coefficients` the embedded WMM-2015 set is used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub coefficients: Option<PathBuf>,
    #[serde(default)]
    pub geoid: Option<PathBuf>,
    #[serde(default = "default_validity_years")]
    pub validity_years: f64,
}

fn default_validity_years() -> f64 {
    DEFAULT_VALIDITY_YEARS
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            coefficients: None,
            geoid: None,
            validity_years: DEFAULT_VALIDITY_YEARS,
        }
    }
}

impl ModelConfig {
    pub fn from_ron_str(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        ModelConfig::from_ron_str(&s)
    }

    /// The configured geoid grid, if any.
    pub fn geoid_grid(&self) -> Result<Option<GeoidGrid>> {
        self.geoid.as_ref().map(GeoidGrid::from_path).transpose()
    }
}
