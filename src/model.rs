use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use crate::coefficients::{CoefficientSample, CoefficientSet};
use crate::config::ModelConfig;
use crate::errors::{Result, ValidityWarning};
use crate::geoid::Location;
use crate::polynomial::LegendreTable;
use crate::utils::DecimalYear;
use crate::MagneticField;

/// A loaded magnetic model: the active coefficient set plus the Legendre table used to evaluate it.
///
/// Loading a new coefficient set replaces the active one as a whole. Readers take a snapshot
/// of the set, so an evaluation never sees a mix of old and new coefficients.
/// Sets parsed by [`load`](Self::load) and [`load_path`](Self::load_path) get the validity
/// window the model was created with.
#[derive(Debug)]
pub struct MagneticModel {
    coefficients: RwLock<Arc<CoefficientSet>>,
    validity_years: f64,
    legendre: LegendreTable,
}

impl MagneticModel {
    pub fn new(coefficients: CoefficientSet) -> Self {
        MagneticModel {
            validity_years: coefficients.validity_years(),
            coefficients: RwLock::new(Arc::new(coefficients)),
            legendre: LegendreTable::new(),
        }
    }

    /// Model using the embedded WMM-2015 coefficients.
    pub fn wmm2015() -> Result<Self> {
        Ok(MagneticModel::new(CoefficientSet::wmm2015()?))
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let set = match &config.coefficients {
            Some(path) => CoefficientSet::from_path(path)?,
            None => CoefficientSet::wmm2015()?,
        };
        Ok(MagneticModel::new(set.with_validity_years(config.validity_years)))
    }

    /// Parses `text` as COF data and makes it the active coefficient set.
    /// On error the previously active set stays in place.
    pub fn load(&self, text: &str, source_name: &str) -> Result<()> {
        let set = CoefficientSet::parse(text, source_name)?;
        self.replace(set.with_validity_years(self.validity_years));
        Ok(())
    }

    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let set = CoefficientSet::from_path(path)?;
        self.replace(set.with_validity_years(self.validity_years));
        Ok(())
    }

    /// Activates `set` as given, including its own validity window.
    pub fn replace(&self, set: CoefficientSet) {
        info!(name = set.name(), epoch = %set.epoch(), "activating coefficient set");
        *self.coefficients.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(set);
    }

    /// The currently active coefficient set.
    pub fn snapshot(&self) -> Arc<CoefficientSet> {
        self.coefficients.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// See [`CoefficientSet::coefficients`].
    pub fn coefficients(
        &self,
        n: usize,
        m: usize,
        date: DecimalYear,
    ) -> Result<(CoefficientSample, Option<ValidityWarning>)> {
        self.snapshot().coefficients(n, m, date)
    }

    /// The field at `location` and `date`, see [`MagneticField::new`].
    pub fn evaluate(&self, location: &Location, date: impl Into<DecimalYear>) -> MagneticField {
        MagneticField::new(self, location, date)
    }

    pub fn legendre(&self) -> &LegendreTable {
        &self.legendre
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const OTHER_COF: &str = "2020.0 WMM-2020 12/10/2019\n 1 0 -29404.5 0.0 6.7 0.0\n";

    #[test]
    fn test_load_replaces_whole_set() {
        let model = MagneticModel::wmm2015().unwrap();
        let before = model.snapshot();
        assert_eq!(before.name(), "WMM-2015");

        model.load(OTHER_COF, "other").unwrap();
        let after = model.snapshot();
        assert_eq!(after.name(), "WMM-2020");
        // terms missing from the new file are zero, not left over from the old one
        let (c, _) = model.coefficients(1, 1, after.epoch()).unwrap();
        assert_eq!(c, CoefficientSample::default());

        // an old snapshot is unaffected
        assert_eq!(before.name(), "WMM-2015");
    }

    #[test]
    fn test_failed_load_keeps_active_set() {
        let model = MagneticModel::wmm2015().unwrap();
        assert!(model.load("2020.0 WMM 12/10/2019\n 1 0 x 0 0 0\n", "broken").is_err());
        assert_eq!(model.snapshot().name(), "WMM-2015");
    }

    #[test]
    fn test_concurrent_reads_during_reload() {
        let model = Arc::new(MagneticModel::wmm2015().unwrap());
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let model = model.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let set = model.snapshot();
                        let (c, _) = set.coefficients(1, 0, set.epoch()).unwrap();
                        assert!(c.g == -29438.5 || c.g == -29404.5);
                    }
                })
            })
            .collect();
        for _ in 0..50 {
            model.load(OTHER_COF, "other").unwrap();
            model.replace(CoefficientSet::wmm2015().unwrap());
        }
        for r in readers {
            r.join().unwrap();
        }
    }

    #[test]
    fn test_from_config() {
        let model = MagneticModel::from_config(&ModelConfig::default()).unwrap();
        assert_eq!(model.snapshot().name(), "WMM-2015");

        let config = ModelConfig { validity_years: 7.5, ..Default::default() };
        let model = MagneticModel::from_config(&config).unwrap();
        assert_eq!(model.snapshot().valid_until(), DecimalYear::new(2022.5));
    }

    #[test]
    fn test_reload_keeps_configured_validity() {
        let config = ModelConfig { validity_years: 10.0, ..Default::default() };
        let model = MagneticModel::from_config(&config).unwrap();
        assert_eq!(model.snapshot().valid_until(), DecimalYear::new(2025.0));

        model.load(crate::coefficients::WMM2015_COF, "wmm2015").unwrap();
        assert_eq!(model.snapshot().valid_until(), DecimalYear::new(2025.0));
        let (_, warning) = model.coefficients(1, 0, DecimalYear::new(2022.0)).unwrap();
        assert!(warning.is_none());

        model.load(OTHER_COF, "other").unwrap();
        assert_eq!(model.snapshot().valid_until(), DecimalYear::new(2030.0));

        // an explicitly built set keeps its own window
        model.replace(CoefficientSet::wmm2015().unwrap());
        assert_eq!(model.snapshot().valid_until(), DecimalYear::new(2020.0));
    }
}
