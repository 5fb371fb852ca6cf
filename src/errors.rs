use std::fmt;
use thiserror::Error;

use crate::utils::DecimalYear;

pub type Result<T> = std::result::Result<T, WmmError>;

#[derive(Error, Debug)]
pub enum WmmError {
    /// a coordinate or harmonic index outside of what the model or grid supports
    #[error("{what} = {value} is out of range, must be within {valid}")]
    Range {
        what: &'static str,
        value: String,
        valid: String,
    },

    /// a malformed field in a coefficient or grid dataset
    #[error("{source_name}:{line}: cannot parse {field} from '{text}'")]
    Parse {
        source_name: String,
        line: usize,
        field: &'static str,
        text: String,
    },

    #[error("cannot parse coordinate '{0}'")]
    Coordinate(String),

    #[error("cannot parse date '{0}', expected a decimal year or YYYY-MM-DD")]
    Date(String),

    #[error("could not read header line in {0}")]
    MissingHeader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON config error: {0}")]
    Config(#[from] ron::de::SpannedError),
}

pub fn range_error(
    what: &'static str,
    value: impl fmt::Display,
    valid: impl fmt::Display,
) -> WmmError {
    WmmError::Range {
        what,
        value: value.to_string(),
        valid: valid.to_string(),
    }
}

pub fn parse_error(source_name: &str, line: usize, field: &'static str, text: &str) -> WmmError {
    WmmError::Parse {
        source_name: source_name.to_string(),
        line,
        field,
        text: text.to_string(),
    }
}

/// Non-fatal notice that a date lies outside the documented validity window
/// of the loaded coefficients. Results computed for such a date are still
/// returned, linearly extrapolated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidityWarning {
    pub requested: DecimalYear,
    pub valid_from: DecimalYear,
    pub valid_until: DecimalYear,
}

impl fmt::Display for ValidityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requested date {:.4} is outside of validity period {:.4} - {:.4}",
            self.requested.value(),
            self.valid_from.value(),
            self.valid_until.value()
        )
    }
}
