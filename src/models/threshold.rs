use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    DEFAULT_MAX_GAP, DEFAULT_MAX_MISSING_FRACTION, DEFAULT_OUTLIER_STD_MULTIPLIER,
};

/// How short gaps are filled. Both variants fill interior gaps only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InterpolationMethod {
    /// Degree-2 polynomial through the nearest known neighbours
    Polynomial2,
    Linear,
}

impl InterpolationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpolationMethod::Polynomial2 => "polynomial",
            InterpolationMethod::Linear => "linear",
        }
    }

    /// Highest polynomial degree the method fits through known points.
    pub fn degree(&self) -> usize {
        match self {
            InterpolationMethod::Polynomial2 => 2,
            InterpolationMethod::Linear => 1,
        }
    }
}

impl FromStr for InterpolationMethod {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "polynomial" | "polynomial2" | "polynomial-2" | "quadratic" => {
                Ok(InterpolationMethod::Polynomial2)
            }
            "linear" => Ok(InterpolationMethod::Linear),
            other => Err(ProcessingError::Config(format!(
                "Unsupported interpolation method: '{}' (expected 'polynomial' or 'linear')",
                other
            ))),
        }
    }
}

impl TryFrom<String> for InterpolationMethod {
    type Error = ProcessingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<InterpolationMethod> for String {
    fn from(method: InterpolationMethod) -> Self {
        method.as_str().to_string()
    }
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable cleaning configuration supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CurationThreshold {
    /// Columns missing more than this fraction of readings are dropped
    #[validate(range(min = 0.0, max = 1.0))]
    pub max_missing_fraction: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub outlier_std_multiplier: f64,

    /// Longest run of consecutive missing values that gets interpolated
    #[validate(range(min = 1))]
    pub max_gap: usize,

    pub interpolation_method: InterpolationMethod,
}

impl CurationThreshold {
    pub fn new(
        max_missing_fraction: f64,
        outlier_std_multiplier: f64,
        max_gap: usize,
        interpolation_method: InterpolationMethod,
    ) -> Result<Self> {
        let threshold = Self {
            max_missing_fraction,
            outlier_std_multiplier,
            max_gap,
            interpolation_method,
        };
        threshold.check()?;
        Ok(threshold)
    }

    /// Range checks plus finiteness checks the derive cannot express.
    pub fn check(&self) -> Result<()> {
        for (name, value) in [
            ("max_missing_fraction", self.max_missing_fraction),
            ("outlier_std_multiplier", self.outlier_std_multiplier),
        ] {
            if !value.is_finite() {
                return Err(ProcessingError::Config(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }
        self.validate()?;
        Ok(())
    }
}

impl Default for CurationThreshold {
    fn default() -> Self {
        Self {
            max_missing_fraction: DEFAULT_MAX_MISSING_FRACTION,
            outlier_std_multiplier: DEFAULT_OUTLIER_STD_MULTIPLIER,
            max_gap: DEFAULT_MAX_GAP,
            interpolation_method: InterpolationMethod::Polynomial2,
        }
    }
}

/// The parameter codes a pipeline run accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(Vec<String>);

impl ParameterSet {
    pub fn new(codes: Vec<String>) -> Self {
        Self(codes)
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }

    pub fn validate_code(&self, code: &str) -> Result<()> {
        if self.contains(code) {
            Ok(())
        } else {
            Err(ProcessingError::Config(format!(
                "Unsupported parameter '{}', should be one of {}",
                code,
                self.0.join(", ")
            )))
        }
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self(
            crate::utils::constants::DEFAULT_PARAMETERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}
