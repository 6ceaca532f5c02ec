//! Simulator parameters and their metadata
//!
//! This module provides:
//! - [`SimulatorParams`], the validated configuration of a simulation run
//! - Parameter metadata for documentation and grid search
//! - Helpers to build parameters from a loosely typed `HashMap`
//!
//! # Example
//!
//! ```rust
//! use candlesim::params::{ParamMeta, SimulatorParams};
//!
//! for param in SimulatorParams::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! let params = SimulatorParams::new(25_000.0, 0.02).unwrap();
//! assert_eq!(params.risk_fraction().get(), 0.02);
//! ```

use std::collections::HashMap;

use crate::{InputError, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value (0.0..=1.0)
  Ratio,
  /// Amount of money (finite, > 0)
  Capital,
}

/// Metadata for a single parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "risk_fraction")
  pub name: &'static str,
  /// Parameter type
  pub param_type: ParamType,
  /// Default value
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a Ratio parameter
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  /// Create a new ParamMeta for a Capital parameter
  pub const fn capital(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Capital, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(InputError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Capital => validate_capital(value),
    }
  }
}

// ============================================================
// SIMULATOR PARAMETERS
// ============================================================

/// Default starting capital
pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
/// Default fraction of capital committed per trade (1%)
pub const DEFAULT_RISK_FRACTION: f64 = 0.01;

static SIMULATOR_PARAMS: [ParamMeta; 2] = [
  ParamMeta::capital(
    "initial_capital",
    DEFAULT_INITIAL_CAPITAL,
    (1_000.0, 100_000.0, 1_000.0),
    "Capital at the first bar",
  ),
  ParamMeta::ratio(
    "risk_fraction",
    DEFAULT_RISK_FRACTION,
    (0.005, 0.05, 0.005),
    "Fraction of current capital converted into position size on entry",
  ),
];

/// Configuration of a [`PositionSimulator`](crate::simulator::PositionSimulator) run.
///
/// Fields are private so every value goes through [`SimulatorParams::new`],
/// [`SimulatorParams::with_params`] or validated deserialization.
///
/// ```compile_fail
/// use candlesim::params::SimulatorParams;
///
/// let params = SimulatorParams { initial_capital: -1.0, ..Default::default() };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawSimulatorParams")]
pub struct SimulatorParams {
  initial_capital: f64,
  risk_fraction: Ratio,
}

impl Default for SimulatorParams {
  fn default() -> Self {
    Self {
      initial_capital: DEFAULT_INITIAL_CAPITAL,
      risk_fraction: Ratio::new_const(DEFAULT_RISK_FRACTION),
    }
  }
}

impl SimulatorParams {
  pub fn new(initial_capital: f64, risk_fraction: f64) -> Result<Self> {
    validate_capital(initial_capital)?;
    Ok(Self { initial_capital, risk_fraction: Ratio::new(risk_fraction)? })
  }

  /// Capital at the first bar; always finite and positive
  #[inline]
  pub fn initial_capital(&self) -> f64 {
    self.initial_capital
  }

  /// Fraction of capital sized into each entry
  #[inline]
  pub fn risk_fraction(&self) -> Ratio {
    self.risk_fraction
  }

  /// Returns metadata for all configurable parameters
  pub fn param_meta() -> &'static [ParamMeta] {
    &SIMULATOR_PARAMS
  }

  /// Creates parameters from a HashMap. Missing keys use their defaults.
  pub fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    Ok(Self {
      initial_capital: get_capital(params, "initial_capital", DEFAULT_INITIAL_CAPITAL)?,
      risk_fraction: get_ratio(params, "risk_fraction", DEFAULT_RISK_FRACTION)?,
    })
  }

  /// Cartesian product of the metadata grids
  pub fn grid() -> Vec<Self> {
    let [capital, risk] = &SIMULATOR_PARAMS;
    let risks = risk.generate_grid();
    capital
      .generate_grid()
      .into_iter()
      .flat_map(|c| risks.iter().filter_map(move |&r| Self::new(c, r).ok()))
      .collect()
  }
}

#[derive(serde::Deserialize)]
struct RawSimulatorParams {
  #[serde(default = "default_initial_capital")]
  initial_capital: f64,
  #[serde(default = "default_risk_fraction")]
  risk_fraction: Ratio,
}

fn default_initial_capital() -> f64 {
  DEFAULT_INITIAL_CAPITAL
}

fn default_risk_fraction() -> Ratio {
  Ratio::new_const(DEFAULT_RISK_FRACTION)
}

impl TryFrom<RawSimulatorParams> for SimulatorParams {
  type Error = InputError;

  fn try_from(raw: RawSimulatorParams) -> Result<Self> {
    validate_capital(raw.initial_capital)?;
    Ok(Self { initial_capital: raw.initial_capital, risk_fraction: raw.risk_fraction })
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

fn validate_capital(value: f64) -> Result<()> {
  if !value.is_finite() || value <= 0.0 {
    return Err(InputError::InvalidConfig(format!(
      "initial capital must be finite and positive, got {value}"
    )));
  }
  Ok(())
}

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a capital amount from params with default fallback
pub fn get_capital(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
  let value = params.get(key).copied().unwrap_or(default);
  validate_capital(value)?;
  Ok(value)
}

// ============================================================
// TESTS
// ============================================================
