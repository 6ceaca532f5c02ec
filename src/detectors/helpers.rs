//! Thresholds and comparisons shared across the rule modules.
//!
//! All thresholds are exact constants of the rule set, not tuning knobs.

use crate::OHLCV;

// ============================================================
// THRESHOLDS
// ============================================================

/// Body is doji-like: body <= close * DOJI_BODY_FRACTION
pub const DOJI_BODY_FRACTION: f64 = 0.001;
/// Star body and tweezer tolerance: <= price * NEAR_FRACTION
pub const NEAR_FRACTION: f64 = 0.002;
/// Long shadow: shadow >= body * SHADOW_FACTOR
pub const SHADOW_FACTOR: f64 = 2.0;
/// Spinning top: range > body * SPINNING_RANGE_FACTOR
pub const SPINNING_RANGE_FACTOR: f64 = 3.0;
/// Spinning top: close sits at least this far from both extremes of the range
pub const SPINNING_EDGE_RATIO: f64 = 0.3;
/// Guard added to range denominators
pub const RANGE_EPSILON: f64 = 0.001;

// ============================================================
// HELPER FUNCTIONS
// ============================================================

/// `|close - open| <= close * DOJI_BODY_FRACTION`
#[inline]
pub fn is_doji_body(open: f64, close: f64) -> bool {
    (close - open).abs() <= DOJI_BODY_FRACTION * close
}

/// `|a - b| <= reference * NEAR_FRACTION`
#[inline]
pub fn is_near(a: f64, b: f64, reference: f64) -> bool {
    (a - b).abs() <= NEAR_FRACTION * reference
}

/// `part / (high - low + RANGE_EPSILON)`, guarded against a zero range
#[inline]
pub fn range_share<T: OHLCV>(bar: &T, part: f64) -> f64 {
    part / (bar.high() - bar.low() + RANGE_EPSILON)
}

/// Open/high/low/close of a bar, for destructuring in rules
#[inline]
pub fn ohlc<T: OHLCV>(bar: &T) -> (f64, f64, f64, f64) {
    (bar.open(), bar.high(), bar.low(), bar.close())
}
