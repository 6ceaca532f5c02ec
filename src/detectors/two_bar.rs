//! Two-bar candlestick rules
//!
//! Engulfing (bullish and bearish), Piercing, Dark Cloud Cover, Tweezer
//! Bottom and Tweezer Top. Each compares the current bar with the one before.

use super::helpers::{is_near, ohlc};
use crate::{OHLCVExt, Polarity, Window, OHLCV};

// ============================================================
// ENGULFING
// ============================================================

/// Bullish body that opens below the prior bearish close and closes above its open
#[inline]
pub fn bull_engulf<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some(prev) = w.prev() else {
        return Polarity::Absent;
    };
    let (o, _, _, c) = ohlc(w.current());
    let (o1, _, _, c1) = ohlc(prev);

    Polarity::bullish_if(c > o && c1 < o1 && c > o1 && o < c1)
}

/// Bearish body that opens above the prior bullish close and closes below its open
#[inline]
pub fn bear_engulf<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some(prev) = w.prev() else {
        return Polarity::Absent;
    };
    let (o, _, _, c) = ohlc(w.current());
    let (o1, _, _, c1) = ohlc(prev);

    Polarity::bearish_if(c < o && c1 > o1 && c < o1 && o > c1)
}

// ============================================================
// PIERCING / DARK CLOUD COVER
// ============================================================

/// Bullish reversal closing above the midpoint of the prior bearish body
#[inline]
pub fn piercing<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some(prev) = w.prev() else {
        return Polarity::Absent;
    };
    let (o, _, _, c) = ohlc(w.current());

    Polarity::bullish_if(
        c > o && prev.is_bearish() && c > prev.body_mid() && o < prev.close(),
    )
}

/// Bearish reversal closing below the midpoint of the prior bullish body
#[inline]
pub fn dark_cloud<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some(prev) = w.prev() else {
        return Polarity::Absent;
    };
    let (o, _, _, c) = ohlc(w.current());

    Polarity::bearish_if(
        c < o && prev.is_bullish() && c < prev.body_mid() && o > prev.close(),
    )
}

// ============================================================
// TWEEZERS
// ============================================================

/// Bullish reversal whose low matches the prior low within 0.2%
#[inline]
pub fn tweezer_bottom<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some(prev) = w.prev() else {
        return Polarity::Absent;
    };
    let bar = w.current();

    Polarity::bullish_if(
        bar.is_bullish() && prev.is_bearish() && is_near(bar.low(), prev.low(), bar.low()),
    )
}

/// Bearish reversal whose high matches the prior high within 0.2%
#[inline]
pub fn tweezer_top<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some(prev) = w.prev() else {
        return Polarity::Absent;
    };
    let bar = w.current();

    Polarity::bearish_if(
        bar.is_bearish() && prev.is_bullish() && is_near(bar.high(), prev.high(), bar.high()),
    )
}
