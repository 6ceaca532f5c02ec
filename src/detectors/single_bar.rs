//! Single-bar candlestick rules
//!
//! Hammer, Inverted Hammer, Hanging Man, Shooting Star, Doji, Dragonfly Doji,
//! Gravestone Doji, Spinning Top, Marubozu (bullish and bearish).

use super::helpers::{
    is_doji_body, ohlc, range_share, DOJI_BODY_FRACTION, SHADOW_FACTOR, SPINNING_EDGE_RATIO,
    SPINNING_RANGE_FACTOR,
};
use crate::{OHLCVExt, Polarity, Window, OHLCV};

// ============================================================
// HAMMER FAMILY
// ============================================================

/// Bullish candle with a lower shadow at least twice the body and a short top
#[inline]
pub fn hammer<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let bar = w.current();
    let (o, h, l, c) = ohlc(bar);
    let body = bar.body();

    Polarity::bullish_if(c > o && (o - l) >= SHADOW_FACTOR * body && (h - c) <= body)
}

/// Bullish candle with an upper shadow at least twice the body and a short bottom
#[inline]
pub fn inverted_hammer<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let bar = w.current();
    let (o, h, l, c) = ohlc(bar);
    let body = bar.body();

    Polarity::bullish_if(c > o && (h - c) >= SHADOW_FACTOR * body && (o - l) <= body)
}

/// Bearish twin of the hammer
#[inline]
pub fn hanging_man<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let bar = w.current();
    let (o, h, l, c) = ohlc(bar);
    let body = bar.body();

    Polarity::bearish_if(o > c && (o - l) >= SHADOW_FACTOR * body && (h - o) <= body)
}

/// Bearish twin of the inverted hammer
#[inline]
pub fn shooting_star<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let bar = w.current();
    let (o, h, l, c) = ohlc(bar);
    let body = bar.body();

    Polarity::bearish_if(o > c && (h - o) >= SHADOW_FACTOR * body && (c - l) <= body)
}

// ============================================================
// DOJI FAMILY
// ============================================================

/// Body within 0.1% of the close. Direction-neutral, votes bullish.
#[inline]
pub fn doji<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let bar = w.current();
    Polarity::bullish_if(is_doji_body(bar.open(), bar.close()))
}

/// Doji with no upper shadow and a long lower one
#[inline]
pub fn dragonfly_doji<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let bar = w.current();
    let (o, h, l, c) = ohlc(bar);
    let tolerance = DOJI_BODY_FRACTION * c;

    Polarity::bullish_if(
        is_doji_body(o, c)
            && (h - bar.body_top()) <= tolerance
            && (bar.body_bottom() - l) >= SHADOW_FACTOR * bar.body(),
    )
}

/// Doji with no lower shadow and a long upper one.
///
/// The lower-shadow test measures from the top of the body, not the bottom.
#[inline]
pub fn gravestone_doji<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let bar = w.current();
    let (o, h, l, c) = ohlc(bar);
    let tolerance = DOJI_BODY_FRACTION * c;

    Polarity::bearish_if(
        is_doji_body(o, c)
            && (bar.body_top() - l) <= tolerance
            && (h - bar.body_top()) >= SHADOW_FACTOR * bar.body(),
    )
}

// ============================================================
// SPINNING TOP & MARUBOZU
// ============================================================

/// Small body with the close away from both extremes. Direction-neutral, votes bullish.
#[inline]
pub fn spinning_top<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let bar = w.current();
    let (_, h, l, c) = ohlc(bar);

    Polarity::bullish_if(
        bar.range() > SPINNING_RANGE_FACTOR * bar.body()
            && range_share(bar, c - l) > SPINNING_EDGE_RATIO
            && range_share(bar, h - c) > SPINNING_EDGE_RATIO,
    )
}

/// Bullish candle without shadows: opens on the low, closes on the high
#[inline]
pub fn marubozu_bull<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let (o, h, l, c) = ohlc(w.current());
    Polarity::bullish_if(c > o && h == c && l == o)
}

/// Bearish candle without shadows: opens on the high, closes on the low
#[inline]
pub fn marubozu_bear<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let (o, h, l, c) = ohlc(w.current());
    Polarity::bearish_if(o > c && h == o && l == c)
}
