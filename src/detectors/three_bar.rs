//! Three-bar candlestick rules
//!
//! Morning Star, Evening Star, Three White Soldiers, Three Black Crows,
//! Three Inside Up and Three Inside Down.
//!
//! `first` is the bar two steps back, `middle` the bar one step back.

use super::helpers::{is_near, ohlc};
use crate::{OHLCVExt, Polarity, Window, OHLCV};

#[inline]
fn triple<'a, T: OHLCV>(w: &Window<'a, T>) -> Option<(&'a T, &'a T, &'a T)> {
    Some((w.prev2()?, w.prev()?, w.current()))
}

/// Middle body within 0.2% of its own close
#[inline]
fn is_star<T: OHLCV>(middle: &T) -> bool {
    is_near(middle.close(), middle.open(), middle.close())
}

// ============================================================
// STARS
// ============================================================

/// Bearish first bar, small middle body, close above the first body's midpoint
#[inline]
pub fn morning_star<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some((first, middle, last)) = triple(w) else {
        return Polarity::Absent;
    };

    Polarity::bullish_if(
        first.is_bearish() && is_star(middle) && last.close() > first.body_mid(),
    )
}

/// Bullish first bar, small middle body, close below the first body's midpoint
#[inline]
pub fn evening_star<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some((first, middle, last)) = triple(w) else {
        return Polarity::Absent;
    };

    Polarity::bearish_if(
        first.is_bullish() && is_star(middle) && last.close() < first.body_mid(),
    )
}

// ============================================================
// SOLDIERS / CROWS
// ============================================================

/// Three bullish candles with strictly rising closes
#[inline]
pub fn three_white_soldiers<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some((first, middle, last)) = triple(w) else {
        return Polarity::Absent;
    };

    Polarity::bullish_if(
        last.is_bullish()
            && middle.is_bullish()
            && first.is_bullish()
            && last.close() > middle.close()
            && middle.close() > first.close(),
    )
}

/// Three bearish candles with strictly falling closes
#[inline]
pub fn three_black_crows<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some((first, middle, last)) = triple(w) else {
        return Polarity::Absent;
    };

    Polarity::bearish_if(
        last.is_bearish()
            && middle.is_bearish()
            && first.is_bearish()
            && last.close() < middle.close()
            && middle.close() < first.close(),
    )
}

// ============================================================
// THREE INSIDE
// ============================================================

/// Bullish middle bar whose open lies below the first close and whose close
/// lies above the first open, confirmed by a higher close.
#[inline]
pub fn three_inside_up<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some((first, middle, last)) = triple(w) else {
        return Polarity::Absent;
    };
    let (o2, _, _, c2) = ohlc(first);
    let (o1, _, _, c1) = ohlc(middle);

    Polarity::bullish_if(c1 > o1 && o1 < c2 && c1 > o2 && last.close() > c1)
}

/// Mirror of [`three_inside_up`]
#[inline]
pub fn three_inside_down<T: OHLCV>(w: &Window<'_, T>) -> Polarity {
    let Some((first, middle, last)) = triple(w) else {
        return Polarity::Absent;
    };
    let (o2, _, _, c2) = ohlc(first);
    let (o1, _, _, c1) = ohlc(middle);

    Polarity::bearish_if(c1 < o1 && o1 > c2 && c1 < o2 && last.close() < c1)
}
