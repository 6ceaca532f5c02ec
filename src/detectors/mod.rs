//! Candlestick pattern rules
//!
//! Each rule is a free function over a [`Window`](crate::Window) returning a
//! [`Polarity`](crate::Polarity). Rules assume the caller already checked the
//! lookback and the finiteness of the current bar;
//! [`Pattern::evaluate`](crate::Pattern::evaluate) does both.
//!
//! # Pattern Categories
//!
//! - **Single-bar (10)**: Hammer family, Doji variants, Spinning Top, Marubozu
//! - **Two-bar (6)**: Engulfing, Piercing / Dark Cloud, Tweezers
//! - **Three-bar (6)**: Morning/Evening Star, Soldiers/Crows, Three Inside

pub mod helpers;
pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

pub use helpers::*;
