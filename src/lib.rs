//! # candlesim - candlestick signals and a position simulator
//!
//! Classifies OHLCV bars into a fixed catalogue of candlestick patterns, sums
//! them into a composite directional vote, and folds a per-bar direction into
//! an equity curve.
//!
//! ## Quick Start
//!
//! ```rust
//! use candlesim::prelude::*;
//!
//! let bars = vec![
//!     Bar::new(1, 100.0, 103.0, 98.0, 102.0, 1500.0),
//!     Bar::new(2, 102.0, 105.0, 101.0, 104.0, 1600.0),
//!     Bar::new(3, 104.0, 106.0, 102.0, 103.0, 1700.0),
//! ];
//!
//! let engine = EngineBuilder::new().build().unwrap();
//! let signals = engine.scan(&bars).unwrap();
//! assert_eq!(signals[2].composite, -1); // shooting star
//!
//! let composite: Vec<i32> = signals.iter().map(|s| s.composite).collect();
//! let report = PositionSimulator::new(SimulatorParams::default())
//!     .run_composite(&bars, &composite)
//!     .unwrap();
//! assert_eq!(report.equity.len(), bars.len());
//! ```

pub mod detectors;
pub mod merge;
pub mod params;
pub mod simulator;
pub mod stream;

pub mod prelude {
    pub use crate::{
        // Aggregation
        aggregate,
        // Detectors
        detectors::*,
        // Merging
        merge::{ma_crossover, merge_series, MergePolicy},
        // Parameters
        params::{get_capital, get_ratio, ParamMeta, ParamType, SimulatorParams},
        // Parallel
        scan_parallel,
        // Simulation
        simulator::{
            sweep, EquityPoint, Position, PositionSimulator, SimulationReport, SimulationState,
            Step, Trade, Transition,
        },
        // Streaming
        stream::{PipelineStep, SignalPipeline, StreamingDetector},
        validate_bars,
        // Types
        Bar,
        BarRecord,
        BarSignals,
        Direction,
        EngineBuilder,
        EngineConfig,
        // Errors
        InputError,
        OHLCVExt,
        Pattern,
        PatternEngine,
        PatternSignal,
        Period,
        PATTERN_COUNT,
        Polarity,
        Ratio,
        Result,
        ScanError,
        ScanResult,
        SignalIterator,
        Window,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, InputError>;

/// Errors raised on malformed input or configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Bar {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("Bar {index}: timestamp {timestamp} does not follow {previous}")]
    UnorderedTimestamp {
        index: usize,
        previous: i64,
        timestamp: i64,
    },

    #[error("Signal length {got} does not match bar count {expected}")]
    LengthMismatch { expected: usize, got: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(InputError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(InputError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(InputError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    /// Absolute body size `|close - open|`
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn body_top(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn body_bottom(&self) -> f64 {
        self.open().min(self.close())
    }

    /// Midpoint of the real body
    #[inline]
    fn body_mid(&self) -> f64 {
        (self.open() + self.close()) / 2.0
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// True when open, high, low and close are all finite.
    /// Volume is not inspected; no pattern reads it.
    #[inline]
    fn is_finite(&self) -> bool {
        self.open().is_finite()
            && self.high().is_finite()
            && self.low().is_finite()
            && self.close().is_finite()
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Concrete bar with a unix timestamp
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

/// Bar as delivered by a data feed, before required fields are checked
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BarRecord {
    pub timestamp: i64,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl BarRecord {
    /// Convert into a [`Bar`]. `index` is only used for error reporting.
    pub fn into_bar(self, index: usize) -> Result<Bar> {
        let require = |value: Option<f64>, field: &'static str| {
            value.ok_or(InputError::MissingField { index, field })
        };

        Ok(Bar {
            timestamp: self.timestamp,
            open: require(self.open, "open")?,
            high: require(self.high, "high")?,
            low: require(self.low, "low")?,
            close: require(self.close, "close")?,
            volume: self.volume.unwrap_or(0.0),
        })
    }

    /// Convert a whole feed. A single malformed record rejects the sequence.
    pub fn into_bars(records: impl IntoIterator<Item = BarRecord>) -> Result<Vec<Bar>> {
        let bars = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| record.into_bar(i))
            .collect::<Result<Vec<_>>>()?;
        validate_bars(&bars)?;
        Ok(bars)
    }
}

/// Check that timestamps, where present, are strictly increasing.
///
/// Non-finite prices are not an error: the affected patterns are simply absent.
pub fn validate_bars<T: OHLCV>(bars: &[T]) -> Result<()> {
    let mut previous: Option<i64> = None;
    for (index, bar) in bars.iter().enumerate() {
        if let Some(timestamp) = bar.timestamp() {
            if let Some(previous) = previous {
                if timestamp <= previous {
                    return Err(InputError::UnorderedTimestamp {
                        index,
                        previous,
                        timestamp,
                    });
                }
            }
            previous = Some(timestamp);
        }
    }
    Ok(())
}

// ============================================================
// POLARITY & DIRECTION
// ============================================================

/// Outcome of one pattern at one bar
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Polarity {
    Bullish,
    Bearish,
    #[default]
    Absent,
}

impl Polarity {
    #[inline]
    pub fn bullish_if(matched: bool) -> Self {
        if matched {
            Polarity::Bullish
        } else {
            Polarity::Absent
        }
    }

    #[inline]
    pub fn bearish_if(matched: bool) -> Self {
        if matched {
            Polarity::Bearish
        } else {
            Polarity::Absent
        }
    }

    /// Signed indicator: +1, -1 or 0
    #[inline]
    pub fn value(self) -> i32 {
        match self {
            Polarity::Bullish => 1,
            Polarity::Bearish => -1,
            Polarity::Absent => 0,
        }
    }

    #[inline]
    pub fn is_present(self) -> bool {
        !matches!(self, Polarity::Absent)
    }
}

/// Per-bar trading direction fed to the simulator
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Direction {
    Bullish,
    #[default]
    Neutral,
    Bearish,
}

impl Direction {
    /// Direction of a composite vote (or any signed integer) by its sign
    #[inline]
    pub fn from_composite(value: i32) -> Self {
        match value.signum() {
            1 => Direction::Bullish,
            -1 => Direction::Bearish,
            _ => Direction::Neutral,
        }
    }

    #[inline]
    pub fn value(self) -> i32 {
        match self {
            Direction::Bullish => 1,
            Direction::Neutral => 0,
            Direction::Bearish => -1,
        }
    }

    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    #[inline]
    pub fn is_neutral(self) -> bool {
        matches!(self, Direction::Neutral)
    }
}

// ============================================================
// WINDOW - current bar plus up to two predecessors
// ============================================================

/// Causal view of one bar and the bars before it.
///
/// A predecessor with a non-finite price truncates the lookback at that point.
#[derive(Debug)]
pub struct Window<'a, T> {
    current: &'a T,
    prev: Option<&'a T>,
    prev2: Option<&'a T>,
}

impl<T> Clone for Window<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Window<'_, T> {}

impl<'a, T: OHLCV> Window<'a, T> {
    pub fn new(current: &'a T, prev: Option<&'a T>, prev2: Option<&'a T>) -> Self {
        let prev = prev.filter(|b| b.is_finite());
        let prev2 = prev.and(prev2).filter(|b| b.is_finite());
        Self {
            current,
            prev,
            prev2,
        }
    }

    /// Window ending at `index`; `None` when the index is out of bounds
    pub fn at(bars: &'a [T], index: usize) -> Option<Self> {
        let current = bars.get(index)?;
        let prev = index.checked_sub(1).and_then(|i| bars.get(i));
        let prev2 = index.checked_sub(2).and_then(|i| bars.get(i));
        Some(Self::new(current, prev, prev2))
    }

    #[inline]
    pub fn current(&self) -> &'a T {
        self.current
    }

    /// Bar one step back
    #[inline]
    pub fn prev(&self) -> Option<&'a T> {
        self.prev
    }

    /// Bar two steps back
    #[inline]
    pub fn prev2(&self) -> Option<&'a T> {
        self.prev2
    }

    /// Number of usable predecessors (0..=2)
    #[inline]
    pub fn depth(&self) -> usize {
        match (self.prev, self.prev2) {
            (Some(_), Some(_)) => 2,
            (Some(_), None) => 1,
            _ => 0,
        }
    }
}

// ============================================================
// PATTERN CATALOGUE - generated via macro
// ============================================================

use detectors::{single_bar, three_bar, two_bar};

/// Number of patterns in the catalogue
pub const PATTERN_COUNT: usize = 22;

/// Macro to generate the Pattern enum and its dispatch table
macro_rules! define_patterns {
    (
        $(
            $variant:ident => $name:literal, lookback $lookback:literal, $detect:path;
        )*
    ) => {
        /// Every named pattern, in output column order
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Pattern {
            $($variant),*
        }

        impl Pattern {
            pub const ALL: [Pattern; PATTERN_COUNT] = [$(Pattern::$variant),*];

            /// Column name of the pattern
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),*
                }
            }

            /// Preceding bars the rule needs
            pub fn lookback(self) -> usize {
                match self {
                    $(Self::$variant => $lookback),*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Evaluate the rule on `window`.
            ///
            /// Absent when the current bar has a non-finite price or the window is
            /// shallower than the lookback.
            #[inline]
            pub fn evaluate<T: OHLCV>(self, window: &Window<'_, T>) -> Polarity {
                if !window.current().is_finite() || window.depth() < self.lookback() {
                    return Polarity::Absent;
                }
                match self {
                    $(Self::$variant => $detect(window)),*
                }
            }
        }
    };
}

define_patterns! {
    // Single bar (10)
    Hammer => "hammer", lookback 0, single_bar::hammer;
    InvertedHammer => "inverted_hammer", lookback 0, single_bar::inverted_hammer;
    HangingMan => "hanging_man", lookback 0, single_bar::hanging_man;
    ShootingStar => "shooting_star", lookback 0, single_bar::shooting_star;
    Doji => "doji", lookback 0, single_bar::doji;
    DragonflyDoji => "dragonfly_doji", lookback 0, single_bar::dragonfly_doji;
    GravestoneDoji => "gravestone_doji", lookback 0, single_bar::gravestone_doji;
    SpinningTop => "spinning_top", lookback 0, single_bar::spinning_top;
    MarubozuBull => "marubozu_bull", lookback 0, single_bar::marubozu_bull;
    MarubozuBear => "marubozu_bear", lookback 0, single_bar::marubozu_bear;

    // Two bar (6)
    BullEngulf => "bull_engulf", lookback 1, two_bar::bull_engulf;
    BearEngulf => "bear_engulf", lookback 1, two_bar::bear_engulf;
    Piercing => "piercing", lookback 1, two_bar::piercing;
    DarkCloud => "dark_cloud", lookback 1, two_bar::dark_cloud;
    TweezerBottom => "tweezer_bottom", lookback 1, two_bar::tweezer_bottom;
    TweezerTop => "tweezer_top", lookback 1, two_bar::tweezer_top;

    // Three bar (6)
    MorningStar => "morning_star", lookback 2, three_bar::morning_star;
    EveningStar => "evening_star", lookback 2, three_bar::evening_star;
    ThreeWhiteSoldiers => "three_white_soldiers", lookback 2, three_bar::three_white_soldiers;
    ThreeBlackCrows => "three_black_crows", lookback 2, three_bar::three_black_crows;
    ThreeInsideUp => "three_inside_up", lookback 2, three_bar::three_inside_up;
    ThreeInsideDown => "three_inside_down", lookback 2, three_bar::three_inside_down;
}

impl Pattern {
    /// Doji and spinning top signal indecision but still vote +1
    pub fn is_neutral(self) -> bool {
        matches!(self, Pattern::Doji | Pattern::SpinningTop)
    }

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================
// PATTERN SIGNAL & AGGREGATION
// ============================================================

/// Polarity of every catalogue pattern at one bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternSignal([Polarity; PATTERN_COUNT]);

impl PatternSignal {
    /// Evaluate the whole catalogue on a window
    pub fn detect<T: OHLCV>(window: &Window<'_, T>) -> Self {
        let mut signal = Self::default();
        for pattern in Pattern::ALL {
            signal.0[pattern.slot()] = pattern.evaluate(window);
        }
        signal
    }

    #[inline]
    pub fn get(&self, pattern: Pattern) -> Polarity {
        self.0[pattern.slot()]
    }

    #[inline]
    pub fn value(&self, pattern: Pattern) -> i32 {
        self.get(pattern).value()
    }

    pub fn set(&mut self, pattern: Pattern, polarity: Polarity) {
        self.0[pattern.slot()] = polarity;
    }

    /// All patterns in catalogue order
    pub fn iter(&self) -> impl Iterator<Item = (Pattern, Polarity)> + '_ {
        Pattern::ALL.into_iter().map(move |p| (p, self.get(p)))
    }

    /// Only the patterns that fired
    pub fn matched(&self) -> impl Iterator<Item = (Pattern, Polarity)> + '_ {
        self.iter().filter(|(_, polarity)| polarity.is_present())
    }

    #[inline]
    pub fn composite(&self) -> i32 {
        aggregate(self)
    }
}

impl serde::Serialize for PatternSignal {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = s.serialize_map(Some(PATTERN_COUNT))?;
        for (pattern, polarity) in self.iter() {
            map.serialize_entry(pattern.name(), &polarity.value())?;
        }
        map.end()
    }
}

/// Unweighted composite vote: the sum of every indicator at one bar
#[inline]
pub fn aggregate(signal: &PatternSignal) -> i32 {
    signal.iter().map(|(_, polarity)| polarity.value()).sum()
}

/// Detection output for one bar
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct BarSignals {
    pub index: usize,
    pub timestamp: Option<i64>,
    pub patterns: PatternSignal,
    pub composite: i32,
}

impl BarSignals {
    #[inline]
    pub fn direction(&self) -> Direction {
        Direction::from_composite(self.composite)
    }
}

// ============================================================
// PATTERN ENGINE
// ============================================================

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub validate_data: bool,
    pub pattern_filter: Option<Vec<Pattern>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validate_data: true,
            pattern_filter: None,
        }
    }
}

/// Batch driver over a bar slice
#[derive(Debug, Clone, Default)]
pub struct PatternEngine {
    config: EngineConfig,
}

impl PatternEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Detect patterns at a single bar index.
    /// Out-of-bounds indices yield an all-absent signal.
    pub fn scan_at<T: OHLCV>(&self, bars: &[T], index: usize) -> PatternSignal {
        match Window::at(bars, index) {
            Some(window) => self.detect_window(&window),
            None => PatternSignal::default(),
        }
    }

    /// Detect and aggregate one window
    pub fn detect_window<T: OHLCV>(&self, window: &Window<'_, T>) -> PatternSignal {
        let mut signal = PatternSignal::detect(window);
        if let Some(ref filter) = self.config.pattern_filter {
            for pattern in Pattern::ALL {
                if !filter.contains(&pattern) {
                    signal.set(pattern, Polarity::Absent);
                }
            }
        }
        signal
    }

    /// Scan all bars in order.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<BarSignals>> {
        self.check(bars)?;
        tracing::debug!(bars = bars.len(), "scanning bars");

        Ok((0..bars.len()).map(|i| self.bar_signals(bars, i)).collect())
    }

    /// Scan all bars on the rayon pool. Output is identical to [`Self::scan`].
    pub fn scan_par<T: OHLCV + Sync>(&self, bars: &[T]) -> Result<Vec<BarSignals>> {
        self.check(bars)?;
        tracing::debug!(bars = bars.len(), "scanning bars in parallel");

        Ok((0..bars.len())
            .into_par_iter()
            .map(|i| self.bar_signals(bars, i))
            .collect())
    }

    /// Composite vote for every bar
    pub fn composite<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<i32>> {
        Ok(self.scan(bars)?.into_iter().map(|s| s.composite).collect())
    }

    /// Create an iterator over bars with their signals.
    pub fn iter<'a, T: OHLCV>(&'a self, bars: &'a [T]) -> SignalIterator<'a, T> {
        SignalIterator {
            engine: self,
            bars,
            current: 0,
        }
    }

    fn bar_signals<T: OHLCV>(&self, bars: &[T], index: usize) -> BarSignals {
        let patterns = self.scan_at(bars, index);
        BarSignals {
            index,
            timestamp: bars.get(index).and_then(|b| b.timestamp()),
            patterns,
            composite: aggregate(&patterns),
        }
    }

    fn check<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        if self.config.validate_data {
            validate_bars(bars)
                .inspect_err(|e| tracing::warn!(error = %e, "rejected bar sequence"))?;
        }
        Ok(())
    }
}

// ============================================================
// SIGNAL ITERATOR
// ============================================================

/// Iterator over bars with their signals. Does not validate timestamps.
pub struct SignalIterator<'a, T: OHLCV> {
    engine: &'a PatternEngine,
    bars: &'a [T],
    current: usize,
}

impl<'a, T: OHLCV> Iterator for SignalIterator<'a, T> {
    type Item = BarSignals;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.bars.len() {
            return None;
        }

        let signals = self.engine.bar_signals(self.bars, self.current);
        self.current += 1;

        Some(signals)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bars.len().saturating_sub(self.current);
        (remaining, Some(remaining))
    }
}

impl<'a, T: OHLCV> ExactSizeIterator for SignalIterator<'a, T> {}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternEngine instances
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable timestamp validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Report only these patterns; the rest are forced to absent
    pub fn only_patterns(mut self, patterns: impl IntoIterator<Item = Pattern>) -> Self {
        self.config.pattern_filter = Some(patterns.into_iter().collect());
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<PatternEngine> {
        if let Some(ref filter) = self.config.pattern_filter {
            if filter.is_empty() {
                return Err(InputError::InvalidConfig(
                    "pattern filter must name at least one pattern".into(),
                ));
            }
        }
        Ok(PatternEngine::new(self.config))
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub signals: Vec<BarSignals>,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: InputError,
}

/// Parallel scanning of multiple instruments
pub fn scan_parallel<'a, T, I>(
    engine: &PatternEngine,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .scan(bars)
                .map(|signals| ScanResult {
                    symbol: symbol.to_string(),
                    signals,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(ts, o, h, l, c, 1000.0)
    }

    fn golden_bars() -> Vec<Bar> {
        [
            (100.0, 103.0, 98.0, 102.0),
            (102.0, 105.0, 101.0, 104.0),
            (104.0, 106.0, 102.0, 103.0),
            (103.0, 106.0, 101.0, 105.0),
            (105.0, 108.0, 104.0, 107.0),
            (108.0, 112.0, 107.0, 111.0),
            (110.0, 113.0, 109.0, 112.0),
        ]
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| bar(i as i64, o, h, l, c))
        .collect()
    }

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(0.01).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
        assert!(Ratio::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let b = bar(0, 100.0, 110.0, 90.0, 105.0);
        assert_eq!(b.body(), 5.0);
        assert_eq!(b.range(), 20.0);
        assert_eq!(b.body_top(), 105.0);
        assert_eq!(b.body_bottom(), 100.0);
        assert_eq!(b.body_mid(), 102.5);
        assert!(b.is_bullish());
        assert!(!b.is_bearish());
        assert!(b.is_finite());
        assert!(!bar(0, f64::NAN, 1.0, 1.0, 1.0).is_finite());
    }

    #[test]
    fn test_polarity_values() {
        assert_eq!(Polarity::Bullish.value(), 1);
        assert_eq!(Polarity::Bearish.value(), -1);
        assert_eq!(Polarity::Absent.value(), 0);
        assert_eq!(Polarity::bullish_if(false), Polarity::Absent);
        assert_eq!(Polarity::bearish_if(true), Polarity::Bearish);
    }

    #[test]
    fn test_direction_from_composite() {
        assert_eq!(Direction::from_composite(3), Direction::Bullish);
        assert_eq!(Direction::from_composite(-2), Direction::Bearish);
        assert_eq!(Direction::from_composite(0), Direction::Neutral);
    }

    #[test]
    fn test_pattern_catalogue() {
        assert_eq!(Pattern::ALL.len(), PATTERN_COUNT);
        for (slot, pattern) in Pattern::ALL.iter().enumerate() {
            assert_eq!(pattern.slot(), slot);
            assert_eq!(Pattern::from_name(pattern.name()), Some(*pattern));
        }
        assert_eq!(Pattern::from_name("harami"), None);
        assert_eq!(Pattern::ThreeInsideUp.lookback(), 2);
        assert_eq!(Pattern::TweezerTop.lookback(), 1);
        assert_eq!(Pattern::Doji.lookback(), 0);
    }

    #[test]
    fn test_window_depth() {
        let bars = golden_bars();
        assert_eq!(Window::at(&bars, 0).unwrap().depth(), 0);
        assert_eq!(Window::at(&bars, 1).unwrap().depth(), 1);
        assert_eq!(Window::at(&bars, 5).unwrap().depth(), 2);
        assert!(Window::at(&bars, 7).is_none());
    }

    #[test]
    fn test_window_truncates_at_non_finite() {
        let bars = vec![
            bar(0, 100.0, 101.0, 99.0, 100.5),
            bar(1, f64::NAN, 101.0, 99.0, 100.5),
            bar(2, 100.0, 101.0, 99.0, 100.5),
        ];
        assert_eq!(Window::at(&bars, 2).unwrap().depth(), 0);

        let bars = vec![
            bar(0, f64::INFINITY, 101.0, 99.0, 100.5),
            bar(1, 100.0, 101.0, 99.0, 100.5),
            bar(2, 100.0, 101.0, 99.0, 100.5),
        ];
        assert_eq!(Window::at(&bars, 2).unwrap().depth(), 1);
    }

    #[test]
    fn test_golden_composite() {
        let engine = EngineBuilder::new().build().unwrap();
        let composite = engine.composite(&golden_bars()).unwrap();
        assert_eq!(composite, vec![0, 0, -1, 0, 0, 1, 1]);
    }

    #[test]
    fn test_scan_par_matches_scan() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars = golden_bars();
        assert_eq!(engine.scan(&bars).unwrap(), engine.scan_par(&bars).unwrap());
    }

    #[test]
    fn test_empty_scan() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars: Vec<Bar> = vec![];
        assert!(engine.scan(&bars).unwrap().is_empty());
    }

    #[test]
    fn test_unordered_timestamps_rejected() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars = vec![bar(5, 1.0, 1.0, 1.0, 1.0), bar(5, 1.0, 1.0, 1.0, 1.0)];
        assert_eq!(
            engine.scan(&bars),
            Err(InputError::UnorderedTimestamp {
                index: 1,
                previous: 5,
                timestamp: 5
            })
        );

        let lenient = EngineBuilder::new().validate_data(false).build().unwrap();
        assert_eq!(lenient.scan(&bars).unwrap().len(), 2);
    }

    #[test]
    fn test_pattern_filter() {
        let engine = EngineBuilder::new()
            .only_patterns([Pattern::ThreeWhiteSoldiers])
            .build()
            .unwrap();
        let composite = engine.composite(&golden_bars()).unwrap();
        assert_eq!(composite, vec![0, 0, 0, 0, 0, 1, 1]);

        assert!(EngineBuilder::new().only_patterns([]).build().is_err());
    }

    #[test]
    fn test_iterator_exact_size() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars = golden_bars();
        let iter = engine.iter(&bars);
        assert_eq!(iter.len(), 7);
        let collected: Vec<_> = iter.collect();
        assert_eq!(collected, engine.scan(&bars).unwrap());
    }

    #[test]
    fn test_scan_at_out_of_bounds() {
        let engine = PatternEngine::default();
        let bars = golden_bars();
        assert_eq!(engine.scan_at(&bars, 99), PatternSignal::default());
    }

    #[test]
    fn test_record_missing_field() {
        let records = vec![
            BarRecord {
                timestamp: 1,
                open: Some(1.0),
                high: Some(1.0),
                low: Some(1.0),
                close: Some(1.0),
                volume: None,
            },
            BarRecord {
                timestamp: 2,
                open: Some(1.0),
                high: None,
                low: Some(1.0),
                close: Some(1.0),
                volume: Some(10.0),
            },
        ];
        assert_eq!(
            BarRecord::into_bars(records),
            Err(InputError::MissingField {
                index: 1,
                field: "high"
            })
        );
    }

    #[test]
    fn test_parallel_scan() {
        let engine = EngineBuilder::new().build().unwrap();
        let good = golden_bars();
        let bad = vec![bar(2, 1.0, 1.0, 1.0, 1.0), bar(1, 1.0, 1.0, 1.0, 1.0)];

        let instruments: Vec<(&str, &[Bar])> = vec![("AAPL", &good), ("BAD", &bad)];
        let (results, errors) = scan_parallel(&engine, instruments);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol, "AAPL");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "BAD");
    }
}
