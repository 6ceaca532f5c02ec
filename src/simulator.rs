//! Sequential position/equity simulator
//!
//! [`PositionSimulator`] folds a per-bar [`Direction`] and price into a
//! running capital. Each step depends only on the previous
//! [`SimulationState`], the signal and the price at that step.
//!
//! Per step, in this order:
//! 1. Flat with a non-neutral signal and a positive size: open in the
//!    signal's direction at the current price.
//! 2. Open with a signal that no longer matches the position and a finite
//!    price: realize the P&L into capital and go flat. No re-entry on the
//!    same step. Without a finite price the exit waits for the next one.
//! 3. Otherwise nothing changes.
//!
//! The equity reported for every step is capital plus the unrealized mark of
//! any open position. Positions still open at the end are not force-closed.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::{params::SimulatorParams, Direction, InputError, Result, OHLCV};

// ============================================================
// STATE
// ============================================================

/// Position held by the simulator
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Position {
    #[default]
    Flat,
    Long,
    Short,
}

impl Position {
    /// +1 long, -1 short, 0 flat
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long => 1.0,
            Position::Short => -1.0,
        }
    }

    #[inline]
    pub fn is_flat(self) -> bool {
        matches!(self, Position::Flat)
    }

    fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::Bullish => Position::Long,
            Direction::Bearish => Position::Short,
            Direction::Neutral => Position::Flat,
        }
    }

    /// True when `signal` keeps this (open) position alive
    fn holds(self, signal: Direction) -> bool {
        matches!(
            (self, signal),
            (Position::Long, Direction::Bullish) | (Position::Short, Direction::Bearish)
        )
    }
}

/// Everything the simulator carries from one step to the next
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SimulationState {
    /// Realized capital; changes only on exit
    pub capital: f64,
    pub position: Position,
    /// Zero while flat
    pub entry_price: f64,
    /// Units held; zero while flat
    pub size: f64,
}

impl SimulationState {
    pub fn new(capital: f64) -> Self {
        Self {
            capital,
            position: Position::Flat,
            entry_price: 0.0,
            size: 0.0,
        }
    }

    /// Mark of the open position at `price`
    #[inline]
    pub fn unrealized(&self, price: f64) -> f64 {
        if self.position.is_flat() {
            return 0.0;
        }
        self.position.sign() * (price - self.entry_price) * self.size
    }

    /// Capital plus the unrealized mark
    #[inline]
    pub fn equity(&self, price: f64) -> f64 {
        self.capital + self.unrealized(price)
    }
}

// ============================================================
// STEP OUTPUT
// ============================================================

/// State change produced by one step
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum Transition {
    Opened {
        position: Position,
        price: f64,
        size: f64,
    },
    Closed {
        position: Position,
        entry_price: f64,
        exit_price: f64,
        size: f64,
        pnl: f64,
    },
    Unchanged,
}

/// Result of one step
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Step {
    pub equity: f64,
    pub transition: Transition,
}

/// Mark-to-market equity at one bar
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct EquityPoint {
    pub index: usize,
    pub timestamp: Option<i64>,
    pub equity: f64,
}

/// A completed round trip
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Trade {
    pub position: Position,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub pnl: f64,
}

/// Outcome of a batch run
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SimulationReport {
    pub initial_capital: f64,
    /// Realized capital after the last bar
    pub final_capital: f64,
    pub equity: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub final_state: SimulationState,
}

impl SimulationReport {
    /// Equity at the last bar, or the initial capital for an empty run
    pub fn final_equity(&self) -> f64 {
        self.equity
            .last()
            .map_or(self.initial_capital, |point| point.equity)
    }

    /// `final_equity / initial_capital - 1`
    pub fn total_return(&self) -> f64 {
        self.final_equity() / self.initial_capital - 1.0
    }

    /// Position left open at the last bar, if any
    pub fn open_position(&self) -> Option<Position> {
        let position = self.final_state.position;
        (!position.is_flat()).then_some(position)
    }
}

// ============================================================
// SIMULATOR
// ============================================================

/// Single-position simulator with fixed-fraction sizing
#[derive(Debug, Clone)]
pub struct PositionSimulator {
    params: SimulatorParams,
    state: SimulationState,
}

impl Default for PositionSimulator {
    fn default() -> Self {
        Self::new(SimulatorParams::default())
    }
}

impl PositionSimulator {
    pub fn new(params: SimulatorParams) -> Self {
        Self {
            params,
            state: SimulationState::new(params.initial_capital()),
        }
    }

    pub fn params(&self) -> &SimulatorParams {
        &self.params
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Back to flat with the initial capital
    pub fn reset(&mut self) {
        self.state = SimulationState::new(self.params.initial_capital());
    }

    /// Units bought on entry at `price`; zero when the price is not a positive number
    pub fn entry_size(&self, price: f64) -> f64 {
        if !price.is_finite() || price <= 0.0 {
            return 0.0;
        }
        let size = self.state.capital * self.params.risk_fraction().get() / price;
        if size.is_finite() {
            size
        } else {
            0.0
        }
    }

    /// Advance one bar.
    pub fn step(&mut self, price: f64, signal: Direction) -> Step {
        let position = self.state.position;

        let transition = if position.is_flat() {
            let size = self.entry_size(price);
            if !signal.is_neutral() && size > 0.0 {
                self.open(Position::from_direction(signal), price, size)
            } else {
                Transition::Unchanged
            }
        } else if !position.holds(signal) && price.is_finite() {
            self.close(price)
        } else {
            Transition::Unchanged
        };

        Step {
            equity: self.state.equity(price),
            transition,
        }
    }

    fn open(&mut self, position: Position, price: f64, size: f64) -> Transition {
        self.state.position = position;
        self.state.entry_price = price;
        self.state.size = size;

        debug!(?position, price, size, "opened position");
        Transition::Opened {
            position,
            price,
            size,
        }
    }

    fn close(&mut self, price: f64) -> Transition {
        let SimulationState {
            position,
            entry_price,
            size,
            ..
        } = self.state;
        let pnl = (price - entry_price) * position.sign() * size;

        self.state = SimulationState::new(self.state.capital + pnl);

        debug!(
            ?position,
            entry_price,
            exit_price = price,
            pnl,
            capital = self.state.capital,
            "closed position"
        );
        Transition::Closed {
            position,
            entry_price,
            exit_price: price,
            size,
            pnl,
        }
    }

    /// Run over `bars` at their close, one signal per bar.
    ///
    /// Continues from the current state; call [`Self::reset`] to start over.
    pub fn run<T: OHLCV>(&mut self, bars: &[T], signals: &[Direction]) -> Result<SimulationReport> {
        if bars.len() != signals.len() {
            return Err(InputError::LengthMismatch {
                expected: bars.len(),
                got: signals.len(),
            });
        }

        let initial_capital = self.state.capital;
        let mut equity = Vec::with_capacity(bars.len());
        let mut trades = Vec::new();
        let mut entry_index = 0;

        for (index, (bar, &signal)) in bars.iter().zip(signals).enumerate() {
            let step = self.step(bar.close(), signal);

            match step.transition {
                Transition::Opened { .. } => entry_index = index,
                Transition::Closed {
                    position,
                    entry_price,
                    exit_price,
                    size,
                    pnl,
                } => trades.push(Trade {
                    position,
                    entry_index,
                    exit_index: index,
                    entry_price,
                    exit_price,
                    size,
                    pnl,
                }),
                Transition::Unchanged => {}
            }

            equity.push(EquityPoint {
                index,
                timestamp: bar.timestamp(),
                equity: step.equity,
            });
        }

        let report = SimulationReport {
            initial_capital,
            final_capital: self.state.capital,
            equity,
            trades,
            final_state: self.state,
        };

        info!(
            bars = bars.len(),
            trades = report.trades.len(),
            start = report.initial_capital,
            end = report.final_equity(),
            "simulation finished"
        );
        Ok(report)
    }

    /// [`Self::run`] with composite votes converted by their sign
    pub fn run_composite<T: OHLCV>(
        &mut self,
        bars: &[T],
        composite: &[i32],
    ) -> Result<SimulationReport> {
        let signals: Vec<Direction> = composite
            .iter()
            .map(|&value| Direction::from_composite(value))
            .collect();
        self.run(bars, &signals)
    }
}

// ============================================================
// PARAMETER SWEEP
// ============================================================

/// Independent runs for each parameter set, in parallel across sets.
///
/// Each run is still a sequential fold over the bars.
pub fn sweep<T: OHLCV + Sync>(
    bars: &[T],
    signals: &[Direction],
    grid: &[SimulatorParams],
) -> Result<Vec<SimulationReport>> {
    grid.par_iter()
        .map(|&params| PositionSimulator::new(params).run(bars, signals))
        .collect()
}

// ============================================================
// TESTS
// ============================================================
