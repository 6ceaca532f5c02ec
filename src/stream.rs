//! Incremental detection and simulation
//!
//! For bars that arrive one at a time. [`StreamingDetector`] keeps the last two
//! bars only; [`SignalPipeline`] adds the simulator, which keeps only its
//! current state.

use std::collections::VecDeque;

use crate::{
    aggregate,
    merge::MergePolicy,
    params::SimulatorParams,
    simulator::{PositionSimulator, SimulationState, Step},
    BarSignals, Direction, InputError, PatternEngine, Result, Window, OHLCV,
};

/// Bars retained behind the current one
const HISTORY: usize = 2;

/// Per-bar detector over a bounded ring of previous bars
#[derive(Debug, Clone)]
pub struct StreamingDetector<T> {
    engine: PatternEngine,
    history: VecDeque<T>,
    next_index: usize,
    last_timestamp: Option<i64>,
}

impl<T: OHLCV> StreamingDetector<T> {
    pub fn new(engine: PatternEngine) -> Self {
        Self {
            engine,
            history: VecDeque::with_capacity(HISTORY),
            next_index: 0,
            last_timestamp: None,
        }
    }

    /// Detect patterns on `bar` against the retained history, then retain it.
    ///
    /// With validation enabled, a timestamp not after the previous one is
    /// rejected and the bar is not retained.
    pub fn push(&mut self, bar: T) -> Result<BarSignals> {
        let timestamp = bar.timestamp();
        if self.engine.config().validate_data {
            if let (Some(previous), Some(timestamp)) = (self.last_timestamp, timestamp) {
                if timestamp <= previous {
                    return Err(InputError::UnorderedTimestamp {
                        index: self.next_index,
                        previous,
                        timestamp,
                    });
                }
            }
        }

        let prev = self.history.back();
        let prev2 = if self.history.len() == HISTORY {
            self.history.front()
        } else {
            None
        };
        let patterns = self.engine.detect_window(&Window::new(&bar, prev, prev2));

        let signals = BarSignals {
            index: self.next_index,
            timestamp,
            patterns,
            composite: aggregate(&patterns),
        };

        if self.history.len() == HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(bar);
        self.next_index += 1;
        self.last_timestamp = timestamp.or(self.last_timestamp);

        Ok(signals)
    }

    /// Number of bars pushed so far
    pub fn bars_seen(&self) -> usize {
        self.next_index
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.history.clear();
        self.next_index = 0;
        self.last_timestamp = None;
    }
}

/// Output of one [`SignalPipeline::push`]
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PipelineStep {
    pub signals: BarSignals,
    /// Direction handed to the simulator after merging
    pub direction: Direction,
    pub step: Step,
}

/// Streaming detector feeding a position simulator
#[derive(Debug, Clone)]
pub struct SignalPipeline<T> {
    detector: StreamingDetector<T>,
    simulator: PositionSimulator,
    policy: MergePolicy,
}

impl<T: OHLCV> SignalPipeline<T> {
    pub fn new(engine: PatternEngine, params: SimulatorParams, policy: MergePolicy) -> Self {
        Self {
            detector: StreamingDetector::new(engine),
            simulator: PositionSimulator::new(params),
            policy,
        }
    }

    /// Process one bar at its close. A missing external signal counts as neutral.
    pub fn push(&mut self, bar: T, external: Option<Direction>) -> Result<PipelineStep> {
        let price = bar.close();
        let signals = self.detector.push(bar)?;
        let direction = self
            .policy
            .merge(signals.direction(), external.unwrap_or_default());
        let step = self.simulator.step(price, direction);

        Ok(PipelineStep {
            signals,
            direction,
            step,
        })
    }

    pub fn state(&self) -> &SimulationState {
        self.simulator.state()
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }
}
