//! Combining the pattern vote with an external directional signal
//!
//! The simulator takes one [`Direction`] per bar. Where that direction comes
//! from is the caller's decision: the composite pattern vote, an external
//! predictor, or a combination picked with [`MergePolicy`]. Nothing here is
//! applied implicitly.

use crate::{Direction, InputError, Period, Result};

/// How a pattern direction and an external direction are combined
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Use the pattern vote, ignore the external signal
    #[default]
    PatternOnly,
    /// Use the external signal, ignore the pattern vote
    ExternalOnly,
    /// Act only when both agree on a non-neutral direction
    Agreement,
    /// Act on whichever side is non-neutral; neutral when they conflict
    Either,
}

impl MergePolicy {
    pub fn merge(self, pattern: Direction, external: Direction) -> Direction {
        match self {
            MergePolicy::PatternOnly => pattern,
            MergePolicy::ExternalOnly => external,
            MergePolicy::Agreement if pattern == external => pattern,
            MergePolicy::Agreement => Direction::Neutral,
            MergePolicy::Either => match (pattern, external) {
                (p, e) if p == e => p,
                (p, Direction::Neutral) => p,
                (Direction::Neutral, e) => e,
                _ => Direction::Neutral,
            },
        }
    }
}

/// Merge a composite column with an external column of the same length
pub fn merge_series(
    policy: MergePolicy,
    composite: &[i32],
    external: &[Direction],
) -> Result<Vec<Direction>> {
    if composite.len() != external.len() {
        return Err(InputError::LengthMismatch {
            expected: composite.len(),
            got: external.len(),
        });
    }

    Ok(composite
        .iter()
        .zip(external)
        .map(|(&vote, &ext)| policy.merge(Direction::from_composite(vote), ext))
        .collect())
}

/// Closes required beyond the slow period before a crossover is reported
const MA_WARMUP_EXTRA: usize = 2;

/// Moving-average crossover: bullish while the fast mean of closes is above
/// the slow one, bearish while below.
///
/// Neutral until `slow + 2` closes are available, and whenever the slow
/// window holds a non-finite close.
pub fn ma_crossover(closes: &[f64], fast: Period, slow: Period) -> Result<Vec<Direction>> {
    let (fast, slow) = (fast.get(), slow.get());
    if fast >= slow {
        return Err(InputError::InvalidConfig(format!(
            "fast period {fast} must be shorter than slow period {slow}"
        )));
    }

    let mean = |window: &[f64]| window.iter().sum::<f64>() / window.len() as f64;

    Ok((0..closes.len())
        .map(|i| {
            if i + 1 < slow + MA_WARMUP_EXTRA {
                return Direction::Neutral;
            }
            let window = &closes[i + 1 - slow..=i];
            if !window.iter().all(|c| c.is_finite()) {
                return Direction::Neutral;
            }
            let fast_ma = mean(&window[slow - fast..]);
            let slow_ma = mean(window);

            if fast_ma > slow_ma {
                Direction::Bullish
            } else if fast_ma < slow_ma {
                Direction::Bearish
            } else {
                Direction::Neutral
            }
        })
        .collect())
}
