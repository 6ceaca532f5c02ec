//! Integration tests for the position simulator and the detect-then-simulate flow.

use candlesim::prelude::*;

fn close_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(i as i64, c, c + 1.0, c - 1.0, c, 1000.0))
        .collect()
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
    .map(|(i, &(o, h, l, c))| Bar::new(1_700_000_000 + i as i64 * 3600, o, h, l, c, 1000.0))
    .collect()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ============================================================
// SIMULATION SEMANTICS
// ============================================================

#[test]
fn test_neutral_signals_keep_equity_constant() {
    let bars = close_bars(&[100.0, 95.0, 130.0, 80.0, 101.0]);
    let signals = vec![Direction::Neutral; bars.len()];

    let report = PositionSimulator::default().run(&bars, &signals).unwrap();

    assert!(report.trades.is_empty());
    assert!(report.equity.iter().all(|p| p.equity == 10_000.0));
    assert_eq!(report.final_capital, 10_000.0);
    assert_eq!(report.open_position(), None);
    assert_eq!(report.total_return(), 0.0);
}

#[test]
fn test_flat_neutral_step_is_idempotent() {
    let mut sim = PositionSimulator::default();
    let before = *sim.state();
    let step = sim.step(123.0, Direction::Neutral);

    assert_eq!(step.transition, Transition::Unchanged);
    assert_eq!(*sim.state(), before);
}

#[test]
fn test_reversal_exits_without_same_bar_entry() {
    let bars = close_bars(&[100.0, 110.0, 120.0, 130.0]);
    let signals = [
        Direction::Bullish,
        Direction::Bearish,
        Direction::Bearish,
        Direction::Neutral,
    ];

    let report = PositionSimulator::default().run(&bars, &signals).unwrap();

    // long 1 unit at 100, flat at 110
    let long = report.trades[0];
    assert_eq!(long.position, Position::Long);
    assert_eq!((long.entry_index, long.exit_index), (0, 1));
    assert!(approx(long.size, 1.0));
    assert!(approx(long.pnl, 10.0));
    assert!(approx(report.equity[1].equity, 10_010.0));

    // short opens on the next bearish bar, sized from the new capital
    let short = report.trades[1];
    assert_eq!(short.position, Position::Short);
    assert_eq!((short.entry_index, short.exit_index), (2, 3));
    assert!(approx(short.size, 10_010.0 * 0.01 / 120.0));
    assert!(approx(short.pnl, -10.0 * short.size));

    assert_eq!(report.trades.len(), 2);
    assert!(approx(report.final_capital, 10_010.0 + short.pnl));
}

#[test]
fn test_equity_marks_open_position() {
    let bars = close_bars(&[100.0, 105.0, 90.0]);
    let signals = [Direction::Bullish; 3];

    let report = PositionSimulator::default().run(&bars, &signals).unwrap();

    let equity: Vec<f64> = report.equity.iter().map(|p| p.equity).collect();
    assert!(approx(equity[0], 10_000.0));
    assert!(approx(equity[1], 10_005.0));
    assert!(approx(equity[2], 9_990.0));

    // still open: no trade, capital untouched
    assert!(report.trades.is_empty());
    assert_eq!(report.final_capital, 10_000.0);
    assert_eq!(report.open_position(), Some(Position::Long));
    assert!(approx(report.final_equity(), 9_990.0));
}

#[test]
fn test_constant_price_never_changes_equity() {
    let bars = close_bars(&[50.0; 6]);
    let signals = [
        Direction::Bullish,
        Direction::Bearish,
        Direction::Bearish,
        Direction::Bullish,
        Direction::Neutral,
        Direction::Bullish,
    ];

    let report = PositionSimulator::default().run(&bars, &signals).unwrap();

    assert!(report.equity.iter().all(|p| approx(p.equity, 10_000.0)));
    assert!(report.trades.iter().all(|t| approx(t.pnl, 0.0)));
}

#[test]
fn test_missing_price_defers_exit() {
    let bars = close_bars(&[100.0, f64::NAN, 110.0, 120.0]);
    let signals = [
        Direction::Bullish,
        Direction::Neutral,
        Direction::Neutral,
        Direction::Bullish,
    ];

    let report = PositionSimulator::default().run(&bars, &signals).unwrap();

    let exit = report.trades[0];
    assert_eq!((exit.entry_index, exit.exit_index), (0, 2));
    assert!(approx(exit.pnl, 10.0));
    assert!(report.final_capital.is_finite());
    assert_eq!(report.open_position(), Some(Position::Long));
}

#[test]
fn test_equity_points_carry_timestamps() {
    let bars = close_bars(&[1.0, 2.0]);
    let report = PositionSimulator::default()
        .run(&bars, &[Direction::Neutral; 2])
        .unwrap();

    assert_eq!(report.equity[1].index, 1);
    assert_eq!(report.equity[1].timestamp, Some(1));
}

#[test]
fn test_run_rejects_length_mismatch() {
    let bars = close_bars(&[1.0, 2.0, 3.0]);
    let err = PositionSimulator::default().run(&bars, &[Direction::Bullish]);
    assert_eq!(
        err,
        Err(InputError::LengthMismatch {
            expected: 3,
            got: 1
        })
    );
}

#[test]
fn test_report_serializes() {
    let bars = close_bars(&[100.0, 110.0]);
    let report = PositionSimulator::default()
        .run(&bars, &[Direction::Bullish, Direction::Neutral])
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["trades"][0]["position"], "Long");
    assert_eq!(json["equity"].as_array().unwrap().len(), 2);
}

// ============================================================
// DETECT THEN SIMULATE
// ============================================================

#[test]
fn test_golden_sequence_end_to_end() {
    let bars = golden_bars();
    let engine = PatternEngine::default();
    let composite = engine.composite(&bars).unwrap();
    assert_eq!(composite, vec![0, 0, -1, 0, 0, 1, 1]);

    let report = PositionSimulator::default()
        .run_composite(&bars, &composite)
        .unwrap();

    // short at 103 closed at 105, then long from 111 left open
    assert_eq!(report.trades.len(), 1);
    let short = report.trades[0];
    assert_eq!(short.position, Position::Short);
    assert_eq!((short.entry_index, short.exit_index), (2, 3));
    assert!(approx(short.pnl, -2.0 * 100.0 / 103.0));

    assert_eq!(report.open_position(), Some(Position::Long));
    let capital = 10_000.0 + short.pnl;
    let size = capital * 0.01 / 111.0;
    assert!(approx(report.final_state.size, size));
    assert!(approx(report.final_equity(), capital + size));
}

#[test]
fn test_external_signal_merge() {
    let bars = golden_bars();
    let composite = PatternEngine::default().composite(&bars).unwrap();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let external = ma_crossover(
        &closes,
        Period::new(2).unwrap(),
        Period::new(3).unwrap(),
    )
    .unwrap();

    let agreement = merge_series(MergePolicy::Agreement, &composite, &external).unwrap();
    let pattern_only = merge_series(MergePolicy::PatternOnly, &composite, &external).unwrap();

    // agreement never acts where the pattern vote is neutral
    for (vote, merged) in composite.iter().zip(&agreement) {
        if *vote == 0 {
            assert_eq!(*merged, Direction::Neutral);
        }
    }
    assert_eq!(
        pattern_only,
        composite
            .iter()
            .map(|&v| Direction::from_composite(v))
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_pipeline_matches_batch_run() {
    let bars = golden_bars();
    let engine = PatternEngine::default();
    let composite = engine.composite(&bars).unwrap();
    let batch = PositionSimulator::default()
        .run_composite(&bars, &composite)
        .unwrap();

    let mut pipeline =
        SignalPipeline::new(engine, SimulatorParams::default(), MergePolicy::PatternOnly);
    let steps: Vec<_> = bars
        .iter()
        .map(|bar| pipeline.push(*bar, None).unwrap())
        .collect();

    for (step, point) in steps.iter().zip(&batch.equity) {
        assert!(approx(step.step.equity, point.equity));
    }
    assert_eq!(*pipeline.state(), batch.final_state);
}

// ============================================================
// PARAMETER SWEEP
// ============================================================

#[test]
fn test_sweep_matches_individual_runs() {
    let bars = golden_bars();
    let composite = PatternEngine::default().composite(&bars).unwrap();
    let signals: Vec<Direction> = composite
        .iter()
        .map(|&v| Direction::from_composite(v))
        .collect();

    let grid = vec![
        SimulatorParams::new(10_000.0, 0.01).unwrap(),
        SimulatorParams::new(50_000.0, 0.05).unwrap(),
    ];
    let reports = sweep(&bars, &signals, &grid).unwrap();

    assert_eq!(reports.len(), grid.len());
    for (params, report) in grid.iter().zip(&reports) {
        let single = PositionSimulator::new(*params).run(&bars, &signals).unwrap();
        assert_eq!(*report, single);
    }
}

#[test]
fn test_params_from_json() {
    let params: SimulatorParams = serde_json::from_str(r#"{"risk_fraction": 0.02}"#).unwrap();
    assert_eq!(params.initial_capital(), 10_000.0);
    assert_eq!(params.risk_fraction().get(), 0.02);

    assert!(serde_json::from_str::<SimulatorParams>(r#"{"risk_fraction": 1.5}"#).is_err());
    assert!(serde_json::from_str::<SimulatorParams>(r#"{"initial_capital": -1.0}"#).is_err());
}
