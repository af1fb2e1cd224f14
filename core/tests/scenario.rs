use augur_core::*;

fn neighbors_of(predictions: &[CellPrediction], center: Coord2) -> Vec<CellPrediction> {
    let ring = neighbors(center, 5);
    predictions
        .iter()
        .filter(|p| ring.contains(&p.coords()))
        .copied()
        .collect()
}

#[test]
fn safe_reveal_never_lowers_neighbor_scores() {
    let mut engine = PredictionEngine::with_seed(17);
    let (id, grid) = engine.create_grid(5, Some(3)).unwrap();
    assert_eq!(grid.total_cells(), 25);

    let first = engine.predict_tiles(id).unwrap();
    assert_eq!(first.len(), 25);
    for p in &first {
        assert_eq!(p.safe_probability, 22.0 / 25.0);
    }

    engine.record_tile_outcome(id, 2, 2, false).unwrap();
    let second = engine.predict_tiles(id).unwrap();
    assert_eq!(second.len(), 24);
    assert!(second.iter().all(|p| p.coords() != (2, 2)));

    let before = neighbors_of(&first, (2, 2));
    let after = neighbors_of(&second, (2, 2));
    assert_eq!(after.len(), 8);
    for cell in &after {
        let prior = before.iter().find(|p| p.coords() == cell.coords()).unwrap();
        assert!(cell.safe_probability >= prior.safe_probability);
        assert_eq!(cell.adjacent_safe_count, 1);
    }
}

#[test]
fn predictions_stay_in_range_through_a_whole_game() {
    let mut engine = PredictionEngine::with_seed(99);
    let (id, grid) = engine.create_grid(8, Some(26)).unwrap();

    for coords in cells(grid.size()) {
        for p in engine.predict_tiles(id).unwrap() {
            assert!((0.05..=0.95).contains(&p.safe_probability));
            assert!((0.0..=1.0).contains(&p.confidence));
        }
        engine.reveal_tile(id, coords.0, coords.1).unwrap();
    }

    let stats = engine.grid_stats(id).unwrap();
    assert_eq!(stats.hazards_hit, 26);
    assert_eq!(stats.remaining_safe, 0);
}

#[test]
fn boundary_bomb_counts_fail() {
    let mut engine = PredictionEngine::with_seed(0);
    for bombs in [0, 25] {
        let err = engine.create_grid(5, Some(bombs)).unwrap_err();
        assert!(err.is_invalid_configuration());
    }
    assert!(engine.create_grid(9, None).unwrap_err().is_invalid_configuration());
}

#[test]
fn round_loop_learns_from_history() {
    let mut engine = PredictionEngine::with_seed(12);

    let cold = engine.predict_round();
    assert_eq!(
        (cold.predicted_stop, cold.confidence, cold.recommended_exit),
        (3.0, 0.3, 2.0)
    );

    for _ in 0..30 {
        let round = engine.create_round();
        assert!((1.01..=100.0).contains(&round.crash_point));
        let prediction = engine.predict_round();
        assert!(prediction.reasoning.len() <= 3);
        assert!(prediction.recommended_exit >= 1.01);
        let won = prediction.recommended_exit <= round.crash_point;
        engine.record_round_outcome(
            round.crash_point,
            Some(prediction.recommended_exit),
            Some(won),
        );
    }

    let summary = engine.volatility_summary();
    assert_eq!(summary.sample_size, 20);
    assert_eq!(engine.sequence().accuracy().total_predictions, 30);
    assert!(engine.sequence().accuracy().correct_direction <= 30);
}

#[test]
fn volatility_summary_matches_reference_points() {
    let mut engine = PredictionEngine::with_seed(1);
    for point in [2.0, 2.0, 4.0] {
        engine.record_round_outcome(point, None, None);
    }

    let summary = engine.volatility_summary();
    assert_eq!(stats::round_to(summary.average, 2), 2.67);
    assert_eq!(summary.trend, Trend::Stable);
    assert_eq!(summary.sample_size, 3);
}
