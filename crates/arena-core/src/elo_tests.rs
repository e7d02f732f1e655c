use super::*;
use crate::types::GameResult;
use chrono::{Duration, TimeZone, Utc};

fn record(white: &str, black: &str, result: GameResult, minute: i64) -> MatchRecord {
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    MatchRecord {
        id: Some(minute),
        white: white.to_string(),
        black: black.to_string(),
        result,
        termination: None,
        transcript: String::new(),
        ply_count: 40,
        opening: "1. e4".to_string(),
        played_at: base + Duration::minutes(minute),
        tournament_id: None,
        analysis: serde_json::Value::Null,
    }
}

#[test]
fn test_elo_calculation() {
    let config = RatingConfig::default();

    // Equal ratings should give 50% expected score
    let expected = config.expected_score(1500.0, 1500.0);
    assert!((expected - 0.5).abs() < 0.001);

    // 400 points stronger gives ~91%
    let expected = config.expected_score(1900.0, 1500.0);
    assert!((expected - 0.909).abs() < 0.001);
}

#[test]
fn test_elo_update() {
    let engine = RatingEngine::default();
    let table = engine.compute(&[record("engine1", "engine2", GameResult::WhiteWin, 0)]);

    let winner = table.get("engine1").unwrap();
    let loser = table.get("engine2").unwrap();
    assert!((winner.rating - 1516.0).abs() < 1e-9);
    assert!((loser.rating - 1484.0).abs() < 1e-9);
    assert_eq!(winner.games_played, 1);
    assert_eq!(table.history.len(), 2);
    assert_eq!(table.history[0].rating, 1516);
    assert_eq!(table.history[0].record_id, Some(0));
}

#[test]
fn test_draw_between_equals_changes_nothing() {
    let table = RatingEngine::default().compute(&[record("a", "b", GameResult::Draw, 0)]);
    assert_eq!(table.get("a").unwrap().display_rating(), 1500);
    assert_eq!(table.get("a").unwrap().draws, 1);
}

#[test]
fn test_k_factor_drops_after_provisional_games() {
    let config = RatingConfig::default();
    assert_eq!(config.k_factor(0), 32.0);
    assert_eq!(config.k_factor(29), 32.0);
    assert_eq!(config.k_factor(30), 16.0);
}

#[test]
fn test_undetermined_results_are_skipped() {
    let table = RatingEngine::default().compute(&[record("a", "b", GameResult::Undetermined, 0)]);
    assert!(table.ratings.is_empty());
    assert!(table.history.is_empty());
}

#[test]
fn test_chronological_order_is_used() {
    let engine = RatingEngine::default();
    let in_order = vec![
        record("a", "b", GameResult::WhiteWin, 0),
        record("b", "c", GameResult::Draw, 1),
        record("c", "a", GameResult::WhiteWin, 2),
    ];
    let mut shuffled = in_order.clone();
    shuffled.reverse();

    assert_eq!(engine.compute(&in_order), engine.compute(&shuffled));
}

#[test]
fn test_history_for_one_model() {
    let table = RatingEngine::default().compute(&[
        record("a", "b", GameResult::WhiteWin, 0),
        record("b", "c", GameResult::Draw, 1),
        record("c", "a", GameResult::WhiteWin, 2),
    ]);

    let trail: Vec<&RatingSnapshot> = table.history_for("a").collect();
    assert_eq!(trail.iter().map(|s| s.record_id).collect::<Vec<_>>(), vec![Some(0), Some(2)]);
    assert!(trail.iter().all(|s| s.model == "a"));
    assert!(trail[0].rating > trail[1].rating);
    assert_eq!(trail[1].rating, table.get("a").unwrap().display_rating());
    assert_eq!(table.history_for("b").count(), 2);
    assert_eq!(table.history_for("nobody").count(), 0);
}

#[test]
fn test_recompute_is_deterministic() {
    let engine = RatingEngine::default();
    let records: Vec<MatchRecord> = (0..50)
        .map(|i| {
            let result = match i % 3 {
                0 => GameResult::WhiteWin,
                1 => GameResult::BlackWin,
                _ => GameResult::Draw,
            };
            // Several records share a timestamp to exercise the stable sort.
            record(if i % 2 == 0 { "x" } else { "y" }, if i % 2 == 0 { "y" } else { "z" }, result, i / 4)
        })
        .collect();

    let first = engine.compute(&records);
    let second = engine.compute(&records);
    assert_eq!(first, second);
    assert_eq!(first.history.len(), 100);
}

#[test]
fn test_leaderboard_and_profiles() {
    let table = RatingEngine::default().compute(&[
        record("a", "b", GameResult::WhiteWin, 0),
        record("a", "b", GameResult::WhiteWin, 1),
    ]);
    let board = table.leaderboard();
    assert_eq!(board[0].model, "a");
    assert_eq!(board[0].win_rate, 1.0);
    assert_eq!(board[1].losses, 2);

    let roster = vec![ModelProfile::new("a"), ModelProfile::new("unrated")];
    let profiles = table.profiles(&roster);
    assert!(profiles[0].rating > 1500);
    assert_eq!(profiles[0].games_played, 2);
    assert_eq!(profiles[1].rating, 1500);
    assert!(table.format_leaderboard().contains("Model Leaderboard"));
}

#[test]
fn test_save_and_load() {
    let table = RatingEngine::default().compute(&[record("a", "b", GameResult::BlackWin, 0)]);
    let path = std::env::temp_dir().join(format!("arena_ratings_{}.json", std::process::id()));
    table.save(&path).unwrap();
    let loaded = RatingTable::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, table);
}
