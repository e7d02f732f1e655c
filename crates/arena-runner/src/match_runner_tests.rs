use super::*;
use crate::source::{ProposedMove, Roster, FIRST_LEGAL, RANDOM};
use crate::store::{DisabledSink, MemorySink};
use arena_core::{ArenaError, HistoryFilter, MatchRecord, ModelProfile, MoveOrigin, RecordId};
use async_trait::async_trait;
use cozy_chess::Square;

struct Resigner;

#[async_trait]
impl MoveSource for Resigner {
    fn label(&self) -> &str {
        "resigner"
    }

    async fn next_move(&mut self, _: &Position, _: &[MoveRecord]) -> ArenaResult<Option<ProposedMove>> {
        Ok(None)
    }
}

struct Cheater;

#[async_trait]
impl MoveSource for Cheater {
    fn label(&self) -> &str {
        "cheater"
    }

    async fn next_move(&mut self, _: &Position, _: &[MoveRecord]) -> ArenaResult<Option<ProposedMove>> {
        let mv = Move {
            from: Square::E2,
            to: Square::E5,
            promotion: None,
        };
        Ok(Some(ProposedMove::new(mv, MoveOrigin::Agent)))
    }
}

struct Panicker;

#[async_trait]
impl MoveSource for Panicker {
    fn label(&self) -> &str {
        "panicker"
    }

    async fn next_move(&mut self, _: &Position, _: &[MoveRecord]) -> ArenaResult<Option<ProposedMove>> {
        panic!("engine exploded");
    }
}

struct ExplodingSink;

#[async_trait]
impl RecordSink for ExplodingSink {
    async fn save_match_record(&self, _: &MatchRecord) -> ArenaResult<RecordId> {
        panic!("disk on fire");
    }

    async fn load_match_history(&self, _: &HistoryFilter) -> ArenaResult<Vec<MatchRecord>> {
        Ok(Vec::new())
    }
}

/// Resolver with a few misbehaving participants on top of a roster.
struct TestResolver(Roster);

impl SourceResolver for TestResolver {
    fn resolve(&self, participant: &str) -> ArenaResult<Box<dyn MoveSource>> {
        match participant {
            "resigner" => Ok(Box::new(Resigner)),
            "cheater" => Ok(Box::new(Cheater)),
            "panicker" => Ok(Box::new(Panicker)),
            other => self.0.resolve(other),
        }
    }
}

fn env_with(sink: Arc<dyn RecordSink>) -> MatchEnv {
    let roster = Roster::new().with_seed(42).with_models([
        ModelProfile::new("Agent-A"),
        ModelProfile::new("Agent-B"),
        ModelProfile::new("retired").inactive(),
    ]);
    MatchEnv {
        resolver: Arc::new(TestResolver(roster)),
        sink,
        broadcaster: Arc::new(Broadcaster::new()),
    }
}

fn env() -> (MatchEnv, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (env_with(sink.clone()), sink)
}

#[tokio::test]
async fn test_agents_play_to_a_result() {
    let (env, sink) = env();
    let handle = spawn_match(MatchSpec::new("Agent-A", "Agent-B").with_opening("1. e4"), env).unwrap();

    let snap = handle.wait().await;
    assert_eq!(snap.status, MatchStatus::Finished);
    assert!(snap.result.is_determined());
    assert!(snap.termination.is_some());
    assert!(!snap.transcript.is_empty());
    assert!(snap.ply_count() <= DEFAULT_MAX_PLIES);
    assert_eq!(snap.moves[0].san, "e4");
    assert_eq!(snap.moves[0].origin, MoveOrigin::Opening);
    assert_eq!(snap.record_id, Some(1));
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.records()[0].transcript, snap.transcript);
}

#[tokio::test]
async fn test_first_legal_against_random() {
    let (env, _sink) = env();
    let handle = spawn_match(MatchSpec::new(FIRST_LEGAL, RANDOM), env).unwrap();
    let snap = handle.wait().await;
    assert_eq!(snap.status, MatchStatus::Finished);
    for (index, record) in snap.moves.iter().enumerate() {
        assert_eq!(record.ply as usize, index + 1);
    }
}

#[tokio::test]
async fn test_stalemate_fixture_finishes_drawn() {
    let (env, _sink) = env();
    let spec = MatchSpec::new(FIRST_LEGAL, FIRST_LEGAL)
        .with_start_fen("k7/2K5/8/8/8/8/1Q6/8 w - - 0 1")
        .with_opening("Qb6");
    let snap = spawn_match(spec, env).unwrap().wait().await;

    assert_eq!(snap.status, MatchStatus::Finished);
    assert_eq!(snap.result, GameResult::Draw);
    assert_eq!(snap.termination, Some(Termination::Stalemate));
    assert!(Position::from_fen(&snap.position).unwrap().legal_moves().is_empty());
}

#[tokio::test]
async fn test_ply_ceiling_is_a_draw() {
    let (env, _sink) = env();
    let spec = MatchSpec::new(FIRST_LEGAL, FIRST_LEGAL).with_max_plies(6);
    let snap = spawn_match(spec, env).unwrap().wait().await;
    assert_eq!(snap.ply_count(), 6);
    assert_eq!(snap.result, GameResult::Draw);
    assert_eq!(snap.termination, Some(Termination::MoveLimit));
}

#[tokio::test]
async fn test_resignation_scores_for_opponent() {
    let (env, _sink) = env();
    let snap = spawn_match(MatchSpec::new(FIRST_LEGAL, "resigner"), env)
        .unwrap()
        .wait()
        .await;
    assert_eq!(snap.status, MatchStatus::Finished);
    assert_eq!(snap.result, GameResult::WhiteWin);
    assert_eq!(snap.termination, Some(Termination::Resignation));
    assert_eq!(snap.ply_count(), 1);
}

#[tokio::test]
async fn test_illegal_move_ends_in_error() {
    let (env, sink) = env();
    let mut events = env.broadcaster.subscribe();
    let snap = spawn_match(MatchSpec::new("cheater", FIRST_LEGAL), env)
        .unwrap()
        .wait()
        .await;

    assert_eq!(snap.status, MatchStatus::Error);
    assert!(snap.error.as_deref().unwrap().contains("illegal move"));
    assert!(snap.moves.is_empty());
    assert!(sink.is_empty());

    assert_eq!(events.try_recv().unwrap().kind(), "match_started");
    match events.try_recv().unwrap() {
        ArenaEvent::MatchError { message, .. } => assert!(message.contains("illegal")),
        other => panic!("unexpected event {}", other.kind()),
    }
}

#[tokio::test]
async fn test_unavailable_participant_ends_in_error() {
    let (env, _sink) = env();
    let snap = spawn_match(MatchSpec::new("retired", FIRST_LEGAL), env.clone())
        .unwrap()
        .wait()
        .await;
    assert_eq!(snap.status, MatchStatus::Error);
    assert!(snap.error.unwrap().contains("inactive"));

    let snap = spawn_match(MatchSpec::new(FIRST_LEGAL, "ghost"), env)
        .unwrap()
        .wait()
        .await;
    assert_eq!(snap.status, MatchStatus::Error);
}

#[tokio::test]
async fn test_panicking_source_ends_in_error() {
    let (env, _sink) = env();
    let snap = spawn_match(MatchSpec::new("panicker", FIRST_LEGAL), env)
        .unwrap()
        .wait()
        .await;
    assert_eq!(snap.status, MatchStatus::Error);
    assert!(snap.error.unwrap().contains("engine exploded"));
}

#[tokio::test]
async fn test_persistence_failure_keeps_finished() {
    let env = env_with(Arc::new(DisabledSink));
    let snap = spawn_match(MatchSpec::new(FIRST_LEGAL, "resigner"), env)
        .unwrap()
        .wait()
        .await;
    assert_eq!(snap.status, MatchStatus::Finished);
    assert_eq!(snap.record_id, None);
}

#[tokio::test]
async fn test_panicking_sink_still_completes_match() {
    let env = env_with(Arc::new(ExplodingSink));
    let handle = spawn_match(MatchSpec::new(FIRST_LEGAL, "resigner"), env).unwrap();
    let snap = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap();
    assert_eq!(snap.status, MatchStatus::Finished);
    assert_eq!(snap.record_id, None);
    assert!(handle.is_done());
}

#[tokio::test]
async fn test_prepared_match_is_silent_until_started() {
    let (env, _sink) = env();
    let mut events = env.broadcaster.subscribe();
    let pending = prepare_match(MatchSpec::new(FIRST_LEGAL, "resigner"), env).unwrap();
    assert_eq!(pending.handle().status(), MatchStatus::Playing);
    assert!(!pending.handle().is_done());
    assert!(events.try_recv().is_none());

    let handle = pending.start();
    assert_eq!(events.try_recv().map(|e| e.kind()), Some("match_started"));
    assert_eq!(handle.wait().await.status, MatchStatus::Finished);
}

#[tokio::test]
async fn test_custom_start_is_recorded_in_transcript() {
    let (env, _sink) = env();
    let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
    let spec = MatchSpec::new(FIRST_LEGAL, FIRST_LEGAL)
        .with_start_fen(fen)
        .with_max_plies(2);
    let snap = spawn_match(spec, env).unwrap().wait().await;

    assert_eq!(snap.start_fen, Position::from_fen(fen).unwrap().fen());
    assert_eq!(snap.moves[0].side, Side::Black);
    assert!(snap.transcript.contains("[SetUp \"1\"]"));
    assert!(snap.transcript.contains(&format!("[FEN \"{}\"]", snap.start_fen)));
    assert!(snap.transcript.contains("\n1... "));
}

#[tokio::test]
async fn test_stop_halts_waiting_match() {
    let roster = Roster::new();
    let _sender = roster.seat_human("alice");
    let env = MatchEnv {
        resolver: Arc::new(roster),
        sink: Arc::new(MemorySink::new()),
        broadcaster: Arc::new(Broadcaster::new()),
    };
    let handle = spawn_match(MatchSpec::new("alice", FIRST_LEGAL), env).unwrap();
    assert_eq!(handle.status(), MatchStatus::Playing);

    tokio::task::yield_now().await;
    assert!(handle.stop());
    let snap = handle.wait().await;
    assert_eq!(snap.status, MatchStatus::Stopped);
    assert_eq!(snap.result, GameResult::Undetermined);
    assert!(!handle.stop());
}

#[tokio::test]
async fn test_stop_during_pacing() {
    let (env, _sink) = env();
    let spec = MatchSpec::new(FIRST_LEGAL, FIRST_LEGAL).with_pacing(Duration::from_secs(60));
    let handle = spawn_match(spec, env).unwrap();
    tokio::task::yield_now().await;
    handle.stop();
    let snap = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap();
    assert_eq!(snap.status, MatchStatus::Stopped);
    assert!(snap.ply_count() <= 1);
}

#[tokio::test]
async fn test_status_sequence_is_monotonic() {
    let (env, _sink) = env();
    let mut events = env.broadcaster.subscribe();
    let handle = spawn_match(MatchSpec::new(FIRST_LEGAL, RANDOM).with_max_plies(20), env).unwrap();
    handle.wait().await;

    let mut statuses = Vec::new();
    while let Some(event) = events.try_recv() {
        if let ArenaEvent::MatchStarted { snapshot, .. }
        | ArenaEvent::MoveMade { snapshot, .. }
        | ArenaEvent::MatchFinished { snapshot, .. } = event
        {
            statuses.push(snapshot.status);
        }
    }
    statuses.dedup();
    assert_eq!(statuses, vec![MatchStatus::Playing, MatchStatus::Finished]);
}

#[tokio::test]
async fn test_bad_setup_is_rejected_synchronously() {
    let (env, _sink) = env();
    let err = spawn_match(MatchSpec::new("a", "b").with_opening("1. e5"), env.clone()).unwrap_err();
    assert!(matches!(err, ArenaError::InvalidNotation { .. }));

    let err = spawn_match(MatchSpec::new("a", "b").with_start_fen("not a fen"), env).unwrap_err();
    assert!(matches!(err, ArenaError::InvalidPosition(_)));
}

#[tokio::test]
async fn test_opening_book_source_is_used_for_both_sides() {
    let (env, _sink) = env();
    let spec = MatchSpec::new(FIRST_LEGAL, FIRST_LEGAL)
        .with_opening("1. d4 d5 2. c4")
        .with_max_plies(4);
    let snap = spawn_match(spec, env).unwrap().wait().await;
    let sans: Vec<&str> = snap.moves.iter().map(|m| m.san.as_str()).collect();
    assert_eq!(&sans[..3], &["d4", "d5", "c4"]);
    assert_eq!(snap.moves[3].origin, MoveOrigin::Fallback);
    assert_eq!(snap.moves[1].actor, FIRST_LEGAL);
}
