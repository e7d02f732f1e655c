//! Playouts from fixture positions through the public rules API.

use arena_core::{GameResult, Position, Termination};

const CEILING: u32 = 200;

fn play_first_legal(mut pos: Position) -> (Position, u32) {
    let mut plies = 0;
    while !pos.is_terminal() && plies < CEILING {
        let moves = pos.legal_moves();
        assert!(!moves.is_empty(), "non-terminal position must have moves");
        pos = pos.apply(moves[0]).expect("generated moves are legal");
        plies += 1;
    }
    (pos, plies)
}

fn play_last_legal(mut pos: Position) -> (Position, u32) {
    let mut plies = 0;
    while !pos.is_terminal() && plies < CEILING {
        let moves = pos.legal_moves();
        pos = pos.apply(*moves.last().unwrap()).unwrap();
        plies += 1;
    }
    (pos, plies)
}

#[test]
fn test_playouts_stay_within_ceiling() {
    let fixtures = [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
        "8/8/4k3/8/8/3K4/4P3/8 w - - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    ];
    let players: [fn(Position) -> (Position, u32); 2] = [play_first_legal, play_last_legal];
    for fen in fixtures {
        for play in players {
            let (end, plies) = play(Position::from_fen(fen).unwrap());
            assert!(plies <= CEILING);
            if let Some(outcome) = end.outcome() {
                assert!(outcome.result.is_determined(), "{fen}");
            }
        }
    }
}

#[test]
fn test_forced_stalemate_fixture() {
    // White to move: Qb6 stalemates the cornered king.
    let pos = Position::from_fen("k7/2K5/8/8/8/8/1Q6/8 w - - 0 1").unwrap();
    let mv = pos.parse_san("Qb6").unwrap();
    let after = pos.apply(mv).unwrap();

    assert!(after.is_terminal());
    assert!(after.legal_moves().is_empty());
    let outcome = after.outcome().unwrap();
    assert_eq!(outcome.result, GameResult::Draw);
    assert_eq!(outcome.termination, Termination::Stalemate);
}

#[test]
fn test_scholars_mate_transcript_line() {
    let start = Position::startpos();
    let moves = start
        .parse_opening("1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7#")
        .unwrap();
    let mut pos = start;
    let mut sans = Vec::new();
    for mv in moves {
        sans.push(pos.to_san(mv).unwrap());
        pos = pos.apply(mv).unwrap();
    }
    assert_eq!(sans.last().map(String::as_str), Some("Qxf7#"));
    assert_eq!(pos.outcome().unwrap().result, GameResult::WhiteWin);
}
