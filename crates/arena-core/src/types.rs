//! Match data model: identities, lifecycle states, results and move records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{MatchRecord, RecordId};

/// Unique identifier of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub Uuid);

impl MatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TournamentId(pub Uuid);

impl TournamentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TournamentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TournamentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl From<cozy_chess::Color> for Side {
    fn from(color: cozy_chess::Color) -> Self {
        match color {
            cozy_chess::Color::White => Side::White,
            cozy_chess::Color::Black => Side::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    WhiteWin,
    BlackWin,
    Draw,
    #[default]
    Undetermined,
}

impl GameResult {
    /// Win for `side`.
    pub fn win_for(side: Side) -> Self {
        match side {
            Side::White => GameResult::WhiteWin,
            Side::Black => GameResult::BlackWin,
        }
    }

    /// PGN result token ("1-0", "0-1", "1/2-1/2" or "*").
    pub fn as_pgn(self) -> &'static str {
        match self {
            GameResult::WhiteWin => "1-0",
            GameResult::BlackWin => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Undetermined => "*",
        }
    }

    pub fn from_pgn(token: &str) -> Option<Self> {
        match token.trim() {
            "1-0" => Some(GameResult::WhiteWin),
            "0-1" => Some(GameResult::BlackWin),
            "1/2-1/2" | "½-½" => Some(GameResult::Draw),
            "*" => Some(GameResult::Undetermined),
            _ => None,
        }
    }

    pub fn is_determined(self) -> bool {
        self != GameResult::Undetermined
    }

    pub fn is_decisive(self) -> bool {
        matches!(self, GameResult::WhiteWin | GameResult::BlackWin)
    }

    /// Score for `side` (1 for win, 0.5 for draw, 0 for loss).
    pub fn score_for(self, side: Side) -> Option<f64> {
        match (self, side) {
            (GameResult::WhiteWin, Side::White) | (GameResult::BlackWin, Side::Black) => Some(1.0),
            (GameResult::WhiteWin, Side::Black) | (GameResult::BlackWin, Side::White) => Some(0.0),
            (GameResult::Draw, _) => Some(0.5),
            (GameResult::Undetermined, _) => None,
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_pgn())
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    /// 75 moves by each side without a capture or pawn move.
    SeventyFiveMoveRule,
    FivefoldRepetition,
    /// The ply ceiling was reached; scored as a draw.
    MoveLimit,
    /// The side to move produced no move.
    Resignation,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Termination::Checkmate => "checkmate",
            Termination::Stalemate => "stalemate",
            Termination::InsufficientMaterial => "insufficient material",
            Termination::SeventyFiveMoveRule => "seventy-five-move rule",
            Termination::FivefoldRepetition => "fivefold repetition",
            Termination::MoveLimit => "move limit",
            Termination::Resignation => "resignation",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        [
            Termination::Checkmate,
            Termination::Stalemate,
            Termination::InsufficientMaterial,
            Termination::SeventyFiveMoveRule,
            Termination::FivefoldRepetition,
            Termination::MoveLimit,
            Termination::Resignation,
        ]
        .into_iter()
        .find(|t| t.as_str() == text)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict on a game: who won and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub result: GameResult,
    pub termination: Termination,
}

/// Lifecycle of a match.
///
/// `Waiting -> Playing -> {Finished | Error | Stopped}`; terminal states are
/// absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Waiting,
    Playing,
    Finished,
    Error,
    Stopped,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MatchStatus::Finished | MatchStatus::Error | MatchStatus::Stopped
        )
    }

    pub fn can_transition_to(self, next: MatchStatus) -> bool {
        match self {
            MatchStatus::Waiting => next == MatchStatus::Playing,
            MatchStatus::Playing => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Waiting => "waiting",
            MatchStatus::Playing => "playing",
            MatchStatus::Finished => "finished",
            MatchStatus::Error => "error",
            MatchStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Which kind of source produced a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOrigin {
    Opening,
    Fallback,
    Random,
    Human,
    Agent,
}

/// One applied half-move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// 1-based ply number.
    pub ply: u32,
    pub san: String,
    pub uci: String,
    pub side: Side,
    /// Participant that played the move.
    pub actor: String,
    pub origin: MoveOrigin,
    pub from: String,
    pub to: String,
    pub explanation: Option<String>,
    pub fen_after: String,
}

/// Owned copy of a match's state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub id: MatchId,
    pub white: String,
    pub black: String,
    pub opening: String,
    pub status: MatchStatus,
    pub moves: Vec<MoveRecord>,
    pub result: GameResult,
    pub termination: Option<Termination>,
    /// Position the game started from, as FEN.
    pub start_fen: String,
    /// Current position as FEN.
    pub position: String,
    /// PGN transcript of the moves so far.
    pub transcript: String,
    pub tournament_id: Option<TournamentId>,
    pub error: Option<String>,
    pub record_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchSnapshot {
    pub fn new(
        id: MatchId,
        white: impl Into<String>,
        black: impl Into<String>,
        opening: impl Into<String>,
        position: String,
        tournament_id: Option<TournamentId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            white: white.into(),
            black: black.into(),
            opening: opening.into(),
            status: MatchStatus::Waiting,
            moves: Vec::new(),
            result: GameResult::Undetermined,
            termination: None,
            start_fen: position.clone(),
            position,
            transcript: String::new(),
            tournament_id,
            error: None,
            record_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ply_count(&self) -> u32 {
        self.moves.len() as u32
    }

    /// Participant playing `side`.
    pub fn participant(&self, side: Side) -> &str {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// Persistable record of a finished match; `None` for any other status.
    pub fn to_record(&self) -> Option<MatchRecord> {
        if self.status != MatchStatus::Finished {
            return None;
        }
        Some(MatchRecord {
            id: self.record_id,
            white: self.white.clone(),
            black: self.black.clone(),
            result: self.result,
            termination: self.termination,
            transcript: self.transcript.clone(),
            ply_count: self.ply_count(),
            opening: self.opening.clone(),
            played_at: self.updated_at,
            tournament_id: self.tournament_id,
            analysis: serde_json::Value::Object(Default::default()),
        })
    }
}
