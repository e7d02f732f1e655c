//! PGN transcript rendering.

use chrono::{DateTime, Utc};

use crate::types::{GameResult, MoveRecord, Side, Termination};

/// Event name written into every transcript.
pub const EVENT_NAME: &str = "LLM Chess Arena";

const LINE_WIDTH: usize = 80;

const STANDARD_START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Headers and move list of one game, rendered as PGN.
#[derive(Debug, Clone)]
pub struct Transcript<'a> {
    pub white: &'a str,
    pub black: &'a str,
    pub date: DateTime<Utc>,
    pub round: Option<u32>,
    pub opening: Option<&'a str>,
    pub result: GameResult,
    pub termination: Option<Termination>,
    /// Starting FEN when the game did not begin from the standard position.
    pub start_fen: Option<&'a str>,
    pub moves: &'a [MoveRecord],
}

impl<'a> Transcript<'a> {
    pub fn new(white: &'a str, black: &'a str, moves: &'a [MoveRecord]) -> Self {
        Self {
            white,
            black,
            date: Utc::now(),
            round: None,
            opening: None,
            result: GameResult::Undetermined,
            termination: None,
            start_fen: None,
            moves,
        }
    }

    /// Render headers, numbered movetext, explanation comments and the
    /// result token.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let round = self
            .round
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        push_tag(&mut out, "Event", EVENT_NAME);
        push_tag(&mut out, "Site", "?");
        push_tag(&mut out, "Date", &self.date.format("%Y.%m.%d").to_string());
        push_tag(&mut out, "Round", &round);
        push_tag(&mut out, "White", self.white);
        push_tag(&mut out, "Black", self.black);
        push_tag(&mut out, "Result", self.result.as_pgn());
        if let Some(opening) = self.opening.filter(|o| !o.trim().is_empty()) {
            push_tag(&mut out, "Opening", opening);
        }
        if let Some(termination) = self.termination {
            push_tag(&mut out, "Termination", termination.as_str());
        }
        let start_fen = self
            .start_fen
            .map(str::trim)
            .filter(|fen| !fen.is_empty() && *fen != STANDARD_START);
        if let Some(fen) = start_fen {
            push_tag(&mut out, "SetUp", "1");
            push_tag(&mut out, "FEN", fen);
        }
        out.push('\n');

        let mut tokens = Vec::with_capacity(self.moves.len() * 2 + 1);
        let mut number = start_fen.map_or(1, fullmove_number);
        let mut need_number = true;
        for record in self.moves {
            match record.side {
                Side::White => tokens.push(format!("{number}.")),
                Side::Black if need_number => tokens.push(format!("{number}...")),
                Side::Black => {}
            }
            if record.side == Side::Black {
                number += 1;
            }
            tokens.push(record.san.clone());
            need_number = false;
            if let Some(explanation) = record.explanation.as_deref() {
                let cleaned = explanation.replace(['{', '}'], "");
                let cleaned = cleaned.trim();
                if !cleaned.is_empty() {
                    tokens.push(format!("{{{cleaned}}}"));
                    need_number = true;
                }
            }
        }
        tokens.push(self.result.as_pgn().to_string());

        out.push_str(&wrap(&tokens, LINE_WIDTH));
        out.push('\n');
        out
    }
}

/// Render a move list with default headers.
pub fn serialize_transcript(white: &str, black: &str, moves: &[MoveRecord]) -> String {
    Transcript::new(white, black, moves).render()
}

/// Sixth FEN field, 1 when missing or unreadable.
fn fullmove_number(fen: &str) -> u32 {
    fen.split_whitespace()
        .nth(5)
        .and_then(|field| field.parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

fn push_tag(out: &mut String, name: &str, value: &str) {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    out.push_str(&format!("[{name} \"{escaped}\"]\n"));
}

fn wrap(tokens: &[String], width: usize) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    for token in tokens {
        if line_len > 0 && line_len + 1 + token.len() > width {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(token);
        line_len += token.len();
    }
    out
}

#[cfg(test)]
#[path = "pgn_tests.rs"]
mod pgn_tests;
