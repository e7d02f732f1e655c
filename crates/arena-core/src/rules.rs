//! Rules adapter over `cozy-chess`.
//!
//! Everything here is a pure function of the [`Position`] passed in, so one
//! value can be shared by any number of concurrently running matches.
//! `cozy-chess` encodes castling as "king takes own rook"; this module hides
//! that and speaks standard SAN/UCI to the rest of the arena.

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::error::{ArenaError, ArenaResult};
use crate::types::{GameResult, Outcome, Side, Termination};

/// Halfmove clock at which the game is drawn automatically.
const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;

/// Occurrences of one position that draw the game automatically.
const FIVEFOLD: usize = 5;

/// A board plus the hashes of earlier positions since the last irreversible
/// move, enough to decide fivefold repetition without outside state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    board: Board,
    history: Vec<u64>,
    /// Plies since the last capture or pawn move. Kept here rather than read
    /// from the board, which caps its own clock.
    clock: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position {
    pub fn startpos() -> Self {
        Self {
            board: Board::default(),
            history: Vec::new(),
            clock: 0,
        }
    }

    pub fn from_fen(fen: &str) -> ArenaResult<Self> {
        let board = Board::from_fen(fen.trim(), false)
            .map_err(|_| ArenaError::InvalidPosition(fen.to_string()))?;
        let clock = u32::from(board.halfmove_clock());
        Ok(Self {
            board,
            history: Vec::new(),
            clock,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Side {
        self.board.side_to_move().into()
    }

    /// Plies since the last capture or pawn move.
    pub fn halfmove_clock(&self) -> u32 {
        self.clock
    }

    pub fn fullmove_number(&self) -> u16 {
        self.board.fullmove_number()
    }

    pub fn in_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    /// Compact board string (FEN).
    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    /// All legal moves; empty means the position is terminal.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        self.board.generate_moves(|piece_moves| {
            moves.extend(piece_moves);
            false
        });
        moves
    }

    pub fn has_legal_moves(&self) -> bool {
        let mut any = false;
        self.board.generate_moves(|piece_moves| {
            any = piece_moves.into_iter().next().is_some();
            any
        });
        any
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.board.is_legal(mv)
    }

    /// Play `mv`, returning the successor position.
    pub fn apply(&self, mv: Move) -> ArenaResult<Position> {
        if !self.board.is_legal(mv) {
            return Err(ArenaError::IllegalMove {
                mv: mv.to_string(),
                fen: self.fen(),
            });
        }
        let mut board = self.board.clone();
        board.play_unchecked(mv);

        // Pawn moves and captures make every earlier position unreachable.
        let (history, clock) = if board.halfmove_clock() == 0 {
            (Vec::new(), 0)
        } else {
            let mut history = self.history.clone();
            history.push(self.board.hash());
            (history, self.clock + 1)
        };
        Ok(Position {
            board,
            history,
            clock,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// Game verdict if the position is terminal.
    pub fn outcome(&self) -> Option<Outcome> {
        if !self.has_legal_moves() {
            return Some(if self.in_check() {
                Outcome {
                    result: GameResult::win_for(self.side_to_move().other()),
                    termination: Termination::Checkmate,
                }
            } else {
                draw(Termination::Stalemate)
            });
        }
        if insufficient_material(&self.board) {
            return Some(draw(Termination::InsufficientMaterial));
        }
        // Only the automatic draws end a game; nobody claims at 50 moves or
        // threefold repetition.
        if self.clock >= SEVENTY_FIVE_MOVE_PLIES {
            return Some(draw(Termination::SeventyFiveMoveRule));
        }
        let current = self.board.hash();
        let earlier = self.history.iter().filter(|&&h| h == current).count();
        if earlier + 1 >= FIVEFOLD {
            return Some(draw(Termination::FivefoldRepetition));
        }
        None
    }

    /// Standard UCI text; castling is written as the king's two-square step.
    pub fn to_uci(&self, mv: Move) -> String {
        let mut uci = format!(
            "{}{}",
            square_name(mv.from),
            square_name(self.display_destination(mv))
        );
        if let Some(promo) = mv.promotion {
            uci.push(piece_letter(promo).to_ascii_lowercase());
        }
        uci
    }

    /// Origin and destination squares as shown to humans.
    pub fn move_squares(&self, mv: Move) -> (String, String) {
        (
            square_name(mv.from),
            square_name(self.display_destination(mv)),
        )
    }

    /// Short algebraic notation for a legal move.
    pub fn to_san(&self, mv: Move) -> ArenaResult<String> {
        if !self.board.is_legal(mv) {
            return Err(ArenaError::IllegalMove {
                mv: mv.to_string(),
                fen: self.fen(),
            });
        }
        let board = &self.board;
        let piece = board.piece_on(mv.from).unwrap_or(Piece::Pawn);
        let mut san = String::with_capacity(8);

        if self.is_castle(mv) {
            san.push_str(if (mv.to.file() as u8) > (mv.from.file() as u8) {
                "O-O"
            } else {
                "O-O-O"
            });
        } else {
            let capture = board.color_on(mv.to).is_some()
                || (piece == Piece::Pawn && mv.from.file() != mv.to.file());
            if piece == Piece::Pawn {
                if capture {
                    san.push(file_char(mv.from.file()));
                    san.push('x');
                }
            } else {
                san.push(piece_letter(piece));
                san.push_str(&self.disambiguation(mv, piece));
                if capture {
                    san.push('x');
                }
            }
            san.push_str(&square_name(mv.to));
            if let Some(promo) = mv.promotion {
                san.push('=');
                san.push(piece_letter(promo));
            }
        }

        let mut after = board.clone();
        after.play_unchecked(mv);
        if !after.checkers().is_empty() {
            let mated = !Position {
                board: after,
                history: Vec::new(),
                clock: 0,
            }
            .has_legal_moves();
            san.push(if mated { '#' } else { '+' });
        }
        Ok(san)
    }

    /// Parse SAN (or UCI as a fallback) into a legal move.
    pub fn parse_san(&self, text: &str) -> ArenaResult<Move> {
        let wanted = normalize_san(text);
        if wanted.is_empty() {
            return Err(ArenaError::invalid_notation(text, "empty move text"));
        }

        let legal = self.legal_moves();
        let mut table = Vec::with_capacity(legal.len());
        for &mv in &legal {
            table.push((mv, normalize_san(&self.to_san(mv)?)));
        }

        if let Some((mv, _)) = table.iter().find(|(_, san)| *san == wanted) {
            return Ok(*mv);
        }

        // Tolerate a missing or extra capture mark / promotion '='.
        let loose_wanted = loosen(&wanted);
        let loose: Vec<Move> = table
            .iter()
            .filter(|(_, san)| loosen(san) == loose_wanted)
            .map(|(mv, _)| *mv)
            .collect();
        match loose.len() {
            1 => return Ok(loose[0]),
            n if n > 1 => return Err(ArenaError::invalid_notation(text, "ambiguous move")),
            _ => {}
        }

        // More origin detail than needed, e.g. "Nbd2" or "Nb1d2" with one knight.
        if let Some((kind, origin, dest)) = piece_origin_and_destination(&loose_wanted) {
            let matching: Vec<Move> = legal
                .iter()
                .copied()
                .filter(|&mv| {
                    let from = square_name(mv.from);
                    !self.is_castle(mv)
                        && self.board.piece_on(mv.from) == Some(kind)
                        && square_name(mv.to) == dest
                        && origin.chars().all(|c| from.contains(c))
                })
                .collect();
            match matching.len() {
                1 => return Ok(matching[0]),
                n if n > 1 => return Err(ArenaError::invalid_notation(text, "ambiguous move")),
                _ => {}
            }
        }

        if let Some((kind, dest)) = piece_and_destination(&loose_wanted) {
            let candidates = legal
                .iter()
                .filter(|&&mv| {
                    !self.is_castle(mv)
                        && self.board.piece_on(mv.from) == Some(kind)
                        && square_name(mv.to) == dest
                })
                .count();
            if candidates > 1 {
                return Err(ArenaError::invalid_notation(text, "ambiguous move"));
            }
        }

        let uci = text.trim().to_ascii_lowercase();
        if let Some(mv) = legal.iter().find(|&&mv| self.to_uci(mv) == uci) {
            return Ok(*mv);
        }

        Err(ArenaError::invalid_notation(text, "no legal move matches"))
    }

    /// Parse a move-text line such as `"1. e4 e5 2. Nf3"` from this position.
    pub fn parse_opening(&self, line: &str) -> ArenaResult<Vec<Move>> {
        let mut position = self.clone();
        let mut moves = Vec::new();
        for token in line.split_whitespace() {
            let token = strip_move_number(token);
            if token.is_empty() || GameResult::from_pgn(token).is_some() {
                continue;
            }
            let mv = position.parse_san(token)?;
            position = position.apply(mv)?;
            moves.push(mv);
        }
        Ok(moves)
    }

    fn is_castle(&self, mv: Move) -> bool {
        self.board.piece_on(mv.from) == Some(Piece::King)
            && self.board.color_on(mv.to) == Some(self.board.side_to_move())
    }

    fn display_destination(&self, mv: Move) -> Square {
        if self.is_castle(mv) {
            let file = if (mv.to.file() as u8) > (mv.from.file() as u8) {
                File::G
            } else {
                File::C
            };
            Square::new(file, mv.from.rank())
        } else {
            mv.to
        }
    }

    fn disambiguation(&self, mv: Move, piece: Piece) -> String {
        if piece == Piece::King {
            return String::new();
        }
        let rivals: Vec<Square> = self
            .legal_moves()
            .into_iter()
            .filter(|other| {
                other.to == mv.to
                    && other.from != mv.from
                    && self.board.piece_on(other.from) == Some(piece)
            })
            .map(|other| other.from)
            .collect();
        if rivals.is_empty() {
            return String::new();
        }
        let shares_file = rivals.iter().any(|sq| sq.file() == mv.from.file());
        let shares_rank = rivals.iter().any(|sq| sq.rank() == mv.from.rank());
        match (shares_file, shares_rank) {
            (false, _) => file_char(mv.from.file()).to_string(),
            (true, false) => rank_char(mv.from.rank()).to_string(),
            (true, true) => square_name(mv.from),
        }
    }
}

fn draw(termination: Termination) -> Outcome {
    Outcome {
        result: GameResult::Draw,
        termination,
    }
}

fn insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }
    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    if knights.len() + bishops.len() <= 1 {
        return true;
    }
    if !knights.is_empty() {
        return false;
    }
    // Bishops confined to one square colour can never mate.
    let mut shades = bishops
        .into_iter()
        .map(|sq| (sq.file() as u8 + sq.rank() as u8) % 2);
    match shades.next() {
        Some(first) => shades.all(|shade| shade == first),
        None => true,
    }
}

pub fn file_char(file: File) -> char {
    (b'a' + file as u8) as char
}

pub fn rank_char(rank: Rank) -> char {
    (b'1' + rank as u8) as char
}

pub fn square_name(sq: Square) -> String {
    let mut name = String::with_capacity(2);
    name.push(file_char(sq.file()));
    name.push(rank_char(sq.rank()));
    name
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn piece_from_letter(letter: char) -> Option<Piece> {
    match letter {
        'N' => Some(Piece::Knight),
        'B' => Some(Piece::Bishop),
        'R' => Some(Piece::Rook),
        'Q' => Some(Piece::Queen),
        'K' => Some(Piece::King),
        _ => None,
    }
}

/// Strip annotations and check marks, and accept zero-style castling.
fn normalize_san(text: &str) -> String {
    let trimmed = text
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'));
    let trimmed = trimmed.strip_suffix("e.p.").unwrap_or(trimmed).trim();
    match trimmed {
        "0-0" | "o-o" => "O-O".to_string(),
        "0-0-0" | "o-o-o" => "O-O-O".to_string(),
        other => other.to_string(),
    }
}

fn loosen(san: &str) -> String {
    san.chars().filter(|&c| c != 'x' && c != '=').collect()
}

/// Piece kind and destination square of a loosened SAN string.
fn piece_and_destination(loose: &str) -> Option<(Piece, String)> {
    let mut chars = loose.chars();
    let first = chars.next()?;
    let kind = piece_from_letter(first).unwrap_or(Piece::Pawn);
    let core = loose.trim_end_matches(|c| matches!(c, 'Q' | 'R' | 'B' | 'N'));
    if core.len() < 2 || !core.is_ascii() {
        return None;
    }
    let dest = &core[core.len() - 2..];
    let bytes = dest.as_bytes();
    if (b'a'..=b'h').contains(&bytes[0]) && (b'1'..=b'8').contains(&bytes[1]) {
        Some((kind, dest.to_string()))
    } else {
        None
    }
}

/// Piece kind, origin hint and destination of a piece move such as "Nb1d2".
fn piece_origin_and_destination(loose: &str) -> Option<(Piece, &str, &str)> {
    let kind = piece_from_letter(loose.chars().next()?)?;
    let rest = &loose[1..];
    if rest.len() < 3 || rest.len() > 4 || !rest.is_ascii() {
        return None;
    }
    let (origin, dest) = rest.split_at(rest.len() - 2);
    let on_board = |c: char| matches!(c, 'a'..='h' | '1'..='8');
    if !origin.chars().chain(dest.chars()).all(on_board) {
        return None;
    }
    Some((kind, origin, dest))
}

/// "1." -> "", "12...Nf6" -> "Nf6", "e4" -> "e4".
fn strip_move_number(token: &str) -> &str {
    let digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return token;
    }
    let rest = &token[digits..];
    if rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else {
        token
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod rules_tests;
