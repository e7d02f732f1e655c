//! Tournament scoring: 1 for a win, 0.5 each for a draw.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::{GameResult, Side};

/// Ordering among participants with equal points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep participant registration order (stable points-only sort).
    #[default]
    Registration,
    /// More wins first, then registration order.
    MostWins,
    /// Participant name, ascending.
    Alphabetical,
}

impl TieBreak {
    fn compare(self, a: &Standing, b: &Standing) -> Ordering {
        match self {
            TieBreak::Registration => Ordering::Equal,
            TieBreak::MostWins => b.wins.cmp(&a.wins),
            TieBreak::Alphabetical => a.participant.cmp(&b.participant),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub participant: String,
    pub points: f64,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    /// Games that ended without a result (error or stop).
    pub unfinished: u32,
}

impl Standing {
    fn new(participant: &str) -> Self {
        Self {
            participant: participant.to_string(),
            points: 0.0,
            wins: 0,
            draws: 0,
            losses: 0,
            unfinished: 0,
        }
    }

    pub fn games(&self) -> u32 {
        self.wins + self.draws + self.losses
    }
}

/// Running standings, kept in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    entries: Vec<Standing>,
}

impl Standings {
    pub fn new(participants: &[String]) -> Self {
        Self {
            entries: participants.iter().map(|p| Standing::new(p)).collect(),
        }
    }

    fn entry(&mut self, participant: &str) -> &mut Standing {
        let index = match self.entries.iter().position(|s| s.participant == participant) {
            Some(index) => index,
            None => {
                self.entries.push(Standing::new(participant));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }

    /// Merge one game.
    pub fn record(&mut self, white: &str, black: &str, result: GameResult) {
        for (name, side) in [(white, Side::White), (black, Side::Black)] {
            let entry = self.entry(name);
            match result.score_for(side) {
                Some(score) => {
                    entry.points += score;
                    if score == 1.0 {
                        entry.wins += 1;
                    } else if score == 0.0 {
                        entry.losses += 1;
                    } else {
                        entry.draws += 1;
                    }
                }
                None => entry.unfinished += 1,
            }
        }
    }

    pub fn total_points(&self) -> f64 {
        self.entries.iter().map(|s| s.points).sum()
    }

    /// Entries by descending points, ties ordered by `tie_break`.
    pub fn sorted(&self, tie_break: TieBreak) -> Vec<Standing> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| {
            b.points
                .partial_cmp(&a.points)
                .unwrap_or(Ordering::Equal)
                .then_with(|| tie_break.compare(a, b))
        });
        sorted
    }
}

#[cfg(test)]
#[path = "standings_tests.rs"]
mod standings_tests;
