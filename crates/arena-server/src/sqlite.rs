//! SQLite-backed record sink.
//!
//! One row per finished match in a `games` table, created on connect.
//! Dates are stored as fixed-width RFC 3339 text so they sort as strings.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use arena_core::{
    ArenaError, ArenaResult, GameResult, HistoryFilter, MatchRecord, RecordId, Termination,
    TournamentId,
};
use arena_runner::RecordSink;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

const CREATE_GAMES: &str = "\
CREATE TABLE IF NOT EXISTS games (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    white TEXT NOT NULL,
    black TEXT NOT NULL,
    result TEXT NOT NULL,
    termination TEXT,
    pgn TEXT NOT NULL,
    moves INTEGER NOT NULL,
    opening TEXT NOT NULL,
    date TEXT NOT NULL,
    tournament_id TEXT,
    analysis_data TEXT NOT NULL DEFAULT 'null'
)";

const INSERT_GAME: &str = "\
INSERT INTO games (white, black, result, termination, pgn, moves, opening, date, tournament_id, analysis_data)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const SELECT_GAMES: &str = "\
SELECT id, white, black, result, termination, pgn, moves, opening, date, tournament_id, analysis_data
FROM games
WHERE (?1 IS NULL OR white = ?1 OR black = ?1)
  AND (?2 IS NULL OR tournament_id = ?2)
  AND (?3 IS NULL OR date >= ?3)
ORDER BY id ASC";

#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    pub async fn connect(url: &str) -> ArenaResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(persistence)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(persistence)?;
        let sink = Self { pool };
        sink.migrate().await?;
        info!(url, "connected to match database");
        Ok(sink)
    }

    /// Private in-memory database. A single connection that never expires
    /// keeps the data alive for the life of the sink.
    pub async fn in_memory() -> ArenaResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(persistence)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(persistence)?;
        let sink = Self { pool };
        sink.migrate().await?;
        Ok(sink)
    }

    async fn migrate(&self) -> ArenaResult<()> {
        sqlx::query(CREATE_GAMES)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordSink for SqliteSink {
    async fn save_match_record(&self, record: &MatchRecord) -> ArenaResult<RecordId> {
        let analysis = serde_json::to_string(&record.analysis).map_err(persistence)?;
        let done = sqlx::query(INSERT_GAME)
            .bind(&record.white)
            .bind(&record.black)
            .bind(record.result.as_pgn())
            .bind(record.termination.map(Termination::as_str))
            .bind(&record.transcript)
            .bind(i64::from(record.ply_count))
            .bind(&record.opening)
            .bind(format_date(record.played_at))
            .bind(record.tournament_id.map(|id| id.to_string()))
            .bind(analysis)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        let id = done.last_insert_rowid();
        debug!(record_id = id, white = %record.white, black = %record.black, "stored match record");
        Ok(id)
    }

    async fn load_match_history(&self, filter: &HistoryFilter) -> ArenaResult<Vec<MatchRecord>> {
        let rows = sqlx::query(SELECT_GAMES)
            .bind(filter.participant.as_deref())
            .bind(filter.tournament_id.map(|id| id.to_string()))
            .bind(filter.since.map(format_date))
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;
        let records = rows.iter().map(decode_row).collect::<ArenaResult<Vec<_>>>()?;
        Ok(filter.apply(records))
    }
}

fn persistence(err: impl Display) -> ArenaError {
    ArenaError::Persistence(err.to_string())
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_row(row: &SqliteRow) -> ArenaResult<MatchRecord> {
    let result: String = row.try_get("result").map_err(persistence)?;
    let result = GameResult::from_pgn(&result)
        .ok_or_else(|| persistence(format!("unknown result '{result}'")))?;
    let termination = row
        .try_get::<Option<String>, _>("termination")
        .map_err(persistence)?
        .map(|text| {
            Termination::parse(&text)
                .ok_or_else(|| persistence(format!("unknown termination '{text}'")))
        })
        .transpose()?;
    let date: String = row.try_get("date").map_err(persistence)?;
    let played_at = DateTime::parse_from_rfc3339(&date)
        .map_err(persistence)?
        .with_timezone(&Utc);
    let tournament_id = row
        .try_get::<Option<String>, _>("tournament_id")
        .map_err(persistence)?
        .map(|text| {
            serde_json::from_value::<TournamentId>(serde_json::Value::String(text))
                .map_err(persistence)
        })
        .transpose()?;
    let analysis: String = row.try_get("analysis_data").map_err(persistence)?;
    let ply_count: i64 = row.try_get("moves").map_err(persistence)?;

    Ok(MatchRecord {
        id: Some(row.try_get("id").map_err(persistence)?),
        white: row.try_get("white").map_err(persistence)?,
        black: row.try_get("black").map_err(persistence)?,
        result,
        termination,
        transcript: row.try_get("pgn").map_err(persistence)?,
        ply_count: u32::try_from(ply_count).map_err(persistence)?,
        opening: row.try_get("opening").map_err(persistence)?,
        played_at,
        tournament_id,
        analysis: serde_json::from_str(&analysis).map_err(persistence)?,
    })
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod sqlite_tests;
