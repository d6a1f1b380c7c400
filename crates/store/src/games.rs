use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use shotledger_engine::{Game, GameId};

use crate::error::LedgerError;
use crate::store::Store;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// One game as listed to the user: alias-aware name plus shot counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSummary {
    pub game: Game,
    pub alias: Option<String>,
    /// Alias when set, otherwise the imported name.
    pub display_name: String,
    /// Every stored event, hidden ones included.
    pub shot_count: usize,
    pub hidden_count: usize,
}

pub(crate) fn game_from_row(row: &Row<'_>) -> rusqlite::Result<Game> {
    let date: String = row.get(2)?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Game {
        id: row.get(0)?,
        name: row.get(1)?,
        date,
        team1: row.get(3)?,
        team2: row.get(4)?,
    })
}

impl Store {
    pub fn game(&self, id: GameId) -> Result<Option<Game>, LedgerError> {
        let game = self
            .conn
            .query_row(
                "SELECT id, name, date, team1, team2 FROM games WHERE id = ?1",
                params![id],
                game_from_row,
            )
            .optional()?;
        Ok(game)
    }

    /// Existing game with the same normalized name on the same date.
    pub fn find_game(&self, name: &str, date: NaiveDate) -> Result<Option<Game>, LedgerError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, date, team1, team2 FROM games WHERE date = ?1 ORDER BY id")?;
        let games = stmt
            .query_map(params![date.format(DATE_FORMAT).to_string()], game_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games.into_iter().find(|g| g.matches(name, date)))
    }

    pub fn all_games(&self) -> Result<Vec<Game>, LedgerError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, date, team1, team2 FROM games ORDER BY date, id")?;
        let games = stmt
            .query_map([], game_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    /// Games ordered by date, then id.
    pub fn games(&self) -> Result<Vec<GameSummary>, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.name, g.date, g.team1, g.team2, a.display_name,
                    (SELECT COUNT(*) FROM shots s WHERE s.game_id = g.id),
                    (SELECT COUNT(*) FROM shots s
                       JOIN shot_corrections c ON c.shot_id = s.id
                      WHERE s.game_id = g.id AND c.visibility = 'hidden')
               FROM games g
               LEFT JOIN game_aliases a ON a.game_id = g.id
              ORDER BY g.date, g.id",
        )?;
        let rows = stmt.query_map([], |row| {
            let game = game_from_row(row)?;
            let alias: Option<String> = row.get(5)?;
            let shot_count: i64 = row.get(6)?;
            let hidden_count: i64 = row.get(7)?;
            Ok(GameSummary {
                display_name: alias.clone().unwrap_or_else(|| game.name.clone()),
                game,
                alias,
                shot_count: shot_count as usize,
                hidden_count: hidden_count as usize,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn alias(&self, game_id: GameId) -> Result<Option<String>, LedgerError> {
        let alias = self
            .conn
            .query_row(
                "SELECT display_name FROM game_aliases WHERE game_id = ?1",
                params![game_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(alias)
    }

    /// Set the display name of a game. A blank alias clears it.
    pub fn set_alias(&mut self, game_id: GameId, display_name: &str) -> Result<(), LedgerError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            self.clear_alias(game_id)?;
            return Ok(());
        }
        if self.game(game_id)?.is_none() {
            return Err(LedgerError::GameNotFound(game_id));
        }
        self.conn.execute(
            "INSERT INTO game_aliases (game_id, display_name) VALUES (?1, ?2)
             ON CONFLICT(game_id) DO UPDATE SET display_name = excluded.display_name",
            params![game_id, display_name],
        )?;
        Ok(())
    }

    /// Returns whether an alias was removed.
    pub fn clear_alias(&mut self, game_id: GameId) -> Result<bool, LedgerError> {
        let n = self
            .conn
            .execute("DELETE FROM game_aliases WHERE game_id = ?1", params![game_id])?;
        Ok(n > 0)
    }

    /// Remove a game with its shots, corrections and alias.
    pub fn delete_game(&mut self, game_id: GameId) -> Result<(), LedgerError> {
        let n = self
            .conn
            .execute("DELETE FROM games WHERE id = ?1", params![game_id])?;
        if n == 0 {
            return Err(LedgerError::GameNotFound(game_id));
        }
        log::info!("deleted game {game_id}");
        Ok(())
    }
}
