//! Deduplicating batch import.
//!
//! Every row is fingerprinted and checked against the fingerprints of the
//! whole ledger, not just the target game, so a file imported under a
//! different game name is still caught. Duplicates within the same batch are
//! caught too. The batch runs in one transaction.

use chrono::NaiveDate;
use rusqlite::params;
use serde::Serialize;

use shotledger_engine::row::{NewShot, RawRow};
use shotledger_engine::{Fingerprint, Game, GameId};

use crate::error::LedgerError;
use crate::games::{game_from_row, DATE_FORMAT};
use crate::shots::{fingerprints, insert_shot};
use crate::store::Store;

/// How many skipped rows are echoed back for the user.
pub const DUPLICATE_SAMPLE_LIMIT: usize = 3;

/// Identifies the game a batch belongs to. Matching is by normalized name
/// and date; the team names are used only when the game is created.
#[derive(Debug, Clone, PartialEq)]
pub struct GameKey {
    pub name: String,
    pub date: NaiveDate,
    pub team1: String,
    pub team2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateSample {
    /// 1-based position in the batch.
    pub row: usize,
    pub time: String,
    pub shooter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    Inserted,
    /// Every valid row was already in the ledger.
    AllDuplicates,
    /// Nothing valid in the batch at all.
    NothingToImport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportResult {
    pub outcome: ImportOutcome,
    /// `None` when the game was created for this batch and then rolled back.
    pub game_id: Option<GameId>,
    pub game_created: bool,
    pub game_rolled_back: bool,
    pub inserted: usize,
    pub duplicates: usize,
    pub duplicate_samples: Vec<DuplicateSample>,
    pub rejected: Vec<RejectedRow>,
}

impl Store {
    /// Import a batch of rows under the game identified by `key`.
    ///
    /// The game is found or created first. If the batch ends with zero
    /// insertions a freshly created game is removed again, so no empty game
    /// is left behind.
    pub fn import_shots(&mut self, key: &GameKey, rows: &[RawRow]) -> Result<ImportResult, LedgerError> {
        let existing = self.find_game(&key.name, key.date)?;
        let tx = self.conn.transaction()?;

        let (game, game_created) = match existing {
            Some(game) => (game, false),
            None => {
                tx.execute(
                    "INSERT INTO games (name, date, team1, team2) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        key.name.trim(),
                        key.date.format(DATE_FORMAT).to_string(),
                        key.team1,
                        key.team2
                    ],
                )?;
                let id = tx.last_insert_rowid();
                let game: Game = tx.query_row(
                    "SELECT id, name, date, team1, team2 FROM games WHERE id = ?1",
                    params![id],
                    game_from_row,
                )?;
                log::info!("created game {} '{}' on {}", game.id, game.name, game.date);
                (game, true)
            }
        };

        let mut seen = fingerprints(&tx)?;
        log::debug!("dedup set holds {} fingerprints", seen.len());

        let mut inserted = 0;
        let mut duplicates = 0;
        let mut duplicate_samples = Vec::new();
        let mut rejected = Vec::new();

        for (i, row) in rows.iter().enumerate() {
            let row_no = i + 1;
            let shot = match NewShot::from_row(row, &game) {
                Ok(shot) => shot,
                Err(e) => {
                    log::debug!("row {row_no} rejected: {e}");
                    rejected.push(RejectedRow {
                        row: row_no,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            // Inserting the fingerprint as we go also catches repeats
            // inside this batch.
            if !seen.insert(Fingerprint::from_row(row)) {
                duplicates += 1;
                if duplicate_samples.len() < DUPLICATE_SAMPLE_LIMIT {
                    duplicate_samples.push(DuplicateSample {
                        row: row_no,
                        time: shot.time.clone(),
                        shooter: shot.shooter.clone(),
                    });
                }
                continue;
            }

            insert_shot(&tx, None, game.id, &shot)?;
            inserted += 1;
        }

        let game_rolled_back = inserted == 0 && game_created;
        if game_rolled_back {
            tx.execute("DELETE FROM games WHERE id = ?1", params![game.id])?;
            log::info!("no new shots; removed newly created game {}", game.id);
        }
        tx.commit()?;

        let outcome = if inserted > 0 {
            ImportOutcome::Inserted
        } else if duplicates > 0 {
            ImportOutcome::AllDuplicates
        } else {
            ImportOutcome::NothingToImport
        };
        log::info!(
            "import into game {}: {inserted} inserted, {duplicates} duplicate(s), {} rejected",
            game.id,
            rejected.len()
        );

        Ok(ImportResult {
            outcome,
            game_id: (!game_rolled_back).then_some(game.id),
            game_created,
            game_rolled_back,
            inserted,
            duplicates,
            duplicate_samples,
            rejected,
        })
    }
}
