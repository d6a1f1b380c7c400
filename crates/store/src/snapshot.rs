//! Whole-ledger snapshots and the sinks they are pushed to.

use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::params;
use serde::{Deserialize, Serialize};

use shotledger_engine::row::NewShot;
use shotledger_engine::{Game, GameId, ShotCorrection, ShotEvent};

use crate::corrections::write_correction;
use crate::error::{LedgerError, SinkError};
use crate::games::DATE_FORMAT;
use crate::shots::insert_shot;
use crate::store::{now_stamp, Store};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameAlias {
    pub game_id: GameId,
    pub display_name: String,
}

/// Everything needed to rebuild a ledger byte-for-byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub format_version: u32,
    pub exported_at: String,
    pub games: Vec<Game>,
    pub aliases: Vec<GameAlias>,
    pub shots: Vec<ShotEvent>,
    pub corrections: Vec<ShotCorrection>,
}

impl LedgerSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let snapshot: LedgerSnapshot = serde_json::from_slice(bytes)?;
        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(LedgerError::SnapshotVersion(snapshot.format_version));
        }
        Ok(snapshot)
    }
}

fn new_shot(s: &ShotEvent) -> NewShot {
    NewShot {
        time: s.time.clone(),
        team1: s.team1.clone(),
        team2: s.team2.clone(),
        shooting_team: s.shooting_team.clone(),
        result: s.result,
        shot_type: s.shot_type.clone(),
        xg: s.xg,
        xgot: s.xgot,
        shooter: s.shooter.clone(),
        passer: s.passer.clone(),
        lineup: s.lineup.clone(),
        power_play: s.power_play,
        short_handed: s.short_handed,
        distance: s.distance,
        angle: s.angle,
        x: s.x,
        y: s.y,
    }
}

impl Store {
    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let mut corrections: Vec<ShotCorrection> = self.corrections()?.into_values().collect();
        corrections.sort_by_key(|c| c.shot_id);

        let aliases = self
            .games()?
            .into_iter()
            .filter_map(|g| {
                g.alias.map(|display_name| GameAlias {
                    game_id: g.game.id,
                    display_name,
                })
            })
            .collect();

        Ok(LedgerSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            exported_at: now_stamp(),
            games: self.all_games()?,
            aliases,
            shots: self.shots(shotledger_engine::GameFilter::All)?,
            corrections,
        })
    }

    /// Replace the whole ledger with the snapshot contents, keeping ids.
    pub fn restore(&mut self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM shot_corrections; DELETE FROM game_aliases; DELETE FROM shots; DELETE FROM games;",
        )?;
        for g in &snapshot.games {
            tx.execute(
                "INSERT INTO games (id, name, date, team1, team2) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![g.id, g.name, g.date.format(DATE_FORMAT).to_string(), g.team1, g.team2],
            )?;
        }
        for a in &snapshot.aliases {
            tx.execute(
                "INSERT INTO game_aliases (game_id, display_name) VALUES (?1, ?2)",
                params![a.game_id, a.display_name],
            )?;
        }
        for s in &snapshot.shots {
            insert_shot(&tx, Some(s.id), s.game_id, &new_shot(s))?;
        }
        for c in &snapshot.corrections {
            write_correction(&tx, c)?;
        }
        tx.commit()?;
        log::info!(
            "restored {} game(s), {} shot(s), {} correction(s)",
            snapshot.games.len(),
            snapshot.shots.len(),
            snapshot.corrections.len()
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Destination for serialized snapshots.
pub trait BlobSink {
    fn upload(&mut self, blob: &[u8]) -> Result<(), SinkError>;

    /// Human-readable target, for log lines.
    fn describe(&self) -> String;
}

/// Writes the snapshot to a file through a temp file and rename, so a
/// reader never sees a half-written blob.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError {
    let path = path.to_path_buf();
    move |source| SinkError::Io { path, source }
}

impl BlobSink for FileSink {
    fn upload(&mut self, blob: &[u8]) -> Result<(), SinkError> {
        let tmp = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&tmp).map_err(io_error(&tmp))?;
        file.write_all(blob).map_err(io_error(&tmp))?;
        file.sync_all().map_err(io_error(&tmp))?;
        std::fs::rename(&tmp, &self.path).map_err(io_error(&self.path))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
