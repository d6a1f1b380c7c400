use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, Row};

use shotledger_engine::row::NewShot;
use shotledger_engine::{
    resolve, Fingerprint, GameFilter, GameId, Lineup, ResolvedShot, ShotEvent, ShotId, ShotResult,
    SideSlots,
};

use crate::error::LedgerError;
use crate::store::Store;

pub(crate) const SHOT_COLUMNS: &str = "id, game_id, time, team1, team2, shooting_team, result, \
    shot_type, xg, xgot, shooter, passer, \
    t1_lw, t1_c, t1_rw, t1_ld, t1_rd, t1_g, t1_x, \
    t2_lw, t2_c, t2_rw, t2_ld, t2_rd, t2_g, t2_x, \
    power_play, short_handed, distance, angle, x, y";

pub(crate) fn parse_result(idx: usize, value: &str) -> rusqlite::Result<ShotResult> {
    value.parse::<ShotResult>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn slots_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<SideSlots> {
    Ok(SideSlots {
        lw: row.get(start)?,
        c: row.get(start + 1)?,
        rw: row.get(start + 2)?,
        ld: row.get(start + 3)?,
        rd: row.get(start + 4)?,
        goalkeeper: row.get(start + 5)?,
        extra_attacker: row.get(start + 6)?,
    })
}

pub(crate) fn shot_from_row(row: &Row<'_>) -> rusqlite::Result<ShotEvent> {
    let result: String = row.get(6)?;
    Ok(ShotEvent {
        id: row.get(0)?,
        game_id: row.get(1)?,
        time: row.get(2)?,
        team1: row.get(3)?,
        team2: row.get(4)?,
        shooting_team: row.get(5)?,
        result: parse_result(6, &result)?,
        shot_type: row.get(7)?,
        xg: row.get(8)?,
        xgot: row.get(9)?,
        shooter: row.get(10)?,
        passer: row.get(11)?,
        lineup: Lineup {
            home: slots_from_row(row, 12)?,
            away: slots_from_row(row, 19)?,
        },
        power_play: row.get(26)?,
        short_handed: row.get(27)?,
        distance: row.get(28)?,
        angle: row.get(29)?,
        x: row.get(30)?,
        y: row.get(31)?,
    })
}

/// Insert one validated shot. `id` is only given when restoring a snapshot.
pub(crate) fn insert_shot(
    conn: &Connection,
    id: Option<ShotId>,
    game_id: GameId,
    shot: &NewShot,
) -> rusqlite::Result<ShotId> {
    let h = &shot.lineup.home;
    let a = &shot.lineup.away;
    conn.execute(
        &format!(
            "INSERT INTO shots ({SHOT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
             ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, \
             ?27, ?28, ?29, ?30, ?31, ?32)"
        ),
        params![
            id,
            game_id,
            shot.time,
            shot.team1,
            shot.team2,
            shot.shooting_team,
            shot.result.as_str(),
            shot.shot_type,
            shot.xg,
            shot.xgot,
            shot.shooter,
            shot.passer,
            h.lw,
            h.c,
            h.rw,
            h.ld,
            h.rd,
            h.goalkeeper,
            h.extra_attacker,
            a.lw,
            a.c,
            a.rw,
            a.ld,
            a.rd,
            a.goalkeeper,
            a.extra_attacker,
            shot.power_play,
            shot.short_handed,
            shot.distance,
            shot.angle,
            shot.x,
            shot.y,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fingerprints of every stored shot across all games.
pub(crate) fn fingerprints(conn: &Connection) -> rusqlite::Result<HashSet<Fingerprint>> {
    let mut stmt = conn.prepare(&format!("SELECT {SHOT_COLUMNS} FROM shots"))?;
    let set = stmt
        .query_map([], shot_from_row)?
        .map(|s| s.map(|s| Fingerprint::from_shot(&s)))
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(set)
}

impl Store {
    /// Stored base events, hidden ones included, in insertion order.
    pub fn shots(&self, filter: GameFilter) -> Result<Vec<ShotEvent>, LedgerError> {
        let shots = match filter {
            GameFilter::All => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {SHOT_COLUMNS} FROM shots ORDER BY id"))?;
                let rows = stmt.query_map([], shot_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            GameFilter::Game(game_id) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {SHOT_COLUMNS} FROM shots WHERE game_id = ?1 ORDER BY id"
                ))?;
                let rows = stmt.query_map(params![game_id], shot_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(shots)
    }

    pub fn shot(&self, id: ShotId) -> Result<Option<ShotEvent>, LedgerError> {
        let shot = self
            .conn
            .query_row(
                &format!("SELECT {SHOT_COLUMNS} FROM shots WHERE id = ?1"),
                params![id],
                shot_from_row,
            )
            .optional()?;
        Ok(shot)
    }

    /// Stored events regardless of visibility.
    pub fn raw_shot_count(&self, filter: GameFilter) -> Result<usize, LedgerError> {
        let n: i64 = match filter {
            GameFilter::All => self
                .conn
                .query_row("SELECT COUNT(*) FROM shots", [], |r| r.get(0))?,
            GameFilter::Game(id) => self.conn.query_row(
                "SELECT COUNT(*) FROM shots WHERE game_id = ?1",
                params![id],
                |r| r.get(0),
            )?,
        };
        Ok(n as usize)
    }

    /// The analysis view: overlay applied, hidden shots dropped.
    pub fn resolved_shots(&self, filter: GameFilter) -> Result<Vec<ResolvedShot>, LedgerError> {
        let shots = self.shots(filter)?;
        let corrections = self.corrections()?;
        let resolved: Vec<ResolvedShot> = shots
            .iter()
            .filter_map(|s| resolve(s, corrections.get(&s.id)))
            .collect();
        log::debug!(
            "resolved {} of {} stored shots ({filter:?})",
            resolved.len(),
            shots.len()
        );
        Ok(resolved)
    }

    pub fn fingerprints(&self) -> Result<HashSet<Fingerprint>, LedgerError> {
        Ok(fingerprints(&self.conn)?)
    }
}
