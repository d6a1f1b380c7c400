use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};

use shotledger_engine::{CorrectionPatch, Lineup, ShotCorrection, ShotId, Visibility};

use crate::error::LedgerError;
use crate::shots::parse_result;
use crate::store::{now_stamp, Store};

const CORRECTION_COLUMNS: &str = "shot_id, result, shot_type, xg, shooter, passer, lineup, \
    power_play, short_handed, distance, angle, x, y, is_turnover, visibility, updated_at";

fn correction_from_row(row: &Row<'_>) -> rusqlite::Result<ShotCorrection> {
    let result = row
        .get::<_, Option<String>>(1)?
        .map(|r| parse_result(1, &r))
        .transpose()?;
    let lineup = row
        .get::<_, Option<String>>(6)?
        .map(|json| {
            serde_json::from_str::<Lineup>(&json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()?;
    let visibility: String = row.get(14)?;
    Ok(ShotCorrection {
        shot_id: row.get(0)?,
        result,
        shot_type: row.get(2)?,
        xg: row.get(3)?,
        shooter: row.get(4)?,
        passer: row.get(5)?,
        lineup,
        power_play: row.get(7)?,
        short_handed: row.get(8)?,
        distance: row.get(9)?,
        angle: row.get(10)?,
        x: row.get(11)?,
        y: row.get(12)?,
        is_turnover: row.get(13)?,
        visibility: Visibility::from_db(&visibility),
        updated_at: row.get(15)?,
    })
}

/// Insert or replace the whole overlay row for a shot.
pub(crate) fn write_correction(conn: &Connection, c: &ShotCorrection) -> Result<(), LedgerError> {
    let lineup = c.lineup.as_ref().map(serde_json::to_string).transpose()?;
    conn.execute(
        &format!(
            "INSERT INTO shot_corrections ({CORRECTION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT(shot_id) DO UPDATE SET
                result = excluded.result,
                shot_type = excluded.shot_type,
                xg = excluded.xg,
                shooter = excluded.shooter,
                passer = excluded.passer,
                lineup = excluded.lineup,
                power_play = excluded.power_play,
                short_handed = excluded.short_handed,
                distance = excluded.distance,
                angle = excluded.angle,
                x = excluded.x,
                y = excluded.y,
                is_turnover = excluded.is_turnover,
                visibility = excluded.visibility,
                updated_at = excluded.updated_at"
        ),
        params![
            c.shot_id,
            c.result.map(|r| r.as_str()),
            c.shot_type,
            c.xg,
            c.shooter,
            c.passer,
            lineup,
            c.power_play,
            c.short_handed,
            c.distance,
            c.angle,
            c.x,
            c.y,
            c.is_turnover,
            c.visibility.as_str(),
            c.updated_at,
        ],
    )?;
    Ok(())
}

impl Store {
    pub fn correction(&self, shot_id: ShotId) -> Result<Option<ShotCorrection>, LedgerError> {
        let c = self
            .conn
            .query_row(
                &format!("SELECT {CORRECTION_COLUMNS} FROM shot_corrections WHERE shot_id = ?1"),
                params![shot_id],
                correction_from_row,
            )
            .optional()?;
        Ok(c)
    }

    pub fn corrections(&self) -> Result<HashMap<ShotId, ShotCorrection>, LedgerError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CORRECTION_COLUMNS} FROM shot_corrections"))?;
        let map = stmt
            .query_map([], correction_from_row)?
            .map(|c| c.map(|c| (c.shot_id, c)))
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(map)
    }

    fn require_shot(&self, shot_id: ShotId) -> Result<(), LedgerError> {
        match self.shot(shot_id)? {
            Some(_) => Ok(()),
            None => Err(LedgerError::ShotNotFound(shot_id)),
        }
    }

    /// Merge a partial update into the shot's overlay, creating it if needed.
    /// Fields the patch leaves out keep their current override, and the
    /// visibility state is untouched.
    pub fn save_correction(
        &mut self,
        shot_id: ShotId,
        patch: &CorrectionPatch,
    ) -> Result<ShotCorrection, LedgerError> {
        patch.validate()?;
        self.require_shot(shot_id)?;
        let mut c = self
            .correction(shot_id)?
            .unwrap_or_else(|| ShotCorrection::empty(shot_id));
        patch.apply_to(&mut c);
        c.updated_at = now_stamp();
        write_correction(&self.conn, &c)?;
        log::info!("saved correction for shot {shot_id}");
        Ok(c)
    }

    /// Drop the overlay entirely, reverting the shot to its base data and
    /// making it visible again. Returns whether an overlay existed.
    pub fn delete_correction(&mut self, shot_id: ShotId) -> Result<bool, LedgerError> {
        let n = self
            .conn
            .execute("DELETE FROM shot_corrections WHERE shot_id = ?1", params![shot_id])?;
        if n > 0 {
            log::info!("deleted correction for shot {shot_id}");
        }
        Ok(n > 0)
    }

    /// Returns whether the shot's visibility changed.
    pub fn hide_shot(&mut self, shot_id: ShotId) -> Result<bool, LedgerError> {
        self.set_visibility(shot_id, Visibility::Hidden)
    }

    /// Returns whether the shot's visibility changed. A shot without an
    /// overlay is already active, so nothing is written for it.
    pub fn unhide_shot(&mut self, shot_id: ShotId) -> Result<bool, LedgerError> {
        self.set_visibility(shot_id, Visibility::Active)
    }

    /// Only the visibility column changes; field overrides stay as they are.
    fn set_visibility(&mut self, shot_id: ShotId, visibility: Visibility) -> Result<bool, LedgerError> {
        self.require_shot(shot_id)?;
        let current = self
            .correction(shot_id)?
            .map_or(Visibility::Active, |c| c.visibility);
        if current == visibility {
            return Ok(false);
        }
        self.conn.execute(
            "INSERT INTO shot_corrections (shot_id, visibility, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(shot_id) DO UPDATE SET
                visibility = excluded.visibility,
                updated_at = excluded.updated_at",
            params![shot_id, visibility.as_str(), now_stamp()],
        )?;
        log::info!("shot {shot_id} is now {}", visibility.as_str());
        Ok(true)
    }
}
