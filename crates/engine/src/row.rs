//! Import rows as handed over by the parsing collaborator.
//!
//! A row is a column-name → string map. Column names are matched
//! case-insensitively; empty cells read as absent.

use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::model::{normalize_name, Game, Lineup, ShotResult, Side, SideSlots};

pub const COL_TIME: &str = "time";
pub const COL_TEAM1: &str = "team1";
pub const COL_TEAM2: &str = "team2";
pub const COL_SHOOTING_TEAM: &str = "shooting_team";
pub const COL_RESULT: &str = "result";
pub const COL_TYPE: &str = "type";
pub const COL_XG: &str = "xg";
pub const COL_XGOT: &str = "xgot";
pub const COL_SHOOTER: &str = "shooter";
pub const COL_PASSER: &str = "passer";
pub const COL_POWER_PLAY: &str = "pp";
pub const COL_SHORT_HANDED: &str = "sh";
pub const COL_DISTANCE: &str = "distance";
pub const COL_ANGLE: &str = "angle";
pub const COL_X: &str = "x";
pub const COL_Y: &str = "y";

/// Columns every importable row must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_TIME,
    COL_SHOOTING_TEAM,
    COL_RESULT,
    COL_SHOOTER,
    COL_DISTANCE,
    COL_ANGLE,
    COL_XG,
];

/// Slot suffixes in lineup order: lw, c, rw, ld, rd, goalkeeper, extra attacker.
const SLOT_SUFFIXES: [&str; 7] = ["lw", "c", "rw", "ld", "rd", "g", "x"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    fields: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K: AsRef<str>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.insert(k.as_ref(), v);
        }
        row
    }

    pub fn insert(&mut self, column: &str, value: impl Into<String>) {
        self.fields
            .insert(column.trim().to_ascii_lowercase(), value.into());
    }

    /// Trimmed value, `None` if the column is absent or blank.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn missing_required(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|c| self.get(c).is_none())
            .map(|c| c.to_string())
            .collect()
    }

    fn number(&self, column: &str) -> Result<Option<f64>, EngineError> {
        match self.get(column) {
            None => Ok(None),
            Some(v) => parse_decimal(v)
                .map(Some)
                .ok_or_else(|| EngineError::InvalidField {
                    column: column.into(),
                    value: v.into(),
                }),
        }
    }

    fn required_number(&self, column: &str) -> Result<f64, EngineError> {
        self.number(column)?
            .ok_or_else(|| EngineError::MissingColumns(vec![column.into()]))
    }

    fn flag(&self, column: &str) -> bool {
        matches!(
            self.get(column).map(|v| v.to_ascii_lowercase()).as_deref(),
            Some("1" | "true" | "yes" | "y" | "x")
        )
    }

    fn text(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }

    fn side_slots(&self, prefix: &str) -> SideSlots {
        let slot = |suffix: &str| self.text(&format!("{prefix}_{suffix}"));
        SideSlots {
            lw: slot(SLOT_SUFFIXES[0]),
            c: slot(SLOT_SUFFIXES[1]),
            rw: slot(SLOT_SUFFIXES[2]),
            ld: slot(SLOT_SUFFIXES[3]),
            rd: slot(SLOT_SUFFIXES[4]),
            goalkeeper: slot(SLOT_SUFFIXES[5]),
            extra_attacker: slot(SLOT_SUFFIXES[6]),
        }
    }

    /// Every lineup column name for one side, e.g. `t1_lw` … `t1_x`.
    pub fn lineup_columns(side: Side) -> Vec<String> {
        let prefix = side_prefix(side);
        SLOT_SUFFIXES
            .iter()
            .map(|s| format!("{prefix}_{s}"))
            .collect()
    }
}

/// Finite decimal, accepting a comma as the decimal separator.
pub(crate) fn parse_decimal(s: &str) -> Option<f64> {
    let s = s.trim();
    s.parse::<f64>()
        .or_else(|_| s.replacen(',', ".", 1).parse::<f64>())
        .ok()
        .filter(|n| n.is_finite())
}

/// Row spelling of a team, or the game's when they name the same team.
fn canonical_team(value: Option<&str>, game_team: &str) -> String {
    match value {
        Some(v) if normalize_name(v) != normalize_name(game_team) => v.to_string(),
        _ => game_team.to_string(),
    }
}

fn side_prefix(side: Side) -> &'static str {
    match side {
        Side::Home => "t1",
        Side::Away => "t2",
    }
}

/// A validated row, ready to be inserted under a game.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShot {
    pub time: String,
    pub team1: String,
    pub team2: String,
    pub shooting_team: String,
    pub result: ShotResult,
    pub shot_type: String,
    pub xg: f64,
    pub xgot: Option<f64>,
    pub shooter: String,
    pub passer: Option<String>,
    pub lineup: Lineup,
    pub power_play: bool,
    pub short_handed: bool,
    pub distance: f64,
    pub angle: f64,
    pub x: f64,
    pub y: f64,
}

impl NewShot {
    /// Team names fall back to the game's when the row omits them, and take
    /// the game's spelling when they differ only in case or spacing. The
    /// shooting team must name one of the two teams and is stored in that
    /// team's spelling.
    pub fn from_row(row: &RawRow, game: &Game) -> Result<Self, EngineError> {
        let missing = row.missing_required();
        if !missing.is_empty() {
            return Err(EngineError::MissingColumns(missing));
        }

        let result: ShotResult = row.get(COL_RESULT).unwrap_or_default().parse()?;

        let team1 = canonical_team(row.get(COL_TEAM1), &game.team1);
        let team2 = canonical_team(row.get(COL_TEAM2), &game.team2);
        let shooting = row.get(COL_SHOOTING_TEAM).unwrap_or_default();
        let shooting_team = match normalize_name(shooting) {
            n if n == normalize_name(&team1) => team1.clone(),
            n if n == normalize_name(&team2) => team2.clone(),
            _ => {
                return Err(EngineError::UnknownShootingTeam {
                    team: shooting.to_string(),
                    team1,
                    team2,
                })
            }
        };

        Ok(Self {
            time: row.text(COL_TIME).unwrap_or_default(),
            team1,
            team2,
            shooting_team,
            result,
            shot_type: row.text(COL_TYPE).unwrap_or_default(),
            xg: row.required_number(COL_XG)?,
            xgot: row.number(COL_XGOT)?,
            shooter: row.text(COL_SHOOTER).unwrap_or_default(),
            passer: row.text(COL_PASSER),
            lineup: Lineup {
                home: row.side_slots(side_prefix(Side::Home)),
                away: row.side_slots(side_prefix(Side::Away)),
            },
            power_play: row.flag(COL_POWER_PLAY),
            short_handed: row.flag(COL_SHORT_HANDED),
            distance: row.required_number(COL_DISTANCE)?,
            angle: row.required_number(COL_ANGLE)?,
            x: row.number(COL_X)?.unwrap_or(0.0),
            y: row.number(COL_Y)?.unwrap_or(0.0),
        })
    }
}
