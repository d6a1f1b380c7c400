use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub type GameId = i64;
pub type ShotId = i64;

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShotResult {
    Goal,
    Saved,
    Missed,
    Blocked,
}

impl ShotResult {
    pub const ALL: [ShotResult; 4] = [Self::Goal, Self::Saved, Self::Missed, Self::Blocked];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Goal => "Goal",
            Self::Saved => "Saved",
            Self::Missed => "Missed",
            Self::Blocked => "Blocked",
        }
    }

    /// Saved or Goal: the goalkeeper had to deal with it.
    pub fn is_on_goal(&self) -> bool {
        matches!(self, Self::Goal | Self::Saved)
    }
}

impl std::fmt::Display for ShotResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShotResult {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "goal" => Ok(Self::Goal),
            "saved" | "save" => Ok(Self::Saved),
            "missed" | "miss" | "wide" => Ok(Self::Missed),
            "blocked" | "block" => Ok(Self::Blocked),
            _ => Err(EngineError::UnknownResult(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Sides + lineup
// ---------------------------------------------------------------------------

/// Home is team1, Away is team2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// The seven roster slots one side fills for a shot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideSlots {
    pub lw: Option<String>,
    pub c: Option<String>,
    pub rw: Option<String>,
    pub ld: Option<String>,
    pub rd: Option<String>,
    pub goalkeeper: Option<String>,
    pub extra_attacker: Option<String>,
}

impl SideSlots {
    pub fn slots(&self) -> [Option<&str>; 7] {
        [
            self.lw.as_deref(),
            self.c.as_deref(),
            self.rw.as_deref(),
            self.ld.as_deref(),
            self.rd.as_deref(),
            self.goalkeeper.as_deref(),
            self.extra_attacker.as_deref(),
        ]
    }

    /// Exact name match against any of the seven slots.
    pub fn contains(&self, player: &str) -> bool {
        self.slots().iter().any(|s| *s == Some(player))
    }

    pub fn has_extra_attacker(&self) -> bool {
        self.extra_attacker.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lineup {
    pub home: SideSlots,
    pub away: SideSlots,
}

impl Lineup {
    pub fn side(&self, side: Side) -> &SideSlots {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideSlots {
        match side {
            Side::Home => &mut self.home,
            Side::Away => &mut self.away,
        }
    }

    /// Which side lists the player. Home wins if a name appears on both.
    pub fn side_of(&self, player: &str) -> Option<Side> {
        if self.home.contains(player) {
            Some(Side::Home)
        } else if self.away.contains(player) {
            Some(Side::Away)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub date: NaiveDate,
    pub team1: String,
    pub team2: String,
}

impl Game {
    /// Case and whitespace insensitive name comparison plus exact date.
    pub fn matches(&self, name: &str, date: NaiveDate) -> bool {
        self.date == date && normalize_name(&self.name) == normalize_name(name)
    }
}

/// Lower-cases and collapses runs of whitespace. Used for game and team names.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One recorded attempt at goal. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotEvent {
    pub id: ShotId,
    pub game_id: GameId,
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

/// Tagged visibility state of a shot, independent of field overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Active,
    Hidden,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Active => "active",
            Visibility::Hidden => "hidden",
        }
    }

    /// Unknown values read back as Active so a bad row never hides data.
    pub fn from_db(s: &str) -> Self {
        match s {
            "hidden" => Visibility::Hidden,
            _ => Visibility::Active,
        }
    }
}

/// Analyst overlay attached 1:1 to a shot. `None` fields fall through to the
/// base event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotCorrection {
    pub shot_id: ShotId,
    pub result: Option<ShotResult>,
    pub shot_type: Option<String>,
    pub xg: Option<f64>,
    pub shooter: Option<String>,
    pub passer: Option<String>,
    pub lineup: Option<Lineup>,
    pub power_play: Option<bool>,
    pub short_handed: Option<bool>,
    pub distance: Option<f64>,
    pub angle: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub is_turnover: bool,
    pub visibility: Visibility,
    pub updated_at: String,
}

impl ShotCorrection {
    pub fn empty(shot_id: ShotId) -> Self {
        Self {
            shot_id,
            ..Default::default()
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility == Visibility::Hidden
    }
}

/// Partial update for a correction. Only `Some` fields are written; the rest
/// of an existing overlay is left as it was. Visibility is not part of a
/// patch and is toggled separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionPatch {
    pub result: Option<ShotResult>,
    pub shot_type: Option<String>,
    pub xg: Option<f64>,
    pub shooter: Option<String>,
    pub passer: Option<String>,
    pub lineup: Option<Lineup>,
    pub power_play: Option<bool>,
    pub short_handed: Option<bool>,
    pub distance: Option<f64>,
    pub angle: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub is_turnover: Option<bool>,
}

impl CorrectionPatch {
    pub fn is_empty(&self) -> bool {
        *self == CorrectionPatch::default()
    }

    /// Numeric overrides must be finite, as imported values are.
    pub fn validate(&self) -> Result<(), EngineError> {
        let numbers = [
            ("xg", self.xg),
            ("distance", self.distance),
            ("angle", self.angle),
            ("x", self.x),
            ("y", self.y),
        ];
        for (column, value) in numbers {
            if let Some(v) = value.filter(|v| !v.is_finite()) {
                return Err(EngineError::InvalidField {
                    column: column.to_string(),
                    value: v.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, c: &mut ShotCorrection) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }
        set(&mut c.result, &self.result);
        set(&mut c.shot_type, &self.shot_type);
        set(&mut c.xg, &self.xg);
        set(&mut c.shooter, &self.shooter);
        set(&mut c.passer, &self.passer);
        set(&mut c.lineup, &self.lineup);
        set(&mut c.power_play, &self.power_play);
        set(&mut c.short_handed, &self.short_handed);
        set(&mut c.distance, &self.distance);
        set(&mut c.angle, &self.angle);
        set(&mut c.x, &self.x);
        set(&mut c.y, &self.y);
        if let Some(t) = self.is_turnover {
            c.is_turnover = t;
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved view
// ---------------------------------------------------------------------------

/// Base event with overlay fields applied. Derived on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedShot {
    pub id: ShotId,
    pub game_id: GameId,
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
    pub is_turnover: bool,
    pub corrected: bool,
}

impl ResolvedShot {
    pub fn shooting_side(&self) -> Side {
        if self.shooting_team == self.team2 && self.shooting_team != self.team1 {
            Side::Away
        } else {
            Side::Home
        }
    }

    pub fn is_home_shot(&self) -> bool {
        self.shooting_side() == Side::Home
    }

    pub fn team_name(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.team1,
            Side::Away => &self.team2,
        }
    }

    pub fn defending_team(&self) -> &str {
        self.team_name(self.shooting_side().other())
    }

    pub fn involves_team(&self, team: &str) -> bool {
        self.team1 == team || self.team2 == team
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameFilter {
    All,
    Game(GameId),
}

impl GameFilter {
    pub fn includes(&self, game_id: GameId) -> bool {
        match self {
            GameFilter::All => true,
            GameFilter::Game(id) => *id == game_id,
        }
    }
}

impl FromStr for GameFilter {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(GameFilter::All);
        }
        s.parse::<GameId>()
            .map(GameFilter::Game)
            .map_err(|_| EngineError::InvalidGameFilter(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_parsing_is_lenient() {
        assert_eq!(" goal ".parse::<ShotResult>().unwrap(), ShotResult::Goal);
        assert_eq!("SAVED".parse::<ShotResult>().unwrap(), ShotResult::Saved);
        assert_eq!("Block".parse::<ShotResult>().unwrap(), ShotResult::Blocked);
        assert!("post".parse::<ShotResult>().is_err());
    }

    #[test]
    fn game_name_match_ignores_case_and_spacing() {
        let game = Game {
            id: 1,
            name: "Lions  vs Tigers".into(),
            date: NaiveDate::from_ymd_opt(2024, 10, 5).unwrap(),
            team1: "Lions".into(),
            team2: "Tigers".into(),
        };
        let date = NaiveDate::from_ymd_opt(2024, 10, 5).unwrap();
        assert!(game.matches(" lions vs TIGERS ", date));
        assert!(!game.matches("lions vs tigers", date.succ_opt().unwrap()));
    }

    #[test]
    fn patch_leaves_unsupplied_fields_alone() {
        let mut c = ShotCorrection::empty(7);
        c.shooter = Some("Alice".into());
        c.visibility = Visibility::Hidden;

        let patch = CorrectionPatch {
            result: Some(ShotResult::Goal),
            ..Default::default()
        };
        patch.apply_to(&mut c);

        assert_eq!(c.result, Some(ShotResult::Goal));
        assert_eq!(c.shooter.as_deref(), Some("Alice"));
        assert_eq!(c.visibility, Visibility::Hidden);
    }

    #[test]
    fn patch_with_non_finite_number_is_invalid() {
        let patch = CorrectionPatch {
            xg: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(
            patch.validate(),
            Err(EngineError::InvalidField { ref column, .. }) if column == "xg"
        ));
        let patch = CorrectionPatch {
            angle: Some(f64::NEG_INFINITY),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        let patch = CorrectionPatch {
            distance: Some(-3.5),
            ..Default::default()
        };
        assert_eq!(patch.validate(), Ok(()));
    }

    #[test]
    fn game_filter_parses() {
        assert_eq!("all".parse::<GameFilter>().unwrap(), GameFilter::All);
        assert_eq!("12".parse::<GameFilter>().unwrap(), GameFilter::Game(12));
        assert!("twelve".parse::<GameFilter>().is_err());
    }
}
