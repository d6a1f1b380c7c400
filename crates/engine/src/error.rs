use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Import row lacks one or more required columns.
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// A column is present but its value cannot be interpreted.
    #[error("column '{column}': cannot parse '{value}'")]
    InvalidField { column: String, value: String },
    /// Shooting team is neither of the game's teams.
    #[error("shooting team '{team}' is neither '{team1}' nor '{team2}'")]
    UnknownShootingTeam {
        team: String,
        team1: String,
        team2: String,
    },
    /// Unknown shot result label.
    #[error("unknown shot result: '{0}'")]
    UnknownResult(String),
    /// Unknown metric key.
    #[error("unknown metric: '{0}'")]
    UnknownMetric(String),
    /// Game filter is neither "all" nor a numeric id.
    #[error("invalid game filter: '{0}' (expected \"all\" or a game id)")]
    InvalidGameFilter(String),
    /// Rendered field has no area.
    #[error("field dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },
}
