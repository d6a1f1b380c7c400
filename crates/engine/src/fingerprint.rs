//! Content fingerprint used to detect re-imported shots.
//!
//! A fingerprint covers a fixed identifying subset of fields: time, shooting
//! team, shooter, distance, angle and xG. Numeric-looking values are parsed
//! and re-rendered with [`FINGERPRINT_DECIMALS`] places, text is trimmed and
//! lower-cased, so `"5.0"`, `"5"` and `5.0_f64` all hash the same.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::ShotEvent;
use crate::row::{
    parse_decimal, RawRow, COL_ANGLE, COL_DISTANCE, COL_SHOOTER, COL_SHOOTING_TEAM, COL_TIME,
    COL_XG,
};

/// Fixed precision numbers are rendered with before hashing.
/// Changing it invalidates every stored fingerprint.
pub const FINGERPRINT_DECIMALS: usize = 4;

const DELIMITER: &str = "|";

/// A single identifying value, as it arrived.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    Missing,
}

impl FieldValue<'_> {
    pub fn normalized(&self) -> String {
        match *self {
            FieldValue::Number(n) => render_number(n),
            FieldValue::Text(s) => match parse_decimal(s) {
                Some(n) => render_number(n),
                None => s.trim().to_lowercase(),
            },
            FieldValue::Missing => String::new(),
        }
    }
}

fn render_number(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string().to_lowercase();
    }
    let s = format!("{:.*}", FINGERPRINT_DECIMALS, n);
    // -0.0000 and 0.0000 are the same value
    if s.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        s.trim_start_matches('-').to_string()
    } else {
        s
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Order: time, shooting team, shooter, distance, angle, xG.
    pub fn from_fields(fields: [FieldValue<'_>; 6]) -> Self {
        let canonical = fields
            .iter()
            .map(FieldValue::normalized)
            .collect::<Vec<_>>()
            .join(DELIMITER);
        let digest = Sha256::digest(canonical.as_bytes());
        Fingerprint(format!("{:x}", digest))
    }

    pub fn from_row(row: &RawRow) -> Self {
        let text = |col: &str| row.get(col).map(FieldValue::Text).unwrap_or(FieldValue::Missing);
        Self::from_fields([
            text(COL_TIME),
            text(COL_SHOOTING_TEAM),
            text(COL_SHOOTER),
            text(COL_DISTANCE),
            text(COL_ANGLE),
            text(COL_XG),
        ])
    }

    /// Uses the stored base fields, never the correction overlay.
    pub fn from_shot(shot: &ShotEvent) -> Self {
        Self::from_fields([
            FieldValue::Text(&shot.time),
            FieldValue::Text(&shot.shooting_team),
            FieldValue::Text(&shot.shooter),
            FieldValue::Number(shot.distance),
            FieldValue::Number(shot.angle),
            FieldValue::Number(shot.xg),
        ])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
