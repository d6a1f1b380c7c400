//! Logical court geometry and the attacking-direction convention.

use serde::{Deserialize, Serialize};

use crate::model::ResolvedShot;

/// Width of the logical court shots are recorded in.
pub const LOGICAL_WIDTH: f64 = 600.0;
/// Height of the logical court shots are recorded in.
pub const LOGICAL_HEIGHT: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Court {
    pub width: f64,
    pub height: f64,
}

impl Default for Court {
    fn default() -> Self {
        Self {
            width: LOGICAL_WIDTH,
            height: LOGICAL_HEIGHT,
        }
    }
}

impl Court {
    /// Position a shot is drawn at. Away shots are mirrored through the
    /// court centre so every attack points the same way.
    pub fn visual_position(&self, shot: &ResolvedShot) -> Point {
        if shot.is_home_shot() {
            Point { x: shot.x, y: shot.y }
        } else {
            Point {
                x: self.width - shot.x,
                y: self.height - shot.y,
            }
        }
    }

    /// Map a logical point onto a rendered field of the given size.
    pub fn scale_to(&self, p: Point, field_width: f64, field_height: f64) -> Point {
        Point {
            x: p.x * field_width / self.width,
            y: p.y * field_height / self.height,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ShotResult, SideSlots};
    use crate::onice::tests::shot;

    #[test]
    fn away_shots_are_mirrored() {
        let court = Court::default();
        let mut s = shot(1, "team2", "X", ShotResult::Saved, SideSlots::default(), SideSlots::default());
        s.x = 100.0;
        s.y = 40.0;
        assert_eq!(court.visual_position(&s), Point { x: 500.0, y: 260.0 });

        s.shooting_team = "team1".into();
        assert_eq!(court.visual_position(&s), Point { x: 100.0, y: 40.0 });
    }

    #[test]
    fn scaling_is_proportional() {
        let court = Court::default();
        let p = court.scale_to(Point { x: 300.0, y: 150.0 }, 1200.0, 600.0);
        assert_eq!(p, Point { x: 600.0, y: 300.0 });
    }
}
