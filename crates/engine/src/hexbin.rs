//! Hexagonal spatial binning of resolved shots.
//!
//! Pointy-top hexagons laid out in offset rows: cell `(col, row)` has its
//! centre at `((col + (row & 1) / 2) * dx, row * dy)` with
//! `dx = 2r·sin(60°)` and `dy = 1.5r`. Each shot lands in the cell whose
//! centre is nearest to it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::court::{Court, Point};
use crate::error::EngineError;
use crate::model::{ResolvedShot, ShotResult};
use crate::onice::OnIceSets;

/// Rendered width the reference radius was tuned for.
pub const REFERENCE_WIDTH: f64 = 600.0;
/// Hex radius at [`REFERENCE_WIDTH`].
pub const REFERENCE_RADIUS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexReference {
    pub width: f64,
    pub radius: f64,
}

impl Default for HexReference {
    fn default() -> Self {
        Self {
            width: REFERENCE_WIDTH,
            radius: REFERENCE_RADIUS,
        }
    }
}

impl HexReference {
    /// Radius scaled linearly with the rendered width.
    pub fn radius_for(&self, field_width: f64) -> f64 {
        self.radius * field_width / self.width
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Counters collected while binning. Reset per context, never global.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BinDiagnostics {
    pub points_binned: usize,
    pub points_clamped: usize,
    pub passes: usize,
}

/// Everything one binning call needs, threaded explicitly.
#[derive(Debug, Clone)]
pub struct BinContext {
    pub court: Court,
    pub field_width: f64,
    pub field_height: f64,
    pub radius: f64,
    pub diagnostics: BinDiagnostics,
}

impl BinContext {
    pub fn new(field_width: f64, field_height: f64) -> Result<Self, EngineError> {
        Self::with_reference(field_width, field_height, Court::default(), HexReference::default())
    }

    pub fn with_reference(
        field_width: f64,
        field_height: f64,
        court: Court,
        reference: HexReference,
    ) -> Result<Self, EngineError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(court.width) || !valid(court.height) {
            return Err(EngineError::InvalidDimensions {
                width: court.width,
                height: court.height,
            });
        }
        if !valid(field_width) || !valid(field_height) || !valid(reference.width) || !valid(reference.radius) {
            return Err(EngineError::InvalidDimensions {
                width: field_width,
                height: field_height,
            });
        }
        Ok(Self {
            court,
            field_width,
            field_height,
            radius: reference.radius_for(field_width),
            diagnostics: BinDiagnostics::default(),
        })
    }

    /// Visual position of a shot on the rendered field, clamped to it.
    fn project(&mut self, shot: &ResolvedShot) -> Point {
        let mut p = self.court.visual_position(shot);
        if !self.court.contains(p) {
            self.diagnostics.points_clamped += 1;
            p.x = p.x.clamp(0.0, self.court.width);
            p.y = p.y.clamp(0.0, self.court.height);
        }
        self.court.scale_to(p, self.field_width, self.field_height)
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct HexGrid {
    dx: f64,
    dy: f64,
}

impl HexGrid {
    fn new(radius: f64) -> Self {
        Self {
            dx: radius * 2.0 * (std::f64::consts::PI / 3.0).sin(),
            dy: radius * 1.5,
        }
    }

    fn row_offset(row: i64) -> f64 {
        row.rem_euclid(2) as f64 / 2.0
    }

    /// `(col, row)` of the cell whose centre is nearest to `(x, y)`.
    fn locate(&self, x: f64, y: f64) -> (i64, i64) {
        let py = y / self.dy;
        let mut pj = py.round();
        let px = x / self.dx - Self::row_offset(pj as i64);
        let mut pi = px.round();
        let py1 = py - pj;

        // Near a row boundary the neighbouring row's centre may be closer.
        if py1.abs() * 3.0 > 1.0 {
            let px1 = px - pi;
            let pi2 = pi + (if px < pi { -1.0 } else { 1.0 }) / 2.0;
            let pj2 = pj + if py < pj { -1.0 } else { 1.0 };
            let px2 = px - pi2;
            let py2 = py - pj2;
            if px1 * px1 + py1 * py1 > px2 * px2 + py2 * py2 {
                let odd = (pj as i64).rem_euclid(2) == 1;
                pi = pi2 + (if odd { 1.0 } else { -1.0 }) / 2.0;
                pj = pj2;
            }
        }
        (pi.round() as i64, pj as i64)
    }

    fn center(&self, col: i64, row: i64) -> Point {
        Point {
            x: (col as f64 + Self::row_offset(row)) * self.dx,
            y: row as f64 * self.dy,
        }
    }
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// Which part of the field a cell was binned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pane {
    Full,
    /// Focus entity's own shots, compressed into the upper half.
    Own,
    /// Opponent shots while the focus entity was on the field, lower half.
    Opponent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HexCell {
    pub pane: Pane,
    pub col: i64,
    pub row: i64,
    pub cx: f64,
    pub cy: f64,
    pub count: usize,
    pub goals: usize,
    pub success_rate: f64,
    pub xg_min: f64,
    pub xg_avg: f64,
    pub xg_max: f64,
}

#[derive(Debug, Clone, Copy)]
struct CellAcc {
    count: usize,
    goals: usize,
    xg_sum: f64,
    xg_min: f64,
    xg_max: f64,
}

impl CellAcc {
    fn new() -> Self {
        Self {
            count: 0,
            goals: 0,
            xg_sum: 0.0,
            xg_min: f64::INFINITY,
            xg_max: f64::NEG_INFINITY,
        }
    }

    fn add(&mut self, shot: &ResolvedShot) {
        self.count += 1;
        if shot.result == ShotResult::Goal {
            self.goals += 1;
        }
        self.xg_sum += shot.xg;
        self.xg_min = self.xg_min.min(shot.xg);
        self.xg_max = self.xg_max.max(shot.xg);
    }
}

/// Focus of a split heatmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusEntity {
    Player(String),
    Team(String),
}

impl FocusEntity {
    /// Own shots and opponent shots faced, in input order.
    fn split<'a>(&self, shots: &'a [ResolvedShot]) -> (Vec<&'a ResolvedShot>, Vec<&'a ResolvedShot>) {
        match self {
            FocusEntity::Player(name) => {
                let own = shots.iter().filter(|s| &s.shooter == name).collect();
                (own, OnIceSets::collect(name, shots).shots_against)
            }
            FocusEntity::Team(team) => shots
                .iter()
                .filter(|s| s.involves_team(team))
                .partition(|s| &s.shooting_team == team),
        }
    }
}

/// Bin shots into hex cells. With a focus entity the field is split in two
/// panes, each binned independently.
pub fn binned_heatmap(
    ctx: &mut BinContext,
    shots: &[ResolvedShot],
    focus: Option<&FocusEntity>,
) -> Vec<HexCell> {
    match focus {
        None => bin_pane(ctx, shots.iter(), Pane::Full),
        Some(entity) => {
            let (own, against) = entity.split(shots);
            let mut cells = bin_pane(ctx, own.into_iter(), Pane::Own);
            cells.extend(bin_pane(ctx, against.into_iter(), Pane::Opponent));
            cells
        }
    }
}

fn bin_pane<'a>(
    ctx: &mut BinContext,
    shots: impl Iterator<Item = &'a ResolvedShot>,
    pane: Pane,
) -> Vec<HexCell> {
    ctx.diagnostics.passes += 1;
    let grid = HexGrid::new(ctx.radius);
    let half = ctx.field_height / 2.0;

    // Keyed (row, col) so output is ordered top to bottom, left to right.
    let mut cells: BTreeMap<(i64, i64), CellAcc> = BTreeMap::new();
    for shot in shots {
        let p = ctx.project(shot);
        let y = match pane {
            Pane::Full => p.y,
            Pane::Own => p.y * 0.5,
            Pane::Opponent => half + p.y * 0.5,
        };
        let (col, row) = grid.locate(p.x, y);
        cells.entry((row, col)).or_insert_with(CellAcc::new).add(shot);
        ctx.diagnostics.points_binned += 1;
    }
    log::debug!("{:?} pane: {} occupied cell(s), radius {:.2}", pane, cells.len(), ctx.radius);

    cells
        .into_iter()
        .map(|((row, col), acc)| {
            let c = grid.center(col, row);
            HexCell {
                pane,
                col,
                row,
                cx: c.x,
                cy: c.y,
                count: acc.count,
                goals: acc.goals,
                success_rate: acc.goals as f64 / acc.count as f64,
                xg_min: acc.xg_min,
                xg_avg: acc.xg_sum / acc.count as f64,
                xg_max: acc.xg_max,
            }
        })
        .collect()
}

/// Scale a baseline series so its peak equals the filtered series' peak.
/// Display aid for overlaying two distributions; not a statistical
/// normalization. A zero baseline peak yields all zeros.
pub fn normalize_to_peak(baseline: &[f64], filtered: &[f64]) -> Vec<f64> {
    let peak = |v: &[f64]| v.iter().copied().fold(0.0_f64, f64::max);
    let baseline_peak = peak(baseline);
    if baseline_peak <= 0.0 {
        return vec![0.0; baseline.len()];
    }
    let factor = peak(filtered) / baseline_peak;
    baseline.iter().map(|v| v * factor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SideSlots;
    use crate::onice::tests::{shot, slots};

    fn at(id: i64, team: &str, x: f64, y: f64, result: ShotResult, xg: f64) -> ResolvedShot {
        let mut s = shot(id, team, "A", result, SideSlots::default(), SideSlots::default());
        s.x = x;
        s.y = y;
        s.xg = xg;
        s
    }

    #[test]
    fn radius_scales_with_width() {
        let ctx = BinContext::new(1200.0, 600.0).unwrap();
        assert_eq!(ctx.radius, 24.0);
        assert!(BinContext::new(0.0, 100.0).is_err());
    }

    #[test]
    fn nearest_center_is_chosen() {
        let grid = HexGrid::new(10.0);
        for (x, y) in [(0.0, 0.0), (7.0, 3.0), (40.0, 33.0), (123.4, 56.7), (299.0, 14.9)] {
            let (col, row) = grid.locate(x, y);
            let c = grid.center(col, row);
            let d = (c.x - x).hypot(c.y - y);
            for dr in -2..=2 {
                for dc in -2..=2 {
                    let o = grid.center(col + dc, row + dr);
                    assert!(d <= (o.x - x).hypot(o.y - y) + 1e-9, "({x},{y}) not nearest");
                }
            }
        }
    }

    #[test]
    fn cells_aggregate_count_goals_and_xg() {
        let shots = vec![
            at(1, "team1", 100.0, 100.0, ShotResult::Goal, 0.3),
            at(2, "team1", 101.0, 101.0, ShotResult::Saved, 0.1),
            at(3, "team1", 500.0, 250.0, ShotResult::Missed, 0.05),
        ];
        let mut ctx = BinContext::new(600.0, 300.0).unwrap();
        let cells = binned_heatmap(&mut ctx, &shots, None);

        assert_eq!(cells.len(), 2);
        let busy = cells.iter().find(|c| c.count == 2).unwrap();
        assert_eq!(busy.goals, 1);
        assert_eq!(busy.success_rate, 0.5);
        assert_eq!(busy.xg_min, 0.1);
        assert_eq!(busy.xg_max, 0.3);
        assert!((busy.xg_avg - 0.2).abs() < 1e-12);
        assert_eq!(ctx.diagnostics.points_binned, 3);
    }

    #[test]
    fn away_shots_land_mirrored() {
        let home = at(1, "team1", 100.0, 100.0, ShotResult::Saved, 0.1);
        let away = at(2, "team2", 500.0, 200.0, ShotResult::Saved, 0.1);
        let mut ctx = BinContext::new(600.0, 300.0).unwrap();
        let cells = binned_heatmap(&mut ctx, &[home, away], None);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count, 2);
    }

    #[test]
    fn out_of_court_points_are_clamped_and_counted() {
        let shots = vec![at(1, "team1", -20.0, 400.0, ShotResult::Missed, 0.02)];
        let mut ctx = BinContext::new(600.0, 300.0).unwrap();
        let cells = binned_heatmap(&mut ctx, &shots, None);
        assert_eq!(cells.len(), 1);
        assert_eq!(ctx.diagnostics.points_clamped, 1);
    }

    #[test]
    fn split_mode_confines_panes_to_halves() {
        let on = || slots(&["A"], None);
        let mut own = shot(1, "team1", "A", ShotResult::Goal, on(), SideSlots::default());
        own.x = 300.0;
        own.y = 290.0;
        let mut against = shot(2, "team2", "X", ShotResult::Saved, on(), slots(&["X"], None));
        against.x = 300.0;
        against.y = 290.0; // mirrored to y = 10
        let mut elsewhere = shot(3, "team2", "X", ShotResult::Saved, SideSlots::default(), slots(&["X"], None));
        elsewhere.x = 10.0;

        let mut ctx = BinContext::new(600.0, 300.0).unwrap();
        let focus = FocusEntity::Player("A".into());
        let cells = binned_heatmap(&mut ctx, &[own, against, elsewhere], Some(&focus));

        let own_cells: Vec<_> = cells.iter().filter(|c| c.pane == Pane::Own).collect();
        let opp_cells: Vec<_> = cells.iter().filter(|c| c.pane == Pane::Opponent).collect();
        assert_eq!(own_cells.len(), 1);
        assert_eq!(opp_cells.len(), 1);
        let r = ctx.radius;
        assert!(own_cells[0].cy <= 150.0 + r);
        assert!(opp_cells[0].cy >= 150.0 - r);
        assert_eq!(ctx.diagnostics.passes, 2);
        assert_eq!(ctx.diagnostics.points_binned, 2);
    }

    #[test]
    fn team_focus_splits_by_shooting_team() {
        let shots = vec![
            at(1, "team1", 100.0, 100.0, ShotResult::Goal, 0.3),
            at(2, "team2", 100.0, 100.0, ShotResult::Goal, 0.3),
            at(3, "team2", 100.0, 100.0, ShotResult::Saved, 0.3),
        ];
        let mut ctx = BinContext::new(600.0, 300.0).unwrap();
        let cells = binned_heatmap(&mut ctx, &shots, Some(&FocusEntity::Team("team1".into())));
        let own: usize = cells.iter().filter(|c| c.pane == Pane::Own).map(|c| c.count).sum();
        let opp: usize = cells.iter().filter(|c| c.pane == Pane::Opponent).map(|c| c.count).sum();
        assert_eq!((own, opp), (1, 2));
    }

    #[test]
    fn baseline_is_scaled_to_filtered_peak() {
        let scaled = normalize_to_peak(&[2.0, 4.0, 8.0], &[1.0, 2.0]);
        assert_eq!(scaled, vec![0.5, 1.0, 2.0]);
        assert_eq!(normalize_to_peak(&[0.0, 0.0], &[3.0]), vec![0.0, 0.0]);
    }
}
