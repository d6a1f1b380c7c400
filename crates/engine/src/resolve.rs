use crate::model::{ResolvedShot, ShotCorrection, ShotEvent};

/// Prefix applied to the resolved type of a shot flagged as a turnover.
pub const TURNOVER_PREFIX: &str = "Turnover | ";

/// Merge a base event with its overlay. Returns `None` for hidden shots.
pub fn resolve(shot: &ShotEvent, correction: Option<&ShotCorrection>) -> Option<ResolvedShot> {
    let Some(c) = correction else {
        return Some(base_view(shot));
    };
    if c.is_hidden() {
        return None;
    }

    let shot_type = c.shot_type.clone().unwrap_or_else(|| shot.shot_type.clone());
    let shot_type = if c.is_turnover {
        format!("{TURNOVER_PREFIX}{shot_type}")
    } else {
        shot_type
    };

    Some(ResolvedShot {
        id: shot.id,
        game_id: shot.game_id,
        time: shot.time.clone(),
        team1: shot.team1.clone(),
        team2: shot.team2.clone(),
        shooting_team: shot.shooting_team.clone(),
        result: c.result.unwrap_or(shot.result),
        shot_type,
        xg: c.xg.unwrap_or(shot.xg),
        xgot: shot.xgot,
        shooter: c.shooter.clone().unwrap_or_else(|| shot.shooter.clone()),
        passer: c.passer.clone().or_else(|| shot.passer.clone()),
        lineup: c.lineup.clone().unwrap_or_else(|| shot.lineup.clone()),
        power_play: c.power_play.unwrap_or(shot.power_play),
        short_handed: c.short_handed.unwrap_or(shot.short_handed),
        distance: c.distance.unwrap_or(shot.distance),
        angle: c.angle.unwrap_or(shot.angle),
        x: c.x.unwrap_or(shot.x),
        y: c.y.unwrap_or(shot.y),
        is_turnover: c.is_turnover,
        corrected: true,
    })
}

fn base_view(shot: &ShotEvent) -> ResolvedShot {
    ResolvedShot {
        id: shot.id,
        game_id: shot.game_id,
        time: shot.time.clone(),
        team1: shot.team1.clone(),
        team2: shot.team2.clone(),
        shooting_team: shot.shooting_team.clone(),
        result: shot.result,
        shot_type: shot.shot_type.clone(),
        xg: shot.xg,
        xgot: shot.xgot,
        shooter: shot.shooter.clone(),
        passer: shot.passer.clone(),
        lineup: shot.lineup.clone(),
        power_play: shot.power_play,
        short_handed: shot.short_handed,
        distance: shot.distance,
        angle: shot.angle,
        x: shot.x,
        y: shot.y,
        is_turnover: false,
        corrected: false,
    }
}

/// Resolve a batch, dropping hidden shots and keeping input order.
pub fn resolve_all<'a, I>(pairs: I) -> Vec<ResolvedShot>
where
    I: IntoIterator<Item = (&'a ShotEvent, Option<&'a ShotCorrection>)>,
{
    pairs
        .into_iter()
        .filter_map(|(shot, correction)| resolve(shot, correction))
        .collect()
}
