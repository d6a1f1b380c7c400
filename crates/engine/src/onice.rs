//! On-field attribution: who was on the court for a shot, for/against sets
//! per player, and which goalkeeper faced a shot.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::{ResolvedShot, ShotResult, Side};

/// True iff the name exactly matches one of the 14 roster slots.
pub fn on_field(shot: &ResolvedShot, player: &str) -> bool {
    player_side(shot, player).is_some()
}

pub fn player_side(shot: &ResolvedShot, player: &str) -> Option<Side> {
    shot.lineup.side_of(player)
}

// ---------------------------------------------------------------------------
// For / against
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Differential {
    pub for_count: usize,
    pub against_count: usize,
}

impl Differential {
    pub fn net(&self) -> i64 {
        self.for_count as i64 - self.against_count as i64
    }

    /// Share of attempts that went the player's way, `None` with no events.
    pub fn for_pct(&self) -> Option<f64> {
        let total = self.for_count + self.against_count;
        (total > 0).then(|| self.for_count as f64 / total as f64 * 100.0)
    }
}

/// Shots taken while a player was on the field, split by direction.
#[derive(Debug, Clone, Default)]
pub struct OnIceSets<'a> {
    pub shots_for: Vec<&'a ResolvedShot>,
    pub shots_against: Vec<&'a ResolvedShot>,
}

impl<'a> OnIceSets<'a> {
    pub fn collect(player: &str, shots: &'a [ResolvedShot]) -> Self {
        let mut sets = OnIceSets::default();
        for shot in shots {
            let Some(side) = player_side(shot, player) else {
                continue;
            };
            if side == shot.shooting_side() {
                sets.shots_for.push(shot);
            } else {
                sets.shots_against.push(shot);
            }
        }
        sets
    }

    fn count_where(&self, keep: impl Fn(&ResolvedShot) -> bool) -> Differential {
        Differential {
            for_count: self.shots_for.iter().filter(|s| keep(s)).count(),
            against_count: self.shots_against.iter().filter(|s| keep(s)).count(),
        }
    }

    /// All attempts.
    pub fn corsi(&self) -> Differential {
        self.count_where(|_| true)
    }

    /// Unblocked attempts.
    pub fn fenwick(&self) -> Differential {
        self.count_where(|s| s.result != ShotResult::Blocked)
    }

    /// Goals only.
    pub fn plus_minus(&self) -> Differential {
        self.count_where(|s| s.result == ShotResult::Goal)
    }
}

// ---------------------------------------------------------------------------
// Goalkeepers
// ---------------------------------------------------------------------------

/// Regular goalkeeper per team, inferred once per dataset.
#[derive(Debug, Clone, Default)]
pub struct GoalieIndex {
    regular: BTreeMap<String, String>,
}

impl GoalieIndex {
    /// The regular goalkeeper of a team is the name seen most often in its
    /// goalkeeper slot across the team's own shots. Ties go to the
    /// lexicographically smallest name.
    pub fn build(shots: &[ResolvedShot]) -> Self {
        let mut counts: HashMap<&str, BTreeMap<&str, usize>> = HashMap::new();
        for shot in shots {
            let side = shot.shooting_side();
            if let Some(gk) = shot.lineup.side(side).goalkeeper.as_deref() {
                *counts
                    .entry(shot.team_name(side))
                    .or_default()
                    .entry(gk)
                    .or_default() += 1;
            }
        }

        let regular = counts
            .into_iter()
            .filter_map(|(team, by_name)| {
                // BTreeMap iterates names ascending; keep the first maximum.
                let mut best: Option<(&str, usize)> = None;
                for (name, n) in by_name {
                    if best.map_or(true, |(_, m)| n > m) {
                        best = Some((name, n));
                    }
                }
                best.map(|(name, _)| (team.to_string(), name.to_string()))
            })
            .collect();

        GoalieIndex { regular }
    }

    pub fn regular_goalkeeper(&self, team: &str) -> Option<&str> {
        self.regular.get(team).map(String::as_str)
    }

    /// Goalkeeper credited with a shot, or `None` if nobody faced it:
    /// off-target results, empty-net situations, or an unknown keeper.
    pub fn goalkeeper_facing(&self, shot: &ResolvedShot) -> Option<String> {
        if !shot.result.is_on_goal() {
            return None;
        }
        let defending = shot.shooting_side().other();
        let slots = shot.lineup.side(defending);
        if slots.has_extra_attacker() {
            return None;
        }
        match slots.goalkeeper.as_deref() {
            Some(gk) => Some(gk.to_string()),
            None if shot.power_play => self
                .regular_goalkeeper(shot.team_name(defending))
                .map(str::to_string),
            None => None,
        }
    }

    /// Every shot credited to the given goalkeeper.
    pub fn facing_set<'a>(&self, goalkeeper: &str, shots: &'a [ResolvedShot]) -> Vec<&'a ResolvedShot> {
        shots
            .iter()
            .filter(|s| self.goalkeeper_facing(s).as_deref() == Some(goalkeeper))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{Lineup, SideSlots};

    pub(crate) fn slots(names: &[&str], goalkeeper: Option<&str>) -> SideSlots {
        let mut it = names.iter().map(|n| Some(n.to_string()));
        SideSlots {
            lw: it.next().flatten(),
            c: it.next().flatten(),
            rw: it.next().flatten(),
            ld: it.next().flatten(),
            rd: it.next().flatten(),
            goalkeeper: goalkeeper.map(str::to_string),
            extra_attacker: None,
        }
    }

    pub(crate) fn shot(
        id: i64,
        shooting_team: &str,
        shooter: &str,
        result: ShotResult,
        home: SideSlots,
        away: SideSlots,
    ) -> ResolvedShot {
        ResolvedShot {
            id,
            game_id: 1,
            time: format!("{id}"),
            team1: "team1".into(),
            team2: "team2".into(),
            shooting_team: shooting_team.into(),
            result,
            shot_type: "Direct".into(),
            xg: 0.1,
            xgot: None,
            shooter: shooter.into(),
            passer: None,
            lineup: Lineup { home, away },
            power_play: false,
            short_handed: false,
            distance: 10.0,
            angle: 0.0,
            x: 300.0,
            y: 150.0,
            is_turnover: false,
            corrected: false,
        }
    }

    fn corsi_fixture() -> Vec<ResolvedShot> {
        let home = || slots(&["A", "B"], None);
        let away = || slots(&["X", "Y"], None);
        vec![
            shot(1, "team1", "A", ShotResult::Goal, home(), away()),
            shot(2, "team2", "X", ShotResult::Saved, home(), away()),
            shot(3, "team1", "A", ShotResult::Missed, home(), away()),
        ]
    }

    #[test]
    fn corsi_counts_attempts_while_on_field() {
        let shots = corsi_fixture();
        let sets = OnIceSets::collect("A", &shots);
        assert_eq!(sets.corsi(), Differential { for_count: 2, against_count: 1 });
        assert_eq!(sets.corsi().net(), 1);

        let x = OnIceSets::collect("X", &shots);
        assert_eq!(x.corsi().net(), -1);
    }

    #[test]
    fn fenwick_and_plus_minus_filter_results() {
        let mut shots = corsi_fixture();
        shots.push(shot(
            4,
            "team2",
            "Y",
            ShotResult::Blocked,
            slots(&["A", "B"], None),
            slots(&["X", "Y"], None),
        ));
        let sets = OnIceSets::collect("B", &shots);
        assert_eq!(sets.corsi().net(), 0);
        assert_eq!(sets.fenwick().net(), 1);
        assert_eq!(sets.plus_minus().net(), 1);
    }

    #[test]
    fn player_off_field_is_not_counted() {
        let shots = corsi_fixture();
        let sets = OnIceSets::collect("C", &shots);
        assert!(sets.shots_for.is_empty());
        assert!(sets.shots_against.is_empty());
        assert!(!on_field(&shots[0], "a"));
    }

    #[test]
    fn regular_goalkeeper_is_mode_with_name_tiebreak() {
        let shots = vec![
            shot(1, "team1", "A", ShotResult::Missed, slots(&["A"], Some("Zed")), slots(&[], None)),
            shot(2, "team1", "A", ShotResult::Missed, slots(&["A"], Some("Amy")), slots(&[], None)),
            // team2 shooting: team1's keeper here is not counted for team1
            shot(3, "team2", "X", ShotResult::Missed, slots(&[], Some("Zed")), slots(&["X"], None)),
        ];
        let index = GoalieIndex::build(&shots);
        assert_eq!(index.regular_goalkeeper("team1"), Some("Amy"));
        assert_eq!(index.regular_goalkeeper("team2"), None);
    }

    #[test]
    fn power_play_with_empty_slot_falls_back_to_regular_keeper() {
        let mut shots = vec![
            shot(1, "team2", "X", ShotResult::Missed, slots(&[], None), slots(&["X"], Some("Tom"))),
            shot(2, "team2", "X", ShotResult::Goal, slots(&[], None), slots(&["X"], Some("Tom"))),
        ];
        let mut pp = shot(3, "team1", "A", ShotResult::Saved, slots(&["A"], None), slots(&[], None));
        pp.power_play = true;
        shots.push(pp);
        let not_pp = shot(4, "team1", "A", ShotResult::Saved, slots(&["A"], None), slots(&[], None));
        shots.push(not_pp);

        let index = GoalieIndex::build(&shots);
        assert_eq!(index.goalkeeper_facing(&shots[2]).as_deref(), Some("Tom"));
        assert_eq!(index.goalkeeper_facing(&shots[3]), None);
    }

    #[test]
    fn empty_net_and_off_target_are_not_faced() {
        let mut away = slots(&["X"], Some("Tom"));
        away.extra_attacker = Some("Xtra".into());
        let empty_net = shot(1, "team1", "A", ShotResult::Goal, slots(&["A"], None), away);
        let wide = shot(2, "team1", "A", ShotResult::Missed, slots(&["A"], None), slots(&[], Some("Tom")));
        let saved = shot(3, "team1", "A", ShotResult::Saved, slots(&["A"], None), slots(&[], Some("Tom")));
        let shots = vec![empty_net, wide, saved];

        let index = GoalieIndex::build(&shots);
        let faced = index.facing_set("Tom", &shots);
        assert_eq!(faced.len(), 1);
        assert_eq!(faced[0].id, 3);
    }
}
