// Analytics commands over the resolved view

use std::collections::BTreeSet;

use clap::Args;
use serde::Serialize;

use shotledger_config::Settings;
use shotledger_engine::court::Court;
use shotledger_engine::hexbin::{BinDiagnostics, HexReference};
use shotledger_engine::metrics::{goalie_metrics, leaderboard, rank_player, team_metrics};
use shotledger_engine::onice::{on_field, GoalieIndex};
use shotledger_engine::{
    binned_heatmap, player_metrics, team_baseline, BinContext, FocusEntity, GameFilter, HexCell,
    Metric, MetricsRecord, Polarity, ResolvedShot,
};
use shotledger_store::Workspace;

use crate::exit_codes::EXIT_NO_DATA;
use crate::output::{opt, print_json, signed};
use crate::{CliError, GameSelect};

fn resolved(ws: &Workspace, filter: GameFilter) -> Result<Vec<ResolvedShot>, CliError> {
    ws.resolved_shots(filter).map_err(CliError::ledger)
}

fn no_data(msg: impl Into<String>) -> CliError {
    CliError::new(EXIT_NO_DATA, msg)
}

// ============================================================================
// heatmap
// ============================================================================

#[derive(Args)]
pub struct HeatmapArgs {
    #[command(flatten)]
    select: GameSelect,

    /// Split view: the player's shots against opponent shots while on the field
    #[arg(long, conflicts_with = "team")]
    player: Option<String>,

    /// Split view: the team's shots against its opponents'
    #[arg(long)]
    team: Option<String>,

    /// Rendered field width (default: [display].field_width)
    #[arg(long)]
    width: Option<f64>,

    /// Rendered field height (default: [display].field_height)
    #[arg(long)]
    height: Option<f64>,
}

#[derive(Serialize)]
struct Heatmap {
    radius: f64,
    diagnostics: BinDiagnostics,
    cells: Vec<HexCell>,
}

pub fn cmd_heatmap(
    ws: &Workspace,
    settings: &Settings,
    args: HeatmapArgs,
    json: bool,
) -> Result<(), CliError> {
    let shots = resolved(ws, args.select.game)?;
    let court = Court {
        width: settings.court.width,
        height: settings.court.height,
    };
    let reference = HexReference {
        width: settings.hexbin.reference_width,
        radius: settings.hexbin.reference_radius,
    };
    let mut ctx = BinContext::with_reference(
        args.width.unwrap_or(settings.display.field_width),
        args.height.unwrap_or(settings.display.field_height),
        court,
        reference,
    )
    .map_err(CliError::engine)?;

    let focus = match (args.player, args.team) {
        (Some(p), _) => Some(FocusEntity::Player(p)),
        (None, Some(t)) => Some(FocusEntity::Team(t)),
        (None, None) => None,
    };
    let cells = binned_heatmap(&mut ctx, &shots, focus.as_ref());
    log::info!(
        "binned {} point(s) in {} pass(es), {} clamped",
        ctx.diagnostics.points_binned,
        ctx.diagnostics.passes,
        ctx.diagnostics.points_clamped
    );

    let heatmap = Heatmap {
        radius: ctx.radius,
        diagnostics: ctx.diagnostics,
        cells,
    };
    if json {
        return print_json(&heatmap);
    }

    println!(
        "{} cell(s), radius {:.2}, {} shot(s) binned",
        heatmap.cells.len(),
        heatmap.radius,
        heatmap.diagnostics.points_binned
    );
    if heatmap.diagnostics.points_clamped > 0 {
        println!("{} shot(s) outside the court were clamped", heatmap.diagnostics.points_clamped);
    }
    for c in &heatmap.cells {
        println!(
            "{:<8} ({:>3},{:>3})  at {:>7.1},{:>6.1}  n={:<3} goals={:<3} rate={:.2}  xG {:.2}/{:.2}/{:.2}",
            format!("{:?}", c.pane).to_lowercase(),
            c.col,
            c.row,
            c.cx,
            c.cy,
            c.count,
            c.goals,
            c.success_rate,
            c.xg_min,
            c.xg_avg,
            c.xg_max
        );
    }
    Ok(())
}

// ============================================================================
// metrics / baseline
// ============================================================================

fn print_record(record: &MetricsRecord) {
    match &record.player {
        Some(p) => println!("{p}"),
        None => println!("baseline over {} shooter(s)", record.sample_size),
    }
    for metric in Metric::ALL {
        let value = match metric {
            Metric::Corsi | Metric::Fenwick | Metric::PlusMinus => {
                record.get(metric).map(signed).unwrap_or_else(|| "-".into())
            }
            _ => opt(record.get(metric), 3),
        };
        println!("  {:<22} {}", metric.key(), value);
    }
}

pub fn cmd_metrics(ws: &Workspace, player: &str, filter: GameFilter, json: bool) -> Result<(), CliError> {
    let shots = resolved(ws, filter)?;
    let involved = shots
        .iter()
        .any(|s| s.shooter == player || s.passer.as_deref() == Some(player) || on_field(s, player));
    if !involved {
        return Err(no_data(format!("no shots involve '{player}'")));
    }
    let record = player_metrics(player, &shots);
    if json {
        return print_json(&record);
    }
    print_record(&record);
    Ok(())
}

pub fn cmd_baseline(ws: &Workspace, filter: GameFilter, json: bool) -> Result<(), CliError> {
    let shots = resolved(ws, filter)?;
    if shots.is_empty() {
        return Err(no_data("no shots selected"));
    }
    let record = team_baseline(&shots);
    if json {
        return print_json(&record);
    }
    print_record(&record);
    Ok(())
}

// ============================================================================
// rank
// ============================================================================

#[derive(Args)]
pub struct RankArgs {
    /// Metric key, e.g. goals, conversion_rate, corsi
    #[arg(value_parser = parse_metric)]
    metric: Metric,

    /// Player to rank; omit for the leaderboard
    player: Option<String>,

    /// Treat lower values as better
    #[arg(long, conflicts_with = "higher_is_better")]
    lower_is_better: bool,

    /// Treat higher values as better
    #[arg(long)]
    higher_is_better: bool,

    /// Leaderboard length
    #[arg(long, default_value_t = 10)]
    limit: usize,

    #[command(flatten)]
    select: GameSelect,
}

fn parse_metric(s: &str) -> Result<Metric, String> {
    s.parse::<Metric>().map_err(|e| e.to_string())
}

#[derive(Serialize)]
struct LeaderboardRow {
    rank: usize,
    player: String,
    value: f64,
}

pub fn cmd_rank(ws: &Workspace, args: RankArgs, json: bool) -> Result<(), CliError> {
    let shots = resolved(ws, args.select.game)?;
    let polarity = if args.lower_is_better {
        Polarity::LowerIsBetter
    } else if args.higher_is_better {
        Polarity::HigherIsBetter
    } else {
        args.metric.default_polarity()
    };

    if let Some(player) = &args.player {
        let ranking = rank_player(player, args.metric, polarity, &shots).ok_or_else(|| {
            no_data(format!("'{player}' has no value for {}", args.metric))
        })?;
        if json {
            return print_json(&ranking);
        }
        println!(
            "{} is #{} of {} on {} ({})",
            ranking.player,
            ranking.rank,
            ranking.of,
            ranking.metric,
            opt(Some(ranking.value), 3)
        );
        return Ok(());
    }

    let board = leaderboard(args.metric, polarity, &shots);
    // Competition ranking: tied values share the better rank.
    let mut rows: Vec<LeaderboardRow> = Vec::new();
    for (i, (player, value)) in board.into_iter().enumerate() {
        let rank = match rows.last() {
            Some(prev) if prev.value == value => prev.rank,
            _ => i + 1,
        };
        rows.push(LeaderboardRow { rank, player, value });
    }
    rows.truncate(args.limit);

    if rows.is_empty() {
        return Err(no_data(format!("no player has a value for {}", args.metric)));
    }
    if json {
        return print_json(&rows);
    }
    for r in &rows {
        println!("{:>3}. {:<20} {}", r.rank, r.player, opt(Some(r.value), 3));
    }
    Ok(())
}

// ============================================================================
// goalie / team
// ============================================================================

pub fn cmd_goalie(
    ws: &Workspace,
    name: Option<&str>,
    filter: GameFilter,
    json: bool,
) -> Result<(), CliError> {
    let shots = resolved(ws, filter)?;
    let index = GoalieIndex::build(&shots);

    let names: Vec<String> = match name {
        Some(n) => vec![n.to_string()],
        None => shots
            .iter()
            .filter_map(|s| index.goalkeeper_facing(s))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };
    let reports: Vec<_> = names
        .iter()
        .map(|n| goalie_metrics(n, &shots, &index))
        .filter(|g| name.is_some() || g.shots_faced > 0)
        .collect();

    if reports.is_empty() || reports.iter().all(|g| g.shots_faced == 0) {
        return Err(no_data(match name {
            Some(n) => format!("'{n}' faced no shots"),
            None => "no goalkeeper faced a shot".to_string(),
        }));
    }
    if json {
        return print_json(&reports);
    }
    for g in &reports {
        println!(
            "{:<20} faced {:>3}  saves {:>3}  GA {:>3}  sv% {:>6}  xGA {:>6.2}  GSAx {}",
            g.goalkeeper,
            g.shots_faced,
            g.saves,
            g.goals_against,
            opt(g.save_pct, 1),
            g.xg_against,
            opt(Some(g.goals_saved_above_expected), 2)
        );
    }
    Ok(())
}

pub fn cmd_team(ws: &Workspace, team: &str, filter: GameFilter, json: bool) -> Result<(), CliError> {
    let shots = resolved(ws, filter)?;
    let metrics = team_metrics(team, &shots);
    if metrics.games == 0 {
        return Err(no_data(format!("no shots involve team '{team}'")));
    }
    if json {
        return print_json(&metrics);
    }
    println!("{} ({} game(s))", metrics.team, metrics.games);
    println!("  attempts   {:>4} for  {:>4} against", metrics.attempts_for, metrics.attempts_against);
    println!("  goals      {:>4} for  {:>4} against", metrics.goals_for, metrics.goals_against);
    println!("  xG         {:>4.1} for  {:>4.1} against", metrics.xg_for, metrics.xg_against);
    println!("  corsi-for% {}", opt(metrics.corsi_for_pct, 1));
    println!(
        "  special teams goals: {} power play, {} short handed",
        metrics.power_play_goals, metrics.short_handed_goals
    );
    Ok(())
}
