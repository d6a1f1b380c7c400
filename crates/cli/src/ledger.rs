// Ledger commands: listing, corrections, visibility, aliases, snapshots

use std::path::Path;

use clap::{ArgAction, Args};

use shotledger_engine::{
    resolve, CorrectionPatch, GameFilter, GameId, Lineup, ResolvedShot, ShotCorrection, ShotEvent,
    ShotId, ShotResult,
};
use shotledger_store::{BlobSink, FileSink, LedgerSnapshot, Workspace};

use crate::exit_codes::EXIT_NOT_FOUND;
use crate::output::print_json;
use crate::CliError;

// ============================================================================
// games / shots / inspect
// ============================================================================

pub fn cmd_games(ws: &Workspace, json: bool) -> Result<(), CliError> {
    let games = ws.store().games().map_err(CliError::ledger)?;
    if json {
        return print_json(&games);
    }
    if games.is_empty() {
        println!("no games");
        return Ok(());
    }
    for g in &games {
        let hidden = if g.hidden_count > 0 {
            format!(", {} hidden", g.hidden_count)
        } else {
            String::new()
        };
        println!(
            "{:>4}  {}  {}  ({} vs {})  {} shot(s){}",
            g.game.id, g.game.date, g.display_name, g.game.team1, g.game.team2, g.shot_count, hidden
        );
    }
    Ok(())
}

fn shot_line(s: &ResolvedShot) -> String {
    let mut flags = String::new();
    if s.corrected {
        flags.push_str(" *");
    }
    if s.power_play {
        flags.push_str(" PP");
    }
    if s.short_handed {
        flags.push_str(" SH");
    }
    format!(
        "{:>6}  g{:<4} {:>7}  {:<14} {:<18} {:<7} {:>5.2}  {}{}",
        s.id, s.game_id, s.time, s.shooting_team, s.shooter, s.result, s.xg, s.shot_type, flags
    )
}

pub fn cmd_shots(ws: &Workspace, filter: GameFilter, raw: bool, json: bool) -> Result<(), CliError> {
    let store = ws.store();
    if raw {
        let shots = store.shots(filter).map_err(CliError::ledger)?;
        let corrections = store.corrections().map_err(CliError::ledger)?;
        if json {
            return print_json(&shots);
        }
        for s in &shots {
            let hidden = corrections.get(&s.id).is_some_and(ShotCorrection::is_hidden);
            // Raw listing shows the base event, so resolve without the overlay.
            if let Some(base) = resolve(s, None) {
                println!("{}{}", shot_line(&base), if hidden { "  [hidden]" } else { "" });
            }
        }
        println!("{} stored shot(s)", shots.len());
        return Ok(());
    }

    let shots = store.resolved_shots(filter).map_err(CliError::ledger)?;
    if json {
        return print_json(&shots);
    }
    for s in &shots {
        println!("{}", shot_line(s));
    }
    println!("{} shot(s)", shots.len());
    Ok(())
}

#[derive(serde::Serialize)]
struct Inspection<'a> {
    base: &'a ShotEvent,
    correction: Option<&'a ShotCorrection>,
    /// Absent when the shot is hidden.
    resolved: Option<ResolvedShot>,
}

pub fn cmd_inspect(ws: &Workspace, shot_id: ShotId, json: bool) -> Result<(), CliError> {
    let store = ws.store();
    let shot = store
        .shot(shot_id)
        .map_err(CliError::ledger)?
        .ok_or_else(|| CliError::new(EXIT_NOT_FOUND, format!("shot {shot_id} not found")))?;
    let correction = store.correction(shot_id).map_err(CliError::ledger)?;
    let resolved = resolve(&shot, correction.as_ref());

    if json {
        return print_json(&Inspection {
            base: &shot,
            correction: correction.as_ref(),
            resolved,
        });
    }

    println!("shot {} (game {}, {})", shot.id, shot.game_id, shot.time);
    println!("  imported: {} by {} ({}), xG {:.2}", shot.result, shot.shooter, shot.shot_type, shot.xg);
    match &correction {
        None => println!("  no correction"),
        Some(c) => {
            println!("  correction ({}, updated {})", c.visibility.as_str(), c.updated_at);
            let overrides = describe_overrides(c);
            if overrides.is_empty() {
                println!("    no field overrides");
            }
            for line in overrides {
                println!("    {line}");
            }
        }
    }
    match resolved {
        Some(r) => println!("  resolved: {}", shot_line(&r).trim_start()),
        None => println!("  hidden from analysis"),
    }
    Ok(())
}

fn describe_overrides(c: &ShotCorrection) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(r) = c.result {
        out.push(format!("result = {r}"));
    }
    if let Some(t) = &c.shot_type {
        out.push(format!("type = {t}"));
    }
    if let Some(xg) = c.xg {
        out.push(format!("xg = {xg}"));
    }
    if let Some(s) = &c.shooter {
        out.push(format!("shooter = {s}"));
    }
    if let Some(p) = &c.passer {
        out.push(format!("passer = {p}"));
    }
    if c.lineup.is_some() {
        out.push("lineup replaced".to_string());
    }
    if let Some(pp) = c.power_play {
        out.push(format!("power play = {pp}"));
    }
    if let Some(sh) = c.short_handed {
        out.push(format!("short handed = {sh}"));
    }
    if let Some(d) = c.distance {
        out.push(format!("distance = {d}"));
    }
    if let Some(a) = c.angle {
        out.push(format!("angle = {a}"));
    }
    if c.x.is_some() || c.y.is_some() {
        out.push(format!("position = ({:?}, {:?})", c.x, c.y));
    }
    if c.is_turnover {
        out.push("turnover".to_string());
    }
    out
}

// ============================================================================
// correct / uncorrect / hide
// ============================================================================

#[derive(Args)]
pub struct CorrectArgs {
    pub shot: ShotId,

    #[arg(long, value_parser = parse_result)]
    pub result: Option<ShotResult>,

    #[arg(long = "type")]
    pub shot_type: Option<String>,

    #[arg(long)]
    pub xg: Option<f64>,

    #[arg(long)]
    pub shooter: Option<String>,

    #[arg(long)]
    pub passer: Option<String>,

    /// Both sides' slots as JSON, e.g. '{"home":{"lw":"Alice","goalkeeper":"Gina"}}'
    #[arg(long, value_name = "JSON")]
    pub lineup: Option<String>,

    #[arg(long, action = ArgAction::Set)]
    pub power_play: Option<bool>,

    #[arg(long, action = ArgAction::Set)]
    pub short_handed: Option<bool>,

    #[arg(long, allow_hyphen_values = true)]
    pub distance: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub angle: Option<f64>,

    #[arg(long)]
    pub x: Option<f64>,

    #[arg(long)]
    pub y: Option<f64>,

    /// Flag the shot as coming from a turnover
    #[arg(long, action = ArgAction::Set)]
    pub turnover: Option<bool>,
}

fn parse_result(s: &str) -> Result<ShotResult, String> {
    s.parse::<ShotResult>().map_err(|e| e.to_string())
}

impl CorrectArgs {
    fn patch(&self) -> Result<CorrectionPatch, CliError> {
        let lineup = match &self.lineup {
            Some(text) => Some(
                serde_json::from_str::<Lineup>(text)
                    .map_err(|e| CliError::args(format!("invalid --lineup: {e}")))?,
            ),
            None => None,
        };
        Ok(CorrectionPatch {
            result: self.result,
            shot_type: self.shot_type.clone(),
            xg: self.xg,
            shooter: self.shooter.clone(),
            passer: self.passer.clone(),
            lineup,
            power_play: self.power_play,
            short_handed: self.short_handed,
            distance: self.distance,
            angle: self.angle,
            x: self.x,
            y: self.y,
            is_turnover: self.turnover,
        })
    }
}

pub fn cmd_correct(ws: &mut Workspace, args: CorrectArgs, json: bool) -> Result<(), CliError> {
    let patch = args.patch()?;
    if patch.is_empty() {
        return Err(CliError::args("nothing to correct")
            .with_hint("pass at least one field, e.g. --result Goal"));
    }
    let correction = ws.save_correction(args.shot, &patch).map_err(CliError::ledger)?;
    if json {
        return print_json(&correction);
    }
    println!("corrected shot {}", args.shot);
    for line in describe_overrides(&correction) {
        println!("  {line}");
    }
    Ok(())
}

pub fn cmd_uncorrect(ws: &mut Workspace, shot_id: ShotId, json: bool) -> Result<(), CliError> {
    let removed = ws.delete_correction(shot_id).map_err(CliError::ledger)?;
    if json {
        return print_json(&serde_json::json!({ "shot": shot_id, "removed": removed }));
    }
    if removed {
        println!("shot {shot_id} reverted to imported data");
    } else {
        println!("shot {shot_id} had no correction");
    }
    Ok(())
}

pub fn cmd_hide(ws: &mut Workspace, shot_id: ShotId, hide: bool, json: bool) -> Result<(), CliError> {
    let changed = if hide {
        ws.hide_shot(shot_id)
    } else {
        ws.unhide_shot(shot_id)
    };
    let changed = changed.map_err(CliError::ledger)?;

    let state = if hide { "hidden" } else { "active" };
    if json {
        return print_json(&serde_json::json!({
            "shot": shot_id,
            "visibility": state,
            "changed": changed,
        }));
    }
    if changed {
        println!("shot {shot_id} is {state}");
    } else {
        println!("shot {shot_id} was already {state}");
    }
    Ok(())
}

// ============================================================================
// alias / delete-game
// ============================================================================

pub fn cmd_alias(
    ws: &mut Workspace,
    game_id: GameId,
    name: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    match name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => ws.set_alias(game_id, name).map_err(CliError::ledger)?,
        None => {
            ws.clear_alias(game_id).map_err(CliError::ledger)?;
        }
    }
    let alias = ws.store().alias(game_id).map_err(CliError::ledger)?;
    if json {
        return print_json(&serde_json::json!({ "game": game_id, "alias": alias }));
    }
    match alias {
        Some(a) => println!("game {game_id} is shown as \"{a}\""),
        None => println!("game {game_id} has no alias"),
    }
    Ok(())
}

pub fn cmd_delete_game(ws: &mut Workspace, game_id: GameId, json: bool) -> Result<(), CliError> {
    let shots = ws
        .store()
        .raw_shot_count(GameFilter::Game(game_id))
        .map_err(CliError::ledger)?;
    ws.delete_game(game_id).map_err(CliError::ledger)?;
    if json {
        return print_json(&serde_json::json!({ "game": game_id, "shots_deleted": shots }));
    }
    println!("deleted game {game_id} and {shots} shot(s)");
    Ok(())
}

// ============================================================================
// snapshot
// ============================================================================

pub fn cmd_snapshot_export(ws: &Workspace, path: &Path, json: bool) -> Result<(), CliError> {
    let snapshot = ws.store().snapshot().map_err(CliError::ledger)?;
    let bytes = snapshot.to_bytes().map_err(CliError::ledger)?;
    FileSink::new(path)
        .upload(&bytes)
        .map_err(|e| CliError::io(format!("cannot write snapshot: {e}")))?;
    if json {
        return print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "games": snapshot.games.len(),
            "shots": snapshot.shots.len(),
            "corrections": snapshot.corrections.len(),
        }));
    }
    println!(
        "wrote {} game(s), {} shot(s), {} correction(s) to {}",
        snapshot.games.len(),
        snapshot.shots.len(),
        snapshot.corrections.len(),
        path.display()
    );
    Ok(())
}

pub fn cmd_snapshot_restore(ws: &mut Workspace, path: &Path, json: bool) -> Result<(), CliError> {
    let bytes = std::fs::read(path).map_err(|e| CliError::io(format!("{}: {e}", path.display())))?;
    let snapshot = LedgerSnapshot::from_bytes(&bytes).map_err(CliError::ledger)?;
    ws.restore(&snapshot).map_err(CliError::ledger)?;
    if json {
        return print_json(&serde_json::json!({
            "games": snapshot.games.len(),
            "shots": snapshot.shots.len(),
            "corrections": snapshot.corrections.len(),
        }));
    }
    println!(
        "restored {} game(s), {} shot(s), {} correction(s)",
        snapshot.games.len(),
        snapshot.shots.len(),
        snapshot.corrections.len()
    );
    Ok(())
}
