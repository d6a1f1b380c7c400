// Shot ledger CLI - import, correct and analyse recorded shots

mod analytics;
mod exit_codes;
mod import;
mod ledger;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};

use shotledger_config::{ConfigError, Settings};
use shotledger_engine::{EngineError, GameFilter, GameId, ShotId};
use shotledger_store::{FileSink, LedgerError, Store, Workspace};

use exit_codes::{
    EXIT_CONFIG, EXIT_ERROR, EXIT_NOT_FOUND, EXIT_SNAPSHOT_INVALID, EXIT_SNAPSHOT_PENDING,
    EXIT_STORAGE, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "shotledger")]
#[command(about = "Shot ledger: deduplicated imports, analyst corrections, shot analytics")]
#[command(version)]
struct Cli {
    /// Ledger database (overrides [storage].database)
    #[arg(long, global = true, env = "SHOTLEDGER_DB", value_name = "PATH")]
    db: Option<PathBuf>,

    /// Settings file (default: $SHOTLEDGER_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Shared `--game` selector for read commands.
#[derive(Args, Clone, Copy)]
struct GameSelect {
    /// Game id, or "all"
    #[arg(long, short = 'g', default_value = "all", value_parser = parse_filter)]
    game: GameFilter,
}

#[derive(Subcommand)]
enum Commands {
    /// Import shots from a CSV file into a game
    #[command(after_help = "\
Rows already present anywhere in the ledger are skipped. If nothing new is
imported into a game created for this file, the game is removed again.

Examples:
  shotledger import round3.csv --game 'Lions vs Tigers' --date 2024-10-05
  shotledger import round3.csv --game Derby --date 2024-10-05 --team1 Lions --team2 Tigers
  cat round3.csv | shotledger import - --game Derby --date 2024-10-05")]
    Import(import::ImportArgs),

    /// List games with alias and shot counts
    Games,

    /// List shots (resolved view by default)
    Shots {
        #[command(flatten)]
        select: GameSelect,

        /// Show stored base events, hidden ones included
        #[arg(long)]
        raw: bool,
    },

    /// Show base event, correction and resolved view of one shot
    Inspect { shot: ShotId },

    /// Override fields of a shot; unspecified fields keep their value
    Correct(ledger::CorrectArgs),

    /// Remove a shot's correction, reverting it to the imported data
    Uncorrect { shot: ShotId },

    /// Exclude a shot from every analysis without deleting it
    Hide { shot: ShotId },

    /// Bring a hidden shot back
    Unhide { shot: ShotId },

    /// Set or clear the display name of a game
    Alias {
        game: GameId,

        /// New display name
        #[arg(required_unless_present = "clear")]
        name: Option<String>,

        #[arg(long, conflicts_with = "name")]
        clear: bool,
    },

    /// Delete a game with its shots, corrections and alias
    DeleteGame { game: GameId },

    /// Write or restore a full ledger snapshot
    #[command(subcommand)]
    Snapshot(SnapshotCommands),

    /// Hexbin heatmap of shot locations
    Heatmap(analytics::HeatmapArgs),

    /// Metrics for one player
    Metrics {
        player: String,
        #[command(flatten)]
        select: GameSelect,
    },

    /// Unweighted mean of every shooter's metrics
    Baseline {
        #[command(flatten)]
        select: GameSelect,
    },

    /// Rank a player on one metric, or list the leaderboard
    Rank(analytics::RankArgs),

    /// Goalkeeper report; lists every credited goalkeeper without a name
    Goalie {
        name: Option<String>,
        #[command(flatten)]
        select: GameSelect,
    },

    /// Team totals for and against
    Team {
        name: String,
        #[command(flatten)]
        select: GameSelect,
    },
}

#[derive(Subcommand)]
enum SnapshotCommands {
    /// Write the current ledger to a JSON snapshot file
    Export { path: PathBuf },
    /// Replace the ledger with the contents of a snapshot file
    Restore { path: PathBuf },
}

fn parse_filter(s: &str) -> Result<GameFilter, String> {
    s.parse::<GameFilter>().map_err(|e| e.to_string())
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.format_timestamp(None).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = Settings::load(cli.config.as_deref()).map_err(CliError::config)?;
    let mut ws = open_workspace(&settings, cli.db.as_deref())?;
    let json = cli.json;

    let outcome = match cli.command {
        Commands::Import(args) => import::cmd_import(&mut ws, args, json),
        Commands::Games => ledger::cmd_games(&ws, json),
        Commands::Shots { select, raw } => ledger::cmd_shots(&ws, select.game, raw, json),
        Commands::Inspect { shot } => ledger::cmd_inspect(&ws, shot, json),
        Commands::Correct(args) => ledger::cmd_correct(&mut ws, args, json),
        Commands::Uncorrect { shot } => ledger::cmd_uncorrect(&mut ws, shot, json),
        Commands::Hide { shot } => ledger::cmd_hide(&mut ws, shot, true, json),
        Commands::Unhide { shot } => ledger::cmd_hide(&mut ws, shot, false, json),
        Commands::Alias { game, name, clear } => {
            let name = if clear { None } else { name };
            ledger::cmd_alias(&mut ws, game, name, json)
        }
        Commands::DeleteGame { game } => ledger::cmd_delete_game(&mut ws, game, json),
        Commands::Snapshot(SnapshotCommands::Export { path }) => {
            ledger::cmd_snapshot_export(&ws, &path, json)
        }
        Commands::Snapshot(SnapshotCommands::Restore { path }) => {
            ledger::cmd_snapshot_restore(&mut ws, &path, json)
        }
        Commands::Heatmap(args) => analytics::cmd_heatmap(&ws, &settings, args, json),
        Commands::Metrics { player, select } => {
            analytics::cmd_metrics(&ws, &player, select.game, json)
        }
        Commands::Baseline { select } => analytics::cmd_baseline(&ws, select.game, json),
        Commands::Rank(args) => analytics::cmd_rank(&ws, args, json),
        Commands::Goalie { name, select } => {
            analytics::cmd_goalie(&ws, name.as_deref(), select.game, json)
        }
        Commands::Team { name, select } => analytics::cmd_team(&ws, &name, select.game, json),
    };

    // A command that succeeded may still owe a snapshot upload. Its change is
    // already in the ledger, so report it separately.
    let persisted = ws.persist();
    outcome?;
    persisted.map_err(|e| {
        CliError::ledger(e)
            .with_hint("changes are saved in the ledger; the snapshot is retried on the next change")
    })
}

fn open_workspace(settings: &Settings, db: Option<&Path>) -> Result<Workspace, CliError> {
    let path = db.map(Path::to_path_buf).unwrap_or_else(|| settings.database_path());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            CliError::new(EXIT_STORAGE, format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    let store = Store::open(&path).map_err(CliError::ledger)?;
    Ok(match &settings.storage.snapshot {
        Some(snapshot) => Workspace::with_sink(store, Box::new(FileSink::new(snapshot))),
        None => Workspace::new(store),
    })
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn config(err: ConfigError) -> Self {
        Self::new(EXIT_CONFIG, err.to_string())
            .with_hint("fix the file or point --config at another one")
    }

    pub fn engine(err: EngineError) -> Self {
        Self::new(EXIT_USAGE, err.to_string())
    }

    /// Map a ledger error to its exit code.
    pub fn ledger(err: LedgerError) -> Self {
        let code = match &err {
            LedgerError::StorageUnavailable(_) => EXIT_STORAGE,
            LedgerError::InvalidCorrection(_) => EXIT_USAGE,
            LedgerError::ShotNotFound(_) | LedgerError::GameNotFound(_) => EXIT_NOT_FOUND,
            LedgerError::PersistenceUploadFailed(_) => EXIT_SNAPSHOT_PENDING,
            LedgerError::Json(_) | LedgerError::SnapshotVersion(_) => EXIT_SNAPSHOT_INVALID,
            LedgerError::Sqlite(_) => EXIT_ERROR,
        };
        let hint = match &err {
            LedgerError::ShotNotFound(_) => Some("list shot ids with `shotledger shots --raw`"),
            LedgerError::GameNotFound(_) => Some("list game ids with `shotledger games`"),
            LedgerError::StorageUnavailable(_) => Some("check --db or [storage].database"),
            _ => None,
        };
        Self { code, message: err.to_string(), hint: hint.map(str::to_string) }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
