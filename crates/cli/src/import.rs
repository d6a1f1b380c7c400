// import - CSV rows into the ledger

use std::io::{self, Read};

use chrono::NaiveDate;
use clap::Args;

use shotledger_engine::row::{RawRow, COL_TEAM1, COL_TEAM2, REQUIRED_COLUMNS};
use shotledger_store::{GameKey, ImportOutcome, ImportResult, Workspace};

use crate::exit_codes::{EXIT_IMPORT_ALL_DUPLICATES, EXIT_IMPORT_INPUT, EXIT_IMPORT_NOTHING};
use crate::output::print_json;
use crate::CliError;

#[derive(Args)]
pub struct ImportArgs {
    /// CSV file (- for stdin)
    pub file: String,

    /// Game name; matched case- and whitespace-insensitively
    #[arg(long)]
    pub game: String,

    /// Game date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub date: NaiveDate,

    /// Home team (default: the file's team1 column)
    #[arg(long)]
    pub team1: Option<String>,

    /// Away team (default: the file's team2 column)
    #[arg(long)]
    pub team2: Option<String>,

    /// CSV delimiter
    #[arg(long, default_value = ",")]
    pub delimiter: char,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn input_err(msg: impl Into<String>) -> CliError {
    CliError::new(EXIT_IMPORT_INPUT, msg)
}

/// Read a CSV into column-name maps. Fails if a required column is absent
/// from the header; blank cells are left for row validation.
pub fn read_rows<R: Read>(input: R, delimiter: char) -> Result<Vec<RawRow>, CliError> {
    if !delimiter.is_ascii() {
        return Err(CliError::args(format!("delimiter must be ASCII, got '{delimiter}'")));
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| input_err(format!("cannot read header row: {e}")))?
        .clone();
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !normalized.iter().any(|h| h == c))
        .collect();
    if !missing.is_empty() {
        return Err(input_err(format!("missing required column(s): {}", missing.join(", ")))
            .with_hint(format!("required: {}", REQUIRED_COLUMNS.join(", "))));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| input_err(format!("CSV parse error at row {}: {}", idx + 1, e)))?;
        let mut row = RawRow::new();
        for (column, value) in normalized.iter().zip(record.iter()) {
            row.insert(column, value);
        }
        rows.push(row);
    }
    log::debug!("read {} row(s) with {} column(s)", rows.len(), normalized.len());
    Ok(rows)
}

fn team_from_rows(rows: &[RawRow], column: &str) -> Option<String> {
    rows.iter().find_map(|r| r.get(column)).map(str::to_string)
}

pub fn cmd_import(ws: &mut Workspace, args: ImportArgs, json: bool) -> Result<(), CliError> {
    let rows = if args.file == "-" {
        read_rows(io::stdin().lock(), args.delimiter)?
    } else {
        let file = std::fs::File::open(&args.file)
            .map_err(|e| input_err(format!("{}: {e}", args.file)))?;
        read_rows(file, args.delimiter)?
    };

    let team1 = args
        .team1
        .or_else(|| team_from_rows(&rows, COL_TEAM1))
        .ok_or_else(|| CliError::args("home team unknown").with_hint("pass --team1 or add a team1 column"))?;
    let team2 = args
        .team2
        .or_else(|| team_from_rows(&rows, COL_TEAM2))
        .ok_or_else(|| CliError::args("away team unknown").with_hint("pass --team2 or add a team2 column"))?;

    let key = GameKey {
        name: args.game,
        date: args.date,
        team1,
        team2,
    };
    let result = ws.import_shots(&key, &rows).map_err(CliError::ledger)?;

    if json {
        print_json(&result)?;
    } else {
        print_summary(&key, &result);
    }

    match result.outcome {
        ImportOutcome::Inserted => Ok(()),
        ImportOutcome::AllDuplicates => Err(CliError::new(EXIT_IMPORT_ALL_DUPLICATES, "")),
        ImportOutcome::NothingToImport => Err(CliError::new(
            EXIT_IMPORT_NOTHING,
            "no importable rows",
        )),
    }
}

fn print_summary(key: &GameKey, result: &ImportResult) {
    match result.outcome {
        ImportOutcome::Inserted => {
            let game = result.game_id.map(|id| id.to_string()).unwrap_or_default();
            println!(
                "imported {} shot(s) into game {} \"{}\" ({}){}",
                result.inserted,
                game,
                key.name.trim(),
                key.date,
                if result.game_created { " [new game]" } else { "" }
            );
        }
        ImportOutcome::AllDuplicates => {
            println!(
                "all {} row(s) are already in the ledger; nothing imported",
                result.duplicates
            );
        }
        ImportOutcome::NothingToImport => println!("nothing imported"),
    }

    if result.duplicates > 0 && result.outcome == ImportOutcome::Inserted {
        println!("skipped {} duplicate(s)", result.duplicates);
    }
    for sample in &result.duplicate_samples {
        println!("  duplicate row {}: {} {}", sample.row, sample.time, sample.shooter);
    }
    if !result.rejected.is_empty() {
        println!("rejected {} row(s):", result.rejected.len());
        for r in &result.rejected {
            println!("  row {}: {}", r.row, r.reason);
        }
    }
    if result.game_rolled_back {
        println!("removed game \"{}\" created for this file", key.name.trim());
    }
}
