// Ledger schema and additive migrations

use rusqlite::{params, Connection, OptionalExtension};

/// Bumped whenever a migration step is added below.
pub const SCHEMA_VERSION: u32 = 3;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS games (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    date TEXT NOT NULL,             -- YYYY-MM-DD
    team1 TEXT NOT NULL,            -- home
    team2 TEXT NOT NULL             -- away
);

CREATE TABLE IF NOT EXISTS shots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    time TEXT NOT NULL,
    team1 TEXT NOT NULL,
    team2 TEXT NOT NULL,
    shooting_team TEXT NOT NULL,
    result TEXT NOT NULL,           -- Goal | Saved | Missed | Blocked
    shot_type TEXT NOT NULL DEFAULT '',
    xg REAL NOT NULL,
    xgot REAL,
    shooter TEXT NOT NULL,
    passer TEXT,
    t1_lw TEXT, t1_c TEXT, t1_rw TEXT, t1_ld TEXT, t1_rd TEXT, t1_g TEXT, t1_x TEXT,
    t2_lw TEXT, t2_c TEXT, t2_rw TEXT, t2_ld TEXT, t2_rd TEXT, t2_g TEXT, t2_x TEXT,
    power_play INTEGER NOT NULL DEFAULT 0,
    short_handed INTEGER NOT NULL DEFAULT 0,
    distance REAL NOT NULL,
    angle REAL NOT NULL,
    x REAL NOT NULL DEFAULT 0,
    y REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_shots_game ON shots(game_id);

CREATE TABLE IF NOT EXISTS shot_corrections (
    shot_id INTEGER PRIMARY KEY REFERENCES shots(id) ON DELETE CASCADE,
    result TEXT,
    shot_type TEXT,
    xg REAL,
    shooter TEXT,
    passer TEXT,
    lineup TEXT,                    -- JSON, both sides
    power_play INTEGER,
    short_handed INTEGER,
    distance REAL,
    angle REAL,
    x REAL,
    y REAL,
    is_turnover INTEGER NOT NULL DEFAULT 0,
    visibility TEXT NOT NULL DEFAULT 'active',
    updated_at TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS game_aliases (
    game_id INTEGER PRIMARY KEY REFERENCES games(id) ON DELETE CASCADE,
    display_name TEXT NOT NULL
);
"#;

/// Overlay columns added after the first release, with their definitions.
/// Older ledgers only carried result/type/xg/shooter/passer.
const CORRECTION_COLUMNS: &[(&str, &str)] = &[
    ("lineup", "TEXT"),
    ("power_play", "INTEGER"),
    ("short_handed", "INTEGER"),
    ("distance", "REAL"),
    ("angle", "REAL"),
    ("x", "REAL"),
    ("y", "REAL"),
    ("is_turnover", "INTEGER NOT NULL DEFAULT 0"),
    ("updated_at", "TEXT NOT NULL DEFAULT ''"),
    ("visibility", "TEXT NOT NULL DEFAULT 'active'"),
];

/// Create missing tables and repair older layouts in place. Only the base
/// schema is fatal; a failed repair step is logged and skipped so the ledger
/// stays usable. The repair checks are idempotent and run on every open, and
/// the version is recorded only once all of them succeed.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;

    let stored = stored_version(conn).unwrap_or_else(|e| {
        log::warn!("could not read schema version: {e}");
        None
    });
    if let Some(v) = stored.filter(|v| *v > SCHEMA_VERSION) {
        log::warn!("ledger schema v{v} is newer than supported v{SCHEMA_VERSION}");
        return Ok(());
    }

    let mut complete = true;
    for (column, definition) in CORRECTION_COLUMNS {
        if let Err(e) = ensure_column(conn, "shot_corrections", column, definition) {
            log::warn!("skipping repair of shot_corrections.{column}: {e}");
            complete = false;
        }
    }
    if let Err(e) = migrate_hidden_flag(conn) {
        log::warn!("skipping hidden-flag migration: {e}");
        complete = false;
    }

    if !complete {
        log::warn!("ledger schema repair incomplete; retrying on next open");
        return Ok(());
    }
    if stored != Some(SCHEMA_VERSION) {
        conn.execute(
            "INSERT INTO schema_meta (key, value) VALUES ('version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![SCHEMA_VERSION.to_string()],
        )?;
        log::info!(
            "ledger schema migrated from v{} to v{SCHEMA_VERSION}",
            stored.unwrap_or(0)
        );
    }
    Ok(())
}

fn stored_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_meta WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()))
}

pub(crate) fn column_names(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

fn ensure_column(conn: &Connection, table: &str, column: &str, definition: &str) -> rusqlite::Result<()> {
    if column_names(conn, table)?.iter().any(|c| c == column) {
        return Ok(());
    }
    conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"))?;
    log::debug!("added column {table}.{column}");
    Ok(())
}

/// Ledgers from before visibility was a tagged state stored a nullable
/// `is_hidden` flag alongside the overrides. A moved flag is cleared so a
/// later unhide is not undone by the next open.
fn migrate_hidden_flag(conn: &Connection) -> rusqlite::Result<()> {
    if !column_names(conn, "shot_corrections")?.iter().any(|c| c == "is_hidden") {
        return Ok(());
    }
    let moved = conn.execute(
        "UPDATE shot_corrections SET visibility = 'hidden', is_hidden = NULL WHERE is_hidden = 1",
        [],
    )?;
    if moved > 0 {
        log::info!("moved {moved} hidden flag(s) to visibility");
    }
    Ok(())
}
