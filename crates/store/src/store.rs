use std::path::Path;

use rusqlite::Connection;

use crate::error::LedgerError;
use crate::schema;

/// Handle on one ledger database.
///
/// All reads go through the resolver, so the overlay is applied consistently
/// no matter which caller asks.
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open (or create) a ledger file and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)
            .map_err(|e| LedgerError::StorageUnavailable(format!("{}: {e}", path.display())))?;
        log::debug!("opened ledger {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, LedgerError> {
        schema::migrate(&conn).map_err(|e| LedgerError::StorageUnavailable(e.to_string()))?;
        Ok(Store { conn })
    }
}

/// UTC timestamp stamped on every correction write.
pub(crate) fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
