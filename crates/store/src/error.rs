use std::path::PathBuf;

use shotledger_engine::{EngineError, GameId, ShotId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The database could not be opened or initialised.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("shot {0} not found")]
    ShotNotFound(ShotId),
    #[error("game {0} not found")]
    GameNotFound(GameId),
    /// A correction was rejected before anything was written.
    #[error("invalid correction: {0}")]
    InvalidCorrection(#[from] EngineError),
    /// Snapshot blob could not be handed to the sink. The in-memory ledger
    /// stays authoritative; the upload is retried on the next mutation.
    #[error("snapshot upload failed: {0}")]
    PersistenceUploadFailed(#[source] SinkError),
    #[error("json encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot format version {0}")]
    SnapshotVersion(u32),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Failure reported by a [`BlobSink`](crate::snapshot::BlobSink).
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The target is reachable but refused or lost the blob.
    #[error("{0}")]
    Unavailable(String),
}
