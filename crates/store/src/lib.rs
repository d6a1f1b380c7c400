//! `shotledger-store`: the persisted shot ledger.
//!
//! One SQLite database holds games, immutable shot events, the sparse
//! correction overlay and game aliases. Resolved views are recomputed on
//! every read and never stored.

mod corrections;
pub mod error;
mod games;
pub mod import;
mod schema;
mod shots;
pub mod snapshot;
mod store;
pub mod workspace;

pub use error::{LedgerError, SinkError};
pub use games::GameSummary;
pub use import::{GameKey, ImportOutcome, ImportResult};
pub use schema::SCHEMA_VERSION;
pub use snapshot::{BlobSink, FileSink, GameAlias, LedgerSnapshot};
pub use store::Store;
pub use workspace::Workspace;
