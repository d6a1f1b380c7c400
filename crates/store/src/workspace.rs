use shotledger_engine::row::RawRow;
use shotledger_engine::{CorrectionPatch, GameFilter, GameId, ResolvedShot, ShotCorrection, ShotId};

use crate::error::LedgerError;
use crate::import::{GameKey, ImportResult};
use crate::snapshot::{BlobSink, LedgerSnapshot};
use crate::store::Store;

/// A store plus an optional snapshot sink.
///
/// Every mutation is followed by a snapshot upload. A failed upload is
/// logged and remembered; the next mutation (or an explicit [`persist`])
/// tries again. The local store stays authoritative throughout.
///
/// [`persist`]: Workspace::persist
pub struct Workspace {
    store: Store,
    sink: Option<Box<dyn BlobSink>>,
    upload_pending: bool,
}

impl Workspace {
    pub fn new(store: Store) -> Self {
        Workspace {
            store,
            sink: None,
            upload_pending: false,
        }
    }

    pub fn with_sink(store: Store, sink: Box<dyn BlobSink>) -> Self {
        Workspace {
            store,
            sink: Some(sink),
            upload_pending: false,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    /// True while a snapshot change has not reached the sink.
    pub fn upload_pending(&self) -> bool {
        self.upload_pending
    }

    pub fn resolved_shots(&self, filter: GameFilter) -> Result<Vec<ResolvedShot>, LedgerError> {
        self.store.resolved_shots(filter)
    }

    /// Push the current snapshot if one is owed.
    pub fn persist(&mut self) -> Result<(), LedgerError> {
        if !self.upload_pending {
            return Ok(());
        }
        let blob = self.store.snapshot()?.to_bytes()?;
        if let Some(sink) = self.sink.as_mut() {
            sink.upload(&blob)
                .map_err(LedgerError::PersistenceUploadFailed)?;
            log::debug!("uploaded {} byte snapshot to {}", blob.len(), sink.describe());
        }
        self.upload_pending = false;
        Ok(())
    }

    fn after_mutation(&mut self) {
        if self.sink.is_none() {
            return;
        }
        self.upload_pending = true;
        if let Err(e) = self.persist() {
            log::warn!("{e}; will retry on next change");
        }
    }

    pub fn import_shots(&mut self, key: &GameKey, rows: &[RawRow]) -> Result<ImportResult, LedgerError> {
        let result = self.store.import_shots(key, rows)?;
        if result.inserted > 0 {
            self.after_mutation();
        }
        Ok(result)
    }

    pub fn save_correction(
        &mut self,
        shot_id: ShotId,
        patch: &CorrectionPatch,
    ) -> Result<ShotCorrection, LedgerError> {
        let c = self.store.save_correction(shot_id, patch)?;
        self.after_mutation();
        Ok(c)
    }

    pub fn delete_correction(&mut self, shot_id: ShotId) -> Result<bool, LedgerError> {
        let removed = self.store.delete_correction(shot_id)?;
        if removed {
            self.after_mutation();
        }
        Ok(removed)
    }

    pub fn hide_shot(&mut self, shot_id: ShotId) -> Result<bool, LedgerError> {
        let changed = self.store.hide_shot(shot_id)?;
        if changed {
            self.after_mutation();
        }
        Ok(changed)
    }

    pub fn unhide_shot(&mut self, shot_id: ShotId) -> Result<bool, LedgerError> {
        let changed = self.store.unhide_shot(shot_id)?;
        if changed {
            self.after_mutation();
        }
        Ok(changed)
    }

    pub fn set_alias(&mut self, game_id: GameId, display_name: &str) -> Result<(), LedgerError> {
        self.store.set_alias(game_id, display_name)?;
        self.after_mutation();
        Ok(())
    }

    pub fn clear_alias(&mut self, game_id: GameId) -> Result<bool, LedgerError> {
        let removed = self.store.clear_alias(game_id)?;
        if removed {
            self.after_mutation();
        }
        Ok(removed)
    }

    pub fn delete_game(&mut self, game_id: GameId) -> Result<(), LedgerError> {
        self.store.delete_game(game_id)?;
        self.after_mutation();
        Ok(())
    }

    pub fn restore(&mut self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError> {
        self.store.restore(snapshot)?;
        self.after_mutation();
        Ok(())
    }
}
