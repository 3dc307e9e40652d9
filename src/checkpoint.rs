/**
 * Checkpoint Store Module
 *
 * DESIGN DECISION: one JSON file per checkpoint, filename encodes
 * {entity_id, stage, id} so listing/filtering are path-only operations.
 * WHY: spec §4.4 requires this; it also makes `clean_old`/`clean_successful`
 * cheap (no need to open every file to know its entity_id/stage).
 *
 * PATTERN: original_source/.../recovery/checkpoint.py (CheckpointManager,
 * CheckpointedTask). Atomic write via temp-file + rename, per spec §5.
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{classify_io, classify_json, Error, ErrorKind};

/// A persisted snapshot of pipeline progress for one (entity_id, stage) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub entity_id: String,
    pub stage: String,
    pub timestamp: DateTime<Utc>,
    pub data: BTreeMap<String, Value>,
}

impl Checkpoint {
    fn file_stem(&self) -> String {
        format!("{}_{}_{}", self.entity_id, self.stage, self.id)
    }
}

fn sanitize_component(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

/// Filesystem-scoped checkpoint store.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| classify_io(&e, dir.display().to_string()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, entity_id: &str, stage: &str, id: &str) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}.json",
            sanitize_component(entity_id),
            sanitize_component(stage),
            sanitize_component(id)
        ))
    }

    /// Create and immediately persist a new checkpoint, returning it.
    pub fn create(
        &self,
        entity_id: impl Into<String>,
        stage: impl Into<String>,
        data: BTreeMap<String, Value>,
    ) -> Result<Checkpoint, Error> {
        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            entity_id: entity_id.into(),
            stage: stage.into(),
            timestamp: Utc::now(),
            data,
        };
        self.save(&checkpoint)?;
        Ok(checkpoint)
    }

    /// Persist `checkpoint` via temp-file-then-rename, the commit point
    /// being the rename itself (spec §5: atomic writes for concurrent
    /// writers).
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), Error> {
        let final_path = self.path_for(&checkpoint.entity_id, &checkpoint.stage, &checkpoint.id);
        let tmp_path = self.dir.join(format!("{}.tmp-{}", checkpoint.file_stem(), Uuid::new_v4()));

        let json = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| classify_json(&e, "serialize checkpoint"))?;
        fs::write(&tmp_path, json).map_err(|e| classify_io(&e, tmp_path.display().to_string()))?;
        fs::rename(&tmp_path, &final_path)
            .map_err(|e| classify_io(&e, final_path.display().to_string()))?;
        Ok(())
    }

    pub fn load(&self, entity_id: &str, stage: &str, id: &str) -> Result<Checkpoint, Error> {
        let path = self.path_for(entity_id, stage, id);
        let content = fs::read_to_string(&path).map_err(|e| {
            classify_io(&e, path.display().to_string()).with_kind_override(ErrorKind::CheckpointError)
        })?;
        serde_json::from_str(&content).map_err(|e| classify_json(&e, "deserialize checkpoint"))
    }

    /// List checkpoints, optionally filtered by entity_id and/or stage.
    pub fn list(&self, entity_id: Option<&str>, stage: Option<&str>) -> Result<Vec<Checkpoint>, Error> {
        let mut out = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|e| classify_io(&e, self.dir.display().to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| classify_io(&e, self.dir.display().to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let checkpoint: Checkpoint = match serde_json::from_str(&content) {
                Ok(c) => c,
                Err(_) => continue,
            };
            if let Some(e) = entity_id {
                if checkpoint.entity_id != e {
                    continue;
                }
            }
            if let Some(s) = stage {
                if checkpoint.stage != s {
                    continue;
                }
            }
            out.push(checkpoint);
        }
        Ok(out)
    }

    /// Newest checkpoint (by timestamp) for an (entity_id, stage) pair.
    pub fn latest(&self, entity_id: &str, stage: &str) -> Result<Option<Checkpoint>, Error> {
        let mut all = self.list(Some(entity_id), Some(stage))?;
        all.sort_by_key(|c| c.timestamp);
        Ok(all.pop())
    }

    pub fn delete(&self, entity_id: &str, stage: &str, id: &str) -> Result<(), Error> {
        let path = self.path_for(entity_id, stage, id);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| classify_io(&e, path.display().to_string()))?;
        }
        Ok(())
    }

    /// Delete all checkpoints older than `max_age`. Returns the count removed.
    pub fn clean_old(&self, max_age: Duration) -> Result<usize, Error> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut removed = 0;
        for checkpoint in self.list(None, None)? {
            if checkpoint.timestamp < cutoff {
                self.delete(&checkpoint.entity_id, &checkpoint.stage, &checkpoint.id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete all checkpoints for `entity_id` except those at `final_stage`
    /// (spec §4.4: prune everything but the terminal checkpoint).
    pub fn clean_successful(&self, entity_id: &str, final_stage: &str) -> Result<usize, Error> {
        let mut removed = 0;
        for checkpoint in self.list(Some(entity_id), None)? {
            if checkpoint.stage != final_stage {
                self.delete(&checkpoint.entity_id, &checkpoint.stage, &checkpoint.id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl Error {
    fn with_kind_override(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Composes a checkpoint store with a unit of work: before running `f`, the
/// latest checkpoint for (entity_id, stage) is loaded and handed to it; `f`
/// may call `save` on the returned sidecar to record progress mid-run. On
/// normal completion a terminal `<stage>_completed` checkpoint is saved.
/// (spec §4.4 CheckpointedTask.)
pub struct CheckpointedTask<'a> {
    store: &'a CheckpointStore,
    entity_id: String,
    stage: String,
    cleanup_on_success: bool,
}

impl<'a> CheckpointedTask<'a> {
    pub fn new(store: &'a CheckpointStore, entity_id: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            store,
            entity_id: entity_id.into(),
            stage: stage.into(),
            cleanup_on_success: false,
        }
    }

    /// When set, `clean_successful` is run after the terminal checkpoint is
    /// saved, pruning earlier in-progress checkpoints for this entity
    /// (supplemental behavior from original_source, see SPEC_FULL.md §4).
    pub fn with_cleanup_on_success(mut self, cleanup: bool) -> Self {
        self.cleanup_on_success = cleanup;
        self
    }

    pub fn latest_data(&self) -> Result<Option<BTreeMap<String, Value>>, Error> {
        Ok(self
            .store
            .latest(&self.entity_id, &self.stage)?
            .map(|c| c.data))
    }

    pub fn checkpoint_progress(&self, data: BTreeMap<String, Value>) -> Result<Checkpoint, Error> {
        self.store.create(self.entity_id.clone(), self.stage.clone(), data)
    }

    /// Run `f`, passing it the latest checkpoint data if any, then save a
    /// terminal `<stage>_completed` checkpoint holding `f`'s result data.
    pub fn run<T>(
        &self,
        f: impl FnOnce(Option<BTreeMap<String, Value>>) -> Result<(T, BTreeMap<String, Value>), Error>,
    ) -> Result<T, Error> {
        let prior = self.latest_data()?;
        let (value, result_data) = f(prior)?;
        let completed_stage = format!("{}_completed", self.stage);
        self.store
            .create(self.entity_id.clone(), completed_stage.clone(), result_data)?;
        if self.cleanup_on_success {
            self.store.clean_successful(&self.entity_id, &completed_stage)?;
        }
        Ok(value)
    }
}
