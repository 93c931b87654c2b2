use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use log::{debug, info};
use sled::IVec;
use uuid::Uuid;

use crate::engine::errors::EngineError;
use crate::engine::types::{DangerAttempt, EngineState, STATE_SCHEMA_VERSION};

const TREE_PRIMARY: &str = "ncterm";
const TREE_DANGER: &str = "ncterm_danger_log";
pub const LOCK_FILE: &str = "ncterm.lock";

/// Helper builder so tests can create throwaway stores with custom paths.
pub struct GameStoreBuilder {
    path: PathBuf,
    lock: bool,
}

impl GameStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: true,
        }
    }

    /// Skip the exclusive lock file (read-only tooling such as `status`).
    pub fn without_lock(mut self) -> Self {
        self.lock = false;
        self
    }

    pub fn open(self) -> Result<GameStore, EngineError> {
        GameStore::open_with_options(self.path, self.lock)
    }
}

/// Sled-backed persistence for player state and the dangerous-command log.
pub struct GameStore {
    _db: sled::Db,
    primary: sled::Tree,
    danger: sled::Tree,
    _lock: Option<File>,
}

impl GameStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, lock: bool) -> Result<Self, EngineError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let lock = if lock {
            Some(Self::acquire_lock(path_ref)?)
        } else {
            None
        };
        let db = sled::open(path_ref.join("db"))?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let danger = db.open_tree(TREE_DANGER)?;
        debug!("opened game store at {}", path_ref.display());
        Ok(Self {
            _db: db,
            primary,
            danger,
            _lock: lock,
        })
    }

    fn acquire_lock(dir: &Path) -> Result<File, EngineError> {
        let lock_path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        file.try_lock_exclusive()
            .map_err(|_| EngineError::Locked(lock_path.display().to_string()))?;
        Ok(file)
    }

    fn players_key(id: &str) -> Vec<u8> {
        format!("players:{}", id.to_ascii_lowercase()).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, EngineError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, EngineError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    pub fn get_player(&self, id: &str) -> Result<EngineState, EngineError> {
        let key = Self::players_key(id);
        let Some(bytes) = self.primary.get(&key)? else {
            return Err(EngineError::NotFound(format!("player: {}", id)));
        };
        let state: EngineState = Self::deserialize(bytes)?;
        if state.schema_version != STATE_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "player",
                expected: STATE_SCHEMA_VERSION,
                found: state.schema_version,
            });
        }
        Ok(state)
    }

    /// Stored state for `id`, or a fresh recruit when none exists yet.
    pub fn load_player(
        &self,
        id: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<EngineState, EngineError> {
        match self.get_player(id) {
            Ok(state) => Ok(state),
            Err(EngineError::NotFound(_)) => {
                info!("creating new player '{}'", id);
                Ok(EngineState::new(id, display_name, now))
            }
            Err(e) => Err(e),
        }
    }

    pub fn save_player(&self, state: &EngineState) -> Result<(), EngineError> {
        let mut state = state.clone();
        state.schema_version = STATE_SCHEMA_VERSION;
        let key = Self::players_key(&state.player.id);
        let bytes = Self::serialize(&state)?;
        self.primary.insert(key, bytes)?;
        self.primary.flush()?;
        Ok(())
    }

    pub fn list_player_ids(&self) -> Result<Vec<String>, EngineError> {
        let mut ids = Vec::new();
        for entry in self.primary.scan_prefix(b"players:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(id) = text.strip_prefix("players:") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Append to the unbounded dangerous-attempt log.
    pub fn append_danger(&self, player_id: &str, attempt: &DangerAttempt) -> Result<(), EngineError> {
        let key = format!(
            "danger:{}:{}:{}",
            player_id.to_ascii_lowercase(),
            attempt.at.format("%Y%m%d%H%M%S%f"),
            Uuid::new_v4()
        );
        self.danger.insert(key.into_bytes(), Self::serialize(attempt)?)?;
        Ok(())
    }

    pub fn danger_log(&self, player_id: &str) -> Result<Vec<DangerAttempt>, EngineError> {
        let prefix = format!("danger:{}:", player_id.to_ascii_lowercase());
        let mut out = Vec::new();
        for entry in self.danger.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = entry?;
            out.push(Self::deserialize(bytes)?);
        }
        Ok(out)
    }

    pub fn flush(&self) -> Result<(), EngineError> {
        self.primary.flush()?;
        self.danger.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Severity;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn missing_player_loads_fresh() {
        let dir = TempDir::new().unwrap();
        let store = GameStoreBuilder::new(dir.path()).open().unwrap();
        assert!(matches!(store.get_player("nobody"), Err(EngineError::NotFound(_))));
        let state = store.load_player("nobody", "Nobody", now()).unwrap();
        assert_eq!(state.player.xp, 0);
    }

    #[test]
    fn second_open_is_locked() {
        let dir = TempDir::new().unwrap();
        let _first = GameStoreBuilder::new(dir.path()).open().unwrap();
        assert!(matches!(
            GameStoreBuilder::new(dir.path()).open(),
            Err(EngineError::Locked(_))
        ));
    }

    #[test]
    fn schema_mismatch_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = GameStoreBuilder::new(dir.path()).open().unwrap();
        let mut state = EngineState::new("p1", "Pat", now());
        state.schema_version = STATE_SCHEMA_VERSION + 1;
        store
            .primary
            .insert(GameStore::players_key("p1"), bincode::serialize(&state).unwrap())
            .unwrap();
        assert!(matches!(
            store.get_player("p1"),
            Err(EngineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn danger_log_is_per_player() {
        let dir = TempDir::new().unwrap();
        let store = GameStoreBuilder::new(dir.path()).open().unwrap();
        let attempt = DangerAttempt {
            at: now(),
            input: "rm -rf /".into(),
            rule_id: "wipe_root".into(),
            severity: Severity::Critical,
        };
        store.append_danger("p1", &attempt).unwrap();
        store.append_danger("p1", &attempt).unwrap();
        store.append_danger("p2", &attempt).unwrap();
        assert_eq!(store.danger_log("p1").unwrap().len(), 2);
        assert_eq!(store.danger_log("P2").unwrap(), vec![attempt]);
    }
}
