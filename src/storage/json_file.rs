//! JSONファイル1つに全キーを保存するストア
//!
//! 書き込みは一時ファイルに出力してからrenameで置き換える。
//! 壊れたファイルへの書き込みは`.corrupt`に退避してから空の状態で始める。

use directories::ProjectDirs;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{KeyValueStore, StorageError};

const STORAGE_FILE_NAME: &str = "storage.json";

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // 読み込み〜書き込みの間に他の書き込みが割り込まないようにする
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// XDGデータディレクトリ配下の既定パス
    fn default_path() -> Result<PathBuf, StorageError> {
        let project_dirs = ProjectDirs::from("dev", "sifyfy", "viralstage").ok_or_else(|| {
            StorageError::Unavailable("Failed to get project directories".to_string())
        })?;
        Ok(project_dirs.data_dir().join(STORAGE_FILE_NAME))
    }

    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(items)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            warn!("❌ [STORAGE] Failed to replace {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        debug!("💾 [STORAGE] Wrote {} keys to {}", items.len(), self.path.display());
        Ok(())
    }

    /// 壊れたファイルを`.corrupt`として残す
    fn set_aside_corrupt_file(&self) {
        let backup = self.corrupt_backup_path();
        match fs::rename(&self.path, &backup) {
            Ok(()) => info!("📦 [STORAGE] Corrupt store moved to {}", backup.display()),
            Err(e) => warn!("❌ [STORAGE] Could not move corrupt store aside: {}", e),
        }
    }

    fn corrupt_backup_path(&self) -> PathBuf {
        self.path.with_extension("json.corrupt")
    }

    fn update<F>(&self, mutate: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock();
        let mut items = match self.read_all() {
            Ok(items) => items,
            Err(StorageError::Json(e)) => {
                warn!(
                    "⚠️ [STORAGE] {} is corrupt ({}), starting from an empty store",
                    self.path.display(),
                    e
                );
                self.set_aside_corrupt_file();
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        mutate(&mut items);
        self.write_all(&items)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.update(|items| {
            items.remove(key);
        })
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.update(|items| {
            for key in keys {
                items.remove(*key);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("storage.json");

        let store = JsonFileStore::new(&path);
        store.set_item("viewerLevel", "HIGH").expect("set");
        store.set_item("showWatermark", "false").expect("set");

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get_item("viewerLevel").expect("get").as_deref(),
            Some("HIGH")
        );
        assert_eq!(
            reopened.get_item("showWatermark").expect("get").as_deref(),
            Some("false")
        );
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get_item("anything").expect("get"), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("storage.json");
        fs::write(&path, "{ not json").expect("write");

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get_item("x"), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_writes_recover_from_corrupt_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("storage.json");
        fs::write(&path, "{ not json").expect("write");

        let store = JsonFileStore::new(&path);
        store
            .multi_remove(&["viewerLevel", "commentMode"])
            .expect("multi_remove on corrupt file");
        store.set_item("viewerLevel", "LOW").expect("set after recovery");

        assert_eq!(
            store.get_item("viewerLevel").expect("get").as_deref(),
            Some("LOW")
        );
        let backup = fs::read_to_string(store.corrupt_backup_path()).expect("backup kept");
        assert_eq!(backup, "{ not json");
    }

    #[test]
    fn test_multi_remove() {
        let dir = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("storage.json"));
        store.set_item("a", "1").expect("set");
        store.set_item("b", "2").expect("set");
        store.set_item("c", "3").expect("set");
        store.multi_remove(&["a", "b"]).expect("remove");
        assert_eq!(store.get_item("a").expect("get"), None);
        assert_eq!(store.get_item("c").expect("get").as_deref(), Some("3"));
    }
}
