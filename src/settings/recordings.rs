//! 録画メタデータの一覧
//!
//! 動画そのものは扱わない。保存されるのはメタデータの配列のみで、
//! ストア上は古い順に並ぶ。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::skins::Platform;
use crate::storage::{KeyValueStore, StorageError};

pub const KEY_RECORDINGS: &str = "recordings";

/// 録画の長さ（秒）
pub const RECORDING_DURATION_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub id: String,
    pub platform: Platform,
    pub timestamp: DateTime<Utc>,
    /// 秒
    pub duration: u64,
    pub has_watermark: bool,
}

impl RecordingMetadata {
    pub fn new(platform: Platform, timestamp: DateTime<Utc>, has_watermark: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            platform,
            timestamp,
            duration: RECORDING_DURATION_SECS,
            has_watermark,
        }
    }
}

pub struct RecordingLibrary<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> RecordingLibrary<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn read(&self) -> Result<Vec<RecordingMetadata>, StorageError> {
        match self.store.get_item(KEY_RECORDINGS)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, recordings: &[RecordingMetadata]) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(recordings)?;
        self.store.set_item(KEY_RECORDINGS, &encoded)
    }

    /// 新しい順の一覧（読めなければ空）
    pub fn list(&self) -> Vec<RecordingMetadata> {
        match self.read() {
            Ok(mut recordings) => {
                recordings.reverse();
                recordings
            }
            Err(e) => {
                warn!("⚠️ [RECORDINGS] Failed to load recordings: {}", e);
                Vec::new()
            }
        }
    }

    pub fn add(&self, recording: RecordingMetadata) -> Result<(), StorageError> {
        let mut recordings = self.read().unwrap_or_else(|e| {
            warn!("⚠️ [RECORDINGS] Discarding unreadable recordings list: {}", e);
            Vec::new()
        });
        info!(
            "🎬 [RECORDINGS] Saved {} ({}s, watermark: {})",
            recording.id, recording.duration, recording.has_watermark
        );
        recordings.push(recording);
        self.write(&recordings)
    }

    /// 削除。該当IDが無ければfalse
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut recordings = self.read()?;
        let before = recordings.len();
        recordings.retain(|r| r.id != id);
        if recordings.len() == before {
            return Ok(false);
        }
        self.write(&recordings)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove_item(KEY_RECORDINGS)
    }
}
