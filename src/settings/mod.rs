//! ユーザー設定の永続化
//!
//! 設定値はキー・バリューストアに個別キーで保存する。読み込みは
//! ベストエフォートで、失敗したキーは既定値のまま残す。

pub mod recordings;
pub mod skins;

use tracing::{debug, info, warn};

use crate::simulator::{CommentMode, SimulatorConfig, ViewerTier};
use crate::storage::{KeyValueStore, StorageError};

pub use recordings::{RecordingLibrary, RecordingMetadata, RECORDING_DURATION_SECS};
pub use skins::{theme_for, Platform, PlatformTheme, SkinSelection};

pub const KEY_VIEWER_LEVEL: &str = "viewerLevel";
pub const KEY_COMMENT_MODE: &str = "commentMode";
pub const KEY_SHOW_WATERMARK: &str = "showWatermark";
pub const KEY_AUTO_START: &str = "autoStart";
pub const KEY_SOUND_ENABLED: &str = "soundEnabled";

/// 設定として保存される全キー
pub const SETTINGS_KEYS: [&str; 5] = [
    KEY_VIEWER_LEVEL,
    KEY_COMMENT_MODE,
    KEY_SHOW_WATERMARK,
    KEY_AUTO_START,
    KEY_SOUND_ENABLED,
];

/// ユーザー設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSettings {
    pub viewer_tier: ViewerTier,
    pub comment_mode: CommentMode,
    pub show_watermark: bool,
    pub auto_start: bool,
    pub sound_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            viewer_tier: ViewerTier::Medium,
            comment_mode: CommentMode::Fanboy,
            show_watermark: true,
            auto_start: true,
            sound_enabled: false,
        }
    }
}

impl UserSettings {
    /// シミュレーター設定へ変換（ステージサイズは既定値）
    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            viewer_tier: self.viewer_tier,
            comment_mode: self.comment_mode,
            ..Default::default()
        }
    }
}

/// 設定ストア
pub struct SettingsStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 設定を読み込む
    ///
    /// 読めないキー・不正な値は警告ログを出して既定値を使う。
    /// エラーは返さない。
    pub fn load(&self) -> UserSettings {
        let mut settings = UserSettings::default();

        if let Some(raw) = self.read_key(KEY_VIEWER_LEVEL) {
            settings.viewer_tier = ViewerTier::resolve(&raw);
        }
        if let Some(raw) = self.read_key(KEY_COMMENT_MODE) {
            settings.comment_mode = CommentMode::resolve(&raw);
        }
        if let Some(value) = self.read_bool(KEY_SHOW_WATERMARK) {
            settings.show_watermark = value;
        }
        if let Some(value) = self.read_bool(KEY_AUTO_START) {
            settings.auto_start = value;
        }
        if let Some(value) = self.read_bool(KEY_SOUND_ENABLED) {
            settings.sound_enabled = value;
        }

        debug!("⚙️ [SETTINGS] Loaded: {:?}", settings);
        settings
    }

    /// 全キーを書き込む
    pub fn save(&self, settings: &UserSettings) -> Result<(), StorageError> {
        self.store
            .set_item(KEY_VIEWER_LEVEL, settings.viewer_tier.as_key())?;
        self.store
            .set_item(KEY_COMMENT_MODE, settings.comment_mode.as_key())?;
        self.write_bool(KEY_SHOW_WATERMARK, settings.show_watermark)?;
        self.write_bool(KEY_AUTO_START, settings.auto_start)?;
        self.write_bool(KEY_SOUND_ENABLED, settings.sound_enabled)?;
        info!("✅ [SETTINGS] Saved");
        Ok(())
    }

    /// 全キーを削除して既定値を返す
    pub fn reset(&self) -> Result<UserSettings, StorageError> {
        self.store.multi_remove(&SETTINGS_KEYS)?;
        info!("🔄 [SETTINGS] Reset to defaults");
        Ok(UserSettings::default())
    }

    pub fn set_viewer_tier(&self, tier: ViewerTier) -> Result<(), StorageError> {
        self.store.set_item(KEY_VIEWER_LEVEL, tier.as_key())
    }

    pub fn set_comment_mode(&self, mode: CommentMode) -> Result<(), StorageError> {
        self.store.set_item(KEY_COMMENT_MODE, mode.as_key())
    }

    pub fn set_show_watermark(&self, enabled: bool) -> Result<(), StorageError> {
        self.write_bool(KEY_SHOW_WATERMARK, enabled)
    }

    pub fn set_auto_start(&self, enabled: bool) -> Result<(), StorageError> {
        self.write_bool(KEY_AUTO_START, enabled)
    }

    pub fn set_sound_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        self.write_bool(KEY_SOUND_ENABLED, enabled)
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.store.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ [SETTINGS] Failed to read '{}': {}", key, e);
                None
            }
        }
    }

    fn read_bool(&self, key: &str) -> Option<bool> {
        let raw = self.read_key(key)?;
        match serde_json::from_str::<bool>(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("⚠️ [SETTINGS] Ignoring malformed '{}' = {:?}: {}", key, raw, e);
                None
            }
        }
    }

    fn write_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(&value)?;
        self.store.set_item(key, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults_when_store_is_empty() {
        let settings = SettingsStore::new(MemoryStore::new()).load();
        assert_eq!(settings, UserSettings::default());
        assert_eq!(settings.viewer_tier, ViewerTier::Medium);
        assert_eq!(settings.comment_mode, CommentMode::Fanboy);
        assert!(settings.show_watermark);
        assert!(settings.auto_start);
        assert!(!settings.sound_enabled);
    }

    #[test]
    fn test_save_writes_expected_encodings() {
        let store = SettingsStore::new(MemoryStore::new());
        let settings = UserSettings {
            viewer_tier: ViewerTier::High,
            comment_mode: CommentMode::Troll,
            show_watermark: false,
            auto_start: true,
            sound_enabled: true,
        };
        store.save(&settings).expect("save");

        let raw = |key: &str| store.store().get_item(key).expect("get");
        assert_eq!(raw(KEY_VIEWER_LEVEL).as_deref(), Some("HIGH"));
        assert_eq!(raw(KEY_COMMENT_MODE).as_deref(), Some("troll"));
        assert_eq!(raw(KEY_SHOW_WATERMARK).as_deref(), Some("false"));
        assert_eq!(raw(KEY_SOUND_ENABLED).as_deref(), Some("true"));

        assert_eq!(store.load(), settings);
    }

    #[test]
    fn test_unknown_keys_fall_back() {
        let memory = MemoryStore::new();
        memory.set_item(KEY_VIEWER_LEVEL, "ULTRA").expect("set");
        memory.set_item(KEY_COMMENT_MODE, "sarcastic").expect("set");
        memory.set_item(KEY_AUTO_START, "maybe").expect("set");

        let settings = SettingsStore::new(memory).load();
        assert_eq!(settings.viewer_tier, ViewerTier::Medium);
        assert_eq!(settings.comment_mode, CommentMode::Fanboy);
        assert!(settings.auto_start);
    }

    #[test]
    fn test_reset_removes_keys() {
        let store = SettingsStore::new(MemoryStore::new());
        store.set_viewer_tier(ViewerTier::Low).expect("set");
        store.set_sound_enabled(true).expect("set");

        let settings = store.reset().expect("reset");
        assert_eq!(settings, UserSettings::default());
        assert!(store.store().is_empty());
        assert_eq!(store.load(), UserSettings::default());
    }
}
