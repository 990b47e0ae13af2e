//! プラットフォームスキン

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageError};

pub const KEY_SELECTED_SKIN: &str = "selectedSkin";

/// 模倣するプラットフォーム
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    TikTok,
    Instagram,
    YouTube,
    Snapchat,
    Facebook,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::TikTok,
        Platform::Instagram,
        Platform::YouTube,
        Platform::Snapchat,
        Platform::Facebook,
    ];

    pub fn as_key(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::YouTube => "youtube",
            Platform::Snapchat => "snapchat",
            Platform::Facebook => "facebook",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|platform| platform.as_key().eq_ignore_ascii_case(key))
    }

    /// 未知のキーはTikTokにフォールバック
    pub fn resolve(key: &str) -> Self {
        Self::from_key(key).unwrap_or_else(|| {
            debug!("Unknown platform key {:?}, falling back to tiktok", key);
            Platform::TikTok
        })
    }

    pub fn icon(&self) -> &'static str {
        theme_for(*self).icon
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(theme_for(*self).display_name)
    }
}

/// スキンの配色と表示名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformTheme {
    pub platform_key: &'static str,
    pub background_color: &'static str,
    pub primary_color: &'static str,
    pub secondary_color: &'static str,
    pub text_color: &'static str,
    pub username_color: &'static str,
    pub display_name: &'static str,
    pub icon: &'static str,
}

const TIKTOK_THEME: PlatformTheme = PlatformTheme {
    platform_key: "tiktok",
    background_color: "#000000",
    primary_color: "#FE2C55",
    secondary_color: "#25F4EE",
    text_color: "#FFFFFF",
    username_color: "#25F4EE",
    display_name: "TikTok",
    icon: "🎵",
};

const INSTAGRAM_THEME: PlatformTheme = PlatformTheme {
    platform_key: "instagram",
    background_color: "#000000",
    primary_color: "#E1306C",
    secondary_color: "#F77737",
    text_color: "#FFFFFF",
    username_color: "#FCAF45",
    display_name: "Instagram",
    icon: "📷",
};

const YOUTUBE_THEME: PlatformTheme = PlatformTheme {
    platform_key: "youtube",
    background_color: "#0F0F0F",
    primary_color: "#FF0000",
    secondary_color: "#282828",
    text_color: "#FFFFFF",
    username_color: "#AAAAAA",
    display_name: "YouTube",
    icon: "📺",
};

const SNAPCHAT_THEME: PlatformTheme = PlatformTheme {
    platform_key: "snapchat",
    background_color: "#FFFC00",
    primary_color: "#000000",
    secondary_color: "#FFFFFF",
    text_color: "#000000",
    username_color: "#0EADFF",
    display_name: "Snapchat",
    icon: "👻",
};

const FACEBOOK_THEME: PlatformTheme = PlatformTheme {
    platform_key: "facebook",
    background_color: "#18191A",
    primary_color: "#1877F2",
    secondary_color: "#3A3B3C",
    text_color: "#E4E6EB",
    username_color: "#4599FF",
    display_name: "Facebook",
    icon: "👥",
};

pub fn theme_for(platform: Platform) -> PlatformTheme {
    match platform {
        Platform::TikTok => TIKTOK_THEME,
        Platform::Instagram => INSTAGRAM_THEME,
        Platform::YouTube => YOUTUBE_THEME,
        Platform::Snapchat => SNAPCHAT_THEME,
        Platform::Facebook => FACEBOOK_THEME,
    }
}

/// 選択中スキンの永続化
pub struct SkinSelection<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SkinSelection<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// 保存済みのスキン（読めなければTikTok）
    pub fn current(&self) -> Platform {
        match self.store.get_item(KEY_SELECTED_SKIN) {
            Ok(Some(key)) => Platform::resolve(&key),
            Ok(None) => Platform::default(),
            Err(e) => {
                warn!("⚠️ [SKIN] Failed to load selected skin: {}", e);
                Platform::default()
            }
        }
    }

    pub fn select(&self, platform: Platform) -> Result<(), StorageError> {
        self.store.set_item(KEY_SELECTED_SKIN, platform.as_key())?;
        debug!("🎨 [SKIN] Selected {}", platform.as_key());
        Ok(())
    }
}
