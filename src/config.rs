//! アプリケーション設定管理モジュール
//!
//! XDGディレクトリを使用した設定ファイル（TOML）の永続化と管理を提供します。
//! ここにあるのは実行環境の設定で、ユーザー設定（視聴者レベル等）は
//! `settings`モジュールがキー・バリューストアに保存します。

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::session::SessionTiming;
use crate::simulator::reactions::StageSize;
use crate::simulator::{COMMENT_TICK_INTERVAL, REACTION_TICK_INTERVAL, VIEWER_TICK_INTERVAL};
use crate::sources::TextGenerationConfig;

/// ログ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// カスタムログディレクトリ（Noneの場合はXDGデフォルト使用）
    pub log_dir: Option<PathBuf>,
    /// ログレベル (trace/debug/info/warn/error)
    pub log_level: String,
    /// ファイル出力有効化
    pub enable_file_logging: bool,
    /// ログファイル名の接頭辞
    pub log_file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_level: "info".to_string(),
            enable_file_logging: false,
            log_file_prefix: "viralstage.log".to_string(),
        }
    }
}

impl LogConfig {
    /// ログの出力先ディレクトリ
    pub fn resolve_log_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.log_dir {
            return Ok(dir.clone());
        }
        let project_dirs = project_dirs()?;
        Ok(project_dirs.data_dir().join("logs"))
    }
}

/// ティック周期（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub viewer_interval_ms: u64,
    pub comment_interval_ms: u64,
    pub reaction_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            viewer_interval_ms: VIEWER_TICK_INTERVAL.as_millis() as u64,
            comment_interval_ms: COMMENT_TICK_INTERVAL.as_millis() as u64,
            reaction_interval_ms: REACTION_TICK_INTERVAL.as_millis() as u64,
        }
    }
}

impl From<TimingConfig> for SessionTiming {
    fn from(config: TimingConfig) -> Self {
        // 0msはタイマーが空回りするので1msに切り上げる
        let millis = |ms: u64| Duration::from_millis(ms.max(1));
        Self {
            viewer_interval: millis(config.viewer_interval_ms),
            comment_interval: millis(config.comment_interval_ms),
            reaction_interval: millis(config.reaction_interval_ms),
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 乱数シード（Noneでエントロピーから）
    #[serde(default)]
    pub seed: Option<u64>,

    /// キー・バリューストアのファイル（Noneでデータディレクトリ既定値）
    #[serde(default)]
    pub storage_path: Option<PathBuf>,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub stage: StageSize,

    #[serde(default)]
    pub text_generation: TextGenerationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seed: None,
            storage_path: None,
            log: LogConfig::default(),
            timing: TimingConfig::default(),
            stage: StageSize::default(),
            text_generation: TextGenerationConfig::default(),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "sifyfy", "viralstage").context("Failed to get project directories")
}

/// 設定管理マネージャー
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// XDG設定ディレクトリを使う設定マネージャーを作成
    pub fn new() -> Result<Self> {
        Self::with_path(Self::get_config_path()?)
    }

    /// 任意のパスを使う設定マネージャーを作成
    pub fn with_path(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        Ok(Self { config_path })
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_file = project_dirs()?.config_dir().join("config.toml");
        debug!("Config file path: {}", config_file.display());
        Ok(config_file)
    }

    /// 設定を読み込み（ファイルが無ければ既定値）
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Config file not found, using default settings: {}",
                self.config_path.display()
            );
            return Ok(AppConfig::default());
        }

        let config_content = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config: AppConfig = toml::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse config file: {}",
                self.config_path.display()
            )
        })?;

        info!(
            "✅ Configuration loaded from: {}",
            self.config_path.display()
        );
        Ok(config)
    }

    /// 設定を保存
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        let config_content =
            toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, config_content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;

        info!("💾 Configuration saved to: {}", self.config_path.display());
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }

    /// 設定ファイルを削除して既定値に戻す
    pub fn reset_config(&self) -> Result<()> {
        if self.config_path.exists() {
            fs::remove_file(&self.config_path).with_context(|| {
                format!(
                    "Failed to remove config file: {}",
                    self.config_path.display()
                )
            })?;
            info!("🔄 Configuration reset to defaults");
        }
        Ok(())
    }
}
