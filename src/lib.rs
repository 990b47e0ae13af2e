pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod settings;
pub mod simulator;
pub mod sources;
pub mod storage;

// Re-export the main error types for convenience
pub use error::{ViralStageError, ViralStageResult};

// Re-export the engine entry points
pub use session::{LiveSession, SessionEvent, SessionSnapshot};
pub use simulator::{CommentMode, SimulatorConfig, ViewerTier};

// Re-export persistence helpers
pub use settings::{Platform, RecordingLibrary, SettingsStore, SkinSelection, UserSettings};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        assert!(std::any::type_name::<LiveSession>().contains("LiveSession"));
        assert!(std::any::type_name::<SettingsStore<MemoryStore>>().contains("SettingsStore"));
    }

    #[test]
    fn test_simulator_config_from_keys() {
        let config = SimulatorConfig::from_keys("HIGH", "multilingual");
        assert_eq!(config.viewer_tier, ViewerTier::High);
        assert_eq!(config.comment_mode, CommentMode::Multilingual);

        let fallback = SimulatorConfig::from_keys("", "???");
        assert_eq!(fallback, SimulatorConfig::default());
    }
}
