//! 合成エンゲージメントシミュレーター
//!
//! 視聴者数のランダムウォーク、コメントフィード、浮遊リアクションの3つの
//! ジェネレーターで構成される。各ジェネレーターは自身の状態と乱数源を所有し、
//! `activate / tick / deactivate`で駆動される。タイマーは持たない。

pub mod clock;
pub mod comment_feed;
pub mod phrase_bank;
pub mod reactions;
pub mod viewer_count;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use comment_feed::{
    Comment, CommentFeedGenerator, CommentLog, CommentRow, COMMENT_LOG_CAPACITY,
    COMMENT_TICK_INTERVAL,
};
pub use phrase_bank::{CommentMode, REACTIONS};
pub use reactions::{
    ParticleState, ReactionParticle, ReactionScheduler, RemovalReason, SpawnOutcome, StageSize,
    MAX_ACTIVE_REACTIONS, REACTION_TICK_INTERVAL,
};
pub use viewer_count::{
    format_viewer_count, ViewerCountSimulator, ViewerTier, ViewerTierConfig, VIEWER_TICK_INTERVAL,
};

use serde::{Deserialize, Serialize};

/// ジェネレーターに渡す設定
///
/// 稼働中に`LiveSession::set_config`で差し替えられ、次のティックから反映される。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SimulatorConfig {
    pub viewer_tier: ViewerTier,
    pub comment_mode: CommentMode,
    #[serde(default)]
    pub stage: StageSize,
}

impl SimulatorConfig {
    /// 永続化キーから組み立てる（未知のキーは既定値へフォールバック）
    pub fn from_keys(viewer_tier: &str, comment_mode: &str) -> Self {
        Self {
            viewer_tier: ViewerTier::resolve(viewer_tier),
            comment_mode: CommentMode::resolve(comment_mode),
            stage: StageSize::default(),
        }
    }
}
