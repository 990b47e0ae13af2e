//! 浮遊リアクションのスケジューラー
//!
//! 各パーティクルは`Spawned -> Animating -> Completed | Evicted`の状態を持つ。
//! 容量超過による退避とアニメーション完了による削除が競合しても、
//! ID指定の削除は冪等なので二重削除にはならない。

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use uuid::Uuid;

use super::clock::{system_clock, SharedClock};
use super::phrase_bank;

/// 同時に表示するリアクションの上限
pub const MAX_ACTIVE_REACTIONS: usize = 10;

/// 既定の生成間隔
pub const REACTION_TICK_INTERVAL: Duration = Duration::from_millis(1500);

/// 上昇アニメーション時間の範囲（ミリ秒）
pub const MIN_RISE_MILLIS: u64 = 3000;
pub const MAX_RISE_MILLIS: u64 = 5000;

/// 絵文字1つ分の幅。開始位置はステージ幅からこれを引いた範囲
pub const REACTION_GLYPH_WIDTH: f32 = 50.0;

/// 終点（ステージ上端より上）
pub const RISE_END_OFFSET: f32 = -100.0;

/// パーティクルの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleState {
    Spawned,
    Animating,
    Completed,
    Evicted,
}

impl ParticleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ParticleState::Completed | ParticleState::Evicted)
    }
}

/// 描画領域のサイズ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSize {
    pub width: f32,
    pub height: f32,
}

impl Default for StageSize {
    fn default() -> Self {
        Self {
            width: 390.0,
            height: 844.0,
        }
    }
}

/// 浮遊リアクション1つ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionParticle {
    pub id: Uuid,
    pub emoji: String,
    /// 水平方向の開始位置（px）
    pub horizontal_position: f32,
    pub duration: Duration,
    pub spawned_at: DateTime<Utc>,
    pub state: ParticleState,
}

impl ReactionParticle {
    /// アニメーション進捗（0.0〜1.0）
    pub fn progress(&self, now: DateTime<Utc>) -> f32 {
        let elapsed = (now - self.spawned_at).num_milliseconds().max(0) as f32;
        let total = self.duration.as_millis().max(1) as f32;
        (elapsed / total).min(1.0)
    }

    /// ステージ下端から上端の外へ向かう縦位置
    pub fn vertical_position(&self, now: DateTime<Utc>, stage: StageSize) -> f32 {
        let t = self.progress(now);
        stage.height + (RISE_END_OFFSET - stage.height) * t
    }

    pub fn is_finished(&self, now: DateTime<Utc>) -> bool {
        self.progress(now) >= 1.0
    }
}

/// パーティクルが取り除かれた理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    Completed,
    Evicted,
}

/// 1回のスポーン結果
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnOutcome {
    pub particle: ReactionParticle,
    /// 容量超過で退避されたID
    pub evicted: Vec<Uuid>,
}

/// リアクションスケジューラー
pub struct ReactionScheduler {
    active: VecDeque<ReactionParticle>,
    producing: bool,
    stage: StageSize,
    rng: StdRng,
    clock: SharedClock,
}

impl ReactionScheduler {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy(), system_clock())
    }

    pub fn with_seed(seed: u64, clock: SharedClock) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), clock)
    }

    pub fn with_rng(rng: StdRng, clock: SharedClock) -> Self {
        Self {
            active: VecDeque::with_capacity(MAX_ACTIVE_REACTIONS + 1),
            producing: false,
            stage: StageSize::default(),
            rng,
            clock,
        }
    }

    pub fn with_stage(mut self, stage: StageSize) -> Self {
        self.stage = stage;
        self
    }

    pub fn set_stage(&mut self, stage: StageSize) {
        self.stage = stage;
    }

    pub fn stage(&self) -> StageSize {
        self.stage
    }

    pub fn activate(&mut self) {
        self.producing = true;
        tracing::debug!("🎉 [REACTIONS] Reaction scheduler activated");
    }

    /// 生成停止。飛行中のパーティクルはそのまま完了まで残る
    pub fn deactivate(&mut self) {
        self.producing = false;
    }

    pub fn is_active(&self) -> bool {
        self.producing
    }

    /// 1つスポーンし、上限を超えた古いものを即座に退避する
    pub fn tick(&mut self) -> Option<SpawnOutcome> {
        if !self.producing {
            return None;
        }

        let max_x = (self.stage.width - REACTION_GLYPH_WIDTH).max(0.0);
        let horizontal_position = if max_x > 0.0 {
            self.rng.gen_range(0.0..max_x)
        } else {
            0.0
        };
        let duration =
            Duration::from_millis(self.rng.gen_range(MIN_RISE_MILLIS..=MAX_RISE_MILLIS));

        let mut particle = ReactionParticle {
            id: Uuid::new_v4(),
            emoji: phrase_bank::draw_reaction(&mut self.rng).to_string(),
            horizontal_position,
            duration,
            spawned_at: self.clock.now(),
            state: ParticleState::Spawned,
        };
        // 追加と同時にアニメーション開始
        particle.state = ParticleState::Animating;
        self.active.push_back(particle.clone());

        let mut evicted = Vec::new();
        while self.active.len() > MAX_ACTIVE_REACTIONS {
            if let Some(old) = self.active.front().map(|p| p.id) {
                if let Some(particle) = self.take(old, ParticleState::Evicted) {
                    evicted.push(particle.id);
                }
            }
        }
        if !evicted.is_empty() {
            tracing::trace!(count = evicted.len(), "🎉 [REACTIONS] Evicted oldest particles");
        }

        Some(SpawnOutcome { particle, evicted })
    }

    /// アニメーション完了。既に取り除かれていればfalse
    pub fn complete(&mut self, id: Uuid) -> bool {
        self.take(id, ParticleState::Completed).is_some()
    }

    /// ID指定で削除（冪等）
    pub fn remove(&mut self, id: Uuid) -> bool {
        self.take(id, ParticleState::Completed).is_some()
    }

    /// 終端状態に遷移させて取り出す
    fn take(&mut self, id: Uuid, terminal: ParticleState) -> Option<ReactionParticle> {
        let index = self.active.iter().position(|p| p.id == id)?;
        let mut particle = self.active.remove(index)?;
        particle.state = terminal;
        Some(particle)
    }

    /// 完了時刻を過ぎたパーティクルをまとめて取り除く
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<Uuid> {
        let finished: Vec<Uuid> = self
            .active
            .iter()
            .filter(|p| p.is_finished(now))
            .map(|p| p.id)
            .collect();
        for id in &finished {
            self.remove(*id);
        }
        finished
    }

    pub fn active(&self) -> impl Iterator<Item = &ReactionParticle> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.active.iter().any(|p| p.id == id)
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

impl Default for ReactionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReactionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionScheduler")
            .field("producing", &self.producing)
            .field("active", &self.active.len())
            .field("stage", &self.stage)
            .finish()
    }
}
