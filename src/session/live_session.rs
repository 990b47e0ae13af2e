//! ライブセッション
//!
//! 3つのジェネレーターを1つのロックの下にまとめ、タイマーサービスで駆動する。
//!
//! 予約済みのコールバックや外部ソースへの問い合わせは、予約時点の
//! セッション世代を保持している。実行時に世代が変わっている、または
//! 対象のジェネレーターが停止していれば何もしない。

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::broadcaster::{SessionBroadcaster, SessionEvent};
use super::disclaimer::DisclaimerOverlay;
use super::timer_service::{TimerConfig, TimerContext, TimerResult, TimerService, TimerTaskType};
use crate::error::ViralStageResult;
use crate::settings::{Platform, RecordingMetadata};
use crate::simulator::clock::system_clock;
use crate::simulator::{
    format_viewer_count, Comment, CommentFeedGenerator, ReactionParticle,
    ReactionScheduler, RemovalReason, SharedClock, SimulatorConfig, ViewerCountSimulator,
    COMMENT_TICK_INTERVAL, REACTION_TICK_INTERVAL, VIEWER_TICK_INTERVAL,
};
use crate::sources::{CommentRequest, CommentSource, PhraseBankSource};

pub const VIEWER_TIMER_ID: &str = "viewer_count";
pub const COMMENT_TIMER_ID: &str = "comment_feed";
pub const REACTION_TIMER_ID: &str = "reactions";

fn reaction_timer_id(id: Uuid) -> String {
    format!("reaction_complete_{}", id)
}

/// 各ティックの周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub viewer_interval: Duration,
    pub comment_interval: Duration,
    pub reaction_interval: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            viewer_interval: VIEWER_TICK_INTERVAL,
            comment_interval: COMMENT_TICK_INTERVAL,
            reaction_interval: REACTION_TICK_INTERVAL,
        }
    }
}

/// 表示用のスナップショット
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub is_live: bool,
    pub config: SimulatorConfig,
    pub platform: Platform,
    pub viewer_count: Option<u64>,
    pub formatted_viewer_count: Option<String>,
    /// 古い順
    pub comments: Vec<Comment>,
    pub reactions: Vec<ReactionParticle>,
    pub disclaimer_visible: bool,
    pub watermark: Option<&'static str>,
    pub is_recording: bool,
}

struct SessionState {
    config: SimulatorConfig,
    viewer: ViewerCountSimulator,
    comments: CommentFeedGenerator,
    reactions: ReactionScheduler,
    disclaimer: DisclaimerOverlay,
    platform: Platform,
    is_live: bool,
    recording: bool,
    generation: u64,
}

struct Shared {
    state: Mutex<SessionState>,
    broadcaster: SessionBroadcaster,
    timers: TimerService,
    clock: SharedClock,
    timing: SessionTiming,
    source: Arc<dyn CommentSource>,
    speaker_name: String,
    topic: String,
}

/// LiveSessionのビルダー
pub struct LiveSessionBuilder {
    config: SimulatorConfig,
    timing: SessionTiming,
    seed: Option<u64>,
    clock: Option<SharedClock>,
    source: Option<Arc<dyn CommentSource>>,
    platform: Platform,
    show_watermark: bool,
    speaker_name: String,
    topic: String,
}

impl LiveSessionBuilder {
    fn new() -> Self {
        let request = CommentRequest::default();
        Self {
            config: SimulatorConfig::default(),
            timing: SessionTiming::default(),
            seed: None,
            clock: None,
            source: None,
            platform: Platform::default(),
            show_watermark: true,
            speaker_name: request.speaker_name,
            topic: request.topic,
        }
    }

    pub fn config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn timing(mut self, timing: SessionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// 乱数シード（3つのジェネレーターに別々のシードを派生させる）
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// コメントソース。未指定ならフレーズバンク（`PhraseBankSource`）
    pub fn comment_source(mut self, source: Arc<dyn CommentSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn show_watermark(mut self, enabled: bool) -> Self {
        self.show_watermark = enabled;
        self
    }

    pub fn speaker(mut self, speaker_name: impl Into<String>, topic: impl Into<String>) -> Self {
        self.speaker_name = speaker_name.into();
        self.topic = topic.into();
        self
    }

    pub fn build(self) -> LiveSession {
        let clock = self.clock.unwrap_or_else(system_clock);
        let rng = |offset: u64| match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(offset)),
            None => StdRng::from_entropy(),
        };

        let source: Arc<dyn CommentSource> = match (self.source, self.seed) {
            (Some(source), _) => source,
            (None, Some(seed)) => Arc::new(PhraseBankSource::with_seed(seed.wrapping_add(3))),
            (None, None) => Arc::new(PhraseBankSource::new()),
        };

        let state = SessionState {
            config: self.config,
            viewer: ViewerCountSimulator::with_rng(rng(0)),
            comments: CommentFeedGenerator::with_rng(rng(1), clock.clone()),
            reactions: ReactionScheduler::with_rng(rng(2), clock.clone())
                .with_stage(self.config.stage),
            disclaimer: DisclaimerOverlay::new(self.show_watermark),
            platform: self.platform,
            is_live: false,
            recording: false,
            generation: 0,
        };

        LiveSession {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                broadcaster: SessionBroadcaster::new(),
                timers: TimerService::new(),
                clock,
                timing: self.timing,
                source,
                speaker_name: self.speaker_name,
                topic: self.topic,
            }),
        }
    }
}

/// フェイク配信セッション
pub struct LiveSession {
    shared: Arc<Shared>,
}

impl LiveSession {
    pub fn new(config: SimulatorConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> LiveSessionBuilder {
        LiveSessionBuilder::new()
    }

    /// 配信開始
    ///
    /// 3つのジェネレーターを起動して周期タイマーを登録する。
    /// 既に配信中ならfalse。
    pub fn start(&self) -> ViralStageResult<bool> {
        let generation = {
            let mut state = self.shared.state.lock();
            if state.is_live {
                return Ok(false);
            }
            state.generation += 1;
            state.is_live = true;

            let config = state.config;
            let count = state.viewer.activate(config.viewer_tier);
            state.comments.activate(config.comment_mode);
            state.reactions.set_stage(config.stage);
            state.reactions.activate();

            self.shared
                .broadcaster
                .broadcast(SessionEvent::LiveChanged { is_live: true });
            self.shared.broadcaster.broadcast(SessionEvent::ViewerCountUpdated {
                count,
                formatted: format_viewer_count(count),
            });
            state.generation
        };

        if let Err(e) = self.schedule_production(generation) {
            self.stop();
            return Err(e);
        }

        info!(
            "🔴 [SESSION] Live (generation {}, tier {}, mode {})",
            generation,
            self.config().viewer_tier.as_key(),
            self.config().comment_mode.as_key()
        );
        Ok(true)
    }

    fn schedule_production(&self, generation: u64) -> ViralStageResult<()> {
        let timing = self.shared.timing;
        let weak = Arc::downgrade(&self.shared);

        self.shared.timers.start_task(
            VIEWER_TIMER_ID,
            TimerTaskType::ViewerCount,
            TimerConfig::periodic(timing.viewer_interval),
            tick_handler(weak.clone(), generation, Shared::on_viewer_tick),
        )?;
        self.shared.timers.start_task(
            COMMENT_TIMER_ID,
            TimerTaskType::CommentFeed,
            TimerConfig::periodic(timing.comment_interval),
            tick_handler(weak.clone(), generation, Shared::on_comment_tick),
        )?;
        self.shared.timers.start_task(
            REACTION_TIMER_ID,
            TimerTaskType::Reactions,
            TimerConfig::periodic(timing.reaction_interval),
            tick_handler(weak, generation, Shared::on_reaction_tick),
        )?;
        Ok(())
    }

    /// 配信停止
    ///
    /// 生成を止めて周期タイマーを解除する。飛行中のリアクションは
    /// 完了タイマーで最後まで消化される。
    pub fn stop(&self) -> bool {
        let was_live = {
            let mut state = self.shared.state.lock();
            let was_live = std::mem::replace(&mut state.is_live, false);
            state.viewer.deactivate();
            state.comments.deactivate();
            state.reactions.deactivate();
            if was_live {
                self.shared
                    .broadcaster
                    .broadcast(SessionEvent::LiveChanged { is_live: false });
            }
            was_live
        };

        for task_type in [
            TimerTaskType::ViewerCount,
            TimerTaskType::CommentFeed,
            TimerTaskType::Reactions,
        ] {
            self.shared.timers.cancel_tasks_by_type(&task_type);
        }

        if was_live {
            info!("⏹️ [SESSION] Stopped");
        }
        was_live
    }

    /// 破棄
    ///
    /// 全タイマー（リアクション完了を含む）を解除し、状態を空にする。
    /// 以降に届く古いコールバックや外部ソースの応答は捨てられる。
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.generation += 1;
            let was_live = std::mem::replace(&mut state.is_live, false);
            state.recording = false;
            state.viewer.deactivate();
            state.comments.deactivate();
            state.comments.clear();
            state.reactions.deactivate();
            state.reactions.clear();
            state.disclaimer.dismiss();
            if was_live {
                self.shared
                    .broadcaster
                    .broadcast(SessionEvent::LiveChanged { is_live: false });
            }
        }

        let cancelled = self.shared.timers.cancel_all_tasks();
        info!("🧹 [SESSION] Shut down ({} timers cancelled)", cancelled);
    }

    /// 設定差し替え。次のティックから反映される
    pub fn set_config(&self, config: SimulatorConfig) {
        let mut state = self.shared.state.lock();
        state.config = config;
        state.viewer.set_tier(config.viewer_tier);
        state.comments.set_mode(config.comment_mode);
        state.reactions.set_stage(config.stage);
        debug!(
            "⚙️ [SESSION] Config updated: tier {}, mode {}",
            config.viewer_tier.as_key(),
            config.comment_mode.as_key()
        );
    }

    pub fn config(&self) -> SimulatorConfig {
        self.shared.state.lock().config
    }

    pub fn set_platform(&self, platform: Platform) {
        self.shared.state.lock().platform = platform;
    }

    pub fn set_show_watermark(&self, enabled: bool) {
        self.shared.state.lock().disclaimer.set_show_watermark(enabled);
    }

    pub fn is_live(&self) -> bool {
        self.shared.state.lock().is_live
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.shared.state.lock();
        SessionSnapshot {
            is_live: state.is_live,
            config: state.config,
            platform: state.platform,
            viewer_count: state.viewer.current_count(),
            formatted_viewer_count: state.viewer.formatted(),
            comments: state.comments.log().iter().cloned().collect(),
            reactions: state.reactions.active().cloned().collect(),
            disclaimer_visible: state.disclaimer.is_visible(),
            watermark: state.disclaimer.watermark(),
            is_recording: state.recording,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.broadcaster.subscribe()
    }

    /// 録画開始。免責表示を出す。既に録画中ならfalse
    pub fn start_recording(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.recording {
            return false;
        }
        state.recording = true;
        if state.disclaimer.show() {
            self.shared
                .broadcaster
                .broadcast(SessionEvent::DisclaimerChanged { visible: true });
        }
        info!("⏺️ [SESSION] Recording started");
        true
    }

    /// 録画終了。録画中でなければNone
    pub fn stop_recording(&self) -> Option<RecordingMetadata> {
        let mut state = self.shared.state.lock();
        if !std::mem::replace(&mut state.recording, false) {
            return None;
        }
        let recording = RecordingMetadata::new(
            state.platform,
            self.shared.clock.now(),
            state.disclaimer.show_watermark(),
        );
        info!("⏹️ [SESSION] Recording stopped: {}", recording.id);
        Some(recording)
    }

    pub fn dismiss_disclaimer(&self) -> bool {
        let mut state = self.shared.state.lock();
        let changed = state.disclaimer.dismiss();
        if changed {
            self.shared
                .broadcaster
                .broadcast(SessionEvent::DisclaimerChanged { visible: false });
        }
        changed
    }

    /// 登録中のタイマー数
    pub fn pending_timers(&self) -> usize {
        self.shared.timers.active_count()
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.shared.timers.cancel_all_tasks();
    }
}

/// セッションが破棄されていればタイマーごと止める
fn tick_handler(
    weak: Weak<Shared>,
    generation: u64,
    on_tick: fn(&Arc<Shared>, u64),
) -> impl Fn(TimerContext) -> TimerResult + Send + Sync + 'static {
    move |_context| match weak.upgrade() {
        Some(shared) => {
            on_tick(&shared, generation);
            TimerResult::Continue
        }
        None => TimerResult::Cancel,
    }
}

impl Shared {
    fn on_viewer_tick(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        if let Some(count) = state.viewer.tick() {
            self.broadcaster.broadcast(SessionEvent::ViewerCountUpdated {
                count,
                formatted: format_viewer_count(count),
            });
        }
    }

    fn on_comment_tick(self: &Arc<Self>, generation: u64) {
        let source = self.source.clone();
        let request = {
            let state = self.state.lock();
            if state.generation != generation || !state.comments.is_active() {
                return;
            }
            CommentRequest::new(
                state.comments.mode(),
                self.speaker_name.clone(),
                self.topic.clone(),
            )
        };

        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let text = match source.produce_comment(&request).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("💬 [SESSION] {} produced no comment: {}", source.name(), e);
                    return;
                }
            };
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut state = shared.state.lock();
            if state.generation != generation {
                debug!("💬 [SESSION] Dropping comment from a stale request");
                return;
            }
            if let Some(comment) = state.comments.append_text(text, request.tone) {
                shared
                    .broadcaster
                    .broadcast(SessionEvent::CommentAdded(comment));
            }
        });
    }

    fn on_reaction_tick(self: &Arc<Self>, generation: u64) {
        // 完了タイマーの登録までロックを保持し、shutdownと交差させない
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        let Some(outcome) = state.reactions.tick() else {
            return;
        };
        for id in &outcome.evicted {
            self.timers.cancel_task(&reaction_timer_id(*id));
            self.broadcaster.broadcast(SessionEvent::ReactionRemoved {
                id: *id,
                reason: RemovalReason::Evicted,
            });
        }
        self.broadcaster
            .broadcast(SessionEvent::ReactionSpawned(outcome.particle.clone()));

        let id = outcome.particle.id;
        let weak = Arc::downgrade(self);
        let scheduled = self.timers.start_task(
            reaction_timer_id(id),
            TimerTaskType::ReactionComplete,
            TimerConfig::once(outcome.particle.duration),
            move |_context| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_reaction_complete(id);
                }
                TimerResult::Complete
            },
        );
        if let Err(e) = scheduled {
            warn!("🎉 [SESSION] Could not schedule completion for {}: {}", id, e);
            state.reactions.remove(id);
        }
    }

    /// パーティクルIDは一意なので、既に消えていれば何もしない
    fn on_reaction_complete(&self, id: Uuid) {
        let mut state = self.state.lock();
        if state.reactions.complete(id) {
            self.broadcaster.broadcast(SessionEvent::ReactionRemoved {
                id,
                reason: RemovalReason::Completed,
            });
        }
    }
}
