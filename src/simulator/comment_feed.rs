//! コメントフィードジェネレーター
//!
//! 一定間隔でフレーズバンクから合成コメントを生成し、
//! 直近20件だけを保持するログ（FIFO）に追加する。

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use uuid::Uuid;

use super::clock::{system_clock, SharedClock};
use super::phrase_bank::{self, CommentMode};

/// ログに保持する最大コメント数
pub const COMMENT_LOG_CAPACITY: usize = 20;

/// 既定の生成間隔
pub const COMMENT_TICK_INTERVAL: Duration = Duration::from_millis(2000);

/// 合成チャットコメント（生成後は不変）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub username: String,
    pub text: String,
    /// 生成に使ったコメントモード
    pub mode: CommentMode,
    pub created_at: DateTime<Utc>,
}

/// 表示用の行
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommentRow<'a> {
    pub comment: &'a Comment,
    /// 最新行のみ入場アニメーション（フェードイン）対象
    pub entering: bool,
}

/// 容量制限付きコメントログ
#[derive(Debug, Clone)]
pub struct CommentLog {
    entries: VecDeque<Comment>,
    capacity: usize,
}

impl CommentLog {
    pub fn new() -> Self {
        Self::with_capacity(COMMENT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 末尾に追加し、容量超過時は最古のエントリを返す
    pub fn push(&mut self, comment: Comment) -> Option<Comment> {
        self.entries.push_back(comment);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Comment> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.entries.iter()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.iter().any(|c| c.id == id)
    }

    /// 到着順の表示行。最新行には`entering`フラグが立つ
    pub fn rows(&self) -> Vec<CommentRow<'_>> {
        let last = self.entries.len().saturating_sub(1);
        self.entries
            .iter()
            .enumerate()
            .map(|(index, comment)| CommentRow {
                comment,
                entering: index == last,
            })
            .collect()
    }

    /// 自動スクロールの目標（最新コメントのID）
    pub fn scroll_anchor(&self) -> Option<Uuid> {
        self.latest().map(|c| c.id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for CommentLog {
    fn default() -> Self {
        Self::new()
    }
}

/// コメントフィードジェネレーター
pub struct CommentFeedGenerator {
    mode: CommentMode,
    active: bool,
    log: CommentLog,
    rng: StdRng,
    clock: SharedClock,
}

impl CommentFeedGenerator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy(), system_clock())
    }

    pub fn with_seed(seed: u64, clock: SharedClock) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), clock)
    }

    pub fn with_rng(rng: StdRng, clock: SharedClock) -> Self {
        Self {
            mode: CommentMode::default(),
            active: false,
            log: CommentLog::new(),
            rng,
            clock,
        }
    }

    pub fn activate(&mut self, mode: CommentMode) {
        self.mode = mode;
        self.active = true;
        tracing::debug!(mode = mode.as_key(), "💬 [FEED] Comment feed activated");
    }

    /// モード変更（履歴は保持し、以降のティックにのみ影響）
    pub fn set_mode(&mut self, mode: CommentMode) {
        if self.mode != mode {
            tracing::debug!(
                from = self.mode.as_key(),
                to = mode.as_key(),
                "💬 [FEED] Comment mode changed"
            );
        }
        self.mode = mode;
    }

    /// フレーズバンクから1件生成して追加
    pub fn tick(&mut self) -> Option<Comment> {
        if !self.active {
            return None;
        }
        let mode = self.mode;
        let text = phrase_bank::draw_phrase(mode, &mut self.rng);
        self.append_text(text, mode)
    }

    /// 外部ソースが生成したテキストを追加
    pub fn append_text(&mut self, text: impl Into<String>, mode: CommentMode) -> Option<Comment> {
        if !self.active {
            return None;
        }
        let comment = Comment {
            id: Uuid::new_v4(),
            username: phrase_bank::draw_username(&mut self.rng),
            text: text.into(),
            mode,
            created_at: self.clock.now(),
        };
        if let Some(evicted) = self.log.push(comment.clone()) {
            tracing::trace!(id = %evicted.id, "💬 [FEED] Oldest comment evicted");
        }
        Some(comment)
    }

    /// 生成停止（ログは表示側のために残す）
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mode(&self) -> CommentMode {
        self.mode
    }

    pub fn log(&self) -> &CommentLog {
        &self.log
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}

impl Default for CommentFeedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommentFeedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentFeedGenerator")
            .field("mode", &self.mode)
            .field("active", &self.active)
            .field("log_len", &self.log.len())
            .finish()
    }
}
