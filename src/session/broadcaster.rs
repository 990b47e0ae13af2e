//! セッションイベントのブロードキャスト
//!
//! ライブセッションで起きた変化をプッシュ型で通知する。
//! 表示側（ターミナル描画など）はサブスクライブして受け取るだけで、
//! セッションの状態をポーリングしない。

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::simulator::{Comment, ReactionParticle, RemovalReason};

/// イベントバッファのサイズ
pub const EVENT_BUFFER_SIZE: usize = 256;

/// セッションイベント
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// ライブ状態が切り替わった
    LiveChanged { is_live: bool },

    /// 視聴者数が更新された
    ViewerCountUpdated { count: u64, formatted: String },

    /// コメントが追加された（容量超過分は受信側で古い順に捨てる）
    CommentAdded(Comment),

    /// リアクションが生成された
    ReactionSpawned(ReactionParticle),

    /// リアクションが消えた
    ReactionRemoved { id: Uuid, reason: RemovalReason },

    /// 免責表示の表示状態が変わった
    DisclaimerChanged { visible: bool },
}

/// セッションイベントのブロードキャスター
pub struct SessionBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionBroadcaster {
    /// 遅いサブスクライバーは古いイベントを取りこぼす（lagged）
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// イベントを送信。サブスクライバーがいなければ破棄される
    pub fn broadcast(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
