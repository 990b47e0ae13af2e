//! ライブセッションのタイマー駆動テスト
//!
//! tokioの時間を停止した状態で動かすので、実時間は経過しない。

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use viralstage::session::{LiveSession, SessionEvent, SessionTiming};
use viralstage::simulator::clock::ManualClock;
use viralstage::simulator::phrase_bank::phrases;
use viralstage::simulator::{
    CommentMode, RemovalReason, SimulatorConfig, ViewerTier, MAX_ACTIVE_REACTIONS,
};
use viralstage::sources::{CommentRequest, CommentSource, CommentSourceError, PhraseBankSource};

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn session_with(config: SimulatorConfig) -> LiveSession {
    LiveSession::builder()
        .config(config)
        .seed(2024)
        .clock(Arc::new(ManualClock::default()))
        .build()
}

/// 応答に時間がかかるソース
struct SlowSource {
    calls: AtomicU32,
    delay: Duration,
}

#[async_trait]
impl CommentSource for SlowSource {
    async fn produce_comment(&self, _request: &CommentRequest) -> Result<String, CommentSourceError> {
        tokio::time::sleep(self.delay).await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("late comment".to_string())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// 常に失敗するソース
struct FailingSource {
    calls: AtomicU32,
}

#[async_trait]
impl CommentSource for FailingSource {
    async fn produce_comment(&self, _request: &CommentRequest) -> Result<String, CommentSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CommentSourceError::Unavailable("offline".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test(start_paused = true)]
async fn ticks_follow_their_cadences() {
    let session = session_with(SimulatorConfig::default());
    let mut rx = session.subscribe();
    session.start().expect("start");

    let events = drain(&mut rx);
    assert!(matches!(events[0], SessionEvent::LiveChanged { is_live: true }));
    assert!(matches!(events[1], SessionEvent::ViewerCountUpdated { .. }));

    advance(1_600).await;
    let events = drain(&mut rx);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::ReactionSpawned(_)))
            .count(),
        1
    );
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::CommentAdded(_))));

    advance(500).await;
    let events = drain(&mut rx);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::CommentAdded(_)))
            .count(),
        1
    );

    advance(1_000).await;
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::ViewerCountUpdated { .. })));

    let snapshot = session.snapshot();
    assert!(snapshot.is_live);
    assert!(ViewerTier::Medium
        .config()
        .contains(snapshot.viewer_count.expect("count")));
    assert_eq!(snapshot.comments.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn viewer_count_stays_in_range_over_a_long_stream() {
    let session = session_with(SimulatorConfig {
        viewer_tier: ViewerTier::Low,
        ..Default::default()
    });
    let mut rx = session.subscribe();
    session.start().expect("start");

    for _ in 0..20 {
        advance(30_000).await;
        for event in drain(&mut rx) {
            if let SessionEvent::ViewerCountUpdated { count, .. } = event {
                assert!((8_000..=15_000).contains(&count), "count {}", count);
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_with_a_pending_tick_appends_nothing_afterwards() {
    let session = session_with(SimulatorConfig::default());
    let mut rx = session.subscribe();
    session.start().expect("start");

    // コメントタイマーは2000msで発火予定
    advance(1_999).await;
    session.shutdown();
    assert_eq!(session.pending_timers(), 0);
    drain(&mut rx);

    advance(20_000).await;
    let events = drain(&mut rx);
    assert!(
        events.is_empty(),
        "unexpected events after shutdown: {:?}",
        events
    );

    let snapshot = session.snapshot();
    assert!(!snapshot.is_live);
    assert!(snapshot.comments.is_empty());
    assert!(snapshot.reactions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn in_flight_external_comment_is_dropped_after_shutdown() {
    let source = Arc::new(SlowSource {
        calls: AtomicU32::new(0),
        delay: Duration::from_millis(500),
    });
    let session = LiveSession::builder()
        .seed(3)
        .comment_source(source.clone())
        .build();
    session.start().expect("start");

    // 2000msで問い合わせ開始、2500msで応答
    advance(2_100).await;
    session.shutdown();
    advance(1_000).await;

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert!(session.snapshot().comments.is_empty());
}

#[tokio::test(start_paused = true)]
async fn in_flight_external_comment_is_dropped_after_restart() {
    let source = Arc::new(SlowSource {
        calls: AtomicU32::new(0),
        delay: Duration::from_millis(500),
    });
    let session = LiveSession::builder()
        .seed(4)
        .comment_source(source.clone())
        .build();
    session.start().expect("start");

    advance(2_100).await;
    session.stop();
    session.start().expect("restart");
    advance(1_000).await;

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert!(session.snapshot().comments.is_empty());
}

#[tokio::test(start_paused = true)]
async fn external_source_comments_are_appended() {
    let session = LiveSession::builder()
        .config(SimulatorConfig {
            comment_mode: CommentMode::Troll,
            ..Default::default()
        })
        .seed(5)
        .comment_source(Arc::new(PhraseBankSource::with_seed(5)))
        .build();
    session.start().expect("start");

    advance(4_100).await;
    let comments = session.snapshot().comments;
    assert_eq!(comments.len(), 2);
    for comment in comments {
        assert_eq!(comment.mode, CommentMode::Troll);
        assert!(phrases(CommentMode::Troll).contains(&comment.text.as_str()));
    }
}

#[tokio::test(start_paused = true)]
async fn failing_source_never_stops_the_stream() {
    let source = Arc::new(FailingSource {
        calls: AtomicU32::new(0),
    });
    let session = LiveSession::builder()
        .seed(6)
        .comment_source(source.clone())
        .build();
    let mut rx = session.subscribe();
    session.start().expect("start");

    advance(10_500).await;

    assert_eq!(source.calls.load(Ordering::SeqCst), 5);
    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::CommentAdded(_))));
    assert!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::ViewerCountUpdated { .. }))
            .count()
            >= 4
    );
    assert!(session.is_live());
}

#[tokio::test(start_paused = true)]
async fn config_change_applies_to_the_next_tick() {
    let session = session_with(SimulatorConfig::default());
    session.start().expect("start");

    advance(2_100).await;
    let first = session.snapshot().comments;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].mode, CommentMode::Fanboy);

    session.set_config(SimulatorConfig {
        viewer_tier: ViewerTier::High,
        comment_mode: CommentMode::Troll,
        ..Default::default()
    });

    advance(2_000).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.comments.len(), 2);
    assert_eq!(snapshot.comments[0].id, first[0].id);
    assert_eq!(snapshot.comments[0].mode, CommentMode::Fanboy);
    assert_eq!(snapshot.comments[1].mode, CommentMode::Troll);

    // 変更後最初の視聴者ティック（3000ms）で新しい範囲に張り付く
    advance(2_000).await;
    let count = session.snapshot().viewer_count.expect("count");
    assert!(ViewerTier::High.config().contains(count), "count {}", count);
}

#[tokio::test(start_paused = true)]
async fn reactions_in_flight_complete_after_stop() {
    let session = session_with(SimulatorConfig::default());
    let mut rx = session.subscribe();
    session.start().expect("start");

    advance(1_600).await;
    session.stop();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.reactions.len(), 1);
    let id = snapshot.reactions[0].id;
    drain(&mut rx);

    advance(5_000).await;
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ReactionRemoved { id: removed, reason: RemovalReason::Completed } if *removed == id
    )));
    assert!(!events
        .iter()
        .any(|e| matches!(e, SessionEvent::ReactionSpawned(_))));
    assert!(session.snapshot().reactions.is_empty());
    assert_eq!(session.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn fast_reactions_are_capped_and_evicted() {
    let session = LiveSession::builder()
        .seed(8)
        .timing(SessionTiming {
            reaction_interval: Duration::from_millis(100),
            ..Default::default()
        })
        .build();
    let mut rx = session.subscribe();
    session.start().expect("start");

    let mut evicted = 0;
    for _ in 0..30 {
        advance(100).await;
        assert!(session.snapshot().reactions.len() <= MAX_ACTIVE_REACTIONS);
        evicted += drain(&mut rx)
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SessionEvent::ReactionRemoved {
                        reason: RemovalReason::Evicted,
                        ..
                    }
                )
            })
            .count();
    }

    assert!(evicted > 0);
    // 周期タイマー3つ + 表示中パーティクルの完了タイマー
    assert!(session.pending_timers() <= 3 + MAX_ACTIVE_REACTIONS);
    session.shutdown();
    assert_eq!(session.pending_timers(), 0);
}
