//! ライブセッションのランタイム
//!
//! シミュレーターのジェネレーターをタイマーで駆動し、変化をイベントとして配信する。

pub mod broadcaster;
pub mod disclaimer;
pub mod live_session;
pub mod timer_service;

pub use broadcaster::{SessionBroadcaster, SessionEvent};
pub use disclaimer::{DisclaimerOverlay, WATERMARK_TEXT};
pub use live_session::{LiveSession, LiveSessionBuilder, SessionSnapshot, SessionTiming};
pub use timer_service::{TimerConfig, TimerResult, TimerService, TimerStats, TimerTaskType};
