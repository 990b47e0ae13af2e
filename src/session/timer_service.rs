//! タイマーサービス
//!
//! ライブセッションの各ティックを精密制御する
//! - タイマーごとに1つのtokioタスク
//! - oneshotによるキャンセル
//! - 周期実行と単発実行（ミリ秒単位）
//! - 統計情報

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::error::{ViralStageError, ViralStageResult};

/// タイマータスクのID
pub type TimerId = String;

/// タイマータスクの種類
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerTaskType {
    /// 視聴者数の更新
    ViewerCount,
    /// コメント生成
    CommentFeed,
    /// リアクション生成
    Reactions,
    /// リアクションのアニメーション完了
    ReactionComplete,
    /// カスタムタスク
    Custom(String),
}

/// タイマータスクの設定
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// 初回実行までの遅延
    pub delay: Duration,
    /// 繰り返し間隔（Noneで単発実行）
    pub interval: Option<Duration>,
    /// 最大実行回数（Noneで無制限）
    pub max_executions: Option<u32>,
    /// 自動キャンセル条件
    pub auto_cancel_after: Option<Duration>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            interval: None,
            max_executions: Some(1),
            auto_cancel_after: None,
        }
    }
}

impl TimerConfig {
    /// 周期実行。初回は1周期後
    pub fn periodic(interval: Duration) -> Self {
        Self {
            delay: interval,
            interval: Some(interval),
            max_executions: None,
            auto_cancel_after: None,
        }
    }

    pub fn periodic_millis(interval_ms: u64) -> Self {
        Self::periodic(Duration::from_millis(interval_ms))
    }

    /// 単発実行
    pub fn once(delay: Duration) -> Self {
        Self {
            delay,
            interval: None,
            max_executions: Some(1),
            auto_cancel_after: None,
        }
    }

    pub fn once_millis(delay_ms: u64) -> Self {
        Self::once(Duration::from_millis(delay_ms))
    }
}

/// タイマータスクの実行コンテキスト
#[derive(Debug, Clone)]
pub struct TimerContext {
    pub task_id: TimerId,
    pub task_type: TimerTaskType,
    /// 実行回数（0始まり）
    pub execution_count: u32,
    pub started_at: Instant,
    pub last_executed: Option<Instant>,
}

/// タイマータスクの実行結果
#[derive(Debug)]
pub enum TimerResult {
    /// 継続実行
    Continue,
    /// 完了（タスク終了）
    Complete,
    /// エラー（タスク停止）
    Error(String),
    /// キャンセル要求
    Cancel,
}

/// タイマータスクのハンドラー
pub type TimerHandler = Box<dyn Fn(TimerContext) -> TimerResult + Send + Sync>;

#[derive(Debug)]
struct TimerTask {
    id: TimerId,
    task_type: TimerTaskType,
    // 同じIDで再登録された場合に古いタスクが新しい登録を消さないための識別子
    serial: u64,
    cancel_sender: Option<oneshot::Sender<()>>,
}

/// タイマー統計情報
#[derive(Debug, Clone)]
pub struct TimerStats {
    pub total_tasks: u64,
    pub active_tasks: u64,
    pub completed_tasks: u64,
    pub cancelled_tasks: u64,
    pub error_tasks: u64,
    pub last_updated: Instant,
}

impl Default for TimerStats {
    fn default() -> Self {
        Self {
            total_tasks: 0,
            active_tasks: 0,
            completed_tasks: 0,
            cancelled_tasks: 0,
            error_tasks: 0,
            last_updated: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionReason {
    Completed,
    Cancelled,
    Error,
    Timeout,
}

impl CompletionReason {
    fn as_str(&self) -> &'static str {
        match self {
            CompletionReason::Completed => "completed",
            CompletionReason::Cancelled => "cancelled",
            CompletionReason::Error => "error",
            CompletionReason::Timeout => "timeout",
        }
    }
}

/// タイマーサービス
#[derive(Debug)]
pub struct TimerService {
    active_tasks: Arc<Mutex<HashMap<TimerId, TimerTask>>>,
    stats: Arc<Mutex<TimerStats>>,
    next_serial: Mutex<u64>,
}

impl TimerService {
    pub fn new() -> Self {
        Self {
            active_tasks: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(Mutex::new(TimerStats::default())),
            next_serial: Mutex::new(0),
        }
    }

    /// タイマータスクを開始
    ///
    /// 同じIDのタスクが動いていればキャンセルしてから置き換える。
    /// tokioランタイムの外から呼ぶとエラーになる。
    pub fn start_task<F>(
        &self,
        id: impl Into<TimerId>,
        task_type: TimerTaskType,
        config: TimerConfig,
        handler: F,
    ) -> ViralStageResult<()>
    where
        F: Fn(TimerContext) -> TimerResult + Send + Sync + 'static,
    {
        let id = id.into();
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ViralStageError::Timer(format!("tokio runtime is not available for {}: {}", id, e))
        })?;

        // 既存タスクのキャンセル
        self.cancel_task(&id);

        let (cancel_sender, cancel_receiver) = oneshot::channel();

        let serial = {
            let mut next = self.next_serial.lock();
            *next += 1;
            *next
        };

        let context = TimerContext {
            task_id: id.clone(),
            task_type: task_type.clone(),
            execution_count: 0,
            started_at: Instant::now(),
            last_executed: None,
        };

        self.active_tasks.lock().insert(
            id.clone(),
            TimerTask {
                id: id.clone(),
                task_type: task_type.clone(),
                serial,
                cancel_sender: Some(cancel_sender),
            },
        );

        {
            let mut stats = self.stats.lock();
            stats.total_tasks += 1;
            stats.active_tasks += 1;
            stats.last_updated = Instant::now();
        }

        let active_tasks = self.active_tasks.clone();
        let stats = self.stats.clone();
        let task_id = id.clone();

        runtime.spawn(async move {
            Self::execute_task(
                task_id,
                serial,
                config,
                Box::new(handler),
                context,
                cancel_receiver,
                active_tasks,
                stats,
            )
            .await;
        });

        tracing::debug!("⏱️ [TIMER] Started task: {} ({:?})", id, task_type);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_task(
        task_id: TimerId,
        serial: u64,
        config: TimerConfig,
        handler: TimerHandler,
        mut context: TimerContext,
        mut cancel_receiver: oneshot::Receiver<()>,
        active_tasks: Arc<Mutex<HashMap<TimerId, TimerTask>>>,
        stats: Arc<Mutex<TimerStats>>,
    ) {
        let mut execution_count = 0u32;
        let start_time = tokio::time::Instant::now();

        // 初回遅延
        tokio::select! {
            _ = tokio::time::sleep(config.delay) => {},
            _ = &mut cancel_receiver => {
                Self::complete_task(&task_id, serial, CompletionReason::Cancelled, &active_tasks, &stats);
                return;
            }
        }

        loop {
            if let Some(timeout) = config.auto_cancel_after {
                if start_time.elapsed() > timeout {
                    tracing::warn!("⏱️ [TIMER] Task timeout: {}", task_id);
                    Self::complete_task(&task_id, serial, CompletionReason::Timeout, &active_tasks, &stats);
                    return;
                }
            }

            if let Some(max) = config.max_executions {
                if execution_count >= max {
                    Self::complete_task(&task_id, serial, CompletionReason::Completed, &active_tasks, &stats);
                    return;
                }
            }

            context.execution_count = execution_count;
            context.last_executed = Some(Instant::now());

            let result = handler(context.clone());
            execution_count += 1;

            match result {
                TimerResult::Continue => {}
                TimerResult::Complete => {
                    Self::complete_task(&task_id, serial, CompletionReason::Completed, &active_tasks, &stats);
                    return;
                }
                TimerResult::Error(msg) => {
                    tracing::error!("⏱️ [TIMER] Task error: {} - {}", task_id, msg);
                    Self::complete_task(&task_id, serial, CompletionReason::Error, &active_tasks, &stats);
                    return;
                }
                TimerResult::Cancel => {
                    Self::complete_task(&task_id, serial, CompletionReason::Cancelled, &active_tasks, &stats);
                    return;
                }
            }

            match config.interval {
                Some(interval) => {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {},
                        _ = &mut cancel_receiver => {
                            Self::complete_task(&task_id, serial, CompletionReason::Cancelled, &active_tasks, &stats);
                            return;
                        }
                    }
                }
                None => {
                    Self::complete_task(&task_id, serial, CompletionReason::Completed, &active_tasks, &stats);
                    return;
                }
            }
        }
    }

    fn complete_task(
        task_id: &str,
        serial: u64,
        reason: CompletionReason,
        active_tasks: &Arc<Mutex<HashMap<TimerId, TimerTask>>>,
        stats: &Arc<Mutex<TimerStats>>,
    ) {
        let removed = {
            let mut tasks = active_tasks.lock();
            match tasks.get(task_id) {
                Some(task) if task.serial == serial => tasks.remove(task_id).is_some(),
                _ => false,
            }
        };

        // キャンセル経由の場合は cancel_task 側で既に登録解除と集計が済んでいる
        if removed {
            let mut stats = stats.lock();
            stats.active_tasks = stats.active_tasks.saturating_sub(1);
            match reason {
                CompletionReason::Completed => stats.completed_tasks += 1,
                CompletionReason::Cancelled => stats.cancelled_tasks += 1,
                CompletionReason::Error | CompletionReason::Timeout => stats.error_tasks += 1,
            }
            stats.last_updated = Instant::now();
        }

        tracing::trace!("⏱️ [TIMER] Task finished: {} ({})", task_id, reason.as_str());
    }

    /// タスクをキャンセル。登録されていなければfalse
    pub fn cancel_task(&self, task_id: &str) -> bool {
        let sender = {
            let mut tasks = self.active_tasks.lock();
            tasks
                .remove(task_id)
                .and_then(|mut task| task.cancel_sender.take())
        };

        match sender {
            Some(sender) => {
                let _ = sender.send(());
                let mut stats = self.stats.lock();
                stats.active_tasks = stats.active_tasks.saturating_sub(1);
                stats.cancelled_tasks += 1;
                stats.last_updated = Instant::now();
                tracing::debug!("⏱️ [TIMER] Cancelled task: {}", task_id);
                true
            }
            None => false,
        }
    }

    /// 特定タイプのタスクをすべてキャンセル
    pub fn cancel_tasks_by_type(&self, task_type: &TimerTaskType) -> u32 {
        let task_ids: Vec<TimerId> = {
            let tasks = self.active_tasks.lock();
            tasks
                .values()
                .filter(|task| &task.task_type == task_type)
                .map(|task| task.id.clone())
                .collect()
        };

        let cancelled = task_ids
            .iter()
            .filter(|task_id| self.cancel_task(task_id))
            .count() as u32;

        if cancelled > 0 {
            tracing::debug!(
                "⏱️ [TIMER] Cancelled {} tasks of type {:?}",
                cancelled,
                task_type
            );
        }
        cancelled
    }

    /// 全タスクをキャンセル
    pub fn cancel_all_tasks(&self) -> u32 {
        let task_ids: Vec<TimerId> = self.active_tasks.lock().keys().cloned().collect();

        let cancelled = task_ids
            .iter()
            .filter(|task_id| self.cancel_task(task_id))
            .count() as u32;

        if cancelled > 0 {
            tracing::info!("⏱️ [TIMER] Cancelled all {} tasks", cancelled);
        }
        cancelled
    }

    pub fn is_active(&self, task_id: &str) -> bool {
        self.active_tasks.lock().contains_key(task_id)
    }

    pub fn active_count(&self) -> usize {
        self.active_tasks.lock().len()
    }

    pub fn get_stats(&self) -> TimerStats {
        self.stats.lock().clone()
    }
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}
