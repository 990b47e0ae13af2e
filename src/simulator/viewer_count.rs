//! 視聴者数シミュレーター
//!
//! ティアの範囲内でクランプされるランダムウォーク。
//! 各ティックで[-1000, +1000]の摂動を直前の確定値に加え、範囲外は境界に張り付く。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 1ティックあたりの最大摂動幅
pub const MAX_PERTURBATION: i64 = 1000;

/// 既定の更新間隔
pub const VIEWER_TICK_INTERVAL: Duration = Duration::from_millis(3000);

/// 視聴者数ティアの設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerTierConfig {
    pub min_count: u64,
    pub max_count: u64,
    pub label: &'static str,
}

impl ViewerTierConfig {
    /// 値を範囲内に収める（飽和）
    pub fn clamp(&self, value: i64) -> u64 {
        let min = self.min_count as i64;
        let max = self.max_count as i64;
        value.clamp(min, max) as u64
    }

    pub fn contains(&self, value: u64) -> bool {
        (self.min_count..=self.max_count).contains(&value)
    }
}

/// 定義済みの視聴者数ティア
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ViewerTier {
    Low,
    #[default]
    Medium,
    High,
}

impl ViewerTier {
    pub const ALL: [ViewerTier; 3] = [ViewerTier::Low, ViewerTier::Medium, ViewerTier::High];

    pub fn config(&self) -> ViewerTierConfig {
        match self {
            ViewerTier::Low => ViewerTierConfig {
                min_count: 8_000,
                max_count: 15_000,
                label: "10K",
            },
            ViewerTier::Medium => ViewerTierConfig {
                min_count: 40_000,
                max_count: 60_000,
                label: "50K",
            },
            ViewerTier::High => ViewerTierConfig {
                min_count: 90_000,
                max_count: 120_000,
                label: "100K",
            },
        }
    }

    /// 永続化キー
    pub fn as_key(&self) -> &'static str {
        match self {
            ViewerTier::Low => "LOW",
            ViewerTier::Medium => "MEDIUM",
            ViewerTier::High => "HIGH",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_uppercase().as_str() {
            "LOW" => Some(ViewerTier::Low),
            "MEDIUM" => Some(ViewerTier::Medium),
            "HIGH" => Some(ViewerTier::High),
            _ => None,
        }
    }

    /// キーを解決する。未知のキーは常にMediumにフォールバック
    pub fn resolve(key: &str) -> Self {
        Self::from_key(key).unwrap_or_else(|| {
            tracing::debug!("👥 [VIEWERS] Unknown viewer tier '{}', using MEDIUM", key);
            ViewerTier::Medium
        })
    }
}

/// 視聴者数の表示用フォーマット（1.2K / 3.4M）
///
/// 小数第1位で四捨五入する（45_250 → "45.3K"）。
pub fn format_viewer_count(count: u64) -> String {
    if count >= 1_000_000 {
        format_tenths(count, 1_000_000, 'M')
    } else if count >= 1_000 {
        format_tenths(count, 1_000, 'K')
    } else {
        count.to_string()
    }
}

fn format_tenths(count: u64, unit: u64, suffix: char) -> String {
    let step = unit / 10;
    let tenths = (count + step / 2) / step;
    format!("{}.{}{}", tenths / 10, tenths % 10, suffix)
}

/// 視聴者数シミュレーター
#[derive(Debug)]
pub struct ViewerCountSimulator {
    tier: ViewerTier,
    current_count: Option<u64>,
    rng: StdRng,
}

impl ViewerCountSimulator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// シード固定で作成（再現性のあるテスト用）
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            tier: ViewerTier::default(),
            current_count: None,
            rng,
        }
    }

    /// 生成を開始し、範囲内の一様乱数で初期値を決める
    pub fn activate(&mut self, tier: ViewerTier) -> u64 {
        self.tier = tier;
        let config = tier.config();
        let initial = self.rng.gen_range(config.min_count..=config.max_count);
        self.current_count = Some(initial);
        tracing::debug!(
            tier = tier.as_key(),
            initial,
            "👥 [VIEWERS] Simulator activated"
        );
        initial
    }

    /// ティアを変更する。次のティックから新しい範囲が適用される
    pub fn set_tier(&mut self, tier: ViewerTier) {
        self.tier = tier;
    }

    /// 1ティック進める。非アクティブ時は何もしない
    pub fn tick(&mut self) -> Option<u64> {
        self.current_count?;
        let delta = self.rng.gen_range(-MAX_PERTURBATION..=MAX_PERTURBATION);
        self.apply_perturbation(delta)
    }

    /// 直前の確定値に摂動を加え、現在のティア範囲にクランプする
    pub fn apply_perturbation(&mut self, delta: i64) -> Option<u64> {
        let current = self.current_count?;
        let next = self.tier.config().clamp(current as i64 + delta);
        self.current_count = Some(next);
        Some(next)
    }

    pub fn deactivate(&mut self) {
        self.current_count = None;
    }

    pub fn is_active(&self) -> bool {
        self.current_count.is_some()
    }

    pub fn current_count(&self) -> Option<u64> {
        self.current_count
    }

    pub fn tier(&self) -> ViewerTier {
        self.tier
    }

    /// 現在値を直接設定（範囲内にクランプ）
    pub fn set_current_count(&mut self, count: u64) {
        let clamped = self.tier.config().clamp(count as i64);
        self.current_count = Some(clamped);
    }

    pub fn formatted(&self) -> Option<String> {
        self.current_count.map(format_viewer_count)
    }
}

impl Default for ViewerCountSimulator {
    fn default() -> Self {
        Self::new()
    }
}
