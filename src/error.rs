//! クレート共通のエラー型

use thiserror::Error;

use crate::storage::StorageError;

/// ViralStage全体のエラー型
#[derive(Debug, Error)]
pub enum ViralStageError {
    #[error("ストレージエラー: {0}")]
    Storage(#[from] StorageError),

    #[error("タイマーエラー: {0}")]
    Timer(String),

    #[error(transparent)]
    General(#[from] anyhow::Error),
}

/// ViralStage全体のResult型
pub type ViralStageResult<T> = Result<T, ViralStageError>;
