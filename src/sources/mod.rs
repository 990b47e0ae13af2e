//! コメントソース
//!
//! フィードジェネレーターが依存するのは`CommentSource`トレイトだけ。
//! 既定実装はローカルのフレーズバンク、代替実装は外部のテキスト生成API。

pub mod error;
pub mod phrase_bank_source;
pub mod text_generation;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::simulator::CommentMode;

pub use error::CommentSourceError;
pub use phrase_bank_source::PhraseBankSource;
pub use text_generation::{TextGenerationConfig, TextGenerationSource};

/// コメント生成リクエスト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRequest {
    /// コメントの口調
    pub tone: CommentMode,
    /// 配信者名
    pub speaker_name: String,
    /// 配信のトピック
    pub topic: String,
}

impl CommentRequest {
    pub fn new(tone: CommentMode, speaker_name: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            tone,
            speaker_name: speaker_name.into(),
            topic: topic.into(),
        }
    }
}

impl Default for CommentRequest {
    fn default() -> Self {
        Self::new(CommentMode::Fanboy, "JessicaLive", "livestream")
    }
}

/// コメントソーストレイト
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// 短いコメント文を1つ生成する。失敗はそのティックの「コメントなし」として扱われる
    async fn produce_comment(&self, request: &CommentRequest) -> Result<String, CommentSourceError>;

    /// ソース名を取得
    fn name(&self) -> &'static str;
}
