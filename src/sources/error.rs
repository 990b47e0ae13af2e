//! コメントソース用エラー型

use thiserror::Error;

/// コメントソースエラー型
#[derive(Debug, Error)]
pub enum CommentSourceError {
    #[error("HTTPリクエストに失敗しました: {0}")]
    Http(#[from] reqwest::Error),

    #[error("APIがエラーステータスを返しました: {0}")]
    Status(u16),

    #[error("生成結果が空でした")]
    EmptyReply,

    #[error("APIキーが設定されていません（環境変数 {0}）")]
    MissingApiKey(String),

    #[error("JSONパースエラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("ソースが利用できません: {0}")]
    Unavailable(String),
}
