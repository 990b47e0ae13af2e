//! ローカルのキー・バリューストア
//!
//! 文字列キーと文字列値だけを扱う。設定・スキン選択・録画一覧はすべて
//! このストアの上に載っている。永続性はベストエフォート。

pub mod json_file;
pub mod memory;

use thiserror::Error;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// ストレージエラー型
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("ファイル入出力に失敗しました: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSONの読み書きに失敗しました: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ストレージが利用できません: {0}")]
    Unavailable(String),
}

/// キー・バリューストアのトレイト
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// 複数キーをまとめて削除
    fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            self.remove_item(key)?;
        }
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        (**self).multi_remove(keys)
    }
}
