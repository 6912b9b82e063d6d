//! 翻訳エンジン用エラー型

use thiserror::Error;

/// 翻訳エラー型
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("HTTPリクエストに失敗しました: {0}")]
    Request(#[from] reqwest::Error),

    #[error("レスポンスのパースに失敗しました: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("翻訳APIエラー: {0}")]
    Api(String),

    #[error("サポートされていない言語です: {0}")]
    UnsupportedLanguage(String),

    #[error("翻訳結果が空です")]
    EmptyResult,
}
