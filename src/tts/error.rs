//! TTS用エラー型

use thiserror::Error;

/// TTSエラー型
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("接続に失敗しました: {0}")]
    Connection(String),

    #[error("HTTPリクエストに失敗しました: {0}")]
    Http(#[from] reqwest::Error),

    #[error("音声出力エラー: {0}")]
    AudioOutput(String),

    #[error("音声デコードエラー: {0}")]
    AudioDecode(String),

    #[error("合成結果が空です")]
    EmptyAudio,
}
