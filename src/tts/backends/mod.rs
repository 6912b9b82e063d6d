//! TTSバックエンド実装

pub mod gtts;

use async_trait::async_trait;

use super::error::TtsError;

pub use gtts::GttsBackend;

/// TTSバックエンドトレイト
#[async_trait]
pub trait TtsBackend: Send + Sync {
    /// テキストを読み上げ
    async fn speak(&self, text: &str, lang: &str) -> Result<(), TtsError>;

    /// バックエンド名を取得
    fn name(&self) -> &'static str;
}

/// 何もしないバックエンド
///
/// サポート外の `tts_kind` が指定された場合の縮退動作として使う。
pub struct NullBackend;

#[async_trait]
impl TtsBackend for NullBackend {
    async fn speak(&self, text: &str, _lang: &str) -> Result<(), TtsError> {
        tracing::debug!("TTS無効バックエンド: {} 文字をスキップ", text.chars().count());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
