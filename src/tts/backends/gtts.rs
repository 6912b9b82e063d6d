//! gTTSバックエンド実装
//!
//! Google翻訳のTTSエンドポイントからMP3を取得し、rodioでメモリ上から
//! デコード・再生する。一時ファイルは作らない。

use std::time::Duration;

use async_trait::async_trait;

use super::TtsBackend;
use crate::tts::error::TtsError;

/// gTTSバックエンド
pub struct GttsBackend {
    client: reqwest::Client,
}

impl GttsBackend {
    /// 新しいインスタンスを作成
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("HTTPクライアントの作成に失敗");

        Self { client }
    }

    /// 音声合成を実行してMP3バイト列を取得
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, TtsError> {
        let url = format!(
            "https://translate.google.com/translate_tts?ie=UTF-8&client=tw-ob&tl={}&q={}",
            lang,
            urlencoding::encode(text),
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(TtsError::Connection(format!(
                "translate_tts がステータス {} を返しました",
                response.status()
            )));
        }

        let mp3_bytes = response.bytes().await?.to_vec();
        if mp3_bytes.is_empty() {
            return Err(TtsError::EmptyAudio);
        }

        Ok(mp3_bytes)
    }

    /// MP3データを再生（ブロッキング）
    fn play_mp3_blocking(mp3_bytes: Vec<u8>) -> Result<(), TtsError> {
        use rodio::{Decoder, OutputStream, Sink};
        use std::io::Cursor;

        // 音声出力ストリームを作成
        let (_stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| TtsError::AudioOutput(format!("音声出力の初期化に失敗: {}", e)))?;

        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| TtsError::AudioOutput(format!("音声シンクの作成に失敗: {}", e)))?;

        // MP3をデコード
        let cursor = Cursor::new(mp3_bytes);
        let source = Decoder::new(cursor)
            .map_err(|e| TtsError::AudioDecode(format!("MP3デコードに失敗: {}", e)))?;

        // 再生
        sink.append(source);
        sink.sleep_until_end();

        Ok(())
    }
}

impl Default for GttsBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsBackend for GttsBackend {
    async fn speak(&self, text: &str, lang: &str) -> Result<(), TtsError> {
        if text.is_empty() {
            return Ok(());
        }

        tracing::debug!("🔊 gTTSで合成: lang={} text={}", lang, text);

        let mp3_bytes = self.synthesize(text, lang).await?;

        // 再生はブロッキングするので専用スレッドで行う
        tokio::task::spawn_blocking(move || Self::play_mp3_blocking(mp3_bytes))
            .await
            .map_err(|e| TtsError::AudioOutput(format!("再生タスクの実行に失敗: {}", e)))??;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "gtts"
    }
}
