//! TTS読み上げエンジン
//!
//! キューに積まれた (テキスト, 言語) をワーカータスクが順に合成・再生する。
//! ワーカーは1秒タイムアウト付きで受信するため、キューが空でも停止要求を
//! 1秒以内に検知できる。合成・再生の失敗はログに残して次の項目へ進む。

pub mod backends;
pub mod error;

pub use backends::{GttsBackend, NullBackend, TtsBackend};
pub use error::TtsError;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::AppConfig;

/// 読み上げジョブ
#[derive(Debug, Clone, PartialEq)]
enum TtsJob {
    Speak { text: String, lang: String },
    /// 停止シグナル
    Shutdown,
}

/// TTSエンジン
///
/// 状態遷移: idle →(`start`)→ running →(`stop`)→ stopped。
/// `start` はTTSが設定で有効な場合のみワーカーを起動する。
pub struct TtsEngine {
    enabled: bool,
    kind: String,
    read_only_langs: Vec<String>,
    max_length: usize,
    omit_message: String,
    sender: Option<mpsc::UnboundedSender<TtsJob>>,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl TtsEngine {
    /// 設定からエンジンを作成（ワーカーはまだ起動しない）
    pub fn new(config: &AppConfig) -> Self {
        Self {
            enabled: config.tts_enabled,
            kind: config.tts_kind.trim().to_lowercase(),
            read_only_langs: config.read_only_these_lang.clone(),
            max_length: config.tts_text_max_length,
            omit_message: config.tts_message_for_omitting.clone(),
            sender: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// TTSが有効かどうか
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// ワーカーが起動中かどうか
    pub fn is_running(&self) -> bool {
        self.sender.is_some()
    }

    /// ワーカータスクを開始
    pub fn start(&mut self) {
        if !self.enabled || self.is_running() {
            return;
        }

        let backend: Arc<dyn TtsBackend> = match self.kind.as_str() {
            "gtts" => Arc::new(GttsBackend::new()),
            other => {
                tracing::warn!("TTS種類 '{}' はサポートされていないため読み上げを無効化します", other);
                Arc::new(NullBackend)
            }
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        self.stop_flag.store(false, Ordering::SeqCst);

        let stop_flag = Arc::clone(&self.stop_flag);
        let read_only_langs = self.read_only_langs.clone();
        let max_length = self.max_length;
        let omit_message = self.omit_message.clone();

        tracing::info!("🔊 TTSワーカーを開始します (backend={})", backend.name());
        self.worker = Some(tokio::spawn(Self::worker_loop(
            receiver,
            backend,
            stop_flag,
            read_only_langs,
            max_length,
            omit_message,
        )));
        self.sender = Some(sender);
    }

    /// 読み上げキューに追加
    ///
    /// TTSが無効、またはワーカーが未起動の場合は何もしない。
    pub fn put(&self, text: &str, lang: &str) {
        if !self.enabled {
            return;
        }

        if let Some(sender) = &self.sender {
            let _ = sender.send(TtsJob::Speak {
                text: text.to_string(),
                lang: lang.to_string(),
            });
        }
    }

    /// ワーカーを停止
    ///
    /// 停止フラグを立てて停止シグナルを送る。キューに項目が残っていても
    /// ワーカーは1秒以内に終了する。返されたハンドルで終了を待てる。
    pub fn stop(&mut self) -> Option<JoinHandle<()>> {
        if !self.is_running() {
            return None;
        }

        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(TtsJob::Shutdown);
        }

        tracing::info!("🔊 TTSワーカーへ停止を要求しました");
        self.worker.take()
    }

    /// キュー処理ループ
    async fn worker_loop(
        mut receiver: mpsc::UnboundedReceiver<TtsJob>,
        backend: Arc<dyn TtsBackend>,
        stop_flag: Arc<AtomicBool>,
        read_only_langs: Vec<String>,
        max_length: usize,
        omit_message: String,
    ) {
        tracing::info!("🔊 TTS読み上げキュー処理を開始");

        loop {
            if stop_flag.load(Ordering::SeqCst) {
                break;
            }

            match tokio::time::timeout(Duration::from_secs(1), receiver.recv()).await {
                Ok(Some(TtsJob::Speak { text, lang })) => {
                    if stop_flag.load(Ordering::SeqCst) {
                        break;
                    }

                    // 読み上げ対象言語のフィルタリング
                    if !read_only_langs.is_empty() && !read_only_langs.contains(&lang) {
                        continue;
                    }

                    let text = shorten_tts_comment(&text, max_length, &omit_message);

                    if let Err(e) = backend.speak(&text, &lang).await {
                        tracing::error!("❌ 読み上げエラー: {}", e);
                    }
                }
                Ok(Some(TtsJob::Shutdown)) | Ok(None) => break,
                // タイムアウト: 停止フラグを確認するため先頭に戻る
                Err(_) => continue,
            }
        }

        tracing::info!("🔊 TTS読み上げキュー処理を終了");
    }
}

/// TTS向けのコメントを設定に応じて短縮する
///
/// `max_length` が0の場合は短縮しない。文字数はchar単位で数える。
pub fn shorten_tts_comment(comment: &str, max_length: usize, omit_message: &str) -> String {
    if max_length == 0 || comment.chars().count() <= max_length {
        return comment.to_string();
    }

    let truncated: String = comment.chars().take(max_length).collect();
    format!("{} {}", truncated, omit_message)
}

/// TTS用の読み上げテキストを構築
///
/// 設定に応じてユーザー名・言語表記・本文を組み合わせる。
pub fn build_tts_text(
    config: &AppConfig,
    user: &str,
    content: &str,
    lang: &str,
    is_input: bool,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    let read_username = if is_input {
        config.tts_read_username_input
    } else {
        config.tts_read_username_output
    };
    if read_username {
        parts.push(user.to_string());
    }

    if config.tts_read_lang {
        parts.push(format!("({})", lang));
    }

    if config.tts_read_content && !content.is_empty() {
        parts.push(content.to_string());
    }

    parts.join(", ")
}

/// 処理済みメッセージをTTSキューへ投入
///
/// `tts_in` は入力側（クリーニング済み原文、検出言語）、`tts_out` は
/// 出力側（絵文字除去済みの翻訳文、翻訳先言語）を読み上げる。
/// 読み上げ言語制限は入力・出力どちらかの言語が許可されていれば通す。
pub fn enqueue_chat_message(
    engine: &TtsEngine,
    processor: &crate::chat::MessageProcessor,
    config: &AppConfig,
    message: &crate::chat::ChatMessage,
) {
    if !config.tts_enabled {
        return;
    }

    // 読み上げ言語制限チェック
    let allowed = &config.read_only_these_lang;
    if !allowed.is_empty()
        && !allowed.contains(&message.lang)
        && !allowed.contains(&message.target_lang)
    {
        return;
    }

    // 入力TTS（クリーニング済みメッセージ）
    if config.tts_in && !message.cleaned_content.is_empty() {
        let text = build_tts_text(
            config,
            &message.user,
            &message.cleaned_content,
            &message.lang,
            true,
        );
        if !text.is_empty() {
            engine.put(&text, &message.lang);
        }
    }

    // 出力TTS（翻訳されたメッセージ。翻訳文からも絵文字を除去する）
    if config.tts_out && !message.translation.is_empty() {
        let cleaned_translated = processor.clean_for_tts(&message.translation);
        let text = build_tts_text(
            config,
            &message.user,
            &cleaned_translated,
            &message.target_lang,
            false,
        );
        if !text.is_empty() {
            engine.put(&text, &message.target_lang);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_config() -> AppConfig {
        AppConfig {
            tts_enabled: true,
            tts_kind: "cevio".to_string(), // NullBackendになるのでテストで音は出ない
            ..Default::default()
        }
    }

    #[test]
    fn test_shorten_tts_comment() {
        assert_eq!(shorten_tts_comment("short", 30, "以下略"), "short");
        assert_eq!(
            shorten_tts_comment("abcdefghij", 5, "以下略"),
            "abcde 以下略"
        );
        // 0は短縮なし
        assert_eq!(shorten_tts_comment("abcdefghij", 0, "以下略"), "abcdefghij");
    }

    #[test]
    fn test_shorten_counts_chars_not_bytes() {
        assert_eq!(
            shorten_tts_comment("あいうえおかきくけこ", 5, "略"),
            "あいうえお 略"
        );
    }

    #[test]
    fn test_build_tts_text_parts() {
        let mut config = AppConfig::default();
        config.tts_read_lang = true;
        let text = build_tts_text(&config, "alice", "hello", "en", true);
        assert_eq!(text, "alice, (en), hello");
    }

    #[test]
    fn test_build_tts_text_username_flags() {
        let mut config = AppConfig::default();
        config.tts_read_username_input = false;
        let text = build_tts_text(&config, "alice", "hello", "en", true);
        assert_eq!(text, "hello");

        // 出力側はフラグが別
        let text = build_tts_text(&config, "alice", "hola", "es", false);
        assert_eq!(text, "alice, hola");
    }

    #[tokio::test]
    async fn test_start_requires_enabled() {
        let mut engine = TtsEngine::new(&AppConfig::default());
        engine.start();
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_stop_with_queued_items_exits_quickly() {
        let mut engine = TtsEngine::new(&enabled_config());
        engine.start();
        assert!(engine.is_running());

        for i in 0..50 {
            engine.put(&format!("queued message {}", i), "ja");
        }

        let handle = engine.stop().expect("worker should be running");
        // 停止はキュー1タイムアウト間隔（1秒）+余裕で完了する
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker did not stop in time")
            .expect("worker panicked");

        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_put_after_stop_is_noop() {
        let mut engine = TtsEngine::new(&enabled_config());
        engine.start();
        let handle = engine.stop().unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;

        // 停止後のputは無視される（パニックしない）
        engine.put("ignored", "ja");
    }
}
