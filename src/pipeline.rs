//! メッセージ単位の翻訳パイプライン
//!
//! 受信イベント1件に対して、フィルタリング → クリーニング → 言語指定の
//! 解釈 → 言語検出 → 翻訳先決定 → キャッシュ参照 → 翻訳 → 後処理を
//! 直列に適用する。どの段階で脱落しても `None` を返し、そのメッセージは
//! 単にスキップされる。TwitchとYouTubeの両モニターが共有する。

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::chat::{ChatMessage, MessageProcessor};
use crate::config::AppConfig;
use crate::database::TranslationDatabase;
use crate::lang::LanguageDetector;
use crate::translate::{TranslationEngine, Translator};

/// チャット投稿用の出力テキストを構築
///
/// 設定に応じて `[by user]` と `(src > dst)` を付加する。両モニターが
/// 再投稿時に使う。
pub fn format_post_text(config: &AppConfig, message: &ChatMessage) -> String {
    let mut output = message.translation.clone();

    if config.show_by_name {
        output = format!("{} [by {}]", output, message.user);
    }

    if config.show_by_lang {
        output = format!("{} ({} > {})", output, message.lang, message.target_lang);
    }

    output
}

/// 翻訳パイプライン
pub struct TranslationPipeline {
    processor: MessageProcessor,
    detector: LanguageDetector,
    translator: Arc<dyn Translator>,
    database: Arc<TranslationDatabase>,
}

impl TranslationPipeline {
    /// 設定とキャッシュDBからパイプラインを構築
    pub fn new(config: &AppConfig, database: Arc<TranslationDatabase>) -> Self {
        Self::with_translator(config, database, Arc::new(TranslationEngine::new(config)))
    }

    /// 翻訳実装を差し替えて構築（テスト用）
    pub fn with_translator(
        config: &AppConfig,
        database: Arc<TranslationDatabase>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            processor: MessageProcessor::new(config),
            detector: LanguageDetector::new(config),
            translator,
            database,
        }
    }

    /// メッセージプロセッサーへの参照（TTS用クリーニングなどに使う）
    pub fn processor(&self) -> &MessageProcessor {
        &self.processor
    }

    /// 1メッセージを処理
    ///
    /// 翻訳まで到達した場合のみ `ChatMessage` を返す。
    pub async fn process(
        &self,
        user: &str,
        text: &str,
        timestamp: DateTime<Utc>,
        emote_spans: Option<&str>,
    ) -> Option<ChatMessage> {
        // ユーザーフィルター
        if self.processor.should_ignore_user(user) {
            return None;
        }

        // メッセージフィルター
        if self.processor.should_ignore_message(text) {
            return None;
        }

        // メッセージクリーニング
        let cleaned_content = self.processor.clean_message(text, emote_spans);
        if cleaned_content.is_empty() {
            return None;
        }

        // 言語指定確認
        let (target_lang_override, text_to_translate) =
            LanguageDetector::extract_target_language_from_text(&cleaned_content);

        // 言語検出
        let detect_input = if target_lang_override.is_empty() {
            &cleaned_content
        } else {
            &text_to_translate
        };
        let detected_lang = self.translator.detect_language(detect_input).await?;

        // 無視言語チェック
        if self.detector.should_ignore_language(&detected_lang) {
            return None;
        }

        // 翻訳先言語決定
        let (target_lang, final_text) = if target_lang_override.is_empty() {
            (
                self.detector
                    .determine_target_language(&detected_lang, &cleaned_content),
                cleaned_content.clone(),
            )
        } else {
            (target_lang_override, text_to_translate)
        };

        // 同じ言語なら翻訳不要
        if detected_lang == target_lang {
            return None;
        }

        // データベースから既訳語チェック
        let mut translated_text =
            match self.database.get_translation(&final_text, &target_lang).await {
                Some(cached) => cached,
                None => {
                    let translated = self
                        .translator
                        .translate_text(&final_text, &target_lang, &detected_lang)
                        .await?;

                    if !translated.is_empty() {
                        self.database
                            .save_translation(&final_text, &translated, &target_lang)
                            .await;
                    }
                    translated
                }
            };

        if translated_text.is_empty() {
            return None;
        }

        // 翻訳後も削除単語除去
        for word in self.processor.delete_words() {
            if !word.is_empty() {
                translated_text = translated_text.replace(word.as_str(), "");
            }
        }

        let mut chat_message =
            ChatMessage::new(user, text, timestamp, detected_lang, translated_text);
        chat_message.cleaned_content = cleaned_content;
        chat_message.target_lang = target_lang;

        Some(chat_message)
    }
}
