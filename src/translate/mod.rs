//! 翻訳エンジン統合モジュール
//!
//! 設定に応じてGoogleまたはDeepLへディスパッチする。DeepLの失敗や
//! 対応外言語は無条件でGoogleへフォールバックし、どのバックエンドでも
//! 失敗した場合は `None` を返す（呼び出し側はそのメッセージをスキップ）。

pub mod deepl;
pub mod error;
pub mod google;

pub use deepl::DeeplTranslator;
pub use error::TranslateError;
pub use google::{GoogleTranslation, GoogleTranslator};

use async_trait::async_trait;

use crate::config::AppConfig;

/// 翻訳機能の境界トレイト
///
/// パイプラインはこのトレイト越しに翻訳を呼び出す。本番実装は
/// [`TranslationEngine`]、テストでは呼び出し回数を数えるスタブを差し込む。
#[async_trait]
pub trait Translator: Send + Sync {
    /// 言語検出（失敗時は `None`）
    async fn detect_language(&self, text: &str) -> Option<String>;

    /// テキスト翻訳（失敗時は `None`）
    async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: &str,
    ) -> Option<String>;
}

/// 翻訳バックエンドの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslatorKind {
    #[default]
    Google,
    Deepl,
}

/// 翻訳エンジン統合クラス
#[derive(Debug, Clone)]
pub struct TranslationEngine {
    kind: TranslatorKind,
    google: GoogleTranslator,
    deepl: Option<DeeplTranslator>,
}

impl TranslationEngine {
    /// 設定から翻訳エンジンを初期化
    pub fn new(config: &AppConfig) -> Self {
        let google = GoogleTranslator::new(&config.google_translate_suffix);

        let deepl = if config.deepl_api_key.trim().is_empty() {
            None
        } else {
            tracing::info!("DeepL翻訳エンジンを初期化しました");
            Some(DeeplTranslator::new(config.deepl_api_key.trim()))
        };

        let kind = match config.translator.as_str() {
            "deepl" if deepl.is_some() => TranslatorKind::Deepl,
            "deepl" => {
                tracing::warn!("DeepLが選択されていますがAPIキーが未設定のためGoogleを使用します");
                TranslatorKind::Google
            }
            _ => TranslatorKind::Google,
        };

        Self {
            kind,
            google,
            deepl,
        }
    }

    /// 現在選択されているバックエンド
    pub fn kind(&self) -> TranslatorKind {
        self.kind
    }

    /// 言語検出
    ///
    /// 検出に失敗した場合は `None`（エラーはログに出力済み）。
    pub async fn detect_language(&self, text: &str) -> Option<String> {
        match self.google.detect(text).await {
            Ok(lang) => lang,
            Err(e) => {
                tracing::error!("言語検出エラー: {}", e);
                None
            }
        }
    }

    /// テキスト翻訳
    ///
    /// 失敗した場合は `None`。リトライやバックオフは行わない。
    pub async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: &str,
    ) -> Option<String> {
        match self.kind {
            TranslatorKind::Deepl => {
                self.translate_with_deepl(text, target_lang, source_lang)
                    .await
            }
            TranslatorKind::Google => self.translate_with_google(text, target_lang, source_lang).await,
        }
    }

    async fn translate_with_google(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: &str,
    ) -> Option<String> {
        match self.google.translate(text, target_lang, source_lang).await {
            Ok(result) => Some(result.text),
            Err(e) => {
                tracing::error!("Google翻訳エラー: {}", e);
                None
            }
        }
    }

    async fn translate_with_deepl(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: &str,
    ) -> Option<String> {
        let deepl = self.deepl.as_ref()?;

        match deepl.translate(text, target_lang, source_lang).await {
            Ok(translated) => Some(translated),
            Err(TranslateError::UnsupportedLanguage(lang)) => {
                // DeepLで対応していない言語はGoogleで翻訳
                tracing::debug!("DeepL対象外言語 '{}' のためGoogleで翻訳します", lang);
                self.translate_with_google(text, target_lang, source_lang)
                    .await
            }
            Err(e) => {
                // フォールバック: Google翻訳
                tracing::warn!("DeepL翻訳エラー（Googleへフォールバック）: {}", e);
                self.translate_with_google(text, target_lang, source_lang)
                    .await
            }
        }
    }
}

#[async_trait]
impl Translator for TranslationEngine {
    async fn detect_language(&self, text: &str) -> Option<String> {
        TranslationEngine::detect_language(self, text).await
    }

    async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: &str,
    ) -> Option<String> {
        TranslationEngine::translate_text(self, text, target_lang, source_lang).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deepl_without_key_falls_back_to_google() {
        let config = AppConfig {
            translator: "deepl".to_string(),
            ..Default::default()
        };
        let engine = TranslationEngine::new(&config);
        assert_eq!(engine.kind(), TranslatorKind::Google);
    }

    #[test]
    fn test_deepl_selected_with_key() {
        let config = AppConfig {
            translator: "deepl".to_string(),
            deepl_api_key: "key:fx".to_string(),
            ..Default::default()
        };
        let engine = TranslationEngine::new(&config);
        assert_eq!(engine.kind(), TranslatorKind::Deepl);
    }

    #[test]
    fn test_google_is_default() {
        let engine = TranslationEngine::new(&AppConfig::default());
        assert_eq!(engine.kind(), TranslatorKind::Google);
    }
}
