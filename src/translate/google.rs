//! Google翻訳バックエンド
//!
//! APIキー不要の `translate_a/single` エンドポイントを利用する。
//! ホストは `translate.google.<suffix>` で、suffixは設定から選択できる。

use std::time::Duration;

use super::error::TranslateError;

/// 利用可能なサービスURLのsuffix一覧
const KNOWN_SUFFIXES: &[&str] = &[
    "com", "co.jp", "co.kr", "co.uk", "de", "fr", "es", "it", "ca", "com.br", "com.tw", "com.hk",
];

/// suffixが不明な場合のフォールバック
const DEFAULT_SUFFIX: &str = "co.jp";

/// Google翻訳の結果
#[derive(Debug, Clone)]
pub struct GoogleTranslation {
    /// 翻訳されたテキスト
    pub text: String,
    /// エンドポイントが返した検出元言語
    pub detected_source_lang: Option<String>,
}

/// Google翻訳クライアント
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslator {
    /// suffixを指定して作成（不明なsuffixは `co.jp` にフォールバック）
    pub fn new(suffix: &str) -> Self {
        let suffix = if KNOWN_SUFFIXES.contains(&suffix) {
            suffix
        } else {
            tracing::warn!(
                "google_translate_suffix '{}' は未知のため '{}' を使用します",
                suffix,
                DEFAULT_SUFFIX
            );
            DEFAULT_SUFFIX
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("HTTPクライアントの作成に失敗");

        Self {
            client,
            base_url: format!("https://translate.google.{}/translate_a/single", suffix),
        }
    }

    /// テキストを翻訳
    pub async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: &str,
    ) -> Result<GoogleTranslation, TranslateError> {
        let url = format!(
            "{}?client=gtx&dt=t&sl={}&tl={}&q={}",
            self.base_url,
            source_lang,
            target_lang,
            urlencoding::encode(text),
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(TranslateError::Api(format!(
                "translate_a/single がステータス {} を返しました",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        parse_single_response(&body)
    }

    /// 言語検出
    ///
    /// 翻訳エンドポイントが返す検出元言語フィールドを利用する。
    pub async fn detect(&self, text: &str) -> Result<Option<String>, TranslateError> {
        let result = self.translate(text, "en", "auto").await?;
        Ok(result.detected_source_lang)
    }
}

/// `translate_a/single` のレスポンス（ネストしたJSON配列）を解釈
///
/// 先頭要素がセグメント配列、index 2 が検出元言語。
fn parse_single_response(body: &serde_json::Value) -> Result<GoogleTranslation, TranslateError> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or(TranslateError::EmptyResult)?;

    let mut text = String::new();
    for segment in segments {
        if let Some(part) = segment.get(0).and_then(|v| v.as_str()) {
            text.push_str(part);
        }
    }

    if text.is_empty() {
        return Err(TranslateError::EmptyResult);
    }

    let detected_source_lang = body
        .get(2)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(GoogleTranslation {
        text,
        detected_source_lang,
    })
}
