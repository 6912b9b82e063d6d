//! DeepL翻訳バックエンド
//!
//! DeepL API Free のRESTエンドポイントを利用する。対応言語は固定の
//! 変換テーブルで判定し、対象外の言語は呼び出し側でGoogleへフォールバック
//! させるためにエラーを返す。

use std::time::Duration;

use serde::Deserialize;

use super::error::TranslateError;

/// DeepL言語コード変換テーブル
const DEEPL_LANG_MAP: &[(&str, &str)] = &[
    ("de", "DE"),
    ("en", "EN"),
    ("fr", "FR"),
    ("es", "ES"),
    ("pt", "PT"),
    ("it", "IT"),
    ("nl", "NL"),
    ("pl", "PL"),
    ("ru", "RU"),
    ("ja", "JA"),
    ("zh-CN", "ZH"),
];

/// 言語コードをDeepL表記へ変換
pub fn to_deepl_lang(lang: &str) -> Option<&'static str> {
    DEEPL_LANG_MAP
        .iter()
        .find(|(code, _)| *code == lang)
        .map(|(_, deepl)| *deepl)
}

/// DeepL翻訳クライアント
#[derive(Debug, Clone)]
pub struct DeeplTranslator {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    text: String,
}

impl DeeplTranslator {
    /// APIキーを指定して作成
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("HTTPクライアントの作成に失敗");

        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// テキストを翻訳
    ///
    /// 変換テーブルにない言語は `UnsupportedLanguage` を返す。
    pub async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: &str,
    ) -> Result<String, TranslateError> {
        let deepl_target = to_deepl_lang(target_lang)
            .ok_or_else(|| TranslateError::UnsupportedLanguage(target_lang.to_string()))?;

        let mut params = vec![("text", text.to_string()), ("target_lang", deepl_target.to_string())];

        if source_lang != "auto" {
            let deepl_source = to_deepl_lang(source_lang)
                .ok_or_else(|| TranslateError::UnsupportedLanguage(source_lang.to_string()))?;
            params.push(("source_lang", deepl_source.to_string()));
        }

        let response = self
            .client
            .post("https://api-free.deepl.com/v2/translate")
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TranslateError::Api(format!(
                "DeepL APIがステータス {} を返しました",
                response.status()
            )));
        }

        let body: DeeplResponse = response
            .json()
            .await
            .map_err(TranslateError::Request)?;

        body.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or(TranslateError::EmptyResult)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_map_known_codes() {
        assert_eq!(to_deepl_lang("ja"), Some("JA"));
        assert_eq!(to_deepl_lang("zh-CN"), Some("ZH"));
        assert_eq!(to_deepl_lang("en"), Some("EN"));
    }

    #[test]
    fn test_lang_map_unknown_codes() {
        assert_eq!(to_deepl_lang("ko"), None);
        assert_eq!(to_deepl_lang("th"), None);
    }
}
