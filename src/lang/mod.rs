//! 言語判定と翻訳先言語の決定
//!
//! 設定された「ホーム言語」と「相手言語」の二言語間スワップ、および
//! `en:こんにちは` 形式のインライン言語指定の解釈を行う。

use crate::config::AppConfig;

/// 言語指定として認識する言語コード一覧
pub const TARGET_LANGS: &[&str] = &[
    "af", "sq", "am", "ar", "hy", "az", "eu", "be", "bn", "bs", "bg", "ca", "ceb", "ny", "zh-CN",
    "zh-TW", "co", "hr", "cs", "da", "nl", "en", "eo", "et", "tl", "fi", "fr", "fy", "gl", "ka",
    "de", "el", "gu", "ht", "ha", "haw", "iw", "hi", "hmn", "hu", "is", "ig", "id", "ga", "it",
    "ja", "jw", "kn", "kk", "km", "ko", "ku", "ky", "lo", "la", "lv", "lt", "lb", "mk", "mg",
    "ms", "ml", "mt", "mi", "mr", "mn", "my", "ne", "no", "ps", "fa", "pl", "pt", "ma", "ro",
    "ru", "sm", "gd", "sr", "st", "sn", "sd", "si", "sk", "sl", "so", "es", "su", "sw", "sv",
    "tg", "ta", "te", "th", "tr", "uk", "ur", "uz", "vi", "cy", "xh", "yi", "yo", "zu",
];

/// 言語検出とフィルタリング
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    ignore_langs: Vec<String>,
    home_lang: String,
    other_lang: String,
}

impl LanguageDetector {
    /// 設定から作成
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ignore_langs: config.ignore_lang.clone(),
            home_lang: config.lang_trans_to_home.clone(),
            other_lang: config.lang_home_to_other.clone(),
        }
    }

    /// 言語を無視すべきかチェック
    pub fn should_ignore_language(&self, lang: &str) -> bool {
        self.ignore_langs.iter().any(|l| l == lang)
    }

    /// 翻訳先言語を決定
    ///
    /// テキストに有効な言語指定があればそれを優先し、なければ
    /// ホーム言語と相手言語の二言語間でスワップする。
    pub fn determine_target_language(&self, detected_lang: &str, input_text: &str) -> String {
        let (override_lang, _) = Self::extract_target_language_from_text(input_text);
        if !override_lang.is_empty() {
            return override_lang;
        }

        if detected_lang == self.home_lang {
            self.other_lang.clone()
        } else {
            self.home_lang.clone()
        }
    }

    /// テキストから言語指定を抽出
    ///
    /// 最初の `:` までの部分が既知の言語コードなら `(コード, 残りテキスト)`、
    /// そうでなければ `("", 元テキスト)` を返す。
    pub fn extract_target_language_from_text(text: &str) -> (String, String) {
        if let Some((prefix, rest)) = text.split_once(':') {
            if TARGET_LANGS.contains(&prefix) {
                return (prefix.to_string(), rest.trim().to_string());
            }
        }
        (String::new(), text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> LanguageDetector {
        LanguageDetector::new(&AppConfig::default())
    }

    #[test]
    fn test_extract_override() {
        let (lang, text) = LanguageDetector::extract_target_language_from_text("en:hello");
        assert_eq!(lang, "en");
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_extract_no_override() {
        let (lang, text) = LanguageDetector::extract_target_language_from_text("hello");
        assert_eq!(lang, "");
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_extract_unknown_prefix_is_not_override() {
        let (lang, text) = LanguageDetector::extract_target_language_from_text("note: hello");
        assert_eq!(lang, "");
        assert_eq!(text, "note: hello");
    }

    #[test]
    fn test_extract_trims_remaining_text() {
        let (lang, text) = LanguageDetector::extract_target_language_from_text("ja:  hello  ");
        assert_eq!(lang, "ja");
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_binary_swap() {
        let d = detector();
        // ホーム言語(ja)からは相手言語(en)へ
        assert_eq!(d.determine_target_language("ja", "こんにちは"), "en");
        // それ以外からはホーム言語へ
        assert_eq!(d.determine_target_language("en", "hello"), "ja");
        assert_eq!(d.determine_target_language("ko", "안녕"), "ja");
    }

    #[test]
    fn test_override_wins_over_swap() {
        let d = detector();
        assert_eq!(d.determine_target_language("ja", "fr:こんにちは"), "fr");
    }

    #[test]
    fn test_ignore_language() {
        let config = AppConfig {
            ignore_lang: vec!["ru".to_string()],
            ..Default::default()
        };
        let d = LanguageDetector::new(&config);
        assert!(d.should_ignore_language("ru"));
        assert!(!d.should_ignore_language("en"));
    }
}
