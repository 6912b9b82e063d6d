//! チャットメッセージモデル

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 処理済みチャットメッセージ
///
/// 受信イベント1件ごとに生成される。`cleaned_content` と `target_lang` は
/// 生成直後にパイプラインが設定し、以降は変更されない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// 発言者の表示名
    pub user: String,
    /// 受信した元のテキスト
    pub text: String,
    /// 受信時刻
    pub timestamp: DateTime<Utc>,
    /// 検出された言語コード
    pub lang: String,
    /// 翻訳結果（翻訳されなかった場合は空）
    pub translation: String,
    /// クリーニング済みテキスト
    pub cleaned_content: String,
    /// 翻訳先言語コード
    pub target_lang: String,
    /// 翻訳済みかどうか
    pub is_translated: bool,
}

impl ChatMessage {
    /// 新しいメッセージを作成
    pub fn new(
        user: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
        lang: impl Into<String>,
        translation: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let translation = translation.into();
        Self {
            user: user.into(),
            cleaned_content: text.clone(),
            text,
            timestamp,
            lang: lang.into(),
            is_translated: !translation.is_empty(),
            translation,
            target_lang: String::new(),
        }
    }

    /// 表示用の時刻ラベル（HH:MM:SS）
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_translated_follows_translation() {
        let now = Utc::now();
        let msg = ChatMessage::new("alice", "hello", now, "en", "こんにちは");
        assert!(msg.is_translated);

        let msg = ChatMessage::new("alice", "hello", now, "en", "");
        assert!(!msg.is_translated);
    }

    #[test]
    fn test_cleaned_content_defaults_to_text() {
        let msg = ChatMessage::new("bob", "original text", Utc::now(), "en", "");
        assert_eq!(msg.cleaned_content, "original text");
        assert_eq!(msg.target_lang, "");
    }
}
