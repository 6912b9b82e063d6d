//! メッセージのフィルタリングとクリーニング
//!
//! ユーザー・本文の無視判定、Twitchエモート除去、Unicode絵文字除去、
//! 削除単語の適用、`@メンション` 除去、空白の正規化を行う。

use regex::Regex;

use crate::config::AppConfig;

/// メッセージ処理クラス
///
/// 設定スナップショットから構築され、以降は不変。
#[derive(Debug, Clone)]
pub struct MessageProcessor {
    ignore_users: Vec<String>,
    ignore_lines: Vec<String>,
    ignore_www: Vec<String>,
    delete_words: Vec<String>,
    mention_regex: Regex,
}

impl MessageProcessor {
    /// 設定からフィルターを構築
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ignore_users: config
                .ignore_users
                .iter()
                .map(|u| u.to_lowercase())
                .collect(),
            ignore_lines: config.ignore_line.clone(),
            ignore_www: config.ignore_www.clone(),
            delete_words: config.delete_words.clone(),
            mention_regex: Regex::new(r"@\S+").unwrap(),
        }
    }

    /// 削除単語リストを取得（翻訳後テキストへの適用用）
    pub fn delete_words(&self) -> &[String] {
        &self.delete_words
    }

    /// ユーザーを無視すべきかチェック（大文字小文字を区別しない）
    pub fn should_ignore_user(&self, username: &str) -> bool {
        self.ignore_users.contains(&username.to_lowercase())
    }

    /// メッセージを無視すべきかチェック
    ///
    /// 無視テキストは部分一致、単芝トークンは完全一致。
    pub fn should_ignore_message(&self, message: &str) -> bool {
        if self.ignore_lines.iter().any(|line| message.contains(line.as_str())) {
            return true;
        }

        // 単芝チェック
        self.ignore_www.iter().any(|token| token == message)
    }

    /// メッセージをクリーニング
    ///
    /// `emote_spans` はTwitchの `emotes` タグ（`id:start-end,start-end/...`）。
    pub fn clean_message(&self, message: &str, emote_spans: Option<&str>) -> String {
        let mut cleaned = message.to_string();

        // エモート除去（長いものから順に置換）
        if let Some(spans) = emote_spans {
            let mut emote_texts = extract_emote_texts(message, spans);
            emote_texts.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));
            for emote in emote_texts {
                cleaned = cleaned.replace(&emote, "");
            }
        }

        // Unicode絵文字除去
        cleaned = remove_unicode_emoji(&cleaned);

        // 削除単語除去
        for word in &self.delete_words {
            if !word.is_empty() {
                cleaned = cleaned.replace(word.as_str(), "");
            }
        }

        // @ユーザー名除去
        cleaned = self.mention_regex.replace_all(&cleaned, "").to_string();

        // 複数スペースを単一スペースに
        collapse_whitespace(&cleaned)
    }

    /// TTS用にテキストをクリーニング（絵文字・削除単語・空白のみ）
    pub fn clean_for_tts(&self, text: &str) -> String {
        let mut cleaned = remove_unicode_emoji(text);

        for word in &self.delete_words {
            if !word.is_empty() {
                cleaned = cleaned.replace(word.as_str(), "");
            }
        }

        collapse_whitespace(&cleaned)
    }
}

/// エモートタグからメッセージ中の該当文字列を抽出
///
/// タグの位置は文字単位のオフセット。形式が壊れている場合は警告を出して
/// 解釈できた分だけを返す。
fn extract_emote_texts(message: &str, spans: &str) -> Vec<String> {
    let chars: Vec<char> = message.chars().collect();
    let mut emote_texts = Vec::new();

    for emote_entry in spans.split('/') {
        let Some((_, positions)) = emote_entry.split_once(':') else {
            tracing::warn!("エモートタグの形式が不正です: {}", emote_entry);
            continue;
        };

        for pos in positions.split(',') {
            match parse_span(pos) {
                Some((start, end)) if start <= end && end < chars.len() => {
                    emote_texts.push(chars[start..=end].iter().collect());
                }
                _ => {
                    tracing::warn!("エモート位置の解析に失敗: {}", pos);
                }
            }
        }
    }

    emote_texts
}

fn parse_span(pos: &str) -> Option<(usize, usize)> {
    let (start, end) = pos.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// Unicode絵文字を除去（Unicodeブロック範囲チェック）
pub fn remove_unicode_emoji(text: &str) -> String {
    text.chars().filter(|c| !is_emoji_char(*c)).collect()
}

fn is_emoji_char(c: char) -> bool {
    let code = c as u32;
    (0x1F600..=0x1F64F).contains(&code) || // 絵文字ブロック
    (0x1F300..=0x1F5FF).contains(&code) || // その他シンボル
    (0x1F680..=0x1F6FF).contains(&code) || // 交通・地図
    (0x1F900..=0x1F9FF).contains(&code) || // 補助記号
    (0x2600..=0x26FF).contains(&code) ||
    (0x2700..=0x27BF).contains(&code)
}

/// 連続する空白を単一スペースへ
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
