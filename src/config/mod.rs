//! アプリケーション設定管理モジュール
//!
//! JSONベースの設定ファイルの読み込み・保存・検証を提供します。
//! 設定ファイルは実行ファイルと同じディレクトリの `config.json` を既定とし、
//! 取得できない環境ではXDG設定ディレクトリへフォールバックします。

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 翻訳エンジンの種類
pub const TRANSLATOR_KINDS: &[&str] = &["google", "deepl"];

/// TTSエンジンの種類
pub const TTS_KINDS: &[&str] = &["gtts", "cevio"];

/// ウィンドウ設定（設定ファイル互換のため保持。CLIでは未使用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub theme: String,
    pub font_size: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            theme: "light".to_string(),
            font_size: 12,
        }
    }
}

/// アプリケーション設定
///
/// 元実装のフラットなJSONキーをそのまま引き継ぐ。未知のキーは無視し、
/// 欠けているキーはデフォルト値で補完する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // 必須設定
    pub twitch_channel: String,
    pub trans_username: String,
    pub trans_oauth: String,

    // 基本設定
    pub trans_text_color: String,
    /// ホーム言語（他言語からの翻訳先）
    pub lang_trans_to_home: String,
    /// ホーム言語から翻訳する相手言語
    pub lang_home_to_other: String,
    pub show_by_name: bool,
    pub show_by_lang: bool,

    // 翻訳エンジン設定
    pub translator: String,
    pub deepl_api_key: String,
    pub google_translate_suffix: String,

    // フィルタリング設定
    pub ignore_lang: Vec<String>,
    pub ignore_users: Vec<String>,
    pub ignore_line: Vec<String>,
    /// 単芝・草など、完全一致で無視するトークン
    pub ignore_www: Vec<String>,
    pub delete_words: Vec<String>,

    // TTS設定
    pub tts_enabled: bool,
    pub tts_in: bool,
    pub tts_out: bool,
    pub tts_read_username_input: bool,
    pub tts_read_username_output: bool,
    pub tts_read_content: bool,
    pub tts_read_lang: bool,
    pub tts_kind: String,
    pub tts_text_max_length: usize,
    pub tts_message_for_omitting: String,
    pub read_only_these_lang: Vec<String>,

    // YouTube設定
    pub youtube_video_id: String,
    pub youtube_client_id: String,
    pub youtube_client_secret: String,
    /// 翻訳投稿の最小間隔（秒）
    pub youtube_post_interval_secs: u64,
    /// 1日あたりの翻訳投稿上限（APIクォータ対策）
    pub youtube_post_daily_limit: u32,

    // GUI設定（互換のため保持）
    pub window: WindowConfig,

    // その他
    pub view_only_mode: bool,
    pub debug: bool,
    pub auto_start: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            twitch_channel: String::new(),
            trans_username: String::new(),
            trans_oauth: String::new(),

            trans_text_color: "GoldenRod".to_string(),
            lang_trans_to_home: "ja".to_string(),
            lang_home_to_other: "en".to_string(),
            show_by_name: true,
            show_by_lang: true,

            translator: "google".to_string(),
            deepl_api_key: String::new(),
            google_translate_suffix: "co.jp".to_string(),

            ignore_lang: Vec::new(),
            ignore_users: vec!["Nightbot".to_string(), "BikuBikuTest".to_string()],
            ignore_line: vec![
                "http".to_string(),
                "BikuBikuTest".to_string(),
                "888".to_string(),
                "８８８".to_string(),
            ],
            ignore_www: [
                "w", "ｗ", "W", "Ｗ", "ww", "ｗｗ", "WW", "ＷＷ", "www", "ｗｗｗ", "WWW",
                "ＷＷＷ", "草",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            delete_words: Vec::new(),

            tts_enabled: false,
            tts_in: true,
            tts_out: true,
            tts_read_username_input: true,
            tts_read_username_output: true,
            tts_read_content: true,
            tts_read_lang: false,
            tts_kind: "gtts".to_string(),
            tts_text_max_length: 30,
            tts_message_for_omitting: "以下略".to_string(),
            read_only_these_lang: Vec::new(),

            youtube_video_id: String::new(),
            youtube_client_id: String::new(),
            youtube_client_secret: String::new(),
            youtube_post_interval_secs: 30,
            youtube_post_daily_limit: 200,

            window: WindowConfig::default(),

            view_only_mode: false,
            debug: false,
            auto_start: false,
        }
    }
}

impl AppConfig {
    /// 設定の妥当性をチェック
    ///
    /// 接続開始前に一度だけ呼ばれ、問題点の一覧を返す。
    pub fn validate(&self) -> (bool, Vec<String>) {
        let mut errors = Vec::new();

        // 必須項目チェック（表示のみモードでも最低限必要）
        if self.twitch_channel.trim().is_empty() {
            errors.push("必須項目が未設定: twitch_channel".to_string());
        }

        // 表示のみモードでない場合の追加チェック
        if !self.view_only_mode {
            if self.trans_username.trim().is_empty() {
                errors.push("必須項目が未設定: trans_username".to_string());
            }
            if self.trans_oauth.trim().is_empty() {
                errors.push("必須項目が未設定: trans_oauth".to_string());
            }
        }

        // 翻訳エンジンチェック
        if !TRANSLATOR_KINDS.contains(&self.translator.as_str()) {
            errors.push("翻訳エンジンは 'google' または 'deepl' を指定してください".to_string());
        }

        // TTSチェック
        let tts_kind = self.tts_kind.trim().to_lowercase();
        if !TTS_KINDS.contains(&tts_kind.as_str()) {
            errors.push("TTS種類は 'gtts' または 'cevio' を指定してください".to_string());
        }

        (errors.is_empty(), errors)
    }

    /// OAuthトークンを `oauth:` プレフィックス付きに正規化
    pub fn normalized_oauth(&self) -> String {
        let token = self.trans_oauth.trim();
        if token.is_empty() || token.starts_with("oauth:") {
            token.to_string()
        } else {
            warn!("OAuthトークンが 'oauth:' で始まっていないため補完します");
            format!("oauth:{}", token)
        }
    }
}

/// 設定管理マネージャー
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// 新しい設定マネージャーを作成（既定パスを使用）
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_path: default_config_path()?,
        })
    }

    /// 明示的なパスで設定マネージャーを作成
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// 設定ファイルのパスを取得
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 設定ファイルを読み込む
    ///
    /// ファイルが存在しない場合はデフォルト設定を保存した上で返す。
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "設定ファイル {:?} が見つかりません。デフォルト設定で作成します。",
                self.config_path
            );
            let config = AppConfig::default();
            self.save_config(&config)?;
            return Ok(config);
        }

        let content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", self.config_path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("設定ファイルのパースに失敗: {:?}", self.config_path))?;

        debug!("設定ファイルを読み込みました: {:?}", self.config_path);
        Ok(config)
    }

    /// 設定ファイルを保存する
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("設定ディレクトリの作成に失敗: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, content)
            .with_context(|| format!("設定ファイルの保存に失敗: {:?}", self.config_path))?;

        info!("設定ファイルを保存しました: {:?}", self.config_path);
        Ok(())
    }
}

/// 既定の設定ファイルパスを取得
///
/// 実行ファイルと同じディレクトリの `config.json`。実行ファイルの場所が
/// 取得できない場合はXDG設定ディレクトリを使用する。
pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            return Ok(dir.join("config.json"));
        }
    }

    let project_dirs = ProjectDirs::from("dev", "sifyfy", "transneo")
        .ok_or_else(|| anyhow::anyhow!("Failed to get project directories"))?;
    Ok(project_dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid_except_required_fields() {
        let config = AppConfig::default();
        let (ok, errors) = config.validate();
        assert!(!ok);
        assert!(errors.iter().any(|e| e.contains("twitch_channel")));
        assert!(errors.iter().any(|e| e.contains("trans_username")));
        assert!(errors.iter().any(|e| e.contains("trans_oauth")));
    }

    #[test]
    fn test_view_only_mode_relaxes_credentials() {
        let config = AppConfig {
            twitch_channel: "somechannel".to_string(),
            view_only_mode: true,
            ..Default::default()
        };
        let (ok, errors) = config.validate();
        assert!(ok, "errors: {:?}", errors);
    }

    #[test]
    fn test_invalid_translator_is_reported() {
        let config = AppConfig {
            twitch_channel: "ch".to_string(),
            view_only_mode: true,
            translator: "bing".to_string(),
            ..Default::default()
        };
        let (ok, errors) = config.validate();
        assert!(!ok);
        assert!(errors.iter().any(|e| e.contains("翻訳エンジン")));
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::with_path(&path);

        let mut config = AppConfig::default();
        config.twitch_channel = "testchannel".to_string();
        config.delete_words.push("spamword".to_string());
        manager.save_config(&config).unwrap();

        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_merges_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"twitch_channel": "partial"}"#).unwrap();

        let loaded = ConfigManager::with_path(&path).load_config().unwrap();
        assert_eq!(loaded.twitch_channel, "partial");
        assert_eq!(loaded.lang_trans_to_home, "ja");
        assert!(loaded.ignore_www.contains(&"草".to_string()));
    }

    #[test]
    fn test_oauth_normalization() {
        let mut config = AppConfig::default();
        config.trans_oauth = "abcdef".to_string();
        assert_eq!(config.normalized_oauth(), "oauth:abcdef");

        config.trans_oauth = "oauth:abcdef".to_string();
        assert_eq!(config.normalized_oauth(), "oauth:abcdef");
    }
}
