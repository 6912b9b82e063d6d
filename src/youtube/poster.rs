//! YouTubeライブチャットへの投稿
//!
//! YouTube Data API v3 の `liveChatMessages.insert` を使って翻訳結果を
//! 投稿する。認証はOAuth2のインストールアプリフローで、トークンは
//! ファイルへ永続化される。クライアントIDとシークレットが設定されて
//! いない場合、モニターは投稿なしの読み取り専用で動作する。

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod};

use crate::config::AppConfig;

/// YouTube Data API v3 のスコープ
const YOUTUBE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/youtube.force-ssl"];

/// トークンキャッシュの保存パス
fn token_cache_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("dev", "sifyfy", "transneo")
        .ok_or_else(|| anyhow::anyhow!("Failed to get project directories"))?;
    let dir = project_dirs.config_dir();
    std::fs::create_dir_all(dir)?;
    Ok(dir.join("youtube_token.json"))
}

/// YouTubeライブチャット投稿クライアント
pub struct YouTubePoster {
    client: reqwest::Client,
    auth: DefaultAuthenticator,
    live_chat_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(rename = "liveStreamingDetails")]
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
struct LiveStreamingDetails {
    #[serde(rename = "activeLiveChatId")]
    active_live_chat_id: Option<String>,
}

impl YouTubePoster {
    /// 認証を行い、対象動画のライブチャットIDを解決して作成
    ///
    /// クライアントIDまたはシークレットが未設定の場合は `None` を返す
    /// （投稿機能なしの読み取り専用）。
    pub async fn create(config: &AppConfig, video_id: &str) -> Result<Option<Self>> {
        if config.youtube_client_id.trim().is_empty()
            || config.youtube_client_secret.trim().is_empty()
        {
            tracing::info!("YouTube APIの認証情報が未設定のため読み取り専用で動作します");
            return Ok(None);
        }

        let secret = ApplicationSecret {
            client_id: config.youtube_client_id.trim().to_string(),
            client_secret: config.youtube_client_secret.trim().to_string(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            redirect_uris: vec!["http://localhost".to_string()],
            ..Default::default()
        };

        let auth =
            InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
                .persist_tokens_to_disk(token_cache_path()?)
                .build()
                .await
                .context("YouTube OAuth認証に失敗")?;

        let client = reqwest::Client::new();
        let live_chat_id = Self::resolve_live_chat_id(&client, &auth, video_id).await?;

        tracing::info!("✅ YouTube投稿クライアントを初期化しました");
        Ok(Some(Self {
            client,
            auth,
            live_chat_id,
        }))
    }

    async fn access_token(&self) -> Result<String> {
        let token = self
            .auth
            .token(YOUTUBE_SCOPES)
            .await
            .context("アクセストークンの取得に失敗")?;
        token
            .token()
            .map(|t| t.to_string())
            .ok_or_else(|| anyhow::anyhow!("アクセストークンが空です"))
    }

    /// 動画IDからアクティブなライブチャットIDを取得
    async fn resolve_live_chat_id(
        client: &reqwest::Client,
        auth: &DefaultAuthenticator,
        video_id: &str,
    ) -> Result<String> {
        let token = auth
            .token(YOUTUBE_SCOPES)
            .await
            .context("アクセストークンの取得に失敗")?;
        let access = token
            .token()
            .ok_or_else(|| anyhow::anyhow!("アクセストークンが空です"))?;

        let response = client
            .get("https://www.googleapis.com/youtube/v3/videos")
            .query(&[("part", "liveStreamingDetails"), ("id", video_id)])
            .bearer_auth(access)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("videos.list がステータス {} を返しました", response.status());
        }

        let body: VideoListResponse = response.json().await?;
        body.items
            .into_iter()
            .next()
            .and_then(|item| item.live_streaming_details)
            .and_then(|details| details.active_live_chat_id)
            .ok_or_else(|| {
                anyhow::anyhow!("この動画にはアクティブなライブチャットがありません: {}", video_id)
            })
    }

    /// ライブチャットへメッセージを投稿
    pub async fn send_message(&self, message: &str) -> Result<()> {
        let access = self.access_token().await?;

        let body = serde_json::json!({
            "snippet": {
                "liveChatId": self.live_chat_id,
                "type": "textMessageEvent",
                "textMessageDetails": {
                    "messageText": message
                }
            }
        });

        let response = self
            .client
            .post("https://www.googleapis.com/youtube/v3/liveChat/messages")
            .query(&[("part", "snippet")])
            .bearer_auth(access)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if text.contains("quotaExceeded") {
                anyhow::bail!("YouTube APIのクォータを超過しました");
            } else if text.contains("liveChatEnded") {
                anyhow::bail!("ライブチャットは終了しています");
            }
            anyhow::bail!("メッセージ送信エラー: ステータス {}", status);
        }

        Ok(())
    }
}
