//! YouTube Live チャットのInnerTubeクライアント
//!
//! ライブ配信の視聴ページから `INNERTUBE_API_KEY` などのメタデータを
//! 正規表現で抽出し、`get_live_chat` エンドポイントをcontinuationトークンで
//! たどりながらチャットをポーリングする。

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone, derive_more::Display, Serialize, Deserialize)]
pub struct VideoId(pub String);

#[derive(Debug, Clone, derive_more::Display)]
pub struct ApiKey(pub String);

#[derive(Debug, Clone, derive_more::Display)]
pub struct ClientVersion(pub String);

#[derive(Debug, Clone, derive_more::Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Continuation(pub String);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// InnerTubeクライアント
#[derive(Debug, Clone)]
pub struct InnerTube {
    pub video_id: VideoId,
    pub api_key: ApiKey,
    pub client_version: ClientVersion,
    pub continuation: Continuation,
    pub http_client: reqwest::Client,
}

pub fn extract_api_key(html: &str) -> Option<ApiKey> {
    Regex::new(r#"['"]INNERTUBE_API_KEY['"]:\s*['"](.+?)['"]"#)
        .unwrap()
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| ApiKey(m.as_str().to_string()))
}

pub fn extract_client_version(html: &str) -> Option<ClientVersion> {
    Regex::new(r#"['"]INNERTUBE_CLIENT_VERSION['"]:\s*['"](.+?)['"]"#)
        .unwrap()
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| ClientVersion(m.as_str().to_string()))
}

pub fn extract_continuation(html: &str) -> Option<Continuation> {
    Regex::new(r#"['"]continuation['"]:\s*['"](.+?)['"]"#)
        .unwrap()
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| Continuation(m.as_str().to_string()))
}

/// 視聴ページを取得してInnerTubeクライアントを初期化
pub async fn fetch_live_chat_page(video_id: &str) -> Result<InnerTube, FetchError> {
    let url = format!("https://www.youtube.com/watch?v={}", video_id);
    tracing::info!("🌐 ライブチャットページを取得: {}", url);

    let client = reqwest::Client::new();
    let response = client
        .get(&url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }

    let html = response.text().await?;

    let api_key = extract_api_key(&html).ok_or(FetchError::NotFound("api_key"))?;
    let client_version =
        extract_client_version(&html).ok_or(FetchError::NotFound("client_version"))?;
    let continuation = extract_continuation(&html).ok_or(FetchError::NotFound("continuation"))?;

    tracing::info!("✅ InnerTubeクライアントを初期化しました");
    Ok(InnerTube {
        video_id: VideoId(video_id.to_string()),
        api_key,
        client_version,
        continuation,
        http_client: client,
    })
}

/// `get_live_chat` のレスポンス（必要な部分のみ）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetLiveChatResponse {
    #[serde(rename = "continuationContents", default)]
    pub continuation_contents: Option<ContinuationContents>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuationContents {
    #[serde(rename = "liveChatContinuation")]
    pub live_chat_continuation: LiveChatContinuation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveChatContinuation {
    #[serde(default)]
    pub continuations: Vec<serde_json::Value>,
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
}

/// フラット化したチャット1件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeChatItem {
    pub id: String,
    pub author: String,
    pub text: String,
    /// マイクロ秒単位のタイムスタンプ
    pub timestamp_usec: Option<i64>,
}

/// チャットメッセージをポーリング
pub async fn fetch_live_chat_messages(
    inner_tube: &InnerTube,
) -> Result<GetLiveChatResponse, FetchError> {
    let url = format!(
        "https://www.youtube.com/youtubei/v1/live_chat/get_live_chat?key={}",
        inner_tube.api_key
    );

    let payload = serde_json::json!({
        "context": {
            "client": {
                "clientName": "WEB",
                "clientVersion": inner_tube.client_version.to_string()
            }
        },
        "continuation": inner_tube.continuation.to_string(),
    });

    let response = inner_tube
        .http_client
        .post(&url)
        .header("Content-Type", "application/json")
        .header("User-Agent", USER_AGENT)
        .json(&payload)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(FetchError::Status(response.status()));
    }

    let body = response.text().await?;
    let parsed: GetLiveChatResponse = serde_json::from_str(&body)?;
    Ok(parsed)
}

/// 次のcontinuationトークンを取得
pub fn get_next_continuation(response: &GetLiveChatResponse) -> Option<String> {
    response
        .continuation_contents
        .as_ref()?
        .live_chat_continuation
        .continuations
        .first()
        .and_then(|v| {
            v.get("invalidationContinuationData")
                .or_else(|| v.get("timedContinuationData"))
                .or_else(|| v.get("reloadContinuationData"))
        })
        .and_then(|v| v.get("continuation"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// レスポンスからチャットメッセージを抽出
///
/// `addChatItemAction` のテキストメッセージのみを対象とし、
/// メッセージ本文はテキストrunを連結して得る。
pub fn extract_chat_items(response: &GetLiveChatResponse) -> Vec<YouTubeChatItem> {
    let Some(contents) = &response.continuation_contents else {
        return Vec::new();
    };

    contents
        .live_chat_continuation
        .actions
        .iter()
        .filter_map(|action| {
            let renderer = action
                .get("addChatItemAction")?
                .get("item")?
                .get("liveChatTextMessageRenderer")?;

            let id = renderer.get("id")?.as_str()?.to_string();
            let author = renderer
                .get("authorName")
                .and_then(|v| v.get("simpleText"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let text = renderer
                .get("message")
                .and_then(|v| v.get("runs"))
                .and_then(|v| v.as_array())
                .map(|runs| {
                    runs.iter()
                        .filter_map(|run| run.get("text").and_then(|t| t.as_str()))
                        .collect::<String>()
                })
                .unwrap_or_default();

            let timestamp_usec = renderer
                .get("timestampUsec")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<i64>().ok());

            Some(YouTubeChatItem {
                id,
                author,
                text,
                timestamp_usec,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <script>
        var cfg = {"INNERTUBE_API_KEY": "AIzaTestKey123", "INNERTUBE_CLIENT_VERSION": "2.20240101.00.00"};
        var data = {"continuation": "0ofMyANexample"};
        </script>
    "#;

    #[test]
    fn test_extract_page_metadata() {
        assert_eq!(
            extract_api_key(SAMPLE_HTML).unwrap().to_string(),
            "AIzaTestKey123"
        );
        assert_eq!(
            extract_client_version(SAMPLE_HTML).unwrap().to_string(),
            "2.20240101.00.00"
        );
        assert_eq!(
            extract_continuation(SAMPLE_HTML).unwrap().to_string(),
            "0ofMyANexample"
        );
    }

    #[test]
    fn test_extract_missing_metadata() {
        assert!(extract_api_key("<html></html>").is_none());
    }

    fn sample_response() -> GetLiveChatResponse {
        let json = serde_json::json!({
            "continuationContents": {
                "liveChatContinuation": {
                    "continuations": [
                        {"invalidationContinuationData": {"continuation": "next-token"}}
                    ],
                    "actions": [
                        {
                            "addChatItemAction": {
                                "item": {
                                    "liveChatTextMessageRenderer": {
                                        "id": "msg-1",
                                        "timestampUsec": "1700000000000000",
                                        "authorName": {"simpleText": "alice"},
                                        "message": {"runs": [
                                            {"text": "hello "},
                                            {"emoji": {"emojiId": "x"}},
                                            {"text": "world"}
                                        ]}
                                    }
                                }
                            }
                        },
                        {"removeChatItemAction": {"targetItemId": "other"}}
                    ]
                }
            }
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_get_next_continuation() {
        let response = sample_response();
        assert_eq!(get_next_continuation(&response).as_deref(), Some("next-token"));
    }

    #[test]
    fn test_extract_chat_items() {
        let response = sample_response();
        let items = extract_chat_items(&response);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "msg-1");
        assert_eq!(items[0].author, "alice");
        assert_eq!(items[0].text, "hello world");
        assert_eq!(items[0].timestamp_usec, Some(1_700_000_000_000_000));
    }

    #[test]
    fn test_empty_response_yields_nothing() {
        let response: GetLiveChatResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_chat_items(&response).is_empty());
        assert!(get_next_continuation(&response).is_none());
    }
}
