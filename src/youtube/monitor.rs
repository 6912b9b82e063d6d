//! YouTube Liveチャット監視
//!
//! InnerTubeクライアントで約2秒間隔のポーリングを行い、取得したメッセージを
//! 翻訳パイプラインへ流す。投稿クライアントが使える場合はレートリミッターの
//! 範囲内で翻訳結果をチャットへ投稿する。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chat::ChatMessage;
use crate::config::AppConfig;
use crate::database::TranslationDatabase;
use crate::pipeline::{format_post_text, TranslationPipeline};
use crate::tts::{self, TtsEngine};

use super::innertube::{
    extract_chat_items, fetch_live_chat_messages, fetch_live_chat_page, get_next_continuation,
    Continuation, InnerTube, YouTubeChatItem,
};
use super::limiter::PostRateLimiter;
use super::poster::YouTubePoster;

/// ポーリング間隔
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// YouTube Liveチャット監視クラス
pub struct YouTubeChatMonitor {
    config: Arc<AppConfig>,
    database: Arc<TranslationDatabase>,
    message_tx: mpsc::UnboundedSender<ChatMessage>,
    running: Arc<AtomicBool>,
    shutdown_tx: Option<mpsc::UnboundedSender<()>>,
    task: Option<JoinHandle<()>>,
}

impl YouTubeChatMonitor {
    /// 監視クラスを作成（接続はまだ行わない）
    pub fn new(
        config: Arc<AppConfig>,
        database: Arc<TranslationDatabase>,
        message_tx: mpsc::UnboundedSender<ChatMessage>,
    ) -> Self {
        Self {
            config,
            database,
            message_tx,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 監視開始
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let config = Arc::clone(&self.config);
        let video_id = config.youtube_video_id.trim().to_string();
        if video_id.is_empty() {
            bail!("youtube_video_idが設定されていません");
        }

        tracing::info!("YouTube Live チャット監視を開始: video_id={}", video_id);

        let inner_tube = fetch_live_chat_page(&video_id).await?;

        // 投稿クライアント（表示のみモードでは作らない）
        let poster = if config.view_only_mode {
            None
        } else {
            YouTubePoster::create(&config, &video_id).await?
        };

        let limiter = PostRateLimiter::new(
            Duration::from_secs(config.youtube_post_interval_secs),
            config.youtube_post_daily_limit,
        );

        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        self.shutdown_tx = Some(shutdown_tx);
        self.running.store(true, Ordering::SeqCst);

        let pipeline = TranslationPipeline::new(&config, Arc::clone(&self.database));
        let mut tts_engine = TtsEngine::new(&config);
        tts_engine.start();

        let poll_loop = PollLoop {
            config,
            inner_tube,
            pipeline,
            tts_engine,
            poster,
            limiter,
            message_tx: self.message_tx.clone(),
            running: Arc::clone(&self.running),
        };

        self.task = Some(tokio::spawn(poll_loop.run(shutdown_rx)));
        Ok(())
    }

    /// 監視停止
    pub fn stop(&mut self) -> Option<JoinHandle<()>> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        tracing::info!("YouTube Live チャット監視の停止を要求しました");
        self.task.take()
    }
}

/// ポーリングタスク本体
struct PollLoop {
    config: Arc<AppConfig>,
    inner_tube: InnerTube,
    pipeline: TranslationPipeline,
    tts_engine: TtsEngine,
    poster: Option<YouTubePoster>,
    limiter: PostRateLimiter,
    message_tx: mpsc::UnboundedSender<ChatMessage>,
    running: Arc<AtomicBool>,
}

impl PollLoop {
    async fn run(mut self, mut shutdown_rx: mpsc::UnboundedReceiver<()>) {
        let mut interval = tokio::time::interval(POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("YouTube監視ループを停止します");
                    break;
                }
                _ = interval.tick() => {
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Err(e) = self.poll_once().await {
                        tracing::error!("YouTubeチャット取得エラー: {}", e);
                    }
                }
            }
        }

        if let Some(handle) = self.tts_engine.stop() {
            let _ = handle.await;
        }
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("YouTube監視ループが終了しました");
    }

    async fn poll_once(&mut self) -> Result<()> {
        let response = fetch_live_chat_messages(&self.inner_tube).await?;

        // continuationを更新（取れない場合は現在のトークンを使い続ける）
        if let Some(next) = get_next_continuation(&response) {
            self.inner_tube.continuation = Continuation(next);
        }

        for item in extract_chat_items(&response) {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.handle_chat_item(item).await;
        }

        Ok(())
    }

    async fn handle_chat_item(&mut self, item: YouTubeChatItem) {
        if item.author.is_empty() || item.text.is_empty() {
            return;
        }

        let timestamp = item
            .timestamp_usec
            .and_then(|usec| Utc.timestamp_micros(usec).single())
            .unwrap_or_else(Utc::now);

        // YouTubeにはエモートタグがない
        let Some(message) = self
            .pipeline
            .process(&item.author, &item.text, timestamp, None)
            .await
        else {
            return;
        };

        // クライアント（CLI/GUI）への通知
        let _ = self.message_tx.send(message.clone());

        // TTS読み上げ
        tts::enqueue_chat_message(
            &self.tts_engine,
            self.pipeline.processor(),
            &self.config,
            &message,
        );

        // チャットに投稿（認証済みかつレート制限内の場合のみ）
        if let Some(poster) = &self.poster {
            if self.limiter.try_acquire() {
                let output = format_post_text(&self.config, &message);
                if let Err(e) = poster.send_message(&output).await {
                    tracing::error!("YouTube投稿エラー: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_requires_video_id() {
        let config = Arc::new(AppConfig::default());
        let database = Arc::new(TranslationDatabase::new_in_memory().unwrap());
        let (tx, _rx) = mpsc::unbounded_channel();

        let mut monitor = YouTubeChatMonitor::new(config, database, tx);
        let result = monitor.start().await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("youtube_video_id"));
    }
}
