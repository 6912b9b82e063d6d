//! Twitchチャット監視
//!
//! IRCクライアントからのイベントを翻訳パイプラインへ流し、結果を
//! メッセージチャネルへ送出する。表示のみモードでなければ翻訳結果を
//! `/me` でチャットへ再投稿する。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chat::ChatMessage;
use crate::config::AppConfig;
use crate::database::TranslationDatabase;
use crate::pipeline::{format_post_text, TranslationPipeline};
use crate::tts::{self, TtsEngine};

use super::irc::{IrcClient, IrcEvent, TwitchChatEvent};

/// Twitchチャット監視クラス
pub struct ChatMonitor {
    config: Arc<AppConfig>,
    database: Arc<TranslationDatabase>,
    message_tx: mpsc::UnboundedSender<ChatMessage>,
    running: Arc<AtomicBool>,
    shutdown_tx: Option<mpsc::UnboundedSender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ChatMonitor {
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
    ///
    /// IRCへ接続してイベントループを起動する。設定が不足している場合は
    /// エラーを返す。
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let config = Arc::clone(&self.config);

        if config.twitch_channel.trim().is_empty() {
            bail!("twitch_channelが設定されていません");
        }

        let oauth = config.normalized_oauth();
        if !config.view_only_mode && oauth.is_empty() {
            bail!("trans_oauthが設定されていません");
        }

        tracing::info!(
            "Twitchチャンネル '{}' の監視を開始します (表示のみ: {})",
            config.twitch_channel,
            config.view_only_mode
        );

        // 表示のみモードで認証情報が揃っていない場合は匿名接続
        let anonymous =
            config.view_only_mode && (oauth.is_empty() || config.trans_username.trim().is_empty());
        let mut client = if anonymous {
            IrcClient::connect_anonymous().await?
        } else {
            IrcClient::connect(&config.trans_username, &oauth).await?
        };

        let incoming = client
            .incoming
            .take()
            .ok_or_else(|| anyhow::anyhow!("IRC受信チャネルの取得に失敗"))?;

        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        self.shutdown_tx = Some(shutdown_tx);
        self.running.store(true, Ordering::SeqCst);

        let pipeline = TranslationPipeline::new(&config, Arc::clone(&self.database));
        let mut tts_engine = TtsEngine::new(&config);
        tts_engine.start();

        let task = EventLoop {
            config,
            client,
            pipeline,
            tts_engine,
            message_tx: self.message_tx.clone(),
            running: Arc::clone(&self.running),
        };

        self.task = Some(tokio::spawn(task.run(incoming, shutdown_rx)));
        Ok(())
    }

    /// 監視停止
    ///
    /// イベントループに停止を通知する。進行中の翻訳呼び出しは完了後に
    /// 結果が破棄される。
    pub fn stop(&mut self) -> Option<JoinHandle<()>> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        tracing::info!("Twitchチャット監視の停止を要求しました");
        self.task.take()
    }
}

/// 監視タスク本体
struct EventLoop {
    config: Arc<AppConfig>,
    client: IrcClient,
    pipeline: TranslationPipeline,
    tts_engine: TtsEngine,
    message_tx: mpsc::UnboundedSender<ChatMessage>,
    running: Arc<AtomicBool>,
}

impl EventLoop {
    async fn run(
        mut self,
        mut incoming: mpsc::UnboundedReceiver<IrcEvent>,
        mut shutdown_rx: mpsc::UnboundedReceiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Twitch監視ループを停止します");
                    break;
                }
                event = incoming.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            tracing::warn!("IRC接続が切断されました");
                            break;
                        }
                    }
                }
            }
        }

        if let Some(handle) = self.tts_engine.stop() {
            let _ = handle.await;
        }
        self.client.shutdown();
        self.running.store(false, Ordering::SeqCst);
    }

    async fn handle_event(&mut self, event: IrcEvent) {
        match event {
            IrcEvent::Ready => {
                tracing::info!("チャットボット '{}' が起動しました", self.client.nick());
                self.client.join_channel(&self.config.twitch_channel);
            }
            IrcEvent::Joined { channel } => {
                tracing::info!("チャンネル '{}' に参加しました", channel);
                if !self.config.view_only_mode {
                    self.client
                        .send_privmsg(&channel, &format!("/color {}", self.config.trans_text_color));
                    self.client.send_privmsg(
                        &channel,
                        &format!("/me transneo v{} 起動しました", env!("CARGO_PKG_VERSION")),
                    );
                }
            }
            IrcEvent::Message(event) => {
                self.handle_chat_message(event).await;
            }
        }
    }

    async fn handle_chat_message(&mut self, event: TwitchChatEvent) {
        // 停止中は処理しない
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        // 自分の発言（エコー）は無視
        if event.login.eq_ignore_ascii_case(self.client.nick()) {
            return;
        }

        // コマンドメッセージは翻訳処理しない
        if event.text.starts_with('!') {
            return;
        }

        let Some(message) = self
            .pipeline
            .process(
                &event.display_name,
                &event.text,
                Utc::now(),
                event.emotes.as_deref(),
            )
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

        // チャットに投稿（表示のみモードでない場合）
        if !self.config.view_only_mode {
            let output = format_post_text(&self.config, &message);
            self.client
                .send_privmsg(&event.channel, &format!("/me {}", output));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_requires_channel() {
        let config = Arc::new(AppConfig::default());
        let database = Arc::new(TranslationDatabase::new_in_memory().unwrap());
        let (tx, _rx) = mpsc::unbounded_channel();

        let mut monitor = ChatMonitor::new(config, database, tx);
        assert!(monitor.start().await.is_err());
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn test_start_requires_oauth_unless_view_only() {
        let config = Arc::new(AppConfig {
            twitch_channel: "somechannel".to_string(),
            ..Default::default()
        });
        let database = Arc::new(TranslationDatabase::new_in_memory().unwrap());
        let (tx, _rx) = mpsc::unbounded_channel();

        let mut monitor = ChatMonitor::new(config, database, tx);
        let result = monitor.start().await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("trans_oauth"));
    }
}
