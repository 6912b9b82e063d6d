//! transneo CLI
//!
//! 設定を読み込んでTwitch（および設定があればYouTube Live）のチャット監視を
//! 開始し、処理済みメッセージを端末へ表示するシンクライアント。
//! Ctrl-Cで全モニターを停止して終了する。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use transneo::chat::MessageHistory;
use transneo::config::{AppConfig, ConfigManager};
use transneo::database::{get_database_path, TranslationDatabase};
use transneo::twitch::ChatMonitor;
use transneo::youtube::YouTubeChatMonitor;

/// Twitch/YouTube Live チャット翻訳ツール
#[derive(Debug, Parser)]
#[command(name = "transneo", version, about)]
struct Args {
    /// 設定ファイルのパス（既定: 実行ファイルと同じディレクトリのconfig.json）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 監視するTwitchチャンネル（設定を上書き）
    #[arg(long)]
    channel: Option<String>,

    /// 監視するYouTube動画ID（設定を上書き）
    #[arg(long)]
    video_id: Option<String>,

    /// 表示のみモード（チャットへの投稿を行わない）
    #[arg(long)]
    view_only: bool,

    /// 設定を検証して終了
    #[arg(long)]
    check_config: bool,

    /// ログファイルの出力先ディレクトリ
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = transneo::logging::init_logging(args.log_dir.as_deref())?;

    tracing::info!("🎬 transneo v{} を起動します", env!("CARGO_PKG_VERSION"));

    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let mut config = manager.load_config().unwrap_or_else(|e| {
        tracing::warn!("設定読み込みエラー、デフォルト設定を使用: {}", e);
        AppConfig::default()
    });

    // CLIオプションで設定を上書き
    if let Some(channel) = args.channel {
        config.twitch_channel = channel;
    }
    if let Some(video_id) = args.video_id {
        config.youtube_video_id = video_id;
    }
    if args.view_only {
        config.view_only_mode = true;
    }

    // 接続前の設定検証
    let (valid, errors) = config.validate();
    if !valid {
        for error in &errors {
            tracing::error!("設定エラー: {}", error);
        }
        anyhow::bail!("設定が不正です（{}件のエラー）", errors.len());
    }
    if args.check_config {
        println!("設定OK: {:?}", manager.config_path());
        return Ok(());
    }

    let config = Arc::new(config);

    // 翻訳キャッシュDBを開き、サイズ上限を確認
    let database = Arc::new(TranslationDatabase::new(get_database_path()?)?);
    if database.check_size_and_cleanup().await {
        tracing::info!("翻訳キャッシュをリセットしました");
    }

    let (message_tx, mut message_rx) = mpsc::unbounded_channel();

    // Twitchモニターを起動
    let mut twitch_monitor = ChatMonitor::new(
        Arc::clone(&config),
        Arc::clone(&database),
        message_tx.clone(),
    );
    twitch_monitor.start().await?;

    // YouTubeモニターは動画IDがある場合のみ起動
    let mut youtube_monitor = if config.youtube_video_id.trim().is_empty() {
        None
    } else {
        let mut monitor = YouTubeChatMonitor::new(
            Arc::clone(&config),
            Arc::clone(&database),
            message_tx.clone(),
        );
        monitor.start().await?;
        Some(monitor)
    };
    drop(message_tx);

    let mut history = MessageHistory::new();

    // メッセージ表示ループ
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-Cを受信しました。停止します...");
                break;
            }
            message = message_rx.recv() => {
                let Some(message) = message else { break };
                println!(
                    "{} [{}] {} ({} > {}) {}",
                    message.time_label(),
                    message.user,
                    message.cleaned_content,
                    message.lang,
                    message.target_lang,
                    message.translation,
                );
                history.push(message);
            }
        }
    }

    // 全モニターを停止し、終了を待つ
    if let Some(handle) = twitch_monitor.stop() {
        let _ = handle.await;
    }
    if let Some(monitor) = youtube_monitor.as_mut() {
        if let Some(handle) = monitor.stop() {
            let _ = handle.await;
        }
    }

    tracing::info!("transneoを終了します（表示件数: {}）", history.len());
    Ok(())
}
