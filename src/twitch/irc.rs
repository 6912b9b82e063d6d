//! Twitch IRCクライアント
//!
//! `irc.chat.twitch.tv:6697` へTLSで接続し、PASS/NICK/CAPのハンドシェイク後に
//! 読み取り・書き込みタスクを起動する。PINGには自動で応答し、PRIVMSGは
//! `emotes`・`display-name` タグ付きのイベントとして通知する。

use std::io;

use tokio::io::{split, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tokio_native_tls::native_tls;
use tokio_native_tls::TlsConnector;
use tracing::{debug, error, info};

const TWITCH_IRC_HOST: &str = "irc.chat.twitch.tv";
const TWITCH_IRC_PORT: u16 = 6697;

/// パース済みIRC行
#[derive(Debug, Clone, Default)]
pub struct ParsedIrcLine {
    pub tags: Option<String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
    pub trailing: Option<String>,
}

impl ParsedIrcLine {
    /// IRC1行をタグ・プレフィックス・コマンド・パラメーターに分解
    pub fn parse(line: &str) -> Self {
        let mut rest = line.trim();
        let mut parsed = Self::default();

        // タグ
        if rest.starts_with('@') {
            match rest.find(' ') {
                Some(pos) => {
                    parsed.tags = Some(rest[..pos].to_string());
                    rest = &rest[pos + 1..];
                }
                None => {
                    parsed.tags = Some(rest.to_string());
                    return parsed;
                }
            }
        }

        // プレフィックス
        if rest.starts_with(':') {
            match rest.find(' ') {
                Some(pos) => {
                    parsed.prefix = Some(rest[..pos].trim_start_matches(':').to_string());
                    rest = &rest[pos + 1..];
                }
                None => {
                    parsed.prefix = Some(rest.trim_start_matches(':').to_string());
                    return parsed;
                }
            }
        }

        // コマンド
        let mut parts = rest.splitn(2, ' ');
        if let Some(cmd) = parts.next() {
            parsed.command = cmd.to_uppercase();
        }
        rest = parts.next().unwrap_or("");

        // トレーリング
        if let Some(idx) = rest.find(" :") {
            parsed.trailing = Some(rest[idx + 2..].to_string());
            let before = rest[..idx].trim();
            if !before.is_empty() {
                parsed
                    .params
                    .extend(before.split_whitespace().map(|s| s.to_string()));
            }
        } else if let Some(stripped) = rest.strip_prefix(':') {
            parsed.trailing = Some(stripped.to_string());
        } else {
            parsed
                .params
                .extend(rest.split_whitespace().map(|s| s.to_string()));
        }

        parsed
    }

    /// プレフィックスからログイン名を取得（`nick!user@host` の `nick`）
    pub fn login(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }

    /// タグから値を取得
    pub fn tag_value(&self, key: &str) -> Option<String> {
        let tags = self.tags.as_deref()?;
        for kv in tags.trim_start_matches('@').split(';') {
            let mut parts = kv.splitn(2, '=');
            if parts.next() == Some(key) {
                let value = parts.next().unwrap_or("");
                if value.is_empty() {
                    return None;
                }
                return Some(value.to_string());
            }
        }
        None
    }
}

/// チャットメッセージイベント
#[derive(Debug, Clone)]
pub struct TwitchChatEvent {
    pub channel: String,
    /// IRCログイン名（エコー判定用）
    pub login: String,
    /// 表示名（タグがなければログイン名）
    pub display_name: String,
    pub text: String,
    /// `emotes` タグの生値
    pub emotes: Option<String>,
}

/// 読み取りループからの上位イベント
#[derive(Debug, Clone)]
pub enum IrcEvent {
    /// ログイン完了（001受信）
    Ready,
    /// 自分のJOINが完了
    Joined { channel: String },
    /// チャットメッセージ
    Message(TwitchChatEvent),
}

/// TLS越しのTwitch IRCクライアント
pub struct IrcClient {
    raw_outgoing: mpsc::UnboundedSender<String>,
    /// 上位イベントの受信側（呼び出し側が `take` する）
    pub incoming: Option<mpsc::UnboundedReceiver<IrcEvent>>,
    nick: String,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl IrcClient {
    /// 認証付きで接続
    ///
    /// `oauth_token` は `oauth:` プレフィックス付き。
    pub async fn connect(username: &str, oauth_token: &str) -> io::Result<Self> {
        let nick = username.to_lowercase();
        Self::connect_inner(nick, Some(oauth_token.to_string())).await
    }

    /// 匿名（読み取り専用）で接続
    ///
    /// 表示のみモード用。`justinfan` ニックは投稿できないが受信はできる。
    pub async fn connect_anonymous() -> io::Result<Self> {
        let nick = format!("justinfan{}", std::process::id() % 100_000);
        Self::connect_inner(nick, None).await
    }

    async fn connect_inner(nick: String, oauth_token: Option<String>) -> io::Result<Self> {
        let tcp = TcpStream::connect((TWITCH_IRC_HOST, TWITCH_IRC_PORT))
            .await
            .map_err(|e| io::Error::other(format!("TCP接続エラー: {e}")))?;

        let native_connector = native_tls::TlsConnector::new()
            .map_err(|e| io::Error::other(format!("TLSコネクター作成エラー: {e}")))?;
        let connector = TlsConnector::from(native_connector);

        let tls_stream = connector
            .connect(TWITCH_IRC_HOST, tcp)
            .await
            .map_err(|e| io::Error::other(format!("TLSハンドシェイクエラー: {e}")))?;

        let (read_half, write_half) = split(tls_stream);

        let (tx_outgoing, rx_outgoing) = mpsc::unbounded_channel::<String>();
        let (tx_incoming, rx_incoming) = mpsc::unbounded_channel::<IrcEvent>();

        let write_task = tokio::spawn(Self::writer_loop(write_half, rx_outgoing));

        // ログインシーケンス
        if let Some(token) = oauth_token {
            let _ = tx_outgoing.send(format!("PASS {}", token));
        }
        let _ = tx_outgoing.send(format!("NICK {}", nick));
        let _ = tx_outgoing.send("CAP REQ :twitch.tv/commands twitch.tv/tags".to_string());

        let read_task = tokio::spawn(Self::reader_loop(
            read_half,
            tx_incoming,
            tx_outgoing.clone(),
            nick.clone(),
        ));

        Ok(Self {
            raw_outgoing: tx_outgoing,
            incoming: Some(rx_incoming),
            nick,
            read_task,
            write_task,
        })
    }

    /// 接続中のニック
    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn send_raw_line(&self, line: &str) {
        let _ = self.raw_outgoing.send(line.to_string());
    }

    pub fn join_channel(&self, channel: &str) {
        self.send_raw_line(&format!("JOIN {}", normalize_channel(channel)));
    }

    pub fn send_privmsg(&self, channel: &str, message: &str) {
        self.send_raw_line(&format!(
            "PRIVMSG {} :{}",
            normalize_channel(channel),
            message
        ));
    }

    /// 読み書きタスクを中断して切断
    pub fn shutdown(self) {
        self.read_task.abort();
        self.write_task.abort();
    }

    async fn reader_loop<R>(
        read_half: R,
        tx_incoming: mpsc::UnboundedSender<IrcEvent>,
        tx_outgoing: mpsc::UnboundedSender<String>,
        own_nick: String,
    ) where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(read_half);
        let mut line_buffer = String::new();

        loop {
            line_buffer.clear();
            match reader.read_line(&mut line_buffer).await {
                Ok(0) => {
                    info!("IRC接続がクローズされました (EOF)");
                    break;
                }
                Ok(_) => {
                    let line = line_buffer.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    debug!("<< {}", line);

                    let parsed = ParsedIrcLine::parse(line);

                    match parsed.command.as_str() {
                        "PING" => {
                            let payload = parsed.trailing.as_deref().unwrap_or("");
                            let _ = tx_outgoing.send(format!("PONG :{}", payload));
                        }
                        "001" => {
                            let _ = tx_incoming.send(IrcEvent::Ready);
                        }
                        "JOIN" => {
                            if parsed.login() == Some(own_nick.as_str()) {
                                let channel = parsed
                                    .params
                                    .first()
                                    .cloned()
                                    .or_else(|| parsed.trailing.clone())
                                    .unwrap_or_default();
                                let _ = tx_incoming.send(IrcEvent::Joined { channel });
                            }
                        }
                        "PRIVMSG" => {
                            if let Some(event) = privmsg_event(&parsed) {
                                let _ = tx_incoming.send(IrcEvent::Message(event));
                            }
                        }
                        _ => {}
                    }
                }
                Err(e) => {
                    error!("IRC読み取りエラー: {:?}", e);
                    break;
                }
            }
        }

        info!("IRC読み取りループを終了しました");
    }

    async fn writer_loop<W>(mut write_half: W, mut rx_outgoing: mpsc::UnboundedReceiver<String>)
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        let mut writer = BufWriter::new(&mut write_half);

        while let Some(line) = rx_outgoing.recv().await {
            debug!(">> {}", line);
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                error!("IRC書き込みエラー: {:?}", e);
                break;
            }
            if let Err(e) = writer.write_all(b"\r\n").await {
                error!("IRC書き込みエラー: {:?}", e);
                break;
            }
            if let Err(e) = writer.flush().await {
                error!("IRCフラッシュエラー: {:?}", e);
                break;
            }
        }

        info!("IRC書き込みループを終了しました");
    }
}

/// PRIVMSG行をチャットイベントへ変換
fn privmsg_event(parsed: &ParsedIrcLine) -> Option<TwitchChatEvent> {
    let channel = parsed.params.first()?.clone();
    let text = parsed.trailing.clone()?;
    let login = parsed.login()?.to_string();
    let display_name = parsed
        .tag_value("display-name")
        .unwrap_or_else(|| login.clone());
    let emotes = parsed.tag_value("emotes");

    Some(TwitchChatEvent {
        channel,
        login,
        display_name,
        text,
        emotes,
    })
}

/// チャンネル名を `#name` 形式の小文字へ正規化
pub fn normalize_channel(channel: &str) -> String {
    let channel = channel.trim().trim_start_matches('#').to_lowercase();
    format!("#{}", channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg_with_tags() {
        let line = "@badge-info=;display-name=Alice;emotes=25:0-4;user-id=123 :alice!alice@alice.tmi.twitch.tv PRIVMSG #channel :Kappa hello";
        let parsed = ParsedIrcLine::parse(line);

        assert_eq!(parsed.command, "PRIVMSG");
        assert_eq!(parsed.params, vec!["#channel"]);
        assert_eq!(parsed.trailing.as_deref(), Some("Kappa hello"));
        assert_eq!(parsed.login(), Some("alice"));
        assert_eq!(parsed.tag_value("display-name").as_deref(), Some("Alice"));
        assert_eq!(parsed.tag_value("emotes").as_deref(), Some("25:0-4"));
        assert_eq!(parsed.tag_value("badge-info"), None);
    }

    #[test]
    fn test_parse_ping() {
        let parsed = ParsedIrcLine::parse("PING :tmi.twitch.tv");
        assert_eq!(parsed.command, "PING");
        assert_eq!(parsed.trailing.as_deref(), Some("tmi.twitch.tv"));
    }

    #[test]
    fn test_parse_numeric_welcome() {
        let parsed = ParsedIrcLine::parse(":tmi.twitch.tv 001 somenick :Welcome, GLHF!");
        assert_eq!(parsed.command, "001");
        assert_eq!(parsed.params, vec!["somenick"]);
    }

    #[test]
    fn test_privmsg_event_mapping() {
        let line = "@display-name=Bob :bob!bob@bob.tmi.twitch.tv PRIVMSG #ch :hi there";
        let parsed = ParsedIrcLine::parse(line);
        let event = privmsg_event(&parsed).unwrap();

        assert_eq!(event.channel, "#ch");
        assert_eq!(event.login, "bob");
        assert_eq!(event.display_name, "Bob");
        assert_eq!(event.text, "hi there");
        assert_eq!(event.emotes, None);
    }

    #[test]
    fn test_privmsg_without_display_name_uses_login() {
        let line = ":carol!carol@carol.tmi.twitch.tv PRIVMSG #ch :hey";
        let event = privmsg_event(&ParsedIrcLine::parse(line)).unwrap();
        assert_eq!(event.display_name, "carol");
    }

    #[test]
    fn test_normalize_channel() {
        assert_eq!(normalize_channel("MyChannel"), "#mychannel");
        assert_eq!(normalize_channel("#already"), "#already");
        assert_eq!(normalize_channel("  spaced  "), "#spaced");
    }
}
