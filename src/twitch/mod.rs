//! Twitchチャット接続と監視

pub mod irc;
pub mod monitor;

pub use irc::{IrcClient, IrcEvent, TwitchChatEvent};
pub use monitor::ChatMonitor;
