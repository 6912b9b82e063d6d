//! YouTube Liveチャットの取得・監視・投稿

pub mod innertube;
pub mod limiter;
pub mod monitor;
pub mod poster;

pub use innertube::{fetch_live_chat_messages, fetch_live_chat_page, FetchError, InnerTube};
pub use limiter::PostRateLimiter;
pub use monitor::YouTubeChatMonitor;
pub use poster::YouTubePoster;
