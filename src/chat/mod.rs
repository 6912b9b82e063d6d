//! チャットメッセージのモデルと加工処理

pub mod history;
pub mod message;
pub mod processor;

pub use history::MessageHistory;
pub use message::ChatMessage;
pub use processor::MessageProcessor;
