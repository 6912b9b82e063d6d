//! 処理済みメッセージの履歴バッファ

use std::collections::VecDeque;

use super::ChatMessage;

/// 既定の保持件数
pub const DEFAULT_CAPACITY: usize = 1000;

/// 直近メッセージのFIFOバッファ
///
/// 上限を超えると最も古いメッセージから破棄される。永続化はしない。
#[derive(Debug, Clone)]
pub struct MessageHistory {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl MessageHistory {
    /// 既定容量（1000件）で作成
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// 容量を指定して作成
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// メッセージを追加（満杯なら最古を破棄）
    pub fn push(&mut self, message: ChatMessage) {
        if self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 古い順のイテレーター
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}
