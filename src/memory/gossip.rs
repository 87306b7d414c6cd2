//! 传闻存储：嫌疑人从知己处听来的二手消息
//!
//! can_reference=false 的条目只能影响情绪（紧张、好奇），不能被当作确知的事实说出口。

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 传闻来源事件
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GossipEvent {
    EvidenceShown,
    Accusation,
}

#[derive(Clone, Debug, Serialize)]
pub struct GossipEntry {
    /// 传闻涉及的嫌疑人（被出示证据 / 被指控的人）
    pub about_suspect: String,
    pub recipient: String,
    pub event: GossipEvent,
    pub summary: String,
    pub can_reference: bool,
    pub timestamp: DateTime<Utc>,
}

/// 传闻存储 trait
pub trait GossipStore: Send + Sync {
    fn enqueue(&self, entry: GossipEntry);

    fn for_recipient(&self, recipient: &str) -> Vec<GossipEntry>;

    /// 拼入上下文的摘要；无传闻时返回空串
    fn summarize(&self, recipient: &str) -> String {
        summarize_entries(&self.for_recipient(recipient))
    }

    fn clear(&self);
}

/// 最近 5 条传闻，逐条标注能否当作事实引用
pub fn summarize_entries(entries: &[GossipEntry]) -> String {
    let mut s = String::new();
    for e in entries.iter().rev().take(5).rev() {
        let marker = if e.can_reference {
            "known"
        } else {
            "rumor, do not state as fact"
        };
        s.push_str(&format!("- ({}) {}\n", marker, e.summary));
    }
    s
}

/// 内存实现：按接收者分桶，每桶最多 max_per_recipient 条
pub struct InMemoryGossipStore {
    entries: RwLock<HashMap<String, Vec<GossipEntry>>>,
    max_per_recipient: usize,
}

impl InMemoryGossipStore {
    pub fn new(max_per_recipient: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_per_recipient: max_per_recipient.max(1),
        }
    }
}

impl Default for InMemoryGossipStore {
    fn default() -> Self {
        Self::new(50)
    }
}

impl GossipStore for InMemoryGossipStore {
    fn enqueue(&self, entry: GossipEntry) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let list = entries.entry(entry.recipient.clone()).or_default();
        list.push(entry);
        let n = list.len();
        if n > self.max_per_recipient {
            list.drain(0..n - self.max_per_recipient);
        }
    }

    fn for_recipient(&self, recipient: &str) -> Vec<GossipEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(recipient)
            .cloned()
            .unwrap_or_default()
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
