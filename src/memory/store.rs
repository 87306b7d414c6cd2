//! 长期记忆：按嫌疑人隔离的事实与问答记录
//!
//! 引擎只依赖 MemoryStore 的窄接口（append / query / summarize）；当前实现为 InMemoryStore
//! （关键词重叠检索），生产部署可换成数据库实现。

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 记忆条目类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// 嫌疑人通过 note_important_fact 主动记下的事实
    Fact,
    /// 已完成的一轮问答
    Exchange,
}

#[derive(Clone, Debug, Serialize)]
pub struct MemoryEntry {
    pub suspect_id: String,
    pub kind: MemoryKind,
    pub topic: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(
        suspect_id: impl Into<String>,
        kind: MemoryKind,
        topic: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            suspect_id: suspect_id.into(),
            kind,
            topic: topic.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// 记忆存储 trait：写入、按话题检索、生成摘要
pub trait MemoryStore: Send + Sync {
    fn append(&self, entry: MemoryEntry);

    /// 检索该嫌疑人与 topic 最相关的最多 k 条
    fn query(&self, suspect_id: &str, topic: &str, k: usize) -> Vec<MemoryEntry>;

    /// 供上下文拼装使用的简短摘要；无记忆时返回空串
    fn summarize(&self, suspect_id: &str) -> String;

    fn clear(&self);
}

/// 将文本切分为小写词集合，用于简单相似度（词重叠数）
pub(crate) fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 2)
        .collect()
}

/// 内存实现：每个嫌疑人最多保留 max_entries_per_suspect 条，超出丢弃最旧的
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Vec<MemoryEntry>>>,
    max_entries_per_suspect: usize,
    summary_entries: usize,
}

impl InMemoryStore {
    pub fn new(max_entries_per_suspect: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries_per_suspect: max_entries_per_suspect.max(1),
            summary_entries: 5,
        }
    }

    fn score(query_tokens: &HashSet<String>, topic: &str, entry: &MemoryEntry) -> usize {
        let exact = usize::from(entry.topic.eq_ignore_ascii_case(topic.trim())) * 3;
        let mut doc_tokens = tokenize_lower(&entry.content);
        doc_tokens.extend(tokenize_lower(&entry.topic));
        exact + query_tokens.intersection(&doc_tokens).count()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(200)
    }
}

impl MemoryStore for InMemoryStore {
    fn append(&self, entry: MemoryEntry) {
        if entry.content.trim().is_empty() {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let list = entries.entry(entry.suspect_id.clone()).or_default();
        list.push(entry);
        let n = list.len();
        if n > self.max_entries_per_suspect {
            list.drain(0..n - self.max_entries_per_suspect);
        }
    }

    fn query(&self, suspect_id: &str, topic: &str, k: usize) -> Vec<MemoryEntry> {
        let query_tokens = tokenize_lower(topic);
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let Some(list) = entries.get(suspect_id) else {
            return Vec::new();
        };
        let mut scored: Vec<(usize, &MemoryEntry)> = list
            .iter()
            .map(|e| (Self::score(&query_tokens, topic, e), e))
            .filter(|(s, _)| *s > 0)
            .collect();
        // 同分时新的在前
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.timestamp.cmp(&a.1.timestamp)));
        scored.into_iter().take(k).map(|(_, e)| e.clone()).collect()
    }

    fn summarize(&self, suspect_id: &str) -> String {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let Some(list) = entries.get(suspect_id) else {
            return String::new();
        };
        let facts: Vec<&MemoryEntry> = list
            .iter()
            .rev()
            .filter(|e| e.kind == MemoryKind::Fact)
            .take(self.summary_entries)
            .collect();
        let exchanges = list.iter().filter(|e| e.kind == MemoryKind::Exchange).count();
        if facts.is_empty() && exchanges == 0 {
            return String::new();
        }
        let mut s = String::new();
        if exchanges > 0 {
            s.push_str(&format!(
                "You have already answered {} question(s) from the detective.\n",
                exchanges
            ));
        }
        for f in facts.iter().rev() {
            s.push_str(&format!("- [{}] {}\n", f.topic, f.content));
        }
        s
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
