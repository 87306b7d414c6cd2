//! 记忆层：对话历史（短期）、事实与问答（长期）、传闻

pub mod conversation;
pub mod gossip;
pub mod store;

pub use conversation::{history_window, ConversationMemory, Message, Role};
pub use gossip::{summarize_entries, GossipEntry, GossipEvent, GossipStore, InMemoryGossipStore};
pub use store::{InMemoryStore, MemoryEntry, MemoryKind, MemoryStore};
