//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找；
//! ToolContext 携带本回合的嫌疑人档案、记忆存储与工作状态。

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::ToolDefinition;
use crate::memory::MemoryStore;
use crate::profile::SuspectProfile;
use crate::react::monologue::{InternalMonologue, MonologueLog};

/// 单个回合内工具共享的上下文：档案、外部记忆、独白日志，以及本回合的工作状态
pub struct ToolContext {
    pub profile: Arc<SuspectProfile>,
    pub memory: Arc<dyn MemoryStore>,
    pub monologues: Arc<MonologueLog>,
    memory_updated: AtomicBool,
    latest_monologue: Mutex<Option<InternalMonologue>>,
}

impl ToolContext {
    pub fn new(
        profile: Arc<SuspectProfile>,
        memory: Arc<dyn MemoryStore>,
        monologues: Arc<MonologueLog>,
    ) -> Self {
        Self {
            profile,
            memory,
            monologues,
            memory_updated: AtomicBool::new(false),
            latest_monologue: Mutex::new(None),
        }
    }

    pub fn mark_memory_updated(&self) {
        self.memory_updated.store(true, Ordering::SeqCst);
    }

    pub fn memory_updated(&self) -> bool {
        self.memory_updated.load(Ordering::SeqCst)
    }

    /// 记录一条独白：写入有界历史，同时记住为本回合最新的一条
    pub fn record_monologue(&self, entry: InternalMonologue) {
        self.monologues.record(entry.clone());
        *self
            .latest_monologue
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(entry);
    }

    /// 本回合记录的最后一条独白（没有则为 None）
    pub fn latest_monologue(&self) -> Option<InternalMonologue> {
        self.latest_monologue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// 工具 trait：名称、描述（供模型理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 参数不合法时返回 Err（诊断文本会原样交还给模型）
    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<String, String>;
}

/// 工具注册表：按名称有序存储，保证暴露给模型的工具顺序稳定
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|(name, tool)| ToolDefinition {
                name: name.clone(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }
}
