//! Mock / 脚本化客户端（用于测试与离线控制台，无需 API）

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{Completion, LlmClient, LlmError, ToolDefinition};
use crate::memory::{Message, Role};

/// Mock 客户端：不调用工具，用一句含糊的台词回应玩家最后一个问题
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        _system: &str,
        _tools: &[ToolDefinition],
        messages: &[Message],
    ) -> Result<Completion, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(silence)");

        Ok(Completion::text(format!(
            "\"{}\"? I'd rather not talk about that right now.",
            last_user
        )))
    }
}

/// 一次调用的记录（供测试断言）
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub tool_names: Vec<String>,
    pub message_count: usize,
}

/// 脚本客户端：按顺序返回预置结果；脚本用完后重复 `fallback`（未设置则返回 Request 错误）
///
/// 会记录每次调用，供测试断言调用次数与是否禁用了工具。
pub struct ScriptedLlmClient {
    script: Mutex<VecDeque<Result<Completion, LlmError>>>,
    fallback: Option<Result<Completion, LlmError>>,
    calls: AtomicUsize,
    recorded: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlmClient {
    pub fn new(script: Vec<Result<Completion, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用都返回同一结果
    pub fn always(result: Result<Completion, LlmError>) -> Self {
        Self::new(Vec::new()).with_fallback(result)
    }

    /// 每次调用都失败
    pub fn always_failing() -> Self {
        Self::always(Err(LlmError::Request("scripted failure".to_string())))
    }

    pub fn with_fallback(mut self, result: Result<Completion, LlmError>) -> Self {
        self.fallback = Some(result);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.recorded.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(
        &self,
        system: &str,
        tools: &[ToolDefinition],
        messages: &[Message],
    ) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut rec) = self.recorded.lock() {
            rec.push(RecordedCall {
                system: system.to_string(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
                message_count: messages.len(),
            });
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(r) => r,
            None => self
                .fallback
                .clone()
                .unwrap_or_else(|| Err(LlmError::Request("script exhausted".to_string()))),
        }
    }
}
