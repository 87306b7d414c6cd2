//! 回合编排：上下文 -> 模型 -> (工具 -> 观察 -> 模型)* -> 文本回复
//!
//! 工具轮数有上限；用尽后再关闭工具调用一次，强制模型给出纯文本。模型失败或给出空文本时
//! 返回角色内的兜底台词，回合本身不会因此报错。取消令牌在每次调用模型前检查。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::{EngineError, TurnPhase};
use crate::llm::{parse_llm_output, LlmClient, ParsedOutput, ToolCall, ToolDefinition};
use crate::memory::{history_window, MemoryStore, Message};
use crate::profile::SuspectProfile;
use crate::react::monologue::{InternalMonologue, MonologueLog};
use crate::tools::{ToolContext, ToolExecutor};

/// Observation 写回对话时的最大字符数
const OBSERVATION_MAX_CHARS: usize = 2000;

/// 一个回合的结果
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub message: String,
    pub tools_used: Vec<String>,
    pub memory_updated: bool,
    pub internal_monologue: Option<InternalMonologue>,
    /// 回复是否为兜底台词（模型失败 / 空文本 / 超时）
    pub fallback: bool,
}

impl TurnResult {
    pub fn fallback(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tools_used: Vec::new(),
            memory_updated: false,
            internal_monologue: None,
            fallback: true,
        }
    }
}

pub struct TurnOrchestrator {
    llm: Arc<dyn LlmClient>,
    executor: Arc<ToolExecutor>,
    memory: Arc<dyn MemoryStore>,
    monologues: Arc<MonologueLog>,
    max_tool_rounds: usize,
    history_turns: usize,
    fallback_reply: String,
}

impl TurnOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor: Arc<ToolExecutor>,
        memory: Arc<dyn MemoryStore>,
        monologues: Arc<MonologueLog>,
    ) -> Self {
        Self {
            llm,
            executor,
            memory,
            monologues,
            max_tool_rounds: 3,
            history_turns: 20,
            fallback_reply: crate::config::default_fallback_reply(),
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    /// 空白台词会被忽略，保持默认兜底
    pub fn with_fallback_reply(mut self, reply: impl Into<String>) -> Self {
        let reply = reply.into();
        if reply.trim().is_empty() {
            tracing::warn!("empty fallback reply ignored, keeping default");
        } else {
            self.fallback_reply = reply;
        }
        self
    }

    pub fn fallback_reply(&self) -> &str {
        &self.fallback_reply
    }

    /// 执行一个回合。只有取消会返回 Err；其余失败都降级为兜底台词。
    pub async fn run_turn(
        &self,
        profile: Arc<SuspectProfile>,
        player_message: &str,
        history: &[Message],
        system_context: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnResult, EngineError> {
        let suspect = profile.id.clone();
        let mut messages: Vec<Message> = history_window(history, self.history_turns).to_vec();
        messages.push(Message::user(player_message));
        tracing::debug!(suspect = %suspect, phase = %TurnPhase::ContextAssembled, history = messages.len() - 1);

        let ctx = ToolContext::new(profile, self.memory.clone(), self.monologues.clone());
        let definitions = self.executor.definitions();
        let no_tools: &[ToolDefinition] = &[];
        let mut rounds = 0usize;
        let mut tools_used = Vec::new();

        loop {
            if cancel.is_cancelled() {
                tracing::info!(suspect = %suspect, rounds, "turn cancelled");
                return Err(EngineError::Cancelled);
            }

            let tools = if rounds < self.max_tool_rounds {
                definitions.as_slice()
            } else {
                tracing::debug!(suspect = %suspect, phase = %TurnPhase::FinalReplyForced, rounds);
                no_tools
            };

            let completion = match self.llm.complete(system_context, tools, &messages).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(suspect = %suspect, error = %e, rounds, "model call failed, using fallback reply");
                    return Ok(self.finish(&ctx, self.fallback_reply.clone(), tools_used, true));
                }
            };
            tracing::debug!(suspect = %suspect, phase = %TurnPhase::ModelCalled, stop = ?completion.stop_reason);

            if completion.requests_tools() && rounds < self.max_tool_rounds {
                rounds += 1;
                tracing::debug!(
                    suspect = %suspect,
                    phase = %TurnPhase::ToolsRequested,
                    round = rounds,
                    calls = completion.tool_calls.len()
                );
                messages.push(Message::assistant(tool_calls_json(&completion.tool_calls)));
                for call in &completion.tool_calls {
                    let observation = self.observe(&ctx, call).await;
                    tools_used.push(call.tool.clone());
                    messages.push(Message::user(format!(
                        "Observation from {}: {}",
                        call.tool,
                        truncate_chars(&observation, OBSERVATION_MAX_CHARS)
                    )));
                }
                tracing::debug!(suspect = %suspect, phase = %TurnPhase::ToolsResolved, round = rounds);
                continue;
            }

            let text = completion.content.trim();
            if text.is_empty() {
                tracing::warn!(suspect = %suspect, rounds, "model gave no text, using fallback reply");
                return Ok(self.finish(&ctx, self.fallback_reply.clone(), tools_used, true));
            }
            if tools.is_empty() && is_tool_request(text) {
                tracing::warn!(suspect = %suspect, rounds, "model requested tools after they were disabled, using fallback reply");
                return Ok(self.finish(&ctx, self.fallback_reply.clone(), tools_used, true));
            }
            return Ok(self.finish(&ctx, text.to_string(), tools_used, false));
        }
    }

    /// 执行单个工具调用，失败转为交还给模型的诊断文本
    async fn observe(&self, ctx: &ToolContext, call: &ToolCall) -> String {
        match self.executor.execute(ctx, &call.tool, call.args.clone()).await {
            Ok(out) => out,
            Err(EngineError::HallucinatedTool(name)) => format!(
                "Error: unknown tool '{}'. Available tools: {}",
                name,
                self.executor.tool_names().join(", ")
            ),
            Err(e) => format!("Error: {}", e),
        }
    }

    fn finish(
        &self,
        ctx: &ToolContext,
        message: String,
        tools_used: Vec<String>,
        fallback: bool,
    ) -> TurnResult {
        TurnResult {
            message,
            tools_used,
            memory_updated: ctx.memory_updated(),
            internal_monologue: ctx.latest_monologue(),
            fallback,
        }
    }
}

/// 工具关闭后的文本仍是工具调用（或以 `{` / `[` 开头的残缺 JSON），不能当台词说出口
fn is_tool_request(text: &str) -> bool {
    match parse_llm_output(text) {
        Ok(ParsedOutput::ToolCalls(_)) => true,
        Ok(ParsedOutput::Response(_)) => false,
        Err(_) => true,
    }
}

fn tool_calls_json(calls: &[ToolCall]) -> String {
    let value = match calls {
        [single] => serde_json::to_value(single),
        many => serde_json::to_value(many),
    };
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::{Completion, ScriptedLlmClient};
    use crate::memory::InMemoryStore;
    use crate::react::monologue::ThreatLevel;
    use crate::tools::suspect_tool_registry;

    fn profile() -> Arc<SuspectProfile> {
        Arc::new(SuspectProfile {
            id: "maid".to_string(),
            name: "Alice".to_string(),
            role: "maid".to_string(),
            personality: "nervous".to_string(),
            speech_pattern: String::new(),
            secrets: vec![],
            alibi: "Cleaning the library".to_string(),
            relationships: vec![],
            knowledge: vec![],
            is_guilty: false,
            lies: vec![],
            confidants: vec![],
        })
    }

    fn orchestrator(llm: Arc<dyn LlmClient>) -> TurnOrchestrator {
        TurnOrchestrator::new(
            llm,
            Arc::new(ToolExecutor::new(suspect_tool_registry(), 5)),
            Arc::new(InMemoryStore::default()),
            Arc::new(MonologueLog::default()),
        )
    }

    fn recall_call() -> Completion {
        Completion::tools(vec![ToolCall {
            tool: "recall_memory".to_string(),
            args: json!({"topic": "library"}),
        }])
    }

    #[tokio::test]
    async fn test_tool_rounds_are_bounded_and_final_call_disables_tools() {
        let llm = Arc::new(ScriptedLlmClient::always(Ok(recall_call())));
        let orch = orchestrator(llm.clone());
        let result = orch
            .run_turn(profile(), "Where were you?", &[], "system", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(llm.call_count(), 4);
        let calls = llm.recorded();
        assert!(calls[..3].iter().all(|c| !c.tool_names.is_empty()));
        assert!(calls[3].tool_names.is_empty());
        assert!(!result.message.is_empty());
        assert!(result.fallback);
        assert_eq!(result.tools_used.len(), 3);
    }

    #[tokio::test]
    async fn test_tool_json_on_forced_call_is_never_spoken() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok(recall_call()),
            Ok(recall_call()),
            Ok(recall_call()),
            Ok(Completion::text(r#"{"tool": "recall_memory", "args": {"topic": "x"}}"#)),
        ]));
        let result = orchestrator(llm.clone())
            .run_turn(profile(), "Where were you?", &[], "system", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(llm.call_count(), 4);
        assert!(result.fallback);
        assert_eq!(result.message, crate::config::default_fallback_reply());
    }

    #[tokio::test]
    async fn test_broken_json_on_forced_call_uses_fallback() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok(recall_call()),
            Ok(recall_call()),
            Ok(recall_call()),
            Ok(Completion::text(r#"[{"tool": "recall_memory""#)),
        ]));
        let result = orchestrator(llm)
            .run_turn(profile(), "Where were you?", &[], "system", &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.fallback);
    }

    #[tokio::test]
    async fn test_plain_text_on_forced_call_is_kept() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok(recall_call()),
            Ok(recall_call()),
            Ok(recall_call()),
            Ok(Completion::text("I was in the library, {ahem} as I said.")),
        ]));
        let result = orchestrator(llm)
            .run_turn(profile(), "Where were you?", &[], "system", &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.fallback);
        assert_eq!(result.message, "I was in the library, {ahem} as I said.");
    }

    #[test]
    fn test_blank_fallback_reply_keeps_default() {
        let orch = orchestrator(Arc::new(ScriptedLlmClient::always_failing()))
            .with_fallback_reply("   ");
        assert_eq!(orch.fallback_reply(), crate::config::default_fallback_reply());
    }

    #[tokio::test]
    async fn test_model_failure_yields_fallback_reply() {
        let llm = Arc::new(ScriptedLlmClient::always_failing());
        let result = orchestrator(llm)
            .run_turn(profile(), "Where were you?", &[], "system", &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.fallback);
        assert_eq!(result.message, crate::config::default_fallback_reply());
    }

    #[tokio::test]
    async fn test_tool_then_text_attaches_monologue() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok(Completion::tools(vec![ToolCall {
                tool: "internal_assessment".to_string(),
                args: json!({"thought": "He suspects me", "threat_level": "concerning", "strategy": "stay calm"}),
            }])),
            Ok(Completion::text("I was dusting the shelves, sir.")),
        ]));
        let result = orchestrator(llm.clone())
            .run_turn(profile(), "Where were you?", &[], "system", &CancellationToken::new())
            .await
            .unwrap();

        assert!(!result.fallback);
        assert_eq!(result.message, "I was dusting the shelves, sir.");
        assert_eq!(result.tools_used, vec!["internal_assessment".to_string()]);
        let m = result.internal_monologue.unwrap();
        assert_eq!(m.threat_level, ThreatLevel::Concerning);
        // 第二次调用看到：用户问题 + 工具请求 + 观察
        assert_eq!(llm.recorded()[1].message_count, 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_back_to_model() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok(Completion::tools(vec![ToolCall {
                tool: "read_diary".to_string(),
                args: json!({}),
            }])),
            Ok(Completion::text("Nothing to hide.")),
        ]));
        let result = orchestrator(llm)
            .run_turn(profile(), "Hello", &[], "system", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.message, "Nothing to hide.");
        assert_eq!(result.tools_used, vec!["read_diary".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_call() {
        let llm = Arc::new(ScriptedLlmClient::always(Ok(Completion::text("hi"))));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = orchestrator(llm.clone())
            .run_turn(profile(), "Hello", &[], "system", &cancel)
            .await;
        assert!(matches!(result, Err(EngineError::Cancelled)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_history_is_windowed() {
        let llm = Arc::new(ScriptedLlmClient::always(Ok(Completion::text("Yes."))));
        let mut history = Vec::new();
        for i in 0..30 {
            history.push(Message::user(format!("q{i}")));
            history.push(Message::assistant(format!("a{i}")));
        }
        orchestrator(llm.clone())
            .with_history_turns(5)
            .run_turn(profile(), "Hello", &history, "system", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(llm.recorded()[0].message_count, 11);
    }
}
