//! LLM 层：客户端抽象、JSON 工具调用协议与实现（OpenAI 兼容 / Mock / Scripted）

pub mod mock;
pub mod openai;
pub mod protocol;
pub mod traits;

use std::sync::Arc;

pub use mock::{MockLlmClient, RecordedCall, ScriptedLlmClient};
pub use openai::OpenAiClient;
pub use protocol::{parse_llm_output, ParsedOutput};
pub use traits::{Completion, LlmClient, LlmError, StopReason, ToolCall, ToolDefinition};

use crate::config::AppConfig;

/// 根据配置与环境变量选择后端：provider=openai 且有 OPENAI_API_KEY 时走 OpenAI 兼容端点，否则用 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let api_key = std::env::var("OPENAI_API_KEY").ok();

    match (provider.as_str(), api_key) {
        ("openai", Some(key)) => {
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
            Arc::new(
                OpenAiClient::new(cfg.llm.base_url.as_deref(), &cfg.llm.model, Some(&key))
                    .with_request_timeout(cfg.llm.timeouts.request),
            )
        }
        _ => {
            tracing::warn!("No API key set or provider is mock, using Mock LLM");
            Arc::new(MockLlmClient)
        }
    }
}
