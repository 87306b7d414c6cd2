//! 引擎构建器：统一的审讯引擎初始化逻辑
//!
//! 控制台、测试与外部前端都通过 EngineBuilder 组装同一套账本、工具与编排器，
//! 模型客户端与记忆 / 传闻存储可以替换为外部实现。

use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::InterrogationEngine;
use crate::config::AppConfig;
use crate::core::EngineError;
use crate::interrogation::{ContradictionJudge, PressureLedger, StatementLedger};
use crate::llm::LlmClient;
use crate::memory::{GossipStore, InMemoryGossipStore, InMemoryStore, MemoryStore};
use crate::profile::Cast;
use crate::react::{MonologueLog, TurnOrchestrator};
use crate::social::{SocialGraph, SocialPropagator};
use crate::tools::{suspect_tool_registry, ToolExecutor};

pub struct EngineBuilder {
    cast: Cast,
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    memory: Option<Arc<dyn MemoryStore>>,
    gossip: Option<Arc<dyn GossipStore>>,
}

impl EngineBuilder {
    pub fn new(cast: Cast) -> Self {
        Self {
            cast,
            config: AppConfig::default(),
            llm: None,
            memory: None,
            gossip: None,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// 未设置时按配置创建（有 OPENAI_API_KEY 走 OpenAI 兼容端点，否则 Mock）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_memory_store(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(store);
        self
    }

    pub fn with_gossip_store(mut self, store: Arc<dyn GossipStore>) -> Self {
        self.gossip = Some(store);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn build(self) -> InterrogationEngine {
        let cfg = &self.config.interrogation;
        let llm = self
            .llm
            .unwrap_or_else(|| crate::llm::create_llm_from_config(&self.config));
        let memory = self
            .memory
            .unwrap_or_else(|| Arc::new(InMemoryStore::default()) as Arc<dyn MemoryStore>);
        let gossip = self
            .gossip
            .unwrap_or_else(|| Arc::new(InMemoryGossipStore::default()) as Arc<dyn GossipStore>);

        let monologues = Arc::new(MonologueLog::new(cfg.monologue_history));
        let executor = Arc::new(ToolExecutor::new(
            suspect_tool_registry(),
            cfg.tool_timeout_secs,
        ));
        let orchestrator = TurnOrchestrator::new(
            llm.clone(),
            executor,
            memory.clone(),
            monologues.clone(),
        )
        .with_max_tool_rounds(cfg.max_tool_rounds)
        .with_history_turns(cfg.history_turns)
        .with_fallback_reply(cfg.fallback_reply.clone());

        let statements = Arc::new(StatementLedger::new(cfg.statement_capacity));
        let judge = Arc::new(ContradictionJudge::new(
            llm,
            statements,
            cfg.max_judged_pairs,
        ));
        let pressure = Arc::new(PressureLedger::new(self.config.pressure.clone()));
        let social = Arc::new(SocialPropagator::new(
            SocialGraph::from_cast(&self.cast),
            gossip.clone(),
        ));

        tracing::info!(
            suspects = self.cast.len(),
            title = self.cast.title.as_deref().unwrap_or("untitled"),
            "interrogation engine built"
        );

        InterrogationEngine::from_parts(
            Arc::new(self.cast),
            self.config,
            pressure,
            judge,
            social,
            memory,
            gossip,
            monologues,
            orchestrator,
        )
    }
}

/// 嫌疑人名单文件：配置中的 cast_path 优先，否则依次查找 config/cast.toml、../config/cast.toml
pub fn resolve_cast_path(config: &AppConfig) -> Option<PathBuf> {
    if let Some(p) = &config.app.cast_path {
        return Some(p.clone());
    }
    ["config/cast.toml", "../config/cast.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// 便捷函数：加载配置与名单，返回构建器
pub fn create_engine_builder(config_path: Option<PathBuf>) -> Result<EngineBuilder, EngineError> {
    let config = crate::config::load_config(config_path)?;
    let cast_path = resolve_cast_path(&config)
        .ok_or_else(|| EngineError::CastLoad("no cast file found (set app.cast_path)".to_string()))?;
    let cast = Cast::load(&cast_path)?;
    tracing::info!(path = %cast_path.display(), suspects = cast.len(), "cast loaded");
    Ok(EngineBuilder::new(cast).with_config(config))
}
