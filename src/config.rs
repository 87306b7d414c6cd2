//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ALIBI__*` 覆盖（双下划线表示嵌套，如 `ALIBI__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub interrogation: InterrogationSection,
    pub pressure: PressureSection,
}

/// [app] 段：应用名与嫌疑人名单文件
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 未设置时依次查找 config/cast.toml、../config/cast.toml
    pub cast_path: Option<PathBuf>,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

/// [interrogation] 段：工具循环、历史窗口、证词账本与回合超时
#[derive(Debug, Clone, Deserialize)]
pub struct InterrogationSection {
    /// 工具解析轮数上限，超过后关闭工具强制出文本
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// 对话历史保留轮数（每轮含玩家提问 + 嫌疑人回答）
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    #[serde(default = "default_statement_capacity")]
    pub statement_capacity: usize,
    /// 每条新证词最多送去裁决的候选对数
    #[serde(default = "default_max_judged_pairs")]
    pub max_judged_pairs: usize,
    #[serde(default = "default_monologue_history")]
    pub monologue_history: usize,
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for InterrogationSection {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            history_turns: default_history_turns(),
            statement_capacity: default_statement_capacity(),
            max_judged_pairs: default_max_judged_pairs(),
            monologue_history: default_monologue_history(),
            turn_timeout_secs: default_turn_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

fn default_max_tool_rounds() -> usize {
    3
}

fn default_history_turns() -> usize {
    20
}

fn default_statement_capacity() -> usize {
    100
}

fn default_max_judged_pairs() -> usize {
    5
}

fn default_monologue_history() -> usize {
    10
}

fn default_turn_timeout_secs() -> u64 {
    90
}

fn default_tool_timeout_secs() -> u64 {
    10
}

pub(crate) fn default_fallback_reply() -> String {
    "*looks away* I... I need a moment to collect my thoughts.".to_string()
}

/// [pressure] 段：压力增量与衰减速率
#[derive(Debug, Clone, Deserialize)]
pub struct PressureSection {
    /// 每分钟线性衰减点数
    #[serde(default = "default_decay_per_minute")]
    pub decay_per_minute: f64,
    #[serde(default = "default_direct_accusation_delta")]
    pub direct_accusation_delta: f64,
    #[serde(default = "default_base_delta")]
    pub base_delta: f64,
    #[serde(default = "default_evidence_delta")]
    pub evidence_delta: f64,
    #[serde(default = "default_contradiction_delta")]
    pub contradiction_delta: f64,
}

impl Default for PressureSection {
    fn default() -> Self {
        Self {
            decay_per_minute: default_decay_per_minute(),
            direct_accusation_delta: default_direct_accusation_delta(),
            base_delta: default_base_delta(),
            evidence_delta: default_evidence_delta(),
            contradiction_delta: default_contradiction_delta(),
        }
    }
}

fn default_decay_per_minute() -> f64 {
    0.5
}

fn default_direct_accusation_delta() -> f64 {
    25.0
}

fn default_base_delta() -> f64 {
    5.0
}

fn default_evidence_delta() -> f64 {
    15.0
}

fn default_contradiction_delta() -> f64 {
    20.0
}

/// 从 config 目录加载配置，环境变量 ALIBI__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ALIBI__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ALIBI")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    let mut cfg: AppConfig = c.try_deserialize()?;
    if cfg.interrogation.fallback_reply.trim().is_empty() {
        tracing::warn!("interrogation.fallback_reply is empty, using the default line");
        cfg.interrogation.fallback_reply = default_fallback_reply();
    }
    Ok(cfg)
}
