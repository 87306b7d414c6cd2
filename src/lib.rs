//! Alibi - Rust 审讯编排引擎
//!
//! 模块划分：
//! - **agent**: 引擎门面（一局游戏一个实例，串行化同一嫌疑人的回合）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、回合阶段、引擎构建器
//! - **interrogation**: 压力账本、话题分类、证词账本、矛盾裁决
//! - **llm**: 对话模型客户端抽象与实现（OpenAI 兼容 / Mock / Scripted）
//! - **memory**: 对话历史、事实记忆、传闻存储
//! - **profile**: 嫌疑人档案与名单
//! - **react**: 上下文拼装、有界工具循环、内心独白
//! - **social**: 知己图与证据涟漪
//! - **tools**: 嫌疑人可调用的记忆工具与执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod interrogation;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod profile;
pub mod react;
pub mod social;
pub mod tools;

pub use agent::{InterrogationEngine, TurnOutcome};
pub use core::{EngineBuilder, EngineError};
