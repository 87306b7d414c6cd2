//! 引擎错误类型
//!
//! 工具循环与矛盾裁决内部的失败都会被降级为文本或日志；只有内容编写错误（如未知嫌疑人 id）
//! 与配置错误会以 EngineError 返回给调用方。

use thiserror::Error;

/// 审讯引擎运行中可能出现的错误
#[derive(Error, Debug)]
pub enum EngineError {
    /// 名单中没有该嫌疑人：内容编写错误，直接上抛
    #[error("Unknown suspect: {0}")]
    UnknownSuspect(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    /// 模型调用了不存在的工具
    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Cast load error: {0}")]
    CastLoad(String),

    #[error("Turn cancelled")]
    Cancelled,
}
