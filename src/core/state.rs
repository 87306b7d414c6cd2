//! 单个审讯回合的阶段
//!
//! ContextAssembled -> ModelCalled -> {ToolsRequested -> ToolsResolved -> ModelCalled}
//! -> FinalReplyForced（超过轮数上限时）-> Recorded。仅用于日志与观测，不驱动控制流。

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    ContextAssembled,
    ModelCalled,
    ToolsRequested,
    ToolsResolved,
    /// 工具轮数用尽，关闭工具再调用一次强制出文本
    FinalReplyForced,
    Recorded,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::ContextAssembled => "context_assembled",
            TurnPhase::ModelCalled => "model_called",
            TurnPhase::ToolsRequested => "tools_requested",
            TurnPhase::ToolsResolved => "tools_resolved",
            TurnPhase::FinalReplyForced => "final_reply_forced",
            TurnPhase::Recorded => "recorded",
        }
    }
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
