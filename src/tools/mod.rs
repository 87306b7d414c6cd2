//! 工具箱：嫌疑人回答前可调用的记忆工具与执行器

pub mod assessment;
pub mod executor;
pub mod note_fact;
pub mod previous_statement;
pub mod recall;
pub mod registry;
pub mod schema;

pub use assessment::InternalAssessmentTool;
pub use executor::ToolExecutor;
pub use note_fact::NoteImportantFactTool;
pub use previous_statement::CheckPreviousStatementTool;
pub use recall::RecallMemoryTool;
pub use registry::{Tool, ToolContext, ToolRegistry};

/// 嫌疑人的标准工具集
pub fn suspect_tool_registry() -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(RecallMemoryTool);
    tools.register(CheckPreviousStatementTool);
    tools.register(NoteImportantFactTool);
    tools.register(InternalAssessmentTool);
    tools
}
