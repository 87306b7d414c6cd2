//! note_important_fact：把本回合得知的重要事实写入记忆（总是成功）

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::memory::{MemoryEntry, MemoryKind};
use crate::tools::schema::{parse_args, schema_of};
use crate::tools::{Tool, ToolContext};

#[derive(Deserialize, JsonSchema)]
struct NoteFactArgs {
    /// The fact to remember
    fact: String,
    /// Topic the fact belongs to
    #[serde(default)]
    topic: Option<String>,
}

pub struct NoteImportantFactTool;

#[async_trait]
impl Tool for NoteImportantFactTool {
    fn name(&self) -> &str {
        "note_important_fact"
    }

    fn description(&self) -> &str {
        "Remember an important fact you learned in this conversation. Args: {\"fact\": \"...\", \"topic\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<NoteFactArgs>()
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<String, String> {
        let args: NoteFactArgs = parse_args(self.name(), args)?;
        let topic = args
            .topic
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "general".to_string());
        ctx.memory.append(MemoryEntry::new(
            ctx.profile.id.clone(),
            MemoryKind::Fact,
            topic.clone(),
            args.fact,
        ));
        ctx.mark_memory_updated();
        Ok(format!("Noted under '{}'.", topic))
    }
}
