//! recall_memory：回忆与某话题相关的记忆

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::schema::{parse_args, schema_of};
use crate::tools::{Tool, ToolContext};

const MAX_RECALLED: usize = 5;

#[derive(Deserialize, JsonSchema)]
struct RecallArgs {
    /// Topic to recall, e.g. "the library" or "last night"
    topic: String,
}

pub struct RecallMemoryTool;

#[async_trait]
impl Tool for RecallMemoryTool {
    fn name(&self) -> &str {
        "recall_memory"
    }

    fn description(&self) -> &str {
        "Search your own memory for facts and past conversation about a topic. Args: {\"topic\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<RecallArgs>()
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<String, String> {
        let args: RecallArgs = parse_args(self.name(), args)?;
        let hits = ctx.memory.query(&ctx.profile.id, &args.topic, MAX_RECALLED);
        if hits.is_empty() {
            return Ok(format!(
                "Nothing found in your memory about '{}'.",
                args.topic
            ));
        }
        let mut out = format!("You remember the following about '{}':\n", args.topic);
        for h in hits {
            out.push_str(&format!("- [{}] {}\n", h.topic, h.content));
        }
        Ok(out)
    }
}
