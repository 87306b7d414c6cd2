//! check_previous_statement：说话前核对自己之前的口径（编好的谎言 + 相关的旧问答）

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::memory::MemoryKind;
use crate::tools::schema::{parse_args, schema_of};
use crate::tools::{Tool, ToolContext};

const MAX_EXCHANGES: usize = 3;

#[derive(Deserialize, JsonSchema)]
struct PreviousStatementArgs {
    /// Topic to check, e.g. "whereabouts" or "the argument at dinner"
    topic: String,
}

pub struct CheckPreviousStatementTool;

#[async_trait]
impl Tool for CheckPreviousStatementTool {
    fn name(&self) -> &str {
        "check_previous_statement"
    }

    fn description(&self) -> &str {
        "Check what you have already claimed about a topic so you stay consistent. Args: {\"topic\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<PreviousStatementArgs>()
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<String, String> {
        let args: PreviousStatementArgs = parse_args(self.name(), args)?;
        let lies = ctx.profile.lies_about(&args.topic);
        let exchanges: Vec<_> = ctx
            .memory
            .query(&ctx.profile.id, &args.topic, MAX_EXCHANGES * 3)
            .into_iter()
            .filter(|e| e.kind == MemoryKind::Exchange)
            .take(MAX_EXCHANGES)
            .collect();

        if lies.is_empty() && exchanges.is_empty() {
            return Ok(format!(
                "You have not said anything about '{}' yet. Whatever you say now becomes your story.",
                args.topic
            ));
        }

        let mut out = String::new();
        if !lies.is_empty() {
            out.push_str("Your established story (keep to it exactly):\n");
            for l in lies {
                out.push_str(&format!("- [{}] {}\n", l.topic, l.claim));
            }
        }
        if !exchanges.is_empty() {
            out.push_str("What you told the detective earlier:\n");
            for e in exchanges {
                out.push_str(&format!("- {}\n", e.content));
            }
        }
        Ok(out)
    }
}
