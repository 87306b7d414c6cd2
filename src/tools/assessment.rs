//! internal_assessment：嫌疑人的私下自评
//!
//! 记录一条内心独白，并按威胁程度与是否有罪返回指引；玩家永远看不到这段内容，
//! 它只通过指引影响嫌疑人接下来说出口的话。

use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::react::monologue::{InternalMonologue, ThreatLevel};
use crate::tools::schema::{parse_args, schema_of};
use crate::tools::{Tool, ToolContext};

#[derive(Deserialize, JsonSchema)]
struct AssessmentArgs {
    /// What you are privately thinking right now
    thought: String,
    /// How dangerous your situation feels
    threat_level: ThreatLevel,
    /// How you plan to handle the next answer
    strategy: String,
}

pub struct InternalAssessmentTool;

#[async_trait]
impl Tool for InternalAssessmentTool {
    fn name(&self) -> &str {
        "internal_assessment"
    }

    fn description(&self) -> &str {
        "Privately assess how much danger you are in before answering. Never shown to the detective. \
         Args: {\"thought\": \"...\", \"threat_level\": \"safe|concerning|dangerous|critical\", \"strategy\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<AssessmentArgs>()
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<String, String> {
        let args: AssessmentArgs = parse_args(self.name(), args)?;
        ctx.record_monologue(InternalMonologue {
            suspect_id: ctx.profile.id.clone(),
            thought: args.thought,
            threat_level: args.threat_level,
            strategy: args.strategy,
            timestamp: Utc::now(),
        });
        Ok(args.threat_level.guidance(ctx.profile.is_guilty).to_string())
    }
}
