//! JSON 工具调用协议
//!
//! 不依赖后端原生 function calling：把工具 schema 拼进 system prompt，
//! 模型需要查资料时只输出 {"tool": "...", "args": {...}}（或其数组），否则直接输出台词。

use crate::llm::{LlmError, ToolCall, ToolDefinition};

/// 模型输出解析结果
#[derive(Debug, Clone)]
pub enum ParsedOutput {
    /// 直接回复玩家
    Response(String),
    /// 需要先执行工具
    ToolCalls(Vec<ToolCall>),
}

/// 解析模型输出：含合法 JSON 工具调用则为 ToolCalls，不含 JSON 则为 Response
///
/// 以 `{` / `[` 开头却解析失败的视为格式错误；台词中间夹带花括号的按普通文本处理。
pub fn parse_llm_output(output: &str) -> Result<ParsedOutput, LlmError> {
    let trimmed = output.trim();

    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```")
            .map(|end| rest[..end].trim())
            .unwrap_or(rest.trim())
    } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
        trimmed
    } else {
        return Ok(ParsedOutput::Response(trimmed.to_string()));
    };

    let calls: Vec<ToolCall> = if json_str.starts_with('[') {
        serde_json::from_str::<Vec<ToolCall>>(json_str)
    } else {
        serde_json::from_str::<ToolCall>(json_str).map(|c| vec![c])
    }
    .map_err(|e| LlmError::Malformed(format!("{}: {}", e, json_str)))?;

    let calls: Vec<ToolCall> = calls.into_iter().filter(|c| !c.tool.is_empty()).collect();
    if calls.is_empty() {
        Ok(ParsedOutput::Response(trimmed.to_string()))
    } else {
        Ok(ParsedOutput::ToolCalls(calls))
    }
}

/// 生成 system prompt 中的工具段落；tools 为空时返回禁止调用工具的说明
pub fn tools_prompt_section(tools: &[ToolDefinition]) -> String {
    if tools.is_empty() {
        return "## Tools\nTools are disabled for this reply. Answer in plain text only.\n"
            .to_string();
    }
    let schema = serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string());
    format!(
        "## Tools\nBefore answering you may consult your memory. To call tools, output ONLY a JSON \
         object {{\"tool\": \"name\", \"args\": {{...}}}} or a JSON array of such objects, with no \
         other text. When you are ready to answer, output only your spoken reply.\n\
         Available tools:\n{}\n",
        schema
    )
}
