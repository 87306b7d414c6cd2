//! 工具参数 Schema 与校验
//!
//! 每个工具用一个 `#[derive(Deserialize, JsonSchema)]` 参数结构体：schemars 生成暴露给模型的 schema，
//! serde 反序列化即参数校验。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 参数结构体的 JSON Schema
pub fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// 按参数结构体解析 args；失败时返回给模型看的诊断文本
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, String> {
    serde_json::from_value(args).map_err(|e| format!("invalid arguments for {tool}: {e}"))
}
