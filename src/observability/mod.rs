//! 可观测性：日志订阅器与回合 span

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认 info，可通过 RUST_LOG 覆盖（如 `RUST_LOG=alibi=debug`）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

/// 单个审讯回合的 span：回合内的模型调用、工具审计与入账日志都挂在它下面
pub fn turn_span(suspect_id: &str) -> tracing::Span {
    tracing::info_span!("turn", suspect = suspect_id, turn_id = %uuid::Uuid::new_v4())
}
