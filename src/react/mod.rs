//! 回合层：上下文拼装、有界工具循环、内心独白

pub mod context;
pub mod loop_;
pub mod monologue;

pub use context::{build_context, ContextSources};
pub use loop_::{TurnOrchestrator, TurnResult};
pub use monologue::{InternalMonologue, MonologueLog, ThreatLevel};
