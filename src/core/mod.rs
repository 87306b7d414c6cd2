//! 核心层：错误类型、回合阶段与引擎构建器

pub mod builder;
pub mod error;
pub mod state;

pub use builder::{create_engine_builder, resolve_cast_path, EngineBuilder};
pub use error::EngineError;
pub use state::TurnPhase;
