//! 审讯状态层：压力账本、话题分类、证词账本与矛盾裁决

pub mod judge;
pub mod pressure;
pub mod statements;
pub mod topic;

pub use judge::{pair_key, Contradiction, ContradictionJudge, Severity};
pub use pressure::{
    category_of, prompt_modifier_for, PressureCategory, PressureLedger, PressureState,
};
pub use statements::{Statement, StatementLedger};
pub use topic::{classify_topic, Topic};
