//! 社交层：静态知己图与事件涟漪

pub mod propagator;

pub use propagator::{EvidenceRipple, SocialGraph, SocialPropagator};
