//! Suggestion and analysis engine: ranked history lookups, rule-based
//! output analysis, and risk tiering.

mod analyze;
mod context;
mod risk;
mod suggest;

pub use analyze::{analyze, explain, suggest_next};
pub use context::derive_context;
pub use risk::assess_risk;
pub use suggest::{RankedCommand, Suggestions};
