//! Analyzer module - smell rule engine

pub mod engine;
pub mod rules;

pub use engine::{AnalysisEngine, FileReport};
pub use rules::{RuleContext, SmellRule};
