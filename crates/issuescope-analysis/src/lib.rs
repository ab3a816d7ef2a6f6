//! Statistical trend analysis and rule-based narrative synthesis.

pub mod narrative;
pub mod trend;

pub use narrative::RuleBasedSynthesizer;
pub use trend::StatTrendAnalyzer;
