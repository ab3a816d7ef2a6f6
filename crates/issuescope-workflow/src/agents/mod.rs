//! The four interchangeable stage agents.

mod analysis;
mod insight;
pub(crate) mod report;
mod retrieval;

pub use analysis::AnalysisAgent;
pub use insight::InsightAgent;
pub use report::ReportAgent;
pub use retrieval::RetrievalAgent;
