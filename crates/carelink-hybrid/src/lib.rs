//! carelink-hybrid
//!
//! Search orchestration: keyword ranking first, embedding re-rank second,
//! with a debounced live front end that guarantees the newest query wins.

pub mod analytics;
pub mod live;
pub mod options;
pub mod orchestrator;
pub mod rerank;

pub use analytics::{AnalyticsSink, MemorySink, SearchEvent, TracingSink};
pub use live::{LiveSearch, SearchView};
pub use options::{SearchOptions, SearchOutcome, SearchPhase, SearchStatus};
pub use orchestrator::SearchOrchestrator;
pub use rerank::{blend, BlendParams};
