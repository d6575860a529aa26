//! Fire-and-forget search analytics. Events carry a token fingerprint,
//! never the query text.

use parking_lot::Mutex;
use serde::Serialize;

use crate::options::SearchStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchEvent {
    pub pattern: String,
    pub result_count: usize,
    pub status: SearchStatus,
    pub crisis: bool,
}

pub trait AnalyticsSink: Send + Sync {
    fn record(&self, event: &SearchEvent) -> anyhow::Result<()>;
}

/// Logs events at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn record(&self, event: &SearchEvent) -> anyhow::Result<()> {
        tracing::debug!(
            pattern = %event.pattern,
            results = event.result_count,
            status = ?event.status,
            crisis = event.crisis,
            "search event"
        );
        Ok(())
    }
}

/// Keeps events in memory; used by tests and the CLI's `--stats` flag.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SearchEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<SearchEvent> {
        self.events.lock().clone()
    }
}

impl AnalyticsSink for MemorySink {
    fn record(&self, event: &SearchEvent) -> anyhow::Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
