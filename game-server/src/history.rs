use anyhow::Result;
use game_core::{FinishedMatch, MatchHistorySink};
use parking_lot::Mutex;
use tracing::info;

/// Writes each finished match to the log as one JSON line.
#[derive(Debug, Default)]
pub struct TracingHistorySink;

impl MatchHistorySink for TracingHistorySink {
    fn record(&self, finished: &FinishedMatch) -> Result<()> {
        let record = serde_json::to_string(finished)?;
        info!(match_id = %finished.match_id, record = %record, "Match finished");
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryHistorySink {
    records: Mutex<Vec<FinishedMatch>>,
}

impl MemoryHistorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FinishedMatch> {
        self.records.lock().clone()
    }
}

impl MatchHistorySink for MemoryHistorySink {
    fn record(&self, finished: &FinishedMatch) -> Result<()> {
        self.records.lock().push(finished.clone());
        Ok(())
    }
}
