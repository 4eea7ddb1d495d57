//! Run memory: the ordered, append-only log of one run.
//!
//! Each run owns exactly one `RunMemory`; it is never shared between runs,
//! so it carries no locking. The full log is the source of truth. Prompt
//! assembly reads a bounded [`window`](RunMemory::window) of it instead.

use intentus_core::memory::MemoryRecord;
use intentus_core::message::estimate_tokens;
use tracing::debug;

/// How large a window of recent records to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowLimit {
    /// At most this many records
    Records(usize),
    /// As many recent records as fit in this token estimate
    Tokens(usize),
}

/// The memory of a single run.
#[derive(Debug, Default, Clone)]
pub struct RunMemory {
    records: Vec<MemoryRecord>,
}

impl RunMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The step index the next record must carry.
    pub fn next_step(&self) -> u32 {
        self.records.len() as u32 + 1
    }

    /// Append a record.
    ///
    /// # Panics
    ///
    /// If the record's step is not exactly [`next_step`](Self::next_step).
    /// Step gaps or reordering mean the loop itself is broken.
    pub fn append(&mut self, record: MemoryRecord) {
        assert_eq!(
            record.step,
            self.next_step(),
            "memory step indices must be contiguous and start at 1"
        );
        debug!(step = record.step, outcome = record.outcome.as_str(), "Memory record appended");
        self.records.push(record);
    }

    /// Full history, in step order.
    pub fn all(&self) -> &[MemoryRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&MemoryRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent records within `limit`, oldest first.
    ///
    /// A lossy read view; the underlying log is untouched.
    pub fn window(&self, limit: WindowLimit) -> Vec<MemoryRecord> {
        let start = match limit {
            WindowLimit::Records(n) => self.records.len().saturating_sub(n),
            WindowLimit::Tokens(max_tokens) => {
                let mut used = 0;
                let mut start = self.records.len();
                for record in self.records.iter().rev() {
                    let cost = estimate_tokens(&record.summary());
                    if used + cost > max_tokens {
                        break;
                    }
                    used += cost;
                    start -= 1;
                }
                start
            }
        };
        self.records[start..].to_vec()
    }

    /// One summary line per record, in step order.
    pub fn summaries(&self) -> Vec<String> {
        self.records.iter().map(MemoryRecord::summary).collect()
    }

    /// Export the full log as a pretty-printed JSON array for audit.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records)
    }

    /// Export the full log as JSON lines, one record per line.
    pub fn export_jsonl(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Consume the store, yielding the records.
    pub fn into_records(self) -> Vec<MemoryRecord> {
        self.records
    }
}
