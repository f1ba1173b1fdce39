use std::collections::HashSet;

/// Segment references already written during the current session.
///
/// Only grows. Keys are the normalized references produced by the playlist
/// fetcher, so an absolute and a bare spelling of the same chunk collapse to
/// one entry.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, reference: &str) -> bool {
        self.seen.contains(reference)
    }

    /// Returns `false` if the reference was already recorded.
    pub fn mark(&mut self, reference: impl Into<String>) -> bool {
        self.seen.insert(reference.into())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
