use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

/// Star counts keyed by full name (`owner/name`)
///
/// Write-once per key and never evicted: a count fetched once is good for the
/// rest of the run. Safe to share behind an `Arc` when enrichment fans out.
#[derive(Debug, Default)]
pub struct StarCountCache {
    counts: RwLock<HashMap<String, u64>>,
}

impl StarCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, full_name: &str) -> Option<u64> {
        // A poisoned lock still holds valid counts; nobody panics mid-insert
        let counts = self.counts.read().unwrap_or_else(|e| e.into_inner());
        counts.get(full_name).copied()
    }

    /// Store a count unless one is already there. Returns whichever value
    /// ends up cached, so racing writers agree on the answer.
    pub fn insert(&self, full_name: &str, count: u64) -> u64 {
        let mut counts = self.counts.write().unwrap_or_else(|e| e.into_inner());
        let stored = *counts.entry(full_name.to_string()).or_insert(count);
        if stored != count {
            debug!(
                "Ignoring late star count for {} ({} already cached)",
                full_name, stored
            );
        }
        stored
    }

    pub fn len(&self) -> usize {
        self.counts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
