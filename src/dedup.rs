use std::collections::HashSet;

/// Identifiers collected so far in one crawl of one source. Only grows.
#[derive(Debug, Default, Clone)]
pub struct DedupTracker {
    seen: HashSet<String>,
}

impl DedupTracker {
    pub fn new() -> DedupTracker {
        DedupTracker::default()
    }

    pub fn is_new(&self, id: &str) -> bool {
        !self.seen.contains(id)
    }

    /// Records `id`; returns `false` if it was already known.
    pub fn mark_seen<I: AsRef<str>>(&mut self, id: I) -> bool {
        let id = id.as_ref();
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
