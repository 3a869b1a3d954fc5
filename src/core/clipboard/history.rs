use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use chrono::Utc;

use crate::shared::types::{ContentType, EntryId, HistoryEntry, HistorySnapshot};

struct HistoryInner {
    /// Newest first
    entries: VecDeque<HistoryEntry>,
    total_bytes: u64,
    next_id: u64,
    memory_ceiling: u64,
}

impl HistoryInner {
    fn allocate_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    fn remove_at(&mut self, index: usize) -> Option<HistoryEntry> {
        let entry = self.entries.remove(index)?;
        self.total_bytes -= entry.size;
        Some(entry)
    }

    fn insert(&mut self, content: String, content_type: ContentType) -> HistoryEntry {
        let id = self.allocate_id();
        let now = Utc::now();

        let existing = self
            .entries
            .iter()
            .position(|entry| entry.content == content)
            .and_then(|index| self.remove_at(index));

        let entry = match existing {
            Some(mut promoted) => {
                tracing::debug!(old_id = %promoted.id, new_id = %id, "promoting duplicate clipboard entry");
                promoted.id = id;
                promoted.timestamp = now;
                promoted.content_type = content_type;
                promoted.size = promoted.content.len() as u64;
                promoted
            }
            None => HistoryEntry {
                id,
                size: content.len() as u64,
                content,
                content_type,
                timestamp: now,
                pinned: false,
            },
        };

        self.total_bytes += entry.size;
        self.entries.push_front(entry.clone());
        self.enforce_ceiling();
        entry
    }

    /// Evict unpinned entries from the oldest end until the total fits.
    /// The head entry (the one just inserted) is never a candidate.
    fn enforce_ceiling(&mut self) {
        while self.total_bytes > self.memory_ceiling {
            let candidate = (1..self.entries.len())
                .rev()
                .find(|&index| !self.entries[index].pinned);
            let Some(index) = candidate else {
                tracing::debug!(
                    total = self.total_bytes,
                    ceiling = self.memory_ceiling,
                    "memory ceiling exceeded with no evictable entry left"
                );
                break;
            };
            match self.remove_at(index) {
                Some(evicted) => {
                    tracing::debug!(id = %evicted.id, size = evicted.size, "evicted clipboard entry");
                }
                None => break,
            }
        }
    }

    fn presentation_order(&self) -> Vec<HistoryEntry> {
        let pinned = self.entries.iter().filter(|entry| entry.pinned);
        let unpinned = self.entries.iter().filter(|entry| !entry.pinned);
        pinned.chain(unpinned).cloned().collect()
    }
}

/// In-memory clipboard history.
///
/// Cloning yields another handle to the same store. Every operation runs
/// under one lock, so promotion and ceiling enforcement are never observed
/// half-done.
///
/// The memory ceiling is a soft bound: pinned entries and the entry being
/// inserted are never evicted, so `memory_usage()` can stay above the
/// ceiling.
#[derive(Clone)]
pub struct ClipboardHistory {
    inner: Arc<Mutex<HistoryInner>>,
}

impl ClipboardHistory {
    pub fn new(memory_ceiling: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HistoryInner {
                entries: VecDeque::new(),
                total_bytes: 0,
                next_id: 1,
                memory_ceiling,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("clipboard history mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Insert new content at the head, or promote the existing entry with
    /// identical content (fresh id and timestamp, pin state kept).
    pub fn insert(&self, content: String, content_type: ContentType) -> HistoryEntry {
        self.lock().insert(content, content_type)
    }

    /// Remove an entry. Returns `false` when the id is unknown.
    pub fn delete(&self, id: EntryId) -> bool {
        let mut inner = self.lock();
        match inner.position(id) {
            Some(index) => inner.remove_at(index).is_some(),
            None => false,
        }
    }

    /// Flip the pin flag. Position and timestamp are untouched.
    pub fn toggle_pin(&self, id: EntryId) -> Option<HistoryEntry> {
        let mut inner = self.lock();
        let index = inner.position(id)?;
        let entry = inner.entries.get_mut(index)?;
        entry.pinned = !entry.pinned;
        Some(entry.clone())
    }

    /// Remove every entry, pinned ones included
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.total_bytes = 0;
    }

    pub fn memory_usage(&self) -> u64 {
        self.lock().total_bytes
    }

    pub fn memory_ceiling(&self) -> u64 {
        self.lock().memory_ceiling
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        let inner = self.lock();
        HistorySnapshot {
            entries: inner.presentation_order(),
            memory_usage: inner.total_bytes,
        }
    }

    /// Entries newest first, ignoring pins
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    pub fn get(&self, id: EntryId) -> Option<HistoryEntry> {
        let inner = self.lock();
        inner.entries.iter().find(|entry| entry.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Case-insensitive substring search over text entries, in
    /// presentation order. A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<HistoryEntry> {
        let needle = query.trim().to_lowercase();
        let inner = self.lock();
        let ordered = inner.presentation_order();
        if needle.is_empty() {
            return ordered;
        }
        ordered
            .into_iter()
            .filter(|entry| {
                entry.content_type == ContentType::Text
                    && entry.content.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LARGE_CEILING: u64 = 1024 * 1024;

    fn text(history: &ClipboardHistory, content: &str) -> HistoryEntry {
        history.insert(content.to_string(), ContentType::Text)
    }

    fn assert_accounting(history: &ClipboardHistory) {
        let summed: u64 = history.entries().iter().map(|entry| entry.size).sum();
        assert_eq!(history.memory_usage(), summed);
    }

    #[test]
    fn test_insert_places_newest_first() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        text(&history, "First item");
        text(&history, "Second item");

        let entries = history.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "Second item");
        assert_eq!(entries[1].content, "First item");
        assert_eq!(entries[0].size, "Second item".len() as u64);
        assert!(!entries[0].pinned);
    }

    #[test]
    fn test_duplicate_is_promoted_not_duplicated() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        let first = text(&history, "A");
        text(&history, "B");
        let promoted = text(&history, "A");

        let entries = history.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "A");
        assert_eq!(entries[0].id, promoted.id);
        assert_ne!(promoted.id, first.id);
        assert!(promoted.timestamp >= first.timestamp);
        assert_eq!(history.memory_usage(), 2);
    }

    #[test]
    fn test_pin_survives_promotion() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        let a = text(&history, "A");
        text(&history, "B");
        assert!(history.toggle_pin(a.id).unwrap().pinned);

        let promoted = text(&history, "A");

        assert!(promoted.pinned);
        assert!(history.entries()[0].pinned);
        assert!(history.get(a.id).is_none());
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        let ids: Vec<EntryId> = (0..50).map(|i| text(&history, &format!("item {}", i)).id).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_ceiling_evicts_oldest_unpinned() {
        let history = ClipboardHistory::new(500);
        let older = text(&history, &"a".repeat(300));
        let newer = text(&history, &"b".repeat(300));

        assert!(history.memory_usage() <= 500);
        assert!(history.get(older.id).is_none());
        assert!(history.get(newer.id).is_some());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_pinned_entries_are_eviction_exempt() {
        let history = ClipboardHistory::new(500);
        let older = text(&history, &"a".repeat(300));
        history.toggle_pin(older.id);
        let newer = text(&history, &"b".repeat(300));

        assert!(history.get(older.id).is_some());
        assert!(history.get(newer.id).is_some());
        assert_eq!(history.memory_usage(), 600);
    }

    #[test]
    fn test_over_ceiling_state_is_stable() {
        let history = ClipboardHistory::new(500);
        let first = text(&history, &"a".repeat(300));
        history.toggle_pin(first.id);
        let second = text(&history, &"b".repeat(300));
        history.toggle_pin(second.id);

        let third = text(&history, &"c".repeat(300));
        assert_eq!(history.memory_usage(), 900);

        // A later insert finally makes the unpinned third entry evictable
        let fourth = text(&history, "d");
        assert!(history.get(third.id).is_none());
        assert!(history.get(fourth.id).is_some());
        assert_eq!(history.memory_usage(), 601);
        assert_accounting(&history);
    }

    #[test]
    fn test_eviction_skips_pinned_tail() {
        let history = ClipboardHistory::new(250);
        let oldest = text(&history, &"a".repeat(100));
        history.toggle_pin(oldest.id);
        let middle = text(&history, &"b".repeat(100));
        let newest = text(&history, &"c".repeat(100));

        assert!(history.get(oldest.id).is_some());
        assert!(history.get(middle.id).is_none());
        assert!(history.get(newest.id).is_some());
        assert_eq!(history.memory_usage(), 200);
    }

    #[test]
    fn test_clear_overrides_pins() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        let pinned = text(&history, "keep me");
        history.toggle_pin(pinned.id);
        text(&history, "drop me");

        history.clear();

        assert!(history.is_empty());
        assert_eq!(history.memory_usage(), 0);
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        text(&history, "A");
        text(&history, "B");
        let before = history.entries();

        assert!(!history.delete(EntryId(9999)));

        assert_eq!(history.entries(), before);
        assert_eq!(history.memory_usage(), 2);
    }

    #[test]
    fn test_delete_removes_entry() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        let a = text(&history, "A");
        text(&history, "BB");

        assert!(history.delete(a.id));
        assert!(!history.delete(a.id));
        assert_eq!(history.memory_usage(), 2);
    }

    #[test]
    fn test_toggle_pin_unknown_id() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        assert!(history.toggle_pin(EntryId(1)).is_none());
    }

    #[test]
    fn test_toggle_pin_keeps_position_and_timestamp() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        let a = text(&history, "A");
        text(&history, "B");

        let toggled = history.toggle_pin(a.id).unwrap();

        assert_eq!(toggled.timestamp, a.timestamp);
        assert_eq!(toggled.size, a.size);
        assert_eq!(history.entries()[1].id, a.id);
        assert!(!history.toggle_pin(a.id).unwrap().pinned);
    }

    #[test]
    fn test_snapshot_lists_pinned_first() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        let old = text(&history, "old");
        text(&history, "mid");
        text(&history, "new");
        history.toggle_pin(old.id);

        let snapshot = history.snapshot();
        let order: Vec<&str> = snapshot.entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(order, vec!["old", "new", "mid"]);
        assert_eq!(snapshot.memory_usage, 9);
    }

    #[test]
    fn test_memory_accounting_never_drifts() {
        let history = ClipboardHistory::new(64);
        for round in 0..20 {
            let entry = text(&history, &"x".repeat(round % 7 + 1));
            assert_accounting(&history);
            if round % 3 == 0 {
                history.toggle_pin(entry.id);
            }
            if round % 5 == 0 {
                history.delete(entry.id);
                assert_accounting(&history);
            }
            text(&history, &format!("entry-{}", round));
            assert_accounting(&history);
        }
        history.clear();
        assert_accounting(&history);
        assert_eq!(history.memory_usage(), 0);
    }

    #[test]
    fn test_search_is_case_insensitive_and_skips_images() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        text(&history, "Hello World");
        text(&history, "goodbye");
        history.insert("data:image/png;base64,hello".to_string(), ContentType::Image);

        let hits = history.search("  HELLO ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "Hello World");
        assert_eq!(history.search("").len(), 3);
    }

    #[test]
    fn test_handles_share_state() {
        let history = ClipboardHistory::new(LARGE_CEILING);
        let other = history.clone();
        text(&other, "shared");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_concurrent_writers_keep_store_consistent() {
        use std::collections::HashSet;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;

        let history = ClipboardHistory::new(64);
        let done = AtomicBool::new(false);

        thread::scope(|scope| {
            let reader = scope.spawn(|| {
                let mut checks = 0u32;
                while !done.load(Ordering::SeqCst) || checks == 0 {
                    let snapshot = history.snapshot();
                    let summed: u64 = snapshot.entries.iter().map(|entry| entry.size).sum();
                    assert_eq!(snapshot.memory_usage, summed);

                    let distinct: HashSet<&str> = snapshot.entries.iter().map(|entry| entry.content.as_str()).collect();
                    assert_eq!(distinct.len(), snapshot.entries.len());
                    checks += 1;
                }
            });

            let writers: Vec<_> = (0..4)
                .map(|worker| {
                    let history = history.clone();
                    scope.spawn(move || {
                        for round in 0..300usize {
                            let entry = history.insert(format!("item-{}", (worker + round) % 12), ContentType::Text);
                            match round % 7 {
                                0 => {
                                    history.toggle_pin(entry.id);
                                }
                                3 => {
                                    if let Some(oldest) = history.entries().last() {
                                        history.delete(oldest.id);
                                    }
                                }
                                5 => {
                                    history.toggle_pin(entry.id);
                                    history.toggle_pin(entry.id);
                                }
                                _ => {}
                            }
                        }
                    })
                })
                .collect();

            for writer in writers {
                writer.join().unwrap();
            }
            done.store(true, Ordering::SeqCst);
            reader.join().unwrap();
        });

        assert_accounting(&history);
        let entries = history.entries();
        let distinct: HashSet<&str> = entries.iter().map(|entry| entry.content.as_str()).collect();
        assert_eq!(distinct.len(), entries.len());
    }
}
