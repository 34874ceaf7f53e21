use crate::file::Entries;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The pending cache: what this run has extracted, or reused, per package.
///
/// Shared between package workers; each record is a single short critical
/// section.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Mutex<Entries>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the output paths of the package with content hash `hash`.
    ///
    /// An empty `paths` still creates the entry, marking the package as
    /// scanned. Recording a hash again appends only paths not yet present.
    pub fn record(&self, hash: &str, paths: &[String]) {
        let mut entries = self.lock();
        let recorded = entries.entry(hash.to_string()).or_default();
        for path in paths {
            if !recorded.contains(path) {
                recorded.push(path.clone());
            }
        }
    }

    /// Claim `hash` for extraction. Only the first caller gets `true`;
    /// anyone later finds the entry already present and must not extract the
    /// same archive again. The claim is an empty entry that the claimant's
    /// [`record`](Self::record) fills in.
    pub fn claim(&self, hash: &str) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(hash) {
            return false;
        }
        entries.insert(hash.to_string(), Vec::new());
        true
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.lock().contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Move the recorded entries out, leaving the ledger empty.
    pub fn take(&self) -> Entries {
        std::mem::take(&mut *self.lock())
    }

    pub fn into_inner(self) -> Entries {
        self.entries.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A panicking worker cannot leave a half-written entry behind.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_record_empty_is_explicit() {
        let ledger = Ledger::new();
        ledger.record("aa", &[]);
        assert!(ledger.contains("aa"));
        assert_eq!(ledger.into_inner(), Entries::from([("aa".to_string(), vec![])]));
    }

    #[test]
    fn test_record_appends_without_duplicates() {
        let ledger = Ledger::new();
        ledger.record("aa", &paths(&["man1/a.1"]));
        ledger.record("aa", &[]);
        ledger.record("aa", &paths(&["man1/a.1", "man1/b.1"]));
        assert_eq!(ledger.into_inner()["aa"], paths(&["man1/a.1", "man1/b.1"]));
    }

    #[test]
    fn test_take() {
        let ledger = Ledger::new();
        ledger.record("aa", &paths(&["man1/a.1"]));
        assert_eq!(ledger.take().len(), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_claim_once() {
        let ledger = Ledger::new();
        assert!(ledger.claim("aa"));
        assert!(!ledger.claim("aa"));
        ledger.record("aa", &paths(&["man1/a.1"]));
        assert!(!ledger.claim("aa"));
        assert_eq!(ledger.into_inner()["aa"], paths(&["man1/a.1"]));
    }

    #[test]
    fn test_claim_after_record() {
        let ledger = Ledger::new();
        ledger.record("aa", &[]);
        assert!(!ledger.claim("aa"));
    }

    #[test]
    fn test_concurrent_claims() {
        let ledger = Arc::new(Ledger::new());
        let handles = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.claim("shared"))
            })
            .collect::<Vec<_>>();
        let won = handles.into_iter().map(|handle| handle.join().unwrap()).filter(|won| *won).count();
        assert_eq!(won, 1);
    }

    #[test]
    fn test_concurrent_records() {
        let ledger = Arc::new(Ledger::new());
        let handles = (0..8)
            .map(|n| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.record(&format!("hash{n}"), &[format!("man1/{n}.1")]))
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ledger.len(), 8);
    }
}
