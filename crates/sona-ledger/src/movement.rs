//! # Movement Journal
//!
//! Append-only log of stock movements, kept alongside the account arena so
//! every balance can be explained movement by movement.
//!
//! The journal is audit state, not account state: balances live in the
//! accounts and are never recomputed from here.

use tokio::sync::RwLock;

use sona_core::types::SourceRef;

/// An append-only, in-process movement log.
///
/// Generic over the movement record type so the metal ledger and the
/// catalogue item ledger each keep their own journal.
#[derive(Debug)]
pub struct MovementLog<T> {
    entries: RwLock<Vec<T>>,
}

impl<T> Default for MovementLog<T> {
    fn default() -> Self {
        MovementLog::new()
    }
}

impl<T> MovementLog<T> {
    /// Creates an empty journal.
    pub fn new() -> Self {
        MovementLog {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Appends one movement. Entries are never edited or removed.
    pub async fn append(&self, entry: T) {
        self.entries.write().await.push(entry);
    }

    /// Number of recorded movements.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the journal is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<T: Clone> MovementLog<T> {
    /// All movements, oldest first.
    pub async fn all(&self) -> Vec<T> {
        self.entries.read().await.clone()
    }

    /// Movements matching a predicate, oldest first.
    pub async fn filtered(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }
}

/// Builds the idempotence-guard key for one movement.
///
/// The triple (operation, account, source reference) identifies a business
/// movement: replaying the same triple must be a no-op, while the same
/// source legitimately touching two accounts (or two lines of one document
/// touching the same account, via distinct line-scoped refs) must not
/// collide.
pub(crate) fn applied_key(operation: &str, account: &str, source: &SourceRef) -> String {
    format!("{}:{}:{}", operation, account, source)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_filter() {
        let log: MovementLog<i64> = MovementLog::new();
        assert!(log.is_empty().await);

        log.append(1).await;
        log.append(2).await;
        log.append(3).await;

        assert_eq!(log.len().await, 3);
        assert_eq!(log.all().await, vec![1, 2, 3]);
        assert_eq!(log.filtered(|n| *n % 2 == 1).await, vec![1, 3]);
    }

    #[test]
    fn test_applied_key_distinguishes_lines() {
        let a = applied_key("credit", "gold@22.00K", &SourceRef::bill_line("42", 0));
        let b = applied_key("credit", "gold@22.00K", &SourceRef::bill_line("42", 1));
        assert_ne!(a, b);
        assert_eq!(a, "credit:gold@22.00K:BILL#42/0");
    }
}
