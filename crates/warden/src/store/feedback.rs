//! Up/down vote tallies per share.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use stillwater_common::{FeedbackTally, Vote};

use super::ShareId;
use crate::clock::{Clock, millis};

struct TallyEntry {
    tally: FeedbackTally,
    last_vote_at: i64,
}

/// In-memory feedback store
pub struct FeedbackStore {
    clock: Arc<dyn Clock>,
    max_age: Duration,
    tallies: Mutex<HashMap<ShareId, TallyEntry>>,
}

impl FeedbackStore {
    /// Tallies idle for longer than `max_age` are swept
    pub fn new(max_age: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            max_age,
            tallies: Mutex::new(HashMap::new()),
        }
    }

    /// Record a vote and return the updated tally
    pub fn vote(&self, id: &ShareId, vote: Vote) -> FeedbackTally {
        let now = self.clock.now_ms();
        let mut tallies = self.tallies.lock();
        let entry = tallies.entry(id.clone()).or_insert(TallyEntry {
            tally: FeedbackTally::default(),
            last_vote_at: now,
        });

        match vote {
            Vote::Up => entry.tally.up += 1,
            Vote::Down => entry.tally.down += 1,
        }
        entry.last_vote_at = now;
        entry.tally
    }

    /// Current tally; zeros for shares nobody voted on
    pub fn tally(&self, id: &ShareId) -> FeedbackTally {
        self.tallies
            .lock()
            .get(id)
            .map(|e| e.tally)
            .unwrap_or_default()
    }

    pub fn sweep(&self) -> usize {
        let cutoff = self.clock.now_ms() - millis(self.max_age);
        let mut tallies = self.tallies.lock();
        let before = tallies.len();
        tallies.retain(|_, e| e.last_vote_at >= cutoff);
        before - tallies.len()
    }

    pub fn len(&self) -> usize {
        self.tallies.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_votes_accumulate_per_share() {
        let store = FeedbackStore::new(Duration::from_secs(86_400), Arc::new(ManualClock::default()));
        let a = ShareId::generate();
        let b = ShareId::generate();

        assert_eq!(store.tally(&a), FeedbackTally::default());
        store.vote(&a, Vote::Up);
        store.vote(&a, Vote::Up);
        assert_eq!(store.vote(&a, Vote::Down), FeedbackTally { up: 2, down: 1 });
        assert_eq!(store.vote(&b, Vote::Down), FeedbackTally { up: 0, down: 1 });
        assert_eq!(store.tally(&a), FeedbackTally { up: 2, down: 1 });
    }

    #[test]
    fn test_idle_tallies_are_swept() {
        let clock = Arc::new(ManualClock::default());
        let store = FeedbackStore::new(Duration::from_secs(86_400), clock.clone());
        let old = ShareId::generate();
        let busy = ShareId::generate();
        store.vote(&old, Vote::Up);
        store.vote(&busy, Vote::Up);

        clock.advance(Duration::from_secs(80_000));
        store.vote(&busy, Vote::Down);
        clock.advance(Duration::from_secs(10_000));

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.tally(&old), FeedbackTally::default());
        assert_eq!(store.tally(&busy), FeedbackTally { up: 1, down: 1 });
    }
}
