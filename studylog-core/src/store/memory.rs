use crate::stats::derive_stats;
use crate::{CardId, EngineError, ReviewEvent, ReviewStats, StoredCard, UserId};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use super::{EventWindow, ReviewStore, StatsWindow};

/// In-memory store for tests and single-process use.
///
/// Append and stats derivation happen under one write lock, so a reader
/// never observes an event without its stats update (the same guarantee the
/// SQLite store gets from a transaction).
#[derive(Default)]
pub struct MemoryStore {
    cards: RwLock<HashMap<CardId, StoredCard>>,
    events: RwLock<Vec<ReviewEvent>>,
    stats: RwLock<HashMap<(UserId, CardId), ReviewStats>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a card. Stands in for the card-management subsystem, which owns
    /// card lifecycle outside this engine.
    pub fn insert_card(&self, card: StoredCard) {
        self.cards.write().insert(card.id, card);
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn owned_card_ids(
        &self,
        user_id: UserId,
        card_ids: &[CardId],
    ) -> Result<HashSet<CardId>, EngineError> {
        let cards = self.cards.read();
        Ok(card_ids
            .iter()
            .copied()
            .filter(|id| {
                cards
                    .get(id)
                    .is_some_and(|c| c.user_id == user_id && c.deleted_at.is_none())
            })
            .collect())
    }

    async fn load_stats(
        &self,
        user_id: UserId,
        card_ids: &[CardId],
    ) -> Result<Vec<ReviewStats>, EngineError> {
        let stats = self.stats.read();
        Ok(card_ids
            .iter()
            .filter_map(|id| stats.get(&(user_id, *id)).cloned())
            .collect())
    }

    async fn append_events(&self, events: &[ReviewEvent]) -> Result<(), EngineError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut log = self.events.write();
        let mut stats = self.stats.write();
        log.extend(events.iter().cloned());

        let touched: HashSet<(UserId, CardId)> =
            events.iter().map(|e| (e.user_id, e.card_id)).collect();
        for (user_id, card_id) in touched {
            let mut stream: Vec<ReviewEvent> = log
                .iter()
                .filter(|e| e.user_id == user_id && e.card_id == card_id)
                .cloned()
                .collect();
            stream.sort_by_key(|e| e.reviewed_at);
            if let Some(row) = derive_stats(card_id, user_id, &stream) {
                stats.insert((user_id, card_id), row);
            }
        }
        Ok(())
    }

    async fn list_events(
        &self,
        user_id: UserId,
        window: EventWindow,
        fetch: u32,
    ) -> Result<Vec<ReviewEvent>, EngineError> {
        let log = self.events.read();
        let mut v: Vec<ReviewEvent> = log
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| window.card_id.is_none_or(|id| e.card_id == id))
            .filter(|e| window.from.is_none_or(|t| e.reviewed_at >= t))
            .filter(|e| window.to.is_none_or(|t| e.reviewed_at <= t))
            .filter(|e| window.before.is_none_or(|t| e.reviewed_at < t))
            .cloned()
            .collect();
        v.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
        v.truncate(fetch as usize);
        Ok(v)
    }

    async fn list_stats(
        &self,
        user_id: UserId,
        window: StatsWindow,
        fetch: u32,
    ) -> Result<Vec<ReviewStats>, EngineError> {
        let stats = self.stats.read();
        let mut v: Vec<ReviewStats> = stats
            .values()
            .filter(|s| s.user_id == user_id)
            .filter(|s| window.card_id.is_none_or(|id| s.card_id == id))
            .filter(|s| window.due_before.is_none_or(|t| s.next_review_at < t))
            .filter(|s| window.after.is_none_or(|t| s.next_review_at > t))
            .cloned()
            .collect();
        v.sort_by_key(|s| s.next_review_at);
        v.truncate(fetch as usize);
        Ok(v)
    }
}
