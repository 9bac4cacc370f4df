use crate::{CardId, EngineError, ReviewEvent, ReviewStats, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

pub mod memory;

/// Storage-side view of an event-history read. Filters are already validated
/// and the cursor already decoded by the query layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventWindow {
    pub card_id: Option<CardId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Exclusive upper bound from the pagination cursor (newest-first walk).
    pub before: Option<DateTime<Utc>>,
}

/// Storage-side view of a stats read.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatsWindow {
    pub card_id: Option<CardId>,
    pub due_before: Option<DateTime<Utc>>,
    /// Exclusive lower bound from the pagination cursor (soonest-due walk).
    pub after: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Subset of `card_ids` owned by `user_id` and not soft-deleted.
    /// Callers pass de-duplicated ids; one read per batch.
    async fn owned_card_ids(
        &self,
        user_id: UserId,
        card_ids: &[CardId],
    ) -> Result<HashSet<CardId>, EngineError>;

    /// Current stats rows for the given cards. A card never reviewed by this
    /// user has no row, which is not an error.
    async fn load_stats(
        &self,
        user_id: UserId,
        card_ids: &[CardId],
    ) -> Result<Vec<ReviewStats>, EngineError>;

    /// Appends the whole batch atomically and rederives the stats row of
    /// every touched card before the write becomes visible.
    async fn append_events(&self, events: &[ReviewEvent]) -> Result<(), EngineError>;

    /// Events matching the window, newest first, at most `fetch` rows.
    async fn list_events(
        &self,
        user_id: UserId,
        window: EventWindow,
        fetch: u32,
    ) -> Result<Vec<ReviewEvent>, EngineError>;

    /// Stats rows matching the window, soonest due first, at most `fetch` rows.
    async fn list_stats(
        &self,
        user_id: UserId,
        window: StatsWindow,
        fetch: u32,
    ) -> Result<Vec<ReviewStats>, EngineError>;
}
