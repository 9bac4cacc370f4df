use crate::ownership::verify_ownership;
use crate::scheduler::advance;
use crate::{
    CardId, EngineError, MemoryState, Outcome, ReviewEvent, ReviewStore, SessionId, UserId,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const MAX_SESSION_REVIEWS: usize = 100;

/// One review entry as submitted by the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub card_id: CardId,
    pub outcome: Outcome,
    #[serde(default)]
    pub response_time_ms: Option<u32>,
    #[serde(default)]
    pub prev_interval_days: Option<u32>,
    /// Accepted on the wire; the engine's computed value is authoritative.
    #[serde(default)]
    pub next_interval_days: Option<u32>,
    #[serde(default)]
    pub was_learning_step: bool,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// A completed study session: an ordered batch of review entries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSubmission {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub reviews: Vec<ReviewEntry>,
}

/// Processes a whole session in one pass: validate, check ownership, load
/// current state once, schedule each entry in submission order, append all
/// events in one bulk write. Returns the number of events logged.
///
/// Nothing is written unless every entry passes; a failed ownership check
/// rejects the batch before the store sees a single event.
pub async fn process_session(
    store: &dyn ReviewStore,
    user_id: UserId,
    submission: SessionSubmission,
) -> Result<u32, EngineError> {
    if submission.reviews.is_empty() {
        return Ok(0);
    }
    if submission.reviews.len() > MAX_SESSION_REVIEWS {
        return Err(EngineError::InvalidInput(format!(
            "a session may carry at most {MAX_SESSION_REVIEWS} reviews"
        )));
    }
    if submission.completed_at < submission.started_at {
        return Err(EngineError::InvalidInput(
            "session completed_at precedes started_at".into(),
        ));
    }

    let card_ids: Vec<CardId> = submission.reviews.iter().map(|r| r.card_id).collect();
    verify_ownership(store, user_id, &card_ids).await?;

    let mut distinct = card_ids;
    distinct.sort_unstable();
    distinct.dedup();

    // One stats read per batch. A later entry for a card must see the state
    // computed by an earlier entry in the same batch, so state is threaded
    // through this map instead of being re-read from the store.
    let mut states: HashMap<CardId, MemoryState> = HashMap::with_capacity(distinct.len());
    for row in store.load_stats(user_id, &distinct).await? {
        states.insert(row.card_id, row.memory_state());
    }

    let now = Utc::now();
    let mut events = Vec::with_capacity(submission.reviews.len());
    for (i, entry) in submission.reviews.iter().enumerate() {
        let current = states.get(&entry.card_id).copied().unwrap_or_default();
        let next = advance(current, entry.outcome);

        events.push(build_event(user_id, entry, current, next, now, i));
        states.insert(entry.card_id, next);
    }

    store.append_events(&events).await?;

    let logged = events.len() as u32;
    tracing::debug!(
        session_id = %submission.session_id,
        user_id = %user_id,
        logged,
        "review session logged"
    );
    Ok(logged)
}

fn build_event(
    user_id: UserId,
    entry: &ReviewEntry,
    current: MemoryState,
    next: MemoryState,
    batch_at: DateTime<Utc>,
    index: usize,
) -> ReviewEvent {
    ReviewEvent {
        id: Uuid::new_v4(),
        card_id: entry.card_id,
        user_id,
        outcome: entry.outcome,
        grade: entry.outcome.grade(),
        response_time_ms: entry.response_time_ms,
        prev_interval_days: Some(entry.prev_interval_days.unwrap_or(current.interval_days)),
        next_interval_days: next.interval_days,
        ease_factor: next.ef,
        was_learning_step: entry.was_learning_step,
        payload: entry.payload.clone(),
        // The index offset keeps submission order visible under the
        // newest-first timestamp sort within one batch clock reading.
        reviewed_at: batch_at + Duration::microseconds(index as i64),
    }
}
