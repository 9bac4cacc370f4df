use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type CardId = Uuid;
pub type EventId = Uuid;
pub type SessionId = Uuid;

pub const EF_MIN: f32 = 1.3;
pub const EF_DEFAULT: f32 = 2.5;

/// Caller-reported quality of one recall attempt.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Again,
    Fail,
    Hard,
    Good,
    Easy,
}

impl Outcome {
    /// Numeric grade consumed by the scheduler. Total and fixed.
    pub fn grade(&self) -> u8 {
        match self {
            Outcome::Again => 0,
            Outcome::Fail => 1,
            Outcome::Hard => 2,
            Outcome::Good => 3,
            Outcome::Easy => 4,
        }
    }

    /// Grade 3 or better counts as a successful recall.
    pub fn is_success(&self) -> bool {
        self.grade() >= 3
    }
}

/// Per-card scheduling state consumed and produced by the scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemoryState {
    pub interval_days: u32,
    pub reps: u32,
    pub ef: f32,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            interval_days: 0,
            reps: 0,
            ef: EF_DEFAULT,
        }
    }
}

/// Engine view of a card: ownership plus the soft-delete marker. Cards are
/// created and destroyed by the card-management subsystem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredCard {
    pub id: CardId,
    pub user_id: UserId,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl StoredCard {
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            deleted_at: None,
        }
    }
}

/// One review outcome for one card. Append-only; no update or delete path
/// exists once a row is written.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: EventId,
    pub card_id: CardId,
    pub user_id: UserId,
    pub outcome: Outcome,
    pub grade: u8,
    pub response_time_ms: Option<u32>,
    pub prev_interval_days: Option<u32>,
    pub next_interval_days: u32,
    pub ease_factor: f32,
    pub was_learning_step: bool,
    pub payload: Option<serde_json::Value>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsAggregates {
    pub avg_interval_days: f32,
    pub success_rate: f32,
    pub current_streak: u32,
}

/// Per-(card, user) aggregate derived from the event stream. Written only by
/// the store's derivation at append time; the engine reads it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewStats {
    pub card_id: CardId,
    pub user_id: UserId,
    pub total_reviews: u32,
    pub success_count: u32,
    pub streak: u32,
    pub last_outcome: Outcome,
    pub last_interval_days: u32,
    pub ease_factor: f32,
    pub next_review_at: DateTime<Utc>,
    pub last_reviewed_at: DateTime<Utc>,
    pub aggregates: StatsAggregates,
}

impl ReviewStats {
    /// Scheduling state for this card's next review.
    pub fn memory_state(&self) -> MemoryState {
        MemoryState {
            interval_days: self.last_interval_days,
            reps: self.streak,
            ef: self.ease_factor,
        }
    }
}
