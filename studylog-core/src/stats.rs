use crate::{CardId, ReviewEvent, ReviewStats, StatsAggregates, UserId};
use chrono::Duration;

/// Folds a card's full event stream into its stats row. `events` must be in
/// chronological order and all belong to (`card_id`, `user_id`).
///
/// Both stores call this at append time, inside the same critical section or
/// transaction as the insert, so the aggregate row always equals the fold of
/// the log.
pub fn derive_stats(
    card_id: CardId,
    user_id: UserId,
    events: &[ReviewEvent],
) -> Option<ReviewStats> {
    let last = events.last()?;

    let mut success_count = 0u32;
    let mut streak = 0u32;
    let mut interval_sum = 0u64;
    for e in events {
        if e.outcome.is_success() {
            success_count += 1;
            streak += 1;
        } else {
            streak = 0;
        }
        interval_sum += u64::from(e.next_interval_days);
    }

    let total_reviews = events.len() as u32;
    let aggregates = StatsAggregates {
        avg_interval_days: interval_sum as f32 / total_reviews as f32,
        success_rate: success_count as f32 / total_reviews as f32,
        current_streak: streak,
    };

    Some(ReviewStats {
        card_id,
        user_id,
        total_reviews,
        success_count,
        streak,
        last_outcome: last.outcome,
        last_interval_days: last.next_interval_days,
        ease_factor: last.ease_factor,
        next_review_at: last.reviewed_at + Duration::days(i64::from(last.next_interval_days)),
        last_reviewed_at: last.reviewed_at,
        aggregates,
    })
}
