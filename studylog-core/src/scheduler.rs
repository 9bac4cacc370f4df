use crate::{MemoryState, Outcome, EF_MIN};

/// Advances a card's memory state by one review outcome.
///
/// SM-2 on the 0-4 grade scale: failures (grade < 3) zero the streak and
/// fall back to a one-day relearning interval; successes walk the 1-day /
/// 6-day opening steps and then grow the interval by the ease factor.
/// Pure state in, state out. The clock and all I/O live with the caller.
pub fn advance(state: MemoryState, outcome: Outcome) -> MemoryState {
    let g = i32::from(outcome.grade());

    // SM-2 ease recurrence, re-based so a perfect recall is grade 4.
    let miss = (4 - g) as f32;
    let ef = (state.ef + (0.1 - miss * (0.08 + miss * 0.02))).max(EF_MIN);

    if g < 3 {
        return MemoryState {
            interval_days: 1,
            reps: 0,
            ef,
        };
    }

    let reps = state.reps + 1;
    let interval_days = match reps {
        1 => 1,
        2 => 6,
        _ => {
            let base = state.interval_days.max(1) as f32;
            (base * ef).round().max(1.0) as u32
        }
    };

    MemoryState {
        interval_days,
        reps,
        ef,
    }
}
