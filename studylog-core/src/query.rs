use crate::store::{EventWindow, StatsWindow};
use crate::{CardId, EngineError, ReviewEvent, ReviewStats, ReviewStore, UserId};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Filters for the event-history listing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventFilter {
    pub card_id: Option<CardId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// Filters for the current-stats listing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatsFilter {
    pub card_id: Option<CardId>,
    pub next_review_before: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PageInfo {
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: PageInfo,
}

/// Lists review events newest-first by review timestamp.
///
/// Fetches one row past `limit` to learn whether an older page exists; the
/// returned cursor is the last returned row's timestamp and resumes the walk
/// strictly before it. Filters are validated before any storage access.
pub async fn list_events(
    store: &dyn ReviewStore,
    user_id: UserId,
    filter: EventFilter,
) -> Result<Page<ReviewEvent>, EngineError> {
    let limit = checked_limit(filter.limit)?;
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(EngineError::InvalidInput("from is later than to".into()));
        }
    }
    let before = filter.cursor.as_deref().map(decode_cursor).transpose()?;

    let window = EventWindow {
        card_id: filter.card_id,
        from: filter.from,
        to: filter.to,
        before,
    };
    let rows = store.list_events(user_id, window, limit + 1).await?;
    Ok(assemble_page(rows, limit, |e| e.reviewed_at))
}

/// Lists current per-card stats, soonest due first by next-review timestamp.
pub async fn list_stats(
    store: &dyn ReviewStore,
    user_id: UserId,
    filter: StatsFilter,
) -> Result<Page<ReviewStats>, EngineError> {
    let limit = checked_limit(filter.limit)?;
    let after = filter.cursor.as_deref().map(decode_cursor).transpose()?;

    let window = StatsWindow {
        card_id: filter.card_id,
        due_before: filter.next_review_before,
        after,
    };
    let rows = store.list_stats(user_id, window, limit + 1).await?;
    Ok(assemble_page(rows, limit, |s| s.next_review_at))
}

fn assemble_page<T>(
    mut rows: Vec<T>,
    limit: u32,
    cursor_key: impl Fn(&T) -> DateTime<Utc>,
) -> Page<T> {
    let has_more = rows.len() as u32 > limit;
    rows.truncate(limit as usize);
    let next_cursor = if has_more {
        rows.last().map(|row| encode_cursor(cursor_key(row)))
    } else {
        None
    };
    Page {
        data: rows,
        page: PageInfo {
            next_cursor,
            has_more,
        },
    }
}

fn checked_limit(limit: Option<u32>) -> Result<u32, EngineError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(EngineError::InvalidInput(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    Ok(limit)
}

// Cursors are opaque to callers: a base64 wrapper over the row timestamp,
// fixed-width so equal instants encode identically across pages.
fn encode_cursor(at: DateTime<Utc>) -> String {
    URL_SAFE_NO_PAD.encode(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn decode_cursor(cursor: &str) -> Result<DateTime<Utc>, EngineError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| bad_cursor())?;
    let text = String::from_utf8(bytes).map_err(|_| bad_cursor())?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| bad_cursor())
}

fn bad_cursor() -> EngineError {
    EngineError::InvalidInput("malformed pagination cursor".into())
}
