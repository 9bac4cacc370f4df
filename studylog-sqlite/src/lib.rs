use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::path::Path;

use studylog_core::store::{EventWindow, StatsWindow};
use studylog_core::{
    derive_stats, CardId, EngineError, Outcome, ReviewEvent, ReviewStats, ReviewStore,
    StatsAggregates, StoredCard, UserId,
};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(storage_err("sqlite connect"))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn open_memory() -> Result<Self, EngineError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err("sqlite connect"))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), EngineError> {
        // Create tables/indexes if they do not exist (mirrors migrations).
        const STMT: &str = r#"
        CREATE TABLE IF NOT EXISTS cards (
          id         TEXT PRIMARY KEY,
          user_id    TEXT NOT NULL,
          deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS review_events (
          id                 TEXT PRIMARY KEY,
          card_id            TEXT NOT NULL,
          user_id            TEXT NOT NULL,
          outcome            TEXT NOT NULL,
          grade              INTEGER NOT NULL,
          response_time_ms   INTEGER,
          prev_interval_days INTEGER,
          next_interval_days INTEGER NOT NULL,
          ease_factor        REAL NOT NULL,
          was_learning_step  INTEGER NOT NULL DEFAULT 0,
          payload            TEXT,
          reviewed_at        TEXT NOT NULL,
          FOREIGN KEY(card_id) REFERENCES cards(id)
        );

        CREATE TABLE IF NOT EXISTS review_stats (
          card_id            TEXT NOT NULL,
          user_id            TEXT NOT NULL,
          total_reviews      INTEGER NOT NULL,
          success_count      INTEGER NOT NULL,
          streak             INTEGER NOT NULL,
          last_outcome       TEXT NOT NULL,
          last_interval_days INTEGER NOT NULL,
          ease_factor        REAL NOT NULL,
          next_review_at     TEXT NOT NULL,
          last_reviewed_at   TEXT NOT NULL,
          avg_interval_days  REAL NOT NULL,
          success_rate       REAL NOT NULL,
          PRIMARY KEY (user_id, card_id)
        );

        CREATE INDEX IF NOT EXISTS idx_events_user_time ON review_events (user_id, reviewed_at);
        CREATE INDEX IF NOT EXISTS idx_events_card_time ON review_events (card_id, reviewed_at);
        CREATE INDEX IF NOT EXISTS idx_stats_user_due   ON review_stats (user_id, next_review_at);
        "#;

        // Execute statements one by one for compatibility.
        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(storage_err("sqlite schema"))?;
        }
        Ok(())
    }

    /// Seeds a card row. Card lifecycle belongs to the card-management
    /// subsystem; this is its stand-in for tests and tooling.
    pub async fn insert_card(&self, card: &StoredCard) -> Result<(), EngineError> {
        sqlx::query("INSERT INTO cards (id, user_id, deleted_at) VALUES (?,?,?)")
            .bind(card.id.to_string())
            .bind(card.user_id.to_string())
            .bind(card.deleted_at.map(dt_to_str))
            .execute(&self.pool)
            .await
            .map_err(storage_err("insert card"))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReviewStore for SqliteStore {
    // ===== Ownership =====
    async fn owned_card_ids(
        &self,
        user_id: UserId,
        card_ids: &[CardId],
    ) -> Result<HashSet<CardId>, EngineError> {
        if card_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let placeholders = vec!["?"; card_ids.len()].join(",");
        let sql = format!(
            "SELECT id FROM cards WHERE user_id=? AND deleted_at IS NULL AND id IN ({placeholders})"
        );
        let mut q = sqlx::query(&sql).bind(user_id.to_string());
        for id in card_ids {
            q = q.bind(id.to_string());
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("read owned cards"))?;
        let mut owned = HashSet::with_capacity(rows.len());
        for row in rows {
            owned.insert(uuid_from_str(row.get::<String, _>("id"))?);
        }
        Ok(owned)
    }

    // ===== Stats =====
    async fn load_stats(
        &self,
        user_id: UserId,
        card_ids: &[CardId],
    ) -> Result<Vec<ReviewStats>, EngineError> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; card_ids.len()].join(",");
        let sql = format!(
            "SELECT * FROM review_stats WHERE user_id=? AND card_id IN ({placeholders})"
        );
        let mut q = sqlx::query(&sql).bind(user_id.to_string());
        for id in card_ids {
            q = q.bind(id.to_string());
        }
        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("read stats"))?;
        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            v.push(row_into_stats(row)?);
        }
        Ok(v)
    }

    // ===== Events =====
    async fn append_events(&self, events: &[ReviewEvent]) -> Result<(), EngineError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(storage_err("tx"))?;

        for e in events {
            sqlx::query(
                r#"
                INSERT INTO review_events (
                  id, card_id, user_id, outcome, grade, response_time_ms,
                  prev_interval_days, next_interval_days, ease_factor,
                  was_learning_step, payload, reviewed_at
                )
                VALUES (?,?,?,?,?,?,?,?,?,?,?,?)
                "#,
            )
            .bind(e.id.to_string())
            .bind(e.card_id.to_string())
            .bind(e.user_id.to_string())
            .bind(outcome_to_str(e.outcome))
            .bind(i64::from(e.grade))
            .bind(e.response_time_ms.map(i64::from))
            .bind(e.prev_interval_days.map(i64::from))
            .bind(i64::from(e.next_interval_days))
            .bind(f64::from(e.ease_factor))
            .bind(bool_to_i(e.was_learning_step))
            .bind(e.payload.as_ref().map(|p| p.to_string()))
            .bind(dt_to_str(e.reviewed_at))
            .execute(&mut *tx)
            .await
            .map_err(storage_err("insert event"))?;
        }

        // Rederive stats for every touched card from its full stream, inside
        // the same transaction as the insert. The aggregate row can never
        // drift from the log, no matter how concurrent requests interleave.
        let touched: HashSet<(UserId, CardId)> =
            events.iter().map(|e| (e.user_id, e.card_id)).collect();
        for (user_id, card_id) in touched {
            let rows = sqlx::query(
                "SELECT * FROM review_events WHERE user_id=? AND card_id=? ORDER BY reviewed_at ASC",
            )
            .bind(user_id.to_string())
            .bind(card_id.to_string())
            .fetch_all(&mut *tx)
            .await
            .map_err(storage_err("read event stream"))?;

            let mut stream = Vec::with_capacity(rows.len());
            for row in rows {
                stream.push(row_into_event(row)?);
            }
            let Some(s) = derive_stats(card_id, user_id, &stream) else {
                continue;
            };

            sqlx::query(
                r#"
                INSERT OR REPLACE INTO review_stats (
                  card_id, user_id, total_reviews, success_count, streak,
                  last_outcome, last_interval_days, ease_factor,
                  next_review_at, last_reviewed_at, avg_interval_days, success_rate
                )
                VALUES (?,?,?,?,?,?,?,?,?,?,?,?)
                "#,
            )
            .bind(s.card_id.to_string())
            .bind(s.user_id.to_string())
            .bind(i64::from(s.total_reviews))
            .bind(i64::from(s.success_count))
            .bind(i64::from(s.streak))
            .bind(outcome_to_str(s.last_outcome))
            .bind(i64::from(s.last_interval_days))
            .bind(f64::from(s.ease_factor))
            .bind(dt_to_str(s.next_review_at))
            .bind(dt_to_str(s.last_reviewed_at))
            .bind(f64::from(s.aggregates.avg_interval_days))
            .bind(f64::from(s.aggregates.success_rate))
            .execute(&mut *tx)
            .await
            .map_err(storage_err("upsert stats"))?;
        }

        tx.commit().await.map_err(storage_err("tx commit"))
    }

    async fn list_events(
        &self,
        user_id: UserId,
        window: EventWindow,
        fetch: u32,
    ) -> Result<Vec<ReviewEvent>, EngineError> {
        let mut sql = String::from("SELECT * FROM review_events WHERE user_id=?");
        if window.card_id.is_some() {
            sql.push_str(" AND card_id=?");
        }
        if window.from.is_some() {
            sql.push_str(" AND reviewed_at>=?");
        }
        if window.to.is_some() {
            sql.push_str(" AND reviewed_at<=?");
        }
        if window.before.is_some() {
            sql.push_str(" AND reviewed_at<?");
        }
        sql.push_str(" ORDER BY reviewed_at DESC LIMIT ?");

        let mut q = sqlx::query(&sql).bind(user_id.to_string());
        if let Some(id) = window.card_id {
            q = q.bind(id.to_string());
        }
        if let Some(t) = window.from {
            q = q.bind(dt_to_str(t));
        }
        if let Some(t) = window.to {
            q = q.bind(dt_to_str(t));
        }
        if let Some(t) = window.before {
            q = q.bind(dt_to_str(t));
        }
        let rows = q
            .bind(i64::from(fetch))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("list events"))?;

        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            v.push(row_into_event(row)?);
        }
        Ok(v)
    }

    async fn list_stats(
        &self,
        user_id: UserId,
        window: StatsWindow,
        fetch: u32,
    ) -> Result<Vec<ReviewStats>, EngineError> {
        let mut sql = String::from("SELECT * FROM review_stats WHERE user_id=?");
        if window.card_id.is_some() {
            sql.push_str(" AND card_id=?");
        }
        if window.due_before.is_some() {
            sql.push_str(" AND next_review_at<?");
        }
        if window.after.is_some() {
            sql.push_str(" AND next_review_at>?");
        }
        sql.push_str(" ORDER BY next_review_at ASC LIMIT ?");

        let mut q = sqlx::query(&sql).bind(user_id.to_string());
        if let Some(id) = window.card_id {
            q = q.bind(id.to_string());
        }
        if let Some(t) = window.due_before {
            q = q.bind(dt_to_str(t));
        }
        if let Some(t) = window.after {
            q = q.bind(dt_to_str(t));
        }
        let rows = q
            .bind(i64::from(fetch))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("list stats"))?;

        let mut v = Vec::with_capacity(rows.len());
        for row in rows {
            v.push(row_into_stats(row)?);
        }
        Ok(v)
    }
}

// ===== Helpers =====
fn storage_err(op: &'static str) -> impl FnOnce(sqlx::Error) -> EngineError {
    // Raw driver detail goes to the diagnostic channel only; callers see the
    // operation tag.
    move |e| {
        tracing::error!(error = %e, op, "sqlite operation failed");
        EngineError::Storage(op)
    }
}

fn uuid_from_str(s: String) -> Result<uuid::Uuid, EngineError> {
    uuid::Uuid::parse_str(&s).map_err(|_| EngineError::Unexpected(format!("bad uuid: {s}")))
}

// Fixed-width timestamps: lexicographic order in SQL equals chronological
// order, which the cursor comparisons rely on.
fn dt_to_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn dt_from_str(s: String) -> Result<DateTime<Utc>, EngineError> {
    DateTime::parse_from_rfc3339(&s)
        .map_err(|_| EngineError::Unexpected(format!("bad datetime: {s}")))
        .map(|dt| dt.with_timezone(&Utc))
}

fn outcome_to_str(o: Outcome) -> &'static str {
    match o {
        Outcome::Again => "again",
        Outcome::Fail => "fail",
        Outcome::Hard => "hard",
        Outcome::Good => "good",
        Outcome::Easy => "easy",
    }
}

fn outcome_from_str(s: &str) -> Result<Outcome, EngineError> {
    match s {
        "again" => Ok(Outcome::Again),
        "fail" => Ok(Outcome::Fail),
        "hard" => Ok(Outcome::Hard),
        "good" => Ok(Outcome::Good),
        "easy" => Ok(Outcome::Easy),
        _ => Err(EngineError::Unexpected(format!("bad outcome: {s}"))),
    }
}

fn bool_to_i(b: bool) -> i64 {
    i64::from(b)
}

fn row_into_event(row: SqliteRow) -> Result<ReviewEvent, EngineError> {
    let payload = row
        .get::<Option<String>, _>("payload")
        .map(|p| serde_json::from_str(&p))
        .transpose()
        .map_err(|_| EngineError::Unexpected("bad event payload".into()))?;

    Ok(ReviewEvent {
        id: uuid_from_str(row.get::<String, _>("id"))?,
        card_id: uuid_from_str(row.get::<String, _>("card_id"))?,
        user_id: uuid_from_str(row.get::<String, _>("user_id"))?,
        outcome: outcome_from_str(&row.get::<String, _>("outcome"))?,
        grade: row.get::<i64, _>("grade") as u8,
        response_time_ms: row.get::<Option<i64>, _>("response_time_ms").map(|v| v as u32),
        prev_interval_days: row
            .get::<Option<i64>, _>("prev_interval_days")
            .map(|v| v as u32),
        next_interval_days: row.get::<i64, _>("next_interval_days") as u32,
        ease_factor: row.get::<f64, _>("ease_factor") as f32,
        was_learning_step: row.get::<i64, _>("was_learning_step") != 0,
        payload,
        reviewed_at: dt_from_str(row.get::<String, _>("reviewed_at"))?,
    })
}

fn row_into_stats(row: SqliteRow) -> Result<ReviewStats, EngineError> {
    let streak = row.get::<i64, _>("streak") as u32;
    Ok(ReviewStats {
        card_id: uuid_from_str(row.get::<String, _>("card_id"))?,
        user_id: uuid_from_str(row.get::<String, _>("user_id"))?,
        total_reviews: row.get::<i64, _>("total_reviews") as u32,
        success_count: row.get::<i64, _>("success_count") as u32,
        streak,
        last_outcome: outcome_from_str(&row.get::<String, _>("last_outcome"))?,
        last_interval_days: row.get::<i64, _>("last_interval_days") as u32,
        ease_factor: row.get::<f64, _>("ease_factor") as f32,
        next_review_at: dt_from_str(row.get::<String, _>("next_review_at"))?,
        last_reviewed_at: dt_from_str(row.get::<String, _>("last_reviewed_at"))?,
        aggregates: StatsAggregates {
            avg_interval_days: row.get::<f64, _>("avg_interval_days") as f32,
            success_rate: row.get::<f64, _>("success_rate") as f32,
            current_streak: streak,
        },
    })
}
