use chrono::{Duration, Utc};
use studylog_core::store::memory::MemoryStore;
use studylog_core::{
    list_events, list_stats, process_session, EventFilter, Outcome, ReviewEntry,
    SessionSubmission, StatsFilter, StoredCard,
};
use uuid::Uuid;

fn entry(card_id: Uuid, outcome: Outcome) -> ReviewEntry {
    ReviewEntry {
        card_id,
        outcome,
        response_time_ms: None,
        prev_interval_days: None,
        next_interval_days: None,
        was_learning_step: false,
        payload: None,
    }
}

fn submission(entries: Vec<ReviewEntry>) -> SessionSubmission {
    let now = Utc::now();
    SessionSubmission {
        session_id: Uuid::new_v4(),
        started_at: now - Duration::minutes(10),
        completed_at: now,
        reviews: entries,
    }
}

fn seed_card(store: &MemoryStore, user: Uuid) -> Uuid {
    let card = StoredCard::new(user);
    let id = card.id;
    store.insert_card(card);
    id
}

#[tokio::test]
async fn pages_concatenate_to_the_full_set() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let card = seed_card(&store, user);

    let entries = (0..7).map(|_| entry(card, Outcome::Good)).collect();
    process_session(&store, user, submission(entries)).await.unwrap();

    let mut collected = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let filter = EventFilter {
            limit: Some(3),
            cursor: cursor.clone(),
            ..Default::default()
        };
        let page = list_events(&store, user, filter).await.unwrap();
        collected.extend(page.data);
        if !page.page.has_more {
            assert!(page.page.next_cursor.is_none());
            break;
        }
        assert!(page.page.next_cursor.is_some());
        cursor = page.page.next_cursor;
    }

    assert_eq!(collected.len(), 7);
    // Exhaustive, deduplicated, and in the documented order.
    let mut ids: Vec<Uuid> = collected.iter().map(|e| e.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 7);
    for pair in collected.windows(2) {
        assert!(pair[0].reviewed_at > pair[1].reviewed_at);
    }
}

#[tokio::test]
async fn limit_one_with_two_events() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let card = seed_card(&store, user);

    process_session(
        &store,
        user,
        submission(vec![entry(card, Outcome::Good), entry(card, Outcome::Good)]),
    )
    .await
    .unwrap();

    let first = list_events(
        &store,
        user,
        EventFilter {
            limit: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(first.data.len(), 1);
    assert!(first.page.has_more);
    let cursor = first.page.next_cursor.expect("cursor on a partial page");

    let second = list_events(
        &store,
        user,
        EventFilter {
            limit: Some(1),
            cursor: Some(cursor),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(second.data.len(), 1);
    assert!(!second.page.has_more);
    assert_ne!(first.data[0].id, second.data[0].id);
}

#[tokio::test]
async fn card_and_time_filters_apply() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let card_a = seed_card(&store, user);
    let card_b = seed_card(&store, user);

    process_session(&store, user, submission(vec![entry(card_a, Outcome::Good)]))
        .await
        .unwrap();
    let mid = Utc::now();
    process_session(&store, user, submission(vec![entry(card_b, Outcome::Easy)]))
        .await
        .unwrap();

    let only_a = list_events(
        &store,
        user,
        EventFilter {
            card_id: Some(card_a),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(only_a.data.len(), 1);
    assert_eq!(only_a.data[0].card_id, card_a);

    let recent = list_events(
        &store,
        user,
        EventFilter {
            from: Some(mid),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(recent.data.len(), 1);
    assert_eq!(recent.data[0].card_id, card_b);

    let old = list_events(
        &store,
        user,
        EventFilter {
            to: Some(mid),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(old.data.len(), 1);
    assert_eq!(old.data[0].card_id, card_a);
}

#[tokio::test]
async fn invalid_limits_and_filters_are_rejected() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();

    for limit in [0, 101] {
        let err = list_events(
            &store,
            user,
            EventFilter {
                limit: Some(limit),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let err = list_stats(
            &store,
            user,
            StatsFilter {
                limit: Some(limit),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    let err = list_events(
        &store,
        user,
        EventFilter {
            cursor: Some("!!definitely-not-a-cursor!!".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "invalid_input");

    let now = Utc::now();
    let err = list_events(
        &store,
        user,
        EventFilter {
            from: Some(now),
            to: Some(now - Duration::hours(1)),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "invalid_input");
}

#[tokio::test]
async fn stats_are_listed_soonest_due_first() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let lapsed = seed_card(&store, user);
    let solid = seed_card(&store, user);

    // `solid` earns a 6-day interval, `lapsed` falls back to 1 day.
    process_session(
        &store,
        user,
        submission(vec![
            entry(solid, Outcome::Good),
            entry(solid, Outcome::Good),
            entry(lapsed, Outcome::Again),
        ]),
    )
    .await
    .unwrap();

    let page = list_stats(&store, user, StatsFilter::default()).await.unwrap();
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0].card_id, lapsed);
    assert_eq!(page.data[1].card_id, solid);
    assert!(page.data[0].next_review_at < page.data[1].next_review_at);

    let due_soon = list_stats(
        &store,
        user,
        StatsFilter {
            next_review_before: Some(Utc::now() + Duration::days(2)),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(due_soon.data.len(), 1);
    assert_eq!(due_soon.data[0].card_id, lapsed);
}

#[tokio::test]
async fn stats_pagination_walks_by_due_time() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let lapsed = seed_card(&store, user);
    let solid = seed_card(&store, user);

    process_session(
        &store,
        user,
        submission(vec![
            entry(solid, Outcome::Good),
            entry(solid, Outcome::Good),
            entry(lapsed, Outcome::Again),
        ]),
    )
    .await
    .unwrap();

    let first = list_stats(
        &store,
        user,
        StatsFilter {
            limit: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(first.data.len(), 1);
    assert_eq!(first.data[0].card_id, lapsed);
    assert!(first.page.has_more);

    let second = list_stats(
        &store,
        user,
        StatsFilter {
            limit: Some(1),
            cursor: first.page.next_cursor,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(second.data.len(), 1);
    assert_eq!(second.data[0].card_id, solid);
    assert!(!second.page.has_more);
}

#[tokio::test]
async fn filters_are_scoped_to_the_caller() {
    let store = MemoryStore::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let card = seed_card(&store, alice);

    process_session(&store, alice, submission(vec![entry(card, Outcome::Good)]))
        .await
        .unwrap();

    let own = list_events(&store, alice, EventFilter::default()).await.unwrap();
    assert_eq!(own.data.len(), 1);

    let other = list_events(&store, bob, EventFilter::default()).await.unwrap();
    assert!(other.data.is_empty());
    let other_stats = list_stats(&store, bob, StatsFilter::default()).await.unwrap();
    assert!(other_stats.data.is_empty());
}
