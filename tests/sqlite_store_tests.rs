use taste_discovery::store::{SqliteStore, Store, StoreError};
use taste_discovery::taste::metrics::AlgorithmMetricsRecord;
use taste_discovery::taste::selector::fallback_pair;
use taste_discovery::taste::snapshot::{decode, encode};
use taste_discovery::taste::types::{ChoiceRecord, SessionRecord};
use taste_discovery::taste::{
    Category, ChoiceOutcome, ChosenSide, ComparisonEvent, PreferenceModel, TasteEngine, Variant,
};

mod common;

async fn open_temp() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::sqlite(&dir.path().join("nested").join("taste.db"))
        .await
        .expect("open sqlite");
    (dir, store)
}

fn session(id: &str) -> SessionRecord {
    SessionRecord {
        id: id.to_string(),
        variant: Variant::Experimental,
        stated: common::stated("ocean-blues"),
        interaction_count: 0,
        created_at_ms: 1_700_000_000_000,
        completed_at_ms: None,
    }
}

fn choice(session_id: &str, seq: u32) -> ChoiceRecord {
    let pair = fallback_pair(Category::Style);
    ChoiceRecord {
        session_id: session_id.to_string(),
        event: ComparisonEvent {
            left: pair.left,
            right: pair.right,
            chosen: ChosenSide::Left,
            latency_ms: 1200,
            sequence_index: seq,
        },
        recorded_at_ms: 1_700_000_000_000 + seq as i64,
    }
}

#[tokio::test]
async fn catalog_upsert_and_lookup() {
    let (_dir, store) = open_temp().await;
    assert_eq!(store.kind(), "sqlite");
    store.ping().await.expect("ping");

    let items = common::catalog(3);
    assert_eq!(store.upsert_items(&items).await.expect("upsert"), 12);

    let style = store.list_by_category(Category::Style).await.expect("list");
    assert_eq!(style.len(), 3);
    assert!(style.iter().all(|item| item.category == Category::Style));

    let found = store.lookup_by_ids(&[402, 999, 100]).await.expect("lookup");
    let ids: Vec<i64> = found.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![402, 100]);

    let mut renamed = items[0].clone();
    renamed.style = Some("pop art".to_string());
    store.upsert_items(&[renamed]).await.expect("upsert again");
    let found = store.lookup_by_ids(&[items[0].id]).await.expect("lookup");
    assert_eq!(found[0].style.as_deref(), Some("pop art"));
}

#[tokio::test]
async fn session_lifecycle_is_persisted() {
    let (_dir, store) = open_temp().await;
    let record = session("s-1");
    let blob = encode(&PreferenceModel::new()).expect("encode");
    store.create_session(&record, &blob).await.expect("create");

    assert_eq!(store.get_session("s-1").await.expect("get"), Some(record.clone()));
    assert!(store.get_session("other").await.expect("get").is_none());

    store.commit_choice(&choice("s-1", 1), &blob).await.expect("commit 1");
    store.commit_choice(&choice("s-1", 2), &blob).await.expect("commit 2");
    let history = store.list_choices("s-1").await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], choice("s-1", 2));
    assert_eq!(
        store.get_session("s-1").await.expect("get").map(|s| s.interaction_count),
        Some(2)
    );

    let model = PreferenceModel::new();
    let summary = taste_discovery::taste::finalizer::finalize(&model, &record.stated);
    let metrics = AlgorithmMetricsRecord::from_session(
        &record,
        &[choice("s-1", 1).event],
        &model,
        1_700_000_060_000,
    );
    store
        .complete_session(&choice("s-1", 3), &blob, &summary, &metrics, 1_700_000_060_000)
        .await
        .expect("complete");

    let closed = store.get_session("s-1").await.expect("get").expect("exists");
    assert!(closed.is_complete());
    assert_eq!(closed.interaction_count, 3);
    assert_eq!(store.get_summary("s-1").await.expect("summary"), Some(summary));
    let stored = store.list_metrics(10).await.expect("metrics");
    assert_eq!(stored, vec![metrics]);
}

#[tokio::test]
async fn writes_for_unknown_session_are_rejected() {
    let (_dir, store) = open_temp().await;
    let err = store
        .commit_choice(&choice("ghost", 1), "{}")
        .await
        .expect_err("no such session");
    assert!(matches!(err, StoreError::SessionNotFound(_)));
    assert!(store.list_choices("ghost").await.expect("history").is_empty());

    let err = store.save_snapshot("ghost", "{}").await.expect_err("fk");
    assert!(matches!(err, StoreError::SessionNotFound(_)));
}

#[tokio::test]
async fn duplicate_sequence_rolls_back_whole_commit() {
    let (_dir, store) = open_temp().await;
    let blob = encode(&PreferenceModel::new()).expect("encode");
    store.create_session(&session("s-2"), &blob).await.expect("create");
    store.commit_choice(&choice("s-2", 1), &blob).await.expect("commit");

    let changed = "changed snapshot";
    assert!(store.commit_choice(&choice("s-2", 1), changed).await.is_err());
    assert_eq!(store.load_snapshot("s-2").await.expect("load").as_deref(), Some(blob.as_str()));
    assert_eq!(
        store.get_session("s-2").await.expect("get").map(|s| s.interaction_count),
        Some(1)
    );
}

#[tokio::test]
async fn metrics_are_listed_newest_first() {
    let (_dir, store) = open_temp().await;
    let blob = encode(&PreferenceModel::new()).expect("encode");
    let model = PreferenceModel::new();
    for (i, id) in ["a", "b", "c"].iter().enumerate() {
        let record = session(id);
        store.create_session(&record, &blob).await.expect("create");
        let at = 1_700_000_100_000 + i as i64;
        let summary = taste_discovery::taste::finalizer::finalize(&model, &record.stated);
        let metrics = AlgorithmMetricsRecord::from_session(&record, &[], &model, at);
        store
            .complete_session(&choice(id, 1), &blob, &summary, &metrics, at)
            .await
            .expect("complete");
    }
    let ids: Vec<String> = store
        .list_metrics(2)
        .await
        .expect("metrics")
        .into_iter()
        .map(|r| r.session_id)
        .collect();
    assert_eq!(ids, vec!["c", "b"]);
}

#[tokio::test]
async fn reopening_keeps_schema_and_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("taste.db");
    {
        let store = SqliteStore::open(&path).await.expect("open");
        store.upsert_items(&common::catalog(2)).await.expect("upsert");
        store.pool().close().await;
    }
    let store = SqliteStore::open(&path).await.expect("reopen");
    assert_eq!(store.list_by_category(Category::Color).await.expect("list").len(), 2);
}

#[tokio::test]
async fn engine_session_survives_on_sqlite() {
    let (_dir, store) = open_temp().await;
    store.upsert_items(&common::catalog(6)).await.expect("seed");
    let engine = TasteEngine::with_tracing_metrics(common::test_config(5), store.clone());

    let start = engine
        .start_session_with_variant(common::stated("warm"), Variant::Experimental)
        .await
        .expect("start");
    let mut pair = start.first_pair;
    for seq in 1..=5 {
        let event = ComparisonEvent {
            left: pair.left.clone(),
            right: pair.right.clone(),
            chosen: if seq % 2 == 0 { ChosenSide::Right } else { ChosenSide::Left },
            latency_ms: 700 * seq as i64,
            sequence_index: seq,
        };
        match engine.submit_choice(&start.session_id, event).await.expect("submit") {
            ChoiceOutcome::InProgress { next_pair, .. } => pair = next_pair,
            ChoiceOutcome::Complete { summary } => {
                assert_eq!(seq, 5);
                assert_eq!(engine.summary(&start.session_id).await.expect("summary"), summary);
            }
        }
    }

    let raw = store
        .load_snapshot(&start.session_id)
        .await
        .expect("load")
        .expect("snapshot exists");
    let stored = decode(&raw).expect("decode");
    let replayed = engine
        .rebuild_from_history(&start.session_id)
        .await
        .expect("rebuild");
    assert!(stored.same_evidence(&replayed, 1e-9));
    assert_eq!(engine.metrics_report().await.expect("report").total_sessions, 1);
}
