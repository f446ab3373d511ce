// tests/ingest_dedup.rs
use announcement_poller::ingest::dedup::SeenStore;
use announcement_poller::ingest::types::RawRecord;
use serde_json::{json, Value};

fn recs(v: Value) -> Vec<RawRecord> {
    v.as_array()
        .expect("array fixture")
        .iter()
        .map(|x| x.as_object().cloned().expect("object record"))
        .collect()
}

#[test]
fn same_set_twice_yields_nothing_new() {
    let store = SeenStore::new();
    let batch = json!([
        {"seq_id": "A", "symbol": "X"},
        {"seq_id": "B", "symbol": "Y"},
        {"seq_id": "C", "symbol": "Z"}
    ]);

    let first = store.apply(recs(batch.clone()));
    assert_eq!(first.entries.len(), 3);

    let second = store.apply(recs(batch));
    assert!(second.entries.is_empty());
    assert_eq!(second.new_count, 0);
    assert!(!second.fallback);
}

#[test]
fn id_missing_for_one_poll_is_new_again() {
    let store = SeenStore::new();
    store.apply(recs(json!([{"seq_id": "A"}, {"seq_id": "B"}])));

    // poll N+1: A drops out
    let mid = store.apply(recs(json!([{"seq_id": "B"}])));
    assert!(mid.entries.is_empty());
    assert!(!store.contains("A"));

    // poll N+2: A is back and reported again
    let back = store.apply(recs(json!([{"seq_id": "A"}, {"seq_id": "B"}])));
    assert_eq!(back.entries.len(), 1);
    assert_eq!(back.entries[0]["seq_id"], "A");
}

#[test]
fn two_fresh_records_on_empty_store() {
    let store = SeenStore::new();
    let out = store.apply(recs(json!([
        {"seq_id": "A", "symbol": "X"},
        {"seq_id": "B", "symbol": "Y"}
    ])));
    assert_eq!(out.entries.len(), 2);
    assert_eq!(out.entries[0]["symbol"], "X");
    assert_eq!(out.entries[1]["symbol"], "Y");

    let mut ids: Vec<String> = store.snapshot().into_iter().collect();
    ids.sort();
    assert_eq!(ids, vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn concurrent_applies_keep_a_consistent_set() {
    use std::sync::Arc;
    use std::thread;

    let store = Arc::new(SeenStore::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let batch = json!([{"seq_id": format!("{i}-a")}, {"seq_id": format!("{i}-b")}]);
                store.apply(recs(batch))
            })
        })
        .collect();

    for h in handles {
        let out = h.join().expect("thread");
        // each batch is disjoint from every other, so it is always fully new
        assert_eq!(out.entries.len(), 2);
    }
    // full replacement: only the last writer's ids remain
    assert_eq!(store.len(), 2);
}
