//! Memory Test Suite: awareness tiers, interaction logs, client partitioning
//!
//! Test 1: Short-term memory never exceeds attention
//! Test 2: Five turns with attention three
//! Test 3: Log replay restores both tiers for a new identity
//! Test 4: Corrupt log lines are skipped
//! Test 5: Concurrent turns of one client are all persisted
//! Test 6: Client keys never appear as directory names

use beemind::memory::client_dir_name;
use beemind::{Attention, Awareness, Identity, Interaction, InteractionLog, Memories};
use chrono::Utc;
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

fn turn(query: &str, client: &str) -> Interaction {
    Interaction::new(query, Utc::now(), Vec::new(), client)
}

fn queries<'a>(interactions: impl Iterator<Item = &'a Interaction>) -> Vec<String> {
    interactions.map(|i| i.query.clone()).collect()
}

/// Test 1: Attention bound holds after every add
#[test]
fn attention_bounds_short_term() {
    for limit in [1, 2, 10] {
        let mut awareness = Awareness::new(Attention::Limited(limit));
        for n in 0..25 {
            awareness.add(turn(&format!("q{}", n), "alice"));
            assert!(awareness.short_term().count() <= limit);
            assert_eq!(awareness.len(), n + 1);
        }
    }

    let mut unbounded = Awareness::new(Attention::Unbounded);
    for n in 0..25 { unbounded.add(turn(&format!("q{}", n), "alice")); }
    assert_eq!(unbounded.short_term().count(), 25);
    assert!(unbounded.long_term().is_empty());
}

/// Test 2: Latest three stay short-term, the two oldest move on
#[test]
fn five_turns_attention_three() {
    let mut awareness = Awareness::new(Attention::Limited(3));
    for q in ["one", "two", "three", "four", "five"] { awareness.add(turn(q, "bob")); }

    assert_eq!(queries(awareness.cognitions()), vec!["five", "four", "three"]);
    assert_eq!(queries(awareness.long_term().iter()), vec!["one", "two"]);
    assert_eq!(queries(awareness.history()), vec!["five", "four", "three", "two", "one"]);
}

/// Test 3: A second identity over the same directory sees the same memory
#[tokio::test]
async fn log_replay_restores_memory() {
    let dir = TempDir::new().expect("tempdir");

    let mut first = Identity::new("carol", dir.path(), Attention::Limited(3));
    first.ensure_loaded(100).await;
    for q in ["one", "two", "three", "four", "five"] { first.add(turn(q, "carol")).await; }

    let mut second = Identity::new("carol", dir.path(), Attention::Limited(3));
    assert!(!second.is_loaded());
    second.ensure_loaded(100).await;
    assert_eq!(queries(second.cognitions().iter()), vec!["five", "four", "three"]);
    assert_eq!(second.awareness().long_term().len(), 2);

    // Only the latest `recall` lines are replayed
    let mut short = Identity::new("carol", dir.path(), Attention::Limited(3));
    short.ensure_loaded(2).await;
    assert_eq!(queries(short.awareness().history()), vec!["five", "four"]);
}

/// Test 4: A torn write or garbage line costs one record, not the log
#[tokio::test]
async fn corrupt_lines_are_skipped() {
    let dir = TempDir::new().expect("tempdir");
    let log = InteractionLog::new(dir.path().join("nested").join("log.jsonl"));

    assert!(log.load(10).await.unwrap().is_empty());

    log.append(&turn("before", "dave")).await.unwrap();
    {
        let mut file = std::fs::OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, "{{\"query\": \"torn").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "not json at all").unwrap();
    }
    log.append(&turn("after", "dave")).await.unwrap();

    let loaded = log.load(10).await.unwrap();
    assert_eq!(queries(loaded.iter()), vec!["before", "after"]);
    assert_eq!(loaded[0].client_id, beemind::memory::client_id("dave"));
}

/// Test 5: Turns of one client are serialized, nothing is lost
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_turns_are_serialized() {
    let dir = TempDir::new().expect("tempdir");
    let memories = Arc::new(Memories::new(dir.path(), Attention::Limited(5), 1000));

    let mut tasks = Vec::new();
    for n in 0..40 {
        let memories = Arc::clone(&memories);
        let client = if n % 2 == 0 { "erin" } else { "frank" };
        tasks.push(tokio::spawn(async move {
            memories.add(client, turn(&format!("q{}", n), client)).await;
        }));
    }
    for task in tasks { task.await.unwrap(); }

    assert_eq!(memories.history("erin").await.len(), 20);
    assert_eq!(memories.cognitions("frank").await.len(), 5);

    let mut clients = memories.clients();
    clients.sort();
    assert_eq!(clients, vec!["erin", "frank"]);

    let replayed = Memories::new(dir.path(), Attention::Limited(5), 1000);
    assert_eq!(replayed.history("erin").await.len(), 20);
    assert_eq!(replayed.history("frank").await.len(), 20);
}

/// Test 6: Directory names are hashes of the client key
#[tokio::test]
async fn client_dirs_are_hashed() {
    let dir = TempDir::new().expect("tempdir");
    let client = "../../etc/passwd";
    let mut identity = Identity::new(client, dir.path(), Attention::default());
    identity.ensure_loaded(10).await;
    identity.add(turn("hi", client)).await;

    assert_eq!(identity.dir(), dir.path().join(client_dir_name(client)));
    let entries: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec![client_dir_name(client)]);
}
