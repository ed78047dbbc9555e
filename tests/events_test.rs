//! Event dispatcher integration tests.
//!
//! Timer-driven behaviour (settle delay, deferred metadata embed) runs under a
//! paused clock so the tests are instant and deterministic.

mod common;

use std::time::Duration;

use serde_json::json;

use common::{settle, test_config, FakeControlPlane, TestHarness};
use shelfwatch::config::Config;
use shelfwatch::events::{EventDispatcher, ServerEvent};

fn harness(config: Config, control: FakeControlPlane) -> (TestHarness, EventDispatcher) {
    let h = TestHarness::new(config, control);
    let dispatcher = EventDispatcher::new(h.ctx.clone());
    (h, dispatcher)
}

// ---------------------------------------------------------------------------
// item_added
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn item_added_dispatches_after_settle_delay() {
    let (h, mut dispatcher) = harness(
        test_config(),
        FakeControlPlane::new().with_item("li_1", "mp3", 128_000, 2),
    );

    let event = dispatcher.handle("item_added", json!({"id": "li_1", "media": {}}));
    assert_eq!(
        event,
        Some(ServerEvent::ItemAdded {
            item_id: "li_1".into()
        })
    );
    assert_eq!(h.ctx.queue.len(), 1);

    tokio::time::sleep(Duration::from_secs(14)).await;
    assert!(h.control.encoded_ids().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.control.encoded_ids(), vec!["li_1"]);
}

#[tokio::test(start_paused = true)]
async fn repeated_item_added_is_not_deduplicated() {
    let (h, mut dispatcher) = harness(test_config(), FakeControlPlane::new());

    dispatcher.handle("item_added", json!({"id": "li_1"}));
    dispatcher.handle("item_added", json!({"id": "li_1"}));

    assert_eq!(h.ctx.queue.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn item_added_without_id_is_dropped() {
    let (h, mut dispatcher) = harness(test_config(), FakeControlPlane::new());

    assert_eq!(dispatcher.handle("item_added", json!({"title": "x"})), None);
    assert_eq!(dispatcher.handle("item_added", json!("li_1")), None);
    assert!(h.ctx.queue.is_empty());
}

// ---------------------------------------------------------------------------
// task_finished
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn encode_finished_releases_slot_without_embed_when_disabled() {
    let (h, mut dispatcher) = harness(test_config(), FakeControlPlane::new());
    h.ctx.queue.set_running(1);

    dispatcher.handle(
        "task_finished",
        json!({"action": "encode_m4b", "data": {"libraryItemId": "li_1"}}),
    );
    assert_eq!(h.ctx.queue.running(), 0);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(h.control.embedded_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn encode_finished_embeds_metadata_after_delay() {
    let (h, mut dispatcher) = harness(
        Config {
            embed_metadata: true,
            ..test_config()
        },
        FakeControlPlane::new(),
    );
    h.ctx.queue.set_running(1);

    dispatcher.handle(
        "task_finished",
        json!({"action": "encode-m4b", "libraryItemId": "li_9"}),
    );

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(h.control.embedded_ids().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.control.embedded_ids(), vec!["li_9"]);
}

#[tokio::test(start_paused = true)]
async fn embed_needs_an_item_id() {
    let (h, mut dispatcher) = harness(
        Config {
            embed_metadata: true,
            ..test_config()
        },
        FakeControlPlane::new(),
    );
    h.ctx.queue.set_running(1);

    dispatcher.handle("task_finished", json!({"action": "encode-m4b"}));
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(h.ctx.queue.running(), 0);
    assert!(h.control.embedded_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn non_encode_task_is_ignored() {
    let (h, mut dispatcher) = harness(test_config(), FakeControlPlane::new());
    h.ctx.queue.set_running(1);

    dispatcher.handle(
        "task_finished",
        json!({"action": "embed-metadata", "libraryItemId": "li_1"}),
    );

    assert_eq!(h.ctx.queue.running(), 1);
}

#[tokio::test(start_paused = true)]
async fn encode_finished_backfills_waiting_entries() {
    let (h, mut dispatcher) = harness(
        test_config(),
        FakeControlPlane::new()
            .with_item("a", "mp3", 128_000, 2)
            .with_item("b", "mp3", 128_000, 2),
    );
    h.enqueue(&["a", "b"]);
    h.ctx.queue.try_dispatch().await;
    assert_eq!(h.control.encoded_ids(), vec!["a"]);

    dispatcher.handle("task_finished", json!({"action": "encode-m4b", "libraryItemId": "a"}));
    settle().await;

    assert_eq!(h.control.encoded_ids(), vec!["a", "b"]);
    assert_eq!(h.ctx.queue.running(), 1);
}

#[tokio::test(start_paused = true)]
async fn encode_finished_on_empty_queue_exits_when_draining() {
    let (h, mut dispatcher) = harness(
        Config {
            exit_when_drained: true,
            ..test_config()
        },
        FakeControlPlane::new(),
    );
    h.ctx.queue.set_running(1);

    dispatcher.handle("task_finished", json!({"action": "encode-m4b"}));
    settle().await;

    assert!(h.ctx.shutdown.is_cancelled());
}

// ---------------------------------------------------------------------------
// Other events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn progress_with_missing_fields_is_dropped() {
    let (_h, mut dispatcher) = harness(test_config(), FakeControlPlane::new());

    assert_eq!(dispatcher.handle("task_progress", json!({"progress": 50})), None);
    assert!(dispatcher
        .handle("task_progress", json!({"libraryItemId": "a", "progress": 50}))
        .is_some());
}

#[tokio::test]
async fn unknown_events_are_ignored() {
    let (h, mut dispatcher) = harness(test_config(), FakeControlPlane::new());

    let event = dispatcher.handle("library_scan_complete", json!({"id": "lib_1"}));

    assert_eq!(event, Some(ServerEvent::Other("library_scan_complete".into())));
    assert!(h.ctx.queue.is_empty());
}
