// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the replay engine.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use super::super::test_helpers::*;
use super::*;
use opq_core::Verb;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};

type TestEngine = ReplayEngine<MockClient, Arc<FlakyStore>>;

struct Fixture {
    queue: OperationQueue,
    store: Arc<FlakyStore>,
    snapshotter: Arc<QueueSnapshotter<Arc<FlakyStore>>>,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(FlakyStore::new());
        Fixture {
            queue: OperationQueue::new(),
            snapshotter: Arc::new(QueueSnapshotter::new(Arc::clone(&store), "cache")),
            store,
        }
    }

    fn engine(&self, client: MockClient) -> TestEngine {
        ReplayEngine::new(
            self.queue.clone(),
            Arc::clone(&self.snapshotter),
            client,
            Duration::from_millis(1000),
        )
    }

    fn enqueue(&self, verb: Verb, url: &str, n: i64) -> Operation {
        self.queue.enqueue(verb, url, json!({ "n": n })).unwrap()
    }

    /// Persists the current queue, as a deactivation would have.
    fn persist(&self) {
        self.snapshotter.persist(&self.queue.snapshot()).unwrap();
    }
}

#[tokio::test]
async fn full_drain_delivers_in_order_and_clears_everything() {
    let fx = Fixture::new();
    fx.enqueue(Verb::Create, "/a", 1);
    fx.enqueue(Verb::Update, "/a", 2);
    fx.persist();

    let client = MockClient::new();
    let sent = client.sent_log();
    let engine = fx.engine(client);

    let report = engine
        .drain(&test_target(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.delivered, 2);
    assert_eq!(report.rejected, 0);
    assert!(report.completed);
    assert!(report.snapshot_synced);
    assert_eq!(report.halted_at, None);

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        (sent[0].method, sent[0].url.as_str(), &sent[0].payload),
        ("POST", "http://remote.test/a", &json!({"n": 1}))
    );
    assert_eq!(
        (sent[1].method, sent[1].url.as_str(), &sent[1].payload),
        ("PUT", "http://remote.test/a", &json!({"n": 2}))
    );
    assert!(sent.iter().all(|s| s.token.as_deref() == Some("secret")));

    assert!(fx.queue.is_empty());
    assert!(fx.snapshotter.restore().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_halts_and_keeps_suffix() {
    let fx = Fixture::new();
    let first = fx.enqueue(Verb::Create, "/a", 1);
    let second = fx.enqueue(Verb::Create, "/b", 2);
    let third = fx.enqueue(Verb::Update, "/b", 3);
    fx.persist();

    let client = MockClient::with_script([delivered(), unreachable()]);
    let sent = client.sent_log();
    let engine = fx.engine(client);

    let report = engine
        .drain(&test_target(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.attempted, 2);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.rejected, 0);
    assert!(!report.completed);
    assert_eq!(report.halted_at, Some(second.sequence()));

    // The third operation was never sent.
    assert_eq!(sent.lock().unwrap().len(), 2);

    let expected = vec![second, third];
    assert_eq!(fx.queue.snapshot(), expected);
    assert_eq!(fx.snapshotter.restore().unwrap(), expected);
    assert!(!fx.queue.snapshot().contains(&first));
}

#[tokio::test]
async fn rejection_is_recorded_and_drain_continues() {
    let fx = Fixture::new();
    let first = fx.enqueue(Verb::Create, "/a", 1);
    fx.enqueue(Verb::Update, "/a", 2);

    let engine = fx.engine(MockClient::with_script([rejected(422), delivered()]));
    let report = engine
        .drain(&test_target(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.rejected, 1);
    assert!(report.completed);
    assert_eq!(
        report.rejections,
        vec![Rejection {
            sequence: first.sequence(),
            url: "/a".into(),
            status: Some(422),
            reason: "HTTP 422".into(),
        }]
    );
    assert!(fx.queue.is_empty());
}

#[tokio::test]
async fn enqueue_during_drain_waits_for_next_drain() {
    let fx = Fixture::new();
    fx.enqueue(Verb::Create, "/a", 1);
    fx.enqueue(Verb::Create, "/b", 2);

    let live = fx.queue.clone();
    let once = AtomicBool::new(false);
    let client = MockClient::new().on_request(move |_| {
        if !once.swap(true, Ordering::SeqCst) {
            live.enqueue(Verb::Update, "/late", json!({"n": 3})).unwrap();
        }
    });
    let sent = client.sent_log();
    let engine = fx.engine(client);

    let report = engine
        .drain(&test_target(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.attempted, 2);
    assert!(report.completed);
    assert_eq!(sent.lock().unwrap().len(), 2);

    let remaining = fx.queue.snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].url(), "/late");

    // The late operation is picked up by the next drain.
    let report = engine
        .drain(&test_target(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.delivered, 1);
    assert!(fx.queue.is_empty());
}

#[tokio::test]
async fn second_drain_is_refused_while_first_runs() {
    let fx = Fixture::new();
    let first = fx.enqueue(Verb::Create, "/a", 1);
    let second = fx.enqueue(Verb::Create, "/b", 2);
    fx.persist();

    let client = MockClient::with_script([Reply::Hang]);
    let started = client.started();
    let engine = Arc::new(fx.engine(client));
    let cancel = CancellationToken::new();

    let running = {
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.drain(&test_target(), &cancel).await })
    };
    started.notified().await;

    assert!(engine.is_draining());
    assert!(matches!(
        engine.drain(&test_target(), &CancellationToken::new()).await,
        Err(ReplayError::DrainInProgress)
    ));

    cancel.cancel();
    let report = running.await.unwrap().unwrap();
    assert!(report.cancelled);
    assert!(!report.completed);
    assert_eq!(report.attempted, 1);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.halted_at, Some(first.sequence()));

    // The unconfirmed request is kept for retry.
    let expected = vec![first, second];
    assert_eq!(fx.queue.snapshot(), expected);
    assert_eq!(fx.snapshotter.restore().unwrap(), expected);
    assert!(!engine.is_draining());
}

#[tokio::test]
async fn cancelled_between_requests_keeps_unsent_suffix() {
    let fx = Fixture::new();
    fx.enqueue(Verb::Create, "/a", 1);
    let second = fx.enqueue(Verb::Create, "/b", 2);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let client = MockClient::new().on_request(move |_| trigger.cancel());
    let engine = fx.engine(client);

    let report = engine.drain(&test_target(), &cancel).await.unwrap();

    // Cancellation wins over the in-flight request (biased select), so the
    // first operation stays too.
    assert!(report.cancelled);
    assert_eq!(report.delivered, 0);
    assert_eq!(fx.queue.len(), 2);
    assert!(fx.queue.snapshot().contains(&second));
}

#[tokio::test]
async fn precancelled_drain_sends_nothing() {
    let fx = Fixture::new();
    let first = fx.enqueue(Verb::Create, "/a", 1);

    let client = MockClient::new();
    let sent = client.sent_log();
    let engine = fx.engine(client);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = engine.drain(&test_target(), &cancel).await.unwrap();
    assert_eq!(report.attempted, 0);
    assert!(report.cancelled);
    assert_eq!(report.halted_at, Some(first.sequence()));
    assert!(sent.lock().unwrap().is_empty());
    assert_eq!(fx.queue.len(), 1);
}

#[tokio::test]
async fn empty_drain_completes_and_clears_snapshot() {
    let fx = Fixture::new();
    fx.enqueue(Verb::Create, "/a", 1);
    fx.persist();
    fx.queue.clear_all();

    let engine = fx.engine(MockClient::new());
    let report = engine
        .drain(&test_target(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.attempted, 0);
    assert!(report.completed);
    assert!(fx.snapshotter.restore().unwrap().is_empty());
}

#[tokio::test]
async fn snapshot_failure_does_not_fail_drain() {
    let fx = Fixture::new();
    fx.enqueue(Verb::Create, "/a", 1);
    let second = fx.enqueue(Verb::Create, "/b", 2);
    fx.store.fail_writes(true);

    let engine = fx.engine(MockClient::with_script([delivered(), unreachable()]));
    let report = engine
        .drain(&test_target(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.snapshot_synced);
    assert_eq!(report.delivered, 1);
    assert_eq!(fx.queue.snapshot(), vec![second]);
}

#[tokio::test]
async fn exclusive_guard_blocks_drain() {
    let fx = Fixture::new();
    fx.enqueue(Verb::Create, "/a", 1);
    let engine = fx.engine(MockClient::new());

    let guard = engine.exclusive().await;
    assert!(!engine.is_draining());
    assert!(matches!(
        engine.drain(&test_target(), &CancellationToken::new()).await,
        Err(ReplayError::DrainInProgress)
    ));
    drop(guard);

    assert!(engine
        .drain(&test_target(), &CancellationToken::new())
        .await
        .is_ok());
    assert_eq!(engine.timeout(), Duration::from_millis(1000));
    assert!(engine.queue().is_empty());
}

#[tokio::test]
async fn dropped_drain_commits_settled_prefix() {
    let fx = Fixture::new();
    fx.enqueue(Verb::Create, "/a", 1);
    let second = fx.enqueue(Verb::Create, "/b", 2);
    fx.persist();

    let client = MockClient::with_script([delivered(), Reply::Hang]);
    let sent = client.sent_log();
    let engine = fx.engine(client);

    {
        let cancel = CancellationToken::new();
        let target = test_target();
        let drain = engine.drain(&target, &cancel);
        tokio::pin!(drain);
        let second_sent = async {
            while sent.lock().unwrap().len() < 2 {
                tokio::task::yield_now().await;
            }
        };
        tokio::select! {
            _ = &mut drain => panic!("drain should hang on the second request"),
            () = second_sent => {}
        }
        assert!(engine.is_draining());
    }

    // The first operation was delivered and must not be sent again.
    assert!(!engine.is_draining());
    assert_eq!(fx.queue.snapshot(), vec![second.clone()]);
    assert_eq!(fx.snapshotter.restore().unwrap(), vec![second]);

    let report = engine
        .drain(&test_target(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.delivered, 1);
}
