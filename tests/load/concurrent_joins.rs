//! Concurrency stress tests for pairing
//!
//! Many connections join at once from separate tasks; every participant must
//! end up in exactly one match.

use futures::future::join_all;
use gomoku_relay::protocol::{ClientMessage, ServerMessage};
use gomoku_relay::types::ConnectionState;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::fixtures::{create_test_server, RecordingOutbox};

const CONNECTIONS: usize = 200;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_pair_everyone_once() {
    let server = create_test_server();
    let outboxes: Vec<Arc<RecordingOutbox>> = (0..CONNECTIONS)
        .map(|_| Arc::new(RecordingOutbox::new()))
        .collect();
    let ids: Vec<_> = outboxes
        .iter()
        .map(|outbox| server.connect(outbox.clone()).unwrap())
        .collect();

    let start = Instant::now();
    let joins = ids.iter().map(|&id| {
        let server = server.clone();
        tokio::spawn(async move { server.handle_message(id, ClientMessage::JoinQueue).await })
    });
    for result in join_all(joins).await {
        result.unwrap().unwrap();
    }
    let elapsed = start.elapsed();

    assert!(server.queue().is_empty());
    assert_eq!(server.stats().active_matches, CONNECTIONS / 2);

    let mut seen = HashSet::new();
    for (id, outbox) in ids.iter().zip(&outboxes) {
        assert_eq!(server.connection_state(*id), ConnectionState::InMatch);
        assert_eq!(outbox.count_of("match_started"), 1);

        let peer = server.registry().other_participant(*id).unwrap();
        assert_eq!(server.registry().other_participant(peer), Some(*id));
        assert!(seen.insert(*id));
    }

    // Exactly one side of every match moves first
    let first_movers = outboxes
        .iter()
        .filter(|outbox| {
            outbox
                .messages()
                .contains(&ServerMessage::MatchStarted { goes_first: true })
        })
        .count();
    assert_eq!(first_movers, CONNECTIONS / 2);

    println!("Paired {} connections in {:?}", CONNECTIONS, elapsed);
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_disconnects_notify_each_survivor_once() {
    let server = create_test_server();
    let outboxes: Vec<Arc<RecordingOutbox>> = (0..CONNECTIONS)
        .map(|_| Arc::new(RecordingOutbox::new()))
        .collect();
    let ids: Vec<_> = outboxes
        .iter()
        .map(|outbox| server.connect(outbox.clone()).unwrap())
        .collect();
    for &id in &ids {
        server.join_queue(id).await.unwrap();
    }

    // Pairs form in arrival order, so even indices leave and odd ones stay
    let leavers = ids.iter().step_by(2).map(|&id| {
        let server = server.clone();
        tokio::spawn(async move { server.disconnect(id).await })
    });
    for result in join_all(leavers).await {
        result.unwrap().unwrap();
    }

    assert_eq!(server.stats().active_matches, 0);
    for (i, outbox) in outboxes.iter().enumerate() {
        let expected = if i % 2 == 1 { 1 } else { 0 };
        assert_eq!(outbox.count_of("match_ended_by_peer"), expected);
    }
    assert_eq!(server.stats().connections, CONNECTIONS / 2);
}
