//! Match lifecycle tests against recording outboxes
//!
//! These cover the delivery edges: who hears what, in which order, and what
//! happens when a connection is already gone.

use gomoku_relay::error::GameError;
use gomoku_relay::protocol::{ClientMessage, ServerMessage};
use gomoku_relay::types::ConnectionState;
use std::sync::Arc;

use crate::fixtures::{create_test_server, RecordingOutbox};

#[tokio::test]
async fn test_pairing_follows_arrival_order() {
    let server = create_test_server();
    let outboxes: Vec<Arc<RecordingOutbox>> =
        (0..3).map(|_| Arc::new(RecordingOutbox::new())).collect();
    let ids: Vec<_> = outboxes
        .iter()
        .map(|outbox| server.connect(outbox.clone()).unwrap())
        .collect();

    for id in &ids {
        server
            .handle_message(*id, ClientMessage::JoinQueue)
            .await
            .unwrap();
    }

    assert_eq!(server.registry().other_participant(ids[0]), Some(ids[1]));
    assert_eq!(server.connection_state(ids[2]), ConnectionState::Queued);
    assert_eq!(outboxes[0].count_of("match_started"), 1);
    assert_eq!(outboxes[1].count_of("match_started"), 1);
    assert!(outboxes[2].messages().is_empty());
}

#[tokio::test]
async fn test_unreachable_participant_at_match_start() {
    let server = create_test_server();
    let live = Arc::new(RecordingOutbox::new());
    let gone = Arc::new(RecordingOutbox::closed());
    let a = server.connect(live.clone()).unwrap();
    let b = server.connect(gone.clone()).unwrap();

    server.join_queue(a).await.unwrap();
    server.join_queue(b).await.unwrap();

    // Start first, then the forced end
    let messages = live.messages();
    assert_eq!(messages.len(), 2);
    assert!(matches!(messages[0], ServerMessage::MatchStarted { .. }));
    assert_eq!(messages[1], ServerMessage::MatchEndedByPeer);

    assert_eq!(server.connection_state(a), ConnectionState::Idle);
    assert_eq!(server.connection_state(b), ConnectionState::Closed);
    assert_eq!(server.stats().active_matches, 0);
}

#[tokio::test]
async fn test_end_match_outside_a_match_is_harmless() {
    let server = create_test_server();
    let outbox = Arc::new(RecordingOutbox::new());
    let id = server.connect(outbox.clone()).unwrap();

    tokio_test::assert_ok!(server.handle_message(id, ClientMessage::EndMatch).await);

    assert!(outbox.messages().is_empty());
    assert_eq!(server.connection_state(id), ConnectionState::Idle);
}

#[tokio::test]
async fn test_out_of_range_move_is_rejected_before_relay() {
    let server = create_test_server();
    let first = Arc::new(RecordingOutbox::new());
    let second = Arc::new(RecordingOutbox::new());
    let a = server.connect(first.clone()).unwrap();
    let b = server.connect(second.clone()).unwrap();
    server.join_queue(a).await.unwrap();
    server.join_queue(b).await.unwrap();

    for (row, col) in [(-1, 0), (0, 15), (99, 99)] {
        let result = server
            .handle_message(a, ClientMessage::MovePlaced { row, col })
            .await;
        assert!(matches!(result, Err(GameError::InvalidPlacement { .. })));
    }

    assert_eq!(first.count_of("rejected"), 3);
    assert_eq!(second.count_of("opponent_moved"), 0);
    assert_eq!(server.connection_state(a), ConnectionState::InMatch);

    let collector = server.metrics_collector();
    assert_eq!(
        collector
            .relay()
            .rejected_messages_total
            .with_label_values(&["invalid_placement"])
            .get(),
        3
    );
}

#[tokio::test]
async fn test_closed_connection_cannot_join() {
    let server = create_test_server();
    let outbox = Arc::new(RecordingOutbox::new());
    let id = server.connect(outbox.clone()).unwrap();

    server.disconnect(id).await.unwrap();
    assert_eq!(
        server.join_queue(id).await.unwrap(),
        ConnectionState::Closed
    );
    assert!(server.queue().is_empty());
}
