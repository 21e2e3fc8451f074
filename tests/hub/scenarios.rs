//! End-to-end protocol scenarios driven through sessions

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_join_binds_identity_and_subscribes() {
    let hub = TestHub::new();
    let mut a = hub.connect();

    a.send(join_frame(GENERAL, &valid_token(ALICE))).await;

    assert_eq!(
        a.recv(),
        json!({
            "type": "join_success",
            "payload": { "channelId": GENERAL, "message": "subscribed to channel" }
        })
    );
    let identity = hub.gateway().identity_of(a.session.id()).unwrap();
    assert_eq!(identity.user_id, ALICE);
    assert_eq!(identity.username, "alice");
    assert_eq!(hub.gateway().snapshot(GENERAL), vec![a.session.id()]);
}

#[tokio::test]
async fn test_message_reaches_every_subscriber() {
    let hub = TestHub::new();
    let mut a = hub.joined(ALICE, GENERAL).await;
    let mut b = hub.joined(BOB, GENERAL).await;

    a.send(message_frame(GENERAL, "hi")).await;

    let stored = hub.messages.all();
    assert_eq!(stored.len(), 1);
    let expected = json!({
        "type": "new_message",
        "payload": {
            "id": stored[0].id.to_string(),
            "content": "hi",
            "createdAt": stored[0].created_at,
            "channelId": GENERAL,
            "author": {
                "id": ALICE,
                "username": "alice",
                "avatarURL": "https://cdn.example/alice.png"
            }
        }
    });

    assert_eq!(a.recv(), expected);
    assert_eq!(b.recv(), expected);
    assert!(a.try_recv().is_none());
    assert!(b.try_recv().is_none());
}

#[tokio::test]
async fn test_expired_token_leaves_connection_unauthenticated() {
    let hub = TestHub::new();
    let mut member = hub.joined(ALICE, GENERAL).await;
    let mut c = hub.connect();

    c.send(join_frame(GENERAL, &expired_token(CAROL))).await;
    assert_eq!(
        c.recv(),
        json!({ "type": "error", "payload": { "message": "invalid or expired token" } })
    );
    assert_eq!(hub.gateway().snapshot(GENERAL), vec![member.session.id()]);

    c.send(message_frame(GENERAL, "let me in")).await;
    assert_eq!(
        c.recv(),
        json!({ "type": "error", "payload": { "message": "not authenticated" } })
    );
    assert_eq!(hub.messages.count(), 0);
    assert!(member.try_recv().is_none());
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() {
    let hub = TestHub::new();
    let mut client = hub.connect();

    client.send(join_frame(GENERAL, &valid_token(404))).await;

    assert_eq!(client.recv()["payload"]["message"], "invalid or expired token");
    assert!(hub.gateway().identity_of(client.session.id()).is_none());
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let hub = TestHub::new();
    let mut client = hub.connect();

    client.send(join_frame(GENERAL, "not-a-jwt")).await;

    assert_eq!(client.recv()["payload"]["message"], "invalid or expired token");
}

#[tokio::test]
async fn test_abrupt_disconnect_clears_every_subscription() {
    let hub = TestHub::new();
    let mut a = hub.joined(ALICE, GENERAL).await;
    a.send(join_frame(RANDOM, &valid_token(ALICE))).await;
    a.recv();
    let a_id = a.session.id();
    let mut b = hub.joined(BOB, GENERAL).await;

    drop(a);

    assert!(!hub.gateway().snapshot(GENERAL).contains(&a_id));
    assert!(hub.gateway().snapshot(RANDOM).is_empty());

    b.send(message_frame(GENERAL, "anyone there?")).await;
    assert_eq!(b.recv()["payload"]["content"], "anyone there?");
    assert_eq!(hub.gateway().connection_count(), 1);
}

#[tokio::test]
async fn test_store_failure_is_reported_only_to_sender() {
    let hub = TestHub::new();
    let mut a = hub.joined(ALICE, GENERAL).await;
    let mut b = hub.joined(BOB, GENERAL).await;
    hub.messages.fail(true);

    a.send(message_frame(GENERAL, "lost")).await;

    assert_eq!(
        a.recv(),
        json!({ "type": "error", "payload": { "message": "failed to save message" } })
    );
    assert!(a.try_recv().is_none());
    assert!(b.try_recv().is_none());

    hub.messages.fail(false);
    a.send(message_frame(GENERAL, "found")).await;
    assert_eq!(b.recv()["payload"]["content"], "found");
}

#[tokio::test]
async fn test_reply_carries_parent_message_id() {
    let hub = TestHub::new();
    let mut a = hub.joined(ALICE, GENERAL).await;

    a.send(message_frame(GENERAL, "root")).await;
    let root_id = a.recv()["payload"]["id"].as_str().unwrap().to_string();

    a.send(json!({
        "type": "new_message",
        "payload": {
            "channelId": GENERAL,
            "content": "reply",
            "parentMessageId": root_id.parse::<i64>().unwrap()
        }
    }))
    .await;

    let reply = a.recv();
    assert_eq!(reply["payload"]["parentMessageId"], root_id);
    assert_eq!(
        hub.messages.all()[1].parent_message_id,
        Some(root_id.parse::<i64>().unwrap())
    );
}

#[tokio::test]
async fn test_voice_channel_refuses_text() {
    let hub = TestHub::new();
    let mut a = hub.joined(ALICE, LOUNGE).await;

    a.send(message_frame(LOUNGE, "hello?")).await;

    assert_eq!(
        a.recv()["payload"]["message"],
        "cannot send text messages to a voice channel"
    );
    assert_eq!(hub.messages.count(), 0);
}

#[tokio::test]
async fn test_unknown_channel_refuses_message() {
    let hub = TestHub::new();
    let mut a = hub.joined(ALICE, 12345).await;

    a.send(message_frame(12345, "void")).await;

    assert_eq!(a.recv()["payload"]["message"], "channel not found");
    assert_eq!(hub.messages.count(), 0);
}

#[tokio::test]
async fn test_empty_content_is_refused() {
    let hub = TestHub::new();
    let mut a = hub.joined(ALICE, GENERAL).await;

    a.send(message_frame(GENERAL, "")).await;

    assert_eq!(
        a.recv()["payload"]["message"],
        "message content must be between 1 and 4000 characters"
    );
    assert_eq!(hub.messages.count(), 0);
}

#[tokio::test]
async fn test_posting_does_not_require_subscription() {
    let hub = TestHub::new();
    let mut a = hub.joined(ALICE, RANDOM).await;
    let mut b = hub.joined(BOB, GENERAL).await;

    a.send(message_frame(GENERAL, "drive-by")).await;

    assert_eq!(b.recv()["payload"]["content"], "drive-by");
    assert!(a.try_recv().is_none());
}

#[tokio::test]
async fn test_unknown_and_malformed_frames_are_ignored() {
    let hub = TestHub::new();
    let mut a = hub.joined(ALICE, GENERAL).await;

    a.send(json!({ "type": "typing_start", "payload": { "channelId": GENERAL } }))
        .await;
    a.send_text("definitely not json").await;
    a.send(json!({ "type": "join_channel", "payload": { "channelId": "five" } }))
        .await;
    a.send(json!({ "payload": {} })).await;

    assert!(a.try_recv().is_none());
    assert!(hub.gateway().is_connected(a.session.id()));

    a.send(message_frame(GENERAL, "still here")).await;
    assert_eq!(a.recv()["payload"]["content"], "still here");
}
