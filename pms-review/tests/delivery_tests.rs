//! Live delivery integration tests
//!
//! Workflow operations pushing to connected recipients through the registry.

mod helpers;

use helpers::setup_world;
use pms_review::models::SubWorkflow;
use pms_review::services::ChannelGuard;
use serde_json::Value;

#[tokio::test]
async fn test_submit_pushes_to_every_tab_of_recipient() {
    // Given: Bob has two tabs open, Carol one
    let world = setup_world().await.unwrap();
    let (_, mut tab1) = world.state.registry.connect(world.bob.id);
    let (_, mut tab2) = world.state.registry.connect(world.bob.id);
    let (_, mut carol) = world.state.registry.connect(world.carol.id);

    // When: Alice submits to Bob
    world
        .state
        .engine
        .submit(&world.request(SubWorkflow::Agreement, &world.alice))
        .await
        .unwrap();

    // Then: both of Bob's tabs get the notification, Carol gets nothing
    for rx in [&mut tab1, &mut tab2] {
        let event = rx.try_recv().unwrap();
        assert_eq!(event.event, "notification");
        assert_eq!(event.data["kind"], "agreement");
        assert_eq!(event.data["quarter"], "Q1");
        assert_eq!(event.data["senderId"], world.alice.id.to_string());
        assert!(event.data["timestamp"].is_i64());
    }
    assert!(carol.try_recv().is_err());
}

#[tokio::test]
async fn test_recall_pushes_timestamp_only_payload() {
    let world = setup_world().await.unwrap();
    let request = world.request(SubWorkflow::Agreement, &world.alice);
    world.state.engine.submit(&request).await.unwrap();

    let (_, mut rx) = world.state.registry.connect(world.bob.id);
    world.state.engine.recall(&request).await.unwrap();

    let event = rx.try_recv().unwrap();
    assert_eq!(event.event, "notification");
    let data = event.data.as_object().unwrap();
    assert_eq!(data.len(), 1);
    assert!(matches!(data.get("timestamp"), Some(Value::Number(_))));
}

#[tokio::test]
async fn test_offline_recipient_is_not_an_error() {
    let world = setup_world().await.unwrap();
    assert!(!world.state.registry.is_connected(world.bob.id));

    world
        .state
        .engine
        .submit(&world.request(SubWorkflow::Agreement, &world.alice))
        .await
        .unwrap();

    // Nothing is queued for later
    let (_, mut rx) = world.state.registry.connect(world.bob.id);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_send_back_pushes_to_owner_and_actor() {
    let world = setup_world().await.unwrap();
    world
        .state
        .engine
        .submit(&world.request(SubWorkflow::Assessment, &world.alice))
        .await
        .unwrap();

    let (_, mut alice_rx) = world.state.registry.connect(world.alice.id);
    let (_, mut bob_rx) = world.state.registry.connect(world.bob.id);

    world
        .state
        .engine
        .send_back(&world.request(SubWorkflow::Assessment, &world.bob), "more detail")
        .await
        .unwrap();

    let to_alice = alice_rx.try_recv().unwrap();
    assert_eq!(to_alice.data["kind"], "resolve_assessment");
    assert_eq!(to_alice.data["recipientId"], world.alice.id.to_string());

    let to_bob = bob_rx.try_recv().unwrap();
    assert_eq!(to_bob.event, "notification");
}

#[tokio::test]
async fn test_dropped_guard_stops_delivery() {
    let world = setup_world().await.unwrap();
    let registry = world.state.registry.clone();

    let (channel_id, _rx) = registry.connect(world.bob.id);
    let guard = ChannelGuard::new(registry.clone(), world.bob.id, channel_id);
    assert_eq!(registry.channel_count(world.bob.id), 1);

    drop(guard);

    assert!(!registry.is_connected(world.bob.id));
    assert_eq!(
        world.state.router.notify(world.bob.id, Value::Null),
        0
    );
}
