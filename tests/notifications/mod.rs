use std::time::Duration;

use toggle_cache::Error;
use toggle_cache::FetchError;
use toggle_cache::ToggleDiff;

use crate::common::client_for;
use crate::common::next_event;
use crate::common::EtcdStub;
use crate::enable_logger;

#[tokio::test]
async fn test_flipped_toggle_is_published_once() {
    enable_logger();
    let stub = EtcdStub::start().await;
    let client = client_for(vec![stub.endpoint()]);
    client.initialise().await.unwrap();
    let mut updates = client.on_update();

    stub.serve(&[("mytoggle", "false", 79)]);
    let event = next_event(&mut updates).await;

    assert_eq!(event.version, 79);
    assert_eq!(
        event.changes,
        vec![ToggleDiff::Changed {
            name: "mytoggle".into(),
            old: true,
            new: false,
        }]
    );
    assert_eq!(client.get("mytoggle"), Some(false));

    // Later ticks see identical data and publish nothing
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(updates.try_recv().is_err());

    client.shutdown().await;
}

#[tokio::test]
async fn test_added_and_removed_toggles_are_published() {
    enable_logger();
    let stub = EtcdStub::start().await;
    let client = client_for(vec![stub.endpoint()]);
    client.initialise().await.unwrap();
    let mut updates = client.on_update();

    stub.serve(&[("beta", "true", 80), ("gamma", "false", 81)]);
    let event = next_event(&mut updates).await;

    assert_eq!(event.version, 81);
    assert_eq!(
        event.changes,
        vec![
            ToggleDiff::Added {
                name: "beta".into(),
                value: true,
            },
            ToggleDiff::Added {
                name: "gamma".into(),
                value: false,
            },
            ToggleDiff::Removed {
                name: "mytoggle".into(),
            },
        ]
    );
    assert_eq!(client.get("mytoggle"), None);

    client.shutdown().await;
}

#[tokio::test]
async fn test_store_outage_is_reported_and_values_kept() {
    enable_logger();
    let stub = EtcdStub::start().await;
    let client = client_for(vec![stub.endpoint()]);
    client.initialise().await.unwrap();
    let mut errors = client.on_error();

    stub.fail_with(503);
    let error = next_event(&mut errors).await;

    assert!(matches!(
        error.as_ref(),
        Error::Fetch(FetchError::Status { status: 503, .. })
    ));
    assert_eq!(client.get("mytoggle"), Some(true));
    assert!(client.is_running());

    client.shutdown().await;
}

#[tokio::test]
async fn test_invalid_value_is_reported_and_snapshot_kept() {
    enable_logger();
    let stub = EtcdStub::start().await;
    let client = client_for(vec![stub.endpoint()]);
    client.initialise().await.unwrap();
    let mut errors = client.on_error();
    let mut updates = client.on_update();

    stub.serve(&[("mytoggle", "false", 79), ("broken", "yes", 80)]);
    let error = next_event(&mut errors).await;

    assert!(matches!(
        error.as_ref(),
        Error::Fetch(FetchError::InvalidToggleValue { ref name, .. }) if name == "broken"
    ));
    assert_eq!(client.get("mytoggle"), Some(true));
    assert!(updates.try_recv().is_err());

    client.shutdown().await;
}

#[tokio::test]
async fn test_slow_subscriber_does_not_block_refresh() {
    enable_logger();
    let stub = EtcdStub::start().await;
    let client = client_for(vec![stub.endpoint()]);
    client.initialise().await.unwrap();

    // Never drained
    let _stalled = client.on_update();
    let mut watcher = client.on_update();

    for (i, value) in ["false", "true", "false"].iter().enumerate() {
        stub.serve(&[("mytoggle", value, 100 + i as u64)]);
        let event = next_event(&mut watcher).await;
        assert_eq!(event.version, 100 + i as u64);
    }
    assert_eq!(client.get("mytoggle"), Some(false));

    client.shutdown().await;
}
