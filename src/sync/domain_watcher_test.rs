use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time;

use super::parse_records;
use super::DomainWatcher;
use crate::cache::DetailCache;
use crate::cache::RecordCache;
use crate::client::ChildChangeEvent;
use crate::client::MockRegistryClient;
use crate::client::NodeStat;
use crate::test_utils;
use crate::topology::Activity;
use crate::RegistryError;

fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test address")
}

type Setup = (
    DomainWatcher,
    Arc<RecordCache>,
    Arc<DetailCache>,
    mpsc::Receiver<()>,
    watch::Sender<()>,
);

fn setup(client: MockRegistryClient) -> Setup {
    let records = Arc::new(RecordCache::new());
    let details = Arc::new(DetailCache::new());
    let (activity, wake_rx) = Activity::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let watcher = DomainWatcher::new(
        "a.example.com".to_string(),
        "/dns/a.example.com".to_string(),
        Arc::new(client),
        records.clone(),
        details.clone(),
        activity,
        shutdown_rx,
    );
    (watcher, records, details, wake_rx, shutdown_tx)
}

#[test]
fn test_parse_records() {
    let names: Vec<String> = vec![
        "10.0.0.1".to_string(),
        // suffix after the first underscore is a disambiguator
        "10.0.0.2_0000000042".to_string(),
        // same address registered twice collapses
        "10.0.0.1_0000000007".to_string(),
        // expected noise, dropped silently
        "not-an-address".to_string(),
        "::1".to_string(),
    ];
    assert_eq!(
        parse_records(&names),
        vec![ip("10.0.0.1"), ip("10.0.0.2"), ip("::1")]
    );
}

#[tokio::test]
async fn test_reload_replaces_both_caches() {
    test_utils::enable_logger();
    let mut client = MockRegistryClient::new();
    client.expect_get_children().returning(|_| {
        Ok((
            vec!["10.0.0.1".to_string(), "10.0.0.2_01".to_string()],
            NodeStat::default(),
        ))
    });
    client
        .expect_get_value()
        .withf(|path| path == "/dns/a.example.com/10.0.0.1")
        .returning(|_| Ok((b"{}".to_vec(), NodeStat::default())));
    client
        .expect_get_value()
        .withf(|path| path == "/dns/a.example.com/10.0.0.2_01")
        .returning(|_| Ok((b"{\"server_type\":\"API\"}".to_vec(), NodeStat::default())));

    let (watcher, records, details, mut wake_rx, _shutdown_tx) = setup(client);
    watcher.reload().await.expect("reload succeeds");

    assert_eq!(
        records.lookup("a.example.com"),
        Some(vec![ip("10.0.0.1"), ip("10.0.0.2")])
    );
    let snapshot = details.snapshot();
    assert_eq!(snapshot.len(), 1);
    // payload order follows node listing order
    assert_eq!(
        snapshot[0].1,
        vec![b"{}".to_vec(), b"{\"server_type\":\"API\"}".to_vec()]
    );
    // a successful reload arms the aggregator
    wake_rx.try_recv().expect("activity was recorded");
}

#[tokio::test]
async fn test_reload_withdraws_domain_without_addresses() {
    test_utils::enable_logger();
    let mut client = MockRegistryClient::new();
    client
        .expect_get_children()
        .returning(|_| Ok((vec!["garbage".to_string()], NodeStat::default())));
    client
        .expect_get_value()
        .returning(|_| Ok((b"{}".to_vec(), NodeStat::default())));

    let (watcher, records, details, _wake_rx, _shutdown_tx) = setup(client);
    records.replace("a.example.com", vec![ip("10.0.0.1")]);

    watcher.reload().await.expect("reload succeeds");
    assert_eq!(records.lookup("a.example.com"), None);
    // the unparseable node still contributes its payload
    assert_eq!(details.snapshot()[0].1.len(), 1);
}

#[tokio::test]
async fn test_failed_reload_retains_previous_values() {
    test_utils::enable_logger();
    let mut client = MockRegistryClient::new();
    client.expect_get_children().returning(|_| {
        Ok((
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
            NodeStat::default(),
        ))
    });
    client
        .expect_get_value()
        .withf(|path| path == "/dns/a.example.com/10.0.0.1")
        .returning(|_| Ok((b"{}".to_vec(), NodeStat::default())));
    client
        .expect_get_value()
        .withf(|path| path == "/dns/a.example.com/10.0.0.2")
        .returning(|_| Err(RegistryError::Connection("lost".to_string()).into()));

    let (watcher, records, details, mut wake_rx, _shutdown_tx) = setup(client);
    records.replace("a.example.com", vec![ip("10.0.0.9")]);
    details.replace("a.example.com", vec![b"old".to_vec()]);

    watcher.reload().await.expect_err("reload must fail");

    // no partial view: both caches keep their previous entries
    assert_eq!(records.lookup("a.example.com"), Some(vec![ip("10.0.0.9")]));
    assert_eq!(details.snapshot()[0].1, vec![b"old".to_vec()]);
    wake_rx.try_recv().expect_err("no activity on a failed pass");
}

#[tokio::test]
async fn test_dispatch_reloads_per_notification() {
    test_utils::enable_logger();
    let mut client = MockRegistryClient::new();
    client
        .expect_get_children()
        .returning(|_| Ok((vec!["10.0.0.1".to_string()], NodeStat::default())));
    client
        .expect_get_value()
        .returning(|_| Ok((b"{}".to_vec(), NodeStat::default())));

    let (watcher, records, _details, _wake_rx, _shutdown_tx) = setup(client);
    let (notify_tx, notify_rx) = mpsc::channel(4);
    let handle = tokio::spawn(watcher.dispatch(notify_rx));

    notify_tx
        .send(ChildChangeEvent {
            path: "/dns/a.example.com".to_string(),
            children: vec!["10.0.0.1".to_string()],
        })
        .await
        .expect("loop is receiving");

    time::timeout(Duration::from_secs(2), async {
        while records.lookup("a.example.com").is_none() {
            time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("records converge after a notification");

    // closing the notification stream ends the loop
    drop(notify_tx);
    time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop exits when the watcher closes")
        .expect("loop does not panic");
}

#[tokio::test]
async fn test_dispatch_exits_on_shutdown() {
    test_utils::enable_logger();
    let mut client = MockRegistryClient::new();
    client
        .expect_get_children()
        .returning(|_| Ok((vec![], NodeStat::default())));

    let (watcher, _records, _details, _wake_rx, shutdown_tx) = setup(client);
    let (_notify_tx, notify_rx) = mpsc::channel(4);
    let handle = tokio::spawn(watcher.dispatch(notify_rx));

    shutdown_tx.send(()).expect("loop is listening");
    time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop exits on shutdown")
        .expect("loop does not panic");
}
