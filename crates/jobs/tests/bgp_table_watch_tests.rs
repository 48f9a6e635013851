use bgp_dns_domain::{Community, RouteKey, RouteSpec};
use bgp_dns_jobs::BgpTableWatchJob;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::{ip, learned, learned_v6, spawn_kernel, KernelCall, MockBgpSpeaker, MockKernelTable, METRIC};

const INJECT: Community = Community::new(65001, 100);
const OTHER: Community = Community::new(65001, 200);

fn job(speaker: &MockBgpSpeaker, table: &MockKernelTable, shutdown: &CancellationToken, inject: Vec<Community>) -> BgpTableWatchJob {
    BgpTableWatchJob::new(Arc::new(speaker.clone()), spawn_kernel(table, shutdown), inject, METRIC)
        .with_cancellation(shutdown.clone())
}

fn key(prefix: &str) -> RouteKey {
    RouteKey::new(prefix.parse().unwrap(), METRIC)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// ============================================================================
// Community matching
// ============================================================================

#[tokio::test]
async fn test_any_configured_community_matches() {
    let shutdown = CancellationToken::new();
    let watch = job(&MockBgpSpeaker::new(), &MockKernelTable::new(), &shutdown, vec![INJECT, OTHER]);

    assert!(watch.matches(&learned("10.1.0.0/16", "192.0.2.10", Some(vec![OTHER]))));
    assert!(watch.matches(&learned("10.1.0.0/16", "192.0.2.10", Some(vec![Community::new(1, 1), INJECT]))));
    assert!(!watch.matches(&learned("10.1.0.0/16", "192.0.2.10", Some(vec![Community::new(1, 1)]))));
    assert!(!watch.matches(&learned("10.1.0.0/16", "192.0.2.10", Some(Vec::new()))));
    assert!(!watch.matches(&learned("10.1.0.0/16", "192.0.2.10", None)));
}

#[tokio::test]
async fn test_empty_inject_list_matches_nothing() {
    let shutdown = CancellationToken::new();
    let watch = job(&MockBgpSpeaker::new(), &MockKernelTable::new(), &shutdown, Vec::new());

    assert!(!watch.matches(&learned("10.1.0.0/16", "192.0.2.10", Some(vec![INJECT]))));
}

// ============================================================================
// Kernel commands
// ============================================================================

#[tokio::test]
async fn test_apply_advances_and_withdraws_matching_paths() {
    // Arrange
    let table = MockKernelTable::new();
    let shutdown = CancellationToken::new();
    let watch = job(&MockBgpSpeaker::new(), &table, &shutdown, vec![INJECT]);
    let a = learned("10.1.0.0/16", "192.0.2.10", Some(vec![INJECT]));
    let b = learned("10.1.0.0/16", "192.0.2.20", Some(vec![INJECT]));

    // Act
    watch.apply(vec![a.clone(), b.clone()]).await.unwrap();
    watch.apply(vec![a.withdrawn()]).await.unwrap();
    settle().await;

    // Assert
    assert_eq!(
        table.calls(),
        vec![
            KernelCall::Add(RouteSpec::new(key("10.1.0.0/16"), vec![ip("192.0.2.10")])),
            KernelCall::Replace(RouteSpec::new(
                key("10.1.0.0/16"),
                vec![ip("192.0.2.10"), ip("192.0.2.20")]
            )),
            KernelCall::Replace(RouteSpec::new(key("10.1.0.0/16"), vec![ip("192.0.2.20")])),
        ]
    );
}

#[tokio::test]
async fn test_apply_discards_ipv6_and_untagged_paths() {
    // Arrange
    let table = MockKernelTable::new();
    let shutdown = CancellationToken::new();
    let watch = job(&MockBgpSpeaker::new(), &table, &shutdown, vec![INJECT]);

    // Act
    watch
        .apply(vec![
            learned_v6("2001:db8::/32", Some(vec![INJECT])),
            learned("10.2.0.0/16", "192.0.2.10", None),
            learned("10.3.0.0/16", "192.0.2.10", Some(vec![OTHER])),
        ])
        .await
        .unwrap();
    settle().await;

    // Assert
    assert!(table.calls().is_empty());
}

// ============================================================================
// Background loop
// ============================================================================

#[tokio::test]
async fn test_started_job_follows_speaker_events() {
    // Arrange
    let speaker = MockBgpSpeaker::new();
    let table = MockKernelTable::new();
    let shutdown = CancellationToken::new();
    let watch = job(&speaker, &table, &shutdown, vec![INJECT]);
    let handle = Arc::new(watch).start().await;

    // Act
    let path = learned("10.9.0.0/16", "192.0.2.30", Some(vec![INJECT]));
    speaker.publish(vec![path.clone()]);
    settle().await;
    speaker.publish(vec![path.withdrawn()]);
    settle().await;

    // Assert
    assert_eq!(
        table.calls(),
        vec![
            KernelCall::Add(RouteSpec::new(key("10.9.0.0/16"), vec![ip("192.0.2.30")])),
            KernelCall::Delete(key("10.9.0.0/16")),
        ]
    );
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}
