//! Convergence Tests
//!
//! Multi-node dissemination over fixed topologies: every node must end up
//! holding the union of all broadcasts, and the cluster must go quiet once
//! it has.

mod common;

use common::{line, node_id, topology_from_edges, Cluster};
use murmur_anti_entropy::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::time::Duration;

/// Sweep until converged on `expected`, at most `max_sweeps` times
async fn sweep_until_converged(
    cluster: &Cluster,
    expected: &BTreeSet<i64>,
    max_sweeps: usize,
) -> usize {
    for sweep in 0..max_sweeps {
        if cluster.converged_on(expected).await {
            return sweep;
        }
        cluster.sweep().await;
    }
    assert!(
        cluster.converged_on(expected).await,
        "cluster did not converge within {max_sweeps} sweeps"
    );
    max_sweeps
}

/// Sweep until a whole sweep issues no sync request
async fn sweep_until_quiet(cluster: &Cluster, max_sweeps: usize) -> bool {
    for _ in 0..max_sweeps {
        let reports = cluster.sweep().await;
        if reports.iter().all(|r| r.synced == 0 && r.failed == 0) {
            return true;
        }
    }
    false
}

// ============================================================================
// Fixed topologies
// ============================================================================

#[tokio::test]
async fn line_converges_from_both_ends() {
    let cluster = Cluster::new(5);
    cluster.install(&line(5)).await;
    cluster.broadcast(0, 100).await;
    cluster.broadcast(4, 400).await;

    let expected = BTreeSet::from([100, 400]);
    sweep_until_converged(&cluster, &expected, 6).await;

    for i in 0..5 {
        assert_eq!(cluster.read(i).await, expected);
    }
}

#[tokio::test]
async fn star_converges_through_the_hub() {
    let edges = [(0, 1), (0, 2), (0, 3), (0, 4)];
    let cluster = Cluster::new(5);
    cluster.install(&topology_from_edges(5, &edges)).await;

    for i in 1..5 {
        cluster.broadcast(i, i as i64).await;
    }

    let expected: BTreeSet<i64> = (1..5).collect();
    sweep_until_converged(&cluster, &expected, 4).await;
}

#[tokio::test]
async fn converged_cluster_goes_quiet() {
    let cluster = Cluster::new(4);
    cluster
        .install(&topology_from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]))
        .await;
    for i in 0..4 {
        cluster.broadcast(i, 10 * i as i64).await;
    }

    let expected: BTreeSet<i64> = (0..4).map(|i| 10 * i).collect();
    sweep_until_converged(&cluster, &expected, 6).await;
    assert!(sweep_until_quiet(&cluster, 4).await);

    // Quiet means every tracker covers the whole store.
    for (i, node) in cluster.nodes.iter().enumerate() {
        for neighbor in node.topology().neighbors_of(&node_id(i)).await {
            assert!(node.tracker().unknown_to(&neighbor, node.store()).await.is_empty());
        }
    }
}

#[tokio::test]
async fn late_broadcast_after_quiet_is_still_delivered() {
    let cluster = Cluster::new(3);
    cluster.install(&line(3)).await;
    cluster.broadcast(0, 1).await;
    sweep_until_converged(&cluster, &BTreeSet::from([1]), 4).await;
    assert!(sweep_until_quiet(&cluster, 4).await);

    cluster.broadcast(2, 2).await;
    sweep_until_converged(&cluster, &BTreeSet::from([1, 2]), 4).await;
}

#[tokio::test]
async fn partitioned_link_retries_after_heal() {
    let cluster = Cluster::new(2);
    cluster.install(&line(2)).await;
    cluster.broadcast(0, 9).await;

    cluster.network.partition(&node_id(0), &node_id(1));
    let report = cluster.nodes[0].sync_round().await;
    assert_eq!(report.failed, 1);
    assert!(!cluster.nodes[1].store().contains(GossipValue(9)).await);

    // The failed delta is still pending for the neighbor.
    assert_eq!(
        cluster.nodes[0]
            .tracker()
            .unknown_to(&node_id(1), cluster.nodes[0].store())
            .await,
        vec![GossipValue(9)]
    );

    cluster.network.heal_all();
    let report = cluster.nodes[0].sync_round().await;
    assert_eq!(report.synced, 1);
    assert!(cluster.nodes[1].store().contains(GossipValue(9)).await);
}

#[tokio::test]
async fn scheduler_converges_a_line_without_manual_rounds() {
    let cluster = Cluster::new(3);
    cluster.install(&line(3)).await;
    cluster.broadcast(0, 77).await;

    let config = AntiEntropyConfig::with_sync_interval(Duration::from_millis(10));
    let handles: Vec<_> = cluster
        .nodes
        .iter()
        .map(|node| {
            SyncScheduler::new(node.clone(), &config)
                .unwrap()
                .spawn()
        })
        .collect();

    let expected = BTreeSet::from([77]);
    let mut converged = false;
    for _ in 0..200 {
        if cluster.converged_on(&expected).await {
            converged = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    for handle in handles {
        handle.shutdown().await;
    }
    assert!(converged, "scheduled gossip should reach the far end of the line");
}

// ============================================================================
// Random connected topologies
// ============================================================================

/// A random spanning tree plus a few extra edges, and broadcasts to random nodes
fn arb_cluster() -> impl Strategy<Value = (usize, Vec<(usize, usize)>, Vec<(usize, i64)>)> {
    (2usize..7).prop_flat_map(|size| {
        let parents = proptest::collection::vec(any::<prop::sample::Index>(), size - 1);
        let extra = proptest::collection::vec(
            (any::<prop::sample::Index>(), any::<prop::sample::Index>()),
            0..3,
        );
        let broadcasts =
            proptest::collection::vec((any::<prop::sample::Index>(), -50i64..50), 0..12);
        (Just(size), parents, extra, broadcasts).prop_map(|(size, parents, extra, broadcasts)| {
            let mut edges: Vec<(usize, usize)> = parents
                .iter()
                .enumerate()
                .map(|(i, parent)| (parent.index(i + 1), i + 1))
                .collect();
            edges.extend(
                extra
                    .iter()
                    .map(|(a, b)| (a.index(size), b.index(size)))
                    .filter(|(a, b)| a != b),
            );
            let broadcasts = broadcasts
                .into_iter()
                .map(|(node, value)| (node.index(size), value))
                .collect();
            (size, edges, broadcasts)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any connected topology converges on the union of all broadcasts,
    /// then stops sending.
    #[test]
    fn connected_topologies_converge((size, edges, broadcasts) in arb_cluster()) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let cluster = Cluster::new(size);
            cluster.install(&topology_from_edges(size, &edges)).await;
            for (node, value) in &broadcasts {
                cluster.broadcast(*node, *value).await;
            }

            let expected: BTreeSet<i64> = broadcasts.iter().map(|(_, v)| *v).collect();
            sweep_until_converged(&cluster, &expected, size + 1).await;
            prop_assert!(sweep_until_quiet(&cluster, size + 2).await);

            for i in 0..size {
                prop_assert_eq!(cluster.read(i).await, expected.clone());
            }
            Ok(())
        })?;
    }
}
