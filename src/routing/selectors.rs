/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Pluggable node- and URI-selection policies. A selector returning `None`
//! is a fatal configuration error for the invocation; returning a candidate
//! outside the offered set is equally fatal.

use crate::locator::Locator;
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Chooses the cluster member an invocation with cluster affinity lands on.
/// `connected_nodes` is the subset of `available_nodes` the transport
/// currently holds an open connection to; the result must be a member of
/// `available_nodes`.
pub trait ClusterNodeSelector: Send + Sync {
    fn select_node(
        &self,
        cluster_name: &str,
        connected_nodes: &[String],
        available_nodes: &[String],
    ) -> Option<String>;
}

/// Chooses among the nodes a deployment was discovered on when the
/// invocation carries no placement affinity at all.
pub trait DeploymentNodeSelector: Send + Sync {
    fn select_node(
        &self,
        eligible_nodes: &[String],
        app_name: &str,
        module_name: &str,
        distinct_name: &str,
    ) -> Option<String>;
}

/// Chooses among discovered location URIs when some of them carry no node
/// name to select by.
pub trait DiscoveredUriSelector: Send + Sync {
    fn select_uri(&self, locations: &[Url], locator: &Locator) -> Option<Url>;
}

/// Default cluster policy: a uniformly random connected node when any
/// connection is open, otherwise a uniformly random available node.
#[derive(Debug, Default)]
pub struct PreferConnectedClusterNodeSelector;

impl ClusterNodeSelector for PreferConnectedClusterNodeSelector {
    fn select_node(
        &self,
        _cluster_name: &str,
        connected_nodes: &[String],
        available_nodes: &[String],
    ) -> Option<String> {
        let pool = if connected_nodes.is_empty() {
            available_nodes
        } else {
            connected_nodes
        };
        pool.choose(&mut rand::thread_rng()).cloned()
    }
}

/// Rotates through the available nodes across invocations.
#[derive(Debug, Default)]
pub struct RoundRobinClusterNodeSelector {
    counter: AtomicUsize,
}

impl ClusterNodeSelector for RoundRobinClusterNodeSelector {
    fn select_node(
        &self,
        _cluster_name: &str,
        _connected_nodes: &[String],
        available_nodes: &[String],
    ) -> Option<String> {
        if available_nodes.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % available_nodes.len();
        available_nodes.get(index).cloned()
    }
}

/// Uniformly random choice over the available nodes, connected or not.
#[derive(Debug, Default)]
pub struct RandomClusterNodeSelector;

impl ClusterNodeSelector for RandomClusterNodeSelector {
    fn select_node(
        &self,
        _cluster_name: &str,
        _connected_nodes: &[String],
        available_nodes: &[String],
    ) -> Option<String> {
        available_nodes.choose(&mut rand::thread_rng()).cloned()
    }
}

/// Default deployment policy: uniformly random among the eligible nodes.
#[derive(Debug, Default)]
pub struct RandomDeploymentNodeSelector;

impl DeploymentNodeSelector for RandomDeploymentNodeSelector {
    fn select_node(
        &self,
        eligible_nodes: &[String],
        _app_name: &str,
        _module_name: &str,
        _distinct_name: &str,
    ) -> Option<String> {
        eligible_nodes.choose(&mut rand::thread_rng()).cloned()
    }
}

/// Default URI policy: a uniformly random draw over the discovered
/// locations.
#[derive(Debug, Default)]
pub struct RandomUriSelector;

impl DiscoveredUriSelector for RandomUriSelector {
    fn select_uri(&self, locations: &[Url], _locator: &Locator) -> Option<Url> {
        locations.choose(&mut rand::thread_rng()).cloned()
    }
}

/// Deterministic rotation over discovered locations, for callers that want
/// reproducible spread instead of random draws.
#[derive(Debug, Default)]
pub struct RoundRobinUriSelector {
    counter: AtomicUsize,
}

impl DiscoveredUriSelector for RoundRobinUriSelector {
    fn select_uri(&self, locations: &[Url], _locator: &Locator) -> Option<Url> {
        if locations.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % locations.len();
        locations.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ClusterNodeSelector, PreferConnectedClusterNodeSelector, RandomClusterNodeSelector,
        RoundRobinClusterNodeSelector,
    };
    use rand::seq::SliceRandom;
    use rand::Rng;

    fn nodes(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn prefer_connected_uses_open_connections_first() {
        let selector = PreferConnectedClusterNodeSelector;
        let connected = nodes(&["n2"]);
        let available = nodes(&["n1", "n2", "n3"]);
        for _ in 0..16 {
            assert_eq!(
                selector
                    .select_node("c1", &connected, &available)
                    .as_deref(),
                Some("n2")
            );
        }
    }

    #[test]
    fn prefer_connected_falls_back_to_available() {
        let selector = PreferConnectedClusterNodeSelector;
        let available = nodes(&["n1", "n2"]);
        let selected = selector
            .select_node("c1", &[], &available)
            .expect("non-empty pool");
        assert!(available.contains(&selected));
    }

    #[test]
    fn round_robin_cycles_through_available_nodes() {
        let selector = RoundRobinClusterNodeSelector::default();
        let available = nodes(&["n1", "n2", "n3"]);
        let picks: Vec<Option<String>> = (0..6)
            .map(|_| selector.select_node("c1", &[], &available))
            .collect();
        assert_eq!(
            picks,
            [
                Some("n1".to_string()),
                Some("n2".to_string()),
                Some("n3".to_string()),
                Some("n1".to_string()),
                Some("n2".to_string()),
                Some("n3".to_string()),
            ]
        );
    }

    #[test]
    fn empty_pools_yield_no_selection() {
        assert_eq!(
            RoundRobinClusterNodeSelector::default().select_node("c1", &[], &[]),
            None
        );
        assert_eq!(RandomClusterNodeSelector.select_node("c1", &[], &[]), None);
    }

    #[test]
    fn selection_is_always_a_member_of_available() {
        let mut rng = rand::thread_rng();
        let universe = nodes(&["n1", "n2", "n3", "n4", "n5"]);
        for _ in 0..64 {
            let available: Vec<String> = universe
                .iter()
                .filter(|_| rng.gen_bool(0.7))
                .cloned()
                .collect();
            if available.is_empty() {
                continue;
            }
            let sample_size = rng.gen_range(0..=available.len());
            let connected: Vec<String> = available
                .choose_multiple(&mut rng, sample_size)
                .cloned()
                .collect();
            for selector in [
                &PreferConnectedClusterNodeSelector as &dyn ClusterNodeSelector,
                &RandomClusterNodeSelector,
            ] {
                let selected = selector
                    .select_node("c1", &connected, &available)
                    .expect("non-empty pool");
                assert!(available.contains(&selected));
            }
        }
    }
}
