//! Process-wide registry of discovered nodes, cluster membership, the
//! per-cluster effective authentication URIs, and the failed-destination
//! hint set.

use crate::control_plane::node_information::NodeInformation;
use crate::observability::events;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use url::Url;

const COMPONENT: &str = "node_registry";

/// Process-wide hint set of destinations recently observed to fail a probe.
/// Entries are eventually consistent; stale entries are tolerated because the
/// retry pass reprobes everything when all endpoints look failed.
#[derive(Default)]
pub struct FailedDestinations {
    set: RwLock<HashSet<Url>>,
}

impl FailedDestinations {
    pub fn contains(&self, uri: &Url) -> bool {
        self.set.read().contains(uri)
    }

    pub fn mark_failed(&self, uri: Url) {
        self.set.write().insert(uri);
    }

    /// Clears one destination, typically after a channel was successfully
    /// established to it.
    pub fn clear(&self, uri: &Url) {
        self.set.write().remove(uri);
    }

    pub fn snapshot(&self) -> HashSet<Url> {
        self.set.read().clone()
    }
}

///
/// [`NodeRegistry`] owns every node the client has learned about. Topology
/// pushes come in from channel registration; the discovery engine reads
/// snapshots while probing. Node entries are only ever inserted during the
/// registry's lifetime, so an in-flight resolution never observes a vanished
/// node.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, Arc<NodeInformation>>>,
    cluster_nodes: RwLock<HashMap<String, HashSet<String>>>,
    effective_auth_uris: RwLock<HashMap<String, Url>>,
    failed_destinations: FailedDestinations,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent lookup-or-allocate; never overwrites existing state.
    pub fn get_or_create(&self, node_name: &str) -> Arc<NodeInformation> {
        if let Some(existing) = self.nodes.read().get(node_name) {
            return Arc::clone(existing);
        }
        let mut nodes = self.nodes.write();
        Arc::clone(
            nodes
                .entry(node_name.to_string())
                .or_insert_with(|| Arc::new(NodeInformation::new(node_name))),
        )
    }

    pub fn node(&self, node_name: &str) -> Option<Arc<NodeInformation>> {
        self.nodes.read().get(node_name).cloned()
    }

    pub fn all(&self) -> Vec<Arc<NodeInformation>> {
        self.nodes.read().values().cloned().collect()
    }

    /// Records cluster membership for a node. The first registration for a
    /// cluster also pins the cluster's effective authentication URI; later
    /// registrations never replace it.
    pub fn add_node(&self, cluster_name: &str, node_name: &str, registered_by: &Url) {
        self.effective_auth_uris
            .write()
            .entry(cluster_name.to_string())
            .or_insert_with(|| registered_by.clone());
        self.cluster_nodes
            .write()
            .entry(cluster_name.to_string())
            .or_default()
            .insert(node_name.to_string());
        debug!(
            event = events::REGISTRY_NODE_ADDED,
            component = COMPONENT,
            cluster = cluster_name,
            node = node_name,
            registered_by = %registered_by,
            "added cluster member"
        );
    }

    pub fn remove_node(&self, cluster_name: &str, node_name: &str) {
        if let Some(members) = self.cluster_nodes.write().get_mut(cluster_name) {
            members.remove(node_name);
        }
        debug!(
            event = events::REGISTRY_NODE_REMOVED,
            component = COMPONENT,
            cluster = cluster_name,
            node = node_name,
            "removed cluster member"
        );
    }

    /// Drops a cluster's membership and its effective authentication URI.
    pub fn remove_cluster(&self, cluster_name: &str) {
        self.cluster_nodes.write().remove(cluster_name);
        self.effective_auth_uris.write().remove(cluster_name);
        debug!(
            event = events::REGISTRY_CLUSTER_REMOVED,
            component = COMPONENT,
            cluster = cluster_name,
            "removed cluster"
        );
    }

    pub fn cluster_membership(&self) -> Vec<(String, Vec<String>)> {
        self.cluster_nodes
            .read()
            .iter()
            .map(|(cluster, members)| (cluster.clone(), members.iter().cloned().collect()))
            .collect()
    }

    pub fn effective_auth_uri(&self, cluster_name: &str) -> Option<Url> {
        self.effective_auth_uris.read().get(cluster_name).cloned()
    }

    pub fn failed_destinations(&self) -> &FailedDestinations {
        &self.failed_destinations
    }
}

#[cfg(test)]
mod tests {
    use super::NodeRegistry;
    use std::collections::HashSet;
    use std::sync::Arc;
    use url::Url;

    fn uri(value: &str) -> Url {
        Url::parse(value).expect("test uri")
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let registry = NodeRegistry::new();
        let first = registry.get_or_create("n1");
        first.register_connection(uri("remote://h1:8080"));
        let second = registry.get_or_create("n1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.all().len(), 1);
    }

    #[test]
    fn effective_auth_uri_keeps_the_first_writer() {
        let registry = NodeRegistry::new();
        registry.add_node("c1", "n1", &uri("remote://first:8080"));
        registry.add_node("c1", "n2", &uri("remote://second:8080"));
        assert_eq!(
            registry.effective_auth_uri("c1"),
            Some(uri("remote://first:8080"))
        );

        registry.remove_cluster("c1");
        assert_eq!(registry.effective_auth_uri("c1"), None);
        registry.add_node("c1", "n3", &uri("remote://third:8080"));
        assert_eq!(
            registry.effective_auth_uri("c1"),
            Some(uri("remote://third:8080"))
        );
    }

    #[test]
    fn failed_destinations_round_trip() {
        let registry = NodeRegistry::new();
        let destination = uri("remote://h1:8080");
        assert!(!registry.failed_destinations().contains(&destination));
        registry
            .failed_destinations()
            .mark_failed(destination.clone());
        assert!(registry.failed_destinations().contains(&destination));
        registry.failed_destinations().clear(&destination);
        assert!(!registry.failed_destinations().contains(&destination));
    }

    #[test]
    fn concurrent_membership_updates_converge() {
        let registry = Arc::new(NodeRegistry::new());
        let registered_by = uri("remote://seed:8080");

        let mut handles = Vec::new();
        for worker in 0..8 {
            let registry = Arc::clone(&registry);
            let registered_by = registered_by.clone();
            handles.push(std::thread::spawn(move || {
                for index in 0..50 {
                    let node = format!("n{worker}-{index}");
                    registry.add_node("c1", &node, &registered_by);
                    if index % 2 == 0 {
                        registry.remove_node("c1", &node);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().expect("worker completed");
        }

        let membership = registry.cluster_membership();
        let (_, members) = membership
            .iter()
            .find(|(cluster, _)| cluster == "c1")
            .expect("cluster present");
        let members: HashSet<&String> = members.iter().collect();
        // every odd index survives, every even index was removed
        assert_eq!(members.len(), 8 * 25);
        assert!(members.iter().all(|name| {
            let index: usize = name
                .rsplit('-')
                .next()
                .and_then(|part| part.parse().ok())
                .expect("index suffix");
            index % 2 == 1
        }));
    }
}
