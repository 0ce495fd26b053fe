//! Per-node topology state: cluster address tables, deployed module
//! identities, and the connections the node was observed through. The
//! discovery engine's final match pass asks each node to contribute the
//! service records its state implies.

use crate::data_plane::DiscoveryResult;
use crate::filter::{
    FilterSpec, ServiceType, FILTER_ATTR_CLUSTER, FILTER_ATTR_EJB_MODULE,
    FILTER_ATTR_EJB_MODULE_DISTINCT, FILTER_ATTR_NODE, FILTER_ATTR_SOURCE_IP,
};
use crate::locator::ModuleIdentifier;
use crate::net::{self, CidrAddressTable};
use crate::record::ServiceRecord;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Address tables one cluster advertises for a node, keyed by protocol.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClusterNodeInformation {
    address_tables_by_protocol: HashMap<String, CidrAddressTable>,
}

impl ClusterNodeInformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_address_table(&mut self, protocol: &str, table: CidrAddressTable) {
        self.address_tables_by_protocol
            .insert(protocol.to_string(), table);
    }

    pub fn address_tables(&self) -> impl Iterator<Item = (&str, &CidrAddressTable)> {
        self.address_tables_by_protocol
            .iter()
            .map(|(protocol, table)| (protocol.as_str(), table))
    }
}

#[derive(Clone, Default)]
struct NodeState {
    clusters: HashMap<String, ClusterNodeInformation>,
    modules: HashSet<ModuleIdentifier>,
    connections: HashSet<Url>,
}

///
/// Everything the registry knows about one named node. All mutators are
/// pushed in by channel registration and topology updates; readers take
/// cheap snapshots, so updates never block an in-flight match pass.
pub struct NodeInformation {
    node_name: String,
    state: RwLock<NodeState>,
}

impl NodeInformation {
    pub(crate) fn new(node_name: &str) -> Self {
        Self {
            node_name: node_name.to_string(),
            state: RwLock::new(NodeState::default()),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn put_cluster(&self, cluster_name: &str, info: ClusterNodeInformation) {
        self.state
            .write()
            .clusters
            .insert(cluster_name.to_string(), info);
    }

    pub fn remove_cluster(&self, cluster_name: &str) {
        self.state.write().clusters.remove(cluster_name);
    }

    pub fn cluster_info(&self, cluster_name: &str) -> Option<ClusterNodeInformation> {
        self.state.read().clusters.get(cluster_name).cloned()
    }

    pub fn clusters(&self) -> Vec<(String, ClusterNodeInformation)> {
        self.state
            .read()
            .clusters
            .iter()
            .map(|(name, info)| (name.clone(), info.clone()))
            .collect()
    }

    /// Replaces the deployed module set, as delivered by channel
    /// registration.
    pub fn set_modules(&self, modules: impl IntoIterator<Item = ModuleIdentifier>) {
        self.state.write().modules = modules.into_iter().collect();
    }

    pub fn register_connection(&self, uri: Url) {
        self.state.write().connections.insert(uri);
    }

    pub fn unregister_connection(&self, uri: &Url) {
        self.state.write().connections.remove(uri);
    }

    /// Emits every service record this node's state implies that satisfies
    /// the filter, reporting whether anything matched.
    ///
    /// One candidate exists per registered connection URI and one per
    /// cluster-derived destination; cluster-derived candidates carry the
    /// mapping's `source-ip` restriction unless it is the default range.
    pub async fn discover(
        &self,
        service_type: &ServiceType,
        filter: &FilterSpec,
        module_hint: Option<&ModuleIdentifier>,
        sink: &dyn DiscoveryResult,
    ) -> bool {
        if !service_type.implies(&ServiceType::ejb()) {
            return false;
        }
        let snapshot = self.state.read().clone();
        if let Some(hint) = module_hint {
            if !snapshot.modules.is_empty() && !snapshot.modules.contains(hint) {
                return false;
            }
        }

        let mut candidates: Vec<ServiceRecord> = Vec::new();
        for uri in &snapshot.connections {
            candidates.push(self.candidate_record(uri.clone(), &snapshot, None));
        }
        for (cluster_name, info) in &snapshot.clusters {
            for (protocol, table) in info.address_tables() {
                for mapping in table.iter() {
                    let Some(uri) = net::destination_uri(protocol, mapping.destination()) else {
                        continue;
                    };
                    let mut record = self.candidate_record(uri, &snapshot, Some(cluster_name));
                    if !mapping.range().is_default() {
                        record.add_attribute(FILTER_ATTR_SOURCE_IP, &mapping.range().to_string());
                    }
                    candidates.push(record);
                }
            }
        }

        let mut found = false;
        for record in candidates {
            if filter.matches(&record) {
                sink.add_match(record).await;
                found = true;
            }
        }
        found
    }

    fn candidate_record(
        &self,
        uri: Url,
        snapshot: &NodeState,
        cluster: Option<&str>,
    ) -> ServiceRecord {
        let mut record = ServiceRecord::new(uri).with_attribute(FILTER_ATTR_NODE, &self.node_name);
        if let Some(cluster) = cluster {
            record.add_attribute(FILTER_ATTR_CLUSTER, cluster);
        }
        for module in &snapshot.modules {
            record.add_attribute(FILTER_ATTR_EJB_MODULE, &module.module_value());
            if let Some(distinct) = module.distinct_value() {
                record.add_attribute(FILTER_ATTR_EJB_MODULE_DISTINCT, &distinct);
            }
        }
        record
    }
}
