//! Topology ownership: the node registry, per-node cluster state, and the
//! process-wide failed-destination and effective-authentication maps.

mod node_information;
mod node_registry;

pub use node_information::{ClusterNodeInformation, NodeInformation};
pub use node_registry::{FailedDestinations, NodeRegistry};
