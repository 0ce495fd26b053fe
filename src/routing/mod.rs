//! Resolution policy: the affinity state machine and the pluggable
//! selection policies it defers to.

mod resolver;
mod selectors;
mod source_ip;

pub use resolver::{ResolveError, Resolver};
pub use selectors::{
    ClusterNodeSelector, DeploymentNodeSelector, DiscoveredUriSelector,
    PreferConnectedClusterNodeSelector, RandomClusterNodeSelector, RandomDeploymentNodeSelector,
    RandomUriSelector, RoundRobinClusterNodeSelector, RoundRobinUriSelector,
};
pub use source_ip::satisfies_source_address;
