//! Probe fan-out and record delivery: the discovery engine, the per-pass
//! attempt state, and the queue the resolver consumes.

mod discovery_engine;
mod services_queue;

pub use discovery_engine::{
    DiscoveryConnection, DiscoveryEngine, DiscoveryRequest, DEFAULT_MAX_CONNECTED_CLUSTER_NODES,
    DEFAULT_QUEUE_CAPACITY,
};
pub use services_queue::{DiscoveryResult, QueueSink, ServiceStreamInterrupted, ServicesQueue};
