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

//! Two-phase fan-out probe coordinator.
//!
//! A discovery pass probes every usable configured endpoint and a bounded
//! number of cluster-derived destinations in parallel, then matches the
//! filter against registry state once every probe has terminated. When
//! phase 1 matches nothing, phase 2 reprobes every known destination while
//! ignoring the failed-destination hints, on the assumption they are stale.

use crate::control_plane::{ClusterNodeInformation, NodeRegistry};
use crate::data_plane::services_queue::{DiscoveryResult, ServicesQueue};
use crate::filter::{FilterSpec, ServiceType, EJB_ABSTRACT_TYPE, EJB_ABSTRACT_TYPE_AUTHORITY};
use crate::locator::ModuleIdentifier;
use crate::net::{self, CidrMapping};
use crate::observability::events;
use crate::trace::TraceSink;
use crate::transport::{
    AuthConfig, AuthenticationClient, ConnectionFactory, SslConfig, TransportProvider,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

const COMPONENT: &str = "discovery_engine";

/// Default bound on probes issued per cluster in one pass.
pub const DEFAULT_MAX_CONNECTED_CLUSTER_NODES: usize = 10;
/// Default capacity of the record queue a pass delivers into.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// One statically configured client connection. Only connections flagged for
/// discovery participate in probe fan-out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveryConnection {
    destination: Url,
    for_discovery: bool,
}

impl DiscoveryConnection {
    pub fn new(destination: Url) -> Self {
        Self {
            destination,
            for_discovery: true,
        }
    }

    pub fn with_for_discovery(mut self, for_discovery: bool) -> Self {
        self.for_discovery = for_discovery;
        self
    }

    pub fn destination(&self) -> &Url {
        &self.destination
    }

    pub fn for_discovery(&self) -> bool {
        self.for_discovery
    }
}

///
/// [`DiscoveryEngine`] owns the collaborator handles and configuration a
/// discovery pass needs. Each call to [`discover`] runs one independent
/// [`DiscoveryAttempt`]; the engine itself carries no per-pass state.
///
/// [`discover`]: DiscoveryEngine::discover
pub struct DiscoveryEngine {
    registry: Arc<NodeRegistry>,
    transport: Arc<dyn TransportProvider>,
    connection_factory: Arc<dyn ConnectionFactory>,
    authentication: Arc<dyn AuthenticationClient>,
    configured_connections: Vec<DiscoveryConnection>,
    max_connected_cluster_nodes: usize,
    queue_capacity: usize,
}

impl DiscoveryEngine {
    pub fn new(
        registry: Arc<NodeRegistry>,
        transport: Arc<dyn TransportProvider>,
        connection_factory: Arc<dyn ConnectionFactory>,
        authentication: Arc<dyn AuthenticationClient>,
    ) -> Self {
        Self {
            registry,
            transport,
            connection_factory,
            authentication,
            configured_connections: Vec::new(),
            max_connected_cluster_nodes: DEFAULT_MAX_CONNECTED_CLUSTER_NODES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_configured_connections(mut self, connections: Vec<DiscoveryConnection>) -> Self {
        self.configured_connections = connections;
        self
    }

    pub fn with_max_connected_cluster_nodes(mut self, bound: usize) -> Self {
        self.max_connected_cluster_nodes = bound;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Runs one discovery pass, delivering matches and problems into `sink`.
    /// The sink is completed exactly once, never before every issued probe
    /// has terminated. The returned request cancels outstanding probes
    /// cooperatively.
    pub async fn discover(
        self: &Arc<Self>,
        service_type: ServiceType,
        filter: FilterSpec,
        sink: Arc<dyn DiscoveryResult>,
        trace: TraceSink,
    ) -> DiscoveryRequest {
        if !service_type.implies(&ServiceType::ejb()) {
            sink.complete();
            return DiscoveryRequest::completed();
        }

        let attempt = Arc::new(DiscoveryAttempt {
            engine: Arc::clone(self),
            service_type,
            filter,
            sink,
            trace,
            outstanding: AtomicUsize::new(1),
            phase2: AtomicBool::new(false),
            cancellers: Mutex::new(Vec::new()),
        });

        let mut ok = false;
        let mut discovery_connections = false;
        for connection in &self.configured_connections {
            if !connection.for_discovery() {
                continue;
            }
            discovery_connections = true;
            let uri = connection.destination();
            if self.registry.failed_destinations().contains(uri) {
                attempt
                    .trace
                    .log(|| format!("skipping configured connection {uri}, marked as failed"));
                debug!(
                    event = events::PROBE_SKIPPED_FAILED,
                    component = COMPONENT,
                    uri = %uri,
                    "skipping configured connection marked as failed"
                );
                continue;
            }
            ok = true;
            attempt.connect_and_discover(uri.clone(), None).await;
        }

        for (cluster_name, node_names) in self.registry.cluster_membership() {
            let mut remaining = self.max_connected_cluster_nodes;
            for node_name in node_names {
                if remaining == 0 {
                    break;
                }
                let Some(info) = self.registry.node(&node_name) else {
                    continue;
                };
                let Some(cluster_info) = info.cluster_info(&cluster_name) else {
                    continue;
                };
                if let Some(uri) = self.first_eligible_destination(&cluster_info, true) {
                    remaining -= 1;
                    ok = true;
                    attempt
                        .connect_and_discover(uri, Some(cluster_name.clone()))
                        .await;
                }
            }
        }

        // every configured endpoint looked failed; assume the hints are stale
        if discovery_connections && !ok {
            attempt
                .trace
                .log(|| "all connections marked failed, retrying".to_string());
            debug!(
                event = events::DISCOVERY_RETRY_ALL,
                component = COMPONENT,
                "all configured connections marked failed, retrying all"
            );
            for connection in &self.configured_connections {
                if !connection.for_discovery() {
                    continue;
                }
                attempt
                    .connect_and_discover(connection.destination().clone(), None)
                    .await;
            }
        }

        // release the initial count off the caller's task: the final match
        // pass delivers records and must not block the consumer-to-be
        let completion = Arc::clone(&attempt);
        tokio::spawn(async move {
            completion.count_down().await;
        });
        DiscoveryRequest::new(attempt)
    }

    /// Convenience wiring of [`discover`] onto a fresh [`ServicesQueue`].
    ///
    /// [`discover`]: DiscoveryEngine::discover
    pub async fn discover_queue(
        self: &Arc<Self>,
        service_type: ServiceType,
        filter: FilterSpec,
        trace: TraceSink,
    ) -> (ServicesQueue, DiscoveryRequest) {
        let (sink, queue) = ServicesQueue::channel(self.queue_capacity);
        let request = self.discover(service_type, filter, sink, trace).await;
        (queue, request)
    }

    /// First destination URI of a node's cluster state that the transport
    /// could use from here: mappings are tried most-specific-first, the
    /// default mapping always qualifies, and malformed destinations are
    /// skipped in favor of the next mapping.
    fn first_eligible_destination(
        &self,
        cluster_info: &ClusterNodeInformation,
        skip_failed: bool,
    ) -> Option<Url> {
        for (protocol, table) in cluster_info.address_tables() {
            for mapping in table.iter() {
                if !self.mapping_eligible(mapping) {
                    continue;
                }
                let Some(uri) = net::destination_uri(protocol, mapping.destination()) else {
                    continue;
                };
                if skip_failed && self.registry.failed_destinations().contains(&uri) {
                    continue;
                }
                return Some(uri);
            }
        }
        None
    }

    fn mapping_eligible(&self, mapping: &CidrMapping) -> bool {
        if mapping.range().is_default() {
            return true;
        }
        match self.transport.source_address(&mapping.destination()) {
            Some(source) => mapping.range().contains(source.ip()),
            None => false,
        }
    }

    /// Every destination phase 2 reprobes: configured discovery endpoints
    /// plus one cluster-derived URI per node, with the failed set ignored.
    fn enumerate_all_destinations(&self) -> HashSet<Url> {
        let mut everything = HashSet::new();
        for connection in &self.configured_connections {
            if connection.for_discovery() {
                everything.insert(connection.destination().clone());
            }
        }
        for info in self.registry.all() {
            for (_cluster_name, cluster_info) in info.clusters() {
                if let Some(uri) = self.first_eligible_destination(&cluster_info, false) {
                    everything.insert(uri);
                    break;
                }
            }
        }
        everything
    }
}

/// Cancellation handle for one discovery pass. Cancellation is cooperative:
/// probes that observe it still count down, so the pass completes.
pub struct DiscoveryRequest {
    attempt: Option<Arc<DiscoveryAttempt>>,
}

impl DiscoveryRequest {
    fn new(attempt: Arc<DiscoveryAttempt>) -> Self {
        Self {
            attempt: Some(attempt),
        }
    }

    fn completed() -> Self {
        Self { attempt: None }
    }

    pub fn cancel(&self) {
        if let Some(attempt) = &self.attempt {
            let cancellers = attempt.cancellers.lock();
            for canceller in cancellers.iter() {
                canceller.cancel();
            }
        }
    }
}

struct DiscoveryAttempt {
    engine: Arc<DiscoveryEngine>,
    service_type: ServiceType,
    filter: FilterSpec,
    sink: Arc<dyn DiscoveryResult>,
    trace: TraceSink,
    // starts at 1 so the pass cannot finish while probes are still being issued
    outstanding: AtomicUsize,
    phase2: AtomicBool,
    cancellers: Mutex<Vec<CancellationToken>>,
}

impl DiscoveryAttempt {
    async fn connect_and_discover(self: &Arc<Self>, uri: Url, cluster_effective: Option<String>) {
        self.trace.log(|| format!("connect and discover {uri}"));
        self.outstanding.fetch_add(1, Ordering::AcqRel);

        let scheme = uri.scheme().to_string();
        if !self.engine.transport.supports_protocol(&scheme)
            || !self.engine.connection_factory.is_valid_uri_scheme(&scheme)
        {
            self.trace
                .log(|| format!("{uri} not a usable scheme, counting down"));
            debug!(
                event = events::PROBE_SKIPPED_SCHEME,
                component = COMPONENT,
                uri = %uri,
                scheme = %scheme,
                "destination scheme unusable"
            );
            self.count_down().await;
            return;
        }

        let effective_auth = cluster_effective
            .as_deref()
            .and_then(|cluster| self.engine.registry.effective_auth_uri(cluster))
            .unwrap_or_else(|| uri.clone());
        let ssl = match self.engine.authentication.ssl_context(&uri) {
            Ok(ssl) => ssl,
            Err(problem) => {
                self.trace
                    .log(|| format!("ssl configuration failed for {uri}: {problem}"));
                self.sink.report_problem(problem);
                self.engine
                    .registry
                    .failed_destinations()
                    .mark_failed(uri.clone());
                self.count_down().await;
                return;
            }
        };
        let mut authentication = self.engine.authentication.authentication_configuration(
            &effective_auth,
            EJB_ABSTRACT_TYPE,
            EJB_ABSTRACT_TYPE_AUTHORITY,
        );
        if cluster_effective.is_some() {
            // dynamically discovered nodes must not inherit static overrides
            authentication = authentication.without_location_overrides();
        }

        let token = CancellationToken::new();
        self.cancellers.lock().push(token.clone());
        debug!(
            event = events::PROBE_ATTEMPT,
            component = COMPONENT,
            uri = %uri,
            cluster = cluster_effective.as_deref().unwrap_or("none"),
            "probing destination"
        );

        let attempt = Arc::clone(self);
        tokio::spawn(async move {
            attempt.run_probe(uri, ssl, authentication, token).await;
        });
    }

    async fn run_probe(
        self: Arc<Self>,
        uri: Url,
        ssl: Option<SslConfig>,
        authentication: AuthConfig,
        token: CancellationToken,
    ) {
        let connected = tokio::select! {
            _ = token.cancelled() => {
                self.trace.log(|| format!("connect cancelled for {uri}"));
                debug!(
                    event = events::PROBE_CANCELLED,
                    component = COMPONENT,
                    uri = %uri,
                    "probe cancelled before connecting"
                );
                self.count_down().await;
                return;
            }
            result = self.engine.connection_factory.get_connected_identity(
                &uri,
                ssl.as_ref(),
                authentication,
            ) => result,
        };

        let connection = match connected {
            Ok(connection) => {
                self.trace.log(|| format!("connected to {uri}"));
                debug!(
                    event = events::PROBE_CONNECTED,
                    component = COMPONENT,
                    uri = %uri,
                    "probe connected"
                );
                connection
            }
            Err(problem) => {
                self.trace
                    .log(|| format!("connect failed for {uri}: {problem}"));
                warn!(
                    event = events::PROBE_FAILED,
                    component = COMPONENT,
                    uri = %uri,
                    err = %problem,
                    "probe connect failed"
                );
                self.sink.report_problem(problem);
                self.engine
                    .registry
                    .failed_destinations()
                    .mark_failed(uri.clone());
                self.count_down().await;
                return;
            }
        };

        let channel = tokio::select! {
            _ = token.cancelled() => {
                self.trace.log(|| format!("channel open cancelled for {uri}"));
                debug!(
                    event = events::PROBE_CANCELLED,
                    component = COMPONENT,
                    uri = %uri,
                    "probe cancelled before channel open"
                );
                self.count_down().await;
                return;
            }
            result = self.engine.transport.open_channel(&connection) => result,
        };

        match channel {
            Ok(_channel) => {
                self.trace.log(|| format!("client channel open to {uri}"));
                debug!(
                    event = events::PROBE_CHANNEL_OK,
                    component = COMPONENT,
                    uri = %uri,
                    "client channel established"
                );
                self.engine.registry.failed_destinations().clear(&uri);
            }
            Err(problem) => {
                self.trace
                    .log(|| format!("channel open failed for {uri}: {problem}"));
                warn!(
                    event = events::PROBE_FAILED,
                    component = COMPONENT,
                    uri = %uri,
                    err = %problem,
                    "client channel open failed"
                );
                self.sink.report_problem(problem);
                self.engine
                    .registry
                    .failed_destinations()
                    .mark_failed(uri.clone());
            }
        }
        self.count_down().await;
    }

    async fn count_down(self: &Arc<Self>) {
        let previous = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        self.trace
            .log(|| format!("count down, outstanding now {}", previous.saturating_sub(1)));
        if previous == 1 {
            // the decrement to zero is observed by exactly one task
            self.on_zero().await;
        }
    }

    // Boxed explicitly (rather than a plain `async fn`) because `on_zero`
    // and `count_down` call each other indirectly through
    // `connect_and_discover`; rustc cannot resolve that cycle through two
    // opaque `async fn` return types, so one side is erased to a `dyn Future`.
    fn on_zero<'a>(self: &'a Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            loop {
                let node = self.filter.node_name().map(str::to_string);
                let module = self.filter.module_identifier();

                if self.phase2.load(Ordering::Acquire) {
                    self.run_match_pass(node.as_deref(), module.as_ref()).await;
                    self.trace.log(|| "phase 2 complete".to_string());
                    debug!(
                        event = events::DISCOVERY_COMPLETE,
                        component = COMPONENT,
                        phase = 2,
                        filter = %self.filter,
                        "discovery pass complete"
                    );
                    self.sink.complete();
                    return;
                }

                if self.run_match_pass(node.as_deref(), module.as_ref()).await {
                    self.trace.log(|| "phase 1 complete".to_string());
                    debug!(
                        event = events::DISCOVERY_COMPLETE,
                        component = COMPONENT,
                        phase = 1,
                        filter = %self.filter,
                        "discovery pass complete"
                    );
                    self.sink.complete();
                    return;
                }

                // nothing matched: reconnect everything, ignoring failure hints
                self.trace
                    .log(|| "phase 1 found nothing, reprobing everything".to_string());
                debug!(
                    event = events::DISCOVERY_PHASE2_START,
                    component = COMPONENT,
                    filter = %self.filter,
                    "phase 1 found nothing, reprobing all destinations"
                );
                self.phase2.store(true, Ordering::Release);
                self.outstanding.fetch_add(1, Ordering::AcqRel);
                for uri in self.engine.enumerate_all_destinations() {
                    self.connect_and_discover(uri, None).await;
                }
                if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
                    continue;
                }
                return;
            }
        })
    }

    async fn run_match_pass(&self, node: Option<&str>, module: Option<&ModuleIdentifier>) -> bool {
        let mut any = false;
        match node {
            Some(node_name) => {
                if let Some(info) = self.engine.registry.node(node_name) {
                    self.trace
                        .log(|| format!("matching against node {}", info.node_name()));
                    any = info
                        .discover(&self.service_type, &self.filter, module, &*self.sink)
                        .await;
                }
            }
            None => {
                for info in self.engine.registry.all() {
                    self.trace
                        .log(|| format!("matching against node {}", info.node_name()));
                    if info
                        .discover(&self.service_type, &self.filter, module, &*self.sink)
                        .await
                    {
                        any = true;
                    }
                }
            }
        }
        debug!(
            event = events::DISCOVERY_MATCH_PASS,
            component = COMPONENT,
            filter = %self.filter,
            matches = any,
            "registry match pass"
        );
        any
    }
}
