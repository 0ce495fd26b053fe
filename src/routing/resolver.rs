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

//! Affinity-driven destination resolution.
//!
//! The resolver turns the invocation's strong and weak affinities into a
//! discovery strategy, drains the resulting record stream, and commits one
//! `(destination, target affinity, cluster)` choice onto the invocation
//! context. When the chosen destination later turns out to be missing, the
//! post-invocation handlers blacklist it and request a retry.

use crate::context::{InvocationContext, InvocationFault};
use crate::data_plane::{DiscoveryEngine, DiscoveryRequest, ServicesQueue};
use crate::filter::{
    FilterSpec, ServiceType, FILTER_ATTR_CLUSTER, FILTER_ATTR_EJB_MODULE,
    FILTER_ATTR_EJB_MODULE_DISTINCT, FILTER_ATTR_NODE,
};
use crate::locator::{Affinity, ModuleIdentifier};
use crate::observability::events;
use crate::routing::selectors::{
    ClusterNodeSelector, DeploymentNodeSelector, DiscoveredUriSelector,
    PreferConnectedClusterNodeSelector, RandomDeploymentNodeSelector, RandomUriSelector,
};
use crate::routing::source_ip::satisfies_source_address;
use crate::transport::{TransportError, TransportProvider};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const COMPONENT: &str = "resolver";

const CLUSTER_NODE_SELECTOR: &str = "cluster node selector";
const DEPLOYMENT_NODE_SELECTOR: &str = "deployment node selector";
const DISCOVERED_URI_SELECTOR: &str = "discovered uri selector";

/// Fatal resolution failures. Discovery problems accumulated before the
/// failure ride along as suppressed details.
pub enum ResolveError {
    SelectorReturnedNull {
        selector: &'static str,
        suppressed: Vec<TransportError>,
    },
    SelectorReturnedUnknownNode {
        selector: &'static str,
        node: String,
        suppressed: Vec<TransportError>,
    },
    OperationInterrupted,
}

impl ResolveError {
    pub fn suppressed(&self) -> &[TransportError] {
        match self {
            ResolveError::SelectorReturnedNull { suppressed, .. }
            | ResolveError::SelectorReturnedUnknownNode { suppressed, .. } => suppressed,
            ResolveError::OperationInterrupted => &[],
        }
    }
}

impl Debug for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::SelectorReturnedNull { selector, .. } => {
                write!(f, "SelectorReturnedNull({selector})")
            }
            ResolveError::SelectorReturnedUnknownNode { selector, node, .. } => {
                write!(f, "SelectorReturnedUnknownNode({selector}, {node})")
            }
            ResolveError::OperationInterrupted => f.write_str("OperationInterrupted"),
        }
    }
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::SelectorReturnedNull { selector, .. } => {
                write!(f, "{selector} returned no node")
            }
            ResolveError::SelectorReturnedUnknownNode { selector, node, .. } => {
                write!(f, "{selector} returned unknown candidate {node}")
            }
            ResolveError::OperationInterrupted => f.write_str("operation interrupted"),
        }
    }
}

impl std::error::Error for ResolveError {}

///
/// [`Resolver`] executes the affinity table for one invocation context:
///
/// | strong | weak | strategy |
/// |---|---|---|
/// | `Uri`/`Local` | any | direct, unless blacklisted |
/// | `None` | `Uri`/`Local` | direct, unless blacklisted |
/// | `None` | `Node` | first match on the node |
/// | `Node` | any | first match on the node |
/// | `Cluster` | `Node` | first match, cluster discovery as fallback |
/// | `Cluster` | `Uri`/`Local` | direct |
/// | `Cluster` | `None`/`Cluster` | cluster discovery |
/// | `None` | `None`/`Cluster` | any discovery over the module identity |
///
/// Record arrival order carries no meaning; determinism comes from the
/// pluggable selector policies.
pub struct Resolver {
    engine: Arc<DiscoveryEngine>,
    transport: Arc<dyn TransportProvider>,
    cluster_node_selector: Arc<dyn ClusterNodeSelector>,
    deployment_node_selector: Arc<dyn DeploymentNodeSelector>,
    discovered_uri_selector: Arc<dyn DiscoveredUriSelector>,
}

impl Resolver {
    pub fn new(engine: Arc<DiscoveryEngine>, transport: Arc<dyn TransportProvider>) -> Self {
        Self {
            engine,
            transport,
            cluster_node_selector: Arc::new(PreferConnectedClusterNodeSelector),
            deployment_node_selector: Arc::new(RandomDeploymentNodeSelector),
            discovered_uri_selector: Arc::new(RandomUriSelector),
        }
    }

    pub fn with_cluster_node_selector(mut self, selector: Arc<dyn ClusterNodeSelector>) -> Self {
        self.cluster_node_selector = selector;
        self
    }

    pub fn with_deployment_node_selector(
        mut self,
        selector: Arc<dyn DeploymentNodeSelector>,
    ) -> Self {
        self.deployment_node_selector = selector;
        self
    }

    pub fn with_discovered_uri_selector(
        mut self,
        selector: Arc<dyn DiscoveredUriSelector>,
    ) -> Self {
        self.discovered_uri_selector = selector;
        self
    }

    /// Resolves a destination for the invocation, passing through untouched
    /// when one is already set. On success the returned problems are for the
    /// pipeline to attach as suppressed details should the invocation
    /// ultimately fail; they carry no meaning otherwise.
    pub async fn resolve(
        &self,
        context: &mut InvocationContext,
    ) -> Result<Vec<TransportError>, ResolveError> {
        if context.destination().is_some() {
            context
                .trace()
                .log(|| "destination already set, not performing discovery".to_string());
            return Ok(Vec::new());
        }
        self.execute_discovery(context).await
    }

    async fn execute_discovery(
        &self,
        context: &mut InvocationContext,
    ) -> Result<Vec<TransportError>, ResolveError> {
        let affinity = context.locator().affinity().clone();
        let weak_affinity = context.weak_affinity().clone();
        context.trace().log(|| {
            format!("executing discovery, affinity {affinity}, weak affinity {weak_affinity}")
        });

        match (affinity, weak_affinity) {
            (strong @ (Affinity::Uri(_) | Affinity::Local), _) => {
                self.set_direct(context, strong, true);
                Ok(Vec::new())
            }
            (Affinity::None, weak @ (Affinity::Uri(_) | Affinity::Local)) => {
                self.set_direct(context, weak, true);
                Ok(Vec::new())
            }
            (Affinity::None, Affinity::Node(node)) => {
                let filter = FilterSpec::equal(FILTER_ATTR_NODE, &node);
                self.first_match_discovery(context, filter, None).await
            }
            (Affinity::Node(node), _) => {
                let filter = FilterSpec::equal(FILTER_ATTR_NODE, &node);
                self.first_match_discovery(context, filter, None).await
            }
            (Affinity::Cluster(cluster), Affinity::Node(node)) => {
                let filter = FilterSpec::all(vec![
                    FilterSpec::equal(FILTER_ATTR_CLUSTER, &cluster),
                    FilterSpec::equal(FILTER_ATTR_NODE, &node),
                ]);
                let fallback = FilterSpec::all(vec![
                    FilterSpec::equal(FILTER_ATTR_CLUSTER, &cluster),
                    FilterSpec::has_attribute(FILTER_ATTR_NODE),
                ]);
                self.first_match_discovery(context, filter, Some((cluster, fallback)))
                    .await
            }
            (Affinity::Cluster(_), weak @ (Affinity::Uri(_) | Affinity::Local)) => {
                self.set_direct(context, weak, false);
                Ok(Vec::new())
            }
            (Affinity::Cluster(cluster), _) => {
                let filter =
                    FilterSpec::all(vec![FilterSpec::equal(FILTER_ATTR_CLUSTER, &cluster)]);
                self.cluster_discovery(context, filter, cluster).await
            }
            (Affinity::None, _) => {
                let filter = module_filter(context.locator().module());
                self.any_discovery(context, filter).await
            }
        }
    }

    fn set_direct(
        &self,
        context: &mut InvocationContext,
        affinity: Affinity,
        check_blacklist: bool,
    ) {
        let Some(uri) = affinity.uri() else {
            return;
        };
        if check_blacklist && context.is_blacklisted(&uri) {
            context
                .trace()
                .log(|| format!("direct destination {uri} is blacklisted"));
            return;
        }
        debug!(
            event = events::RESOLVE_DIRECT,
            component = COMPONENT,
            destination = %uri,
            affinity = %affinity,
            "set direct destination"
        );
        context.set_destination(Some(uri));
        context.set_target_affinity(Some(affinity));
    }

    async fn first_match_discovery(
        &self,
        context: &mut InvocationContext,
        filter: FilterSpec,
        fallback: Option<(String, FilterSpec)>,
    ) -> Result<Vec<TransportError>, ResolveError> {
        debug!(
            event = events::RESOLVE_FIRST_MATCH,
            component = COMPONENT,
            filter = %filter,
            "performing first-match discovery"
        );
        let (mut queue, _request) = self.discover(filter, context).await;
        loop {
            match queue.take_service().await {
                Err(_) => return Err(ResolveError::OperationInterrupted),
                Ok(None) => break,
                Ok(Some(record)) => {
                    let location = record.location().clone();
                    if context.is_blacklisted(&location) {
                        continue;
                    }
                    let target = match record.first_attribute(FILTER_ATTR_NODE) {
                        Some(node) => Affinity::Node(node.to_string()),
                        None => Affinity::Uri(location.clone()),
                    };
                    context.trace().log(|| {
                        format!("first-match discovery chose {location}, affinity {target}")
                    });
                    context.set_target_affinity(Some(target));
                    context.set_destination(Some(location));
                    return Ok(queue.problems());
                }
            }
        }
        let problems = queue.problems();
        drop(queue);

        if let Some((cluster_name, fallback_filter)) = fallback {
            debug!(
                event = events::RESOLVE_FALLBACK_CLUSTER,
                component = COMPONENT,
                cluster = %cluster_name,
                "first-match found nothing, falling back to cluster discovery"
            );
            let more = self
                .cluster_discovery(context, fallback_filter, cluster_name)
                .await?;
            Ok(merge_problems(problems, more))
        } else {
            debug!(
                event = events::RESOLVE_NO_MATCH,
                component = COMPONENT,
                "first-match discovery found nothing"
            );
            Ok(problems)
        }
    }

    async fn cluster_discovery(
        &self,
        context: &mut InvocationContext,
        filter: FilterSpec,
        cluster_name: String,
    ) -> Result<Vec<TransportError>, ResolveError> {
        debug!(
            event = events::RESOLVE_CLUSTER,
            component = COMPONENT,
            cluster = %cluster_name,
            filter = %filter,
            "performing cluster discovery"
        );
        let (mut queue, _request) = self.discover(filter, context).await;
        let mut nodes: HashMap<String, Url> = HashMap::new();
        loop {
            match queue.take_service().await {
                Err(_) => return Err(ResolveError::OperationInterrupted),
                Ok(None) => break,
                Ok(Some(record)) => {
                    let location = record.location().clone();
                    if context.is_blacklisted(&location) {
                        continue;
                    }
                    if !self.transport.supports_protocol(location.scheme()) {
                        continue;
                    }
                    if !satisfies_source_address(&record, &*self.transport) {
                        continue;
                    }
                    if let Some(node) = record.first_attribute(FILTER_ATTR_NODE) {
                        nodes.insert(node.to_string(), location);
                    }
                }
            }
        }
        let problems = queue.problems();
        drop(queue);

        let nodes = filter_to_preferred_nodes(context, nodes);

        if nodes.is_empty() {
            debug!(
                event = events::RESOLVE_NO_MATCH,
                component = COMPONENT,
                cluster = %cluster_name,
                "cluster discovery found no node"
            );
            self.try_naming_destination(context);
            return Ok(problems);
        }
        if nodes.len() == 1 {
            if let Some((node_name, uri)) = nodes.into_iter().next() {
                context
                    .trace()
                    .log(|| format!("cluster discovery chose sole node {node_name} at {uri}"));
                context.set_target_affinity(Some(Affinity::Node(node_name)));
                context.set_destination(Some(uri));
                context.set_initial_cluster(&cluster_name);
            }
            return Ok(problems);
        }

        let available_nodes: Vec<String> = nodes.keys().cloned().collect();
        let connected_nodes: Vec<String> = nodes
            .iter()
            .filter(|(_, uri)| self.transport.is_connected(uri))
            .map(|(node, _)| node.clone())
            .collect();
        debug!(
            event = events::SELECTOR_DECISION,
            component = COMPONENT,
            cluster = %cluster_name,
            selector = CLUSTER_NODE_SELECTOR,
            connected = connected_nodes.len(),
            available = available_nodes.len(),
            "running cluster node selection"
        );
        let Some(selected) = self.cluster_node_selector.select_node(
            &cluster_name,
            &connected_nodes,
            &available_nodes,
        ) else {
            warn!(
                event = events::SELECTOR_FAILED,
                component = COMPONENT,
                cluster = %cluster_name,
                selector = CLUSTER_NODE_SELECTOR,
                "selector returned no node"
            );
            return Err(ResolveError::SelectorReturnedNull {
                selector: CLUSTER_NODE_SELECTOR,
                suppressed: problems,
            });
        };
        let Some(uri) = nodes.get(&selected) else {
            warn!(
                event = events::SELECTOR_FAILED,
                component = COMPONENT,
                cluster = %cluster_name,
                selector = CLUSTER_NODE_SELECTOR,
                node = %selected,
                "selector returned a node outside the available set"
            );
            return Err(ResolveError::SelectorReturnedUnknownNode {
                selector: CLUSTER_NODE_SELECTOR,
                node: selected,
                suppressed: problems,
            });
        };
        context
            .trace()
            .log(|| format!("cluster discovery selected node {selected} at {uri}"));
        context.set_destination(Some(uri.clone()));
        context.set_target_affinity(Some(Affinity::Node(selected)));
        context.set_initial_cluster(&cluster_name);
        Ok(problems)
    }

    async fn any_discovery(
        &self,
        context: &mut InvocationContext,
        filter: FilterSpec,
    ) -> Result<Vec<TransportError>, ResolveError> {
        debug!(
            event = events::RESOLVE_ANY,
            component = COMPONENT,
            filter = %filter,
            "performing any discovery"
        );
        let (mut queue, _request) = self.discover(filter, context).await;
        let mut nodes: HashMap<Url, Option<String>> = HashMap::new();
        let mut uris: HashMap<String, Url> = HashMap::new();
        let mut cluster_associations: HashMap<Url, Vec<String>> = HashMap::new();
        let mut nodeless = 0usize;
        loop {
            match queue.take_service().await {
                Err(_) => return Err(ResolveError::OperationInterrupted),
                Ok(None) => break,
                Ok(Some(record)) => {
                    let location = record.location().clone();
                    if context.is_blacklisted(&location) {
                        continue;
                    }
                    match record.first_attribute(FILTER_ATTR_NODE) {
                        Some(node_name) => {
                            if let Some(None) = nodes.get(&location) {
                                nodeless -= 1;
                            }
                            nodes.insert(location.clone(), Some(node_name.to_string()));
                            uris.insert(node_name.to_string(), location.clone());
                        }
                        None => {
                            // never shadow a node name found separately
                            if !nodes.contains_key(&location) {
                                nodes.insert(location.clone(), None);
                                nodeless += 1;
                            }
                        }
                    }
                    for cluster in record.attribute_values(FILTER_ATTR_CLUSTER) {
                        cluster_associations
                            .entry(location.clone())
                            .or_default()
                            .push(cluster.clone());
                    }
                }
            }
        }
        let problems = queue.problems();
        drop(queue);

        if nodes.is_empty() {
            debug!(
                event = events::RESOLVE_NO_MATCH,
                component = COMPONENT,
                "any discovery found nothing"
            );
            return Ok(problems);
        }

        let location: Url;
        let node_name: Option<String>;
        if nodes.len() == 1 {
            match nodes.into_iter().next() {
                Some((uri, name)) => {
                    location = uri;
                    node_name = name;
                }
                None => return Ok(problems),
            }
        } else if nodeless == 0 {
            let node_names: Vec<String> = nodes.values().flatten().cloned().collect();
            let module = context.locator().module().clone();
            let Some(selected) = self.deployment_node_selector.select_node(
                &node_names,
                module.app(),
                module.module(),
                module.distinct(),
            ) else {
                warn!(
                    event = events::SELECTOR_FAILED,
                    component = COMPONENT,
                    selector = DEPLOYMENT_NODE_SELECTOR,
                    "selector returned no node"
                );
                return Err(ResolveError::SelectorReturnedNull {
                    selector: DEPLOYMENT_NODE_SELECTOR,
                    suppressed: problems,
                });
            };
            let Some(uri) = uris.get(&selected) else {
                warn!(
                    event = events::SELECTOR_FAILED,
                    component = COMPONENT,
                    selector = DEPLOYMENT_NODE_SELECTOR,
                    node = %selected,
                    "selector returned a node outside the eligible set"
                );
                return Err(ResolveError::SelectorReturnedUnknownNode {
                    selector: DEPLOYMENT_NODE_SELECTOR,
                    node: selected,
                    suppressed: problems,
                });
            };
            location = uri.clone();
            node_name = Some(selected);
        } else {
            let candidates: Vec<Url> = nodes.keys().cloned().collect();
            let Some(selected) = self
                .discovered_uri_selector
                .select_uri(&candidates, context.locator())
            else {
                warn!(
                    event = events::SELECTOR_FAILED,
                    component = COMPONENT,
                    selector = DISCOVERED_URI_SELECTOR,
                    "selector returned no location"
                );
                return Err(ResolveError::SelectorReturnedNull {
                    selector: DISCOVERED_URI_SELECTOR,
                    suppressed: problems,
                });
            };
            match nodes.get(&selected) {
                None => {
                    warn!(
                        event = events::SELECTOR_FAILED,
                        component = COMPONENT,
                        selector = DISCOVERED_URI_SELECTOR,
                        uri = %selected,
                        "selector returned a location outside the discovered set"
                    );
                    return Err(ResolveError::SelectorReturnedUnknownNode {
                        selector: DISCOVERED_URI_SELECTOR,
                        node: selected.to_string(),
                        suppressed: problems,
                    });
                }
                Some(name) => {
                    node_name = name.clone();
                    location = selected;
                }
            }
        }

        // dynamically discovered nodes rarely have their own auth policy;
        // record the cluster so the effective configuration can be found
        if let Some(associations) = cluster_associations.get(&location) {
            let cluster = if associations.len() == 1 {
                associations.first().cloned()
            } else {
                associations.choose(&mut rand::thread_rng()).cloned()
            };
            if let Some(cluster) = cluster {
                context.set_initial_cluster(&cluster);
            }
        }
        context.trace().log(|| {
            format!(
                "any discovery chose {location}, node {}",
                node_name.as_deref().unwrap_or("unknown")
            )
        });
        context.set_destination(Some(location));
        if let Some(node_name) = node_name {
            context.set_target_affinity(Some(Affinity::Node(node_name)));
        }
        Ok(problems)
    }

    /// Cluster discovery came up empty: fall back to the naming context's
    /// locations, rotating from a random offset and skipping locations
    /// already attempted this invocation. Only applies while both affinities
    /// leave the placement open.
    fn try_naming_destination(&self, context: &mut InvocationContext) {
        let Some(provider) = context.naming_provider().cloned() else {
            return;
        };
        if context.destination().is_some() {
            return;
        }
        if !matches!(
            context.locator().affinity(),
            Affinity::None | Affinity::Cluster(_)
        ) {
            return;
        }
        if !matches!(
            context.weak_affinity(),
            Affinity::None | Affinity::Cluster(_)
        ) {
            return;
        }
        let locations = provider.locations();
        if locations.is_empty() {
            return;
        }
        let offset = if locations.len() == 1 {
            0
        } else {
            rand::thread_rng().gen_range(0..locations.len())
        };
        for index in 0..locations.len() {
            let location = locations[(index + offset) % locations.len()].clone();
            if context.mark_attempted(location.clone()) {
                debug!(
                    event = events::NAMING_FALLBACK,
                    component = COMPONENT,
                    destination = %location,
                    "using naming location as destination"
                );
                context.set_destination(Some(location));
                return;
            }
        }
    }

    /// Applies the invocation outcome: on success, stateful invocations with
    /// cluster affinity pin their weak affinity to where the session
    /// actually landed; on a missing target the destination is blacklisted
    /// and a retry is requested. The fault is handed back either way.
    pub fn handle_invocation_result(
        &self,
        context: &mut InvocationContext,
        outcome: Result<(), InvocationFault>,
    ) -> Result<(), InvocationFault> {
        match outcome {
            Err(fault) => {
                if fault.is_target_missing() {
                    self.process_missing_target(context);
                }
                Err(fault)
            }
            Ok(()) => {
                if context.locator().is_stateful()
                    && matches!(context.locator().affinity(), Affinity::Cluster(_))
                    && matches!(context.weak_affinity(), Affinity::None)
                {
                    if let Some(target) = context.target_affinity().cloned() {
                        debug!(
                            event = events::SESSION_AFFINITY_SET,
                            component = COMPONENT,
                            affinity = %target,
                            "pinning weak affinity to session target"
                        );
                        context.set_weak_affinity(target);
                    } else if let Some(destination) = context.destination().cloned() {
                        context.set_weak_affinity(Affinity::Uri(destination));
                    }
                }
                Ok(())
            }
        }
    }

    /// Applies a session-creation outcome: successful creations re-home the
    /// locator and weak affinity onto the session's location.
    pub fn handle_session_creation(
        &self,
        context: &mut InvocationContext,
        outcome: Result<(), InvocationFault>,
    ) -> Result<(), InvocationFault> {
        match outcome {
            Err(fault) => {
                if fault.is_target_missing() {
                    self.process_missing_target(context);
                }
                Err(fault)
            }
            Ok(()) => {
                self.setup_session_affinities(context);
                Ok(())
            }
        }
    }

    /// Re-homes a freshly created session: a locator without affinity
    /// adopts the target affinity (or destination URI), and a clustered
    /// locator without weak affinity pins the weak affinity the same way.
    pub fn setup_session_affinities(&self, context: &mut InvocationContext) {
        if matches!(context.locator().affinity(), Affinity::None) {
            if let Some(target) = context.target_affinity().cloned() {
                let locator = context.locator().clone().with_affinity(target);
                context.set_locator(locator);
            } else if let Some(destination) = context.destination().cloned() {
                let locator = context
                    .locator()
                    .clone()
                    .with_affinity(Affinity::Uri(destination));
                context.set_locator(locator);
            }
        }
        if matches!(context.locator().affinity(), Affinity::Cluster(_))
            && matches!(context.weak_affinity(), Affinity::None)
        {
            if let Some(target) = context.target_affinity().cloned() {
                debug!(
                    event = events::SESSION_AFFINITY_SET,
                    component = COMPONENT,
                    affinity = %target,
                    "pinning weak affinity to session target"
                );
                context.set_weak_affinity(target);
            } else if let Some(destination) = context.destination().cloned() {
                context.set_weak_affinity(Affinity::Uri(destination));
            }
        }
    }

    fn process_missing_target(&self, context: &mut InvocationContext) {
        let Some(destination) = context.destination().cloned() else {
            return;
        };
        context
            .trace()
            .log(|| format!("target missing at {destination}, blacklisting and requesting retry"));
        context.add_blacklisted_destination(destination);
        // clear the affinities so the retry can be re-targeted
        context.set_weak_affinity(Affinity::None);
        context.set_target_affinity(None);
        context.set_destination(None);
        context.request_retry();
    }

    async fn discover(
        &self,
        filter: FilterSpec,
        context: &InvocationContext,
    ) -> (ServicesQueue, DiscoveryRequest) {
        self.engine
            .discover_queue(ServiceType::ejb(), filter, context.trace().clone())
            .await
    }
}

fn module_filter(module: &ModuleIdentifier) -> FilterSpec {
    match module.distinct_value() {
        Some(distinct) => FilterSpec::equal(FILTER_ATTR_EJB_MODULE_DISTINCT, &distinct),
        None => FilterSpec::equal(FILTER_ATTR_EJB_MODULE, &module.module_value()),
    }
}

/// Keeps only the nodes whose URI appears in the invocation's preferred
/// destinations; an empty intersection retains the full set.
fn filter_to_preferred_nodes(
    context: &InvocationContext,
    nodes: HashMap<String, Url>,
) -> HashMap<String, Url> {
    let preferred = context.preferred_destinations();
    if preferred.is_empty() {
        return nodes;
    }
    let preferred: HashSet<&Url> = preferred.iter().collect();
    let filtered: HashMap<String, Url> = nodes
        .iter()
        .filter(|(_, uri)| preferred.contains(uri))
        .map(|(node, uri)| (node.clone(), uri.clone()))
        .collect();
    if filtered.is_empty() {
        nodes
    } else {
        filtered
    }
}

fn merge_problems(
    mut first: Vec<TransportError>,
    second: Vec<TransportError>,
) -> Vec<TransportError> {
    if second.is_empty() {
        return first;
    }
    if first.is_empty() {
        return second;
    }
    first.extend(second);
    first
}
