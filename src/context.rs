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

//! Mutable per-invocation state the resolver reads and writes: the locator,
//! the affinities, the chosen destination, and the per-invocation
//! attachments (blacklist, attempted naming locations, preferred
//! destinations, naming provider, trace).

use crate::locator::{Affinity, Locator};
use crate::observability::events;
use crate::trace::TraceSink;
use crate::transport::{NamingProvider, TransportError};
use std::collections::HashSet;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use tracing::debug;
use url::Url;

const COMPONENT: &str = "invocation_context";

///
/// [`InvocationContext`] is owned by the invocation pipeline for the
/// duration of one invocation attempt (including retries). The resolver is
/// the only writer of destination, target affinity, and initial cluster; the
/// pipeline reads them to route the request and calls the post-invocation
/// handlers with the outcome.
pub struct InvocationContext {
    locator: Locator,
    weak_affinity: Affinity,
    destination: Option<Url>,
    target_affinity: Option<Affinity>,
    initial_cluster: Option<String>,
    retry_requested: bool,
    suppressed: Vec<TransportError>,
    blacklist: HashSet<Url>,
    attempted_locations: HashSet<Url>,
    preferred_destinations: Vec<Url>,
    naming_provider: Option<Arc<dyn NamingProvider>>,
    trace: TraceSink,
}

impl InvocationContext {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            weak_affinity: Affinity::None,
            destination: None,
            target_affinity: None,
            initial_cluster: None,
            retry_requested: false,
            suppressed: Vec::new(),
            blacklist: HashSet::new(),
            attempted_locations: HashSet::new(),
            preferred_destinations: Vec::new(),
            naming_provider: None,
            trace: TraceSink::disabled(),
        }
    }

    pub fn with_weak_affinity(mut self, weak_affinity: Affinity) -> Self {
        self.weak_affinity = weak_affinity;
        self
    }

    pub fn with_preferred_destinations(mut self, preferred: Vec<Url>) -> Self {
        self.preferred_destinations = preferred;
        self
    }

    pub fn with_naming_provider(mut self, provider: Arc<dyn NamingProvider>) -> Self {
        self.naming_provider = Some(provider);
        self
    }

    pub fn with_trace(mut self, trace: TraceSink) -> Self {
        self.trace = trace;
        self
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn set_locator(&mut self, locator: Locator) {
        self.locator = locator;
    }

    pub fn weak_affinity(&self) -> &Affinity {
        &self.weak_affinity
    }

    pub fn set_weak_affinity(&mut self, weak_affinity: Affinity) {
        self.weak_affinity = weak_affinity;
    }

    pub fn destination(&self) -> Option<&Url> {
        self.destination.as_ref()
    }

    pub fn set_destination(&mut self, destination: Option<Url>) {
        self.destination = destination;
    }

    pub fn target_affinity(&self) -> Option<&Affinity> {
        self.target_affinity.as_ref()
    }

    pub fn set_target_affinity(&mut self, target_affinity: Option<Affinity>) {
        self.target_affinity = target_affinity;
    }

    pub fn initial_cluster(&self) -> Option<&str> {
        self.initial_cluster.as_deref()
    }

    /// Registers the cluster the chosen destination was discovered through,
    /// so authentication can resolve the cluster's effective configuration.
    pub fn set_initial_cluster(&mut self, cluster_name: &str) {
        self.initial_cluster = Some(cluster_name.to_string());
    }

    pub fn request_retry(&mut self) {
        self.retry_requested = true;
    }

    /// Consumes a pending retry request.
    pub fn take_retry_request(&mut self) -> bool {
        std::mem::take(&mut self.retry_requested)
    }

    pub fn add_suppressed(&mut self, problem: TransportError) {
        self.suppressed.push(problem);
    }

    pub fn suppressed(&self) -> &[TransportError] {
        &self.suppressed
    }

    /// Excludes a destination from selection for the rest of this
    /// invocation. Re-adding the same destination is a no-op.
    pub fn add_blacklisted_destination(&mut self, destination: Url) -> bool {
        let added = self.blacklist.insert(destination.clone());
        if added {
            debug!(
                event = events::BLACKLIST_ADD,
                component = COMPONENT,
                destination = %destination,
                affinity = %self.locator.affinity(),
                weak_affinity = %self.weak_affinity,
                "blacklisting destination"
            );
        }
        added
    }

    pub fn is_blacklisted(&self, destination: &Url) -> bool {
        self.blacklist.contains(destination)
    }

    pub fn blacklist(&self) -> &HashSet<Url> {
        &self.blacklist
    }

    /// Records a naming location as attempted, once per invocation.
    pub fn mark_attempted(&mut self, location: Url) -> bool {
        self.attempted_locations.insert(location)
    }

    pub fn preferred_destinations(&self) -> &[Url] {
        &self.preferred_destinations
    }

    pub fn naming_provider(&self) -> Option<&Arc<dyn NamingProvider>> {
        self.naming_provider.as_ref()
    }

    pub fn trace(&self) -> &TraceSink {
        &self.trace
    }
}

/// Downstream invocation failures the resolver reacts to. A fault whose
/// cause is an authentication failure never marks the target as missing;
/// everything else does and triggers blacklist-and-retry.
#[derive(Clone, Eq, PartialEq)]
pub enum InvocationFault {
    NoSuchBean {
        message: String,
        authentication_cause: bool,
    },
    SendFailed {
        message: String,
        authentication_cause: bool,
    },
}

impl InvocationFault {
    pub fn is_target_missing(&self) -> bool {
        match self {
            InvocationFault::NoSuchBean {
                authentication_cause,
                ..
            }
            | InvocationFault::SendFailed {
                authentication_cause,
                ..
            } => !authentication_cause,
        }
    }
}

impl Debug for InvocationFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvocationFault::NoSuchBean { message, .. } => write!(f, "NoSuchBean({message})"),
            InvocationFault::SendFailed { message, .. } => write!(f, "SendFailed({message})"),
        }
    }
}

impl Display for InvocationFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvocationFault::NoSuchBean { message, .. } => {
                write!(f, "no such bean: {message}")
            }
            InvocationFault::SendFailed { message, .. } => {
                write!(f, "failed to send request: {message}")
            }
        }
    }
}

impl std::error::Error for InvocationFault {}

#[cfg(test)]
mod tests {
    use super::{InvocationContext, InvocationFault};
    use crate::locator::Locator;
    use url::Url;

    #[test]
    fn blacklist_addition_is_idempotent() {
        let mut context = InvocationContext::new(Locator::new("a", "m", "", "Bean"));
        let destination = Url::parse("remote://h1:8080").expect("test uri");
        assert!(context.add_blacklisted_destination(destination.clone()));
        assert!(!context.add_blacklisted_destination(destination.clone()));
        assert!(context.is_blacklisted(&destination));
        assert_eq!(context.blacklist().len(), 1);
    }

    #[test]
    fn retry_request_is_consumed_once() {
        let mut context = InvocationContext::new(Locator::new("a", "m", "", "Bean"));
        assert!(!context.take_retry_request());
        context.request_retry();
        assert!(context.take_retry_request());
        assert!(!context.take_retry_request());
    }

    #[test]
    fn authentication_faults_do_not_mark_the_target_missing() {
        let missing = InvocationFault::NoSuchBean {
            message: "gone".to_string(),
            authentication_cause: false,
        };
        let auth = InvocationFault::SendFailed {
            message: "sasl".to_string(),
            authentication_cause: true,
        };
        assert!(missing.is_target_missing());
        assert!(!auth.is_target_missing());
    }
}
