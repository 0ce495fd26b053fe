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

mod support;

use async_trait::async_trait;
use ejb_resolver::filter::{FilterSpec, ServiceType, FILTER_ATTR_NODE};
use ejb_resolver::transport::TransportError;
use ejb_resolver::{DiscoveryConnection, DiscoveryResult, NodeRegistry, ServiceRecord, TraceSink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support::{make_engine, uri, Collaborator};

struct CountingSink {
    completes: AtomicUsize,
    records: Mutex<Vec<ServiceRecord>>,
    problems: Mutex<Vec<TransportError>>,
}

impl CountingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            completes: AtomicUsize::new(0),
            records: Mutex::new(Vec::new()),
            problems: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl DiscoveryResult for CountingSink {
    async fn add_match(&self, record: ServiceRecord) {
        self.records.lock().push(record);
    }

    fn report_problem(&self, problem: TransportError) {
        self.problems.lock().push(problem);
    }

    fn complete(&self) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within the deadline");
}

fn module_query() -> FilterSpec {
    FilterSpec::equal("ejb-module", "shop/cart")
}

#[tokio::test]
async fn all_failed_endpoints_are_retried_regardless() {
    let collaborator = Collaborator::new();
    let registry = Arc::new(NodeRegistry::new());
    let e1 = uri("remote://e1:8080");
    let e2 = uri("remote://e2:8080");
    registry.failed_destinations().mark_failed(e1.clone());
    registry.failed_destinations().mark_failed(e2.clone());

    let engine = make_engine(
        &collaborator,
        &registry,
        vec![
            DiscoveryConnection::new(e1.clone()),
            DiscoveryConnection::new(e2.clone()),
        ],
    );
    let (mut queue, _request) = engine
        .discover_queue(ServiceType::ejb(), module_query(), TraceSink::disabled())
        .await;

    assert!(queue
        .take_service()
        .await
        .expect("completed normally")
        .is_none());
    assert!(queue.problems().is_empty());

    // the retry pass reprobed both failed endpoints, and the empty match
    // pass reprobed them once more in phase 2
    let attempts = collaborator.attempted_uris();
    assert_eq!(attempts.len(), 4);
    assert_eq!(attempts.iter().filter(|u| **u == e1).count(), 2);
    assert_eq!(attempts.iter().filter(|u| **u == e2).count(), 2);

    // successful probes cleared the stale failure hints
    assert!(!registry.failed_destinations().contains(&e1));
    assert!(!registry.failed_destinations().contains(&e2));
}

#[tokio::test]
async fn result_completes_exactly_once() {
    let collaborator = Collaborator::new();
    let registry = Arc::new(NodeRegistry::new());
    let good = uri("remote://good:8080");
    let bad = uri("remote://bad:8080");
    collaborator.fail_connect(&bad, "connection refused");

    let engine = make_engine(
        &collaborator,
        &registry,
        vec![
            DiscoveryConnection::new(good.clone()),
            DiscoveryConnection::new(bad.clone()),
        ],
    );
    let sink = CountingSink::new();
    let _request = engine
        .discover(
            ServiceType::ejb(),
            module_query(),
            sink.clone(),
            TraceSink::disabled(),
        )
        .await;

    wait_until(|| sink.completes.load(Ordering::SeqCst) > 0).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.completes.load(Ordering::SeqCst), 1);
    assert!(!sink.problems.lock().is_empty());
}

#[tokio::test]
async fn foreign_service_types_complete_immediately() {
    let collaborator = Collaborator::new();
    let registry = Arc::new(NodeRegistry::new());
    let engine = make_engine(
        &collaborator,
        &registry,
        vec![DiscoveryConnection::new(uri("remote://e1:8080"))],
    );

    let sink = CountingSink::new();
    let request = engine
        .discover(
            ServiceType::of("http", "jboss"),
            module_query(),
            sink.clone(),
            TraceSink::disabled(),
        )
        .await;
    request.cancel();

    assert_eq!(sink.completes.load(Ordering::SeqCst), 1);
    assert!(collaborator.attempted_uris().is_empty());
}

#[tokio::test]
async fn cancelled_probes_still_complete_the_pass() {
    let collaborator = Collaborator::new();
    let registry = Arc::new(NodeRegistry::new());
    let hanging = uri("remote://hang:8080");
    collaborator.hang_connect(&hanging);
    // registry state that satisfies the query once the pass can finish
    registry
        .get_or_create("n1")
        .register_connection(uri("remote://h1:8080"));

    let engine = make_engine(
        &collaborator,
        &registry,
        vec![DiscoveryConnection::new(hanging)],
    );
    let (mut queue, request) = engine
        .discover_queue(
            ServiceType::ejb(),
            FilterSpec::equal(FILTER_ATTR_NODE, "n1"),
            TraceSink::disabled(),
        )
        .await;
    request.cancel();

    // the hanging probe observes cancellation and counts down, so the
    // match pass runs and the stream still terminates
    let first = tokio::time::timeout(Duration::from_secs(2), queue.take_service())
        .await
        .expect("cancellation must complete the pass");
    assert!(first.expect("completed normally").is_some());
    let second = tokio::time::timeout(Duration::from_secs(2), queue.take_service())
        .await
        .expect("cancellation must complete the pass");
    assert!(second.expect("completed normally").is_none());
}

#[tokio::test]
async fn unusable_schemes_are_skipped_without_probing() {
    let collaborator = Collaborator::new();
    collaborator
        .unsupported_schemes
        .write()
        .insert("bogus".to_string());
    let registry = Arc::new(NodeRegistry::new());

    let engine = make_engine(
        &collaborator,
        &registry,
        vec![DiscoveryConnection::new(uri("bogus://e1:8080"))],
    );
    let (mut queue, _request) = engine
        .discover_queue(ServiceType::ejb(), module_query(), TraceSink::disabled())
        .await;

    assert!(queue
        .take_service()
        .await
        .expect("completed normally")
        .is_none());
    assert!(collaborator.attempted_uris().is_empty());
}

#[tokio::test]
async fn probe_failures_mark_destinations_and_success_clears_them() {
    let collaborator = Collaborator::new();
    let registry = Arc::new(NodeRegistry::new());
    let flaky = uri("remote://flaky:8080");
    collaborator.fail_connect(&flaky, "connection refused");

    let engine = make_engine(
        &collaborator,
        &registry,
        vec![DiscoveryConnection::new(flaky.clone())],
    );

    let (mut queue, _request) = engine
        .discover_queue(ServiceType::ejb(), module_query(), TraceSink::disabled())
        .await;
    assert!(queue
        .take_service()
        .await
        .expect("completed normally")
        .is_none());
    assert!(!queue.problems().is_empty());
    assert!(registry.failed_destinations().contains(&flaky));

    // destination recovers: the retry pass probes it despite the hint
    collaborator.connect_failures.write().clear();
    let (mut queue, _request) = engine
        .discover_queue(ServiceType::ejb(), module_query(), TraceSink::disabled())
        .await;
    assert!(queue
        .take_service()
        .await
        .expect("completed normally")
        .is_none());
    assert!(!registry.failed_destinations().contains(&flaky));
}

#[tokio::test]
async fn connections_for_discovery_only_participate() {
    let collaborator = Collaborator::new();
    let registry = Arc::new(NodeRegistry::new());
    let plain = uri("remote://plain:8080");
    let probed = uri("remote://probed:8080");

    let engine = make_engine(
        &collaborator,
        &registry,
        vec![
            DiscoveryConnection::new(plain.clone()).with_for_discovery(false),
            DiscoveryConnection::new(probed.clone()),
        ],
    );
    let (mut queue, _request) = engine
        .discover_queue(ServiceType::ejb(), module_query(), TraceSink::disabled())
        .await;
    assert!(queue
        .take_service()
        .await
        .expect("completed normally")
        .is_none());

    let attempts = collaborator.attempted_uris();
    assert!(attempts.iter().all(|attempted| *attempted != plain));
    assert!(attempts.iter().any(|attempted| *attempted == probed));
}

#[tokio::test]
async fn node_queries_match_only_the_named_node() {
    let collaborator = Collaborator::new();
    let registry = Arc::new(NodeRegistry::new());
    registry
        .get_or_create("n1")
        .register_connection(uri("remote://h1:8080"));
    registry
        .get_or_create("n2")
        .register_connection(uri("remote://h2:8080"));

    let engine = make_engine(&collaborator, &registry, vec![]);
    let (mut queue, _request) = engine
        .discover_queue(
            ServiceType::ejb(),
            FilterSpec::equal(FILTER_ATTR_NODE, "n1"),
            TraceSink::disabled(),
        )
        .await;

    let record = queue
        .take_service()
        .await
        .expect("completed normally")
        .expect("one record");
    assert_eq!(record.first_attribute(FILTER_ATTR_NODE), Some("n1"));
    assert!(queue
        .take_service()
        .await
        .expect("completed normally")
        .is_none());
}
