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

//! # ejb-resolver
//!
//! `ejb-resolver` is the destination-resolution core of a remote EJB
//! invocation client: it maps a logical target (an
//! application/module/distinct-name tuple, a named node, or a named cluster)
//! to one concrete transport destination URI.
//!
//! Two cooperating subsystems do the work:
//!
//! - [`DiscoveryEngine`] fans probes out across configured endpoints and
//!   cluster-derived destinations in parallel, delivering matching
//!   [`ServiceRecord`]s onto a [`ServicesQueue`], with a second phase that
//!   reprobes everything when every endpoint looks failed.
//! - [`Resolver`] drives the affinity state machine over that stream:
//!   it honors direct URI affinities, first-match node queries, cluster
//!   selection with pluggable policies, per-invocation blacklisting, and
//!   retry when a chosen destination turns out to be missing.
//!
//! The wire transport, the connection endpoint, authentication, and naming
//! stay outside this crate behind the traits in [`transport`].
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ejb_resolver::{
//!     Affinity, DiscoveryConnection, DiscoveryEngine, InvocationContext, Locator,
//!     NodeRegistry, Resolver,
//! };
//! # use ejb_resolver::transport::{
//! #     AuthConfig, AuthenticationClient, ClientChannel, ConnectionFactory, PeerConnection,
//! #     SslConfig, TransportError, TransportProvider,
//! # };
//! # use async_trait::async_trait;
//! # use std::net::SocketAddr;
//! # use url::Url;
//! #
//! # struct LoopConnection(Url);
//! # impl PeerConnection for LoopConnection {
//! #     fn peer_uri(&self) -> &Url { &self.0 }
//! # }
//! # struct Loopback;
//! # #[async_trait]
//! # impl TransportProvider for Loopback {
//! #     fn supports_protocol(&self, scheme: &str) -> bool { scheme == "remote" }
//! #     fn source_address(&self, _destination: &SocketAddr) -> Option<SocketAddr> { None }
//! #     fn is_connected(&self, _destination: &Url) -> bool { false }
//! #     async fn open_channel(
//! #         &self,
//! #         connection: &Arc<dyn PeerConnection>,
//! #     ) -> Result<ClientChannel, TransportError> {
//! #         Ok(ClientChannel::new(Arc::clone(connection)))
//! #     }
//! # }
//! # #[async_trait]
//! # impl ConnectionFactory for Loopback {
//! #     fn is_valid_uri_scheme(&self, scheme: &str) -> bool { scheme == "remote" }
//! #     async fn get_connected_identity(
//! #         &self,
//! #         destination: &Url,
//! #         _ssl: Option<&SslConfig>,
//! #         _authentication: AuthConfig,
//! #     ) -> Result<Arc<dyn PeerConnection>, TransportError> {
//! #         Ok(Arc::new(LoopConnection(destination.clone())))
//! #     }
//! # }
//! # impl AuthenticationClient for Loopback {
//! #     fn ssl_context(&self, _destination: &Url) -> Result<Option<SslConfig>, TransportError> {
//! #         Ok(None)
//! #     }
//! #     fn authentication_configuration(
//! #         &self,
//! #         _destination: &Url,
//! #         _abstract_type: &str,
//! #         _abstract_type_authority: &str,
//! #     ) -> AuthConfig {
//! #         AuthConfig::default()
//! #     }
//! # }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let registry = Arc::new(NodeRegistry::new());
//! let collaborator = Arc::new(Loopback);
//! let engine = Arc::new(
//!     DiscoveryEngine::new(
//!         registry,
//!         collaborator.clone(),
//!         collaborator.clone(),
//!         collaborator.clone(),
//!     )
//!     .with_configured_connections(vec![DiscoveryConnection::new(
//!         Url::parse("remote://server.example:8080").unwrap(),
//!     )]),
//! );
//! let resolver = Resolver::new(engine, collaborator);
//!
//! let locator = Locator::new("shop", "checkout", "", "CartBean")
//!     .with_affinity(Affinity::Cluster("web".to_string()));
//! let mut context = InvocationContext::new(locator);
//! let problems = resolver.resolve(&mut context).await.unwrap();
//! let _ = (context.destination(), problems);
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Control plane: node registry, cluster membership, effective-auth and
//!   failed-destination maps
//! - Data plane: probe fan-out, two-phase completion, the record queue
//! - Routing: the affinity state machine and selection policies
//!
//! ## Observability model
//!
//! The crate emits `tracing` events with canonical names and field keys
//! (see [`observability`]) and never installs a global subscriber;
//! binaries and tests own one-time subscriber initialization. Per-invocation
//! audit trails travel explicitly as [`TraceSink`] handles.

mod context;
mod locator;
mod record;

pub mod control_plane;
pub mod data_plane;
pub mod filter;
pub mod net;
pub mod observability;
pub mod routing;
pub mod transport;

mod trace;

pub use context::{InvocationContext, InvocationFault};
pub use control_plane::{ClusterNodeInformation, NodeInformation, NodeRegistry};
pub use data_plane::{
    DiscoveryConnection, DiscoveryEngine, DiscoveryRequest, DiscoveryResult, ServicesQueue,
};
pub use filter::{FilterSpec, ServiceType};
pub use locator::{Affinity, Locator, ModuleIdentifier};
pub use record::ServiceRecord;
pub use routing::{
    ClusterNodeSelector, DeploymentNodeSelector, DiscoveredUriSelector, ResolveError, Resolver,
};
pub use trace::TraceSink;
