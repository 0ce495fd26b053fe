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

//! Collaborator seams of the resolution core. The wire transport, the
//! connection endpoint, the authentication client, and the naming provider
//! all live outside this crate; probes and the resolver only ever talk to
//! them through the traits here.

use async_trait::async_trait;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;
use url::Url;

///
/// The wire transport a destination scheme is served by.
///
/// `source_address` reports the local address the transport would bind to
/// reach a destination, which drives both address-table selection and
/// `source-ip` record filtering. `is_connected` feeds the connected/available
/// partition handed to the cluster node selector.
#[async_trait]
pub trait TransportProvider: Send + Sync {
    fn supports_protocol(&self, scheme: &str) -> bool;

    fn source_address(&self, destination: &SocketAddr) -> Option<SocketAddr>;

    fn is_connected(&self, destination: &Url) -> bool;

    /// Requests the client service channel over an established connection.
    async fn open_channel(
        &self,
        connection: &Arc<dyn PeerConnection>,
    ) -> Result<ClientChannel, TransportError>;
}

///
/// The connection endpoint that turns a destination URI into an
/// authenticated peer connection. Connection attempts are expected to be
/// cancel-safe: probes race them against a cancellation signal and drop the
/// future when the attempt is called off.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    fn is_valid_uri_scheme(&self, scheme: &str) -> bool;

    async fn get_connected_identity(
        &self,
        destination: &Url,
        ssl: Option<&SslConfig>,
        authentication: AuthConfig,
    ) -> Result<Arc<dyn PeerConnection>, TransportError>;
}

/// Authentication configuration source. Probes of cluster-derived nodes
/// resolve their configuration against the cluster's effective
/// authentication URI rather than the probed destination.
pub trait AuthenticationClient: Send + Sync {
    fn ssl_context(&self, destination: &Url) -> Result<Option<SslConfig>, TransportError>;

    fn authentication_configuration(
        &self,
        destination: &Url,
        abstract_type: &str,
        abstract_type_authority: &str,
    ) -> AuthConfig;
}

/// Naming context locations, consulted only when cluster discovery comes up
/// empty.
pub trait NamingProvider: Send + Sync {
    fn locations(&self) -> Vec<Url>;
}

/// An authenticated connection to one peer. Opaque to this crate beyond the
/// URI it was established against.
pub trait PeerConnection: Send + Sync {
    fn peer_uri(&self) -> &Url;
}

/// The client service channel over a peer connection. Holding one proves the
/// peer speaks the client protocol, which is what discovery probes are after.
pub struct ClientChannel {
    connection: Arc<dyn PeerConnection>,
}

impl ClientChannel {
    pub fn new(connection: Arc<dyn PeerConnection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<dyn PeerConnection> {
        &self.connection
    }
}

/// Authentication configuration for one connection attempt. The protocol,
/// host, and port overrides exist for statically configured destinations;
/// they are stripped before probing dynamically discovered cluster nodes so a
/// stale override cannot misdirect the attempt.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AuthConfig {
    pub principal: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl AuthConfig {
    pub fn without_location_overrides(mut self) -> Self {
        self.protocol = None;
        self.host = None;
        self.port = None;
        self
    }
}

/// Opaque TLS configuration handed from the authentication client to the
/// connection factory.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SslConfig {
    pub server_name: Option<String>,
}

// Probe failures are collected as problems on the discovery result and are
// never fatal to the discovery pass itself.
#[derive(Clone, Eq, PartialEq)]
pub enum TransportError {
    Connect { destination: Url, reason: String },
    Channel { destination: Url, reason: String },
    SslConfiguration { destination: Url, reason: String },
}

impl TransportError {
    pub fn destination(&self) -> &Url {
        match self {
            TransportError::Connect { destination, .. }
            | TransportError::Channel { destination, .. }
            | TransportError::SslConfiguration { destination, .. } => destination,
        }
    }
}

impl Debug for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect {
                destination,
                reason,
            } => write!(f, "Connect({destination}, {reason})"),
            TransportError::Channel {
                destination,
                reason,
            } => write!(f, "Channel({destination}, {reason})"),
            TransportError::SslConfiguration {
                destination,
                reason,
            } => write!(f, "SslConfiguration({destination}, {reason})"),
        }
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect {
                destination,
                reason,
            } => write!(f, "failed to connect to {destination}: {reason}"),
            TransportError::Channel {
                destination,
                reason,
            } => write!(
                f,
                "failed to open client channel to {destination}: {reason}"
            ),
            TransportError::SslConfiguration {
                destination,
                reason,
            } => write!(
                f,
                "failed to configure SSL context for {destination}: {reason}"
            ),
        }
    }
}

impl std::error::Error for TransportError {}
