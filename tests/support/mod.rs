use async_trait::async_trait;
use ejb_resolver::transport::{
    AuthConfig, AuthenticationClient, ClientChannel, ConnectionFactory, PeerConnection, SslConfig,
    TransportError, TransportProvider,
};
use ejb_resolver::{DiscoveryConnection, DiscoveryEngine, NodeRegistry};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use url::Url;

pub(crate) fn uri(value: &str) -> Url {
    Url::parse(value).expect("test uri")
}

pub(crate) struct TestConnection {
    destination: Url,
}

impl PeerConnection for TestConnection {
    fn peer_uri(&self) -> &Url {
        &self.destination
    }
}

/// One scriptable collaborator standing in for the transport provider, the
/// connection endpoint, and the authentication client at once.
#[derive(Default)]
pub(crate) struct Collaborator {
    pub unsupported_schemes: RwLock<HashSet<String>>,
    pub connect_failures: RwLock<HashMap<Url, String>>,
    pub hanging_destinations: RwLock<HashSet<Url>>,
    pub connected_destinations: RwLock<HashSet<Url>>,
    pub source_address: RwLock<Option<SocketAddr>>,
    /// every connection attempt, with the auth config it carried
    pub attempts: Mutex<Vec<(Url, AuthConfig)>>,
    /// every URI authentication configuration was resolved against
    pub auth_requests: Mutex<Vec<Url>>,
}

impl Collaborator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_connect(&self, destination: &Url, reason: &str) {
        self.connect_failures
            .write()
            .insert(destination.clone(), reason.to_string());
    }

    #[allow(dead_code)]
    pub fn hang_connect(&self, destination: &Url) {
        self.hanging_destinations
            .write()
            .insert(destination.clone());
    }

    #[allow(dead_code)]
    pub fn mark_connected(&self, destination: &Url) {
        self.connected_destinations
            .write()
            .insert(destination.clone());
    }

    pub fn attempted_uris(&self) -> Vec<Url> {
        self.attempts
            .lock()
            .iter()
            .map(|(destination, _)| destination.clone())
            .collect()
    }
}

#[async_trait]
impl TransportProvider for Collaborator {
    fn supports_protocol(&self, scheme: &str) -> bool {
        !self.unsupported_schemes.read().contains(scheme)
    }

    fn source_address(&self, _destination: &SocketAddr) -> Option<SocketAddr> {
        *self.source_address.read()
    }

    fn is_connected(&self, destination: &Url) -> bool {
        self.connected_destinations.read().contains(destination)
    }

    async fn open_channel(
        &self,
        connection: &Arc<dyn PeerConnection>,
    ) -> Result<ClientChannel, TransportError> {
        Ok(ClientChannel::new(Arc::clone(connection)))
    }
}

#[async_trait]
impl ConnectionFactory for Collaborator {
    fn is_valid_uri_scheme(&self, scheme: &str) -> bool {
        !self.unsupported_schemes.read().contains(scheme)
    }

    async fn get_connected_identity(
        &self,
        destination: &Url,
        _ssl: Option<&SslConfig>,
        authentication: AuthConfig,
    ) -> Result<Arc<dyn PeerConnection>, TransportError> {
        self.attempts
            .lock()
            .push((destination.clone(), authentication));
        if self.hanging_destinations.read().contains(destination) {
            std::future::pending::<()>().await;
        }
        if let Some(reason) = self.connect_failures.read().get(destination) {
            return Err(TransportError::Connect {
                destination: destination.clone(),
                reason: reason.clone(),
            });
        }
        Ok(Arc::new(TestConnection {
            destination: destination.clone(),
        }))
    }
}

impl AuthenticationClient for Collaborator {
    fn ssl_context(&self, _destination: &Url) -> Result<Option<SslConfig>, TransportError> {
        Ok(None)
    }

    fn authentication_configuration(
        &self,
        destination: &Url,
        _abstract_type: &str,
        _abstract_type_authority: &str,
    ) -> AuthConfig {
        self.auth_requests.lock().push(destination.clone());
        AuthConfig {
            principal: Some("test-principal".to_string()),
            protocol: Some(destination.scheme().to_string()),
            host: destination.host_str().map(str::to_string),
            port: destination.port(),
        }
    }
}

pub(crate) fn make_engine(
    collaborator: &Arc<Collaborator>,
    registry: &Arc<NodeRegistry>,
    connections: Vec<DiscoveryConnection>,
) -> Arc<DiscoveryEngine> {
    Arc::new(
        DiscoveryEngine::new(
            Arc::clone(registry),
            collaborator.clone(),
            collaborator.clone(),
            collaborator.clone(),
        )
        .with_configured_connections(connections),
    )
}
