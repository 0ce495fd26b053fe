//! Destination URI construction and socket-address helpers shared by the
//! discovery engine and the resolver.

mod cidr;

pub use cidr::{CidrAddressTable, CidrMapping, CidrParseError, CidrRange};

use std::net::{IpAddr, SocketAddr};
use url::Url;

/// Builds the location URI for a cluster-derived destination: the protocol
/// key of the address table as the scheme, the optimal literal form of the
/// address as the host (IPv6 bracketed), and the mapping's port. No path,
/// query, or fragment. Returns `None` for unparseable combinations, which the
/// enumeration skips.
pub fn destination_uri(protocol: &str, destination: SocketAddr) -> Option<Url> {
    let host = match destination.ip() {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{v6}]"),
    };
    Url::parse(&format!("{}://{}:{}", protocol, host, destination.port())).ok()
}

/// The socket address a location URI names, when its host is an IP literal.
/// Hostname hosts are not resolved at this layer.
pub fn socket_address_of(uri: &Url) -> Option<SocketAddr> {
    let port = uri.port()?;
    let host = uri.host_str()?;
    let literal = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let ip: IpAddr = literal.parse().ok()?;
    Some(SocketAddr::new(ip, port))
}
