//! `source-ip` record filtering: a record restricted to client source
//! networks only matches when the transport's local address for the record's
//! destination falls inside one of them.

use crate::filter::FILTER_ATTR_SOURCE_IP;
use crate::net::{self, CidrRange};
use crate::record::ServiceRecord;
use crate::transport::TransportProvider;

/// An empty `source-ip` list always satisfies. With an unknown source
/// address only a netmask-0 restriction satisfies; otherwise any listed
/// range containing the source address does. Unparseable values are skipped.
pub fn satisfies_source_address(record: &ServiceRecord, transport: &dyn TransportProvider) -> bool {
    let values = record.attribute_values(FILTER_ATTR_SOURCE_IP);
    if values.is_empty() {
        return true;
    }
    let source_ip = net::socket_address_of(record.location())
        .and_then(|destination| transport.source_address(&destination))
        .map(|source| source.ip());
    for value in values {
        let Ok(range) = value.parse::<CidrRange>() else {
            continue;
        };
        match source_ip {
            None => {
                if range.netmask_bits() == 0 {
                    return true;
                }
            }
            Some(ip) => {
                if range.contains(ip) {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::satisfies_source_address;
    use crate::filter::FILTER_ATTR_SOURCE_IP;
    use crate::net::CidrRange;
    use crate::record::ServiceRecord;
    use crate::transport::{ClientChannel, PeerConnection, TransportError, TransportProvider};
    use async_trait::async_trait;
    use rand::Rng;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use url::Url;

    struct FixedSourceTransport {
        source: Option<SocketAddr>,
    }

    #[async_trait]
    impl TransportProvider for FixedSourceTransport {
        fn supports_protocol(&self, _scheme: &str) -> bool {
            true
        }

        fn source_address(&self, _destination: &SocketAddr) -> Option<SocketAddr> {
            self.source
        }

        fn is_connected(&self, _destination: &Url) -> bool {
            false
        }

        async fn open_channel(
            &self,
            connection: &Arc<dyn PeerConnection>,
        ) -> Result<ClientChannel, TransportError> {
            Ok(ClientChannel::new(Arc::clone(connection)))
        }
    }

    fn record_with_ranges(ranges: &[&str]) -> ServiceRecord {
        let mut record =
            ServiceRecord::new(Url::parse("remote://10.0.0.1:8080").expect("test uri"));
        for range in ranges {
            record.add_attribute(FILTER_ATTR_SOURCE_IP, range);
        }
        record
    }

    fn transport_from(source: Option<&str>) -> FixedSourceTransport {
        FixedSourceTransport {
            source: source.map(|value| value.parse().expect("test source address")),
        }
    }

    #[test]
    fn empty_restriction_always_satisfies() {
        let record = record_with_ranges(&[]);
        assert!(satisfies_source_address(
            &record,
            &transport_from(Some("192.168.1.10:0"))
        ));
        assert!(satisfies_source_address(&record, &transport_from(None)));
    }

    #[test]
    fn unknown_source_needs_a_default_range() {
        let transport = transport_from(None);
        assert!(!satisfies_source_address(
            &record_with_ranges(&["10.0.0.0/8"]),
            &transport
        ));
        assert!(satisfies_source_address(
            &record_with_ranges(&["10.0.0.0/8", "0.0.0.0/0"]),
            &transport
        ));
    }

    #[test]
    fn known_source_matches_containing_ranges_only() {
        let transport = transport_from(Some("192.168.1.10:0"));
        assert!(satisfies_source_address(
            &record_with_ranges(&["192.168.0.0/16"]),
            &transport
        ));
        assert!(!satisfies_source_address(
            &record_with_ranges(&["10.0.0.0/8"]),
            &transport
        ));
    }

    #[test]
    fn unparseable_values_are_skipped() {
        let transport = transport_from(Some("192.168.1.10:0"));
        assert!(satisfies_source_address(
            &record_with_ranges(&["garbage", "192.168.0.0/16"]),
            &transport
        ));
        assert!(!satisfies_source_address(
            &record_with_ranges(&["garbage"]),
            &transport
        ));
    }

    // reference semantics spelled out longhand over raw v4 bit arithmetic
    fn reference_satisfies(ranges: &[(Ipv4Addr, u8)], source: Option<Ipv4Addr>) -> bool {
        if ranges.is_empty() {
            return true;
        }
        for (network, bits) in ranges {
            match source {
                None => {
                    if *bits == 0 {
                        return true;
                    }
                }
                Some(address) => {
                    let mask = if *bits == 0 {
                        0
                    } else {
                        u32::MAX << (32 - u32::from(*bits))
                    };
                    if u32::from(address) & mask == u32::from(*network) & mask {
                        return true;
                    }
                }
            }
        }
        false
    }

    #[test]
    fn agrees_with_the_reference_implementation() {
        let mut rng = rand::thread_rng();
        for _ in 0..256 {
            let ranges: Vec<(Ipv4Addr, u8)> = (0..rng.gen_range(0..4))
                .map(|_| (Ipv4Addr::from(rng.gen::<u32>()), rng.gen_range(0..=32)))
                .collect();
            let source: Option<Ipv4Addr> = if rng.gen_bool(0.2) {
                None
            } else {
                Some(Ipv4Addr::from(rng.gen::<u32>()))
            };

            let range_strings: Vec<String> = ranges
                .iter()
                .map(|(network, bits)| {
                    CidrRange::new(IpAddr::V4(*network), *bits)
                        .expect("valid bits")
                        .to_string()
                })
                .collect();
            let range_refs: Vec<&str> = range_strings.iter().map(String::as_str).collect();
            let record = record_with_ranges(&range_refs);
            let transport = FixedSourceTransport {
                source: source.map(|ip| SocketAddr::new(IpAddr::V4(ip), 0)),
            };

            // the reference works on masked networks the same way CidrRange does
            assert_eq!(
                satisfies_source_address(&record, &transport),
                reference_satisfies(&ranges, source),
            );
        }
    }
}
