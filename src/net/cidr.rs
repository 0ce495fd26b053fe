//! CIDR ranges and the ordered range-to-destination tables cluster members
//! advertise per protocol.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// A network range in CIDR notation. Containment is family-exact: a v4 range
/// never contains a v6 address and vice versa.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CidrRange {
    network: IpAddr,
    netmask_bits: u8,
}

impl CidrRange {
    pub fn new(network: IpAddr, netmask_bits: u8) -> Option<Self> {
        let max_bits = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if netmask_bits > max_bits {
            return None;
        }
        let range = Self {
            network,
            netmask_bits,
        };
        Some(Self {
            network: range.masked(network),
            netmask_bits,
        })
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn netmask_bits(&self) -> u8 {
        self.netmask_bits
    }

    /// Whether this is the catch-all range of its family.
    pub fn is_default(&self) -> bool {
        self.netmask_bits == 0
    }

    pub fn contains(&self, address: IpAddr) -> bool {
        match (self.network, address) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                self.masked(address) == self.network
            }
            _ => false,
        }
    }

    fn masked(&self, address: IpAddr) -> IpAddr {
        match address {
            IpAddr::V4(v4) => {
                let bits = u32::from(v4);
                let mask = mask_u32(self.netmask_bits);
                IpAddr::V4((bits & mask).into())
            }
            IpAddr::V6(v6) => {
                let bits = u128::from(v6);
                let mask = mask_u128(self.netmask_bits);
                IpAddr::V6((bits & mask).into())
            }
        }
    }
}

fn mask_u32(bits: u8) -> u32 {
    if bits == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(bits).min(32))
    }
}

fn mask_u128(bits: u8) -> u128 {
    if bits == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(bits).min(128))
    }
}

impl FromStr for CidrRange {
    type Err = CidrParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (address, bits) = match value.split_once('/') {
            Some((address, bits)) => (
                address,
                Some(bits.parse::<u8>().map_err(|_| CidrParseError)?),
            ),
            None => (value, None),
        };
        let network: IpAddr = address.parse().map_err(|_| CidrParseError)?;
        let bits = bits.unwrap_or(match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        });
        CidrRange::new(network, bits).ok_or(CidrParseError)
    }
}

impl fmt::Display for CidrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.netmask_bits)
    }
}

/// The input was not a valid `address/bits` CIDR expression.
pub struct CidrParseError;

impl fmt::Debug for CidrParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CidrParseError")
    }
}

impl fmt::Display for CidrParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not a valid CIDR expression")
    }
}

impl std::error::Error for CidrParseError {}

/// One range-to-destination entry of a [`CidrAddressTable`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CidrMapping {
    range: CidrRange,
    destination: SocketAddr,
}

impl CidrMapping {
    pub fn new(range: CidrRange, destination: SocketAddr) -> Self {
        Self { range, destination }
    }

    pub fn range(&self) -> &CidrRange {
        &self.range
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }
}

///
/// Ordered collection of CIDR-range-to-destination mappings, iterated from
/// most-specific to least-specific so that the netmask-0 entry acts as the
/// default fallback. For any one source address at most one non-default
/// mapping is expected to match.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CidrAddressTable {
    mappings: Vec<CidrMapping>,
}

impl CidrAddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, range: CidrRange, destination: SocketAddr) {
        let mapping = CidrMapping::new(range, destination);
        let position = self
            .mappings
            .iter()
            .position(|existing| existing.range().netmask_bits() < mapping.range().netmask_bits())
            .unwrap_or(self.mappings.len());
        self.mappings.insert(position, mapping);
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CidrMapping> {
        self.mappings.iter()
    }
}
