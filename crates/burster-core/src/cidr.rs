//! IPv4 networks and host address assignment.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{BurstError, Result};

/// An IPv4 network in CIDR notation, e.g. `172.28.0.0/20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Network {
    address: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Network {
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 32 {
            return Err(BurstError::InvalidCidr(format!("{address}/{prefix_len}")));
        }
        Ok(Self {
            address,
            prefix_len,
        })
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    fn mask_bits(&self) -> u32 {
        if self.prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix_len)
        }
    }

    pub fn netmask(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.mask_bits())
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & self.mask_bits())
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) | !self.mask_bits())
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & self.mask_bits() == u32::from(self.network())
    }

    /// Number of usable host addresses (network and broadcast excluded).
    pub fn host_count(&self) -> u64 {
        let size = 1u64 << (32 - u32::from(self.prefix_len));
        size.saturating_sub(2)
    }

    /// Usable host addresses in ascending order.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let first = u64::from(u32::from(self.network())) + 1;
        let count = self.host_count();
        (first..first + count).map(|ip| Ipv4Addr::from(ip as u32))
    }
}

impl fmt::Display for Ipv4Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Network {
    type Err = BurstError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || BurstError::InvalidCidr(s.to_string());
        let (address, prefix_len) = s.split_once('/').ok_or_else(invalid)?;
        let address = address.parse::<Ipv4Addr>().map_err(|_| invalid())?;
        let prefix_len = prefix_len.parse::<u8>().map_err(|_| invalid())?;
        Self::new(address, prefix_len).map_err(|_| invalid())
    }
}

/// Pairs each name with the host address at `offset + index` within `cidr`.
///
/// Fails with [`BurstError::InsufficientAddressSpace`] instead of producing a
/// partial assignment when the network is too small.
pub fn assign_addresses(
    names: Vec<String>,
    cidr: &str,
    offset: usize,
) -> Result<Vec<(String, Ipv4Addr)>> {
    let network: Ipv4Network = cidr.parse()?;
    let available = network.host_count();
    let needed = names.len() as u64 + offset as u64;
    if needed > available {
        return Err(BurstError::InsufficientAddressSpace {
            cidr: cidr.to_string(),
            requested: names.len(),
            offset,
            available,
        });
    }

    Ok(names
        .into_iter()
        .zip(network.hosts().skip(offset))
        .collect())
}
