//! Access gate for the administrative path.
//!
//! The allow-list is parsed once at startup and is read-only afterwards, so
//! every connection can consult it concurrently without locking.

use std::net::IpAddr;

use ipnet::IpNet;

/// Error raised while parsing an allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid allow-list entry {entry:?}")]
pub struct AccessListError {
    pub entry: String,
}

/// A single allow-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AllowEntry {
    Addr(IpAddr),
    Net(IpNet),
}

impl AllowEntry {
    fn contains(&self, addr: &IpAddr) -> bool {
        match self {
            AllowEntry::Addr(allowed) => allowed == addr,
            AllowEntry::Net(net) => net.contains(addr),
        }
    }
}

/// Allow-list based admission check for admin connections.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    entries: Vec<AllowEntry>,
}

impl AccessGate {
    /// Parse a comma-separated list of addresses and CIDR networks.
    ///
    /// Blank entries are skipped. An empty list denies every peer.
    pub fn from_comma_separated(list: &str) -> Result<Self, AccessListError> {
        let entries = list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                if let Ok(addr) = entry.parse::<IpAddr>() {
                    Ok(AllowEntry::Addr(addr.to_canonical()))
                } else if let Ok(net) = entry.parse::<IpNet>() {
                    Ok(AllowEntry::Net(net.trunc()))
                } else {
                    Err(AccessListError {
                        entry: entry.to_string(),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    /// Returns true if `addr` may reach the administrative path.
    pub fn check(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        self.entries.iter().any(|entry| entry.contains(&addr))
    }

    /// Number of parsed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is allowed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
