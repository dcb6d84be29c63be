//! Subnet element records and their projection into domain values.

use std::net::Ipv4Addr;

use crate::errors::{Result, ScopeError};
use crate::types::{ClientTypes, ElementType, IpRange, Reservation};

/// Length of the prefix (subnet address + hardware type) the server stores in front of
/// a reservation's hardware address.
const CLIENT_UID_PREFIX: usize = 5;

/// Ethernet hardware type.
const HTYPE_ETHERNET: u8 = 1;

/// A subnet element exactly as the enumeration returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawElement {
    IpRange {
        kind: ElementType,
        range: IpRange,
    },
    SecondaryHost {
        address: Ipv4Addr,
        name: String,
    },
    ReservedIp {
        address: Ipv4Addr,
        client_uid: Vec<u8>,
        allowed: ClientTypes,
    },
    ExcludedIpRange(IpRange),
    IpUsedCluster {
        start: Ipv4Addr,
        end: Ipv4Addr,
    },
}

impl RawElement {
    /// Build a reservation record the way the server stores it, with the subnet
    /// address and hardware type in front of the hardware address.
    pub fn reservation(
        subnet: Ipv4Addr,
        address: Ipv4Addr,
        hardware_address: &[u8],
        allowed: ClientTypes,
    ) -> Self {
        let mut client_uid = Vec::with_capacity(CLIENT_UID_PREFIX + hardware_address.len());
        client_uid.extend_from_slice(&subnet.octets());
        client_uid.push(HTYPE_ETHERNET);
        client_uid.extend_from_slice(hardware_address);
        RawElement::ReservedIp {
            address,
            client_uid,
            allowed,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RawElement::IpRange { kind, .. } => kind.name(),
            RawElement::SecondaryHost { .. } => ElementType::SecondaryHosts.name(),
            RawElement::ReservedIp { .. } => ElementType::ReservedIps.name(),
            RawElement::ExcludedIpRange(_) => ElementType::ExcludedIpRanges.name(),
            RawElement::IpUsedCluster { .. } => ElementType::IpUsedClusters.name(),
        }
    }

    /// Whether this record may legitimately appear in an enumeration for `selector`.
    pub fn matches(&self, selector: ElementType) -> bool {
        match self {
            RawElement::IpRange { kind, .. } => {
                selector.is_allocatable_range()
                    && (selector == ElementType::IpRanges || *kind == selector)
            }
            RawElement::SecondaryHost { .. } => selector == ElementType::SecondaryHosts,
            RawElement::ReservedIp { .. } => selector == ElementType::ReservedIps,
            RawElement::ExcludedIpRange(_) => selector == ElementType::ExcludedIpRanges,
            RawElement::IpUsedCluster { .. } => selector == ElementType::IpUsedClusters,
        }
    }
}

/// Typed value of a subnet element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeElement {
    Range(IpRange),
    Excluded(IpRange),
    Reservation(Reservation),
    SecondaryHost { address: Ipv4Addr, name: String },
    UsedCluster(IpRange),
}

impl ScopeElement {
    fn mismatch(&self, selector: ElementType) -> ScopeError {
        let found = match self {
            ScopeElement::Range(_) => ElementType::IpRanges,
            ScopeElement::Excluded(_) => ElementType::ExcludedIpRanges,
            ScopeElement::Reservation(_) => ElementType::ReservedIps,
            ScopeElement::SecondaryHost { .. } => ElementType::SecondaryHosts,
            ScopeElement::UsedCluster(_) => ElementType::IpUsedClusters,
        };
        ScopeError::MalformedRecord {
            expected: selector.name(),
            found: found.name(),
        }
    }
}

/// Project `raw` as an element of kind `selector`.
pub fn project(selector: ElementType, raw: RawElement) -> Result<ScopeElement> {
    if !raw.matches(selector) {
        return Err(ScopeError::MalformedRecord {
            expected: selector.name(),
            found: raw.kind_name(),
        });
    }

    Ok(match raw {
        RawElement::IpRange { range, .. } => ScopeElement::Range(range),
        RawElement::ExcludedIpRange(range) => ScopeElement::Excluded(range),
        RawElement::ReservedIp {
            address,
            client_uid,
            allowed,
        } => ScopeElement::Reservation(Reservation {
            address,
            hardware_address: strip_uid_prefix(client_uid),
            allowed,
        }),
        RawElement::SecondaryHost { address, name } => {
            ScopeElement::SecondaryHost { address, name }
        }
        RawElement::IpUsedCluster { start, end } => {
            ScopeElement::UsedCluster(IpRange::new(start, end))
        }
    })
}

fn strip_uid_prefix(mut client_uid: Vec<u8>) -> Vec<u8> {
    if client_uid.len() > CLIENT_UID_PREFIX {
        client_uid.drain(..CLIENT_UID_PREFIX);
    }
    client_uid
}

pub fn read_ip_range(selector: ElementType, raw: RawElement) -> Result<IpRange> {
    match project(selector, raw)? {
        ScopeElement::Range(range) => Ok(range),
        other => Err(other.mismatch(selector)),
    }
}

pub fn read_excluded_range(raw: RawElement) -> Result<IpRange> {
    match project(ElementType::ExcludedIpRanges, raw)? {
        ScopeElement::Excluded(range) => Ok(range),
        other => Err(other.mismatch(ElementType::ExcludedIpRanges)),
    }
}

pub fn read_reservation(raw: RawElement) -> Result<Reservation> {
    match project(ElementType::ReservedIps, raw)? {
        ScopeElement::Reservation(reservation) => Ok(reservation),
        other => Err(other.mismatch(ElementType::ReservedIps)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> IpRange {
        IpRange::new(Ipv4Addr::new(10, 1, 0, 10), Ipv4Addr::new(10, 1, 0, 200))
    }

    #[test]
    fn test_read_ip_range() {
        let raw = RawElement::IpRange {
            kind: ElementType::IpRangesDhcpBootp,
            range: range(),
        };
        assert_eq!(
            read_ip_range(ElementType::IpRangesDhcpBootp, raw).unwrap(),
            range()
        );
    }

    #[test]
    fn test_generic_range_selector_accepts_any_range_kind() {
        let raw = RawElement::IpRange {
            kind: ElementType::IpRangesDhcpOnly,
            range: range(),
        };
        assert!(read_ip_range(ElementType::IpRanges, raw).is_ok());
    }

    #[test]
    fn test_range_kind_mismatch_is_malformed() {
        let raw = RawElement::IpRange {
            kind: ElementType::IpRangesBootpOnly,
            range: range(),
        };
        let err = read_ip_range(ElementType::IpRangesDhcpBootp, raw).unwrap_err();
        assert_eq!(
            err,
            ScopeError::MalformedRecord {
                expected: "ip-ranges-dhcp-bootp",
                found: "ip-ranges-bootp-only",
            }
        );
    }

    #[test]
    fn test_excluded_read_as_reservation_is_malformed() {
        let err = read_reservation(RawElement::ExcludedIpRange(range())).unwrap_err();
        assert!(matches!(
            err,
            ScopeError::MalformedRecord {
                expected: "reserved-ips",
                found: "excluded-ip-ranges"
            }
        ));
    }

    #[test]
    fn test_reservation_strips_uid_prefix() {
        let mac = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
        let raw = RawElement::reservation(
            Ipv4Addr::new(10, 1, 0, 0),
            Ipv4Addr::new(10, 1, 0, 50),
            &mac,
            ClientTypes::Dhcp,
        );

        let reservation = read_reservation(raw).unwrap();
        assert_eq!(reservation.address, Ipv4Addr::new(10, 1, 0, 50));
        assert_eq!(reservation.hardware_address, mac.to_vec());
        assert_eq!(reservation.allowed, ClientTypes::Dhcp);
    }

    #[test]
    fn test_short_uid_is_kept_as_is() {
        let raw = RawElement::ReservedIp {
            address: Ipv4Addr::new(10, 1, 0, 51),
            client_uid: vec![0xaa, 0xbb],
            allowed: ClientTypes::Both,
        };
        assert_eq!(
            read_reservation(raw).unwrap().hardware_address,
            vec![0xaa, 0xbb]
        );
    }
}
