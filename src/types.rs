use std::fmt;
use std::net::Ipv4Addr;
use std::time::SystemTime;

/// Inclusive address range. Whether it is allocatable or excluded depends on where it
/// is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpRange {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

impl IpRange {
    pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let addr = u32::from(ip);
        addr >= u32::from(self.start) && addr <= u32::from(self.end)
    }

    /// Number of addresses covered, zero for an inverted range.
    pub fn len(&self) -> u64 {
        let start = u64::from(u32::from(self.start));
        let end = u64::from(u32::from(self.end));
        if end < start {
            0
        } else {
            end - start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubnetState {
    #[default]
    Enabled,
    Disabled,
    EnabledSwitched,
    DisabledSwitched,
    Invalid,
}

impl SubnetState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, SubnetState::Enabled | SubnetState::EnabledSwitched)
    }
}

impl fmt::Display for SubnetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetState::Enabled => write!(f, "enabled"),
            SubnetState::Disabled => write!(f, "disabled"),
            SubnetState::EnabledSwitched => write!(f, "enabled (switched)"),
            SubnetState::DisabledSwitched => write!(f, "disabled (switched)"),
            SubnetState::Invalid => write!(f, "invalid"),
        }
    }
}

/// The single "subnet info" record; every field is loaded by one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetInfo {
    pub address: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub name: String,
    pub comment: Option<String>,
    pub primary_host: Ipv4Addr,
    pub state: SubnetState,
}

/// Selector passed to the element enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    IpRanges,
    SecondaryHosts,
    ReservedIps,
    ExcludedIpRanges,
    IpUsedClusters,
    IpRangesDhcpOnly,
    IpRangesDhcpBootp,
    IpRangesBootpOnly,
}

impl ElementType {
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::IpRanges => "ip-ranges",
            ElementType::SecondaryHosts => "secondary-hosts",
            ElementType::ReservedIps => "reserved-ips",
            ElementType::ExcludedIpRanges => "excluded-ip-ranges",
            ElementType::IpUsedClusters => "ip-used-clusters",
            ElementType::IpRangesDhcpOnly => "ip-ranges-dhcp-only",
            ElementType::IpRangesDhcpBootp => "ip-ranges-dhcp-bootp",
            ElementType::IpRangesBootpOnly => "ip-ranges-bootp-only",
        }
    }

    pub fn is_allocatable_range(&self) -> bool {
        matches!(
            self,
            ElementType::IpRanges
                | ElementType::IpRangesDhcpOnly
                | ElementType::IpRangesDhcpBootp
                | ElementType::IpRangesBootpOnly
        )
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientTypes {
    Dhcp,
    Bootp,
    #[default]
    Both,
    None,
}

impl fmt::Display for ClientTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientTypes::Dhcp => write!(f, "DHCP"),
            ClientTypes::Bootp => write!(f, "BOOTP"),
            ClientTypes::Both => write!(f, "DHCP/BOOTP"),
            ClientTypes::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub address: Ipv4Addr,
    pub hardware_address: Vec<u8>,
    pub allowed: ClientTypes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub address: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub hardware_address: Vec<u8>,
    pub name: Option<String>,
    pub comment: Option<String>,
    /// `None` for leases that never expire (reservations, BOOTP).
    pub lease_expires: Option<SystemTime>,
    pub client_type: ClientTypes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Page-size hint sent with every enumeration call.
    pub preferred_max: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            preferred_max: u32::MAX,
        }
    }
}

/// Format a hardware address as colon separated lowercase hex.
pub fn format_hardware_address(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
