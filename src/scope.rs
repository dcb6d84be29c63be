use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use ipnet::Ipv4Net;

use crate::deferred::Deferred;
use crate::dns::{self, DnsSettings};
use crate::element::{read_excluded_range, read_ip_range, read_reservation, RawElement};
use crate::enumerate::{take_single, Paged, ELEMENT_END};
use crate::errors::{Result, ScopeError};
use crate::options::{self, id, ClassedOptionValue, OptionClass, OptionScope, OptionValue};
use crate::server::DhcpServer;
use crate::types::{ClientInfo, ElementType, IpRange, Reservation, SubnetInfo, SubnetState};

/// Selector used to find a scope's allocatable range.
const ALLOCATABLE_RANGES: ElementType = ElementType::IpRangesDhcpBootp;

/// One subnet configured on a DHCP server.
///
/// Subnet info, delay offer, range, exclusions and DNS settings are fetched on first
/// access and kept for the life of the value. Clients, reservations and option values
/// are fetched again on every call.
pub struct Scope<'s> {
    server: &'s DhcpServer,
    address: Ipv4Addr,
    info: Deferred<SubnetInfo>,
    delay_offer: Deferred<Duration>,
    ip_range: Deferred<IpRange>,
    excluded: Deferred<Vec<IpRange>>,
    dns: Deferred<DnsSettings>,
}

impl<'s> Scope<'s> {
    pub(crate) fn new(server: &'s DhcpServer, address: Ipv4Addr) -> Self {
        Self {
            server,
            address,
            info: Deferred::new(),
            delay_offer: Deferred::new(),
            ip_range: Deferred::new(),
            excluded: Deferred::new(),
            dns: Deferred::new(),
        }
    }

    pub(crate) fn with_info(server: &'s DhcpServer, info: SubnetInfo) -> Self {
        let address = info.address;
        Self {
            info: Deferred::resolved(info),
            ..Self::new(server, address)
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn server(&self) -> &'s DhcpServer {
        self.server
    }

    pub fn info(&self) -> Result<&SubnetInfo> {
        self.info.get_or_try_load(|| {
            log::trace!("Loading subnet info for {}", self.address);
            let server = self.server;
            let reply = server.api().get_subnet_info(server.name(), self.address);
            take_single(server.api(), "DhcpGetSubnetInfo", &[], reply)?.ok_or_else(|| {
                ScopeError::NotFound(format!("subnet info for scope {}", self.address))
            })
        })
    }

    pub fn mask(&self) -> Result<Ipv4Addr> {
        Ok(self.info()?.mask)
    }

    pub fn name(&self) -> Result<&str> {
        Ok(&self.info()?.name)
    }

    pub fn comment(&self) -> Result<Option<&str>> {
        Ok(self.info()?.comment.as_deref())
    }

    pub fn primary_host(&self) -> Result<Ipv4Addr> {
        Ok(self.info()?.primary_host)
    }

    pub fn state(&self) -> Result<SubnetState> {
        Ok(self.info()?.state)
    }

    /// The scope as a network prefix, built from its address and mask.
    pub fn network(&self) -> Result<Ipv4Net> {
        let mask = self.mask()?;
        let prefix = ipnet::ipv4_mask_to_prefix(mask).map_err(|_| ScopeError::MalformedRecord {
            expected: "contiguous subnet mask",
            found: "non-contiguous subnet mask",
        })?;
        Ipv4Net::new(self.address, prefix).map_err(|_| ScopeError::MalformedRecord {
            expected: "prefix length",
            found: "out of range prefix length",
        })
    }

    pub fn time_delay_offer(&self) -> Result<Duration> {
        self.delay_offer
            .get_or_try_load(|| {
                log::trace!("Loading delay offer for {}", self.address);
                let server = self.server;
                let (status, millis) = server
                    .api()
                    .get_subnet_delay_offer(server.name(), self.address);
                if !status.is_success() {
                    return Err(ScopeError::remote("DhcpGetSubnetDelayOffer", status));
                }
                Ok(Duration::from_millis(u64::from(millis)))
            })
            .copied()
    }

    /// The first DHCP/BOOTP allocatable range.
    pub fn ip_range(&self) -> Result<IpRange> {
        self.ip_range
            .get_or_try_load(|| {
                log::trace!("Loading allocatable range for {}", self.address);
                match self.elements(ALLOCATABLE_RANGES).next() {
                    Some(raw) => read_ip_range(ALLOCATABLE_RANGES, raw?),
                    None => Err(ScopeError::NotFound(format!(
                        "allocatable IP range for scope {}",
                        self.address
                    ))),
                }
            })
            .copied()
    }

    /// Excluded ranges in the order the server lists them.
    pub fn excluded_ip_ranges(&self) -> Result<&[IpRange]> {
        self.excluded
            .get_or_try_load(|| {
                log::trace!("Loading excluded ranges for {}", self.address);
                self.elements(ElementType::ExcludedIpRanges)
                    .map(|raw| raw.and_then(read_excluded_range))
                    .collect::<Result<Vec<_>>>()
            })
            .map(Vec::as_slice)
    }

    /// Lease duration from the scope's default address-lease-time option, zero when
    /// the option is not set.
    pub fn lease_duration(&self) -> Result<Duration> {
        let value = self.default_option_value(id::LEASE_TIME)?;
        options::lease_duration(value.as_ref())
    }

    pub fn dns_settings(&self) -> Result<&DnsSettings> {
        self.dns.get_or_try_load(|| dns::scope_dns_settings(self))
    }

    /// Raw subnet elements of one kind. Re-queried on every call.
    pub fn elements(&self, kind: ElementType) -> impl Iterator<Item = Result<RawElement>> + 's {
        let server = self.server;
        let address = self.address;
        let preferred_max = server.options().preferred_max;
        Paged::new(
            server.api(),
            "DhcpEnumSubnetElements",
            ELEMENT_END,
            move |resume| {
                server
                    .api()
                    .enum_subnet_elements(server.name(), address, kind, resume, preferred_max)
            },
        )
    }

    pub fn reservations(&self) -> impl Iterator<Item = Result<Reservation>> + 's {
        self.elements(ElementType::ReservedIps)
            .map(|raw| raw.and_then(read_reservation))
    }

    pub fn clients(&self) -> impl Iterator<Item = Result<ClientInfo>> + 's {
        let server = self.server;
        let address = self.address;
        let preferred_max = server.options().preferred_max;
        Paged::new(
            server.api(),
            "DhcpEnumSubnetClients",
            ELEMENT_END,
            move |resume| {
                server
                    .api()
                    .enum_subnet_clients(server.name(), address, resume, preferred_max)
            },
        )
    }

    /// The value of `option_id` at `class` on this scope, `None` when not set.
    pub fn option_value(&self, class: &OptionClass, option_id: u32) -> Result<Option<OptionValue>> {
        self.server
            .option_value(&OptionScope::Subnet(self.address), class, option_id)
    }

    pub fn default_option_value(&self, option_id: u32) -> Result<Option<OptionValue>> {
        self.option_value(&OptionClass::Default, option_id)
    }

    /// Option values set on this scope for the default class.
    pub fn option_values(&self) -> impl Iterator<Item = Result<OptionValue>> + 's {
        self.server
            .option_values(OptionScope::Subnet(self.address), OptionClass::Default)
    }

    /// Option values set on this scope for the default class, then for every vendor
    /// and user class defined on the server.
    pub fn all_option_values(&self) -> impl Iterator<Item = Result<ClassedOptionValue>> + 's {
        let server = self.server;
        let address = self.address;

        let defaults = self.option_values().map(|value| {
            value.map(|value| ClassedOptionValue {
                class: OptionClass::Default,
                value,
            })
        });

        let per_class = server.classes().flat_map(
            move |class| -> Box<dyn Iterator<Item = Result<ClassedOptionValue>> + 's> {
                match class {
                    Ok(class) => {
                        let class = class.option_class();
                        let tag = class.clone();
                        Box::new(
                            server
                                .option_values(OptionScope::Subnet(address), class)
                                .map(move |value| {
                                    value.map(|value| ClassedOptionValue {
                                        class: tag.clone(),
                                        value,
                                    })
                                }),
                        )
                    }
                    Err(e) => Box::new(std::iter::once(Err(e))),
                }
            },
        );

        defaults.chain(per_class)
    }
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.network(), self.name()) {
            (Ok(net), Ok(name)) => write!(f, "[{}] {}", net, name),
            _ => write!(f, "[{}]", self.address),
        }
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("server", &self.server.name())
            .field("address", &self.address)
            .field("info", &self.info.get())
            .finish_non_exhaustive()
    }
}
