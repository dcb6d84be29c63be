//! A [`ManagementApi`] backed by an XML export of a server's configuration.
//!
//! The export is read once; every call then answers from memory with the same paging,
//! status codes and buffer ownership rules a live server has. Buffers handed out are
//! tracked so callers can check that each one was freed.

use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::io::Read;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use xmltree::Element;

use crate::element::RawElement;
use crate::options::{ClassKind, DhcpClass, OptionClass, OptionData, OptionScope, OptionValue};
use crate::remote::{
    BufferHandle, EnumReply, InfoReply, ManagementApi, RemoteBuffer, ResumeHandle, Status,
};
use crate::types::{ClientInfo, ClientTypes, ElementType, IpRange, SubnetInfo, SubnetState};
use crate::xml_helpers::{attr_ci, children_ci, find_descendant_ci, get_child_ci, text};

#[derive(Debug, Clone)]
struct ExportedScope {
    info: SubnetInfo,
    delay_offer_ms: u16,
    elements: Vec<RawElement>,
    clients: Vec<ClientInfo>,
    options: Vec<(OptionClass, OptionValue)>,
}

#[derive(Debug)]
pub struct ExportServer {
    name: String,
    /// False when the export has no `<dhcp>` node; every call then reports an
    /// unregistered endpoint.
    registered: bool,
    scopes: Vec<ExportedScope>,
    classes: Vec<DhcpClass>,
    server_options: Vec<(OptionClass, OptionValue)>,
    page_size: u32,
    next_handle: AtomicU64,
    outstanding: Mutex<HashSet<u64>>,
}

impl ExportServer {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open export file: {}", path.display()))?;
        Self::parse(file).with_context(|| format!("Failed to load export: {}", path.display()))
    }

    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        let root = Element::parse(reader).context("Failed to parse export XML")?;

        let Some(dhcp) = find_descendant_ci(&root, "dhcp") else {
            log::warn!("No <dhcp> node in export; server will report as unregistered");
            return Ok(Self::empty(String::new(), false));
        };

        let mut server = Self::empty(
            attr_ci(dhcp, "server").unwrap_or("localhost").to_string(),
            true,
        );

        if let Some(classes) = get_child_ci(dhcp, "classes") {
            for class in children_ci(classes, "class") {
                server.classes.push(parse_class(class)?);
            }
        }

        if let Some(options) = get_child_ci(dhcp, "options") {
            for option in children_ci(options, "option") {
                server.server_options.push(parse_option(option)?);
            }
        }

        for scope in children_ci(dhcp, "scope") {
            let parsed = parse_scope(scope)?;
            if server
                .scopes
                .iter()
                .any(|s| s.info.address == parsed.info.address)
            {
                bail!("Duplicate scope {} in export", parsed.info.address);
            }
            server.scopes.push(parsed);
        }

        log::debug!(
            "Loaded export for server {}: {} scope(s), {} class(es)",
            server.name,
            server.scopes.len(),
            server.classes.len()
        );

        Ok(server)
    }

    fn empty(name: String, registered: bool) -> Self {
        Self {
            name,
            registered,
            scopes: Vec::new(),
            classes: Vec::new(),
            server_options: Vec::new(),
            page_size: u32::MAX,
            next_handle: AtomicU64::new(1),
            outstanding: Mutex::new(HashSet::new()),
        }
    }

    /// Cap every page at `page_size` records regardless of the caller's hint.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Server name recorded in the export.
    pub fn server_name(&self) -> &str {
        &self.name
    }

    /// Buffers handed out and not yet freed.
    pub fn outstanding_buffers(&self) -> usize {
        self.outstanding
            .lock()
            .map(|set| set.len())
            .unwrap_or_default()
    }

    fn allocate<T>(&self, records: Vec<T>) -> RemoteBuffer<T> {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut set) = self.outstanding.lock() {
            set.insert(handle);
        }
        RemoteBuffer {
            handle: BufferHandle(handle),
            records,
        }
    }

    fn page<T: Clone>(
        &self,
        items: &[T],
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<T> {
        let start = resume.as_raw() as usize;
        if start >= items.len() {
            return EnumReply::status(Status::NO_MORE_ITEMS);
        }

        let limit = self.page_size.min(preferred_max).max(1) as usize;
        let end = start.saturating_add(limit).min(items.len());
        let records = items[start..end].to_vec();
        *resume = ResumeHandle::from_raw(end as u32);

        EnumReply {
            status: if end < items.len() {
                Status::MORE_DATA
            } else {
                Status::SUCCESS
            },
            read: records.len() as u32,
            total: (items.len() - end) as u32,
            buffer: Some(self.allocate(records)),
        }
    }

    fn find_scope(&self, subnet: Ipv4Addr) -> Option<&ExportedScope> {
        self.scopes.iter().find(|s| s.info.address == subnet)
    }

    fn check_target(&self, server: &str) -> Option<Status> {
        if !self.registered {
            return Some(Status::ENDPOINT_NOT_REGISTERED);
        }
        if !server.is_empty() && !server.eq_ignore_ascii_case(&self.name) {
            log::warn!("Export is for server {}, not {}", self.name, server);
            return Some(Status::SERVER_UNAVAILABLE);
        }
        None
    }

    fn options_at(
        &self,
        scope: &OptionScope,
    ) -> std::result::Result<&[(OptionClass, OptionValue)], Status> {
        match scope {
            OptionScope::Server => Ok(self.server_options.as_slice()),
            OptionScope::Subnet(subnet) => self
                .find_scope(*subnet)
                .map(|s| s.options.as_slice())
                .ok_or(Status::SUBNET_NOT_PRESENT),
            OptionScope::Default | OptionScope::Reservation { .. } => Ok(&[][..]),
        }
    }
}

impl ManagementApi for ExportServer {
    fn enum_subnets(
        &self,
        server: &str,
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<Ipv4Addr> {
        if let Some(status) = self.check_target(server) {
            return EnumReply::status(status);
        }
        let addresses: Vec<Ipv4Addr> = self.scopes.iter().map(|s| s.info.address).collect();
        self.page(&addresses, resume, preferred_max)
    }

    fn enum_subnet_elements(
        &self,
        server: &str,
        subnet: Ipv4Addr,
        kind: ElementType,
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<RawElement> {
        if let Some(status) = self.check_target(server) {
            return EnumReply::status(status);
        }
        let Some(scope) = self.find_scope(subnet) else {
            return EnumReply::status(Status::SUBNET_NOT_PRESENT);
        };
        let elements: Vec<RawElement> = scope
            .elements
            .iter()
            .filter(|e| e.matches(kind))
            .cloned()
            .collect();
        self.page(&elements, resume, preferred_max)
    }

    fn enum_subnet_clients(
        &self,
        server: &str,
        subnet: Ipv4Addr,
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<ClientInfo> {
        if let Some(status) = self.check_target(server) {
            return EnumReply::status(status);
        }
        match self.find_scope(subnet) {
            Some(scope) => self.page(&scope.clients, resume, preferred_max),
            None => EnumReply::status(Status::SUBNET_NOT_PRESENT),
        }
    }

    fn enum_option_values(
        &self,
        server: &str,
        scope: &OptionScope,
        class: &OptionClass,
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<OptionValue> {
        if let Some(status) = self.check_target(server) {
            return EnumReply::status(status);
        }
        match self.options_at(scope) {
            Ok(options) => {
                let values: Vec<OptionValue> = options
                    .iter()
                    .filter(|(c, _)| c == class)
                    .map(|(_, v)| v.clone())
                    .collect();
                self.page(&values, resume, preferred_max)
            }
            Err(status) => EnumReply::status(status),
        }
    }

    fn enum_classes(
        &self,
        server: &str,
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<DhcpClass> {
        if let Some(status) = self.check_target(server) {
            return EnumReply::status(status);
        }
        self.page(&self.classes, resume, preferred_max)
    }

    fn get_subnet_info(&self, server: &str, subnet: Ipv4Addr) -> InfoReply<SubnetInfo> {
        if let Some(status) = self.check_target(server) {
            return InfoReply::status(status);
        }
        match self.find_scope(subnet) {
            Some(scope) => InfoReply {
                status: Status::SUCCESS,
                buffer: Some(self.allocate(vec![scope.info.clone()])),
            },
            None => InfoReply::status(Status::SUBNET_NOT_PRESENT),
        }
    }

    fn get_subnet_delay_offer(&self, server: &str, subnet: Ipv4Addr) -> (Status, u16) {
        if let Some(status) = self.check_target(server) {
            return (status, 0);
        }
        match self.find_scope(subnet) {
            Some(scope) => (Status::SUCCESS, scope.delay_offer_ms),
            None => (Status::SUBNET_NOT_PRESENT, 0),
        }
    }

    fn get_option_value(
        &self,
        server: &str,
        scope: &OptionScope,
        class: &OptionClass,
        option_id: u32,
    ) -> InfoReply<OptionValue> {
        if let Some(status) = self.check_target(server) {
            return InfoReply::status(status);
        }
        let options = match self.options_at(scope) {
            Ok(options) => options,
            Err(status) => return InfoReply::status(status),
        };
        match options
            .iter()
            .find(|(c, v)| c == class && v.option_id == option_id)
        {
            Some((_, value)) => InfoReply {
                status: Status::SUCCESS,
                buffer: Some(self.allocate(vec![value.clone()])),
            },
            None => InfoReply::status(Status::OPTION_NOT_PRESENT),
        }
    }

    fn free_buffer(&self, handle: BufferHandle) {
        let removed = self
            .outstanding
            .lock()
            .map(|mut set| set.remove(&handle.0))
            .unwrap_or(false);
        if !removed {
            log::warn!("Free of unknown or already freed buffer {}", handle.0);
        }
    }
}

fn parse_ipv4(el: &Element, attr: &str) -> Result<Ipv4Addr> {
    let raw = attr_ci(el, attr)
        .ok_or_else(|| anyhow!("<{}> is missing the '{}' attribute", el.name, attr))?;
    Ipv4Addr::from_str(raw)
        .with_context(|| format!("Invalid IPv4 address '{}' in <{}> {}", raw, el.name, attr))
}

fn parse_optional_ipv4(el: &Element, attr: &str) -> Result<Option<Ipv4Addr>> {
    match attr_ci(el, attr) {
        Some(_) => parse_ipv4(el, attr).map(Some),
        None => Ok(None),
    }
}

fn parse_number<T: FromStr>(el: &Element, attr: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    attr_ci(el, attr)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("Invalid number '{}' in <{}> {}", raw, el.name, attr))
        })
        .transpose()
}

fn parse_hardware_address(raw: &str) -> Result<Vec<u8>> {
    raw.split([':', '-'])
        .map(|octet| {
            u8::from_str_radix(octet, 16)
                .with_context(|| format!("Invalid hardware address '{}'", raw))
        })
        .collect()
}

fn parse_hex(raw: &str) -> Result<Vec<u8>> {
    let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("Odd number of hex digits in '{}'", raw);
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("Invalid hex data '{}'", raw))
        })
        .collect()
}

fn parse_client_types(el: &Element) -> Result<ClientTypes> {
    match attr_ci(el, "type").map(|t| t.to_ascii_lowercase()).as_deref() {
        None | Some("both") | Some("dhcp-bootp") => Ok(ClientTypes::Both),
        Some("dhcp") => Ok(ClientTypes::Dhcp),
        Some("bootp") => Ok(ClientTypes::Bootp),
        Some("none") => Ok(ClientTypes::None),
        Some(other) => bail!("Unknown client type '{}' in <{}>", other, el.name),
    }
}

fn parse_state(raw: Option<&str>) -> Result<SubnetState> {
    match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
        None | Some("enabled") => Ok(SubnetState::Enabled),
        Some("disabled") => Ok(SubnetState::Disabled),
        Some("enabled-switched") => Ok(SubnetState::EnabledSwitched),
        Some("disabled-switched") => Ok(SubnetState::DisabledSwitched),
        Some("invalid") => Ok(SubnetState::Invalid),
        Some(other) => bail!("Unknown scope state '{}'", other),
    }
}

fn parse_class(el: &Element) -> Result<DhcpClass> {
    let name = attr_ci(el, "name")
        .ok_or_else(|| anyhow!("<class> is missing the 'name' attribute"))?
        .to_string();
    let kind = match attr_ci(el, "type").map(|t| t.to_ascii_lowercase()).as_deref() {
        Some("vendor") => ClassKind::Vendor,
        Some("user") => ClassKind::User,
        other => bail!("Class '{}' has unknown type {:?}", name, other),
    };
    Ok(DhcpClass {
        name,
        kind,
        comment: attr_ci(el, "comment").map(str::to_string),
    })
}

fn parse_option_class(raw: Option<&str>) -> Result<OptionClass> {
    let Some(raw) = raw else {
        return Ok(OptionClass::Default);
    };
    if raw.eq_ignore_ascii_case("default") {
        return Ok(OptionClass::Default);
    }
    match raw.split_once(':') {
        Some((kind, name)) if kind.eq_ignore_ascii_case("vendor") => {
            Ok(OptionClass::Vendor(name.to_string()))
        }
        Some((kind, name)) if kind.eq_ignore_ascii_case("user") => {
            Ok(OptionClass::User(name.to_string()))
        }
        _ => bail!("Unknown option class '{}'", raw),
    }
}

fn parse_option_data(el: &Element) -> Result<OptionData> {
    let value = text(el);
    let data = match el.name.to_ascii_lowercase().as_str() {
        "byte" => OptionData::Byte(value.parse().context("Invalid byte option data")?),
        "word" => OptionData::Word(value.parse().context("Invalid word option data")?),
        "dword" => OptionData::DWord(value.parse().context("Invalid dword option data")?),
        "dworddword" => {
            OptionData::DWordDWord(value.parse().context("Invalid dword-dword option data")?)
        }
        "ip" => OptionData::IpAddress(
            Ipv4Addr::from_str(&value).context("Invalid ip option data")?,
        ),
        "string" => OptionData::String(value),
        "binary" => OptionData::Binary(parse_hex(&value)?),
        "encapsulated" => OptionData::Encapsulated(parse_hex(&value)?),
        other => bail!("Unknown option data element <{}>", other),
    };
    Ok(data)
}

fn parse_option(el: &Element) -> Result<(OptionClass, OptionValue)> {
    let option_id: u32 = parse_number(el, "id")?
        .ok_or_else(|| anyhow!("<option> is missing the 'id' attribute"))?;
    let class = parse_option_class(attr_ci(el, "class"))?;
    let data = el
        .children
        .iter()
        .filter_map(|n| n.as_element())
        .map(parse_option_data)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Invalid data for option {}", option_id))?;
    Ok((class, OptionValue::new(option_id, data)))
}

fn parse_range_kind(el: &Element) -> Result<ElementType> {
    match attr_ci(el, "type").map(|t| t.to_ascii_lowercase()).as_deref() {
        None | Some("dhcp-bootp") => Ok(ElementType::IpRangesDhcpBootp),
        Some("dhcp") => Ok(ElementType::IpRangesDhcpOnly),
        Some("bootp") => Ok(ElementType::IpRangesBootpOnly),
        Some(other) => bail!("Unknown range type '{}'", other),
    }
}

fn parse_scope(el: &Element) -> Result<ExportedScope> {
    let address = parse_ipv4(el, "address")?;
    let mask = parse_ipv4(el, "mask")?;
    let info = SubnetInfo {
        address,
        mask,
        name: attr_ci(el, "name").unwrap_or_default().to_string(),
        comment: attr_ci(el, "comment").map(str::to_string),
        primary_host: parse_optional_ipv4(el, "primary-host")?.unwrap_or(Ipv4Addr::UNSPECIFIED),
        state: parse_state(attr_ci(el, "state"))?,
    };

    let mut elements = Vec::new();
    let mut clients = Vec::new();
    let mut options = Vec::new();

    // Document order is the order the server reports elements in.
    for child in el.children.iter().filter_map(|n| n.as_element()) {
        match child.name.to_ascii_lowercase().as_str() {
            "range" => elements.push(RawElement::IpRange {
                kind: parse_range_kind(child)?,
                range: IpRange::new(parse_ipv4(child, "start")?, parse_ipv4(child, "end")?),
            }),
            "exclusion" => elements.push(RawElement::ExcludedIpRange(IpRange::new(
                parse_ipv4(child, "start")?,
                parse_ipv4(child, "end")?,
            ))),
            "reservation" => {
                let mac = attr_ci(child, "mac")
                    .ok_or_else(|| anyhow!("<reservation> is missing the 'mac' attribute"))?;
                elements.push(RawElement::reservation(
                    address,
                    parse_ipv4(child, "address")?,
                    &parse_hardware_address(mac)?,
                    parse_client_types(child)?,
                ));
            }
            "client" => {
                let expires: Option<u64> = parse_number(child, "expires")?;
                clients.push(ClientInfo {
                    address: parse_ipv4(child, "address")?,
                    mask,
                    hardware_address: attr_ci(child, "mac")
                        .map(parse_hardware_address)
                        .transpose()?
                        .unwrap_or_default(),
                    name: attr_ci(child, "name").map(str::to_string),
                    comment: attr_ci(child, "comment").map(str::to_string),
                    lease_expires: expires.map(|secs| UNIX_EPOCH + Duration::from_secs(secs)),
                    client_type: parse_client_types(child)?,
                });
            }
            "option" => options.push(parse_option(child)?),
            other => log::debug!("Ignoring <{}> in scope {}", other, address),
        }
    }

    Ok(ExportedScope {
        info,
        delay_offer_ms: parse_number(el, "delay-offer")?.unwrap_or(0),
        elements,
        clients,
        options,
    })
}

/// Seconds since the epoch, for writing `expires` attributes.
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
