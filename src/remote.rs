//! Contract with the DHCP server's management service.
//!
//! Every call that returns records hands back a [`RemoteBuffer`] owned by the remote
//! side. Whoever receives one must give its [`BufferHandle`] back through
//! [`ManagementApi::free_buffer`] exactly once; [`crate::enumerate::PageGuard`] does
//! that for the core.

use std::fmt;
use std::net::Ipv4Addr;

use crate::element::RawElement;
use crate::options::{DhcpClass, OptionClass, OptionScope, OptionValue};
use crate::types::{ClientInfo, ElementType, SubnetInfo};

/// Native status code returned by every management call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u32);

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const MORE_DATA: Status = Status(234);
    pub const NO_MORE_ITEMS: Status = Status(259);
    pub const SERVER_UNAVAILABLE: Status = Status(1722);
    pub const ENDPOINT_NOT_REGISTERED: Status = Status(1753);
    pub const SUBNET_NOT_PRESENT: Status = Status(20005);
    pub const OPTION_NOT_PRESENT: Status = Status(20010);

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            Status::SUCCESS => Some("SUCCESS"),
            Status::MORE_DATA => Some("MORE_DATA"),
            Status::NO_MORE_ITEMS => Some("NO_MORE_ITEMS"),
            Status::SERVER_UNAVAILABLE => Some("SERVER_UNAVAILABLE"),
            Status::ENDPOINT_NOT_REGISTERED => Some("ENDPOINT_NOT_REGISTERED"),
            Status::SUBNET_NOT_PRESENT => Some("SUBNET_NOT_PRESENT"),
            Status::OPTION_NOT_PRESENT => Some("OPTION_NOT_PRESENT"),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Status::SUCCESS
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Opaque enumeration cursor. Only the server interprets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResumeHandle(u32);

impl ResumeHandle {
    pub const START: ResumeHandle = ResumeHandle(0);

    pub fn from_raw(raw: u32) -> Self {
        ResumeHandle(raw)
    }

    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

/// Identifies a buffer allocated by the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// A page of records living in a remote-owned allocation.
#[derive(Debug)]
pub struct RemoteBuffer<T> {
    pub handle: BufferHandle,
    pub records: Vec<T>,
}

/// Reply to an `enum_*` call.
#[derive(Debug)]
pub struct EnumReply<T> {
    pub status: Status,
    pub buffer: Option<RemoteBuffer<T>>,
    /// Records actually returned in `buffer`.
    pub read: u32,
    /// Server's estimate of records still to come.
    pub total: u32,
}

impl<T> EnumReply<T> {
    /// A reply carrying only a status and no buffer.
    pub fn status(status: Status) -> Self {
        Self {
            status,
            buffer: None,
            read: 0,
            total: 0,
        }
    }
}

/// Reply to a single-record `get_*` call.
#[derive(Debug)]
pub struct InfoReply<T> {
    pub status: Status,
    pub buffer: Option<RemoteBuffer<T>>,
}

impl<T> InfoReply<T> {
    pub fn status(status: Status) -> Self {
        Self {
            status,
            buffer: None,
        }
    }
}

/// Blocking management calls against one DHCP server.
///
/// `server` is the server identity every call is addressed to. Implementations must
/// advance `resume` on every enumeration call that returns records.
pub trait ManagementApi: Send + Sync {
    fn enum_subnets(
        &self,
        server: &str,
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<Ipv4Addr>;

    fn enum_subnet_elements(
        &self,
        server: &str,
        subnet: Ipv4Addr,
        kind: ElementType,
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<RawElement>;

    fn enum_subnet_clients(
        &self,
        server: &str,
        subnet: Ipv4Addr,
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<ClientInfo>;

    fn enum_option_values(
        &self,
        server: &str,
        scope: &OptionScope,
        class: &OptionClass,
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<OptionValue>;

    fn enum_classes(
        &self,
        server: &str,
        resume: &mut ResumeHandle,
        preferred_max: u32,
    ) -> EnumReply<DhcpClass>;

    fn get_subnet_info(&self, server: &str, subnet: Ipv4Addr) -> InfoReply<SubnetInfo>;

    /// Delay before offering an address, in milliseconds.
    fn get_subnet_delay_offer(&self, server: &str, subnet: Ipv4Addr) -> (Status, u16);

    fn get_option_value(
        &self,
        server: &str,
        scope: &OptionScope,
        class: &OptionClass,
        option_id: u32,
    ) -> InfoReply<OptionValue>;

    fn free_buffer(&self, handle: BufferHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(Status::NO_MORE_ITEMS.to_string(), "NO_MORE_ITEMS (259)");
        assert_eq!(Status(5).to_string(), "5");
    }

    #[test]
    fn test_resume_handle_starts_at_zero() {
        assert_eq!(ResumeHandle::START.as_raw(), 0);
        assert_eq!(ResumeHandle::default(), ResumeHandle::START);
    }
}
