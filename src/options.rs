use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::errors::{Result, ScopeError};

/// Well-known option identifiers.
pub mod id {
    pub const SUBNET_MASK: u32 = 1;
    pub const ROUTER: u32 = 3;
    pub const DNS_SERVERS: u32 = 6;
    pub const DOMAIN_NAME: u32 = 15;
    pub const LEASE_TIME: u32 = 51;
    pub const DYNAMIC_DNS: u32 = 81;
}

/// Where an option value is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionScope {
    /// Option definitions' built-in defaults.
    Default,
    Server,
    Subnet(Ipv4Addr),
    Reservation { subnet: Ipv4Addr, address: Ipv4Addr },
}

/// Precedence level an option value is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum OptionClass {
    #[default]
    Default,
    Vendor(String),
    User(String),
}

impl fmt::Display for OptionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionClass::Default => write!(f, "default"),
            OptionClass::Vendor(name) => write!(f, "vendor:{}", name),
            OptionClass::User(name) => write!(f, "user:{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Vendor,
    User,
}

/// A vendor or user class defined on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpClass {
    pub name: String,
    pub kind: ClassKind,
    pub comment: Option<String>,
}

impl DhcpClass {
    pub fn option_class(&self) -> OptionClass {
        match self.kind {
            ClassKind::Vendor => OptionClass::Vendor(self.name.clone()),
            ClassKind::User => OptionClass::User(self.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionData {
    Byte(u8),
    Word(u16),
    DWord(u32),
    DWordDWord(u64),
    IpAddress(Ipv4Addr),
    String(String),
    Binary(Vec<u8>),
    Encapsulated(Vec<u8>),
}

impl OptionData {
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionData::Byte(_) => "byte",
            OptionData::Word(_) => "word",
            OptionData::DWord(_) => "dword",
            OptionData::DWordDWord(_) => "dword-dword",
            OptionData::IpAddress(_) => "ip-address",
            OptionData::String(_) => "string",
            OptionData::Binary(_) => "binary",
            OptionData::Encapsulated(_) => "encapsulated",
        }
    }
}

impl fmt::Display for OptionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionData::Byte(v) => write!(f, "{}", v),
            OptionData::Word(v) => write!(f, "{}", v),
            OptionData::DWord(v) => write!(f, "{}", v),
            OptionData::DWordDWord(v) => write!(f, "{}", v),
            OptionData::IpAddress(ip) => write!(f, "{}", ip),
            OptionData::String(s) => write!(f, "{}", s),
            OptionData::Binary(bytes) | OptionData::Encapsulated(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionValue {
    pub option_id: u32,
    pub data: Vec<OptionData>,
}

impl OptionValue {
    pub fn new(option_id: u32, data: Vec<OptionData>) -> Self {
        Self { option_id, data }
    }

    /// The first element as a 32-bit word.
    pub fn dword(&self) -> Result<u32> {
        match self.data.first() {
            Some(OptionData::DWord(v)) => Ok(*v),
            Some(other) => Err(ScopeError::MalformedRecord {
                expected: "dword",
                found: other.type_name(),
            }),
            None => Err(ScopeError::MalformedRecord {
                expected: "dword",
                found: "empty option",
            }),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.data.iter().map(|d| d.to_string()).collect();
        write!(f, "{}: {}", self.option_id, values.join(", "))
    }
}

/// An option value together with the class it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassedOptionValue {
    pub class: OptionClass,
    pub value: OptionValue,
}

/// Lease duration carried by an address-lease-time option; zero when the option is not
/// set.
pub fn lease_duration(value: Option<&OptionValue>) -> Result<Duration> {
    match value {
        None => Ok(Duration::ZERO),
        Some(value) => Ok(Duration::from_secs(u64::from(value.dword()?))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_duration_absent_is_zero() {
        assert_eq!(lease_duration(None).unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_lease_duration_one_day() {
        let value = OptionValue::new(id::LEASE_TIME, vec![OptionData::DWord(86400)]);
        assert_eq!(
            lease_duration(Some(&value)).unwrap(),
            Duration::from_secs(24 * 60 * 60)
        );
    }

    #[test]
    fn test_lease_duration_infinite() {
        let value = OptionValue::new(id::LEASE_TIME, vec![OptionData::DWord(u32::MAX)]);
        assert_eq!(
            lease_duration(Some(&value)).unwrap(),
            Duration::from_secs(u32::MAX as u64)
        );
    }

    #[test]
    fn test_lease_duration_wrong_type() {
        let value = OptionValue::new(
            id::LEASE_TIME,
            vec![OptionData::String("1d".to_string())],
        );
        let err = lease_duration(Some(&value)).unwrap_err();
        assert_eq!(
            err,
            ScopeError::MalformedRecord {
                expected: "dword",
                found: "string"
            }
        );
    }

    #[test]
    fn test_option_value_display() {
        let value = OptionValue::new(
            id::DNS_SERVERS,
            vec![
                OptionData::IpAddress(Ipv4Addr::new(10, 0, 0, 53)),
                OptionData::IpAddress(Ipv4Addr::new(10, 0, 1, 53)),
            ],
        );
        assert_eq!(value.to_string(), "6: 10.0.0.53, 10.0.1.53");
    }

    #[test]
    fn test_class_display() {
        assert_eq!(OptionClass::Default.to_string(), "default");
        assert_eq!(
            OptionClass::Vendor("MSFT 5.0".to_string()).to_string(),
            "vendor:MSFT 5.0"
        );
    }
}
