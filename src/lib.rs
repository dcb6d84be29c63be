pub mod cli;
pub mod deferred;
pub mod dns;
pub mod element;
pub mod enumerate;
mod errors;
pub mod export;
pub mod logging;
pub mod options;
pub mod remote;
mod scope;
mod server;
mod types;
mod xml_helpers;

pub use deferred::Deferred;
pub use dns::DnsSettings;
pub use element::{RawElement, ScopeElement};
pub use errors::{Result, ScopeError};
pub use export::ExportServer;
pub use options::{ClassedOptionValue, DhcpClass, OptionClass, OptionData, OptionScope, OptionValue};
pub use remote::{ManagementApi, Status};
pub use scope::Scope;
pub use server::DhcpServer;
pub use types::{
    format_hardware_address, ClientInfo, ClientOptions, ClientTypes, ElementType, IpRange,
    Reservation, SubnetInfo, SubnetState,
};
