use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::enumerate::{take_single, Paged, DISCOVERY_END, ELEMENT_END};
use crate::errors::{Result, ScopeError};
use crate::options::{DhcpClass, OptionClass, OptionScope, OptionValue};
use crate::remote::{ManagementApi, Status};
use crate::scope::Scope;
use crate::types::ClientOptions;

/// A DHCP server reached through its management API.
///
/// Scopes borrow the server they were discovered on, so the server must outlive them.
pub struct DhcpServer {
    name: String,
    api: Arc<dyn ManagementApi>,
    options: ClientOptions,
}

impl DhcpServer {
    pub fn new(name: impl Into<String>, api: Arc<dyn ManagementApi>) -> Self {
        Self::with_options(name, api, ClientOptions::default())
    }

    pub fn with_options(
        name: impl Into<String>,
        api: Arc<dyn ManagementApi>,
        options: ClientOptions,
    ) -> Self {
        Self {
            name: name.into(),
            api,
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api(&self) -> &dyn ManagementApi {
        self.api.as_ref()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Every scope configured on the server, fetched page by page as the iterator
    /// advances. An unreachable endpoint yields no scopes.
    pub fn scopes(&self) -> impl Iterator<Item = Result<Scope<'_>>> + '_ {
        let api = self.api();
        let name = self.name.as_str();
        let preferred_max = self.options.preferred_max;

        Paged::new(api, "DhcpEnumSubnets", DISCOVERY_END, move |resume| {
            api.enum_subnets(name, resume, preferred_max)
        })
        .map(move |address| address.map(|address| Scope::new(self, address)))
    }

    /// Look up one scope by address, failing with `NotFound` if the server does not
    /// have it. The subnet info fetched to check existence is kept on the scope.
    pub fn scope(&self, address: Ipv4Addr) -> Result<Scope<'_>> {
        let reply = self.api.get_subnet_info(&self.name, address);
        match take_single(
            self.api(),
            "DhcpGetSubnetInfo",
            &[Status::SUBNET_NOT_PRESENT],
            reply,
        )? {
            Some(info) => Ok(Scope::with_info(self, info)),
            None => Err(ScopeError::NotFound(format!("scope {}", address))),
        }
    }

    /// Vendor and user classes defined on the server.
    pub fn classes(&self) -> impl Iterator<Item = Result<DhcpClass>> + '_ {
        let api = self.api();
        let name = self.name.as_str();
        let preferred_max = self.options.preferred_max;

        Paged::new(api, "DhcpEnumClasses", ELEMENT_END, move |resume| {
            api.enum_classes(name, resume, preferred_max)
        })
    }

    /// A single option value, or `None` when it is not set at that level.
    pub fn option_value(
        &self,
        scope: &OptionScope,
        class: &OptionClass,
        option_id: u32,
    ) -> Result<Option<OptionValue>> {
        let reply = self
            .api
            .get_option_value(&self.name, scope, class, option_id);
        take_single(
            self.api(),
            "DhcpGetOptionValue",
            &[Status::OPTION_NOT_PRESENT],
            reply,
        )
    }

    /// Option values set at one level. Re-queried on every call.
    pub fn option_values(
        &self,
        scope: OptionScope,
        class: OptionClass,
    ) -> impl Iterator<Item = Result<OptionValue>> + '_ {
        let api = self.api();
        let name = self.name.as_str();
        let preferred_max = self.options.preferred_max;

        Paged::new(api, "DhcpEnumOptionValues", ELEMENT_END, move |resume| {
            api.enum_option_values(name, &scope, &class, resume, preferred_max)
        })
    }
}

impl std::fmt::Debug for DhcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhcpServer")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
