//! Dynamic DNS update settings, carried in option 81.

use std::fmt;

use crate::errors::Result;
use crate::options::{id, OptionClass, OptionScope, OptionValue};
use crate::scope::Scope;

const FLAG_ENABLED: u32 = 0x01;
const FLAG_UPDATE_DOWNLEVEL: u32 = 0x02;
const FLAG_CLEANUP_EXPIRED: u32 = 0x04;
const FLAG_UPDATE_BOTH_ALWAYS: u32 = 0x10;
const FLAG_UPDATE_DHCID: u32 = 0x20;
const FLAG_DISABLE_PTR_UPDATE: u32 = 0x40;

/// Flags a server applies when neither the scope nor the server sets option 81.
pub const SERVER_DEFAULT_FLAGS: u32 = FLAG_ENABLED | FLAG_CLEANUP_EXPIRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsSettings {
    pub dynamic_updates_enabled: bool,
    pub update_downlevel_clients: bool,
    pub cleanup_expired_records: bool,
    pub always_update_both_records: bool,
    pub update_dhcid: bool,
    pub disable_ptr_updates: bool,
}

impl DnsSettings {
    pub fn from_flags(flags: u32) -> Self {
        Self {
            dynamic_updates_enabled: flags & FLAG_ENABLED != 0,
            update_downlevel_clients: flags & FLAG_UPDATE_DOWNLEVEL != 0,
            cleanup_expired_records: flags & FLAG_CLEANUP_EXPIRED != 0,
            always_update_both_records: flags & FLAG_UPDATE_BOTH_ALWAYS != 0,
            update_dhcid: flags & FLAG_UPDATE_DHCID != 0,
            disable_ptr_updates: flags & FLAG_DISABLE_PTR_UPDATE != 0,
        }
    }

    pub fn from_option(value: &OptionValue) -> Result<Self> {
        Ok(Self::from_flags(value.dword()?))
    }

    pub fn flags(&self) -> u32 {
        let mut flags = 0;
        for (set, bit) in [
            (self.dynamic_updates_enabled, FLAG_ENABLED),
            (self.update_downlevel_clients, FLAG_UPDATE_DOWNLEVEL),
            (self.cleanup_expired_records, FLAG_CLEANUP_EXPIRED),
            (self.always_update_both_records, FLAG_UPDATE_BOTH_ALWAYS),
            (self.update_dhcid, FLAG_UPDATE_DHCID),
            (self.disable_ptr_updates, FLAG_DISABLE_PTR_UPDATE),
        ] {
            if set {
                flags |= bit;
            }
        }
        flags
    }
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self::from_flags(SERVER_DEFAULT_FLAGS)
    }
}

impl fmt::Display for DnsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.dynamic_updates_enabled {
            return write!(f, "dynamic updates disabled");
        }
        write!(
            f,
            "dynamic updates {}",
            if self.always_update_both_records {
                "always"
            } else {
                "on request"
            }
        )?;
        if self.update_downlevel_clients {
            write!(f, ", downlevel clients")?;
        }
        if self.cleanup_expired_records {
            write!(f, ", cleanup on expiry")?;
        }
        if self.disable_ptr_updates {
            write!(f, ", no PTR updates")?;
        }
        if self.update_dhcid {
            write!(f, ", DHCID")?;
        }
        Ok(())
    }
}

/// Resolve a scope's DNS settings: scope level first, then server level, then the
/// server's built-in default.
pub fn scope_dns_settings(scope: &Scope<'_>) -> Result<DnsSettings> {
    if let Some(value) = scope.default_option_value(id::DYNAMIC_DNS)? {
        return DnsSettings::from_option(&value);
    }

    let server = scope.server();
    if let Some(value) =
        server.option_value(&OptionScope::Server, &OptionClass::Default, id::DYNAMIC_DNS)?
    {
        log::debug!(
            "Scope {} inherits DNS settings from server {}",
            scope.address(),
            server.name()
        );
        return DnsSettings::from_option(&value);
    }

    Ok(DnsSettings::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags() {
        let settings = DnsSettings::default();
        assert!(settings.dynamic_updates_enabled);
        assert!(settings.cleanup_expired_records);
        assert!(!settings.update_downlevel_clients);
        assert!(!settings.disable_ptr_updates);
    }

    #[test]
    fn test_flags_survive_decode() {
        for flags in [0x00, 0x01, 0x13, 0x37, 0x77] {
            assert_eq!(DnsSettings::from_flags(flags).flags(), flags);
        }
    }

    #[test]
    fn test_unknown_bits_are_ignored() {
        assert_eq!(DnsSettings::from_flags(0x81).flags(), 0x01);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DnsSettings::from_flags(0).to_string(),
            "dynamic updates disabled"
        );
        assert_eq!(
            DnsSettings::from_flags(0x05).to_string(),
            "dynamic updates on request, cleanup on expiry"
        );
    }
}
