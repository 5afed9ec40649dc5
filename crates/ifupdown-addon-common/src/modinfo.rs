//! Declarative attribute schema of an addon.
//!
//! Each addon publishes the attributes it understands together with their
//! valid values. The schema is what the configuration loader validates
//! against before an addon ever sees an interface.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::AddonError;
use crate::iface::InterfaceConfig;

/// Maximum interface name length (IFNAMSIZ - 1).
pub const IFNAMSIZ_MAX: usize = 15;

/// Placeholder valid values understood by [`ModInfo::validate`].
pub mod validvals {
    pub const IPV4: &str = "<ipv4>";
    pub const IPV6: &str = "<ipv6>";
    pub const NUMBER: &str = "<number>";
    pub const INTERFACE: &str = "<interface>";
}

/// Schema entry for one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrInfo {
    pub name: &'static str,
    pub help: &'static str,
    /// Literal values, or placeholders from [`validvals`].
    pub validvals: &'static [&'static str],
    pub required: bool,
    pub example: &'static [&'static str],
}

/// Schema of one addon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModInfo {
    /// Module help text.
    pub help: &'static str,
    /// Attributes in declaration order.
    pub attrs: &'static [AttrInfo],
}

impl ModInfo {
    /// Attribute names in declaration order.
    pub fn attr_names(&self) -> Vec<&'static str> {
        self.attrs.iter().map(|a| a.name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&AttrInfo> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// Checks required attributes and every present value of `iface`.
    ///
    /// Returns all violations found. Attributes outside the schema are
    /// ignored; they belong to other addons.
    pub fn validate(&self, iface: &InterfaceConfig) -> Vec<AddonError> {
        let mut errors = Vec::new();

        for info in self.attrs {
            match iface.get_attr_value_first(info.name) {
                None if info.required => errors.push(AddonError::invalid_config(
                    &iface.name,
                    info.name,
                    "missing required attribute",
                )),
                None => {}
                Some(value) => {
                    if !info.accepts(value) {
                        errors.push(AddonError::invalid_config(
                            &iface.name,
                            info.name,
                            format!(
                                "invalid value '{}' (valid: {})",
                                value,
                                info.validvals.join(", ")
                            ),
                        ));
                    }
                }
            }
        }

        errors
    }
}

impl AttrInfo {
    /// True if `value` satisfies any entry of `validvals`.
    pub fn accepts(&self, value: &str) -> bool {
        if self.validvals.is_empty() {
            return true;
        }
        self.validvals.iter().any(|valid| match *valid {
            validvals::IPV4 => value.parse::<Ipv4Addr>().is_ok(),
            validvals::IPV6 => value.parse::<Ipv6Addr>().is_ok(),
            validvals::NUMBER => value.parse::<u32>().is_ok(),
            validvals::INTERFACE => is_valid_ifname(value),
            literal => literal == value,
        })
    }
}

/// Kernel interface name rules: 1..=15 bytes, no '/', no whitespace.
pub fn is_valid_ifname(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= IFNAMSIZ_MAX
        && name != "."
        && name != ".."
        && !name.chars().any(|c| c == '/' || c == ':' || c.is_whitespace())
}
