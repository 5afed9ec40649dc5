//! Tunnel type definitions

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ifupdown_addon_common::{AddonError, AddonResult, InterfaceConfig};

use crate::attrs::{ATTR_ENDPOINT, ATTR_LOCAL, ATTR_MODE, ATTR_PHYSDEV, ATTR_TTL, TUNNEL_MODINFO};

/// Addressing method that marks an interface as a tunnel
pub const ADDR_METHOD_TUNNEL: &str = "tunnel";

/// Kernel kind shared by the `ipip6` and `ip6ip6` modes
pub const KIND_IP6TNL: &str = "ip6tnl";

/// Tunnel type as in `ip tunnel add ... mode <mode>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelMode {
    Gre,
    Gretap,
    Ipip,
    Sit,
    Vti,
    Ip6gre,
    Ipip6,
    Ip6ip6,
    Vti6,
}

impl TunnelMode {
    /// Every mode, in schema order
    pub const ALL: [TunnelMode; 9] = [
        TunnelMode::Gre,
        TunnelMode::Gretap,
        TunnelMode::Ipip,
        TunnelMode::Sit,
        TunnelMode::Vti,
        TunnelMode::Ip6gre,
        TunnelMode::Ipip6,
        TunnelMode::Ip6ip6,
        TunnelMode::Vti6,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelMode::Gre => "gre",
            TunnelMode::Gretap => "gretap",
            TunnelMode::Ipip => "ipip",
            TunnelMode::Sit => "sit",
            TunnelMode::Vti => "vti",
            TunnelMode::Ip6gre => "ip6gre",
            TunnelMode::Ipip6 => "ipip6",
            TunnelMode::Ip6ip6 => "ip6ip6",
            TunnelMode::Vti6 => "vti6",
        }
    }

    /// Link kind the kernel reports for an interface created in this mode
    pub fn kernel_kind(&self) -> &'static str {
        match self {
            TunnelMode::Ipip6 | TunnelMode::Ip6ip6 => KIND_IP6TNL,
            other => other.as_str(),
        }
    }
}

impl fmt::Display for TunnelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TunnelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TunnelMode::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Invalid tunnel mode: {}", s))
    }
}

/// Desired configuration of one tunnel interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSpec {
    pub name: String,
    pub mode: TunnelMode,
    /// Local endpoint address
    pub local: IpAddr,
    /// Remote endpoint address
    pub endpoint: IpAddr,
    pub ttl: Option<u8>,
    /// Underlay device tunnel packets egress through
    pub physdev: Option<String>,
}

impl TunnelSpec {
    /// Create a spec with the required attributes
    pub fn new(name: impl Into<String>, mode: TunnelMode, local: IpAddr, endpoint: IpAddr) -> Self {
        Self {
            name: name.into(),
            mode,
            local,
            endpoint,
            ttl: None,
            physdev: None,
        }
    }

    /// Set the TTL (builder pattern)
    pub fn with_ttl(mut self, ttl: Option<u8>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the underlay device (builder pattern)
    pub fn with_physdev(mut self, physdev: Option<String>) -> Self {
        self.physdev = physdev;
        self
    }

    /// Build a spec from a validated interface stanza
    ///
    /// Fails with `InvalidConfig` on the first schema violation.
    pub fn from_iface(iface: &InterfaceConfig) -> AddonResult<Self> {
        if let Some(err) = TUNNEL_MODINFO.validate(iface).into_iter().next() {
            return Err(err);
        }

        let required = |attr: &str| {
            iface
                .get_attr_value_first(attr)
                .ok_or_else(|| AddonError::invalid_config(&iface.name, attr, "missing"))
        };
        let invalid = |attr: &str, e: String| AddonError::invalid_config(&iface.name, attr, e);

        let mode = required(ATTR_MODE)?
            .parse::<TunnelMode>()
            .map_err(|e| invalid(ATTR_MODE, e))?;
        let local = required(ATTR_LOCAL)?
            .parse::<IpAddr>()
            .map_err(|e| invalid(ATTR_LOCAL, e.to_string()))?;
        let endpoint = required(ATTR_ENDPOINT)?
            .parse::<IpAddr>()
            .map_err(|e| invalid(ATTR_ENDPOINT, e.to_string()))?;
        let ttl = iface
            .get_attr_value_first(ATTR_TTL)
            .map(|v| v.parse::<u8>().map_err(|e| invalid(ATTR_TTL, e.to_string())))
            .transpose()?;
        let physdev = iface.get_attr_value_first(ATTR_PHYSDEV).map(str::to_string);

        Ok(Self::new(iface.name.clone(), mode, local, endpoint)
            .with_ttl(ttl)
            .with_physdev(physdev))
    }

    /// Value of a declarative attribute, `None` when unset
    pub fn attr_value(&self, attr: &str) -> Option<String> {
        match attr {
            ATTR_MODE => Some(self.mode.as_str().to_string()),
            ATTR_LOCAL => Some(self.local.to_string()),
            ATTR_ENDPOINT => Some(self.endpoint.to_string()),
            ATTR_TTL => self.ttl.map(|t| t.to_string()),
            ATTR_PHYSDEV => self.physdev.clone(),
            _ => None,
        }
    }
}
