//! Interface stanza fixtures for tunnel tests
//!
//! Provides reusable interfaces(5) stanzas and kernel link-info views

use ifupdown_addon_common::InterfaceConfig;

/// A `tunnel` method stanza with the required attributes set
pub fn tunnel_iface(name: &str, mode: &str, local: &str, endpoint: &str) -> InterfaceConfig {
    let family = if local.contains(':') { "inet6" } else { "inet" };
    InterfaceConfig::new(name)
        .with_method(family, "tunnel")
        .with_attr("mode", mode)
        .with_attr("local", local)
        .with_attr("endpoint", endpoint)
}

/// Kernel link-info attributes matching a created tunnel
pub fn running_attrs<'a>(local: &'a str, endpoint: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![("local", local), ("endpoint", endpoint)]
}

/// Common GRE fixtures
pub mod gre_fixtures {
    use super::*;

    /// `gre0`: 10.0.0.1 -> 10.0.0.2
    pub fn gre0() -> InterfaceConfig {
        tunnel_iface("gre0", "gre", "10.0.0.1", "10.0.0.2")
    }

    /// `gre0` with ttl 64 over eth1
    pub fn gre0_full() -> InterfaceConfig {
        gre0()
            .with_attr("ttl", "64")
            .with_attr("tunnel-physdev", "eth1")
    }

    /// L2 GRE tunnel
    pub fn gretap0() -> InterfaceConfig {
        tunnel_iface("gretap0", "gretap", "10.0.1.1", "10.0.1.2")
    }
}

/// IPv6 underlay fixtures
pub mod ip6_fixtures {
    use super::*;

    /// IPv4-in-IPv6 tunnel, reported by the kernel as `ip6tnl`
    pub fn ipip6_tun() -> InterfaceConfig {
        tunnel_iface("tun6", "ipip6", "2001:db8::1", "2001:db8::2")
    }

    /// IPv6-in-IPv6 tunnel, reported by the kernel as `ip6tnl`
    pub fn ip6ip6_tun() -> InterfaceConfig {
        tunnel_iface("tun66", "ip6ip6", "2001:db8::1", "2001:db8::3")
    }

    pub fn ip6gre_tun() -> InterfaceConfig {
        tunnel_iface("gre6", "ip6gre", "2001:db8::1", "2001:db8::4")
    }
}

/// Interfaces the tunnel module must ignore
pub mod foreign_fixtures {
    use super::*;

    pub fn static_eth(name: &str) -> InterfaceConfig {
        InterfaceConfig::new(name)
            .with_method("inet", "static")
            .with_attr("address", "192.0.2.1/24")
    }

    pub fn loopback() -> InterfaceConfig {
        InterfaceConfig::new("lo").with_method("inet", "loopback")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_iface_family() {
        let v4 = gre_fixtures::gre0();
        assert_eq!(v4.addr_family.as_deref(), Some("inet"));
        assert_eq!(v4.get_attr_value_first("endpoint"), Some("10.0.0.2"));

        let v6 = ip6_fixtures::ipip6_tun();
        assert_eq!(v6.addr_family.as_deref(), Some("inet6"));
        assert!(v6.has_method("tunnel"));
    }

    #[test]
    fn test_foreign_fixtures() {
        assert!(!foreign_fixtures::static_eth("eth0").has_method("tunnel"));
        assert!(!foreign_fixtures::loopback().has_method("tunnel"));
    }
}
