//! Attribute names and schema for tunnel interfaces

use ifupdown_addon_common::modinfo::validvals;
use ifupdown_addon_common::{AttrInfo, ModInfo};

// interfaces(5) attribute names
pub const ATTR_MODE: &str = "mode";
pub const ATTR_LOCAL: &str = "local";
pub const ATTR_ENDPOINT: &str = "endpoint";
pub const ATTR_TTL: &str = "ttl";
pub const ATTR_PHYSDEV: &str = "tunnel-physdev";

/// Parameter names understood by `ip tunnel add`
pub mod iproute_params {
    pub const LOCAL: &str = "local";
    pub const REMOTE: &str = "remote";
    pub const TTL: &str = "ttl";
    pub const DEV: &str = "dev";
}

/// Attribute name -> `ip` parameter name, in the order parameters are passed
pub const ATTR_MAP: &[(&str, &str)] = &[
    (ATTR_LOCAL, iproute_params::LOCAL),
    (ATTR_ENDPOINT, iproute_params::REMOTE),
    (ATTR_TTL, iproute_params::TTL),
    (ATTR_PHYSDEV, iproute_params::DEV),
];

static TUNNEL_ATTRS: &[AttrInfo] = &[
    AttrInfo {
        name: ATTR_MODE,
        help: "type of tunnel as in 'ip link' command.",
        validvals: &[
            "gre", "gretap", "ipip", "sit", "vti", "ip6gre", "ipip6", "ip6ip6", "vti6",
        ],
        required: true,
        example: &["mode gre"],
    },
    AttrInfo {
        name: ATTR_LOCAL,
        help: "IP of local tunnel endpoint",
        validvals: &[validvals::IPV4, validvals::IPV6],
        required: true,
        example: &["local 192.2.0.42"],
    },
    AttrInfo {
        name: ATTR_ENDPOINT,
        help: "IP of remote tunnel endpoint",
        validvals: &[validvals::IPV4, validvals::IPV6],
        required: true,
        example: &["endpoint 192.2.0.23"],
    },
    AttrInfo {
        name: ATTR_TTL,
        help: "TTL for tunnel packets",
        validvals: &[validvals::NUMBER],
        required: false,
        example: &["ttl 64"],
    },
    AttrInfo {
        name: ATTR_PHYSDEV,
        help: "Physical underlay device to use for tunnel packets",
        validvals: &[validvals::INTERFACE],
        required: false,
        example: &["tunnel-physdev eth1"],
    },
];

/// Schema of the tunnel module
pub static TUNNEL_MODINFO: ModInfo = ModInfo {
    help: "create/configure GRE/IPIP/SIT and GRETAP tunnel interfaces",
    attrs: TUNNEL_ATTRS,
};
