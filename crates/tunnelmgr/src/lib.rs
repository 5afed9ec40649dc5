//! Tunnel addon - GRE/IPIP/SIT/VTI tunnel interface management
//!
//! tunnelmgr manages tunnel interfaces declared in interfaces(5), handling:
//! - Tunnel creation, and recreation when the kernel state drifted
//! - Best-effort teardown
//! - Drift reporting for `query-checkcurr`
//! - Underlay device dependencies

pub mod attrs;
pub mod mapper;
pub mod tunnel_mgr;
pub mod types;

pub use mapper::{map_attrs, MappedAttrs};
pub use tunnel_mgr::{Decision, TunnelMgr};
pub use types::{TunnelMode, TunnelSpec};
