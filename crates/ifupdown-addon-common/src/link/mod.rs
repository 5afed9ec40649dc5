//! Link layer: kernel interface existence, creation, deletion and
//! introspection.
//!
//! Addons talk to the kernel only through the [`LinkLayer`] trait. The
//! production implementation is [`IpRoute2`], which drives `ip(8)`; tests
//! substitute a recording mock.
//!
//! Link-info attributes are returned under the declarative attribute names
//! used in interfaces files (see [`linkinfo`]), so addons can compare them
//! with their configuration directly.

pub mod cache;
pub mod commands;
pub mod iproute2;

use std::collections::BTreeMap;

use crate::error::LinkResult;

pub use cache::LinkCache;
pub use iproute2::IpRoute2;

/// Ordered `(parameter, value)` pairs passed to a create call.
pub type LinkParams = Vec<(String, String)>;

/// Link-info attributes of an existing interface.
pub type LinkAttrs = BTreeMap<String, String>;

/// Keys of [`LinkAttrs`].
pub mod linkinfo {
    pub const LOCAL: &str = "local";
    pub const ENDPOINT: &str = "endpoint";
    pub const TTL: &str = "ttl";
    pub const PHYSDEV: &str = "tunnel-physdev";
    /// Inner protocol of an `ip6tnl` device (`ipip6`, `ip6ip6` or `any`).
    pub const PROTO: &str = "proto";
}

/// Cached property holding the kernel link kind.
pub const PROP_KIND: &str = "kind";

/// Kind and link-info attributes of one interface, read together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDetails {
    pub kind: Option<String>,
    pub attrs: LinkAttrs,
}

/// Kernel interface manipulation.
///
/// Implementations need not be thread-safe; callers issue requests
/// serially.
pub trait LinkLayer {
    /// Returns true if an interface named `name` exists.
    fn link_exists(&mut self, name: &str) -> LinkResult<bool>;

    /// Creates a tunnel interface of `mode` with type-specific `params`.
    fn tunnel_create(&mut self, name: &str, mode: &str, params: &LinkParams) -> LinkResult<()>;

    /// Deletes the interface.
    fn link_delete(&mut self, name: &str) -> LinkResult<()>;

    /// Returns the link-info attributes of `name`, empty if the kernel
    /// reports none.
    fn link_get_linkinfo_attrs(&mut self, name: &str) -> LinkResult<LinkAttrs>;

    /// Returns the raw kernel link kind (e.g., "gre", "ip6tnl").
    fn link_get_kind(&mut self, name: &str) -> LinkResult<Option<String>>;

    /// Returns a cached property, which may be stale.
    fn link_cache_get(&self, name: &str, prop: &str) -> Option<String>;

    /// Returns kind and link-info attributes from a single read.
    ///
    /// Implementations that can fetch both at once should override this;
    /// the default issues the two separate reads.
    fn link_get_details(&mut self, name: &str) -> LinkResult<LinkDetails> {
        let attrs = self.link_get_linkinfo_attrs(name)?;
        let kind = self.link_get_kind(name)?;
        Ok(LinkDetails { kind, attrs })
    }
}
