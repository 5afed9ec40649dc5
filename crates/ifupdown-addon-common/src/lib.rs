//! Common infrastructure for ifupdown addon modules.
//!
//! This crate provides the pieces shared by every addon:
//!
//! - [`Addon`]: the hook interface the lifecycle framework drives
//! - [`iface`]: interface configuration objects and the running-state sink
//! - [`interfaces`]: loader for `interfaces(5)` files
//! - [`modinfo`]: declarative attribute schemas and their validation
//! - [`link`]: the link layer trait and its `ip(8)` implementation
//! - [`shell`]: shell command execution with proper quoting
//! - [`error`]: error types
//!
//! # Architecture
//!
//! Addons follow this pattern:
//!
//! 1. The framework loads and validates interface stanzas
//! 2. For each hook it asks every addon whether it owns the interface
//! 3. The owning addon reads the kernel state through [`link::LinkLayer`]
//! 4. It converges the kernel towards the stanza, or reports the drift
//!
//! # Example
//!
//! ```ignore
//! use ifupdown_addon_common::{load_interfaces, Addon, Operation};
//!
//! let ifaces = load_interfaces("/etc/network/interfaces")?;
//! for iface in &ifaces {
//!     addon.run(Operation::PreUp, iface, None)?;
//! }
//! ```

pub mod addon;
pub mod error;
pub mod iface;
pub mod interfaces;
pub mod link;
pub mod modinfo;
pub mod shell;

// Re-export commonly used items at crate root
pub use addon::{Addon, AddonFlags, Operation};
pub use error::{AddonError, AddonResult, LinkError, LinkResult};
pub use iface::{
    AttrCheck, AttrStatus, CurrentState, FieldValue, FieldValues, FieldValuesExt, InterfaceConfig,
};
pub use interfaces::{load_interfaces, parse_interfaces, DEFAULT_INTERFACES_FILE};
pub use link::{IpRoute2, LinkAttrs, LinkDetails, LinkLayer, LinkParams};
pub use modinfo::{AttrInfo, ModInfo};
