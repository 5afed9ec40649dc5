//! Addon trait and lifecycle abstractions.
//!
//! The lifecycle framework calls addons at fixed hook points. Each addon
//! declares the hooks it implements and decides per interface whether it
//! owns it.

use std::fmt;
use std::str::FromStr;

use crate::error::AddonResult;
use crate::iface::{CurrentState, InterfaceConfig};
use crate::modinfo::ModInfo;

/// Hook points an addon can be invoked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Before the interface is brought up.
    PreUp,
    /// After the interface has been taken down.
    PostDown,
    /// Compare configuration against the running state.
    QueryCheckCurr,
}

impl Operation {
    /// Returns the hook name used by ifupdown.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::PreUp => "pre-up",
            Operation::PostDown => "post-down",
            Operation::QueryCheckCurr => "query-checkcurr",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre-up" => Ok(Operation::PreUp),
            "post-down" => Ok(Operation::PostDown),
            "query-checkcurr" => Ok(Operation::QueryCheckCurr),
            other => Err(format!("Unknown operation: {}", other)),
        }
    }
}

/// Process-wide flags, passed to addons and the link layer at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddonFlags {
    /// Skip existence re-checks before teardown.
    pub perfmode: bool,
    /// Log mutating commands instead of executing them.
    pub dryrun: bool,
}

impl AddonFlags {
    pub fn with_perfmode(mut self, perfmode: bool) -> Self {
        self.perfmode = perfmode;
        self
    }

    pub fn with_dryrun(mut self, dryrun: bool) -> Self {
        self.dryrun = dryrun;
        self
    }
}

/// Base trait for addon modules.
///
/// # Example
///
/// ```ignore
/// use ifupdown_addon_common::{Addon, Operation};
///
/// fn bring_up(addon: &mut dyn Addon, ifaces: &[InterfaceConfig]) -> AddonResult<()> {
///     for iface in ifaces {
///         addon.run(Operation::PreUp, iface, None)?;
///     }
///     Ok(())
/// }
/// ```
pub trait Addon {
    /// Returns the module name (e.g., "tunnel").
    fn name(&self) -> &str;

    /// Returns the attribute schema of this module.
    fn modinfo(&self) -> &ModInfo;

    /// Returns the hooks this module implements.
    fn supported_operations(&self) -> &[Operation];

    /// Returns true if this module manages `iface`.
    fn is_my_interface(&self, iface: &InterfaceConfig) -> bool;

    /// Runs `op` for `iface`.
    ///
    /// Returns `Ok(())` without doing anything for unsupported hooks and for
    /// interfaces this module does not own. `current` receives the running
    /// state for [`Operation::QueryCheckCurr`].
    fn run(
        &mut self,
        op: Operation,
        iface: &InterfaceConfig,
        current: Option<&mut CurrentState>,
    ) -> AddonResult<()>;

    /// Names of interfaces that must be brought up before `iface`.
    ///
    /// `None` if this module does not own `iface`.
    fn dependent_ifacenames(&self, iface: &InterfaceConfig) -> Option<Vec<String>>;

    /// Returns true if this module implements `op`.
    fn supports(&self, op: Operation) -> bool {
        self.supported_operations().contains(&op)
    }
}
