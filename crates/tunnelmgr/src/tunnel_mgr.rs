//! Tunnel Manager - tunnel reconciliation and drift reporting
//!
//! Every call re-reads the kernel; nothing about previous runs is kept.
//! Tunnel type, endpoints and underlay device can only be set at creation
//! time, so any difference between configuration and kernel state is
//! resolved by deleting and recreating the interface.

use ifupdown_addon_common::link::{linkinfo, LinkDetails, PROP_KIND};
use ifupdown_addon_common::{
    Addon, AddonFlags, AddonResult, AttrStatus, CurrentState, FieldValues, InterfaceConfig,
    LinkAttrs, LinkLayer, LinkResult, ModInfo, Operation,
};
use tracing::{debug, info, warn};

use crate::attrs::{ATTR_MODE, ATTR_PHYSDEV, TUNNEL_MODINFO};
use crate::mapper::map_attrs;
use crate::types::{TunnelSpec, ADDR_METHOD_TUNNEL, KIND_IP6TNL};

/// Hooks implemented by the tunnel module
const SUPPORTED_OPERATIONS: &[Operation] = &[
    Operation::PreUp,
    Operation::PostDown,
    Operation::QueryCheckCurr,
];

/// Action taken to converge one interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Interface did not exist and is created
    Create,
    /// Interface exists with different settings, delete then create
    Recreate,
    /// Interface already matches
    NoOp,
    /// Interface is removed
    Delete,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Create => "create",
            Decision::Recreate => "recreate",
            Decision::NoOp => "noop",
            Decision::Delete => "delete",
        }
    }

    /// Returns true if applying this decision changes the kernel
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Decision::NoOp)
    }
}

/// Tunnel Manager
///
/// Converges tunnel interfaces towards their configuration through a
/// [`LinkLayer`].
pub struct TunnelMgr<L: LinkLayer> {
    link: L,
    flags: AddonFlags,
}

impl<L: LinkLayer> TunnelMgr<L> {
    /// Create a new TunnelMgr instance
    pub fn new(link: L, flags: AddonFlags) -> Self {
        debug!("TunnelMgr initialized (perfmode={})", flags.perfmode);
        Self { link, flags }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Returns true for stanzas using the `tunnel` method with a mode set
    pub fn is_tunnel_interface(iface: &InterfaceConfig) -> bool {
        iface.has_method(ADDR_METHOD_TUNNEL) && iface.get_attr_value_first(ATTR_MODE).is_some()
    }

    /// Decide how to converge `spec` without touching the kernel
    pub fn plan(&mut self, spec: &TunnelSpec) -> LinkResult<Decision> {
        if !self.link.link_exists(&spec.name)? {
            return Ok(Decision::Create);
        }

        let mapped = map_attrs(spec);
        let LinkDetails { kind, attrs } = self.link.link_get_details(&spec.name)?;
        let current_kind = kind.or_else(|| self.link.link_cache_get(&spec.name, PROP_KIND));

        let kind_changed = current_kind.as_deref() != Some(spec.mode.kernel_kind());
        if kind_changed {
            debug!(
                "{}: kind {:?} differs from {}",
                spec.name,
                current_kind,
                spec.mode.kernel_kind()
            );
        }

        if kind_changed
            || has_proto_changed(spec, &attrs)
            || has_config_changed(&attrs, &mapped.attrs)
        {
            Ok(Decision::Recreate)
        } else {
            Ok(Decision::NoOp)
        }
    }

    /// Issue the link calls for `decision`
    fn apply(&mut self, spec: &TunnelSpec, decision: Decision) -> LinkResult<()> {
        let mapped = map_attrs(spec);
        match decision {
            Decision::Create => {
                self.link
                    .tunnel_create(&spec.name, spec.mode.as_str(), &mapped.params)?;
            }
            Decision::Recreate => {
                self.link.link_delete(&spec.name)?;
                self.link
                    .tunnel_create(&spec.name, spec.mode.as_str(), &mapped.params)?;
            }
            Decision::Delete => self.link.link_delete(&spec.name)?,
            Decision::NoOp => {}
        }
        Ok(())
    }

    /// Bring the kernel in line with `spec`
    ///
    /// Returns the decision taken, or `None` if the current state could not
    /// be read. Link failures are logged and never returned; a failed
    /// recreate may leave the interface deleted until the next run.
    pub fn activate(&mut self, spec: &TunnelSpec) -> Option<Decision> {
        let decision = match self.plan(spec) {
            Ok(decision) => decision,
            Err(e) => {
                warn!("{}: failed to read tunnel state: {}", spec.name, e);
                return None;
            }
        };

        if decision.is_mutating() {
            info!(
                "{}: {} {} tunnel ({} -> {})",
                spec.name,
                decision.as_str(),
                spec.mode,
                spec.local,
                spec.endpoint
            );
        } else {
            debug!("{}: tunnel up to date", spec.name);
        }

        if let Err(e) = self.apply(spec, decision) {
            warn!("{}: {}", spec.name, e);
        }
        Some(decision)
    }

    /// Remove the tunnel interface, best effort
    ///
    /// Without perfmode an absent interface is left alone. Returns
    /// `Decision::Delete` whenever a delete was issued.
    pub fn deactivate(&mut self, name: &str) -> Decision {
        if !self.flags.perfmode {
            match self.link.link_exists(name) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("{}: tunnel not present", name);
                    return Decision::NoOp;
                }
                Err(e) => warn!("{}: existence check failed: {}", name, e),
            }
        }

        info!("{}: deleting tunnel", name);
        if let Err(e) = self.link.link_delete(name) {
            warn!("{}: {}", name, e);
        }
        Decision::Delete
    }

    /// Compare `spec` with the running interface
    ///
    /// Only attributes set in `spec` are reported. `mode` is compared after
    /// the kernel kind alias is applied. Never modifies the kernel.
    pub fn check_current(&mut self, spec: &TunnelSpec) -> CurrentState {
        let mut state = CurrentState::new(&spec.name);
        let desired = desired_check_attrs(spec);

        match self.link.link_exists(&spec.name) {
            Ok(true) => {}
            Ok(false) => {
                for (attr, _) in &desired {
                    state.update_with_status(attr, None, AttrStatus::Absent);
                }
                return state;
            }
            Err(e) => {
                warn!("{}: existence check failed: {}", spec.name, e);
                state.update_many_with_status(&desired, AttrStatus::Unknown);
                return state;
            }
        }

        let details = match self.link.link_get_details(&spec.name) {
            Ok(details) => details,
            Err(e) => {
                warn!("{}: failed to read link info: {}", spec.name, e);
                LinkDetails::default()
            }
        };
        let LinkDetails { kind, attrs: mut running } = details;
        if running.is_empty() {
            state.update_many_with_status(&desired, AttrStatus::Unknown);
            return state;
        }
        if let Some(kind) = kind {
            running.insert(ATTR_MODE.to_string(), kind);
        }

        for (attr, value) in &desired {
            match running.get(attr.as_str()) {
                Some(current) if !current.is_empty() && current == value => {
                    state.update_with_status(attr, Some(value.as_str()), AttrStatus::Match)
                }
                current => {
                    state.update_with_status(attr, current.map(String::as_str), AttrStatus::Mismatch)
                }
            }
        }
        state
    }

    /// Underlay device the tunnel depends on
    ///
    /// `None` for interfaces this module does not own.
    pub fn dependencies(iface: &InterfaceConfig) -> Option<Vec<String>> {
        if !Self::is_tunnel_interface(iface) {
            return None;
        }
        Some(
            iface
                .get_attr_value_first(ATTR_PHYSDEV)
                .map(|dev| vec![dev.to_string()])
                .unwrap_or_default(),
        )
    }
}

/// True if an `ip6tnl` device carries the other inner protocol
///
/// `ipip6` and `ip6ip6` share a kernel kind; only `proto` tells them apart.
/// A dump without `proto` is not treated as a change.
fn has_proto_changed(spec: &TunnelSpec, current: &LinkAttrs) -> bool {
    spec.mode.kernel_kind() == KIND_IP6TNL
        && current
            .get(linkinfo::PROTO)
            .is_some_and(|proto| proto != spec.mode.as_str())
}

/// True if any configured attribute differs from the running one
fn has_config_changed(current: &LinkAttrs, configured: &FieldValues) -> bool {
    configured
        .iter()
        .any(|(attr, value)| current.get(attr) != Some(value))
}

/// Attributes covered by a drift check: `mode` (alias applied) followed by
/// every other set attribute
fn desired_check_attrs(spec: &TunnelSpec) -> FieldValues {
    let mut desired: FieldValues = vec![(
        ATTR_MODE.to_string(),
        spec.mode.kernel_kind().to_string(),
    )];
    desired.extend(map_attrs(spec).attrs);
    desired
}

impl<L: LinkLayer> Addon for TunnelMgr<L> {
    fn name(&self) -> &str {
        "tunnel"
    }

    fn modinfo(&self) -> &ModInfo {
        &TUNNEL_MODINFO
    }

    fn supported_operations(&self) -> &[Operation] {
        SUPPORTED_OPERATIONS
    }

    fn is_my_interface(&self, iface: &InterfaceConfig) -> bool {
        Self::is_tunnel_interface(iface)
    }

    fn run(
        &mut self,
        op: Operation,
        iface: &InterfaceConfig,
        current: Option<&mut CurrentState>,
    ) -> AddonResult<()> {
        if !self.supports(op) || !self.is_my_interface(iface) {
            return Ok(());
        }

        match op {
            Operation::PreUp => {
                let spec = TunnelSpec::from_iface(iface)?;
                self.activate(&spec);
            }
            Operation::PostDown => {
                self.deactivate(&iface.name);
            }
            Operation::QueryCheckCurr => {
                let spec = TunnelSpec::from_iface(iface)?;
                let state = self.check_current(&spec);
                match current {
                    Some(sink) => {
                        for (attr, check) in state.iter() {
                            sink.update_with_status(attr, check.value.as_deref(), check.status);
                        }
                    }
                    None => debug!("{}: no state sink for {}", iface.name, op),
                }
            }
        }
        Ok(())
    }

    fn dependent_ifacenames(&self, iface: &InterfaceConfig) -> Option<Vec<String>> {
        Self::dependencies(iface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TunnelMode;
    use ifupdown_addon_common::{field_values, LinkError, LinkParams};
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, HashMap};

    /// Minimal in-memory kernel
    #[derive(Default)]
    struct FakeLink {
        links: HashMap<String, (String, LinkAttrs)>,
        calls: Vec<String>,
        reject_create: bool,
    }

    impl FakeLink {
        fn with_link(mut self, name: &str, kind: &str, attrs: &[(&str, &str)]) -> Self {
            let attrs: BTreeMap<_, _> = attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            self.links.insert(name.to_string(), (kind.to_string(), attrs));
            self
        }

        fn mutations(&self) -> Vec<&str> {
            self.calls
                .iter()
                .map(String::as_str)
                .filter(|c| c.starts_with("create") || c.starts_with("delete"))
                .collect()
        }
    }

    impl LinkLayer for FakeLink {
        fn link_exists(&mut self, name: &str) -> LinkResult<bool> {
            self.calls.push(format!("exists {}", name));
            Ok(self.links.contains_key(name))
        }

        fn tunnel_create(&mut self, name: &str, mode: &str, params: &LinkParams) -> LinkResult<()> {
            let rendered: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            self.calls
                .push(format!("create {} {} {}", name, mode, rendered.join(",")));
            if self.reject_create {
                return Err(LinkError::ShellCommandFailed {
                    command: "ip tunnel add".to_string(),
                    exit_code: 2,
                    output: "RTNETLINK answers: Invalid argument".to_string(),
                });
            }
            Ok(())
        }

        fn link_delete(&mut self, name: &str) -> LinkResult<()> {
            self.calls.push(format!("delete {}", name));
            self.links
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| LinkError::not_found(name))
        }

        fn link_get_linkinfo_attrs(&mut self, name: &str) -> LinkResult<LinkAttrs> {
            self.links
                .get(name)
                .map(|(_, attrs)| attrs.clone())
                .ok_or_else(|| LinkError::not_found(name))
        }

        fn link_get_kind(&mut self, name: &str) -> LinkResult<Option<String>> {
            Ok(self.links.get(name).map(|(kind, _)| kind.clone()))
        }

        fn link_cache_get(&self, _name: &str, _prop: &str) -> Option<String> {
            None
        }
    }

    fn gre0() -> TunnelSpec {
        TunnelSpec::new(
            "gre0",
            TunnelMode::Gre,
            "10.0.0.1".parse().unwrap(),
            "10.0.0.2".parse().unwrap(),
        )
    }

    fn gre_iface() -> InterfaceConfig {
        InterfaceConfig::new("gre0")
            .with_method("inet", "tunnel")
            .with_attr("mode", "gre")
            .with_attr("local", "10.0.0.1")
            .with_attr("endpoint", "10.0.0.2")
    }

    #[test]
    fn test_activate_creates_missing_tunnel() {
        let mut mgr = TunnelMgr::new(FakeLink::default(), AddonFlags::default());

        assert_eq!(mgr.activate(&gre0()), Some(Decision::Create));
        assert_eq!(
            mgr.link().mutations(),
            vec!["create gre0 gre local=10.0.0.1,remote=10.0.0.2"]
        );
    }

    #[test]
    fn test_activate_noop_when_matching() {
        let link = FakeLink::default().with_link(
            "gre0",
            "gre",
            &[("local", "10.0.0.1"), ("endpoint", "10.0.0.2"), ("ttl", "64")],
        );
        let mut mgr = TunnelMgr::new(link, AddonFlags::default());

        assert_eq!(mgr.activate(&gre0()), Some(Decision::NoOp));
        assert!(mgr.link().mutations().is_empty());
    }

    #[test]
    fn test_activate_recreates_on_endpoint_change() {
        let link = FakeLink::default().with_link(
            "gre0",
            "gre",
            &[("local", "10.0.0.1"), ("endpoint", "10.0.0.9")],
        );
        let mut mgr = TunnelMgr::new(link, AddonFlags::default());

        assert_eq!(mgr.activate(&gre0()), Some(Decision::Recreate));
        assert_eq!(
            mgr.link().mutations(),
            vec![
                "delete gre0",
                "create gre0 gre local=10.0.0.1,remote=10.0.0.2"
            ]
        );
    }

    #[test]
    fn test_activate_recreates_on_kind_change() {
        let link = FakeLink::default().with_link(
            "gre0",
            "gretap",
            &[("local", "10.0.0.1"), ("endpoint", "10.0.0.2")],
        );
        let mut mgr = TunnelMgr::new(link, AddonFlags::default());

        assert_eq!(mgr.plan(&gre0()).unwrap(), Decision::Recreate);
    }

    #[test]
    fn test_activate_swallows_create_failure() {
        let mut link = FakeLink::default().with_link("gre0", "ipip", &[]);
        link.reject_create = true;
        let mut mgr = TunnelMgr::new(link, AddonFlags::default());

        assert_eq!(mgr.activate(&gre0()), Some(Decision::Recreate));
        // Deleted, not recreated: repaired on the next run
        assert!(!mgr.link().links.contains_key("gre0"));
    }

    #[test]
    fn test_deactivate() {
        let link = FakeLink::default().with_link("gre0", "gre", &[]);
        let mut mgr = TunnelMgr::new(link, AddonFlags::default());

        assert_eq!(mgr.deactivate("gre1"), Decision::NoOp);
        assert_eq!(mgr.deactivate("gre0"), Decision::Delete);
        assert_eq!(mgr.link().mutations(), vec!["delete gre0"]);
    }

    #[test]
    fn test_deactivate_perfmode_skips_existence_check() {
        let flags = AddonFlags::default().with_perfmode(true);
        let mut mgr = TunnelMgr::new(FakeLink::default(), flags);

        assert_eq!(mgr.deactivate("gre0"), Decision::Delete);
        assert_eq!(mgr.link().calls, vec!["delete gre0"]);
    }

    #[test]
    fn test_check_current_absent() {
        let mut mgr = TunnelMgr::new(FakeLink::default(), AddonFlags::default());
        let state = mgr.check_current(&gre0().with_ttl(Some(64)));

        assert_eq!(state.len(), 4);
        assert!(state.iter().all(|(_, c)| c.status == AttrStatus::Absent && c.value.is_none()));
    }

    #[test]
    fn test_check_current_no_linkinfo_is_unknown() {
        let link = FakeLink::default().with_link("gre0", "dummy", &[]);
        let mut mgr = TunnelMgr::new(link, AddonFlags::default());
        let state = mgr.check_current(&gre0());

        assert_eq!(state.get("mode").unwrap().status, AttrStatus::Unknown);
        assert_eq!(state.get("mode").unwrap().value.as_deref(), Some("gre"));
    }

    #[test]
    fn test_check_current_reports_observed_value() {
        let link = FakeLink::default().with_link(
            "gre0",
            "gre",
            &[("local", "10.0.0.1"), ("endpoint", "10.0.0.9")],
        );
        let mut mgr = TunnelMgr::new(link, AddonFlags::default());
        let state = mgr.check_current(&gre0().with_ttl(Some(64)));

        let summary: Vec<(&str, Option<&str>, AttrStatus)> = state
            .iter()
            .map(|(a, c)| (a, c.value.as_deref(), c.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("mode", Some("gre"), AttrStatus::Match),
                ("local", Some("10.0.0.1"), AttrStatus::Match),
                ("endpoint", Some("10.0.0.9"), AttrStatus::Mismatch),
                ("ttl", None, AttrStatus::Mismatch),
            ]
        );
        assert!(mgr.link().mutations().is_empty());
    }

    #[test]
    fn test_has_config_changed() {
        let current: LinkAttrs = [("local", "10.0.0.1"), ("ttl", "64")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        assert!(!has_config_changed(&current, &field_values! { "local" => "10.0.0.1" }));
        assert!(has_config_changed(&current, &field_values! { "ttl" => "32" }));
        assert!(has_config_changed(&current, &field_values! { "endpoint" => "10.0.0.2" }));
    }

    #[test]
    fn test_has_proto_changed() {
        let ipip6 = TunnelSpec::new(
            "tun6",
            TunnelMode::Ipip6,
            "2001:db8::1".parse().unwrap(),
            "2001:db8::2".parse().unwrap(),
        );
        let proto = |p: &str| -> LinkAttrs {
            [("proto".to_string(), p.to_string())].into_iter().collect()
        };

        assert!(!has_proto_changed(&ipip6, &proto("ipip6")));
        assert!(has_proto_changed(&ipip6, &proto("ip6ip6")));
        assert!(!has_proto_changed(&ipip6, &LinkAttrs::new()));
        // Only ip6tnl devices carry proto
        assert!(!has_proto_changed(&gre0(), &proto("ip6ip6")));
    }

    #[test]
    fn test_is_tunnel_interface() {
        assert!(TunnelMgr::<FakeLink>::is_tunnel_interface(&gre_iface()));

        let static_iface = InterfaceConfig::new("gre0")
            .with_method("inet", "static")
            .with_attr("mode", "gre");
        assert!(!TunnelMgr::<FakeLink>::is_tunnel_interface(&static_iface));

        let no_mode = InterfaceConfig::new("gre0").with_method("inet", "tunnel");
        assert!(!TunnelMgr::<FakeLink>::is_tunnel_interface(&no_mode));
    }

    #[test]
    fn test_dependencies() {
        assert_eq!(TunnelMgr::<FakeLink>::dependencies(&gre_iface()), Some(vec![]));

        let with_dev = gre_iface().with_attr("tunnel-physdev", "eth1");
        assert_eq!(
            TunnelMgr::<FakeLink>::dependencies(&with_dev),
            Some(vec!["eth1".to_string()])
        );

        let eth = InterfaceConfig::new("eth1").with_method("inet", "static");
        assert_eq!(TunnelMgr::<FakeLink>::dependencies(&eth), None);
    }

    #[test]
    fn test_run_skips_foreign_interfaces() {
        let mut mgr = TunnelMgr::new(FakeLink::default(), AddonFlags::default());
        let eth = InterfaceConfig::new("eth1").with_method("inet", "static");

        mgr.run(Operation::PreUp, &eth, None).unwrap();
        mgr.run(Operation::PostDown, &eth, None).unwrap();
        assert!(mgr.link().calls.is_empty());
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let mut mgr = TunnelMgr::new(FakeLink::default(), AddonFlags::default());
        let iface = InterfaceConfig::new("gre0")
            .with_method("inet", "tunnel")
            .with_attr("mode", "gre");

        let err = mgr.run(Operation::PreUp, &iface, None).unwrap_err();
        assert!(err.is_config_error());
        assert!(mgr.link().calls.is_empty());
    }

    #[test]
    fn test_run_query_fills_sink() {
        let link = FakeLink::default().with_link(
            "gre0",
            "gre",
            &[("local", "10.0.0.1"), ("endpoint", "10.0.0.2")],
        );
        let mut mgr = TunnelMgr::new(link, AddonFlags::default());
        let mut sink = CurrentState::new("gre0");

        mgr.run(Operation::QueryCheckCurr, &gre_iface(), Some(&mut sink))
            .unwrap();
        assert_eq!(sink.len(), 3);
        assert!(sink.all_match());
    }

    #[test]
    fn test_decision_names() {
        assert_eq!(Decision::Recreate.as_str(), "recreate");
        assert!(Decision::Create.is_mutating());
        assert!(!Decision::NoOp.is_mutating());
    }
}
