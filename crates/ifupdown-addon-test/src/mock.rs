//! Recording in-memory link layer
//!
//! Behaves like a small kernel: created tunnels show up with the kind and
//! link-info attributes the kernel would report, deleted ones disappear.
//! Every call is recorded for later verification.

use std::collections::{BTreeMap, HashMap};

use ifupdown_addon_common::link::{linkinfo, PROP_KIND};
use ifupdown_addon_common::{LinkAttrs, LinkError, LinkLayer, LinkParams, LinkResult};

/// One call made against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCall {
    Exists(String),
    Create {
        name: String,
        mode: String,
        params: LinkParams,
    },
    Delete(String),
    LinkInfoAttrs(String),
    Kind(String),
}

impl LinkCall {
    /// Returns true for create and delete calls
    pub fn is_mutating(&self) -> bool {
        matches!(self, LinkCall::Create { .. } | LinkCall::Delete(_))
    }
}

/// An interface known to the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockLink {
    pub kind: Option<String>,
    pub attrs: LinkAttrs,
}

/// Which calls should fail
///
/// `reads` fails both link-info and kind reads; `kind` fails only the latter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureInjection {
    pub exists: bool,
    pub create: bool,
    pub delete: bool,
    pub reads: bool,
    pub kind: bool,
}

#[derive(Debug, Default)]
pub struct MockLinkLayer {
    links: HashMap<String, MockLink>,
    cache: HashMap<String, String>,
    calls: Vec<LinkCall>,
    fail: FailureInjection,
}

/// Kind the kernel reports for a tunnel mode
pub fn kernel_kind_for_mode(mode: &str) -> &str {
    match mode {
        "ipip6" | "ip6ip6" => "ip6tnl",
        other => other,
    }
}

/// Translate create parameters back into link-info attributes
fn params_to_attrs(mode: &str, params: &LinkParams) -> LinkAttrs {
    let mut attrs: LinkAttrs = params
        .iter()
        .filter_map(|(param, value)| {
            let attr = match param.as_str() {
                "local" => linkinfo::LOCAL,
                "remote" => linkinfo::ENDPOINT,
                "ttl" => linkinfo::TTL,
                "dev" => linkinfo::PHYSDEV,
                _ => return None,
            };
            Some((attr.to_string(), value.clone()))
        })
        .collect();
    if kernel_kind_for_mode(mode) != mode {
        attrs.insert(linkinfo::PROTO.to_string(), mode.to_string());
    }
    attrs
}

impl MockLinkLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an existing interface (builder pattern)
    pub fn with_link(mut self, name: &str, kind: &str, attrs: &[(&str, &str)]) -> Self {
        let attrs: BTreeMap<String, String> = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.links.insert(
            name.to_string(),
            MockLink {
                kind: Some(kind.to_string()),
                attrs,
            },
        );
        self
    }

    /// Seed the property cache with a possibly stale kind (builder pattern)
    pub fn with_cached_kind(mut self, name: &str, kind: &str) -> Self {
        self.cache.insert(name.to_string(), kind.to_string());
        self
    }

    /// Configure failure injection (builder pattern)
    pub fn with_failures(mut self, fail: FailureInjection) -> Self {
        self.fail = fail;
        self
    }

    pub fn set_failures(&mut self, fail: FailureInjection) {
        self.fail = fail;
    }

    pub fn link(&self, name: &str) -> Option<&MockLink> {
        self.links.get(name)
    }

    pub fn has_link(&self, name: &str) -> bool {
        self.links.contains_key(name)
    }

    pub fn calls(&self) -> &[LinkCall] {
        &self.calls
    }

    pub fn mutating_calls(&self) -> Vec<&LinkCall> {
        self.calls.iter().filter(|c| c.is_mutating()).collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Change an attribute behind the manager's back
    pub fn mutate_attr(&mut self, name: &str, attr: &str, value: &str) {
        if let Some(link) = self.links.get_mut(name) {
            link.attrs.insert(attr.to_string(), value.to_string());
        }
    }

    /// Make the kernel report no kind for `name`
    pub fn clear_kind(&mut self, name: &str) {
        if let Some(link) = self.links.get_mut(name) {
            link.kind = None;
        }
    }

    fn read_failure(&self, name: &str, failing: bool) -> LinkResult<()> {
        if failing {
            tracing::debug!("mock: failing read for {}", name);
            return Err(LinkError::parse("ip -d -j link show", "injected failure"));
        }
        Ok(())
    }
}

impl LinkLayer for MockLinkLayer {
    fn link_exists(&mut self, name: &str) -> LinkResult<bool> {
        self.calls.push(LinkCall::Exists(name.to_string()));
        if self.fail.exists {
            return Err(LinkError::ShellExec {
                command: format!("test -e /sys/class/net/{}", name),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "injected failure"),
            });
        }
        Ok(self.links.contains_key(name))
    }

    fn tunnel_create(&mut self, name: &str, mode: &str, params: &LinkParams) -> LinkResult<()> {
        self.calls.push(LinkCall::Create {
            name: name.to_string(),
            mode: mode.to_string(),
            params: params.clone(),
        });
        if self.fail.create {
            return Err(LinkError::ShellCommandFailed {
                command: format!("ip tunnel add {} mode {}", name, mode),
                exit_code: 2,
                output: "RTNETLINK answers: Invalid argument".to_string(),
            });
        }
        if self.links.contains_key(name) {
            return Err(LinkError::ShellCommandFailed {
                command: format!("ip tunnel add {} mode {}", name, mode),
                exit_code: 2,
                output: "RTNETLINK answers: File exists".to_string(),
            });
        }

        self.links.insert(
            name.to_string(),
            MockLink {
                kind: Some(kernel_kind_for_mode(mode).to_string()),
                attrs: params_to_attrs(mode, params),
            },
        );
        self.cache.remove(name);
        Ok(())
    }

    fn link_delete(&mut self, name: &str) -> LinkResult<()> {
        self.calls.push(LinkCall::Delete(name.to_string()));
        if self.fail.delete {
            return Err(LinkError::ShellCommandFailed {
                command: format!("ip link del {}", name),
                exit_code: 2,
                output: "RTNETLINK answers: Device or resource busy".to_string(),
            });
        }
        self.cache.remove(name);
        self.links
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| LinkError::not_found(name))
    }

    fn link_get_linkinfo_attrs(&mut self, name: &str) -> LinkResult<LinkAttrs> {
        self.calls.push(LinkCall::LinkInfoAttrs(name.to_string()));
        self.read_failure(name, self.fail.reads)?;
        self.links
            .get(name)
            .map(|l| l.attrs.clone())
            .ok_or_else(|| LinkError::not_found(name))
    }

    fn link_get_kind(&mut self, name: &str) -> LinkResult<Option<String>> {
        self.calls.push(LinkCall::Kind(name.to_string()));
        self.read_failure(name, self.fail.reads || self.fail.kind)?;
        let kind = self
            .links
            .get(name)
            .ok_or_else(|| LinkError::not_found(name))?
            .kind
            .clone();
        if let Some(kind) = &kind {
            self.cache.insert(name.to_string(), kind.clone());
        }
        Ok(kind)
    }

    fn link_cache_get(&self, name: &str, prop: &str) -> Option<String> {
        if prop != PROP_KIND {
            return None;
        }
        self.cache.get(name).cloned()
    }
}
