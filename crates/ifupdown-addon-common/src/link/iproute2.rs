//! `ip(8)` backed link layer

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::commands::{build_link_del_cmd, build_link_show_cmd, build_tunnel_create_cmd};
use super::{linkinfo, LinkAttrs, LinkCache, LinkDetails, LinkLayer, LinkParams, PROP_KIND};
use crate::addon::AddonFlags;
use crate::error::{LinkError, LinkResult};
use crate::shell;

/// Where the kernel exposes one directory per network interface.
pub const SYSFS_NET: &str = "/sys/class/net";

/// Link layer driving `/sbin/ip`
pub struct IpRoute2 {
    flags: AddonFlags,

    /// Root of the per-interface sysfs directories
    sysfs_root: PathBuf,

    /// Property cache (link kind)
    cache: LinkCache,

    #[cfg(test)]
    mock_mode: bool,

    #[cfg(test)]
    captured_commands: Vec<String>,

    #[cfg(test)]
    canned_output: std::collections::HashMap<String, String>,
}

/// One entry of `ip -d -j link show`.
#[derive(Debug, Deserialize)]
struct IpLink {
    ifname: String,
    /// Lower device for tunnels bound to a physical interface.
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    linkinfo: Option<IpLinkInfo>,
}

#[derive(Debug, Deserialize)]
struct IpLinkInfo {
    #[serde(default)]
    info_kind: Option<String>,
    #[serde(default)]
    info_data: Option<serde_json::Map<String, Value>>,
}

impl IpRoute2 {
    pub fn new(flags: AddonFlags) -> Self {
        Self {
            flags,
            sysfs_root: PathBuf::from(SYSFS_NET),
            cache: LinkCache::new(),
            #[cfg(test)]
            mock_mode: false,
            #[cfg(test)]
            captured_commands: Vec::new(),
            #[cfg(test)]
            canned_output: std::collections::HashMap::new(),
        }
    }

    /// Use a different sysfs root for existence checks (builder pattern)
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    #[cfg(test)]
    fn new_mock(flags: AddonFlags) -> Self {
        let mut link = Self::new(flags);
        link.mock_mode = true;
        link
    }

    #[cfg(test)]
    fn with_output(mut self, cmd: String, stdout: &str) -> Self {
        self.canned_output.insert(cmd, stdout.to_string());
        self
    }

    #[cfg(test)]
    fn cache(&self) -> &LinkCache {
        &self.cache
    }

    /// Execute command (or capture in mock mode)
    fn exec(&mut self, cmd: &str) -> LinkResult<String> {
        #[cfg(test)]
        if self.mock_mode {
            self.captured_commands.push(cmd.to_string());
            return Ok(self.canned_output.get(cmd).cloned().unwrap_or_default());
        }

        shell::run_checked(cmd)
    }

    /// Execute a mutating command, honoring dry-run
    fn exec_mutating(&mut self, cmd: &str) -> LinkResult<bool> {
        if self.flags.dryrun {
            info!("dry-run: {}", cmd);
            return Ok(false);
        }
        self.exec(cmd)?;
        Ok(true)
    }

    /// Dump one link and refresh the cached kind
    ///
    /// A dump without a kind leaves the last known kind in place.
    fn show(&mut self, name: &str) -> LinkResult<LinkDetails> {
        let cmd = build_link_show_cmd(name);
        let output = self.exec(&cmd)?;
        let details = parse_link_show(&cmd, name, &output)?;

        if let Some(kind) = &details.kind {
            self.cache.set(name, PROP_KIND, kind.clone());
        }
        Ok(details)
    }

    #[cfg(test)]
    fn captured_commands(&self) -> &[String] {
        &self.captured_commands
    }
}

impl LinkLayer for IpRoute2 {
    fn link_exists(&mut self, name: &str) -> LinkResult<bool> {
        Ok(sysfs_has_link(&self.sysfs_root, name))
    }

    fn tunnel_create(&mut self, name: &str, mode: &str, params: &LinkParams) -> LinkResult<()> {
        let cmd = build_tunnel_create_cmd(name, mode, params);
        // The kernel may report a different kind than the requested mode
        // (ipip6 -> ip6tnl), so the next dump repopulates the entry.
        if self.exec_mutating(&cmd)? {
            self.cache.remove(name);
        }
        Ok(())
    }

    fn link_delete(&mut self, name: &str) -> LinkResult<()> {
        let cmd = build_link_del_cmd(name);
        if self.exec_mutating(&cmd)? {
            self.cache.remove(name);
        }
        Ok(())
    }

    fn link_get_linkinfo_attrs(&mut self, name: &str) -> LinkResult<LinkAttrs> {
        Ok(self.show(name)?.attrs)
    }

    fn link_get_kind(&mut self, name: &str) -> LinkResult<Option<String>> {
        Ok(self.show(name)?.kind)
    }

    fn link_cache_get(&self, name: &str, prop: &str) -> Option<String> {
        self.cache.get(name, prop).map(str::to_string)
    }

    fn link_get_details(&mut self, name: &str) -> LinkResult<LinkDetails> {
        self.show(name)
    }
}

fn sysfs_has_link(root: &Path, name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && root.join(name).exists()
}

/// Parse the output of `ip -d -j link show dev <name>`
///
/// Tunnel endpoints are renamed to the interfaces-file vocabulary:
/// `remote` becomes `endpoint` and the lower device becomes
/// `tunnel-physdev`. `ip6tnl` reports its hop limit as `ttl` on recent
/// iproute2 and as `hoplimit` on older releases; both map to `ttl`. Its
/// `proto` is kept so `ipip6` and `ip6ip6` can be told apart.
pub fn parse_link_show(cmd: &str, name: &str, output: &str) -> LinkResult<LinkDetails> {
    let links: Vec<IpLink> =
        serde_json::from_str(output).map_err(|e| LinkError::parse(cmd, e.to_string()))?;

    let link = links
        .into_iter()
        .find(|l| l.ifname == name)
        .ok_or_else(|| LinkError::not_found(name))?;

    let mut details = LinkDetails::default();
    let Some(info) = link.linkinfo else {
        return Ok(details);
    };
    details.kind = info.info_kind;

    if let Some(data) = info.info_data {
        for (key, value) in data {
            let attr = match key.as_str() {
                "local" => linkinfo::LOCAL,
                "remote" => linkinfo::ENDPOINT,
                "ttl" | "hoplimit" => linkinfo::TTL,
                "proto" => linkinfo::PROTO,
                _ => continue,
            };
            if let Some(value) = scalar_to_string(&value) {
                details.attrs.insert(attr.to_string(), value);
            }
        }
    }

    if !details.attrs.is_empty() {
        if let Some(lower) = link.link.filter(|l| !l.is_empty()) {
            details.attrs.insert(linkinfo::PHYSDEV.to_string(), lower);
        }
    }

    debug!(
        "link {}: kind={:?} attrs={:?}",
        name, details.kind, details.attrs
    );
    Ok(details)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GRE_JSON: &str = r#"[{"ifindex":7,"link":"eth1","ifname":"gre0","flags":["POINTOPOINT","NOARP"],"mtu":1476,
        "linkinfo":{"info_kind":"gre","info_data":{"remote":"10.0.0.2","local":"10.0.0.1","ttl":64,"pmtudisc":true}}}]"#;

    const IP6TNL_JSON: &str = r#"[{"ifindex":9,"ifname":"t6","linkinfo":{"info_kind":"ip6tnl",
        "info_data":{"proto":"ipip6","remote":"2001:db8::2","local":"2001:db8::1","encap_limit":4,"hoplimit":64}}}]"#;

    const DUMMY_JSON: &str = r#"[{"ifindex":3,"ifname":"dummy0","linkinfo":{"info_kind":"dummy"}}]"#;

    const PLAIN_JSON: &str = r#"[{"ifindex":2,"ifname":"eth1","mtu":1500}]"#;

    fn attrs(pairs: &[(&str, &str)]) -> LinkAttrs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_gre() {
        let details = parse_link_show("ip", "gre0", GRE_JSON).unwrap();
        assert_eq!(details.kind.as_deref(), Some("gre"));
        assert_eq!(
            details.attrs,
            attrs(&[
                ("local", "10.0.0.1"),
                ("endpoint", "10.0.0.2"),
                ("ttl", "64"),
                ("tunnel-physdev", "eth1"),
            ])
        );
    }

    #[test]
    fn test_parse_ip6tnl_hoplimit() {
        let details = parse_link_show("ip", "t6", IP6TNL_JSON).unwrap();
        assert_eq!(details.kind.as_deref(), Some("ip6tnl"));
        assert_eq!(details.attrs.get("ttl").map(String::as_str), Some("64"));
        assert_eq!(
            details.attrs.get("endpoint").map(String::as_str),
            Some("2001:db8::2")
        );
        assert_eq!(details.attrs.get("proto").map(String::as_str), Some("ipip6"));
    }

    #[test]
    fn test_parse_without_info_data() {
        let details = parse_link_show("ip", "dummy0", DUMMY_JSON).unwrap();
        assert_eq!(details.kind.as_deref(), Some("dummy"));
        assert!(details.attrs.is_empty());

        let details = parse_link_show("ip", "eth1", PLAIN_JSON).unwrap();
        assert_eq!(details, LinkDetails::default());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_link_show("ip", "gre0", "not json"),
            Err(LinkError::Parse { .. })
        ));
        assert!(matches!(
            parse_link_show("ip", "gre1", GRE_JSON),
            Err(LinkError::NotFound { .. })
        ));
    }

    #[test]
    fn test_show_refreshes_cache() {
        let mut link = IpRoute2::new_mock(AddonFlags::default())
            .with_output(build_link_show_cmd("gre0"), GRE_JSON);

        assert_eq!(link.link_cache_get("gre0", PROP_KIND), None);
        assert_eq!(link.link_get_kind("gre0").unwrap().as_deref(), Some("gre"));
        assert_eq!(
            link.link_cache_get("gre0", PROP_KIND).as_deref(),
            Some("gre")
        );
    }

    #[test]
    fn test_kindless_dump_keeps_cached_kind() {
        let kindless = r#"[{"ifindex":7,"ifname":"gre0",
            "linkinfo":{"info_data":{"local":"10.0.0.1","remote":"10.0.0.2"}}}]"#;
        let mut link = IpRoute2::new_mock(AddonFlags::default())
            .with_output(build_link_show_cmd("gre0"), kindless);
        link.cache.set("gre0", PROP_KIND, "gre".to_string());

        assert_eq!(link.link_get_kind("gre0").unwrap(), None);
        assert_eq!(
            link.link_cache_get("gre0", PROP_KIND).as_deref(),
            Some("gre")
        );
    }

    #[test]
    fn test_details_read_in_one_dump() {
        let mut link = IpRoute2::new_mock(AddonFlags::default())
            .with_output(build_link_show_cmd("gre0"), GRE_JSON);

        let details = link.link_get_details("gre0").unwrap();
        assert_eq!(details.kind.as_deref(), Some("gre"));
        assert_eq!(details.attrs.get("ttl").map(String::as_str), Some("64"));
        assert_eq!(link.captured_commands(), &[build_link_show_cmd("gre0")]);
    }

    #[test]
    fn test_create_and_delete_commands() {
        let mut link = IpRoute2::new_mock(AddonFlags::default());
        let params = vec![
            ("local".to_string(), "10.0.0.1".to_string()),
            ("remote".to_string(), "10.0.0.2".to_string()),
        ];

        link.tunnel_create("gre0", "gre", &params).unwrap();
        assert!(!link.cache().contains("gre0"));

        link.link_delete("gre0").unwrap();
        assert!(!link.cache().contains("gre0"));

        let cmds = link.captured_commands();
        assert_eq!(cmds.len(), 2);
        assert!(cmds[0].contains("ip tunnel add \"gre0\" mode \"gre\""));
        assert!(cmds[1].contains("ip link del \"gre0\""));
    }

    #[test]
    fn test_dry_run_skips_mutations() {
        let mut link = IpRoute2::new_mock(AddonFlags::default().with_dryrun(true));

        link.tunnel_create("gre0", "gre", &Vec::new()).unwrap();
        link.link_delete("gre0").unwrap();

        assert!(link.captured_commands().is_empty());
        assert!(!link.cache().contains("gre0"));
    }

    #[test]
    fn test_link_exists_uses_sysfs() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("gre0")).unwrap();

        let mut link = IpRoute2::new(AddonFlags::default()).with_sysfs_root(root.path());
        assert!(link.link_exists("gre0").unwrap());
        assert!(!link.link_exists("gre1").unwrap());
        assert!(!link.link_exists("../gre0").unwrap());
        assert!(!link.link_exists("").unwrap());
    }
}
