//! Loader for `interfaces(5)` style configuration files.
//!
//! ```text
//! auto gre0
//! iface gre0 inet tunnel
//!     mode gre
//!     local 10.0.0.1
//!     endpoint 10.0.0.2
//!     ttl 64
//! ```
//!
//! Only the subset addons need is understood: `iface` stanzas and their
//! attribute lines. `auto`, `allow-*` and `source` lines are accepted and
//! ignored, as are `mapping` blocks. Lines are classified by their first
//! word; indentation is not significant, so an attribute line may start in
//! the first column.

use std::fs;
use std::path::Path;

use crate::error::{AddonError, AddonResult};
use crate::iface::InterfaceConfig;

/// Default location of the interfaces file.
pub const DEFAULT_INTERFACES_FILE: &str = "/etc/network/interfaces";

/// Reads and parses an interfaces file.
pub fn load_interfaces(path: impl AsRef<Path>) -> AddonResult<Vec<InterfaceConfig>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| AddonError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_interfaces(&text)
}

/// Parses interfaces file text into stanzas, in file order.
///
/// A second stanza for an already seen name merges its attributes into
/// the first one.
pub fn parse_interfaces(text: &str) -> AddonResult<Vec<InterfaceConfig>> {
    let mut ifaces: Vec<InterfaceConfig> = Vec::new();
    let mut current: Option<usize> = None;
    // Inside a `mapping` block, whose body lines are not attributes
    let mut in_mapping = false;

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        if line.trim().is_empty() {
            continue;
        }

        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            continue;
        };

        if is_stanza_keyword(keyword) {
            match keyword {
                "iface" => {
                    let name = words.next().ok_or_else(|| {
                        AddonError::config_parse(lineno, "iface without interface name")
                    })?;
                    let family = words.next();
                    let method = words.next();

                    let pos = match ifaces.iter().position(|i| i.name == name) {
                        Some(pos) => pos,
                        None => {
                            ifaces.push(InterfaceConfig::new(name));
                            ifaces.len() - 1
                        }
                    };
                    let iface = &mut ifaces[pos];
                    if let (Some(family), Some(method)) = (family, method) {
                        iface.addr_family = Some(family.to_string());
                        iface.addr_method = Some(method.to_string());
                    }
                    current = Some(pos);
                    in_mapping = false;
                }
                "mapping" => {
                    current = None;
                    in_mapping = true;
                }
                _ => {
                    current = None;
                    in_mapping = false;
                }
            }
            continue;
        }
        if in_mapping {
            continue;
        }

        let pos = current.ok_or_else(|| {
            AddonError::config_parse(
                lineno,
                format!("'{}' outside of an iface stanza", keyword),
            )
        })?;
        let value = words.collect::<Vec<_>>().join(" ");
        ifaces[pos].attrs.push((keyword.to_string(), value));
    }

    Ok(ifaces)
}

/// Keywords that open or close a stanza
fn is_stanza_keyword(word: &str) -> bool {
    matches!(
        word,
        "iface" | "auto" | "mapping" | "source" | "source-directory"
    ) || word.starts_with("allow-")
}
