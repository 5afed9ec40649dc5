//! Attribute mapping from interfaces-file names to `ip` parameters

use ifupdown_addon_common::{FieldValues, LinkParams};

use crate::attrs::ATTR_MAP;
use crate::types::TunnelSpec;

/// Set attributes of a spec under both naming schemes
///
/// `attrs` and `params` are parallel: entry `i` of each carries the same
/// value. Unset optional attributes appear in neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedAttrs {
    /// Keyed by interfaces-file attribute name
    pub attrs: FieldValues,
    /// Keyed by `ip` parameter name
    pub params: LinkParams,
}

/// Map every set attribute of `spec` (except `mode`)
pub fn map_attrs(spec: &TunnelSpec) -> MappedAttrs {
    let mut mapped = MappedAttrs::default();
    for (attr, param) in ATTR_MAP {
        if let Some(value) = spec.attr_value(attr) {
            mapped.attrs.push((attr.to_string(), value.clone()));
            mapped.params.push((param.to_string(), value));
        }
    }
    mapped
}
