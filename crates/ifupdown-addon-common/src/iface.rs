//! Interface configuration objects.
//!
//! [`InterfaceConfig`] is one parsed `iface` stanza. [`CurrentState`] is the
//! sink addons fill in while answering `query-checkcurr`: for every
//! attribute it records what the kernel reports and whether that matches
//! the configuration.

use serde::Serialize;
use std::collections::BTreeMap;

/// Key-value tuple representing an attribute and its value.
pub type FieldValue = (String, String);

/// Ordered attribute list of an interface. An attribute may repeat.
pub type FieldValues = Vec<FieldValue>;

/// Lookup helpers for field-value collections.
pub trait FieldValuesExt {
    /// Gets the first value for a field, if present.
    fn get_field(&self, field: &str) -> Option<&str>;
}

impl FieldValuesExt for FieldValues {
    fn get_field(&self, field: &str) -> Option<&str> {
        self.iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }
}

/// Builds a FieldValues collection from key-value pairs.
#[macro_export]
macro_rules! field_values {
    ($($field:expr => $value:expr),* $(,)?) => {
        vec![
            $(($field.to_string(), $value.to_string()),)*
        ]
    };
}

/// One `iface` stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfig {
    /// Interface name.
    pub name: String,
    /// Address family (`inet`, `inet6`), if given.
    pub addr_family: Option<String>,
    /// Addressing method (`static`, `dhcp`, `tunnel`, ...), if given.
    pub addr_method: Option<String>,
    /// Attributes in file order.
    pub attrs: FieldValues,
}

impl InterfaceConfig {
    /// Creates an interface with no family, method or attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr_family: None,
            addr_method: None,
            attrs: Vec::new(),
        }
    }

    /// Sets family and method (builder pattern).
    pub fn with_method(mut self, family: impl Into<String>, method: impl Into<String>) -> Self {
        self.addr_family = Some(family.into());
        self.addr_method = Some(method.into());
        self
    }

    /// Appends an attribute (builder pattern).
    pub fn with_attr(mut self, attr: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((attr.into(), value.into()));
        self
    }

    /// First value of `attr`, treating an empty value as unset.
    pub fn get_attr_value_first(&self, attr: &str) -> Option<&str> {
        self.attrs.get_field(attr).filter(|v| !v.is_empty())
    }

    /// Returns true if the addressing method equals `method`.
    pub fn has_method(&self, method: &str) -> bool {
        self.addr_method.as_deref() == Some(method)
    }
}

/// Result of comparing one configured attribute with the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrStatus {
    /// Running value equals the configured value.
    Match,
    /// Running value differs or is missing on an existing interface.
    Mismatch,
    /// The interface itself does not exist.
    Absent,
    /// The kernel did not report any attributes to compare against.
    Unknown,
}

impl AttrStatus {
    /// Numeric status as used by ifquery (0 = pass, 1 = fail, -1 = unknown).
    pub fn code(&self) -> i32 {
        match self {
            AttrStatus::Match => 0,
            AttrStatus::Mismatch | AttrStatus::Absent => 1,
            AttrStatus::Unknown => -1,
        }
    }

    /// Short label for text output.
    pub fn label(&self) -> &'static str {
        match self {
            AttrStatus::Match => "ok",
            AttrStatus::Mismatch | AttrStatus::Absent => "fail",
            AttrStatus::Unknown => "unknown",
        }
    }
}

/// Running value and status for one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttrCheck {
    /// For a match the configured value, otherwise what the kernel reported.
    pub value: Option<String>,
    pub status: AttrStatus,
}

/// Collected running state of one interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentState {
    name: String,
    checks: Vec<(String, AttrCheck)>,
}

/// Serialized form of [`CurrentState`], shaped like `ifquery -c -o json`.
#[derive(Debug, Serialize)]
pub struct CurrentStateRecord<'a> {
    pub name: &'a str,
    pub config: BTreeMap<&'a str, Option<&'a str>>,
    pub config_status: BTreeMap<&'a str, AttrStatus>,
}

impl CurrentState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            checks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records (or overwrites) the result for `attr`.
    pub fn update_with_status(&mut self, attr: &str, value: Option<&str>, status: AttrStatus) {
        let check = AttrCheck {
            value: value.map(str::to_string),
            status,
        };
        match self.checks.iter_mut().find(|(a, _)| a == attr) {
            Some((_, existing)) => *existing = check,
            None => self.checks.push((attr.to_string(), check)),
        }
    }

    /// Records `status` with the given value for every entry of `values`.
    pub fn update_many_with_status(&mut self, values: &FieldValues, status: AttrStatus) {
        for (attr, value) in values {
            self.update_with_status(attr, Some(value.as_str()), status);
        }
    }

    pub fn get(&self, attr: &str) -> Option<&AttrCheck> {
        self.checks.iter().find(|(a, _)| a == attr).map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrCheck)> {
        self.checks.iter().map(|(a, c)| (a.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// True if every recorded attribute matched.
    pub fn all_match(&self) -> bool {
        self.checks
            .iter()
            .all(|(_, c)| c.status == AttrStatus::Match)
    }

    pub fn to_record(&self) -> CurrentStateRecord<'_> {
        CurrentStateRecord {
            name: &self.name,
            config: self
                .checks
                .iter()
                .map(|(a, c)| (a.as_str(), c.value.as_deref()))
                .collect(),
            config_status: self
                .checks
                .iter()
                .map(|(a, c)| (a.as_str(), c.status))
                .collect(),
        }
    }
}
