//! IFC schema versions and version sets

use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported IFC schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IfcSchemaVersion {
    #[serde(rename = "IFC2X3")]
    Ifc2x3,
    #[serde(rename = "IFC4")]
    Ifc4,
    #[serde(rename = "IFC4X3")]
    Ifc4x3,
}

impl IfcSchemaVersion {
    /// Every supported version, oldest first
    pub const ALL: [Self; 3] = [Self::Ifc2x3, Self::Ifc4, Self::Ifc4x3];

    /// Parse a version token as written in an IDS `ifcVersion` attribute.
    ///
    /// Accepts the addendum spellings of IFC4X3 (`IFC4X3_ADD2`, ...).
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let upper = token.trim().to_ascii_uppercase();
        match upper.as_str() {
            "IFC2X3" => Some(Self::Ifc2x3),
            "IFC4" => Some(Self::Ifc4),
            "IFC4X3" => Some(Self::Ifc4x3),
            other if other.starts_with("IFC4X3_ADD") => Some(Self::Ifc4x3),
            _ => None,
        }
    }

    /// Canonical upper-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ifc2x3 => "IFC2X3",
            Self::Ifc4 => "IFC4",
            Self::Ifc4x3 => "IFC4X3",
        }
    }

    /// Versions before IFC4 use `IfcObject` as the left side of property relations
    #[must_use]
    pub fn is_pre_ifc4(self) -> bool {
        self == Self::Ifc2x3
    }

    fn bit(self) -> u8 {
        match self {
            Self::Ifc2x3 => 1,
            Self::Ifc4 => 2,
            Self::Ifc4x3 => 4,
        }
    }
}

impl fmt::Display for IfcSchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of IFC schema versions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IfcSchemaVersions(u8);

impl IfcSchemaVersions {
    /// The empty set
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every supported version
    #[must_use]
    pub fn all() -> Self {
        IfcSchemaVersion::ALL.into_iter().collect()
    }

    /// A set holding a single version
    #[must_use]
    pub fn single(version: IfcSchemaVersion) -> Self {
        Self(version.bit())
    }

    /// Add a version
    pub fn insert(&mut self, version: IfcSchemaVersion) {
        self.0 |= version.bit();
    }

    #[must_use]
    pub fn contains(self, version: IfcSchemaVersion) -> bool {
        self.0 & version.bit() != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the versions in the set, oldest first
    pub fn iter(self) -> impl Iterator<Item = IfcSchemaVersion> {
        IfcSchemaVersion::ALL
            .into_iter()
            .filter(move |v| self.contains(*v))
    }

    /// Parse a whitespace separated `ifcVersion` list.
    ///
    /// Returns the recognised versions and the tokens that could not be parsed.
    #[must_use]
    pub fn parse_list(list: &str) -> (Self, Vec<String>) {
        let mut versions = Self::empty();
        let mut unknown = Vec::new();
        for token in list.split_whitespace() {
            match IfcSchemaVersion::parse(token) {
                Some(v) => versions.insert(v),
                None => unknown.push(token.to_string()),
            }
        }
        (versions, unknown)
    }
}

impl FromIterator<IfcSchemaVersion> for IfcSchemaVersions {
    fn from_iter<I: IntoIterator<Item = IfcSchemaVersion>>(iter: I) -> Self {
        let mut set = Self::empty();
        for v in iter {
            set.insert(v);
        }
        set
    }
}

impl fmt::Display for IfcSchemaVersions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(IfcSchemaVersion::as_str).collect();
        f.write_str(&names.join(", "))
    }
}
