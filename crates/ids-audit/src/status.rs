//! Aggregated audit status flags

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bit-flag result of an audit.
///
/// Flags are only ever combined with `|`; an audit never clears a flag it has set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AuditStatus(u32);

impl AuditStatus {
    pub const OK: Self = Self(0);
    pub const NOT_IMPLEMENTED: Self = Self(1);
    pub const INVALID_OPTIONS: Self = Self(2);
    pub const NOT_FOUND: Self = Self(4);
    pub const STRUCTURE_ERROR: Self = Self(8);
    pub const CONTENT_ERROR: Self = Self(16);
    pub const XSD_SCHEMA_ERROR: Self = Self(32);
    pub const UNHANDLED_ERROR: Self = Self(64);
    pub const STRUCTURE_WARNING: Self = Self(128);

    const NAMES: [(Self, &'static str); 8] = [
        (Self::NOT_IMPLEMENTED, "NotImplemented"),
        (Self::INVALID_OPTIONS, "InvalidOptions"),
        (Self::NOT_FOUND, "NotFound"),
        (Self::STRUCTURE_ERROR, "StructureError"),
        (Self::CONTENT_ERROR, "ContentError"),
        (Self::XSD_SCHEMA_ERROR, "XsdSchemaError"),
        (Self::UNHANDLED_ERROR, "UnhandledError"),
        (Self::STRUCTURE_WARNING, "StructureWarning"),
    ];

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Whether every flag of `other` is set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the set flags, lowest bit first
    #[must_use]
    pub fn flag_names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }

    /// Process exit code carrying the flags
    #[must_use]
    pub fn exit_code(self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl BitOr for AuditStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AuditStatus {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl FromIterator<AuditStatus> for AuditStatus {
    fn from_iter<I: IntoIterator<Item = AuditStatus>>(iter: I) -> Self {
        iter.into_iter().fold(Self::OK, BitOr::bitor)
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("Ok");
        }
        f.write_str(&self.flag_names().join(" | "))
    }
}
