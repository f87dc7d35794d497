//! Type-constraint algebra
//!
//! A [`TypeConstraint`] stands for "the concrete IFC classes compatible with a
//! facet". An absent constraint (`None`) never narrows; a present but empty one
//! means no class can satisfy the facet.

use crate::version::{IfcSchemaVersion, IfcSchemaVersions};
use std::collections::BTreeSet;
use std::fmt;

/// Source of concrete class closures, one schema version at a time
pub trait ConcreteClassCatalog {
    /// Upper-case names of `class` (if concrete) and its concrete descendants in
    /// `version`; `None` when the class or the version is unknown
    fn concrete_classes(&self, version: IfcSchemaVersion, class: &str) -> Option<BTreeSet<String>>;
}

/// The set of concrete classes compatible with a facet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeConstraint {
    /// A materialized set of upper-case class names
    Explicit(BTreeSet<String>),
    /// Every concrete class under `top`, in all of `versions`
    Rooted {
        top: Option<String>,
        versions: IfcSchemaVersions,
    },
}

impl TypeConstraint {
    /// Explicit constraint from class names in any case
    pub fn explicit<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Explicit(
            names
                .into_iter()
                .map(|n| n.as_ref().to_ascii_uppercase())
                .collect(),
        )
    }

    /// Constraint rooted at `top` and resolved lazily against `versions`
    #[must_use]
    pub fn rooted(top: impl Into<String>, versions: IfcSchemaVersions) -> Self {
        Self::Rooted {
            top: Some(top.into()),
            versions,
        }
    }

    /// Whether the constraint is known to admit no class.
    ///
    /// A rooted constraint only counts as empty when it has no top class or no
    /// versions; a top class without concrete descendants is detected on resolution.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Explicit(names) => names.is_empty(),
            Self::Rooted { top, versions } => top.is_none() || versions.is_empty(),
        }
    }

    /// Materialize the class set.
    ///
    /// A rooted constraint resolves to the intersection, across its versions, of
    /// the root's concrete closure in each version.
    pub fn resolve<C: ConcreteClassCatalog + ?Sized>(&self, catalog: &C) -> BTreeSet<String> {
        match self {
            Self::Explicit(names) => names.clone(),
            Self::Rooted { top: None, .. } => BTreeSet::new(),
            Self::Rooted {
                top: Some(top),
                versions,
            } => {
                let mut result: Option<BTreeSet<String>> = None;
                for version in versions.iter() {
                    let classes = catalog.concrete_classes(version, top).unwrap_or_default();
                    result = Some(match result {
                        None => classes,
                        Some(acc) => acc.intersection(&classes).cloned().collect(),
                    });
                    if result.as_ref().is_some_and(BTreeSet::is_empty) {
                        break;
                    }
                }
                result.unwrap_or_default()
            }
        }
    }

    /// Intersect two present constraints
    #[must_use]
    pub fn intersect_with<C: ConcreteClassCatalog + ?Sized>(&self, other: &Self, catalog: &C) -> Self {
        if self == other {
            return self.clone();
        }
        let left = self.resolve(catalog);
        if left.is_empty() {
            return Self::Explicit(left);
        }
        let right = other.resolve(catalog);
        Self::Explicit(left.intersection(&right).cloned().collect())
    }
}

/// Intersect two optional constraints; absence never narrows
pub fn intersect<C: ConcreteClassCatalog + ?Sized>(
    a: Option<&TypeConstraint>,
    b: Option<&TypeConstraint>,
    catalog: &C,
) -> Option<TypeConstraint> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (Some(x), Some(y)) => Some(x.intersect_with(y, catalog)),
    }
}

/// Fold optional constraints with [`intersect`], stopping at the first empty result
pub fn intersect_all<'a, C, I>(constraints: I, catalog: &C) -> Option<TypeConstraint>
where
    C: ConcreteClassCatalog + ?Sized,
    I: IntoIterator<Item = Option<&'a TypeConstraint>>,
{
    let mut acc: Option<TypeConstraint> = None;
    for constraint in constraints {
        acc = intersect(acc.as_ref(), constraint, catalog);
        if acc.as_ref().is_some_and(TypeConstraint::is_empty) {
            break;
        }
    }
    acc
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 5;
        match self {
            Self::Explicit(names) if names.is_empty() => f.write_str("no class"),
            Self::Explicit(names) => {
                let shown: Vec<&str> = names.iter().take(SHOWN).map(String::as_str).collect();
                write!(f, "{}", shown.join(", "))?;
                if names.len() > SHOWN {
                    write!(f, " and {} more", names.len() - SHOWN)?;
                }
                Ok(())
            }
            Self::Rooted { top: Some(top), versions } => {
                write!(f, "concrete subclasses of {top} ({versions})")
            }
            Self::Rooted { top: None, .. } => f.write_str("no class"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockCatalog {
        closures: HashMap<(IfcSchemaVersion, String), BTreeSet<String>>,
    }

    impl MockCatalog {
        fn with(mut self, version: IfcSchemaVersion, class: &str, members: &[&str]) -> Self {
            self.closures.insert(
                (version, class.to_ascii_uppercase()),
                members.iter().map(|m| m.to_ascii_uppercase()).collect(),
            );
            self
        }
    }

    impl ConcreteClassCatalog for MockCatalog {
        fn concrete_classes(&self, version: IfcSchemaVersion, class: &str) -> Option<BTreeSet<String>> {
            self.closures.get(&(version, class.to_ascii_uppercase())).cloned()
        }
    }

    fn catalog() -> MockCatalog {
        MockCatalog::default()
            .with(IfcSchemaVersion::Ifc2x3, "IfcObject", &["IfcWall", "IfcWallStandardCase", "IfcSlab"])
            .with(IfcSchemaVersion::Ifc4, "IfcObject", &["IfcWall", "IfcWallStandardCase", "IfcSlab", "IfcProjectLibrary"])
            .with(IfcSchemaVersion::Ifc4x3, "IfcObject", &["IfcWall", "IfcSlab"])
    }

    fn all() -> IfcSchemaVersions {
        IfcSchemaVersions::all()
    }

    fn samples() -> Vec<TypeConstraint> {
        vec![
            TypeConstraint::explicit(["IfcWall", "IfcSlab"]),
            TypeConstraint::explicit(["ifcwall", "IfcDoor"]),
            TypeConstraint::explicit(["IfcWall", "IfcSlab", "IfcDoor", "IfcBeam"]),
            TypeConstraint::explicit(Vec::<String>::new()),
            TypeConstraint::rooted("IfcObject", all()),
        ]
    }

    #[test]
    fn test_explicit_normalizes_case() {
        let c = TypeConstraint::explicit(["IfcWall", "IFCWALL", "ifcwall"]);
        assert_eq!(c, TypeConstraint::explicit(["IFCWALL"]));
        assert!(c.resolve(&catalog()).contains("IFCWALL"));
    }

    #[test]
    fn test_rooted_resolves_across_versions() {
        let cat = catalog();
        let rooted = TypeConstraint::rooted("IfcObject", all());
        let expected: BTreeSet<String> = ["IFCWALL", "IFCSLAB"].iter().map(|s| (*s).to_string()).collect();
        assert_eq!(rooted.resolve(&cat), expected);

        let ifc4 = TypeConstraint::rooted("IfcObject", IfcSchemaVersions::single(IfcSchemaVersion::Ifc4));
        assert_eq!(ifc4.resolve(&cat).len(), 4);

        let unknown = TypeConstraint::rooted("IfcNothing", all());
        assert!(unknown.resolve(&cat).is_empty());
    }

    #[test]
    fn test_is_empty() {
        assert!(TypeConstraint::explicit(Vec::<String>::new()).is_empty());
        assert!(TypeConstraint::Rooted { top: None, versions: all() }.is_empty());
        assert!(TypeConstraint::rooted("IfcObject", IfcSchemaVersions::empty()).is_empty());
        assert!(!TypeConstraint::rooted("IfcObject", all()).is_empty());
        assert!(!TypeConstraint::explicit(["IfcWall"]).is_empty());
    }

    #[test]
    fn test_absent_is_identity() {
        let cat = catalog();
        for x in samples() {
            assert_eq!(intersect(Some(&x), None, &cat), Some(x.clone()));
            assert_eq!(intersect(None, Some(&x), &cat), Some(x.clone()));
        }
        assert_eq!(intersect(None, None, &cat), None);
    }

    #[test]
    fn test_intersect_is_commutative() {
        let cat = catalog();
        for x in samples() {
            for y in samples() {
                let xy = intersect(Some(&x), Some(&y), &cat).unwrap();
                let yx = intersect(Some(&y), Some(&x), &cat).unwrap();
                assert_eq!(xy.resolve(&cat), yx.resolve(&cat), "{x} ∩ {y}");
            }
        }
    }

    #[test]
    fn test_intersect_is_associative() {
        let cat = catalog();
        for x in samples() {
            for y in samples() {
                for z in samples() {
                    let xy = intersect(Some(&x), Some(&y), &cat);
                    let left = intersect(xy.as_ref(), Some(&z), &cat).unwrap();
                    let yz = intersect(Some(&y), Some(&z), &cat);
                    let right = intersect(Some(&x), yz.as_ref(), &cat).unwrap();
                    assert_eq!(left.resolve(&cat), right.resolve(&cat));
                }
            }
        }
    }

    #[test]
    fn test_empty_propagates() {
        let cat = catalog();
        let empties = [
            TypeConstraint::explicit(Vec::<String>::new()),
            TypeConstraint::Rooted { top: None, versions: all() },
            TypeConstraint::rooted("IfcObject", IfcSchemaVersions::empty()),
        ];
        for empty in &empties {
            for y in samples() {
                assert!(intersect(Some(empty), Some(&y), &cat).unwrap().is_empty());
                assert!(intersect(Some(&y), Some(empty), &cat).unwrap().is_empty());
            }
        }
    }

    #[test]
    fn test_intersect_all_short_circuits() {
        let cat = catalog();
        let wall = TypeConstraint::explicit(["IfcWall"]);
        let slab = TypeConstraint::explicit(["IfcSlab"]);
        let result = intersect_all([None, Some(&wall), Some(&slab), None], &cat).unwrap();
        assert!(result.is_empty());

        assert!(intersect_all([None, None], &cat).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeConstraint::explicit(["IfcWall", "IfcSlab"]).to_string(), "IFCSLAB, IFCWALL");
        assert_eq!(TypeConstraint::explicit(Vec::<String>::new()).to_string(), "no class");
        assert_eq!(
            TypeConstraint::rooted("IfcObject", IfcSchemaVersions::single(IfcSchemaVersion::Ifc4)).to_string(),
            "concrete subclasses of IfcObject (IFC4)"
        );
    }
}
