//! Element name to facet factory table

use super::{
    AssociationFacet, AttributeFacet, CollectionFacet, EntityFacet, EnumerationFacet, Facet, LengthFacet,
    PartOfFacet, PatternFacet, PropertyFacet, RestrictionFacet, SimpleValueFacet, SpecificationFacet,
    TotalDigitsFacet, ValueFacet,
};
use ids_ir::Attributes;
use ids_schema::AssociationKind;
use tracing::trace;

/// Builds the payload of a freshly opened element from its attributes
pub type FacetFactory = fn(&Attributes) -> Facet;

/// Registered element names; anything else becomes [`Facet::Generic`]
pub static FACTORIES: &[(&str, FacetFactory)] = &[
    ("specification", |a| Facet::Specification(SpecificationFacet::new(a))),
    ("applicability", |_| Facet::Collection(CollectionFacet::applicability())),
    ("requirements", |_| Facet::Collection(CollectionFacet::requirements())),
    ("entity", |a| Facet::Entity(EntityFacet::new(a))),
    ("attribute", |a| Facet::Attribute(AttributeFacet::new(a))),
    ("property", |a| Facet::Property(PropertyFacet::new(a))),
    ("classification", |a| {
        Facet::Association(AssociationFacet::new(AssociationKind::Classification, a))
    }),
    ("material", |a| Facet::Association(AssociationFacet::new(AssociationKind::Material, a))),
    ("partOf", |a| Facet::PartOf(PartOfFacet::new(a))),
    ("name", |_| Facet::Value(ValueFacet::default())),
    ("predefinedType", |_| Facet::Value(ValueFacet::default())),
    ("value", |_| Facet::Value(ValueFacet::default())),
    ("propertySet", |_| Facet::Value(ValueFacet::default())),
    ("baseName", |_| Facet::Value(ValueFacet::default())),
    ("system", |_| Facet::Value(ValueFacet::default())),
    ("simpleValue", |_| Facet::SimpleValue(SimpleValueFacet)),
    ("restriction", |a| Facet::Restriction(RestrictionFacet::new(a))),
    ("enumeration", |a| Facet::Enumeration(EnumerationFacet::new(a))),
    ("pattern", |a| Facet::Pattern(PatternFacet::new(a))),
    ("length", |a| Facet::Length(LengthFacet::exact(a))),
    ("minLength", |a| Facet::Length(LengthFacet::min(a))),
    ("maxLength", |a| Facet::Length(LengthFacet::max(a))),
    ("totalDigits", |a| Facet::TotalDigits(TotalDigitsFacet::new(a))),
];

/// Look up the factory registered for `kind`
#[must_use]
pub fn factory(kind: &str) -> Option<FacetFactory> {
    FACTORIES.iter().find(|(name, _)| *name == kind).map(|(_, f)| *f)
}

/// Build the payload for an element
#[must_use]
pub fn build(kind: &str, attributes: &Attributes) -> Facet {
    let facet = factory(kind).map_or(Facet::Generic, |f| f(attributes));
    trace!(kind, generic = matches!(facet, Facet::Generic), "built facet");
    facet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_names_are_unique() {
        let mut names: Vec<&str> = FACTORIES.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_build_dispatch() {
        let attrs = Attributes::new();
        assert!(matches!(build("entity", &attrs), Facet::Entity(_)));
        assert!(matches!(build("material", &attrs), Facet::Association(_)));
        assert!(matches!(build("maxLength", &attrs), Facet::Length(_)));
        assert!(matches!(build("info", &attrs), Facet::Generic));
        assert!(matches!(build("Entity", &attrs), Facet::Generic));
    }
}
