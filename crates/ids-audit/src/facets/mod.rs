//! Facet payloads and their audits
//!
//! Every node of the document tree carries a [`Facet`]. Facets are built from
//! the element name through the [`registry`] table when the opening tag is seen
//! and audited once the element is closed. Because children close first, an
//! audit can read the final state of every child facet.

pub mod association;
pub mod attribute;
pub mod collection;
pub mod entity;
pub mod part_of;
pub mod property;
pub mod registry;
pub mod restriction;
pub mod specification;
pub mod value;

pub use association::AssociationFacet;
pub use attribute::AttributeFacet;
pub use collection::CollectionFacet;
pub use entity::EntityFacet;
pub use part_of::PartOfFacet;
pub use property::PropertyFacet;
pub use restriction::{EnumerationFacet, LengthFacet, PatternFacet, RestrictionFacet, TotalDigitsFacet};
pub use specification::SpecificationFacet;
pub use value::{SimpleValueFacet, ValueFacet};

use crate::messages::{self, Message};
use crate::reporter::{Diagnostic, DiagnosticSink, Location, Severity};
use crate::status::AuditStatus;
use ids_ir::{Attributes, Node, NodeId, Tree};
use ids_schema::{IfcSchemaVersion, IfcSchemaVersions, SchemaSet, TypeConstraint};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Payload attached to every document node
#[derive(Debug, Clone, Default)]
pub enum Facet {
    Specification(SpecificationFacet),
    Collection(CollectionFacet),
    Entity(EntityFacet),
    Attribute(AttributeFacet),
    Property(PropertyFacet),
    Association(AssociationFacet),
    PartOf(PartOfFacet),
    Value(ValueFacet),
    SimpleValue(SimpleValueFacet),
    Restriction(RestrictionFacet),
    Enumeration(EnumerationFacet),
    Pattern(PatternFacet),
    Length(LengthFacet),
    TotalDigits(TotalDigitsFacet),
    /// Elements with structural meaning only
    #[default]
    Generic,
}

impl Facet {
    /// Run the facet's audit for node `id`
    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        match self {
            Self::Specification(f) => f.audit(id, ctx),
            Self::Collection(f) => f.audit(id, ctx),
            Self::Entity(f) => f.audit(id, ctx),
            Self::Attribute(f) => f.audit(id, ctx),
            Self::Property(f) => f.audit(id, ctx),
            Self::Association(f) => f.audit(id, ctx),
            Self::PartOf(f) => f.audit(id, ctx),
            Self::Value(f) => f.audit(id, ctx),
            Self::Restriction(f) => f.audit(id, ctx),
            Self::Pattern(f) => f.audit(id, ctx),
            Self::Length(f) => f.audit(id, ctx),
            Self::TotalDigits(f) => f.audit(id, ctx),
            Self::SimpleValue(_) | Self::Enumeration(_) | Self::Generic => AuditStatus::OK,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.as_validity().is_none_or(ValidityMarker::is_valid)
    }

    fn as_validity(&self) -> Option<&dyn ValidityMarker> {
        match self {
            Self::Specification(f) => Some(f),
            Self::Collection(f) => Some(f),
            Self::Entity(f) => Some(f),
            Self::Attribute(f) => Some(f),
            Self::Property(f) => Some(f),
            Self::Association(f) => Some(f),
            Self::PartOf(f) => Some(f),
            Self::Value(f) => Some(f),
            Self::Restriction(f) => Some(f),
            Self::Pattern(f) => Some(f),
            Self::Length(f) => Some(f),
            Self::TotalDigits(f) => Some(f),
            Self::SimpleValue(_) | Self::Enumeration(_) | Self::Generic => None,
        }
    }

    /// The facet as a cardinality carrier
    #[must_use]
    pub fn as_cardinality(&self) -> Option<&dyn CardinalityFacet> {
        match self {
            Self::Entity(f) => Some(f),
            Self::Attribute(f) => Some(f),
            Self::Property(f) => Some(f),
            Self::Association(f) => Some(f),
            Self::PartOf(f) => Some(f),
            _ => None,
        }
    }

    /// The facet as a type constraint provider
    #[must_use]
    pub fn as_constraint_provider(&self) -> Option<&dyn TypeConstraintProvider> {
        match self {
            Self::Collection(f) => Some(f),
            Self::Entity(f) => Some(f),
            Self::Attribute(f) => Some(f),
            Self::Property(f) => Some(f),
            Self::Association(f) => Some(f),
            Self::PartOf(f) => Some(f),
            _ => None,
        }
    }

    /// The facet as a string matcher
    #[must_use]
    pub fn as_matcher(&self) -> Option<&dyn StringListMatcher> {
        match self {
            Self::Value(f) => Some(f),
            Self::SimpleValue(f) => Some(f),
            Self::Restriction(f) => Some(f),
            Self::Enumeration(f) => Some(f),
            Self::Pattern(f) => Some(f),
            Self::Length(f) => Some(f),
            Self::TotalDigits(f) => Some(f),
            _ => None,
        }
    }

    /// Type constraint the facet contributes for `version`, if any
    #[must_use]
    pub fn type_constraint(&self, version: IfcSchemaVersion) -> Option<&TypeConstraint> {
        self.as_constraint_provider()?.type_constraint(version)
    }
}

/// Outcome of a facet's own audit
pub trait ValidityMarker {
    fn is_valid(&self) -> bool;
}

/// Facets that narrow the set of compatible IFC classes
pub trait TypeConstraintProvider {
    /// Constraint for `version`; `None` when the facet does not narrow
    fn type_constraint(&self, version: IfcSchemaVersion) -> Option<&TypeConstraint>;
}

/// Facets that select values out of a candidate list
pub trait StringListMatcher {
    /// Subset of `candidates` accepted by the facet at node `id`
    fn matches(
        &self,
        tree: &Tree<Facet>,
        id: NodeId,
        candidates: &BTreeSet<String>,
        case_sensitive: bool,
    ) -> BTreeSet<String>;

    /// Literal values written in the document, if the facet has any
    fn literal_values(&self, tree: &Tree<Facet>, id: NodeId) -> Vec<String> {
        let _ = (tree, id);
        Vec::new()
    }
}

/// Occurrence bounds of a facet or specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub min: u32,
    /// `None` is unbounded
    pub max: Option<u32>,
}

impl Cardinality {
    pub const REQUIRED: Self = Self { min: 1, max: None };
    pub const OPTIONAL: Self = Self { min: 0, max: None };
    pub const PROHIBITED: Self = Self {
        min: 0,
        max: Some(0),
    };

    /// Read `cardinality` or `minOccurs`/`maxOccurs` from element attributes.
    ///
    /// Missing attributes default to one occurrence, unbounded.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, String> {
        if let Some(keyword) = attributes.get("cardinality") {
            return match keyword.trim() {
                "required" => Ok(Self::REQUIRED),
                "optional" => Ok(Self::OPTIONAL),
                "prohibited" => Ok(Self::PROHIBITED),
                other => Err(format!("unknown cardinality '{other}'")),
            };
        }
        Self::from_occurs(attributes)
    }

    /// Read `minOccurs`/`maxOccurs` only
    pub fn from_occurs(attributes: &Attributes) -> Result<Self, String> {
        let min = match attributes.get("minOccurs") {
            None => 1,
            Some(text) => text
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("minOccurs '{text}' is not a non-negative integer"))?,
        };
        let max = match attributes.get("maxOccurs").map(str::trim) {
            None | Some("unbounded") => None,
            Some(text) => Some(
                text.parse::<u32>()
                    .map_err(|_| format!("maxOccurs '{text}' is not a non-negative integer"))?,
            ),
        };
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn is_required(self) -> bool {
        self.min > 0
    }

    #[must_use]
    pub fn is_optional(self) -> bool {
        self == Self::OPTIONAL
    }

    /// Whether `max` is not below `min`
    #[must_use]
    pub fn is_consistent(self) -> bool {
        self.max.is_none_or(|max| max >= self.min)
    }

    /// Whether this is one of the required, optional or prohibited forms
    #[must_use]
    pub fn is_facet_form(self) -> bool {
        matches!(self, Self::REQUIRED | Self::OPTIONAL | Self::PROHIBITED)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{max}", self.min),
            None => write!(f, "{}..unbounded", self.min),
        }
    }
}

/// Facets with occurrence bounds
pub trait CardinalityFacet {
    /// Parsed bounds, or the reason they could not be read
    fn cardinality(&self) -> Result<Cardinality, &str>;

    /// Whether the facet narrows the specification; unreadable bounds count as required
    fn is_required(&self) -> bool {
        self.cardinality().map_or(true, Cardinality::is_required)
    }

    /// Check the bounds are one of the accepted facet forms
    fn audit_cardinality(&self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        match self.cardinality() {
            Ok(c) if !c.is_consistent() => ctx.error(
                id,
                messages::invalid_cardinality(format!("maximum below minimum in {c}")),
            ),
            Ok(c) if !c.is_facet_form() => ctx.error(
                id,
                messages::invalid_cardinality(format!(
                    "{c} is not one of required, optional or prohibited"
                )),
            ),
            Ok(_) => AuditStatus::OK,
            Err(detail) => ctx.error(id, messages::invalid_cardinality(detail)),
        }
    }
}

/// State shared by the facets that sit directly in applicability or requirements
#[derive(Debug, Clone)]
pub struct FacetState {
    pub valid: bool,
    pub cardinality: Result<Cardinality, String>,
    /// Per-version constraint, filled by the audit
    pub constraints: BTreeMap<IfcSchemaVersion, TypeConstraint>,
}

impl FacetState {
    #[must_use]
    pub fn new(attributes: &Attributes) -> Self {
        Self {
            valid: true,
            cardinality: Cardinality::from_attributes(attributes),
            constraints: BTreeMap::new(),
        }
    }

    fn cardinality(&self) -> Result<Cardinality, &str> {
        self.cardinality.as_ref().copied().map_err(String::as_str)
    }

    fn is_required(&self) -> bool {
        self.cardinality().map_or(true, Cardinality::is_required)
    }

    /// Constraint for `version`, withheld when the facet is not required
    fn type_constraint(&self, version: IfcSchemaVersion) -> Option<&TypeConstraint> {
        if self.is_required() {
            self.constraints.get(&version)
        } else {
            None
        }
    }

    /// Record `status` as the audit outcome and hand it back
    fn finish(&mut self, status: AuditStatus) -> AuditStatus {
        self.valid = status.is_ok();
        status
    }

    /// Reject an optional facet that carries no `value` child
    fn audit_optional_value(&self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let optional = self.cardinality().is_ok_and(Cardinality::is_optional);
        if optional && ctx.tree.first_child_of_kind(id, "value").is_none() {
            let kind = ctx.tree[id].kind.clone();
            return ctx.error(id, messages::optional_without_value(&kind));
        }
        AuditStatus::OK
    }
}

macro_rules! facet_state_traits {
    ($($facet:ty),+) => {
        $(
            impl ValidityMarker for $facet {
                fn is_valid(&self) -> bool {
                    self.state.valid
                }
            }

            impl CardinalityFacet for $facet {
                fn cardinality(&self) -> Result<Cardinality, &str> {
                    self.state.cardinality()
                }
            }

            impl TypeConstraintProvider for $facet {
                fn type_constraint(&self, version: IfcSchemaVersion) -> Option<&TypeConstraint> {
                    self.state.type_constraint(version)
                }
            }
        )+
    };
}

facet_state_traits!(EntityFacet, AttributeFacet, PropertyFacet, AssociationFacet, PartOfFacet);

/// Everything a facet audit may read, plus the diagnostic sink
pub struct AuditContext<'a> {
    pub tree: &'a Tree<Facet>,
    pub schemas: &'a SchemaSet,
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a> AuditContext<'a> {
    pub fn new(tree: &'a Tree<Facet>, schemas: &'a SchemaSet, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self { tree, schemas, sink }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node<Facet> {
        &self.tree[id]
    }

    /// Location of node `id` for diagnostics
    #[must_use]
    pub fn location(&self, id: NodeId) -> Location {
        let node = &self.tree[id];
        Location {
            path: self.tree.positional_path(id),
            line: node.position.line,
            column: node.position.column,
            kind: node.kind.clone(),
        }
    }

    fn report(&mut self, id: NodeId, message: Message, status: AuditStatus) -> AuditStatus {
        let location = self.location(id);
        self.sink.report(Diagnostic {
            code: message.code,
            severity: Severity::Error,
            message: message.text,
            location: Some(location),
        });
        status
    }

    /// Report a content error on node `id`
    pub fn error(&mut self, id: NodeId, message: Message) -> AuditStatus {
        self.report(id, message, AuditStatus::CONTENT_ERROR)
    }

    /// Report a scenario the audit cannot handle
    pub fn not_implemented(&mut self, id: NodeId, message: Message) -> AuditStatus {
        self.report(id, message, AuditStatus::NOT_IMPLEMENTED)
    }

    /// IFC versions required by the specification enclosing `id`
    #[must_use]
    pub fn versions(&self, id: NodeId) -> Option<IfcSchemaVersions> {
        let spec = self.tree.find_nearest_ancestor_of_kind(id, "specification")?;
        match &self.tree[spec].payload {
            Facet::Specification(s) => Some(s.versions()),
            _ => None,
        }
    }

    /// Versions for `id`, or a not-implemented report when there is no specification
    pub fn require_versions(&mut self, id: NodeId) -> Result<IfcSchemaVersions, AuditStatus> {
        if let Some(versions) = self.versions(id) {
            return Ok(versions);
        }
        let kind = self.tree[id].kind.clone();
        Err(self.not_implemented(id, messages::outside_specification(&kind)))
    }

    /// Run the matcher at `holder` (or its value child) against `candidates`
    #[must_use]
    pub fn match_values(
        &self,
        holder: NodeId,
        candidates: &BTreeSet<String>,
        case_sensitive: bool,
    ) -> BTreeSet<String> {
        self.tree[holder]
            .payload
            .as_matcher()
            .map(|m| m.matches(self.tree, holder, candidates, case_sensitive))
            .unwrap_or_default()
    }

    /// Literal values written under `holder`
    #[must_use]
    pub fn literal_values(&self, holder: NodeId) -> Vec<String> {
        self.tree[holder]
            .payload
            .as_matcher()
            .map(|m| m.literal_values(self.tree, holder))
            .unwrap_or_default()
    }
}

/// Classes concrete in every one of `versions`, kept from `classes`
fn concrete_in_all(schemas: &SchemaSet, versions: IfcSchemaVersions, classes: BTreeSet<String>) -> BTreeSet<String> {
    classes
        .into_iter()
        .filter(|name| {
            versions.iter().all(|v| {
                schemas
                    .get(v)
                    .and_then(|m| m.class(name))
                    .is_some_and(ids_schema::ClassInfo::is_concrete)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_cardinality_keywords() {
        assert_eq!(
            Cardinality::from_attributes(&attrs(&[("cardinality", "required")])),
            Ok(Cardinality::REQUIRED)
        );
        assert_eq!(
            Cardinality::from_attributes(&attrs(&[("cardinality", "optional")])),
            Ok(Cardinality::OPTIONAL)
        );
        assert_eq!(
            Cardinality::from_attributes(&attrs(&[("cardinality", "prohibited")])),
            Ok(Cardinality::PROHIBITED)
        );
        assert!(Cardinality::from_attributes(&attrs(&[("cardinality", "often")])).is_err());
    }

    #[test]
    fn test_cardinality_occurs_defaults() {
        assert_eq!(Cardinality::from_attributes(&Attributes::new()), Ok(Cardinality::REQUIRED));
        assert_eq!(
            Cardinality::from_attributes(&attrs(&[("minOccurs", "0")])),
            Ok(Cardinality::OPTIONAL)
        );
        assert_eq!(
            Cardinality::from_attributes(&attrs(&[("minOccurs", "0"), ("maxOccurs", "0")])),
            Ok(Cardinality::PROHIBITED)
        );
        assert!(Cardinality::from_attributes(&attrs(&[("maxOccurs", "-1")])).is_err());
    }

    #[test]
    fn test_cardinality_grid() {
        let grid = [
            (1, None, true, true),
            (0, None, true, false),
            (0, Some(0), true, false),
            (1, Some(1), false, true),
            (2, None, false, true),
            (0, Some(3), false, false),
        ];
        for (min, max, accepted, required) in grid {
            let c = Cardinality { min, max };
            assert_eq!(c.is_facet_form(), accepted, "{c}");
            assert_eq!(c.is_required(), required, "{c}");
            assert!(c.is_consistent());
        }
        let inverted = Cardinality { min: 3, max: Some(1) };
        assert!(!inverted.is_consistent());
        assert!(!inverted.is_facet_form());
        assert_eq!(inverted.to_string(), "3..1");
        assert_eq!(Cardinality::REQUIRED.to_string(), "1..unbounded");
    }

    #[test]
    fn test_facet_state_withholds_optional_constraint() {
        let mut state = FacetState::new(&attrs(&[("cardinality", "optional")]));
        state
            .constraints
            .insert(IfcSchemaVersion::Ifc4, TypeConstraint::explicit(["IfcWall"]));
        assert!(state.type_constraint(IfcSchemaVersion::Ifc4).is_none());

        let mut state = FacetState::new(&Attributes::new());
        state
            .constraints
            .insert(IfcSchemaVersion::Ifc4, TypeConstraint::explicit(["IfcWall"]));
        assert!(state.type_constraint(IfcSchemaVersion::Ifc4).is_some());
    }
}
