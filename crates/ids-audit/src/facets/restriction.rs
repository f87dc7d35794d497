//! XSD-style restrictions on string values

use super::value::equal_candidates;
use super::{AuditContext, Facet, StringListMatcher, ValidityMarker};
use crate::messages;
use crate::status::AuditStatus;
use ids_ir::{Attributes, NodeId, Tree};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

/// Base types accepted for restrictions under a `value` holder
const VALUE_BASES: &[&str] = &[
    "string",
    "normalizedString",
    "token",
    "boolean",
    "integer",
    "int",
    "long",
    "short",
    "nonNegativeInteger",
    "positiveInteger",
    "decimal",
    "double",
    "float",
    "date",
    "dateTime",
    "time",
    "duration",
    "anyURI",
];

/// Local part of a prefixed XSD type name (`xs:string` -> `string`)
fn local_type(base: &str) -> &str {
    base.rsplit_once(':').map_or(base, |(_, local)| local)
}

/// Holder kind of the restriction at `id`, if any
fn holder_kind<'t>(tree: &'t Tree<Facet>, id: NodeId) -> Option<&'t str> {
    tree[id].parent.map(|p| tree[p].kind.as_str())
}

/// `xs:restriction`, the union of its children's matches
#[derive(Debug, Clone)]
pub struct RestrictionFacet {
    valid: bool,
    base: Option<String>,
}

impl RestrictionFacet {
    #[must_use]
    pub fn new(attributes: &Attributes) -> Self {
        Self {
            valid: true,
            base: attributes.get("base").map(str::to_string),
        }
    }

    /// Whether the declared base is `string`
    #[must_use]
    pub fn is_textual(&self) -> bool {
        self.base.as_deref().map(local_type) == Some("string")
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let base = self.base.as_deref().unwrap_or("");
        let holder = holder_kind(ctx.tree, id).unwrap_or("restriction").to_string();
        let accepted = if holder == "value" {
            VALUE_BASES.contains(&local_type(base))
        } else {
            self.is_textual()
        };

        let status = if accepted {
            AuditStatus::OK
        } else {
            ctx.error(id, messages::restriction_base(base, &holder))
        };
        self.valid = status.is_ok();
        status
    }
}

impl ValidityMarker for RestrictionFacet {
    fn is_valid(&self) -> bool {
        self.valid
    }
}

impl StringListMatcher for RestrictionFacet {
    fn matches(
        &self,
        tree: &Tree<Facet>,
        id: NodeId,
        candidates: &BTreeSet<String>,
        case_sensitive: bool,
    ) -> BTreeSet<String> {
        let mut matched = BTreeSet::new();
        for child in &tree[id].children {
            if let Some(matcher) = tree[*child].payload.as_matcher() {
                matched.extend(matcher.matches(tree, *child, candidates, case_sensitive));
            }
        }
        matched
    }

    fn literal_values(&self, tree: &Tree<Facet>, id: NodeId) -> Vec<String> {
        tree[id]
            .children
            .iter()
            .filter_map(|c| tree[*c].payload.as_matcher().map(|m| m.literal_values(tree, *c)))
            .flatten()
            .collect()
    }
}

/// `xs:enumeration`
#[derive(Debug, Clone, Default)]
pub struct EnumerationFacet {
    value: String,
}

impl EnumerationFacet {
    #[must_use]
    pub fn new(attributes: &Attributes) -> Self {
        Self {
            value: attributes.get("value").unwrap_or_default().to_string(),
        }
    }
}

impl StringListMatcher for EnumerationFacet {
    fn matches(
        &self,
        _tree: &Tree<Facet>,
        _id: NodeId,
        candidates: &BTreeSet<String>,
        case_sensitive: bool,
    ) -> BTreeSet<String> {
        equal_candidates(&self.value, candidates, case_sensitive)
    }

    fn literal_values(&self, _tree: &Tree<Facet>, _id: NodeId) -> Vec<String> {
        vec![self.value.clone()]
    }
}

/// Rewrite an XSD regular expression for the `regex` crate, anchored on both ends
fn translate_xsd_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("^(?:");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('i') => out.push_str("[_:A-Za-z]"),
            Some('I') => out.push_str("[^_:A-Za-z]"),
            Some('c') => out.push_str("[-._:A-Za-z0-9]"),
            Some('C') => out.push_str("[^-._:A-Za-z0-9]"),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out.push_str(")$");
    out
}

/// `xs:pattern`, an XSD regular expression matched against whole values
#[derive(Debug, Clone)]
pub struct PatternFacet {
    valid: bool,
    source: String,
    translated: String,
}

impl PatternFacet {
    #[must_use]
    pub fn new(attributes: &Attributes) -> Self {
        let source = attributes.get("value").unwrap_or_default().to_string();
        let translated = translate_xsd_pattern(&source);
        Self {
            valid: true,
            source,
            translated,
        }
    }

    fn compile(&self, case_sensitive: bool) -> Result<Regex, regex::Error> {
        RegexBuilder::new(&self.translated)
            .case_insensitive(!case_sensitive)
            .build()
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let status = match self.compile(true) {
            Ok(_) => AuditStatus::OK,
            Err(e) => ctx.error(id, messages::invalid_pattern(&self.source, e)),
        };
        self.valid = status.is_ok();
        status
    }
}

impl ValidityMarker for PatternFacet {
    fn is_valid(&self) -> bool {
        self.valid
    }
}

impl StringListMatcher for PatternFacet {
    fn matches(
        &self,
        _tree: &Tree<Facet>,
        _id: NodeId,
        candidates: &BTreeSet<String>,
        case_sensitive: bool,
    ) -> BTreeSet<String> {
        match self.compile(case_sensitive) {
            Ok(re) => candidates.iter().filter(|c| re.is_match(c)).cloned().collect(),
            Err(_) => BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthBound {
    Exact,
    Min,
    Max,
}

/// `xs:length`, `xs:minLength` and `xs:maxLength`
#[derive(Debug, Clone)]
pub struct LengthFacet {
    valid: bool,
    bound: LengthBound,
    raw: String,
    length: Option<usize>,
}

impl LengthFacet {
    fn with_bound(bound: LengthBound, attributes: &Attributes) -> Self {
        let raw = attributes.get("value").unwrap_or_default().to_string();
        let length = raw.trim().parse().ok();
        Self {
            valid: true,
            bound,
            raw,
            length,
        }
    }

    #[must_use]
    pub fn exact(attributes: &Attributes) -> Self {
        Self::with_bound(LengthBound::Exact, attributes)
    }

    #[must_use]
    pub fn min(attributes: &Attributes) -> Self {
        Self::with_bound(LengthBound::Min, attributes)
    }

    #[must_use]
    pub fn max(attributes: &Attributes) -> Self {
        Self::with_bound(LengthBound::Max, attributes)
    }

    fn accepts(&self, value: &str) -> bool {
        let Some(length) = self.length else {
            return false;
        };
        let count = value.chars().count();
        match self.bound {
            LengthBound::Exact => count == length,
            LengthBound::Min => count >= length,
            LengthBound::Max => count <= length,
        }
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let status = if self.length.is_some() {
            AuditStatus::OK
        } else {
            let kind = ctx.node(id).kind.clone();
            ctx.error(id, messages::invalid_number(&kind, &self.raw))
        };
        self.valid = status.is_ok();
        status
    }
}

impl ValidityMarker for LengthFacet {
    fn is_valid(&self) -> bool {
        self.valid
    }
}

impl StringListMatcher for LengthFacet {
    fn matches(
        &self,
        _tree: &Tree<Facet>,
        _id: NodeId,
        candidates: &BTreeSet<String>,
        _case_sensitive: bool,
    ) -> BTreeSet<String> {
        candidates.iter().filter(|c| self.accepts(c)).cloned().collect()
    }
}

/// `xs:totalDigits`, meaningless for string content
#[derive(Debug, Clone)]
pub struct TotalDigitsFacet {
    valid: bool,
}

impl TotalDigitsFacet {
    #[must_use]
    pub fn new(_attributes: &Attributes) -> Self {
        Self { valid: true }
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let on_string = ctx
            .node(id)
            .parent
            .is_some_and(|p| matches!(&ctx.node(p).payload, Facet::Restriction(r) if r.is_textual()));
        let status = if on_string {
            ctx.error(id, messages::total_digits_on_string())
        } else {
            AuditStatus::OK
        };
        self.valid = status.is_ok();
        status
    }
}

impl ValidityMarker for TotalDigitsFacet {
    fn is_valid(&self) -> bool {
        self.valid
    }
}

impl StringListMatcher for TotalDigitsFacet {
    fn matches(
        &self,
        _tree: &Tree<Facet>,
        _id: NodeId,
        _candidates: &BTreeSet<String>,
        _case_sensitive: bool,
    ) -> BTreeSet<String> {
        BTreeSet::new()
    }
}
