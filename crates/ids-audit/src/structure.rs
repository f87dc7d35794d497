//! Structural rules of the published IDS schemas
//!
//! Each IDS version is described by a table of element rules (allowed parents,
//! declared and required attributes, an ordered content model with occurrence
//! bounds). The token source checks
//! every element against the table and reports violations the way an XSD
//! validator would, as line-positioned diagnostics.

use crate::options::{IDS_NAMESPACE, IdsVersion};
use crate::reporter::Severity;
use crate::{Error, Result};
use ids_ir::Attributes;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use tracing::{debug, trace};

const FACET_PARENTS: &[&str] = &["applicability", "requirements"];
/// Facets in the order a 1.0 facet group lists them
const FACETS: &[&str] = &["entity", "partOf", "classification", "attribute", "property", "material"];
const VALUE_HOLDERS: &[&str] = &["name", "predefinedType", "value", "propertySet", "baseName", "system"];
const RESTRICTION_FACETS: &[&str] = &[
    "enumeration",
    "pattern",
    "length",
    "minLength",
    "maxLength",
    "totalDigits",
    "fractionDigits",
    "minInclusive",
    "maxInclusive",
    "minExclusive",
    "maxExclusive",
    "whiteSpace",
];
const INFO_CHILDREN: &[&str] = &[
    "title",
    "copyright",
    "version",
    "description",
    "author",
    "date",
    "purpose",
    "milestone",
];

/// One position of an element's ordered content model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Particle {
    /// Element names accepted at this position
    pub names: Vec<&'static str>,
    pub min: u32,
    /// `None` when unbounded
    pub max: Option<u32>,
}

impl Particle {
    fn accepts(&self, name: &str) -> bool {
        self.names.contains(&name)
    }

    fn is_full(&self, count: u32) -> bool {
        self.max.is_some_and(|max| count >= max)
    }
}

/// Progress of an open element through its content model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentState {
    slot: usize,
    count: u32,
}

/// Rule for one element name
#[derive(Debug, Clone)]
pub struct ElementRule {
    pub name: &'static str,
    /// Allowed parent names; empty for the document element
    pub parents: Vec<&'static str>,
    /// Declared attribute names
    pub attributes: Vec<&'static str>,
    pub required_attributes: Vec<&'static str>,
    /// Child particles in document order
    pub content: Vec<Particle>,
}

impl ElementRule {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            parents: Vec::new(),
            attributes: Vec::new(),
            required_attributes: Vec::new(),
            content: Vec::new(),
        }
    }

    fn parents(mut self, parents: &[&'static str]) -> Self {
        self.parents.extend_from_slice(parents);
        self
    }

    fn attributes(mut self, attributes: &[&'static str]) -> Self {
        self.attributes.extend_from_slice(attributes);
        self
    }

    fn required(mut self, attributes: &[&'static str]) -> Self {
        self.attributes.extend_from_slice(attributes);
        self.required_attributes.extend_from_slice(attributes);
        self
    }

    fn particle(mut self, names: &[&'static str], min: u32, max: Option<u32>) -> Self {
        self.content.push(Particle {
            names: names.to_vec(),
            min,
            max,
        });
        self
    }

    /// Exactly one of `names`
    fn one(self, names: &[&'static str]) -> Self {
        self.particle(names, 1, Some(1))
    }

    fn optional(self, names: &[&'static str]) -> Self {
        self.particle(names, 0, Some(1))
    }

    fn any(self, names: &[&'static str]) -> Self {
        self.particle(names, 0, None)
    }

    /// Names that may follow in `state`, up to the first particle still owed
    fn expected(&self, state: ContentState) -> Vec<&'static str> {
        let mut names = Vec::new();
        for (slot, particle) in self.content.iter().enumerate().skip(state.slot) {
            let count = if slot == state.slot { state.count } else { 0 };
            if !particle.is_full(count) {
                names.extend_from_slice(&particle.names);
            }
            if count < particle.min {
                break;
            }
        }
        names
    }
}

/// A structural problem found by the rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Structural rule set of one IDS version
#[derive(Debug, Clone)]
pub struct StructuralSchema {
    version: IdsVersion,
    rules: HashMap<&'static str, ElementRule>,
}

impl StructuralSchema {
    /// Rules for `version`
    #[must_use]
    pub fn for_version(version: IdsVersion) -> Self {
        let cardinality: &[&'static str] = if version.uses_occurs() {
            &["minOccurs", "maxOccurs"]
        } else {
            &["cardinality"]
        };
        let facet_attributes = |rule: ElementRule| rule.attributes(cardinality).attributes(&["instructions"]);

        let mut rules = vec![
            ElementRule::new("ids").one(&["info"]).one(&["specifications"]),
            ElementRule::new("specifications").parents(&["ids"]).particle(&["specification"], 1, None),
            ElementRule::new("specification")
                .parents(&["specifications"])
                .required(&["name", "ifcVersion"])
                .attributes(&["identifier", "description", "instructions"])
                .one(&["applicability"])
                .optional(&["requirements"]),
            facet_attributes(ElementRule::new("entity").parents(FACET_PARENTS).parents(&["partOf"]))
                .one(&["name"])
                .optional(&["predefinedType"]),
            facet_attributes(ElementRule::new("attribute").parents(FACET_PARENTS))
                .one(&["name"])
                .optional(&["value"]),
            facet_attributes(ElementRule::new("classification").parents(FACET_PARENTS))
                .attributes(&["uri"])
                .optional(&["value"])
                .optional(&["system"]),
            facet_attributes(ElementRule::new("material").parents(FACET_PARENTS))
                .attributes(&["uri"])
                .optional(&["value"]),
            ElementRule::new("predefinedType").parents(&["entity"]),
            ElementRule::new("value").parents(&["attribute", "property", "classification", "material"]),
            ElementRule::new("propertySet").parents(&["property"]),
            ElementRule::new("system").parents(&["classification"]),
            ElementRule::new("simpleValue").parents(VALUE_HOLDERS),
            ElementRule::new("restriction")
                .parents(VALUE_HOLDERS)
                .required(&["base"])
                .any(RESTRICTION_FACETS),
        ];

        let mut info = ElementRule::new("info").parents(&["ids"]).one(&["title"]);
        for name in &INFO_CHILDREN[1..] {
            info = info.optional(&[*name]);
        }
        rules.push(info);

        let property = facet_attributes(ElementRule::new("property").parents(FACET_PARENTS))
            .attributes(&["dataType", "uri"])
            .one(&["propertySet"]);
        let part_of = facet_attributes(ElementRule::new("partOf").parents(FACET_PARENTS)).attributes(&["relation"]);
        let collection = |name: &'static str| ElementRule::new(name).parents(&["specification"]);

        if version.uses_occurs() {
            if let Some(specification) = rules.iter_mut().find(|r| r.name == "specification") {
                specification.attributes.extend_from_slice(&["minOccurs", "maxOccurs"]);
            }
            rules.push(ElementRule::new("name").parents(&["entity", "attribute", "property"]));
            rules.push(property.one(&["name"]).optional(&["value"]));
            rules.push(part_of.optional(&["entity"]));
            rules.push(collection("applicability").any(FACETS));
            rules.push(collection("requirements").attributes(&["description"]).any(FACETS));
        } else {
            rules.push(ElementRule::new("name").parents(&["entity", "attribute"]));
            rules.push(ElementRule::new("baseName").parents(&["property"]));
            rules.push(property.one(&["baseName"]).optional(&["value"]));
            rules.push(part_of.one(&["entity"]));
            let ordered_facets = |rule: ElementRule| {
                FACETS[1..]
                    .iter()
                    .fold(rule.optional(&FACETS[..1]), |rule, facet| rule.any(&[*facet]))
            };
            rules.push(ordered_facets(collection("applicability").attributes(&["minOccurs", "maxOccurs"])));
            rules.push(ordered_facets(collection("requirements").attributes(&["description"])));
        }

        rules.extend(INFO_CHILDREN.iter().map(|name| ElementRule::new(name).parents(&["info"])));
        rules.extend(
            RESTRICTION_FACETS
                .iter()
                .map(|name| ElementRule::new(name).parents(&["restriction"]).required(&["value"]).attributes(&["fixed"])),
        );

        for holder in VALUE_HOLDERS {
            if let Some(rule) = rules.iter_mut().find(|r| r.name == *holder) {
                rule.content.push(Particle {
                    names: vec!["simpleValue", "restriction"],
                    min: 1,
                    max: Some(1),
                });
            }
        }

        debug!(%version, rules = rules.len(), "structural schema ready");
        Self {
            version,
            rules: rules.into_iter().map(|r| (r.name, r)).collect(),
        }
    }

    #[must_use]
    pub fn version(&self) -> IdsVersion {
        self.version
    }

    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&ElementRule> {
        self.rules.get(name)
    }

    /// Check an opening tag.
    ///
    /// `namespaces` holds the namespace URIs bound on the element; it is only
    /// inspected for the document element.
    #[must_use]
    pub fn check_start(
        &self,
        name: &str,
        parent: Option<&str>,
        attributes: &Attributes,
        namespaces: &[String],
    ) -> Vec<Finding> {
        let mut findings = Vec::new();

        if parent.is_none() {
            if name != "ids" {
                findings.push(Finding::error(format!(
                    "The root element must be 'ids', found '{name}'"
                )));
            }
            if !namespaces.iter().any(|ns| ns == IDS_NAMESPACE) {
                findings.push(Finding::error(format!(
                    "The document does not declare the IDS namespace '{IDS_NAMESPACE}'"
                )));
            }
        }

        let Some(rule) = self.rule(name) else {
            findings.push(Finding::error(format!(
                "The element '{name}' is not declared in IDS {}",
                self.version
            )));
            return findings;
        };

        match parent {
            Some(parent) if !rule.parents.contains(&parent) => findings.push(Finding::error(format!(
                "The element '{parent}' has invalid child element '{name}'"
            ))),
            None if !rule.parents.is_empty() => {}
            _ => {}
        }

        for (key, value) in attributes.iter() {
            if let Some((prefix, local)) = key.split_once(':') {
                if prefix != "xsi" && prefix != "xml" {
                    findings.push(Finding::warning(format!(
                        "Could not find schema information for the attribute '{prefix}:{local}'"
                    )));
                }
                continue;
            }
            if !rule.attributes.contains(&key) {
                findings.push(Finding::error(format!(
                    "The '{key}' attribute is not declared on '{name}'"
                )));
                continue;
            }
            if let Some(finding) = self.check_value(key, value) {
                findings.push(finding);
            }
        }

        for required in &rule.required_attributes {
            if !attributes.contains(required) {
                findings.push(Finding::error(format!(
                    "The required attribute '{required}' is missing on '{name}'"
                )));
            }
        }

        trace!(name, findings = findings.len(), "checked start tag");
        findings
    }

    /// Advance `state` of the open `parent` over its next child `child`.
    ///
    /// Children the content model never mentions are left to the parent check of
    /// [`check_start`](Self::check_start). A rejected child leaves `state` unchanged.
    #[must_use]
    pub fn check_child(&self, parent: &str, state: &mut ContentState, child: &str) -> Option<Finding> {
        let rule = self.rule(parent)?;
        if !rule.content.iter().any(|p| p.accepts(child)) {
            return None;
        }

        let (mut slot, mut count) = (state.slot, state.count);
        while let Some(particle) = rule.content.get(slot) {
            if particle.accepts(child) && !particle.is_full(count) {
                *state = ContentState { slot, count: count + 1 };
                return None;
            }
            if count < particle.min {
                break;
            }
            slot += 1;
            count = 0;
        }

        let expected = rule.expected(*state);
        let message = if expected.is_empty() {
            format!("The element '{parent}' has invalid child element '{child}'")
        } else {
            format!(
                "The element '{parent}' has invalid child element '{child}'. List of possible elements expected: '{}'",
                expected.join("' or '")
            )
        };
        Some(Finding::error(message))
    }

    /// Check that a closed element received every particle it owes
    #[must_use]
    pub fn check_end(&self, name: &str, state: &ContentState) -> Vec<Finding> {
        let Some(rule) = self.rule(name) else {
            return Vec::new();
        };
        rule.content
            .iter()
            .enumerate()
            .skip(state.slot)
            .filter(|(slot, particle)| {
                let count = if *slot == state.slot { state.count } else { 0 };
                count < particle.min
            })
            .map(|(_, particle)| {
                Finding::error(format!(
                    "The element '{name}' has incomplete content, expected '{}'",
                    particle.names.join("' or '")
                ))
            })
            .collect()
    }

    fn check_value(&self, key: &str, value: &str) -> Option<Finding> {
        let invalid = |datatype: &str| {
            Some(Finding::error(format!(
                "The '{key}' attribute is invalid, the value '{value}' is invalid according to its datatype '{datatype}'"
            )))
        };
        match key {
            "minOccurs" if value.trim().parse::<u32>().is_err() => invalid("nonNegativeInteger"),
            "maxOccurs" if value.trim() != "unbounded" && value.trim().parse::<u32>().is_err() => {
                invalid("allNNI")
            }
            "cardinality" if !matches!(value.trim(), "required" | "optional" | "prohibited") => {
                invalid("cardinality")
            }
            "ifcVersion" => {
                let allowed = self.ifc_version_tokens();
                let tokens: Vec<&str> = value.split_whitespace().collect();
                if tokens.is_empty() || tokens.iter().any(|t| !allowed.contains(t)) {
                    invalid("ifcVersionList")
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn ifc_version_tokens(&self) -> &'static [&'static str] {
        if self.version == IdsVersion::V1_0 {
            &["IFC2X3", "IFC4", "IFC4X3_ADD2"]
        } else {
            &["IFC2X3", "IFC4", "IFC4X3"]
        }
    }
}

/// Read the IDS version from the document's `xsi:schemaLocation` and rewind the source
pub fn sniff_version<R: Read + Seek>(source: &mut R) -> Result<IdsVersion> {
    let location = {
        let mut reader = Reader::from_reader(BufReader::new(&mut *source));
        reader.config_mut().trim_text(true);
        first_schema_location(&mut reader)
    };
    source.seek(SeekFrom::Start(0))?;

    let location = location?
        .ok_or_else(|| Error::SchemaVersion("the document declares no xsi:schemaLocation".to_string()))?;
    let pattern = Regex::new(r"/IDS/(\d+(?:\.\d+)+)/ids\.xsd").map_err(|e| Error::SchemaVersion(e.to_string()))?;

    let version = pattern
        .captures(&location)
        .and_then(|c| c.get(1))
        .and_then(|m| IdsVersion::parse(m.as_str()))
        .ok_or_else(|| Error::SchemaVersion(format!("unsupported schema location '{location}'")))?;
    debug!(%version, "sniffed IDS version");
    Ok(version)
}

fn first_schema_location<R: BufRead>(reader: &mut Reader<R>) -> Result<Option<String>> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"schemaLocation" {
                        let value = attr
                            .unescape_value()
                            .map_err(|e| Error::SchemaVersion(e.to_string()))?;
                        return Ok(Some(value.into_owned()));
                    }
                }
                return Ok(None);
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => {
                return Err(Error::SchemaVersion(format!(
                    "unreadable document at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Check that an XSD declares the IDS target namespace and a top-level `ids` element
pub fn check_schema_definition<R: BufRead>(source: R) -> Result<()> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut target_namespace: Option<String> = None;
    let mut has_ids_element = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            Error::SchemaDefinition(format!("XML parse error at position {}: {e}", reader.error_position()))
        })?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let local = e.local_name();
                if depth == 0 {
                    if local.as_ref() != b"schema" {
                        return Err(Error::SchemaDefinition(format!(
                            "root element is '{}', expected 'schema'",
                            String::from_utf8_lossy(local.as_ref())
                        )));
                    }
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"targetNamespace" {
                            let value = attr
                                .unescape_value()
                                .map_err(|e| Error::SchemaDefinition(e.to_string()))?;
                            target_namespace = Some(value.into_owned());
                        }
                    }
                } else if depth == 1 && local.as_ref() == b"element" {
                    has_ids_element |= e
                        .attributes()
                        .flatten()
                        .any(|a| a.key.as_ref() == b"name" && a.value.as_ref() == b"ids");
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    match target_namespace.as_deref() {
        Some(IDS_NAMESPACE) => {}
        Some(other) => {
            return Err(Error::SchemaDefinition(format!(
                "targetNamespace is '{other}', expected '{IDS_NAMESPACE}'"
            )));
        }
        None => {
            return Err(Error::SchemaDefinition("schema declares no targetNamespace".to_string()));
        }
    }
    if !has_ids_element {
        return Err(Error::SchemaDefinition("schema declares no top-level 'ids' element".to_string()));
    }
    Ok(())
}
