//! Schema-table resolver.
//!
//! Instead of discovering live accessors by naming convention at resolution
//! time, the resolver builds an accessor table once from the managed system's
//! schema: a mapping from type reference (a dotted schema path) to the schema
//! node defining that attribute, plus per-object alias tables for alternate
//! attribute names. Live state is a JSON document navigated through that
//! table.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ResolutionError;
use crate::model::participant::{
    single_line, AttributeKind, ResolvedParticipant, TypeDescriptor, ValueState,
};
use crate::model::resolved::ResolvedKind;
use crate::model::resolver::ModelResolver;

/// Schema metadata for one attribute of a managed system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSchema {
    pub name: String,
    pub kind: AttributeKind,
    /// Schema default, applied when the live document carries no value.
    #[serde(default)]
    pub default: Option<Value>,
    /// Whether an absent value is legal.
    #[serde(default)]
    pub nillable: bool,
    /// Legal values for enum attributes.
    #[serde(default)]
    pub variants: Vec<String>,
    /// Child attributes for object attributes.
    #[serde(default)]
    pub attributes: Vec<AttributeSchema>,
    /// Entry schema for collection attributes.
    #[serde(default)]
    pub element: Option<Box<AttributeSchema>>,
    /// Factory method name associated with the attribute, e.g. `createServer`.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Destructor method name associated with the attribute.
    #[serde(default)]
    pub destroyed_by: Option<String>,
    /// Fully qualified owning interface name.
    #[serde(default)]
    pub interface: Option<String>,
}

impl AttributeSchema {
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::with_kind(name, AttributeKind::Primitive)
    }

    pub fn object(name: impl Into<String>, attributes: Vec<AttributeSchema>) -> Self {
        let mut schema = Self::with_kind(name, AttributeKind::Object);
        schema.attributes = attributes;
        schema
    }

    pub fn collection(name: impl Into<String>, element: AttributeSchema) -> Self {
        let mut schema = Self::with_kind(name, AttributeKind::Collection);
        schema.element = Some(Box::new(element));
        schema
    }

    pub fn enumeration(name: impl Into<String>, variants: Vec<String>) -> Self {
        let mut schema = Self::with_kind(name, AttributeKind::Enum);
        schema.variants = variants;
        schema
    }

    fn with_kind(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            nillable: false,
            variants: Vec::new(),
            attributes: Vec::new(),
            element: None,
            created_by: None,
            destroyed_by: None,
            interface: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }
}

/// Alternate-name table for the attributes of one object schema.
///
/// An alternate name is derived from the attribute's factory method
/// (`createXyz` -> `Xyz`), its destructor method (`destroyXyz` -> `Xyz`), or
/// its owning interface (`a.b.XyzMBean` -> `Xyz`). It is registered only if
/// it is non-empty, differs from the canonical name, and, when already
/// claimed by a different attribute, shares a non-empty common prefix with
/// the canonical name. The common-prefix rule is a disambiguation heuristic
/// carried over from the managed-bean metadata handling; replace this table
/// with an explicit mapping if collisions become a correctness problem.
#[derive(Debug, Default)]
struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    fn build(attributes: &[AttributeSchema]) -> Self {
        let mut table = AliasTable::default();
        for attribute in attributes {
            table
                .entries
                .insert(attribute.name.to_lowercase(), attribute.name.clone());
        }
        for attribute in attributes {
            if let Some(alternate) = derive_alternate_name(attribute) {
                table.register_alternate(&attribute.name, &alternate);
            }
        }
        table
    }

    fn register_alternate(&mut self, canonical: &str, alternate: &str) {
        let key = alternate.to_lowercase();
        if key.is_empty() {
            return;
        }
        if key == canonical.to_lowercase() {
            return;
        }
        if let Some(existing) = self.entries.get(&key) {
            if existing == canonical {
                return;
            }
            // Overwrite only when the canonical and alternate names begin
            // with the same sequence: the most specific match wins.
            if common_prefix_len(&canonical.to_lowercase(), &key) == 0 {
                return;
            }
        }
        self.entries.insert(key, canonical.to_string());
    }

    fn resolve(&self, name: &str) -> Option<&str> {
        self.entries.get(&name.to_lowercase()).map(String::as_str)
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count()
}

fn derive_alternate_name(attribute: &AttributeSchema) -> Option<String> {
    if let Some(creator) = &attribute.created_by {
        if let Some(rest) = creator.strip_prefix("create") {
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    if let Some(destroyer) = &attribute.destroyed_by {
        if let Some(rest) = destroyer.strip_prefix("destroy") {
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    if let Some(interface) = &attribute.interface {
        let segment = interface.rsplit('.').next().unwrap_or(interface);
        let trimmed = segment.strip_suffix("MBean").unwrap_or(segment);
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}

/// `ModelResolver` backed by an accessor table built once from an
/// [`AttributeSchema`] tree; resolves against live state carried as
/// `serde_json::Value` documents in the participants.
pub struct SchemaResolver {
    index: HashMap<String, Arc<AttributeSchema>>,
    aliases: HashMap<String, AliasTable>,
    root_path: String,
}

impl SchemaResolver {
    pub fn new(root: AttributeSchema) -> Self {
        let mut index = HashMap::new();
        let mut aliases = HashMap::new();
        let root_path = root.name.clone();
        build_tables(&root, &root_path, &mut index, &mut aliases);
        Self {
            index,
            aliases,
            root_path,
        }
    }

    /// Root participant wrapping a full live (or declared) document.
    pub fn root_participant(&self, document: Value) -> ResolvedParticipant {
        ResolvedParticipant::set(
            self.root_path.clone(),
            TypeDescriptor::new(AttributeKind::Object, self.root_path.clone()),
            document,
        )
    }

    fn schema_for(&self, participant: &ResolvedParticipant) -> Result<&AttributeSchema, ResolutionError> {
        let reference = participant.type_desc().reference();
        self.index
            .get(reference)
            .map(Arc::as_ref)
            .ok_or_else(|| {
                ResolutionError::new(format!(
                    "no schema registered for type reference '{reference}'"
                ))
            })
    }

    fn try_resolve_attribute(
        &self,
        name: &str,
        participant: &ResolvedParticipant,
    ) -> Result<ResolvedParticipant, ResolutionError> {
        let schema = self.schema_for(participant)?;
        let path = participant.type_desc().reference();

        let canonical = self
            .aliases
            .get(path)
            .and_then(|table| table.resolve(name))
            .ok_or_else(|| {
                ResolutionError::new(format!(
                    "attribute '{name}' is not defined by schema '{path}'"
                ))
            })?;
        let child = schema
            .attributes
            .iter()
            .find(|a| a.name == canonical)
            .ok_or_else(|| {
                ResolutionError::new(format!(
                    "alias table references unknown attribute '{canonical}' on '{path}'"
                ))
            })?;
        let child_type =
            TypeDescriptor::new(child.kind, format!("{path}.{}", child.name));

        let object = participant.value().as_object().ok_or_else(|| {
            ResolutionError::new(format!(
                "value of '{}' is not an object, cannot resolve attribute '{name}' on it",
                participant.name()
            ))
        })?;

        let live = object
            .get(&child.name)
            .or_else(|| {
                object
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(&child.name))
                    .map(|(_, v)| v)
            });

        let resolved = match live {
            Some(Value::Null) => ResolvedParticipant::nil(child.name.clone(), child_type),
            Some(value) => {
                ResolvedParticipant::set(child.name.clone(), child_type, value.clone())
            }
            None => match &child.default {
                Some(default) => ResolvedParticipant::default_value(
                    child.name.clone(),
                    child_type,
                    default.clone(),
                ),
                None if child.nillable => {
                    ResolvedParticipant::nil(child.name.clone(), child_type)
                }
                None => ResolvedParticipant::failed(
                    child.name.clone(),
                    child_type,
                    ResolutionError::new(format!(
                        "attribute '{}' has no value, no schema default and is not nillable",
                        child.name
                    )),
                ),
            },
        };
        Ok(resolved)
    }
}

impl ModelResolver for SchemaResolver {
    fn resolve_attribute(
        &self,
        name: &str,
        participant: &ResolvedParticipant,
    ) -> ResolvedParticipant {
        match self.try_resolve_attribute(name, participant) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::debug!(attribute = name, error = %err, "attribute resolution failed");
                ResolvedParticipant::failed(name, TypeDescriptor::unknown(), err)
            }
        }
    }

    fn resolve_attribute_names(
        &self,
        participant: &ResolvedParticipant,
    ) -> Result<Vec<String>, ResolutionError> {
        let schema = self.schema_for(participant)?;
        if schema.kind != AttributeKind::Object {
            return Err(ResolutionError::new(format!(
                "'{}' is not an object attribute, cannot enumerate children",
                participant.name()
            )));
        }
        let mut names: Vec<String> =
            schema.attributes.iter().map(|a| a.name.clone()).collect();
        names.sort();
        Ok(names)
    }

    fn resolve_collection_attribute_values(
        &self,
        participant: &ResolvedParticipant,
    ) -> BTreeMap<String, ResolvedParticipant> {
        let mut result = BTreeMap::new();
        if matches!(
            participant.value_state(),
            ValueState::Nil | ValueState::Failed
        ) {
            return result;
        }

        let Ok(schema) = self.schema_for(participant) else {
            tracing::warn!(
                collection = participant.name(),
                "no schema for collection participant, returning no entries"
            );
            return result;
        };
        let Some(element) = &schema.element else {
            tracing::warn!(
                collection = participant.name(),
                "collection schema without element schema, returning no entries"
            );
            return result;
        };
        let Some(entries) = participant.value().as_array() else {
            tracing::warn!(
                collection = participant.name(),
                "collection value is not an array, returning no entries"
            );
            return result;
        };

        let element_path = format!("{}[]", participant.type_desc().reference());
        for entry in entries {
            // Entry naming is best effort: the technology's name attribute
            // when present, the textual rendering otherwise.
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| single_line(&entry.to_string()));
            let resolved = ResolvedParticipant::set(
                name.clone(),
                TypeDescriptor::new(element.kind, element_path.clone()),
                entry.clone(),
            );
            result.insert(name, resolved);
        }
        result
    }

    fn classify(
        &self,
        _parent_primary: &ResolvedParticipant,
        primary: &ResolvedParticipant,
    ) -> Result<ResolvedKind, ResolutionError> {
        let schema = self.schema_for(primary)?;
        match schema.kind {
            AttributeKind::Primitive => Ok(ResolvedKind::Primitive),
            AttributeKind::Collection => Ok(ResolvedKind::Collection),
            AttributeKind::Enum => Ok(ResolvedKind::Enum),
            AttributeKind::Object => Ok(ResolvedKind::Object),
            AttributeKind::Unknown => Err(ResolutionError::new(format!(
                "attribute '{}' has no classifiable schema kind",
                primary.name()
            ))),
        }
    }

    fn create_non_existing_collection_value(
        &self,
        id: &str,
        parent: &ResolvedParticipant,
    ) -> ResolvedParticipant {
        let error = ResolutionError::new(format!(
            "declared entry '{id}' has no live counterpart in collection '{}' ({})",
            parent.name(),
            parent.value_as_single_line()
        ));
        ResolvedParticipant::failed(id, parent.type_desc().clone(), error)
    }
}

fn build_tables(
    schema: &AttributeSchema,
    path: &str,
    index: &mut HashMap<String, Arc<AttributeSchema>>,
    aliases: &mut HashMap<String, AliasTable>,
) {
    index.insert(path.to_string(), Arc::new(schema.clone()));
    if !schema.attributes.is_empty() {
        aliases.insert(path.to_string(), AliasTable::build(&schema.attributes));
    }
    for child in &schema.attributes {
        let child_path = format!("{path}.{}", child.name);
        build_tables(child, &child_path, index, aliases);
    }
    if let Some(element) = &schema.element {
        let element_path = format!("{path}[]");
        build_tables(element, &element_path, index, aliases);
    }
}
