//! Entity catalog: the read-only registry of entity descriptors.
//!
//! The catalog maps entity names to metadata: scalar fields and the
//! composition edges under which child collections are nested. It is
//! built once (programmatically or from a JSON model document) and then
//! only read, so it can be shared freely across concurrent requests.
//!
//! Entity names may be namespaced (`my.shop.Books`) or short (`Books`);
//! composition targets are allowed to use either form, and the plan
//! resolver reconciles the two (see [`crate::plan`]).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Dot-separated identifier segments, e.g. `my.shop.Books` or `Books`.
static ENTITY_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
});

/// Errors raised while constructing a catalog from a model document.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid entity name: {name}")]
    InvalidName { name: String },

    #[error("Duplicate entity definition: {name}")]
    DuplicateEntity { name: String },

    #[error("Model document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How a declared field behaves for projection purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Plain scalar value.
    #[default]
    Scalar,
    /// Reference to another entity (not owned; never followed).
    Association,
    /// Inline nested-record-shaped value.
    Structured,
}

/// A declared field on an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,

    #[serde(default)]
    pub kind: FieldKind,

    /// Part of the entity's primary identifier.
    #[serde(default)]
    pub key: bool,

    /// Computed at read time; never materialized in the store.
    #[serde(default, rename = "virtual")]
    pub virtual_field: bool,
}

impl FieldDef {
    pub fn scalar(name: impl Into<String>) -> Self {
        FieldDef {
            name: name.into(),
            kind: FieldKind::Scalar,
            key: false,
            virtual_field: false,
        }
    }

    pub fn key(name: impl Into<String>) -> Self {
        FieldDef {
            key: true,
            ..FieldDef::scalar(name)
        }
    }

    pub fn association(name: impl Into<String>) -> Self {
        FieldDef {
            kind: FieldKind::Association,
            ..FieldDef::scalar(name)
        }
    }
}

/// An ownership edge to a child collection. Cardinality is always
/// to-many; the target string may be namespaced, short, or stale; the
/// resolver applies fallback strategies before giving up on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionEdge {
    /// Field name under which children nest in hierarchical records.
    pub name: String,
    /// Declared target entity type.
    pub target: String,
}

/// Immutable metadata for one entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,

    #[serde(default)]
    pub fields: Vec<FieldDef>,

    #[serde(default)]
    pub compositions: Vec<CompositionEdge>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        EntityDescriptor {
            name: name.into(),
            fields: Vec::new(),
            compositions: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_composition(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.compositions.push(CompositionEdge {
            name: name.into(),
            target: target.into(),
        });
        self
    }

    /// Namespace prefix of the entity name, if it has one.
    /// `my.shop.Books` → `Some("my.shop")`, `Books` → `None`.
    pub fn namespace(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(ns, _)| ns)
    }

    /// First field flagged as key, conventionally the root key used to
    /// filter exports and detect insert conflicts.
    pub fn key_field(&self) -> Option<&str> {
        self.fields.iter().find(|f| f.key).map(|f| f.name.as_str())
    }
}

/// Last dot-separated segment of a possibly namespaced name.
pub fn short_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// JSON model document: `{"entities": [...]}`.
#[derive(Debug, Deserialize)]
struct ModelDoc {
    entities: Vec<EntityDescriptor>,
}

/// The entity registry. Constructed once, read-only thereafter.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: BTreeMap<String, EntityDescriptor>,
}

impl Catalog {
    pub fn new(descriptors: Vec<EntityDescriptor>) -> Result<Self, ModelError> {
        let mut entities = BTreeMap::new();
        for descriptor in descriptors {
            if !ENTITY_NAME_REGEX.is_match(&descriptor.name) {
                return Err(ModelError::InvalidName {
                    name: descriptor.name,
                });
            }
            if entities.contains_key(&descriptor.name) {
                return Err(ModelError::DuplicateEntity {
                    name: descriptor.name,
                });
            }
            entities.insert(descriptor.name.clone(), descriptor);
        }
        Ok(Catalog { entities })
    }

    /// Load a catalog from a JSON model document.
    pub fn from_model_json(json: &str) -> Result<Self, ModelError> {
        let doc: ModelDoc = serde_json::from_str(json)?;
        Catalog::new(doc.entities)
    }

    /// Exact-name lookup.
    pub fn descriptor(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    /// The single entity whose short name matches, if exactly one does.
    /// An ambiguous short name returns `None` rather than guessing.
    pub fn unique_by_short_name(&self, wanted: &str) -> Option<&EntityDescriptor> {
        let mut matches = self
            .entities
            .values()
            .filter(|d| short_name(&d.name) == wanted);
        match (matches.next(), matches.next()) {
            (Some(descriptor), None) => Some(descriptor),
            _ => None,
        }
    }

    /// Root-request lookup: exact match first, then a unique short-name
    /// match across the catalog.
    pub fn resolve_root(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities
            .get(name)
            .or_else(|| self.unique_by_short_name(short_name(name)))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }
}
