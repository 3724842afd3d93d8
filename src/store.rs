//! Store collaborator contract, plus an in-memory implementation.
//!
//! The engine never owns persistent state; it drives reads and writes
//! through [`RecordStore`]. Reads are lazy: the store hands back an
//! iterator and the export pipeline pulls one record at a time, so a
//! slow consumer naturally throttles the whole chain.
//!
//! [`MemoryStore`] is the concrete store used by the CLI binaries and
//! the test suite: hierarchical records held per entity set, projected
//! through a plan on read.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::error::StoreError;
use crate::plan::{EdgeNode, PlanNode, ProjectionPlan};

/// Lazy, finite, non-restartable record sequence in natural store order.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Value, StoreError>> + 'a>;

/// The underlying record store, an external collaborator.
pub trait RecordStore {
    /// Hierarchical read: records of `entity` whose root key is in
    /// `keys`, shaped per `plan` (expanded edges recurse, wildcard
    /// edges pass children through opaquely one level).
    fn read_deep<'a>(
        &'a self,
        entity: &str,
        plan: &'a ProjectionPlan,
        keys: &[Value],
    ) -> Result<RecordIter<'a>, StoreError>;

    /// Flat read: the requested columns of matching records, nothing
    /// else.
    fn read_flat<'a>(
        &'a self,
        entity: &str,
        columns: &[String],
        keys: &[Value],
    ) -> Result<RecordIter<'a>, StoreError>;

    /// Insert one hierarchical record (root plus nested children as one
    /// operation). No upsert semantics: an existing key is a conflict.
    fn insert(&mut self, entity: &str, record: Value) -> Result<(), StoreError>;
}

/// In-memory record store over a catalog.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    catalog: Catalog,
    data: BTreeMap<String, Vec<Value>>,
}

impl MemoryStore {
    pub fn new(catalog: Catalog) -> Self {
        MemoryStore {
            catalog,
            data: BTreeMap::new(),
        }
    }

    /// Load `{"<entity>": [records...]}` produced by [`Self::to_dataset_json`].
    pub fn from_dataset_json(catalog: Catalog, json: &str) -> Result<Self, StoreError> {
        let dataset: BTreeMap<String, Vec<Value>> = serde_json::from_str(json)?;
        let mut store = MemoryStore::new(catalog);
        for (entity, records) in dataset {
            if store.catalog.descriptor(&entity).is_none() {
                return Err(StoreError::UnknownEntity { name: entity });
            }
            for record in records {
                store.insert(&entity, record)?;
            }
        }
        Ok(store)
    }

    /// Serialize all entity sets back into a dataset document.
    pub fn to_dataset_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Records currently held for `entity` (empty slice if none).
    pub fn records(&self, entity: &str) -> &[Value] {
        self.data.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    fn matching<'a>(
        &'a self,
        entity: &str,
        keys: &[Value],
    ) -> Result<impl Iterator<Item = &'a Value>, StoreError> {
        let descriptor =
            self.catalog
                .descriptor(entity)
                .ok_or_else(|| StoreError::UnknownEntity {
                    name: entity.to_string(),
                })?;
        let key_field = descriptor
            .key_field()
            .ok_or_else(|| StoreError::NoKeyField {
                entity: entity.to_string(),
            })?
            .to_string();
        let keys: Vec<Value> = keys.to_vec();

        Ok(self
            .data
            .get(entity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter(move |record| {
                record
                    .get(&key_field)
                    .is_some_and(|key| keys.contains(key))
            }))
    }
}

/// Shape a stored hierarchical record according to a plan node: every
/// non-edge field passes through, expanded edges recurse into their
/// child arrays, wildcard edges pass children through unshaped.
fn project_deep(record: &Value, node: &PlanNode) -> Value {
    let Value::Object(fields) = record else {
        return record.clone();
    };

    let mut shaped = Map::with_capacity(fields.len());
    for (name, value) in fields {
        match node.edge(name).map(|edge| &edge.node) {
            Some(EdgeNode::Expanded(child)) => {
                let children = match value {
                    Value::Array(items) => Value::Array(
                        items.iter().map(|item| project_deep(item, child)).collect(),
                    ),
                    other => other.clone(),
                };
                shaped.insert(name.clone(), children);
            }
            Some(EdgeNode::Wildcard(_)) | None => {
                shaped.insert(name.clone(), value.clone());
            }
        }
    }
    Value::Object(shaped)
}

/// Keep only the requested columns of a stored record.
fn project_flat(record: &Value, columns: &[String]) -> Value {
    let mut shaped = Map::with_capacity(columns.len());
    if let Value::Object(fields) = record {
        for column in columns {
            if let Some(value) = fields.get(column) {
                shaped.insert(column.clone(), value.clone());
            }
        }
    }
    Value::Object(shaped)
}

impl RecordStore for MemoryStore {
    fn read_deep<'a>(
        &'a self,
        entity: &str,
        plan: &'a ProjectionPlan,
        keys: &[Value],
    ) -> Result<RecordIter<'a>, StoreError> {
        let records = self.matching(entity, keys)?;
        Ok(Box::new(
            records.map(move |record| Ok(project_deep(record, &plan.root))),
        ))
    }

    fn read_flat<'a>(
        &'a self,
        entity: &str,
        columns: &[String],
        keys: &[Value],
    ) -> Result<RecordIter<'a>, StoreError> {
        let records = self.matching(entity, keys)?;
        let columns = columns.to_vec();
        Ok(Box::new(
            records.map(move |record| Ok(project_flat(record, &columns))),
        ))
    }

    fn insert(&mut self, entity: &str, record: Value) -> Result<(), StoreError> {
        let descriptor =
            self.catalog
                .descriptor(entity)
                .ok_or_else(|| StoreError::UnknownEntity {
                    name: entity.to_string(),
                })?;

        if !record.is_object() {
            return Err(StoreError::InvalidRecord {
                entity: entity.to_string(),
                reason: "record is not a JSON object".to_string(),
            });
        }

        if let Some(key_field) = descriptor.key_field() {
            if let Some(key) = record.get(key_field) {
                let existing = self.data.get(entity).map(Vec::as_slice).unwrap_or(&[]);
                if existing.iter().any(|r| r.get(key_field) == Some(key)) {
                    return Err(StoreError::DuplicateKey {
                        entity: entity.to_string(),
                        key: key.to_string(),
                    });
                }
            }
        }

        self.data
            .entry(entity.to_string())
            .or_default()
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDescriptor, FieldDef};
    use crate::plan::Resolver;
    use serde_json::json;

    fn books_catalog() -> Catalog {
        Catalog::new(vec![
            EntityDescriptor::new("my.shop.Books")
                .with_field(FieldDef::key("ID"))
                .with_field(FieldDef::scalar("title"))
                .with_composition("texts", "Books.texts"),
            EntityDescriptor::new("my.shop.Books.texts")
                .with_field(FieldDef::key("ID"))
                .with_field(FieldDef::scalar("locale")),
        ])
        .unwrap()
    }

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new(books_catalog());
        store
            .insert(
                "my.shop.Books",
                json!({
                    "ID": 1,
                    "title": "Wuthering Heights",
                    "texts": [{"ID": 10, "locale": "de", "stale": true}]
                }),
            )
            .unwrap();
        store
            .insert("my.shop.Books", json!({"ID": 2, "title": "Jane Eyre"}))
            .unwrap();
        store
    }

    #[test]
    fn read_deep_filters_by_key_and_keeps_children() {
        let store = seeded_store();
        let plan = Resolver::new(store.catalog())
            .resolve_default("my.shop.Books")
            .unwrap();

        let records: Vec<Value> = store
            .read_deep("my.shop.Books", &plan, &[json!(1)])
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["title"], "Wuthering Heights");
        assert_eq!(records[0]["texts"][0]["locale"], "de");
    }

    #[test]
    fn read_flat_projects_requested_columns_only() {
        let store = seeded_store();
        let columns = vec!["ID".to_string(), "title".to_string()];

        let records: Vec<Value> = store
            .read_flat("my.shop.Books", &columns, &[json!(1), json!(2)])
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], json!({"ID": 1, "title": "Wuthering Heights"}));
        assert!(records[1].get("texts").is_none());
    }

    #[test]
    fn insert_rejects_duplicate_keys_and_non_objects() {
        let mut store = seeded_store();
        let err = store
            .insert("my.shop.Books", json!({"ID": 1, "title": "again"}))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));

        let err = store.insert("my.shop.Books", json!([1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord { .. }));

        let err = store.insert("my.shop.Orders", json!({})).unwrap_err();
        assert!(matches!(err, StoreError::UnknownEntity { .. }));
    }

    #[test]
    fn dataset_round_trip() {
        let store = seeded_store();
        let json = store.to_dataset_json().unwrap();
        let reloaded = MemoryStore::from_dataset_json(books_catalog(), &json).unwrap();
        assert_eq!(reloaded.records("my.shop.Books").len(), 2);
    }
}
