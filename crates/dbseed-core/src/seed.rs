//! Typed seed data: collection names mapped to homogeneous record lists.
//!
//! Seed data is validated when it is loaded, so every later stage works
//! with well-formed collection names and object-shaped records.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::validation::{validate_collection_name, validate_field_name};

/// Field holding a record's primary key.
pub const ID_FIELD: &str = "_id";

/// A validated collection name.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    /// Validate and wrap a collection name.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        validate_collection_name(&name)?;
        Ok(Self(name))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CollectionName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionName> for String {
    fn from(name: CollectionName) -> Self {
        name.0
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionName({:?})", self.0)
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single JSON-object record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wrap a JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Convert a JSON value, failing unless it is an object.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(format!("expected an object, got {}", json_kind(&other))),
        }
    }

    /// Check every top-level field name.
    pub fn validate(&self) -> Result<(), String> {
        self.0.keys().try_for_each(|k| validate_field_name(k))
    }

    /// The record's `_id`, if present.
    pub fn id(&self) -> Option<&Value> {
        self.0.get(ID_FIELD)
    }

    /// The `_id` rendered as compact JSON, the form used to compare keys.
    ///
    /// `1` and `"1"` are different keys.
    pub fn id_key(&self) -> Option<String> {
        self.id().map(Value::to_string)
    }

    /// Set `_id` from `next` unless the record already has one.
    ///
    /// Returns true if an id was assigned.
    pub fn ensure_id(&mut self, next: impl FnOnce() -> u64) -> bool {
        if self.0.contains_key(ID_FIELD) {
            return false;
        }
        self.0.insert(ID_FIELD.to_string(), Value::from(next()));
        true
    }

    /// Look up a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Borrow the underlying object.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Seed data: collection name to records, validated at load time.
///
/// Collections iterate in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedData {
    collections: BTreeMap<CollectionName, Vec<Record>>,
}

impl SeedData {
    /// Create empty seed data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse seed data from a JSON document.
    ///
    /// The document must be an object mapping collection names to arrays
    /// of objects.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Build seed data from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let Value::Object(root) = value else {
            return Err(CoreError::MalformedSeedData(format!(
                "top level must be an object, got {}",
                json_kind(&value)
            )));
        };

        let mut data = SeedData::new();
        for (name, records) in root {
            let collection = CollectionName::new(name)?;
            let Value::Array(items) = records else {
                return Err(CoreError::MalformedSeedData(format!(
                    "collection {} must be an array, got {}",
                    collection,
                    json_kind(&records)
                )));
            };

            let mut parsed = Vec::with_capacity(items.len());
            let mut ids = HashSet::new();
            for (index, item) in items.into_iter().enumerate() {
                let record = Record::from_value(item)
                    .and_then(|r| r.validate().map(|_| r))
                    .and_then(|r| match r.id_key() {
                        Some(key) if !ids.insert(key.clone()) => {
                            Err(format!("duplicate {} {}", ID_FIELD, key))
                        }
                        _ => Ok(r),
                    })
                    .map_err(|reason| CoreError::InvalidRecord {
                        collection: collection.to_string(),
                        index,
                        reason,
                    })?;
                parsed.push(record);
            }
            data.collections.insert(collection, parsed);
        }

        Ok(data)
    }

    /// Add records to a collection, appending to any already present.
    pub fn insert(&mut self, collection: CollectionName, records: Vec<Record>) {
        self.collections.entry(collection).or_default().extend(records);
    }

    /// Records for a collection.
    pub fn get(&self, collection: &str) -> Option<&[Record]> {
        self.collections
            .iter()
            .find(|(name, _)| name.as_str() == collection)
            .map(|(_, records)| records.as_slice())
    }

    /// Iterate collections in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&CollectionName, &[Record])> {
        self.collections.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of collections.
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// True when no collection is present.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Total number of records across collections.
    pub fn total_records(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

impl IntoIterator for SeedData {
    type Item = (CollectionName, Vec<Record>);
    type IntoIter = std::collections::btree_map::IntoIter<CollectionName, Vec<Record>>;

    fn into_iter(self) -> Self::IntoIter {
        self.collections.into_iter()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
