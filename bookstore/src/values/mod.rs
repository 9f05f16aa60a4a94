// Attribute sets: the untyped key/value payload of create and update calls

use crate::schema::{Column, Field, StorageType};
use crate::validation::{ValidationError, ValidationReason};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single attribute value as handed over by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Integer(i64),
    Text(String),
}

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Integer view of the value. Text is accepted when it parses as an integer.
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(n) => Some(*n),
            AttrValue::Text(s) => s.trim().parse().ok(),
            AttrValue::Null => None,
        }
    }

    /// Text view of the value. Integers render as decimal text.
    pub fn to_text(&self) -> Option<String> {
        match self {
            AttrValue::Text(s) => Some(s.clone()),
            AttrValue::Integer(n) => Some(n.to_string()),
            AttrValue::Null => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::Null => serde_json::Value::Null,
            AttrValue::Integer(n) => serde_json::Value::from(*n),
            AttrValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Integer(n)
    }
}

impl From<i32> for AttrValue {
    fn from(n: i32) -> Self {
        AttrValue::Integer(n.into())
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttrValue::Null)
    }
}

impl ToSql for AttrValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            AttrValue::Null => ToSqlOutput::Owned(SqlValue::Null),
            AttrValue::Integer(n) => ToSqlOutput::from(*n),
            AttrValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// A partial mapping of field to value, keyed by known fields only.
///
/// Keys are checked when the set is built from untyped input: unknown keys and
/// the system-assigned `id` never make it into a set. Values are checked later
/// by the [validator](crate::validation).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    values: BTreeMap<Field, AttrValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: Field, value: impl Into<AttrValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: Field, value: impl Into<AttrValue>) -> Option<AttrValue> {
        self.values.insert(field, value.into())
    }

    pub fn remove(&mut self, field: Field) -> Option<AttrValue> {
        self.values.remove(&field)
    }

    pub fn get(&self, field: Field) -> Option<&AttrValue> {
        self.values.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fields and values in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &AttrValue)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }

    /// Build a set from string keys, as supplied by a UI form or command line.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue>,
    {
        let mut set = AttributeSet::new();
        for (key, value) in pairs {
            let field = resolve_key(key.as_ref())?;
            set.insert(field, value);
        }
        Ok(set)
    }

    /// Build a set from a JSON object. Only strings, integers and null are
    /// accepted as values.
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Result<Self, ValidationError> {
        let mut set = AttributeSet::new();
        for (key, value) in object {
            let field = resolve_key(key)?;
            let value = match value {
                serde_json::Value::Null => AttrValue::Null,
                serde_json::Value::String(s) => AttrValue::Text(s.clone()),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => AttrValue::Integer(i),
                    None => return Err(ValidationError::new(field, type_mismatch(field))),
                },
                _ => return Err(ValidationError::new(field, type_mismatch(field))),
            };
            set.insert(field, value);
        }
        Ok(set)
    }

    /// Copy of the set with every value converted to its column's storage
    /// type. Values that do not convert are kept as given; run the validator
    /// first.
    pub fn normalized(&self) -> AttributeSet {
        let values = self
            .values
            .iter()
            .map(|(field, value)| {
                let converted = match (field.storage_type(), value) {
                    (_, AttrValue::Null) => AttrValue::Null,
                    (StorageType::Integer, v) => {
                        v.to_integer().map(AttrValue::Integer).unwrap_or_else(|| v.clone())
                    }
                    (StorageType::Text, v) => {
                        v.to_text().map(AttrValue::Text).unwrap_or_else(|| v.clone())
                    }
                };
                (*field, converted)
            })
            .collect();
        AttributeSet { values }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .values
            .iter()
            .map(|(field, value)| (field.as_str().to_string(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl FromIterator<(Field, AttrValue)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (Field, AttrValue)>>(iter: I) -> Self {
        AttributeSet {
            values: iter.into_iter().collect(),
        }
    }
}

fn resolve_key(key: &str) -> Result<Field, ValidationError> {
    if let Some(field) = Field::from_key(key) {
        return Ok(field);
    }
    let reason = if Column::from_name(key) == Some(Column::Id) {
        ValidationReason::ReadOnly
    } else {
        ValidationReason::UnknownField
    };
    Err(ValidationError::new(key, reason))
}

fn type_mismatch(field: Field) -> ValidationReason {
    match field.storage_type() {
        StorageType::Integer => ValidationReason::NotAnInteger,
        StorageType::Text => ValidationReason::NotText,
    }
}
