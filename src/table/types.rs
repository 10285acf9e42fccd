//! Table data model
//!
//! Items are ordered maps from attribute name to a typed [`AttributeValue`],
//! serialized in the tagged JSON form used by the remote store
//! (`{"id": {"S": "42"}}`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single row of the table.
///
/// `BTreeMap` keeps attribute order deterministic, which makes key
/// projections and exported JSON stable across runs.
pub type Item = BTreeMap<String, AttributeValue>;

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    #[serde(rename = "S")]
    S(String),
    /// Number, kept in its decimal string form
    #[serde(rename = "N")]
    N(String),
    /// Binary, base64 encoded
    #[serde(rename = "B")]
    B(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "M")]
    M(BTreeMap<String, AttributeValue>),
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "BS")]
    Bs(Vec<String>),
}

impl AttributeValue {
    /// Whether this value can be part of a primary key.
    pub fn is_scalar_key(&self) -> bool {
        matches!(
            self,
            AttributeValue::S(_) | AttributeValue::N(_) | AttributeValue::B(_)
        )
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::N(value.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Role of an attribute in the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyType {
    /// Partition key
    Hash,
    /// Sort key
    Range,
}

/// One entry of the table's key schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyAttribute {
    pub attribute_name: String,
    pub key_type: KeyType,
}

impl KeyAttribute {
    pub fn hash(name: impl Into<String>) -> Self {
        Self {
            attribute_name: name.into(),
            key_type: KeyType::Hash,
        }
    }

    pub fn range(name: impl Into<String>) -> Self {
        Self {
            attribute_name: name.into(),
            key_type: KeyType::Range,
        }
    }
}

/// Ordered primary key description of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeySchema(Vec<KeyAttribute>);

impl KeySchema {
    pub fn new(attributes: Vec<KeyAttribute>) -> Self {
        Self(attributes)
    }

    /// Key attribute names in schema order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|a| a.attribute_name.as_str())
    }

    pub fn attributes(&self) -> &[KeyAttribute] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for KeySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|a| {
                let role = match a.key_type {
                    KeyType::Hash => "HASH",
                    KeyType::Range => "RANGE",
                };
                format!("{}:{}", a.attribute_name, role)
            })
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Provisioned throughput reported by table metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionedThroughput {
    pub read_capacity_units: u64,
    #[serde(default)]
    pub write_capacity_units: u64,
}

/// Opaque scan resume position.
///
/// Wraps the last evaluated key of a page. The export core only hands it
/// back to the service; [`crate::table::TableService`] implementations
/// create and read it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationToken(Item);

impl ContinuationToken {
    pub fn new(last_evaluated_key: Item) -> Self {
        Self(last_evaluated_key)
    }

    pub fn last_evaluated_key(&self) -> &Item {
        &self.0
    }
}

/// Build an [`Item`] from `(name, value)` pairs.
pub fn item<I, K, V>(pairs: I) -> Item
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttributeValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
