//! Declarative per-doctype access policy: operation flags, field
//! visibility, and write conditions.
//!
//! Payloads are schema-free documents (`serde_json` maps), so the same
//! policy machinery applies to any doctype without reflection. The
//! condition language is a closed variant set (`OneOf` / `NotIn`), not
//! free-form expressions, which keeps evaluation total and safe.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DenialReason, DocGateError, Result};

/// Schema-free document payload: field name -> tagged JSON value.
pub type Document = serde_json::Map<String, Value>;

/// The four gated operations. Closed set; unknown names are a parse
/// error at config load, never a runtime branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// True for operations that carry a candidate payload to the backend.
    pub fn is_write(self) -> bool {
        !matches!(self, Operation::Read)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field predicate in a condition set.
///
/// Accepted config shapes:
/// - a bare list `["A", "B"]`            => `OneOf`
/// - a map `{ "in": ["A", "B"] }`        => `OneOf`
/// - a map `{ "not_in": ["Disabled"] }`  => `NotIn`
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field must be present and its value a member of the list.
    OneOf(Vec<Value>),
    /// Field value must not be a member. A missing field passes.
    NotIn(Vec<Value>),
}

impl Predicate {
    /// Evaluate against the (possibly absent) submitted field value.
    pub fn check(&self, value: Option<&Value>) -> bool {
        match self {
            Predicate::OneOf(allowed) => value.is_some_and(|v| allowed.contains(v)),
            Predicate::NotIn(forbidden) => value.map_or(true, |v| !forbidden.contains(v)),
        }
    }
}

fn render_values(values: &[Value]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[unrenderable]".to_string())
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::OneOf(v) => write!(f, "in {}", render_values(v)),
            Predicate::NotIn(v) => write!(f, "not_in {}", render_values(v)),
        }
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Predicate::OneOf(values) => values.serialize(serializer),
            Predicate::NotIn(values) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("not_in", values)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct PredicateVisitor;

        impl<'de> Visitor<'de> for PredicateVisitor {
            type Value = Predicate;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a value list, or a map with a single \"in\" or \"not_in\" key")
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<Predicate, A::Error> {
                let mut values = Vec::new();
                while let Some(v) = seq.next_element::<Value>()? {
                    values.push(v);
                }
                Ok(Predicate::OneOf(values))
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Predicate, A::Error> {
                let Some((key, values)) = map.next_entry::<String, Vec<Value>>()? else {
                    return Err(de::Error::custom("empty predicate map"));
                };
                if map.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom(
                        "predicate map must have exactly one key",
                    ));
                }
                match key.as_str() {
                    "in" => Ok(Predicate::OneOf(values)),
                    "not_in" => Ok(Predicate::NotIn(values)),
                    other => Err(de::Error::custom(format!(
                        "unsupported predicate operator: {other}"
                    ))),
                }
            }
        }

        deserializer.deserialize_any(PredicateVisitor)
    }
}

/// Field-keyed predicates for one operation. All predicates must pass
/// (logical AND); an empty set always passes. Declaration order is
/// preserved so the first failing field is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionSet {
    rules: Vec<(String, Predicate)>,
}

impl ConditionSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Predicate)> {
        self.rules.iter()
    }

    /// Pure evaluation against a candidate payload. Returns the first
    /// failing rule in declaration order, or `Ok` when all pass.
    pub fn evaluate(&self, payload: &Document) -> std::result::Result<(), DenialReason> {
        for (field, predicate) in &self.rules {
            if !predicate.check(payload.get(field)) {
                return Err(DenialReason::ConditionNotMet {
                    field: field.clone(),
                    predicate: predicate.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Serialize for ConditionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for (field, predicate) in &self.rules {
            map.serialize_entry(field, predicate)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConditionSet {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = ConditionSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field name to predicate")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<ConditionSet, A::Error> {
                let mut rules: Vec<(String, Predicate)> = Vec::new();
                while let Some((field, predicate)) = map.next_entry::<String, Predicate>()? {
                    if rules.iter().any(|(f, _)| f == &field) {
                        return Err(de::Error::custom(format!(
                            "duplicate condition field: {field}"
                        )));
                    }
                    rules.push((field, predicate));
                }
                Ok(ConditionSet { rules })
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}

/// Per-operation condition sets. Read carries no conditions: conditions
/// gate candidate payloads, and reads have none.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Conditions {
    pub create: ConditionSet,
    pub update: ConditionSet,
    pub delete: ConditionSet,
}

impl Conditions {
    pub fn for_operation(&self, op: Operation) -> Option<&ConditionSet> {
        match op {
            Operation::Read => None,
            Operation::Create => Some(&self.create),
            Operation::Update => Some(&self.update),
            Operation::Delete => Some(&self.delete),
        }
    }
}

/// Per-operation allow flags. Absent flag => default deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OperationFlags {
    pub read: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl OperationFlags {
    pub fn allows(&self, op: Operation) -> bool {
        match op {
            Operation::Read => self.read,
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// Field visibility for a doctype, as reported to callers.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAccess {
    /// No allow-list configured; only `restricted_fields` applies.
    All,
    /// Allow-list configured (restricted fields already removed).
    Only(Vec<String>),
}

/// Declarative access policy for one doctype.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DoctypePolicy {
    pub operations: OperationFlags,
    /// Optional allow-list. When present, any field not listed is
    /// stripped from reads and rejected on writes.
    pub allowed_fields: Option<Vec<String>>,
    /// Always stripped/rejected, applied after `allowed_fields`.
    /// Restriction wins over the allow-list.
    pub restricted_fields: Vec<String>,
    pub conditions: Conditions,
}

impl DoctypePolicy {
    /// Whether a single field survives filtering.
    pub fn field_allowed(&self, field: &str) -> bool {
        if self.restricted_fields.iter().any(|f| f == field) {
            return false;
        }
        match &self.allowed_fields {
            Some(allowed) => allowed.iter().any(|f| f == field),
            None => true,
        }
    }

    /// Field-restricted copy of a document. Never mutates the input;
    /// idempotent (filtering a filtered document is a no-op).
    pub fn filter_fields(&self, doc: &Document) -> Document {
        doc.iter()
            .filter(|(k, _)| self.field_allowed(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Effective visibility: the allow-list minus restricted fields,
    /// or `All` when no allow-list is configured.
    pub fn field_access(&self) -> FieldAccess {
        match &self.allowed_fields {
            None => FieldAccess::All,
            Some(allowed) => FieldAccess::Only(
                allowed
                    .iter()
                    .filter(|f| !self.restricted_fields.contains(f))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

/// Immutable doctype -> policy mapping, loaded once at startup.
/// Concurrent reads need no locking; share via `Arc`.
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    policies: BTreeMap<String, DoctypePolicy>,
}

impl PolicyStore {
    pub fn new(policies: BTreeMap<String, DoctypePolicy>) -> Result<Self> {
        for name in policies.keys() {
            if name.trim().is_empty() {
                return Err(DocGateError::Config(
                    "policy doctype name must not be empty".to_string(),
                ));
            }
            // '|' delimits doctype segments in derived keys; a name
            // containing it would alias another doctype's entries.
            if name.contains('|') {
                return Err(DocGateError::Config(format!(
                    "policy doctype name must not contain '|': {name}"
                )));
            }
        }
        Ok(Self { policies })
    }

    pub fn get(&self, doctype: &str) -> Option<&DoctypePolicy> {
        self.policies.get(doctype)
    }

    /// Configured doctype names in stable (sorted) order.
    pub fn doctypes(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
