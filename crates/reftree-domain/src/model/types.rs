//! Core entity and identity types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the field carrying an entity's own identifier.
pub const ID_FIELD: &str = "id";

/// An entity identifier (e.g., "address_01").
///
/// Numeric ids found in JSON payloads are stored in their decimal form so
/// that `7` and `"7"` address the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new EntityId.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reads an id out of a JSON value.
    ///
    /// Returns `None` for null, empty strings and any non-scalar value.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The value found under a relation key of a parent object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationValue {
    /// The parent references the entity with this id.
    Id(EntityId),
    /// The key is absent, null, empty or not an id.
    Missing,
}

/// An opaque record with at least an `id` field.
///
/// The resolver treats entities as values: it never mutates one it has been
/// given, and the cache hands out clones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    /// Wraps a JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Converts a JSON value into an entity if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Returns the entity's own id, if it carries one.
    pub fn id(&self) -> Option<EntityId> {
        self.0.get(ID_FIELD).and_then(EntityId::from_json)
    }

    /// Reads the id referenced under `relation`.
    pub fn relation(&self, relation: &str) -> RelationValue {
        self.0
            .get(relation)
            .and_then(EntityId::from_json)
            .map_or(RelationValue::Missing, RelationValue::Id)
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the entity, returning it as a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Identity of a root fetch call, used as the root memo key.
///
/// Two plans carrying the same identity share one memoised root result, so
/// the identity must capture everything that changes what the root fetch
/// returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallIdentity(String);

impl CallIdentity {
    /// Creates an identity from an explicit name (e.g., "parcels:list").
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derives an identity from a name and the static parameters of the call.
    ///
    /// Parameters are rendered as canonical JSON (object keys sorted), so
    /// structurally equal parameters always produce the same identity.
    pub fn from_params<P>(name: &str, params: &P) -> Result<Self, serde_json::Error>
    where
        P: Serialize + ?Sized,
    {
        let canonical = serde_json::to_value(params)?;
        Ok(Self(format!("{}:{}", name, canonical)))
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        Entity::from_value(value).unwrap()
    }

    #[test]
    fn test_entity_id_from_string_and_number() {
        assert_eq!(
            EntityId::from_json(&json!("a1")),
            Some(EntityId::from("a1"))
        );
        assert_eq!(EntityId::from_json(&json!(42)), Some(EntityId::from("42")));
    }

    #[test]
    fn test_entity_id_rejects_null_empty_and_composites() {
        assert_eq!(EntityId::from_json(&Value::Null), None);
        assert_eq!(EntityId::from_json(&json!("")), None);
        assert_eq!(EntityId::from_json(&json!(true)), None);
        assert_eq!(EntityId::from_json(&json!(["a1"])), None);
        assert_eq!(EntityId::from_json(&json!({"id": "a1"})), None);
    }

    #[test]
    fn test_relation_reads_id_or_missing() {
        let parcel = entity(json!({"id": "p1", "address": "a1", "collect": null}));
        assert_eq!(
            parcel.relation("address"),
            RelationValue::Id(EntityId::from("a1"))
        );
        assert_eq!(parcel.relation("collect"), RelationValue::Missing);
        assert_eq!(parcel.relation("stats"), RelationValue::Missing);
    }

    #[test]
    fn test_entity_from_value_requires_object() {
        assert!(Entity::from_value(json!([1, 2])).is_none());
        assert!(Entity::from_value(json!("p1")).is_none());
        assert_eq!(entity(json!({"id": 7})).id(), Some(EntityId::from("7")));
    }

    #[test]
    fn test_call_identity_from_params_is_key_order_independent() {
        let a = CallIdentity::from_params("parcels", &json!({"page": 1, "org": "o1"})).unwrap();
        let b = CallIdentity::from_params("parcels", &json!({"org": "o1", "page": 1})).unwrap();
        let c = CallIdentity::from_params("parcels", &json!({"org": "o1", "page": 2})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("parcels:"));
    }

    #[test]
    fn test_entity_serializes_transparently() {
        let value = json!({"id": "a1", "name": "name_a1"});
        let parsed: Entity = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(parsed.id(), Some(EntityId::from("a1")));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), value);
    }
}
