//! Property-based tests for entity types.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::{json, Value};

    use crate::model::{CallIdentity, Entity, EntityId, RelationValue};

    /// Strategy to generate non-empty string ids like "address_01"
    fn string_id_strategy() -> impl Strategy<Value = String> {
        "[a-z]{1,10}_[0-9]{1,4}"
    }

    proptest! {
        #[test]
        fn test_string_ids_roundtrip_through_relation(id in string_id_strategy()) {
            let parent = Entity::from_value(json!({"id": "p", "address": id.clone()})).unwrap();
            prop_assert_eq!(parent.relation("address"), RelationValue::Id(EntityId::new(id)));
        }

        #[test]
        fn test_numeric_ids_match_their_decimal_string(n in any::<u64>()) {
            let numeric = EntityId::from_json(&json!(n));
            let textual = EntityId::from_json(&Value::String(n.to_string()));
            prop_assert!(numeric.is_some());
            prop_assert_eq!(numeric, textual);
        }

        #[test]
        fn test_booleans_are_never_ids(b in any::<bool>()) {
            prop_assert_eq!(EntityId::from_json(&json!(b)), None);
        }

        #[test]
        fn test_identity_from_params_is_deterministic(page in 0u32..1000, org in "[a-z]{1,8}") {
            let params = json!({"page": page, "org": org});
            let a = CallIdentity::from_params("parcels", &params).unwrap();
            let b = CallIdentity::from_params("parcels", &params.clone()).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
