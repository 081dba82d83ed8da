//! Attribute codec - moves attribute values to and from `serde_json::Value`
//!
//! Scalars go through serde directly. Nested models and lists of nested
//! models recurse into the model encoder with the same scope and form as
//! the parent, so a nested field is persisted only when both the parent
//! attribute and the nested field belong to the requested scope.

use super::model::{self, StateModel};
use super::scope::ScopeFilter;
use crate::error::{Result, StateError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Target representation of an encode pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// Textual form: unset scalars are kept as `null`
    Text,
    /// Map form: unset scalars and nested objects are omitted
    Map,
}

pub fn encode_scalar<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Assign a decoded scalar.
///
/// `null` clears nullable values and leaves non-nullable ones untouched.
pub fn decode_scalar<T: DeserializeOwned>(name: &str, slot: &mut T, value: Value) -> Result<()> {
    if value.is_null() {
        if let Ok(cleared) = serde_json::from_value::<T>(Value::Null) {
            *slot = cleared;
        }
        return Ok(());
    }
    *slot = serde_json::from_value(value).map_err(|e| StateError::decode(name, e))?;
    Ok(())
}

pub fn encode_nested<N: StateModel>(
    value: &Option<N>,
    filter: ScopeFilter,
    form: Form,
) -> Result<Value> {
    match value {
        Some(nested) => Ok(Value::Object(model::encode_fields(nested, filter, form)?)),
        None => Ok(Value::Null),
    }
}

/// Decode a nested object, merging into the current value when present
pub fn decode_nested<N: StateModel>(
    name: &str,
    slot: &mut Option<N>,
    value: Value,
    filter: ScopeFilter,
) -> Result<()> {
    match value {
        Value::Null => {
            *slot = None;
            Ok(())
        }
        Value::Object(map) => {
            let mut nested = slot.clone().unwrap_or_default();
            model::apply_fields(&mut nested, &map, filter)?;
            *slot = Some(nested);
            Ok(())
        }
        other => Err(StateError::decode(
            name,
            format!("expected an object, found {}", value_kind(&other)),
        )),
    }
}

pub fn encode_list<N: StateModel>(items: &[N], filter: ScopeFilter, form: Form) -> Result<Value> {
    let encoded = items
        .iter()
        .map(|item| model::encode_fields(item, filter, form).map(Value::Object))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(encoded))
}

/// Decode a list of nested objects, replacing the current list
pub fn decode_list<N: StateModel>(
    name: &str,
    slot: &mut Vec<N>,
    value: Value,
    filter: ScopeFilter,
) -> Result<()> {
    let items = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => {
            return Err(StateError::decode(
                name,
                format!("expected an array, found {}", value_kind(&other)),
            ))
        }
    };

    let mut decoded = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let map = match item {
            Value::Object(map) => map,
            other => {
                return Err(StateError::decode(
                    name,
                    format!("element {} is {}, expected an object", index, value_kind(&other)),
                ))
            }
        };
        let mut nested = N::default();
        model::apply_fields(&mut nested, &map, filter)?;
        decoded.push(nested);
    }
    *slot = decoded;
    Ok(())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Scope;
    use crate::testing::ModelUser;
    use serde_json::json;

    #[test]
    fn test_scalar_encoding() {
        assert_eq!(encode_scalar(&"value".to_string()).unwrap(), json!("value"));
        assert_eq!(encode_scalar(&true).unwrap(), json!(true));
        assert_eq!(encode_scalar(&42i64).unwrap(), json!(42));
        assert_eq!(encode_scalar(&None::<String>).unwrap(), Value::Null);
    }

    #[test]
    fn test_null_clears_optional_scalar() {
        let mut slot = Some("value".to_string());
        decode_scalar("field", &mut slot, Value::Null).unwrap();
        assert_eq!(slot, None);
    }

    #[test]
    fn test_null_leaves_plain_scalar_untouched() {
        let mut slot = true;
        decode_scalar("flag", &mut slot, Value::Null).unwrap();
        assert!(slot);
    }

    #[test]
    fn test_scalar_type_mismatch_is_decode_error() {
        let mut slot = false;
        let err = decode_scalar("flag", &mut slot, json!("yes")).unwrap_err();
        assert!(matches!(err, StateError::Decode { ref attribute, .. } if attribute == "flag"));
        assert!(!slot);
    }

    #[test]
    fn test_empty_list_encodes_as_array() {
        let items: Vec<ModelUser> = Vec::new();
        assert_eq!(
            encode_list(&items, Scope::Session.into(), Form::Map).unwrap(),
            json!([])
        );
    }

    #[test]
    fn test_list_preserves_order() {
        let mut slot: Vec<ModelUser> = Vec::new();
        decode_list(
            "users",
            &mut slot,
            json!([{"field": "a"}, {"field": "b"}, {"field": "c"}]),
            Scope::Session.into(),
        )
        .unwrap();
        let fields: Vec<_> = slot.iter().map(|u| u.field.as_deref().unwrap()).collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_list_rejects_non_object_element() {
        let mut slot: Vec<ModelUser> = Vec::new();
        let err = decode_list("users", &mut slot, json!([{"field": "a"}, 3]), Scope::Session.into())
            .unwrap_err();
        assert!(err.to_string().contains("element 1"));
        assert!(slot.is_empty());
    }

    #[test]
    fn test_nested_uses_parent_scope() {
        let user = Some(ModelUser {
            field: Some("value".into()),
            ..Default::default()
        });
        assert_eq!(
            encode_nested(&user, Scope::User.into(), Form::Text).unwrap(),
            json!({"id": null, "field": "value"})
        );
        // ModelUser.field has no application scope
        assert_eq!(
            encode_nested(&user, Scope::Application.into(), Form::Text).unwrap(),
            json!({"id": null})
        );
        assert_eq!(
            encode_nested(&None::<ModelUser>, Scope::User.into(), Form::Text).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_nested_decode_merges_into_existing() {
        let mut slot = Some(ModelUser {
            field: Some("kept".into()),
            ..Default::default()
        });
        decode_nested("user", &mut slot, json!({"other": 1}), Scope::Session.into()).unwrap();
        assert_eq!(slot.unwrap().field.as_deref(), Some("kept"));

        let mut empty: Option<ModelUser> = Some(ModelUser::default());
        decode_nested("user", &mut empty, Value::Null, Scope::Session.into()).unwrap();
        assert!(empty.is_none());
    }
}
