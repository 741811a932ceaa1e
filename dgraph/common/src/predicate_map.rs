//! Conversion of predicate maps into typed objects.
//!
//! Query results address predicates by their fully qualified name
//! (`Type.predicate`). This module folds those names back into plain field
//! names plus a `__typename` entry, and turns geo points
//! (`{"type": "Point", "coordinates": [lon, lat]}`) into
//! `{"__typename": "Point", "latitude": .., "longitude": ..}`.

use miette::Diagnostic;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::{POINT_TYPENAME, TYPENAME_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum PredicateMapError {
    #[error("invalid coordinates")]
    #[diagnostic(help("a point needs exactly two coordinates: [longitude, latitude]"))]
    InvalidCoordinates,

    #[error("invalid point")]
    #[diagnostic(help("a point object may only contain `type` and `coordinates`"))]
    InvalidPoint,

    #[error("invalid typename: expected `{expected}`, found `{found}`")]
    InvalidTypename { expected: String, found: String },

    #[error("result `{0}` is not a list")]
    NotAList(String),

    #[error("query data is not an object")]
    NotAnObject,
}

/// Converts one predicate-map value, recursing into objects and arrays.
pub fn from_predicate_map(value: &Value) -> Result<Value, PredicateMapError> {
    match value {
        Value::Object(obj) => convert_object(obj),
        Value::Array(items) => items
            .iter()
            .map(from_predicate_map)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        scalar => Ok(scalar.clone()),
    }
}

/// Converts every result list of a query response's `data`.
pub fn convert_query_data(data: &Value) -> Result<Map<String, Value>, PredicateMapError> {
    let obj = match data {
        Value::Null => return Ok(Map::new()),
        Value::Object(obj) => obj,
        _ => return Err(PredicateMapError::NotAnObject),
    };
    obj.iter()
        .map(|(key, value)| match value {
            Value::Array(_) => Ok((key.clone(), from_predicate_map(value)?)),
            _ => Err(PredicateMapError::NotAList(key.clone())),
        })
        .collect()
}

fn is_point(obj: &Map<String, Value>) -> bool {
    obj.contains_key("type") || obj.contains_key("coordinates")
}

fn convert_point(obj: &Map<String, Value>) -> Result<Value, PredicateMapError> {
    if obj.keys().any(|k| k != "type" && k != "coordinates") {
        return Err(PredicateMapError::InvalidPoint);
    }
    let mut point = Map::new();
    point.insert(TYPENAME_KEY.into(), Value::String(POINT_TYPENAME.into()));
    if let Some(coordinates) = obj.get("coordinates") {
        match coordinates.as_array().map(Vec::as_slice) {
            Some([longitude, latitude]) => {
                point.insert("latitude".into(), latitude.clone());
                point.insert("longitude".into(), longitude.clone());
            }
            _ => return Err(PredicateMapError::InvalidCoordinates),
        }
    }
    Ok(Value::Object(point))
}

fn convert_object(obj: &Map<String, Value>) -> Result<Value, PredicateMapError> {
    if is_point(obj) {
        return convert_point(obj);
    }
    let mut typename: Option<&str> = None;
    let mut converted = Map::new();
    for (key, value) in obj {
        if key == "uid" {
            converted.insert(key.clone(), value.clone());
            continue;
        }
        match key.split_once('.') {
            Some((ty, predicate)) if !predicate.is_empty() => {
                match typename {
                    Some(expected) if expected != ty => {
                        return Err(PredicateMapError::InvalidTypename {
                            expected: expected.to_owned(),
                            found: ty.to_owned(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        typename = Some(ty);
                        converted.insert(TYPENAME_KEY.into(), Value::String(ty.to_owned()));
                    }
                }
                converted.insert(predicate.to_owned(), from_predicate_map(value)?);
            }
            _ => {
                converted.insert(key.clone(), from_predicate_map(value)?);
            }
        }
    }
    Ok(Value::Object(converted))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn gym_predicate_map() -> Value {
        json!({
            "Gym.name": "Planet Fitness",
            "Gym.street": "123 Main St",
            "Gym.city": "Anytown",
            "Gym.state": "NY",
            "Gym.zipCode": "12345",
            "Gym.location": { "type": "Point", "coordinates": [-73.456, 40.123] }
        })
    }

    fn gym() -> Value {
        json!({
            "__typename": "Gym",
            "name": "Planet Fitness",
            "street": "123 Main St",
            "city": "Anytown",
            "state": "NY",
            "zipCode": "12345",
            "location": { "__typename": "Point", "latitude": 40.123, "longitude": -73.456 }
        })
    }

    #[test]
    fn test_invalid_points() {
        let too_many = json!({ "type": "Point", "coordinates": [0, 0, 0] });
        assert_eq!(
            from_predicate_map(&too_many),
            Err(PredicateMapError::InvalidCoordinates)
        );

        let extra_field = json!({ "type": "Point", "coordinates": [0, 0], "otherField": "hi" });
        assert_eq!(
            from_predicate_map(&extra_field),
            Err(PredicateMapError::InvalidPoint)
        );
    }

    #[test]
    fn test_invalid_typename() {
        let mixed = json!({
            "User.firstName": "John",
            "User.id": "1",
            "NotUser.createdAt": 1700000000000u64
        });
        assert!(matches!(
            from_predicate_map(&mixed),
            Err(PredicateMapError::InvalidTypename { .. })
        ));
    }

    #[test]
    fn test_convert_basic_types() {
        assert_eq!(from_predicate_map(&gym_predicate_map()).unwrap(), gym());

        let user = json!({
            "uid": "0x2",
            "User.firstName": "John",
            "User.createdAt": 1700000000000u64,
            "User.gym": { "uid": "0x1", "Gym.name": "Planet Fitness" }
        });
        assert_eq!(
            from_predicate_map(&user).unwrap(),
            json!({
                "__typename": "User",
                "uid": "0x2",
                "firstName": "John",
                "createdAt": 1700000000000u64,
                "gym": { "__typename": "Gym", "uid": "0x1", "name": "Planet Fitness" }
            })
        );
    }

    #[test]
    fn test_scalars_and_untyped_keys_pass_through() {
        assert_eq!(from_predicate_map(&json!("x")).unwrap(), json!("x"));
        assert_eq!(from_predicate_map(&Value::Null).unwrap(), Value::Null);
        assert_eq!(
            from_predicate_map(&json!({ "name": "Alice" })).unwrap(),
            json!({ "name": "Alice" })
        );
    }

    #[test]
    fn test_convert_query_data() {
        let data = json!({ "gyms": [gym_predicate_map()] });
        let converted = convert_query_data(&data).unwrap();
        assert_eq!(converted["gyms"], json!([gym()]));

        assert!(convert_query_data(&Value::Null).unwrap().is_empty());
        assert_eq!(
            convert_query_data(&json!({ "count": 3 })),
            Err(PredicateMapError::NotAList("count".into()))
        );
    }
}
