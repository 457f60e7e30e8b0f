use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Field some API versions wrap their payload in.
pub const ENVELOPE_FIELD: &str = "data";

/// Errors produced when a single-record body cannot be normalized.
#[derive(Debug, Error)]
pub enum NormalizerError {
    #[error("response body is empty")]
    EmptyBody,
    #[error("response body does not match the record shape: {0}")]
    Json(#[from] serde_json::Error),
}

/// A response body that is either the payload itself or wraps it under [`ENVELOPE_FIELD`].
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Bare(Value),
    Wrapped(Value),
}

impl Envelope {
    /// Classifies a decoded body. Only objects carrying the envelope field count as wrapped.
    pub fn classify(body: Value) -> Self {
        match body {
            Value::Object(mut map) if map.contains_key(ENVELOPE_FIELD) => {
                Self::Wrapped(map.remove(ENVELOPE_FIELD).unwrap_or(Value::Null))
            }
            other => Self::Bare(other),
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, Self::Wrapped(_))
    }

    pub fn into_inner(self) -> Value {
        match self {
            Self::Bare(value) | Self::Wrapped(value) => value,
        }
    }
}

/// Outcome of normalizing a list response.
#[derive(Debug, Clone, PartialEq)]
pub enum ListShape<T> {
    Bare(Vec<T>),
    Wrapped(Vec<T>),
    /// The body matched neither shape; carries a description for diagnostics.
    Unrecognized(String),
}

impl<T> ListShape<T> {
    /// Collapses the outcome into a plain sequence, empty when unrecognized.
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped(items) => items,
            Self::Unrecognized(_) => Vec::new(),
        }
    }

    pub fn anomaly(&self) -> Option<&str> {
        match self {
            Self::Unrecognized(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Normalizes `[T]` and `{"data": [T]}` into a sequence, preserving server order.
pub fn normalize_list<T>(body: Value) -> ListShape<T>
where
    T: DeserializeOwned,
{
    let envelope = Envelope::classify(body);
    let wrapped = envelope.is_wrapped();
    let items = match envelope.into_inner() {
        Value::Array(items) => items,
        other if wrapped => {
            return ListShape::Unrecognized(format!(
                "`{ENVELOPE_FIELD}` holds {} instead of an array",
                json_kind(&other)
            ))
        }
        other => {
            return ListShape::Unrecognized(format!(
                "expected an array or an object with `{ENVELOPE_FIELD}`, got {}",
                json_kind(&other)
            ))
        }
    };

    match serde_json::from_value::<Vec<T>>(Value::Array(items)) {
        Ok(items) if wrapped => ListShape::Wrapped(items),
        Ok(items) => ListShape::Bare(items),
        Err(err) => ListShape::Unrecognized(format!("array items do not decode: {err}")),
    }
}

/// Normalizes `T` and `{"data": T}` into `T`.
pub fn normalize_record<T>(body: Value) -> Result<T, NormalizerError>
where
    T: DeserializeOwned,
{
    let inner = Envelope::classify(body).into_inner();
    if inner.is_null() {
        return Err(NormalizerError::EmptyBody);
    }
    Ok(serde_json::from_value(inner)?)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Department, Position};
    use serde_json::json;

    fn departments_json() -> Value {
        json!([
            { "id": 2, "nombre": "Ventas", "subcuenta": "100" },
            { "id": 1, "nombre": "Compras", "descripcion": "Proveedores", "subcuenta": "200" }
        ])
    }

    #[test]
    fn bare_array_is_returned_unchanged() {
        let shape = normalize_list::<Department>(departments_json());
        assert!(matches!(shape, ListShape::Bare(_)));

        let ids: Vec<_> = shape.into_items().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn wrapped_array_is_unwrapped_in_order() {
        let shape = normalize_list::<Department>(json!({ "data": departments_json() }));
        assert!(matches!(shape, ListShape::Wrapped(_)));

        let names: Vec<_> = shape.into_items().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Ventas", "Compras"]);
    }

    #[test]
    fn unknown_object_yields_empty_sequence() {
        let shape = normalize_list::<Department>(json!({ "foo": 1 }));
        assert!(shape.anomaly().is_some());
        assert!(shape.into_items().is_empty());
    }

    #[test]
    fn non_array_envelope_is_anomalous() {
        let shape = normalize_list::<Department>(json!({ "data": { "id": 1 } }));
        let reason = shape.anomaly().expect("anomaly").to_string();
        assert!(reason.contains("an object"), "{reason}");
        assert!(shape.into_items().is_empty());
    }

    #[test]
    fn undecodable_items_are_anomalous() {
        let shape = normalize_list::<Department>(json!([{ "id": "x" }]));
        assert!(shape.anomaly().is_some());
    }

    #[test]
    fn null_and_scalars_are_anomalous() {
        assert!(normalize_list::<Position>(Value::Null).anomaly().is_some());
        assert!(normalize_list::<Position>(json!("ok")).anomaly().is_some());
    }

    #[test]
    fn record_is_unwrapped_from_either_shape() {
        let record = json!({ "id": 9, "nombre": "Vendedor", "departamento_id": 2 });

        let bare: Position = normalize_record(record.clone()).expect("bare record");
        let wrapped: Position = normalize_record(json!({ "data": record })).expect("wrapped record");
        assert_eq!(bare, wrapped);
        assert_eq!(bare.department_id, Some(2));
    }

    #[test]
    fn empty_record_body_is_an_error() {
        let err = normalize_record::<Position>(Value::Null).expect_err("null body");
        assert!(matches!(err, NormalizerError::EmptyBody));

        let err = normalize_record::<Position>(json!({ "data": null })).expect_err("null data");
        assert!(matches!(err, NormalizerError::EmptyBody));
    }
}
