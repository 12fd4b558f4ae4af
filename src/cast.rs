//! Public entry points: wire text → validated internal value and back.
//!
//! ```
//! use json_cast::{cast, uncast, Additional, FieldSpec, SchemaRegistry, Ty};
//!
//! let registry = SchemaRegistry::new()
//!     .with("Distance", Ty::object(
//!         [FieldSpec::same("miles", Ty::number()), FieldSpec::new("km", "kilometers", Ty::number())],
//!         Additional::Reject,
//!     ))
//!     .unwrap();
//!
//! let value = cast(&registry, r#"{"miles": 5, "km": 8}"#, "Distance").unwrap();
//! assert_eq!(value["kilometers"], 8);
//!
//! let text = uncast(&registry, &value, "Distance").unwrap();
//! assert!(text.contains("\"km\": 8"));
//! ```
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::ir::Direction;
use crate::path_de::{from_value_with_path, to_value_with_path};
use crate::registry::SchemaRegistry;
use crate::transform::Transformer;

/// Parse `text` and validate it against the schema named `root`.
pub fn cast(registry: &SchemaRegistry, text: &str, root: &str) -> Result<Value> {
    let value = serde_json::from_str::<Value>(text).map_err(Error::MalformedInput)?;
    cast_value(registry, &value, root)
}

pub fn cast_value(registry: &SchemaRegistry, value: &Value, root: &str) -> Result<Value> {
    run(registry, value, root, Direction::Cast)
}

/// Validate an internal value against `root` and render it as indented wire JSON.
pub fn uncast(registry: &SchemaRegistry, value: &Value, root: &str) -> Result<String> {
    let wire = uncast_value(registry, value, root)?;
    serde_json::to_string_pretty(&wire).map_err(Error::Output)
}

pub fn uncast_value(registry: &SchemaRegistry, value: &Value, root: &str) -> Result<Value> {
    run(registry, value, root, Direction::Uncast)
}

/// [`cast`], then deserialize the validated value into `T`.
pub fn cast_into<T: DeserializeOwned>(registry: &SchemaRegistry, text: &str, root: &str) -> Result<T> {
    from_value_with_path(cast(registry, text, root)?)
}

/// Serialize `value`, then [`uncast`] it.
pub fn uncast_from<T: Serialize>(registry: &SchemaRegistry, value: &T, root: &str) -> Result<String> {
    uncast(registry, &to_value_with_path(value)?, root)
}

fn run(registry: &SchemaRegistry, value: &Value, root: &str, direction: Direction) -> Result<Value> {
    let ty = registry.resolve(root)?;
    tracing::debug!(schema = root, ?direction, "transforming document");
    let out = Transformer::new(registry, direction).run(value, ty);
    if let Err(error) = &out {
        tracing::debug!(schema = root, ?direction, %error, "document rejected");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::ir::{Additional, FieldSpec, Ty};
    use serde::Deserialize;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with("Doc", Ty::object(
                [
                    FieldSpec::new("flight_no", "flightNo", Ty::string()),
                    FieldSpec::same("co2", Ty::map(Ty::number())),
                ],
                Additional::Reject,
            ))
            .unwrap()
    }

    #[test]
    fn malformed_text_fails_before_validation() {
        let err = cast(&registry(), "{\"flight_no\": ", "Doc").unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
        // even with an unknown root, parsing comes first
        let err = cast(&registry(), "nope", "Ghost").unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn unknown_root_is_a_schema_error() {
        let err = cast(&registry(), "{}", "Ghost").unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::UnknownSchema { .. })));
    }

    #[test]
    fn round_trip_keeps_shape() {
        let reg = registry();
        let wire = json!({"flight_no": "AV 24", "co2": {"economy": 120.5, "business": 301}});
        let internal = cast(&reg, &wire.to_string(), "Doc").unwrap();
        assert_eq!(internal, json!({"flightNo": "AV 24", "co2": {"economy": 120.5, "business": 301}}));

        let text = uncast(&reg, &internal, "Doc").unwrap();
        assert!(text.starts_with("{\n  \"flight_no\": \"AV 24\""));
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), wire);
    }

    #[test]
    fn typed_layer() {
        #[derive(Debug, Deserialize, Serialize, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct Doc {
            flight_no: String,
            co2: indexmap::IndexMap<String, f64>,
        }

        let reg = registry();
        let doc: Doc = cast_into(&reg, r#"{"flight_no": "CM 101", "co2": {"eco": 1.5}}"#, "Doc").unwrap();
        assert_eq!(doc.flight_no, "CM 101");

        let text = uncast_from(&reg, &doc, "Doc").unwrap();
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"flight_no": "CM 101", "co2": {"eco": 1.5}}));
    }
}
