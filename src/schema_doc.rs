//! Schema documents: a registry written down as JSON.
//!
//! The document is an object from schema name to node. Nodes use the compact
//! type-map encoding, where a primitive is given by a sample value:
//!
//! | node                                   | meaning                               |
//! |----------------------------------------|---------------------------------------|
//! | `""` (any other string)                | string                                |
//! | `0`, `3.14`                            | number                                |
//! | `true`                                 | boolean                               |
//! | `"any"`, `"date"`, `"absent"`          | any, date, absent                     |
//! | `null`                                 | null                                  |
//! | `["a", "b"]`                           | enum                                  |
//! | `{"ref": "Name"}`                      | reference                             |
//! | `{"arrayItems": T}`                    | array of T                            |
//! | `{"unionMembers": [T, ..]}`            | union, in order                       |
//! | `{"props": [{"json","js","typ"}], "additional": false \| T}` | object |
//!
//! Samples are turned into a [`PrimitiveKind`](crate::ir::PrimitiveKind) here,
//! once; nothing downstream looks at them again. A numeric sample under
//! `additional` is a type tag, not a default value. `false` is the type that
//! never validates; it only means something as `additional`, and anywhere else
//! the document is rejected as invalid.
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, SchemaError};
use crate::ir::{Additional, FieldSpec, Ty};
use crate::path::Crumb;
use crate::registry::SchemaRegistry;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropDoc {
    json: String,
    js: String,
    typ: Value,
}

/// Parse a schema document and check that all of its references resolve.
pub fn load_registry(text: &str) -> Result<SchemaRegistry, Error> {
    let doc = serde_json::from_str::<Value>(text).map_err(Error::MalformedInput)?;
    Ok(registry_from_value(&doc)?)
}

pub fn registry_from_value(doc: &Value) -> Result<SchemaRegistry, SchemaError> {
    let root = Crumb::Root;
    let Value::Object(defs) = doc else {
        return Err(invalid(&root, "a schema document must be an object of named schemas"));
    };
    let mut registry = SchemaRegistry::new();
    for (name, node) in defs {
        let ty = parse_node(node, &root.key(name))?;
        registry.define(name.clone(), ty)?;
    }
    registry.check_references()?;
    tracing::debug!(schemas = registry.len(), "loaded schema document");
    Ok(registry)
}

pub fn parse_node(node: &Value, path: &Crumb<'_>) -> Result<Ty, SchemaError> {
    match node {
        Value::String(s) => Ok(match s.as_str() {
            "any" => Ty::Any,
            "date" => Ty::Date,
            "absent" => Ty::Absent,
            _ => Ty::string(),
        }),
        Value::Null => Ok(Ty::Null),
        Value::Bool(false) => Err(invalid(path, "`false` matches nothing; only `additional` may use it")),
        Value::Array(cases) => Ok(Ty::Enum(cases.clone())),
        Value::Object(map) => parse_composite(map, path),
        sample => Ty::exemplar(sample).ok_or_else(|| invalid(path, "unrecognized schema node")),
    }
}

fn parse_composite(map: &Map<String, Value>, path: &Crumb<'_>) -> Result<Ty, SchemaError> {
    if let Some(target) = single(map, "ref", path)? {
        let Value::String(name) = target else {
            return Err(invalid(path, "`ref` must name a schema"));
        };
        return Ok(Ty::reference(name.clone()));
    }
    if let Some(item) = single(map, "arrayItems", path)? {
        return Ok(Ty::array(parse_node(item, &path.key("arrayItems"))?));
    }
    if let Some(members) = single(map, "unionMembers", path)? {
        let Value::Array(members) = members else {
            return Err(invalid(path, "`unionMembers` must be a list"));
        };
        let here = path.key("unionMembers");
        let members = members
            .iter()
            .enumerate()
            .map(|(i, m)| parse_node(m, &here.index(i)))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Ty::Union(members));
    }
    if let Some(props) = map.get("props") {
        if let Some(stray) = map.keys().find(|k| !matches!(k.as_str(), "props" | "additional")) {
            return Err(invalid(path, &format!("unexpected key `{stray}` in object node")));
        }
        return parse_object(props, map.get("additional"), path);
    }
    Err(invalid(path, "unrecognized schema node"))
}

fn parse_object(props: &Value, additional: Option<&Value>, path: &Crumb<'_>) -> Result<Ty, SchemaError> {
    let Value::Array(props) = props else {
        return Err(invalid(path, "`props` must be a list"));
    };
    let list = path.key("props");
    let mut fields = Vec::with_capacity(props.len());
    for (i, prop) in props.iter().enumerate() {
        let here = list.index(i);
        let prop = PropDoc::deserialize(prop).map_err(|e| invalid(&here, &e.to_string()))?;
        let ty = parse_node(&prop.typ, &here.key("typ"))?;
        fields.push(FieldSpec::new(prop.json, prop.js, ty));
    }
    let additional = match additional {
        None | Some(Value::Bool(false)) => Additional::Reject,
        Some(extra) => Additional::Passthrough(Box::new(parse_node(extra, &path.key("additional"))?)),
    };
    Ok(Ty::object(fields, additional))
}

/// `map[key]`, provided `key` is the node's only key.
fn single<'v>(map: &'v Map<String, Value>, key: &str, path: &Crumb<'_>) -> Result<Option<&'v Value>, SchemaError> {
    match map.get(key) {
        Some(_) if map.len() > 1 => Err(invalid(path, &format!("`{key}` node carries extra keys"))),
        found => Ok(found),
    }
}

fn invalid(path: &Crumb<'_>, reason: &str) -> SchemaError {
    SchemaError::InvalidDocument { path: path.to_path().to_string(), reason: reason.to_owned() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PrimitiveKind;
    use serde_json::json;

    #[test]
    fn samples_become_kinds() {
        let p = |v: Value| parse_node(&v, &Crumb::Root).unwrap();
        assert_eq!(p(json!("")), Ty::Primitive(PrimitiveKind::String));
        assert_eq!(p(json!("whatever")), Ty::string());
        assert_eq!(p(json!(0)), Ty::number());
        assert_eq!(p(json!(2.5)), Ty::number());
        assert_eq!(p(json!(true)), Ty::boolean());
        assert_eq!(p(json!("any")), Ty::Any);
        assert_eq!(p(json!("date")), Ty::Date);
        assert_eq!(p(json!("absent")), Ty::Absent);
        assert_eq!(p(json!(null)), Ty::Null);
        assert_eq!(p(json!(["a", "b"])), Ty::enumeration(["a", "b"]));
        assert_eq!(p(json!({"unionMembers": ["absent", 0]})), Ty::optional(Ty::number()));
        assert_eq!(p(json!({"arrayItems": {"ref": "Flight"}})), Ty::array(Ty::reference("Flight")));
    }

    #[test]
    fn additional_sample_is_a_type_tag() {
        let ty = parse_node(&json!({"props": [], "additional": 3.5}), &Crumb::Root).unwrap();
        assert_eq!(ty, Ty::map(Ty::number()));
        let ty = parse_node(&json!({"props": [], "additional": false}), &Crumb::Root).unwrap();
        assert_eq!(ty, Ty::object(Vec::new(), Additional::Reject));
    }

    #[test]
    fn loads_a_document() {
        let reg = load_registry(r#"{
            "Leg": {"props": [
                {"json": "flt", "js": "flight", "typ": {"ref": "Flt"}},
                {"json": "transit", "js": "transit", "typ": {"unionMembers": ["absent", 0]}}
            ], "additional": false},
            "Flt": {"props": [{"json": "flightNo", "js": "flightNo", "typ": ""}]}
        }"#).unwrap();
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["Leg", "Flt"]);

        let out = crate::cast::cast(&reg, r#"{"flt": {"flightNo": "AV 24"}}"#, "Leg").unwrap();
        assert_eq!(out, json!({"flight": {"flightNo": "AV 24"}}));
    }

    #[test]
    fn reports_where_the_document_is_wrong() {
        let err = registry_from_value(&json!({
            "Leg": {"props": [{"json": "a", "js": "a", "typ": {"arrayItems": {"bogus": 1}}}]}
        }))
        .unwrap_err();
        assert_eq!(err, SchemaError::InvalidDocument {
            path: "Leg.props[0].typ.arrayItems".into(),
            reason: "unrecognized schema node".into(),
        });

        let err = registry_from_value(&json!({"Leg": {"props": [{"json": "a", "typ": ""}]}})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDocument { ref path, .. } if path == "Leg.props[0]"));

        let err = registry_from_value(&json!({"Leg": {"ref": "Nowhere"}})).unwrap_err();
        assert_eq!(err, SchemaError::UnknownSchema { name: "Nowhere".into() });

        assert!(matches!(load_registry("[").unwrap_err(), Error::MalformedInput(_)));
    }

    #[test]
    fn false_is_only_an_additional_policy() {
        let err = registry_from_value(&json!({
            "Seat": {"props": [{"json": "window", "js": "window", "typ": false}]}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDocument { ref path, .. } if path == "Seat.props[0].typ"));

        let err = parse_node(&json!({"unionMembers": ["absent", false]}), &Crumb::Root).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDocument { ref path, .. } if path == "unionMembers[1]"));

        let reg = load_registry(r#"{"Seat": {"props": [{"json": "window", "js": "window", "typ": true}], "additional": false}}"#)
            .unwrap();
        assert!(crate::cast::cast(&reg, r#"{"window": false}"#, "Seat").is_ok());
        assert!(crate::cast::cast(&reg, r#"{"window": false, "aisle": true}"#, "Seat").is_err());
    }
}
