//! The recursive walk of a JSON value against a schema node.
//!
//! One [`Transformer`] handles both directions; the direction only decides
//! which name of a [`FieldSpec`](crate::ir::FieldSpec) is read and which is
//! written. The walk is fail-fast: the first error unwinds the whole call.
//! The one place an error is inspected and dropped is a union trial.
//!
//! Missing object keys travel as `None` ("absent") so that a field typed
//! `[Absent, Number]` can be left out. An absent result is never written to
//! the output object.
//!
//! Recursion follows the data: a self-referential schema is fine as long as
//! the data bottoms out, but there is no depth guard.
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::{Error, Result, ValidationError, ValidationErrorKind};
use crate::ir::{describe_value, Additional, Direction, ObjectTy, PrimitiveKind, Ty};
use crate::path::Crumb;
use crate::registry::SchemaRegistry;

#[derive(Debug, Clone, Copy)]
pub struct Transformer<'r> {
    registry: &'r SchemaRegistry,
    direction: Direction,
}

impl<'r> Transformer<'r> {
    pub fn new(registry: &'r SchemaRegistry, direction: Direction) -> Self {
        Self { registry, direction }
    }

    pub fn direction(&self) -> Direction { self.direction }

    /// Transform a whole document. An absent result comes back as `null`.
    pub fn run(&self, value: &Value, ty: &Ty) -> Result<Value> {
        let out = self.transform(Some(value), ty, &Crumb::Root)?;
        Ok(out.unwrap_or(Value::Null))
    }

    pub fn transform(&self, value: Option<&Value>, ty: &Ty, path: &Crumb<'_>) -> Result<Option<Value>> {
        match ty {
            Ty::Any => Ok(value.cloned()),
            Ty::Absent => match value {
                None => Ok(None),
                Some(_) => Err(mismatch(path, "absent", value)),
            },
            Ty::Null => match value {
                Some(Value::Null) => Ok(Some(Value::Null)),
                _ => Err(mismatch(path, "null", value)),
            },
            Ty::Primitive(kind) => transform_primitive(*kind, value, path),
            Ty::Date => transform_date(value, path),
            Ty::Enum(cases) => transform_enum(cases, value, path),
            Ty::Array(item) => self.transform_array(item, value, path),
            Ty::Union(members) => self.transform_union(members, value, path),
            Ty::Object(obj) => self.transform_object(obj, value, path),
            Ty::Ref(name) => {
                let target = self.registry.resolve(name)?;
                self.transform(value, target, path)
            }
        }
    }

    fn transform_array(&self, item: &Ty, value: Option<&Value>, path: &Crumb<'_>) -> Result<Option<Value>> {
        let Some(Value::Array(xs)) = value else {
            return Err(mismatch(path, "array", value));
        };
        let mut out = Vec::with_capacity(xs.len());
        for (i, x) in xs.iter().enumerate() {
            let el = self.transform(Some(x), item, &path.index(i))?;
            // array slots cannot be omitted
            out.push(el.unwrap_or(Value::Null));
        }
        Ok(Some(Value::Array(out)))
    }

    fn transform_union(&self, members: &[Ty], value: Option<&Value>, path: &Crumb<'_>) -> Result<Option<Value>> {
        for member in members {
            match self.transform(value, member, path) {
                Ok(out) => return Ok(out),
                Err(Error::Validation(reason)) => {
                    tracing::trace!(member = %member.describe(), %reason, "union member rejected");
                }
                Err(other) => return Err(other),
            }
        }
        Err(invalid(path, ValidationErrorKind::UnionExhausted {
            members: members.iter().map(Ty::describe).collect(),
            actual: describe_value(value),
        }))
    }

    fn transform_object(&self, obj: &ObjectTy, value: Option<&Value>, path: &Crumb<'_>) -> Result<Option<Value>> {
        let Some(Value::Object(map)) = value else {
            return Err(mismatch(path, "object", value));
        };
        let index = self.registry.field_index(obj, self.direction);
        let mut out = Map::new();

        // declared fields, declaration order
        for (key, pos) in index.iter() {
            let field = &obj.fields[pos];
            if let Some(v) = self.transform(map.get(key), &field.ty, &path.key(key))? {
                out.insert(field.output_key(self.direction).to_owned(), v);
            }
        }

        // everything else, encounter order
        for (key, v) in map {
            if index.contains(key) {
                continue;
            }
            match &obj.additional {
                Additional::Reject => {
                    return Err(invalid(path, ValidationErrorKind::UnexpectedField { key: key.clone() }));
                }
                Additional::Passthrough(extra) => {
                    if let Some(v) = self.transform(Some(v), extra, &path.key(key))? {
                        out.insert(key.clone(), v);
                    }
                }
            }
        }
        Ok(Some(Value::Object(out)))
    }
}

// ------------------------------- Leaves ----------------------------------- //

fn transform_primitive(kind: PrimitiveKind, value: Option<&Value>, path: &Crumb<'_>) -> Result<Option<Value>> {
    match value {
        Some(v) if PrimitiveKind::of(v) == Some(kind) => Ok(Some(v.clone())),
        _ => Err(mismatch(path, &kind.to_string(), value)),
    }
}

fn transform_enum(cases: &[Value], value: Option<&Value>, path: &Crumb<'_>) -> Result<Option<Value>> {
    match value {
        Some(v) if cases.iter().any(|case| same_literal(case, v)) => Ok(Some(v.clone())),
        _ => Err(invalid(path, ValidationErrorKind::EnumViolation {
            allowed: cases.to_vec(),
            actual: describe_value(value),
        })),
    }
}

// Numbers compare by value, so `1` and `1.0` are the same literal.
fn same_literal(case: &Value, value: &Value) -> bool {
    match (case, value) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (a.as_u64(), b.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            },
        },
        _ => case == value,
    }
}

// Numbers are refused outright: an epoch-millis reading is never what the
// wire meant.
fn transform_date(value: Option<&Value>, path: &Crumb<'_>) -> Result<Option<Value>> {
    match value {
        Some(Value::Null) => Ok(Some(Value::Null)),
        Some(Value::String(s)) => match parse_date(s) {
            Some(dt) => Ok(Some(Value::String(format_date(&dt)))),
            None => Err(date_failure(path, value)),
        },
        _ => Err(date_failure(path, value)),
    }
}

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Read a date or date-time. Zone-less forms are taken as UTC.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATE_TIME_FORMATS {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(n.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// Canonical text form of a date: RFC 3339, UTC, milliseconds.
pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ------------------------------- Errors ----------------------------------- //

fn invalid(path: &Crumb<'_>, kind: ValidationErrorKind) -> Error {
    Error::Validation(ValidationError::new(path.to_path(), kind))
}

fn mismatch(path: &Crumb<'_>, expected: &str, value: Option<&Value>) -> Error {
    invalid(path, ValidationErrorKind::TypeMismatch {
        expected: expected.to_owned(),
        actual: describe_value(value),
    })
}

fn date_failure(path: &Crumb<'_>, value: Option<&Value>) -> Error {
    invalid(path, ValidationErrorKind::DateParseFailure { actual: describe_value(value) })
}
