//! Schema graph nodes. Pure data: the behavior lives in `transform`.
//!
//! A schema is a tree of [`Ty`] nodes whose leaves may be [`Ty::Ref`]s into a
//! [`SchemaRegistry`](crate::registry::SchemaRegistry). References are only
//! looked up while transforming, so definitions may be recursive or declared
//! in any order.
use std::fmt;
use serde_json::Value;

use crate::registry::ObjectSlot;

// ------------------------------- Nodes ------------------------------------ //

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Primitive(PrimitiveKind),
    Absent,                  // key missing from the enclosing object
    Null,                    // exactly null
    Any,                     // anything, including an absent key
    Date,                    // null or a parseable date string
    Enum(Vec<Value>),        // exact member equality, declared order kept
    Array(Box<Ty>),
    Union(Vec<Ty>),          // tried in declared order, first success wins
    Object(ObjectTy),
    Ref(String),             // resolved against the registry at transform time
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTy {
    pub fields: Vec<FieldSpec>,  // declared order == output order
    pub additional: Additional,
    /// Cells holding this object's field indexes; assigned by `define`.
    pub(crate) slot: Option<ObjectSlot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub wire: String,
    pub internal: String,
    pub ty: Ty,
}

/// What happens to keys an object does not declare.
#[derive(Debug, Clone, PartialEq)]
pub enum Additional {
    Reject,
    Passthrough(Box<Ty>),
}

/// Which way a value is travelling through the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// wire → internal (`cast`)
    Cast,
    /// internal → wire (`uncast`)
    Uncast,
}

// ------------------------------ Builders ---------------------------------- //

impl Ty {
    pub fn string() -> Self { Ty::Primitive(PrimitiveKind::String) }
    pub fn number() -> Self { Ty::Primitive(PrimitiveKind::Number) }
    pub fn boolean() -> Self { Ty::Primitive(PrimitiveKind::Boolean) }

    /// Primitive whose kind is taken from a sample value (`""`, `0`, `3.14`,
    /// `true`). Returns `None` for samples that carry no primitive kind.
    pub fn exemplar(sample: &Value) -> Option<Self> {
        PrimitiveKind::of(sample).map(Ty::Primitive)
    }

    pub fn array(item: Ty) -> Self { Ty::Array(Box::new(item)) }

    pub fn union<I: IntoIterator<Item = Ty>>(members: I) -> Self {
        Ty::Union(members.into_iter().collect())
    }

    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Ty::Enum(values.into_iter().map(Into::into).collect())
    }

    pub fn object<I: IntoIterator<Item = FieldSpec>>(fields: I, additional: Additional) -> Self {
        Ty::Object(ObjectTy {
            fields: fields.into_iter().collect(),
            additional,
            slot: None,
        })
    }

    /// Open mapping: no declared fields, every key validated against `value`.
    pub fn map(value: Ty) -> Self {
        Ty::object(Vec::new(), Additional::Passthrough(Box::new(value)))
    }

    /// `[Absent, ty]`: the field may be left out.
    pub fn optional(ty: Ty) -> Self {
        Ty::Union(vec![Ty::Absent, ty])
    }

    pub fn reference(name: impl Into<String>) -> Self { Ty::Ref(name.into()) }

    /// Short human descriptor used in error reports.
    pub fn describe(&self) -> String {
        match self {
            Ty::Primitive(kind) => kind.to_string(),
            Ty::Absent => "absent".into(),
            Ty::Null => "null".into(),
            Ty::Any => "any".into(),
            Ty::Date => "date".into(),
            Ty::Enum(values) => {
                let xs = values.iter().map(Value::to_string).collect::<Vec<_>>();
                format!("enum [{}]", xs.join(", "))
            }
            Ty::Array(item) => format!("array<{}>", item.describe()),
            Ty::Union(members) => {
                let xs = members.iter().map(Ty::describe).collect::<Vec<_>>();
                xs.join(" | ")
            }
            Ty::Object(obj) if obj.fields.is_empty() => match &obj.additional {
                Additional::Passthrough(v) => format!("map<{}>", v.describe()),
                Additional::Reject => "object {}".into(),
            },
            Ty::Object(_) => "object".into(),
            Ty::Ref(name) => name.clone(),
        }
    }
}

impl FieldSpec {
    pub fn new(wire: impl Into<String>, internal: impl Into<String>, ty: Ty) -> Self {
        Self { wire: wire.into(), internal: internal.into(), ty }
    }

    /// Same key on the wire and internally.
    pub fn same(name: impl Into<String>, ty: Ty) -> Self {
        let name = name.into();
        Self { wire: name.clone(), internal: name, ty }
    }

    /// Key read from the input in the given direction.
    pub fn lookup_key(&self, direction: Direction) -> &str {
        match direction {
            Direction::Cast => &self.wire,
            Direction::Uncast => &self.internal,
        }
    }

    /// Key written to the output in the given direction.
    pub fn output_key(&self, direction: Direction) -> &str {
        match direction {
            Direction::Cast => &self.internal,
            Direction::Uncast => &self.wire,
        }
    }
}

impl PrimitiveKind {
    pub fn of(v: &Value) -> Option<Self> {
        match v {
            Value::String(_) => Some(PrimitiveKind::String),
            Value::Number(_) => Some(PrimitiveKind::Number),
            Value::Bool(_) => Some(PrimitiveKind::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Boolean => "boolean",
        })
    }
}

/// Descriptor of an input slot, `absent` for a missing key.
pub fn describe_value(v: Option<&Value>) -> String {
    match v {
        None => "absent".into(),
        Some(v) => v.to_string(),
    }
}
