//! Named schema definitions plus the field-name indexes derived from them.
//!
//! The registry is filled once (`define`) and read afterwards. The only state
//! that changes after that point is the per-object field index table: each
//! registered object gets a pair of initialize-once cells (one per direction)
//! which are filled on first use and then only read. `SchemaRegistry` is
//! therefore `Send + Sync` and can be shared across threads behind a plain
//! reference.
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::error::SchemaError;
use crate::ir::{Additional, Direction, FieldSpec, ObjectTy, Ty};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct SchemaRegistry {
    id: u64,
    defs: IndexMap<String, Ty>,
    indexes: Vec<IndexCells>,
}

#[derive(Debug, Default)]
struct IndexCells {
    cast: OnceCell<FieldIndex>,
    uncast: OnceCell<FieldIndex>,
}

/// Lookup key → position of the field in `ObjectTy::fields`.
///
/// Iteration order is declaration order. When two fields share a lookup key
/// the later declaration wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldIndex {
    positions: IndexMap<String, usize>,
}

/// Where an object's cells live: registry id and slot number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectSlot {
    registry: u64,
    index: usize,
}

// ------------------------------ Registry ---------------------------------- //

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            defs: IndexMap::new(),
            indexes: Vec::new(),
        }
    }

    /// Register `ty` under `name`. Every object node inside it is given its
    /// own field-index cells.
    pub fn define(&mut self, name: impl Into<String>, mut ty: Ty) -> Result<(), SchemaError> {
        let name = name.into();
        if self.defs.contains_key(&name) {
            return Err(SchemaError::DuplicateSchema { name });
        }
        self.assign_slots(&mut ty);
        tracing::trace!(schema = %name, objects = self.indexes.len(), "defined schema");
        self.defs.insert(name, ty);
        Ok(())
    }

    /// Builder form of [`define`](Self::define).
    pub fn with(mut self, name: impl Into<String>, ty: Ty) -> Result<Self, SchemaError> {
        self.define(name, ty)?;
        Ok(self)
    }

    pub fn resolve(&self, name: &str) -> Result<&Ty, SchemaError> {
        self.defs
            .get(name)
            .ok_or_else(|| SchemaError::UnknownSchema { name: name.to_owned() })
    }

    pub fn contains(&self, name: &str) -> bool { self.defs.contains_key(name) }
    pub fn len(&self) -> usize { self.defs.len() }
    pub fn is_empty(&self) -> bool { self.defs.is_empty() }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = (&str, &Ty)> {
        self.defs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field index of `object` for `direction`, built on first request.
    ///
    /// Objects that were not registered through this registry (built ad hoc)
    /// get a fresh, unmemoized index.
    pub fn field_index<'a>(&'a self, object: &ObjectTy, direction: Direction) -> Cow<'a, FieldIndex> {
        let cells = object
            .slot
            .filter(|slot| slot.registry == self.id)
            .and_then(|slot| self.indexes.get(slot.index));
        let Some(cells) = cells else {
            return Cow::Owned(FieldIndex::build(&object.fields, direction));
        };
        let cell = match direction {
            Direction::Cast => &cells.cast,
            Direction::Uncast => &cells.uncast,
        };
        Cow::Borrowed(cell.get_or_init(|| {
            tracing::trace!(?direction, fields = object.fields.len(), "building field index");
            FieldIndex::build(&object.fields, direction)
        }))
    }

    /// Check that every reference reachable from any definition resolves.
    pub fn check_references(&self) -> Result<(), SchemaError> {
        fn walk(reg: &SchemaRegistry, ty: &Ty) -> Result<(), SchemaError> {
            match ty {
                Ty::Ref(name) => reg.resolve(name).map(|_| ()),
                Ty::Array(item) => walk(reg, item),
                Ty::Union(members) => members.iter().try_for_each(|m| walk(reg, m)),
                Ty::Object(obj) => {
                    obj.fields.iter().try_for_each(|f| walk(reg, &f.ty))?;
                    match &obj.additional {
                        Additional::Passthrough(extra) => walk(reg, extra),
                        Additional::Reject => Ok(()),
                    }
                }
                _ => Ok(()),
            }
        }
        self.defs.values().try_for_each(|ty| walk(self, ty))
    }

    fn assign_slots(&mut self, ty: &mut Ty) {
        match ty {
            Ty::Array(item) => self.assign_slots(item),
            Ty::Union(members) => {
                for m in members.iter_mut() { self.assign_slots(m); }
            }
            Ty::Object(obj) => {
                obj.slot = Some(ObjectSlot { registry: self.id, index: self.indexes.len() });
                self.indexes.push(IndexCells::default());
                for f in obj.fields.iter_mut() { self.assign_slots(&mut f.ty); }
                if let Additional::Passthrough(extra) = &mut obj.additional {
                    self.assign_slots(extra);
                }
            }
            _ => {}
        }
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self { Self::new() }
}

// ----------------------------- FieldIndex --------------------------------- //

impl FieldIndex {
    pub fn build(fields: &[FieldSpec], direction: Direction) -> Self {
        let mut positions = IndexMap::with_capacity(fields.len());
        for (i, f) in fields.iter().enumerate() {
            positions.insert(f.lookup_key(direction).to_owned(), i);
        }
        Self { positions }
    }

    pub fn contains(&self, key: &str) -> bool { self.positions.contains_key(key) }

    pub fn position(&self, key: &str) -> Option<usize> { self.positions.get(key).copied() }

    /// `(lookup key, field position)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.positions.iter().map(|(k, i)| (k.as_str(), *i))
    }

    pub fn len(&self) -> usize { self.positions.len() }
    pub fn is_empty(&self) -> bool { self.positions.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FieldSpec;

    fn person() -> Ty {
        Ty::object(
            [
                FieldSpec::new("first_name", "firstName", Ty::string()),
                FieldSpec::new("age", "age", Ty::number()),
            ],
            Additional::Reject,
        )
    }

    #[test]
    fn define_rejects_duplicates() {
        let mut reg = SchemaRegistry::new();
        reg.define("Person", person()).unwrap();
        let err = reg.define("Person", Ty::Any).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateSchema { name: "Person".into() });
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn resolve_unknown_is_schema_error() {
        let reg = SchemaRegistry::new();
        assert_eq!(
            reg.resolve("Ghost").unwrap_err(),
            SchemaError::UnknownSchema { name: "Ghost".into() }
        );
    }

    #[test]
    fn field_index_is_memoized_per_direction() {
        let reg = SchemaRegistry::new().with("Person", person()).unwrap();
        let Ty::Object(obj) = reg.resolve("Person").unwrap() else { panic!("not an object") };

        let cast = reg.field_index(obj, Direction::Cast);
        assert!(matches!(cast, Cow::Borrowed(_)));
        assert_eq!(cast.iter().collect::<Vec<_>>(), vec![("first_name", 0), ("age", 1)]);

        let uncast = reg.field_index(obj, Direction::Uncast);
        assert!(uncast.contains("firstName"));
        assert!(!uncast.contains("first_name"));

        // second request hands back the very same cached index
        let again = reg.field_index(obj, Direction::Cast);
        assert!(std::ptr::eq(&*cast, &*again));
    }

    #[test]
    fn ad_hoc_objects_get_fresh_index() {
        let reg = SchemaRegistry::new();
        let Ty::Object(obj) = person() else { unreachable!() };
        assert!(matches!(reg.field_index(&obj, Direction::Cast), Cow::Owned(_)));

        // nodes registered elsewhere are not served from this registry's cells
        let other = SchemaRegistry::new().with("Person", person()).unwrap();
        let Ty::Object(foreign) = other.resolve("Person").unwrap() else { unreachable!() };
        assert!(matches!(reg.field_index(foreign, Direction::Cast), Cow::Owned(_)));
    }

    #[test]
    fn later_duplicate_lookup_key_wins() {
        let idx = FieldIndex::build(
            &[
                FieldSpec::new("k", "a", Ty::string()),
                FieldSpec::new("k", "b", Ty::number()),
            ],
            Direction::Cast,
        );
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.position("k"), Some(1));
    }

    #[test]
    fn check_references_finds_dangling_refs() {
        let reg = SchemaRegistry::new()
            .with("Node", Ty::object(
                [FieldSpec::same("next", Ty::optional(Ty::reference("Node")))],
                Additional::Reject,
            ))
            .unwrap();
        assert!(reg.check_references().is_ok());

        let reg = reg.with("Broken", Ty::array(Ty::reference("Missing"))).unwrap();
        assert_eq!(
            reg.check_references().unwrap_err(),
            SchemaError::UnknownSchema { name: "Missing".into() }
        );
    }

    #[test]
    fn registry_is_shareable() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<SchemaRegistry>();
    }
}
