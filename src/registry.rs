//! The type registry: every descriptor built from a program's debug info,
//! addressable by ID and, for named types, by name.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::model::{StructOrUnion, TypeDescriptor, TypeId};

/// Qualifier and typedef chains are short in practice; this bounds the walk
/// over malformed debug info that references itself.
const STRIP_LIMIT: usize = 64;

/// Store of type descriptors.
///
/// Populated during load and only read afterwards. Descriptors may refer to
/// IDs that were never inserted (or not yet, while loading); lookups of such
/// IDs return `None` and callers degrade to placeholders.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    /// All types, indexed by location in the debug section.
    ///
    /// This is the authoritative set of types; `by_name` indexes into it.
    by_id: BTreeMap<TypeId, TypeDescriptor>,

    /// Index: type name to location.
    ///
    /// Invariant: every value has a corresponding entry in `by_id`.
    by_name: BTreeMap<String, TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of types in the registry.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Adds a type at `id`, replacing whatever was there before.
    ///
    /// Named types also enter the name index, where the newest definition
    /// wins. A forward declaration never displaces a name that is already
    /// registered.
    pub fn insert(&mut self, id: TypeId, ty: impl Into<TypeDescriptor>) {
        let ty = ty.into();
        if let Some(name) = ty.registered_name() {
            let is_declaration = matches!(
                &ty,
                TypeDescriptor::StructOrUnion(s) if s.declaration
            );
            if !is_declaration || !self.by_name.contains_key(name) {
                self.by_name.insert(name.to_string(), id);
            }
        }
        self.by_id.insert(id, ty);
    }

    /// Looks up the type with the given ID.
    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.by_id.get(&id)
    }

    /// Looks up an optional reference; `None` (void) resolves to `None`.
    pub fn resolve(&self, id: Option<TypeId>) -> Option<&TypeDescriptor> {
        id.and_then(|id| self.get(id))
    }

    /// Consults the type-name index.
    ///
    /// Names are matched in their entirety, and only the most recently
    /// registered type of a given name is found.
    pub fn by_name(&self, name: &str) -> Option<(TypeId, &TypeDescriptor)> {
        let id = *self.by_name.get(name)?;
        Some((id, self.by_id.get(&id)?))
    }

    /// Display name of a possibly-void reference: `void` for `None`, `???`
    /// for an ID that is not in the registry.
    pub fn name_of(&self, id: Option<TypeId>) -> Cow<'_, str> {
        match id {
            None => "void".into(),
            Some(id) => match self.get(id) {
                Some(t) => t.name(self),
                None => "???".into(),
            },
        }
    }

    /// Produces an iterator over all types, together with their IDs, in
    /// section order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDescriptor)> + '_ {
        self.by_id.iter().map(|(&id, ty)| (id, ty))
    }

    /// Produces an iterator over the name index.
    pub fn names(&self) -> impl Iterator<Item = (&str, TypeId)> + '_ {
        self.by_name.iter().map(|(n, &id)| (n.as_str(), id))
    }

    /// Follows const/volatile/restrict qualifiers down to the qualified type.
    ///
    /// Returns `None` if the chain ends in `void` or an unknown ID.
    pub fn strip_cv<'a>(
        &'a self,
        mut ty: &'a TypeDescriptor,
    ) -> Option<&'a TypeDescriptor> {
        for _ in 0..STRIP_LIMIT {
            match ty {
                TypeDescriptor::CvQualified(c) => ty = self.resolve(c.type_id)?,
                _ => return Some(ty),
            }
        }
        None
    }

    /// Like `strip_cv`, but also sees through typedefs.
    pub fn strip_aliases<'a>(
        &'a self,
        mut ty: &'a TypeDescriptor,
    ) -> Option<&'a TypeDescriptor> {
        for _ in 0..STRIP_LIMIT {
            match ty {
                TypeDescriptor::CvQualified(c) => ty = self.resolve(c.type_id)?,
                TypeDescriptor::Alias(a) => ty = self.resolve(a.type_id)?,
                _ => return Some(ty),
            }
        }
        None
    }

    /// Resolves a forward declaration to the registered definition of the
    /// same name, if there is one. Definitions are returned unchanged.
    pub fn complete<'a>(&'a self, s: &'a StructOrUnion) -> &'a StructOrUnion {
        if !s.declaration {
            return s;
        }
        let definition = s
            .name
            .as_deref()
            .and_then(|n| self.by_name(n))
            .and_then(|(_, t)| match t {
                TypeDescriptor::StructOrUnion(d) if !d.declaration => Some(d),
                _ => None,
            });
        definition.unwrap_or(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{AggregateKind, Alias, CvQualified, Member, Primitive, Encoding, Qualifier};
    use test_log::test;

    fn int() -> Primitive {
        Primitive {
            name: "int".to_string(),
            byte_size: 4,
            encoding: Encoding::Signed,
        }
    }

    fn record(name: &str, declaration: bool, members: Vec<Member>) -> StructOrUnion {
        StructOrUnion {
            kind: AggregateKind::Struct,
            name: Some(name.to_string()),
            declaration,
            members,
        }
    }

    #[test]
    fn later_definitions_overwrite_names() {
        let mut types = TypeRegistry::new();
        types.insert(TypeId(10), int());
        types.insert(TypeId(20), int());

        assert_eq!(types.by_name("int").map(|(id, _)| id), Some(TypeId(20)));
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn declarations_do_not_displace_definitions() {
        let mut types = TypeRegistry::new();
        let member = Member {
            name: "x".to_string(),
            type_id: Some(TypeId(1)),
            offset: 0,
        };
        types.insert(TypeId(10), record("Node", false, vec![member]));
        types.insert(TypeId(20), record("Node", true, vec![]));

        assert_eq!(types.by_name("Node").map(|(id, _)| id), Some(TypeId(10)));

        let decl = match types.get(TypeId(20)) {
            Some(TypeDescriptor::StructOrUnion(s)) => s,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(types.complete(decl).members.len(), 1);
    }

    #[test]
    fn declaration_registers_name_when_alone() {
        let mut types = TypeRegistry::new();
        types.insert(TypeId(20), record("Opaque", true, vec![]));
        assert!(types.by_name("Opaque").is_some());
    }

    #[test]
    fn strip_follows_qualifiers_and_typedefs() {
        let mut types = TypeRegistry::new();
        types.insert(TypeId(1), int());
        types.insert(TypeId(2), Alias { name: "myint".to_string(), type_id: Some(TypeId(1)) });
        types.insert(TypeId(3), CvQualified { qualifier: Qualifier::Const, type_id: Some(TypeId(2)) });

        let top = types.get(TypeId(3)).unwrap();
        assert!(matches!(types.strip_cv(top), Some(TypeDescriptor::Alias(_))));
        assert!(matches!(types.strip_aliases(top), Some(TypeDescriptor::Primitive(_))));
    }

    #[test]
    fn strip_gives_up_on_cycles() {
        let mut types = TypeRegistry::new();
        types.insert(TypeId(1), CvQualified { qualifier: Qualifier::Const, type_id: Some(TypeId(2)) });
        types.insert(TypeId(2), CvQualified { qualifier: Qualifier::Volatile, type_id: Some(TypeId(1)) });

        let top = types.get(TypeId(1)).unwrap();
        assert!(types.strip_cv(top).is_none());
    }

    #[test]
    fn unknown_ids_resolve_to_nothing() {
        let types = TypeRegistry::new();
        assert!(types.resolve(Some(TypeId(99))).is_none());
        assert!(types.resolve(None).is_none());
    }
}
