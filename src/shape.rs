// ABOUTME: Member declarations: what an object type exposes to the serializer.
// ABOUTME: A TypeShape is produced by Object::describe and consumed once by type discovery.

use crate::accessor::{Access, AccessorCompiler};
use crate::reflect::{Object, Reflect};
use crate::types::Category;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Resolves a member by name on a type-erased instance.
pub type MemberLookup = for<'a, 'b> fn(&'a dyn Any, &'b str) -> Option<&'a dyn Reflect>;

/// How a member is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Stored field.
    Field,
    /// Computed by a getter.
    Property,
    /// Resolved by name through [`Object::member`].
    Dynamic,
}

/// One member as declared by [`Object::describe`].
pub struct DeclaredMember {
    name: &'static str,
    wire_name: Option<&'static str>,
    markers: Vec<&'static str>,
    kind: MemberKind,
    category: Category,
    declared_type: &'static str,
    declared_type_id: Option<TypeId>,
    accessor: Option<Arc<dyn Access>>,
}

impl DeclaredMember {
    fn typed<F: Reflect>(name: &'static str, kind: MemberKind, accessor: Arc<dyn Access>) -> Self {
        Self {
            name,
            wire_name: None,
            markers: Vec::new(),
            kind,
            category: F::category(),
            declared_type: type_name::<F>(),
            declared_type_id: Some(TypeId::of::<F>()),
            accessor: Some(accessor),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name written to JSON instead of [`DeclaredMember::name`], if any.
    pub fn wire_name(&self) -> Option<&'static str> {
        self.wire_name
    }

    pub fn markers(&self) -> &[&'static str] {
        &self.markers
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Category of the declared type; `Unknown` for dynamic members.
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn declared_type(&self) -> &'static str {
        self.declared_type
    }

    pub fn declared_type_id(&self) -> Option<TypeId> {
        self.declared_type_id
    }

    /// The direct accessor; `None` for dynamic members.
    pub fn accessor(&self) -> Option<&Arc<dyn Access>> {
        self.accessor.as_ref()
    }
}

impl fmt::Debug for DeclaredMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredMember")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("kind", &self.kind)
            .field("category", &self.category)
            .field("declared_type", &self.declared_type)
            .finish_non_exhaustive()
    }
}

/// The declared members of one object type.
pub struct TypeShape {
    type_id: TypeId,
    type_name: &'static str,
    members: Vec<DeclaredMember>,
    lookup: MemberLookup,
}

impl TypeShape {
    /// Run discovery for `T`.
    pub fn of<T: Object>() -> Self {
        let mut shape = Shape::<T>::new();
        T::describe(&mut shape);
        TypeShape {
            type_id: TypeId::of::<T>(),
            type_name: shape.type_name,
            members: shape.members,
            lookup: lookup_member::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Display name written in `___type`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[DeclaredMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&DeclaredMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn lookup(&self) -> MemberLookup {
        self.lookup
    }
}

fn lookup_member<'a, T: Object>(instance: &'a dyn Any, name: &str) -> Option<&'a dyn Reflect> {
    instance.downcast_ref::<T>()?.member(name)
}

/// Builder passed to [`Object::describe`].
pub struct Shape<T> {
    type_name: &'static str,
    members: Vec<DeclaredMember>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Object> Shape<T> {
    fn new() -> Self {
        Self {
            type_name: type_name::<T>(),
            members: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Override the display name written in `___type`.
    pub fn name(&mut self, name: &'static str) -> &mut Self {
        self.type_name = name;
        self
    }

    fn push(&mut self, member: DeclaredMember) -> MemberBuilder<'_> {
        let index = self.members.len();
        self.members.push(member);
        MemberBuilder {
            member: &mut self.members[index],
        }
    }

    /// A read-only stored field.
    pub fn field<F: Reflect>(&mut self, name: &'static str, get: fn(&T) -> &F) -> MemberBuilder<'_> {
        let access = AccessorCompiler::field(get, None);
        self.push(DeclaredMember::typed::<F>(name, MemberKind::Field, access))
    }

    /// A stored field that can also be written.
    pub fn field_rw<F: Reflect>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> MemberBuilder<'_> {
        let access = AccessorCompiler::field(get, Some(get_mut));
        self.push(DeclaredMember::typed::<F>(name, MemberKind::Field, access))
    }

    /// A computed property without a setter.
    pub fn property<F: Reflect>(&mut self, name: &'static str, get: fn(&T) -> F) -> MemberBuilder<'_> {
        let access = AccessorCompiler::property(get, None);
        self.push(DeclaredMember::typed::<F>(name, MemberKind::Property, access))
    }

    /// A computed property with a setter.
    pub fn property_rw<F: Reflect>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> F,
        set: fn(&mut T, F),
    ) -> MemberBuilder<'_> {
        let access = AccessorCompiler::property(get, Some(set));
        self.push(DeclaredMember::typed::<F>(name, MemberKind::Property, access))
    }

    /// A computed property whose getter can fail. Failures abort serialization.
    pub fn try_property<F: Reflect, E: fmt::Display + 'static>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> Result<F, E>,
    ) -> MemberBuilder<'_> {
        let access = AccessorCompiler::try_property(get);
        self.push(DeclaredMember::typed::<F>(name, MemberKind::Property, access))
    }

    /// A member resolved by name at run time through [`Object::member`].
    pub fn dynamic(&mut self, name: &'static str) -> MemberBuilder<'_> {
        self.push(DeclaredMember {
            name,
            wire_name: None,
            markers: Vec::new(),
            kind: MemberKind::Dynamic,
            category: Category::Unknown,
            declared_type: "dynamic",
            declared_type_id: None,
            accessor: None,
        })
    }
}

/// Adjusts the member that was just declared.
pub struct MemberBuilder<'s> {
    member: &'s mut DeclaredMember,
}

impl MemberBuilder<'_> {
    /// Write the member under a different JSON name.
    pub fn rename(self, wire_name: &'static str) -> Self {
        self.member.wire_name = Some(wire_name);
        self
    }

    /// Attach a marker annotation. Members carrying an ignored marker are
    /// skipped at discovery.
    pub fn marker(self, marker: &'static str) -> Self {
        self.member.markers.push(marker);
        self
    }
}
