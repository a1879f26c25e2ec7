// ABOUTME: Per-type member descriptors and the process-wide cache that memoizes them.
// ABOUTME: Discovery runs once per type; concurrent callers may race, the first insert wins.

use crate::accessor::{Access, AccessError, AccessorCompiler, CompileError, Read};
use crate::error::{Error, Result};
use crate::reflect::Object;
use crate::registry::CustomTypeRegistry;
use crate::shape::{MemberKind, TypeShape};
use crate::sync;
use crate::types::{limits, Category};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

/// A discovered member with its compiled accessors.
pub struct MemberDescriptor {
    name: &'static str,
    lowercase_name: String,
    wire_name: Option<&'static str>,
    kind: MemberKind,
    category: Category,
    declared_type: &'static str,
    getter: Arc<dyn Access>,
    setter: Option<Arc<dyn Access>>,
}

impl MemberDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn lowercase_name(&self) -> &str {
        &self.lowercase_name
    }

    pub fn wire_name(&self) -> Option<&'static str> {
        self.wire_name
    }

    /// The key written to JSON. An explicit wire name is never lowercased.
    #[inline]
    pub fn output_name(&self, lowercase: bool) -> &str {
        match self.wire_name {
            Some(wire_name) => wire_name,
            None if lowercase => &self.lowercase_name,
            None => self.name,
        }
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn declared_type(&self) -> &'static str {
        self.declared_type
    }

    /// False when the member is read through the by-name fallback.
    pub fn is_compiled(&self) -> bool {
        self.getter.is_compiled()
    }

    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    /// A computed property without a setter. These are skipped unless
    /// `show_read_only_properties` is set.
    #[inline]
    pub fn is_read_only_property(&self) -> bool {
        self.kind == MemberKind::Property && self.setter.is_none()
    }

    /// Read the member from `instance`.
    #[inline]
    pub fn read<'a>(&self, instance: &'a dyn Any) -> std::result::Result<Read<'a>, AccessError> {
        self.getter.read(instance)
    }

    /// Write `value` into the member of `instance`.
    pub fn write(
        &self,
        instance: &mut dyn Any,
        value: Box<dyn Any>,
    ) -> std::result::Result<(), AccessError> {
        match &self.setter {
            Some(setter) => setter.write(instance, value),
            None => Err(AccessError::new(format_args!("`{}` is read-only", self.name))),
        }
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("kind", &self.kind)
            .field("category", &self.category)
            .field("declared_type", &self.declared_type)
            .field("compiled", &self.is_compiled())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

/// The ordered, compiled members of one object type.
#[derive(Debug)]
pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    fn discover(shape: &TypeShape, ignored: &[String]) -> Result<Self> {
        let introspection = |member: &str, message: String| Error::Introspection {
            type_name: shape.type_name().to_owned(),
            member: member.to_owned(),
            message,
        };

        let mut members = Vec::with_capacity(shape.members().len());
        let mut names = HashSet::new();
        let mut output_names = HashSet::new();

        for declared in shape.members() {
            let name = declared.name();
            if let Some(marker) = declared
                .markers()
                .iter()
                .find(|marker| ignored.iter().any(|i| i.as_str() == **marker))
            {
                log::trace!("skipping `{}::{name}` marked `{marker}`", shape.type_name());
                continue;
            }
            if name.is_empty() {
                return Err(introspection(name, "member name is empty".into()));
            }
            if !names.insert(name) {
                return Err(introspection(name, "member declared twice".into()));
            }
            let output_name = declared.wire_name().unwrap_or(name);
            if !output_names.insert(output_name) {
                return Err(introspection(
                    name,
                    format!("output name `{output_name}` is already used"),
                ));
            }

            let getter = match AccessorCompiler::compile_getter(shape, name) {
                Ok(getter) => getter,
                Err(CompileError::NotCompilable { .. }) => {
                    log::debug!(
                        "`{}::{name}` falls back to reflective access",
                        shape.type_name()
                    );
                    AccessorCompiler::reflective(name, shape.lookup())
                }
                Err(err) => return Err(introspection(name, err.to_string())),
            };
            let setter = AccessorCompiler::compile_setter(shape, name).ok();

            let category = match declared.declared_type_id() {
                Some(type_id) if CustomTypeRegistry::contains(type_id) => Category::Custom,
                _ => declared.category(),
            };

            members.push(MemberDescriptor {
                name,
                lowercase_name: name.to_lowercase(),
                wire_name: declared.wire_name(),
                kind: declared.kind(),
                category,
                declared_type: declared.declared_type(),
                getter,
                setter,
            });
        }

        Ok(Self {
            type_id: shape.type_id(),
            type_name: shape.type_name(),
            members,
        })
    }

    /// The `TypeId` of the described type, not of the descriptor.
    pub fn described_type_id(&self) -> TypeId {
        self.type_id
    }

    /// Display name written in `___type` and the global type table.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }
}

type Cache = RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>;

fn cache() -> &'static Cache {
    static DESCRIPTORS: OnceLock<Cache> = OnceLock::new();
    DESCRIPTORS.get_or_init(Cache::default)
}

fn ignore_list() -> &'static RwLock<Vec<String>> {
    static IGNORED: OnceLock<RwLock<Vec<String>>> = OnceLock::new();
    IGNORED.get_or_init(|| RwLock::new(vec![limits::DEFAULT_IGNORE_MARKER.to_owned()]))
}

/// Process-wide memo of type descriptors, keyed by `TypeId`.
///
/// Descriptors do not depend on serialization options, so one entry serves
/// every pass in the process.
pub struct TypeDescriptorCache;

impl TypeDescriptorCache {
    /// The descriptor for `type_id`, discovering it with `shape` on first use.
    pub fn get_members(type_id: TypeId, shape: fn() -> TypeShape) -> Result<Arc<TypeDescriptor>> {
        if let Some(descriptor) = sync::read(cache()).get(&type_id) {
            return Ok(Arc::clone(descriptor));
        }

        let shape = shape();
        let ignored = sync::read(ignore_list()).clone();
        let descriptor = Arc::new(TypeDescriptor::discover(&shape, &ignored)?);
        log::debug!(
            "discovered `{}` with {} members",
            descriptor.type_name(),
            descriptor.members().len()
        );

        let mut entries = sync::write(cache());
        Ok(Arc::clone(entries.entry(type_id).or_insert(descriptor)))
    }

    /// Typed convenience for [`TypeDescriptorCache::get_members`].
    pub fn get<T: Object>() -> Result<Arc<TypeDescriptor>> {
        Self::get_members(TypeId::of::<T>(), TypeShape::of::<T>)
    }

    pub fn contains(type_id: TypeId) -> bool {
        sync::read(cache()).contains_key(&type_id)
    }

    /// Number of cached types.
    pub fn len() -> usize {
        sync::read(cache()).len()
    }

    pub fn is_empty() -> bool {
        Self::len() == 0
    }

    /// Drop every cached descriptor.
    pub fn reset() {
        let mut entries = sync::write(cache());
        log::trace!("resetting descriptor cache ({} types)", entries.len());
        entries.clear();
    }

    /// Exclude members carrying `marker` from discovery.
    pub fn ignore_marker(marker: &str) {
        {
            let mut ignored = sync::write(ignore_list());
            if ignored.iter().any(|m| m == marker) {
                return;
            }
            ignored.push(marker.to_owned());
        }
        log::debug!("ignoring members marked `{marker}`");
        Self::reset();
    }

    /// Stop excluding members carrying `marker`.
    pub fn unignore_marker(marker: &str) {
        {
            let mut ignored = sync::write(ignore_list());
            let before = ignored.len();
            ignored.retain(|m| m != marker);
            if ignored.len() == before {
                return;
            }
        }
        log::debug!("no longer ignoring members marked `{marker}`");
        Self::reset();
    }

    /// The current ignore-list.
    pub fn ignored_markers() -> Vec<String> {
        sync::read(ignore_list()).clone()
    }
}
