// ABOUTME: Graph serializer: dispatches on runtime kind and walks plain objects through cached descriptors.
// ABOUTME: Handles back-references, depth limits, type tags and the global type table for one pass.

use crate::accessor::Read;
use crate::descriptor::TypeDescriptorCache;
use crate::encoder::Encoder;
use crate::error::{Error, Result};
use crate::options::SerializationOptions;
use crate::reflect::{AsAny, Entries, Kind, ObjectRef, Reflect};
use crate::registry::{CustomType, CustomTypeRegistry};
use crate::tracker::{GlobalTypeTable, ReferenceTracker};
use crate::types::{ext_key, Category};
use std::borrow::Cow;

/// Serializes one object graph to JSON text.
///
/// A `Serializer` owns all per-pass state and is consumed by
/// [`Serializer::serialize`], so state never leaks between passes.
pub struct Serializer<'o> {
    options: &'o SerializationOptions,
    encoder: Encoder,
    references: ReferenceTracker,
    types: GlobalTypeTable,
    /// Whether `___type` carries table ids in this pass.
    use_type_table: bool,
    /// Offset just after the root object's `{`.
    table_at: Option<usize>,
    depth: usize,
    /// Values computed by property getters, kept alive until the pass ends so
    /// their addresses are not reused by later values.
    retained: Vec<Box<dyn Reflect>>,
}

impl<'o> Serializer<'o> {
    /// Create a serializer, rejecting invalid option combinations up front.
    pub fn new(options: &'o SerializationOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            encoder: Encoder::with_capacity(256).escaping_non_ascii(options.escape_non_ascii),
            references: ReferenceTracker::new(),
            types: GlobalTypeTable::new(),
            use_type_table: false,
            table_at: None,
            depth: 0,
            retained: Vec::new(),
        })
    }

    /// Serialize `root` and everything reachable from it.
    pub fn serialize(mut self, root: &dyn Reflect) -> Result<String> {
        self.use_type_table = self.options.use_global_type_table && resolves_to_object(root);
        self.write_value(root, Category::Unknown)?;

        log::trace!(
            "serialized {} objects, {} types, {} computed values",
            self.references.len(),
            self.types.len(),
            self.retained.len()
        );

        let table = match self.table_at {
            Some(at) if !self.types.is_empty() => Some((at, self.render_type_table()?)),
            _ => None,
        };
        let mut output = self.encoder.finish()?;
        if let Some((at, table)) = table {
            output.insert_str(at, &table);
        }
        Ok(output)
    }

    /// `"___types":{name:id,…},` ready to be spliced after the root's `{`.
    fn render_type_table(&self) -> Result<String> {
        let mut table = Encoder::new().escaping_non_ascii(self.options.escape_non_ascii);
        table.begin_object()?;
        for (name, id) in self.types.iter() {
            table.write_key(name)?;
            table.write_u64(id as u64)?;
        }
        table.end_container()?;
        let table = table.finish()?;
        Ok(format!("\"{}\":{table},", ext_key::TYPES))
    }

    /// Write one value. `declared` is the category of the member or element
    /// type; scalar categories skip the custom-type lookup. The value behind an
    /// indirection is always checked, since wrappers report their target's
    /// category.
    fn write_value(&mut self, value: &dyn Reflect, declared: Category) -> Result<()> {
        let kind = value.kind();
        if let Kind::Null = kind {
            return self.encoder.write_null();
        }
        if !declared.is_scalar() {
            if let Some(custom) = CustomTypeRegistry::lookup(value.as_any().type_id()) {
                return self.write_custom(&custom, value);
            }
        }

        let options = self.options;
        match kind {
            Kind::Null => self.encoder.write_null(),
            Kind::Indirect(inner) => self.write_value(inner, Category::Unknown),
            Kind::Str(text) => self.encoder.write_str(text),
            Kind::Char(c) => self.encoder.write_char(c),
            Kind::Bool(b) => self.encoder.write_bool(b),
            Kind::Int(n) => self.encoder.write_i64(n),
            Kind::UInt(n) => self.encoder.write_u64(n),
            Kind::F32(n) => self
                .encoder
                .write_f32(n, options.use_compact_floating_point_encoding),
            Kind::F64(n) => self
                .encoder
                .write_f64(n, options.use_compact_floating_point_encoding),
            Kind::Timestamp(ts) => self.encoder.write_timestamp(
                ts,
                options.use_utc_timestamps,
                options.include_milliseconds_in_timestamps,
            ),
            Kind::Guid(guid) => self.encoder.write_guid(&guid, options.guid_as_base64),
            Kind::Bytes(bytes) => self.encoder.write_bytes(bytes),
            Kind::StrMap(entries) if !options.string_dictionaries_as_pairs => {
                self.write_string_dictionary(entries)
            }
            Kind::StrMap(entries) | Kind::Map(entries) => self.write_dictionary(entries),
            Kind::Seq(items) => {
                self.encoder.begin_array()?;
                for item in items {
                    self.write_value(item, Category::Unknown)?;
                }
                self.encoder.end_container()
            }
            Kind::Enum(e) if options.serialize_enums_as_integers => self.encoder.write_i64(e.value()),
            Kind::Enum(e) => self.encoder.write_str(e.name()),
            Kind::Object(object) => self.write_object(object),
        }
    }

    fn write_custom(&mut self, custom: &CustomType, value: &dyn Reflect) -> Result<()> {
        let text = custom.serialize(value.as_any()).ok_or_else(|| {
            Error::Custom(format!(
                "custom serializer for `{}` received a different type",
                custom.type_name()
            ))
        })?;
        self.encoder.write_str(&text)
    }

    /// Text-keyed dictionary as a JSON object.
    fn write_string_dictionary(&mut self, entries: Entries<'_>) -> Result<()> {
        self.encoder.begin_object()?;
        for (key, value) in entries {
            if !self.options.emit_null_values && is_null(value) {
                continue;
            }
            let key = key_text(key)?;
            if self.options.lowercase_member_names {
                self.encoder.write_key(&key.to_lowercase())?;
            } else {
                self.encoder.write_key(&key)?;
            }
            self.write_value(value, Category::Unknown)?;
        }
        self.encoder.end_container()
    }

    /// Any dictionary as `[{"k":key,"v":value},…]`.
    fn write_dictionary(&mut self, entries: Entries<'_>) -> Result<()> {
        self.encoder.begin_array()?;
        for (key, value) in entries {
            self.encoder.begin_object()?;
            self.encoder.write_key(ext_key::ENTRY_KEY)?;
            self.write_value(key, Category::Unknown)?;
            self.encoder.write_key(ext_key::ENTRY_VALUE)?;
            self.write_value(value, Category::Unknown)?;
            self.encoder.end_container()?;
        }
        self.encoder.end_container()
    }

    fn write_object(&mut self, object: ObjectRef<'_>) -> Result<()> {
        if let Some(identity) = object.identity() {
            match self.references.get(identity) {
                Some(id) if !self.options.inline_circular_references => {
                    return self.write_back_reference(id);
                }
                Some(_) => {}
                None => {
                    self.references.register(identity);
                }
            }
        }

        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(Error::MaxDepthExceeded {
                max_depth: self.options.max_depth,
            });
        }

        let descriptor = TypeDescriptorCache::get_members(object.type_id(), object.shape_fn())?;
        let options = self.options;

        self.encoder.begin_object()?;
        if self.use_type_table && self.table_at.is_none() {
            self.table_at = Some(self.encoder.len());
        }
        if options.use_extensions {
            self.encoder.write_key(ext_key::TYPE)?;
            if self.use_type_table {
                let id = self.types.id_for(descriptor.type_name());
                self.encoder.write_u64(id as u64)?;
            } else {
                self.encoder.write_str(descriptor.type_name())?;
            }
        }

        let mut hints: Vec<(&str, &'static str)> = Vec::new();
        for member in descriptor.members() {
            if member.is_read_only_property() && !options.show_read_only_properties {
                continue;
            }
            let read = member
                .read(object.instance())
                .map_err(|err| Error::Accessor {
                    type_name: descriptor.type_name().to_owned(),
                    member: member.name().to_owned(),
                    message: err.to_string(),
                })?;

            let value = read.as_reflect();
            if options.emit_null_values || !is_null(value) {
                let name = member.output_name(options.lowercase_member_names);
                self.encoder.write_key(name)?;
                self.write_value(value, member.category())?;
                if options.use_extensions && member.category().is_unknown() {
                    if let Some(type_name) = runtime_type_hint(value) {
                        hints.push((name, type_name));
                    }
                }
            }

            if let Read::Owned(owned) = read {
                self.retained.push(owned);
            }
        }

        if !hints.is_empty() {
            self.encoder.write_key(ext_key::MAP)?;
            self.encoder.begin_object()?;
            for (name, type_name) in hints {
                self.encoder.write_key(name)?;
                self.encoder.write_str(type_name)?;
            }
            self.encoder.end_container()?;
        }

        self.encoder.end_container()?;
        self.depth -= 1;
        Ok(())
    }

    fn write_back_reference(&mut self, id: usize) -> Result<()> {
        self.encoder.begin_object()?;
        self.encoder.write_key(ext_key::REFERENCE)?;
        self.encoder.write_u64(id as u64)?;
        self.encoder.end_container()
    }
}

/// True when `value` is null after following indirections.
fn is_null(value: &dyn Reflect) -> bool {
    match value.kind() {
        Kind::Null => true,
        Kind::Indirect(inner) => is_null(inner),
        _ => false,
    }
}

/// True when `value` is written as a plain object.
fn resolves_to_object(value: &dyn Reflect) -> bool {
    if CustomTypeRegistry::contains(value.as_any().type_id()) {
        return false;
    }
    match value.kind() {
        Kind::Object(_) => true,
        Kind::Indirect(inner) => resolves_to_object(inner),
        _ => false,
    }
}

/// Runtime type name of values a reader could not restore from the JSON
/// alone: custom, temporal, guid, byte and enum values.
fn runtime_type_hint(value: &dyn Reflect) -> Option<&'static str> {
    if CustomTypeRegistry::contains(value.as_any().type_id()) {
        return Some(value.reflect_type_name());
    }
    match value.kind() {
        Kind::Indirect(inner) => runtime_type_hint(inner),
        Kind::Timestamp(_) | Kind::Guid(_) | Kind::Bytes(_) | Kind::Enum(_) => {
            Some(value.reflect_type_name())
        }
        _ => None,
    }
}

fn key_text(key: &dyn Reflect) -> Result<Cow<'_, str>> {
    match key.kind() {
        Kind::Str(text) => Ok(Cow::Borrowed(text)),
        Kind::Char(c) => Ok(Cow::Owned(c.to_string())),
        Kind::Indirect(inner) => key_text(inner),
        _ => Err(Error::InvalidObjectKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::Object;
    use crate::shape::Shape;
    use crate::{reflect_enum, reflect_object, to_string, to_string_with_options};
    use std::collections::BTreeMap;

    #[derive(Clone, Copy)]
    enum Shade {
        Light,
        Dark = 7,
    }

    reflect_enum!(Shade { Light, Dark });

    struct Tile {
        id: i32,
        name: Option<String>,
        shade: Shade,
        any: Box<dyn Reflect>,
    }

    impl Object for Tile {
        fn describe(shape: &mut Shape<Self>) {
            shape.name("Tile");
            shape.field("Id", |t| &t.id);
            shape.field("Name", |t| &t.name);
            shape.field("Shade", |t| &t.shade);
            shape.field("Any", |t| &t.any);
            shape.property("Double", |t| t.id * 2);
        }
    }

    reflect_object!(Tile);

    fn tile() -> Tile {
        Tile {
            id: 3,
            name: None,
            shade: Shade::Dark,
            any: Box::new(Shade::Light),
        }
    }

    #[test]
    fn test_plain_object_strict() {
        let json = to_string_with_options(&tile(), &SerializationOptions::strict()).unwrap();
        assert_eq!(json, r#"{"Id":3,"Name":null,"Shade":"Dark","Any":"Light"}"#);
    }

    #[test]
    fn test_extensions_and_type_table() {
        let json = to_string(&tile()).unwrap();
        assert!(json.starts_with(r#"{"___types":{"Tile":1},"___type":1,"Id":3"#));
        assert!(json.ends_with(r#""___map":{"Any":"reflect_json::ser::tests::Shade"}}"#));
    }

    #[test]
    fn test_option_switches() {
        let options = SerializationOptions {
            emit_null_values: false,
            lowercase_member_names: true,
            serialize_enums_as_integers: true,
            show_read_only_properties: true,
            ..SerializationOptions::strict()
        };
        let json = to_string_with_options(&tile(), &options).unwrap();
        assert_eq!(json, r#"{"id":3,"shade":7,"any":0,"double":6}"#);
    }

    #[test]
    fn test_dictionaries() {
        let mut by_name = BTreeMap::new();
        by_name.insert("B", Some(2));
        by_name.insert("a", None);
        let json = to_string(&by_name).unwrap();
        assert_eq!(json, r#"{"B":2,"a":null}"#);

        let options = SerializationOptions {
            emit_null_values: false,
            lowercase_member_names: true,
            ..SerializationOptions::default()
        };
        assert_eq!(to_string_with_options(&by_name, &options).unwrap(), r#"{"b":2}"#);

        let pairs = SerializationOptions {
            string_dictionaries_as_pairs: true,
            ..SerializationOptions::default()
        };
        assert_eq!(
            to_string_with_options(&by_name, &pairs).unwrap(),
            r#"[{"k":"B","v":2},{"k":"a","v":null}]"#
        );

        let mut by_id = BTreeMap::new();
        by_id.insert(2u8, "two");
        by_id.insert(1u8, "one");
        assert_eq!(
            to_string(&by_id).unwrap(),
            r#"[{"k":1,"v":"one"},{"k":2,"v":"two"}]"#
        );
    }

    #[test]
    fn test_non_object_root_has_no_table() {
        let tiles = vec![tile()];
        let json = to_string(&tiles).unwrap();
        assert!(json.starts_with(r#"[{"___type":"Tile","Id":3"#));
        assert!(!json.contains(ext_key::TYPES));
    }

    #[test]
    fn test_invalid_options_fail_before_traversal() {
        let options = SerializationOptions {
            use_extensions: false,
            ..SerializationOptions::default()
        };
        let err = to_string_with_options(&tile(), &options).unwrap_err();
        assert_eq!(err.error_type(), "invalid_options");
    }

    #[test]
    fn test_invalid_dictionary_key() {
        struct Weird;
        impl Reflect for Weird {
            fn kind(&self) -> Kind<'_> {
                let entries = std::iter::once((&1i32 as &dyn Reflect, &2i32 as &dyn Reflect));
                Kind::StrMap(Box::new(entries))
            }
        }
        let err = to_string(&Weird).unwrap_err();
        assert_eq!(err, Error::InvalidObjectKey);
    }
}
