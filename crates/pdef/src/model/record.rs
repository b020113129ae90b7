//! Decoded, in-memory record values.
//!
//! A [`Record`] mirrors one struct layout of a loaded [`Schema`] and borrows
//! that schema; [`Pdata`] is the root record plus its opaque tail bytes.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::error::EncodeError;
use crate::schema::{FieldLayout, Schema, StructId, StructLayout, Ty};

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'s> {
    Int(i32),
    Float(f32),
    Bool(bool),
    /// Fixed-string content without its zero padding. Kept as raw bytes so
    /// non-UTF-8 content survives a binary round trip.
    String(Vec<u8>),
    /// Raw enum ordinal, possibly outside the enum's declared range.
    Enum(u8),
    Struct(Record<'s>),
    Array(Vec<Value<'s>>),
}

impl<'s> Value<'s> {
    /// Creates a string value.
    pub fn string(value: impl Into<Vec<u8>>) -> Self {
        Value::String(value.into())
    }

    /// Short name of this value's kind (e.g. "int").
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Enum(_) => "enum",
            Value::Struct(_) => "struct",
            Value::Array(_) => "array",
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// String content, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_enum(&self) -> Option<u8> {
        match self {
            Value::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record<'s>> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record<'s>> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value<'s>]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value<'s>>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// The zero value of `ty`: all numbers 0, strings empty, ordinals 0.
    pub(crate) fn zeroed(schema: &'s Schema, ty: &Ty) -> Self {
        match ty {
            Ty::Int32 => Value::Int(0),
            Ty::Float32 => Value::Float(0.0),
            Ty::Bool => Value::Bool(false),
            Ty::FixedString { .. } => Value::String(Vec::new()),
            Ty::Enum(_) => Value::Enum(0),
            Ty::Struct(id) => Value::Struct(Record::zeroed(schema, *id)),
            Ty::Array { len, elem, .. } => {
                Value::Array((0..*len).map(|_| Value::zeroed(schema, elem)).collect())
            }
        }
    }

    /// Returns true if this value has the shape `ty` requires, recursively.
    ///
    /// String length is not checked here; it is an encode-time size error.
    pub(crate) fn conforms(&self, schema: &Schema, ty: &Ty) -> bool {
        match (ty, self) {
            (Ty::Int32, Value::Int(_))
            | (Ty::Float32, Value::Float(_))
            | (Ty::Bool, Value::Bool(_))
            | (Ty::FixedString { .. }, Value::String(_))
            | (Ty::Enum(_), Value::Enum(_)) => true,
            (Ty::Struct(id), Value::Struct(r)) => r.is_instance_of(schema, *id),
            (Ty::Array { len, elem, .. }, Value::Array(items)) => {
                items.len() == *len && items.iter().all(|v| v.conforms(schema, elem))
            }
            _ => false,
        }
    }
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value<'_> {
    fn from(v: &str) -> Self {
        Value::String(v.as_bytes().to_vec())
    }
}

impl<'s> From<Record<'s>> for Value<'s> {
    fn from(v: Record<'s>) -> Self {
        Value::Struct(v)
    }
}

/// One instance of a struct layout.
///
/// Values are stored in declaration order; the layout (and therefore the
/// field count) is fixed for the record's lifetime.
#[derive(Clone)]
pub struct Record<'s> {
    schema: &'s Schema,
    id: StructId,
    values: Vec<Value<'s>>,
}

impl<'s> Record<'s> {
    pub(crate) fn from_parts(schema: &'s Schema, id: StructId, values: Vec<Value<'s>>) -> Self {
        debug_assert_eq!(schema.layout(id).fields().len(), values.len());
        Self { schema, id, values }
    }

    pub(crate) fn zeroed(schema: &'s Schema, id: StructId) -> Self {
        let values = schema
            .layout(id)
            .fields()
            .iter()
            .map(|f| Value::zeroed(schema, f.ty()))
            .collect();
        Self { schema, id, values }
    }

    pub(crate) fn is_instance_of(&self, schema: &Schema, id: StructId) -> bool {
        std::ptr::eq(self.schema, schema) && self.id == id
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn struct_id(&self) -> StructId {
        self.id
    }

    pub fn layout(&self) -> &'s StructLayout {
        self.schema.layout(self.id)
    }

    /// The struct name ("pdata" for the root).
    pub fn name(&self) -> &'s str {
        self.layout().name()
    }

    /// Values in declaration order.
    pub fn values(&self) -> &[Value<'s>] {
        &self.values
    }

    /// Mutable values in declaration order. As with [`Record::get_mut`],
    /// shape mismatches surface when encoding.
    pub fn values_mut(&mut self) -> &mut [Value<'s>] {
        &mut self.values
    }

    /// Iterates over `(field layout, value)` pairs in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&'s FieldLayout, &Value<'s>)> {
        self.layout().fields().iter().zip(self.values.iter())
    }

    pub fn get(&self, field: &str) -> Option<&Value<'s>> {
        self.layout().field_index(field).map(|i| &self.values[i])
    }

    /// Mutable access to a field. The caller is responsible for keeping the
    /// value's shape; mismatches are reported when encoding.
    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value<'s>> {
        self.layout().field_index(field).map(|i| &mut self.values[i])
    }

    /// Replaces a field value, returning the previous one.
    ///
    /// The new value must have the field's shape (kind, nested struct,
    /// array length).
    pub fn set(
        &mut self,
        field: &str,
        value: impl Into<Value<'s>>,
    ) -> Result<Value<'s>, EncodeError> {
        let value = value.into();
        let layout = self.layout();
        let index = layout
            .field_index(field)
            .ok_or_else(|| EncodeError::UnknownField {
                name: layout.name().to_string(),
                field: field.to_string(),
            })?;
        let ty = layout.fields()[index].ty();
        if !value.conforms(self.schema, ty) {
            return Err(EncodeError::TypeMismatch {
                name: layout.name().to_string(),
                version: self.schema.version(),
                field: field.to_string(),
                expected: ty.kind_name(),
                found: value.kind_name(),
            });
        }
        Ok(std::mem::replace(&mut self.values[index], value))
    }

    /// Looks up a nested value by dotted path, with `[i]` for array
    /// elements (e.g. `"loadouts[2].name"`).
    pub fn lookup(&self, path: &str) -> Option<&Value<'s>> {
        let mut segments = path.split('.');
        let mut current = self.lookup_segment(segments.next()?)?;
        for segment in segments {
            current = current.as_record()?.lookup_segment(segment)?;
        }
        Some(current)
    }

    fn lookup_segment(&self, segment: &str) -> Option<&Value<'s>> {
        let (name, mut rest) = match segment.find('[') {
            Some(i) => segment.split_at(i),
            None => (segment, ""),
        };
        let mut current = self.get(name)?;
        while let Some(stripped) = rest.strip_prefix('[') {
            let (index, tail) = stripped.split_once(']')?;
            current = current.as_array()?.get(index.parse::<usize>().ok()?)?;
            rest = tail;
        }
        rest.is_empty().then_some(current)
    }
}

impl PartialEq for Record<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.id == other.id && self.values == other.values
    }
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.name());
        for (field, value) in self.fields() {
            s.field(field.name(), value);
        }
        s.finish()
    }
}

/// A decoded root record together with its tail data.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdata<'s> {
    pub root: Record<'s>,
    /// Bytes beyond the root layout, preserved verbatim and never parsed.
    pub tail: Vec<u8>,
}

impl<'s> Pdata<'s> {
    /// The root version field, if it holds an int.
    pub fn version(&self) -> Option<i32> {
        self.root.values().first().and_then(Value::as_int)
    }
}

impl<'s> Deref for Pdata<'s> {
    type Target = Record<'s>;

    fn deref(&self) -> &Record<'s> {
        &self.root
    }
}

impl DerefMut for Pdata<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builder::PdefBuilder;
    use crate::model::TypeInfo;

    fn schema() -> Schema {
        let pdef = PdefBuilder::new()
            .root(|s| {
                s.int("version")
                    .string("name", 8)
                    .struct_ref("stats", "sStats")
                    .array("loadouts", 2, TypeInfo::struct_ref("sLoadout"))
            })
            .struct_def("sStats", |s| s.int("score").float("kd"))
            .struct_def("sLoadout", |s| s.string("name", 4).array("mods", 2, TypeInfo::Int32))
            .build();
        Schema::load(&pdef, 3).unwrap()
    }

    #[test]
    fn test_zeroed_root() {
        let schema = schema();
        let pdata = schema.new_pdata();

        assert_eq!(pdata.version(), Some(3));
        assert_eq!(pdata.get("name"), Some(&Value::String(Vec::new())));
        assert_eq!(pdata.lookup("stats.kd"), Some(&Value::Float(0.0)));
        assert_eq!(pdata.lookup("loadouts[1].mods[0]"), Some(&Value::Int(0)));
        assert!(pdata.tail.is_empty());
    }

    #[test]
    fn test_lookup_rejects_bad_paths() {
        let schema = schema();
        let pdata = schema.new_pdata();

        assert!(pdata.lookup("missing").is_none());
        assert!(pdata.lookup("loadouts[2].name").is_none());
        assert!(pdata.lookup("loadouts[x]").is_none());
        assert!(pdata.lookup("name.inner").is_none());
        assert!(pdata.lookup("stats]").is_none());
    }

    #[test]
    fn test_set_checks_shape() {
        let schema = schema();
        let mut pdata = schema.new_pdata();

        let old = pdata.set("name", "bob").unwrap();
        assert_eq!(old, Value::String(Vec::new()));
        assert_eq!(pdata.get("name").and_then(Value::as_str), Some("bob"));

        let err = pdata.set("name", 5).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::TypeMismatch { expected: "string", found: "int", .. }
        ));

        let err = pdata.set("nope", 5).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownField { .. }));

        // Arrays must keep their declared length.
        let err = pdata.set("loadouts", Value::Array(Vec::new())).unwrap_err();
        assert!(matches!(err, EncodeError::TypeMismatch { .. }));

        // Nested records must be of the declared struct.
        let loadout = schema.new_record("sLoadout").unwrap();
        let err = pdata.set("stats", loadout).unwrap_err();
        assert!(matches!(err, EncodeError::TypeMismatch { .. }));

        let mut stats = schema.new_record("sStats").unwrap();
        stats.set("score", 42).unwrap();
        pdata.set("stats", stats).unwrap();
        assert_eq!(pdata.lookup("stats.score"), Some(&Value::Int(42)));
    }

    #[test]
    fn test_get_mut_nested() {
        let schema = schema();
        let mut pdata = schema.new_pdata();

        let loadouts = pdata.get_mut("loadouts").and_then(Value::as_array_mut).unwrap();
        let second = loadouts[1].as_record_mut().unwrap();
        second.set("name", "smg").unwrap();

        assert_eq!(
            pdata.lookup("loadouts[1].name").and_then(Value::as_str),
            Some("smg")
        );
    }

    #[test]
    fn test_debug_uses_field_names() {
        let schema = schema();
        let stats = schema.new_record("sStats").unwrap();
        assert_eq!(format!("{stats:?}"), "sStats { score: Int(0), kd: Float(0.0) }");
    }
}
