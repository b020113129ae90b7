//! Layout calculation: resolves a [`Pdef`] into fixed byte layouts.
//!
//! Resolution is two-pass. The first pass interns every struct and enum
//! name so references may point forward; the second walks each struct
//! depth-first, resolving field types to interned ids, computing sizes and
//! offsets, and rejecting cycles. The result is a plan of
//! `(offset, size, type)` descriptors per struct that the codecs
//! interpret without ever recomputing a size.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::SchemaError;
use crate::limits::{
    BOOL_SIZE, ENUM_SIZE, FLOAT32_SIZE, INT32_SIZE, MAX_ENUM_MEMBERS, MAX_STRUCT_SIZE,
    MAX_VALUE_COUNT, ROOT_NAME,
};
use crate::model::{EnumDef, Field, Pdef, TypeInfo};

/// Index of a struct within a loaded schema. The root is always id 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructId(pub(crate) usize);

impl StructId {
    /// The root struct.
    pub const ROOT: StructId = StructId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of an enum within a loaded schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(pub(crate) usize);

impl EnumId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A resolved field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Int32,
    Float32,
    Bool,
    FixedString {
        len: usize,
    },
    Struct(StructId),
    Enum(EnumId),
    /// Fixed-length array. `index` is set when the length comes from an
    /// enum's member count.
    Array {
        len: usize,
        elem: Box<Ty>,
        elem_size: usize,
        index: Option<EnumId>,
    },
}

impl Ty {
    /// Short name of the value kind this type holds (e.g. "int").
    pub fn kind_name(&self) -> &'static str {
        match self {
            Ty::Int32 => "int",
            Ty::Float32 => "float",
            Ty::Bool => "bool",
            Ty::FixedString { .. } => "string",
            Ty::Struct(_) => "struct",
            Ty::Enum(_) => "enum",
            Ty::Array { .. } => "array",
        }
    }
}

/// Placement of one field within its struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    name: String,
    offset: usize,
    size: usize,
    ty: Ty,
}

impl FieldLayout {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte offset from the start of the enclosing struct.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    /// Byte range of this field within the enclosing struct.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size
    }
}

/// The byte-packed layout of one struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    name: String,
    fields: Vec<FieldLayout>,
    size: usize,
    by_name: FxHashMap<String, usize>,
}

impl StructLayout {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration (and offset) order.
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Total encoded size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }
}

/// Output of [`resolve`].
#[derive(Debug)]
pub(crate) struct Resolved {
    pub structs: Vec<StructLayout>,
    pub enums: Vec<EnumDef>,
    pub struct_index: FxHashMap<String, StructId>,
    pub enum_index: FxHashMap<String, EnumId>,
}

/// Encoded size of a type and the number of values a decoded instance
/// holds, counting every nested struct and array element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Extent {
    size: usize,
    values: usize,
}

impl Extent {
    fn scalar(size: usize) -> Self {
        Extent { size, values: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    Active,
    Done,
}

struct Resolver<'p> {
    decls: Vec<(&'p str, &'p [Field])>,
    enums: &'p [EnumDef],
    struct_index: FxHashMap<String, StructId>,
    enum_index: FxHashMap<String, EnumId>,
    state: Vec<Visit>,
    extents: Vec<Extent>,
    layouts: Vec<Option<StructLayout>>,
    stack: Vec<usize>,
}

/// Resolves every name in `pdef` and computes all struct layouts.
pub(crate) fn resolve(pdef: &Pdef) -> Result<Resolved, SchemaError> {
    if !matches!(pdef.root.first(), Some(Field { ty: TypeInfo::Int32, .. })) {
        return Err(SchemaError::MissingVersionField);
    }

    // Pass 1: intern names.
    let mut decls = Vec::with_capacity(pdef.structs.len() + 1);
    decls.push((ROOT_NAME, pdef.root.as_slice()));

    let mut struct_index = FxHashMap::default();
    for def in &pdef.structs {
        let id = StructId(decls.len());
        if struct_index.insert(def.name.clone(), id).is_some() {
            return Err(SchemaError::DuplicateStruct {
                name: def.name.clone(),
            });
        }
        decls.push((def.name.as_str(), def.fields.as_slice()));
    }

    let mut enum_index = FxHashMap::default();
    for (i, def) in pdef.enums.iter().enumerate() {
        if enum_index.insert(def.name.clone(), EnumId(i)).is_some() {
            return Err(SchemaError::DuplicateEnum {
                name: def.name.clone(),
            });
        }
        check_enum(def)?;
    }

    // Pass 2: lay out every struct, including ones nothing references.
    let count = decls.len();
    let mut resolver = Resolver {
        decls,
        enums: &pdef.enums,
        struct_index,
        enum_index,
        state: vec![Visit::Pending; count],
        extents: vec![Extent::default(); count],
        layouts: vec![None; count],
        stack: Vec::new(),
    };
    for id in 0..count {
        resolver.visit(id)?;
    }

    let structs: Vec<StructLayout> = resolver.layouts.into_iter().flatten().collect();
    debug_assert_eq!(structs.len(), count);

    Ok(Resolved {
        structs,
        enums: pdef.enums.clone(),
        struct_index: resolver.struct_index,
        enum_index: resolver.enum_index,
    })
}

fn check_enum(def: &EnumDef) -> Result<(), SchemaError> {
    if def.values.len() > MAX_ENUM_MEMBERS {
        return Err(SchemaError::EnumTooLarge {
            name: def.name.clone(),
            count: def.values.len(),
            max: MAX_ENUM_MEMBERS,
        });
    }
    let mut seen = FxHashSet::default();
    for value in &def.values {
        if !seen.insert(value.as_str()) {
            return Err(SchemaError::DuplicateEnumValue {
                name: def.name.clone(),
                value: value.clone(),
            });
        }
    }
    Ok(())
}

impl Resolver<'_> {
    /// Lays out struct `id` (and everything it embeds), returning the
    /// extent of its fields.
    fn visit(&mut self, id: usize) -> Result<Extent, SchemaError> {
        match self.state[id] {
            Visit::Done => return Ok(self.extents[id]),
            Visit::Active => return Err(self.cycle_error(id)),
            Visit::Pending => {}
        }
        self.state[id] = Visit::Active;
        self.stack.push(id);

        let (name, fields) = self.decls[id];
        let mut layouts = Vec::with_capacity(fields.len());
        let mut by_name = FxHashMap::default();
        let mut offset = 0usize;
        let mut values = 0usize;

        for field in fields {
            if by_name.insert(field.name.clone(), layouts.len()).is_some() {
                return Err(SchemaError::DuplicateField {
                    name: name.to_string(),
                    field: field.name.clone(),
                });
            }
            let (ty, extent) = self.resolve_type(name, &field.name, &field.ty)?;
            let size = extent.size;
            let end = offset
                .checked_add(size)
                .filter(|&end| end <= MAX_STRUCT_SIZE)
                .ok_or_else(|| too_large(name))?;
            values = values
                .checked_add(extent.values)
                .filter(|&n| n <= MAX_VALUE_COUNT)
                .ok_or_else(|| too_many_values(name))?;
            layouts.push(FieldLayout {
                name: field.name.clone(),
                offset,
                size,
                ty,
            });
            offset = end;
        }

        self.stack.pop();
        self.state[id] = Visit::Done;
        self.extents[id] = Extent {
            size: offset,
            values,
        };
        self.layouts[id] = Some(StructLayout {
            name: name.to_string(),
            fields: layouts,
            size: offset,
            by_name,
        });
        Ok(self.extents[id])
    }

    fn resolve_type(
        &mut self,
        owner: &str,
        field: &str,
        ty: &TypeInfo,
    ) -> Result<(Ty, Extent), SchemaError> {
        Ok(match ty {
            TypeInfo::Int32 => (Ty::Int32, Extent::scalar(INT32_SIZE)),
            TypeInfo::Float32 => (Ty::Float32, Extent::scalar(FLOAT32_SIZE)),
            TypeInfo::Bool => (Ty::Bool, Extent::scalar(BOOL_SIZE)),
            TypeInfo::FixedString { len } => {
                (Ty::FixedString { len: *len }, Extent::scalar(*len))
            }
            TypeInfo::StructRef { name } => {
                let id = self.struct_index.get(name).copied().ok_or_else(|| {
                    SchemaError::UndefinedStruct {
                        name: name.clone(),
                        referenced_by: format!("{owner}.{field}"),
                    }
                })?;
                let fields = self.visit(id.0)?;
                let extent = Extent {
                    size: fields.size,
                    values: fields.values + 1,
                };
                (Ty::Struct(id), extent)
            }
            TypeInfo::EnumRef { name } => {
                let id = self.enum_id(owner, field, name)?;
                (Ty::Enum(id), Extent::scalar(ENUM_SIZE))
            }
            TypeInfo::Array { len, elem } => self.resolve_array(owner, field, *len, elem, None)?,
            TypeInfo::MappedArray { enum_ref, elem } => {
                let id = self.enum_id(owner, field, enum_ref)?;
                let len = self.enums[id.0].values.len();
                self.resolve_array(owner, field, len, elem, Some(id))?
            }
        })
    }

    fn resolve_array(
        &mut self,
        owner: &str,
        field: &str,
        len: usize,
        elem: &TypeInfo,
        index: Option<EnumId>,
    ) -> Result<(Ty, Extent), SchemaError> {
        let (elem, elem_extent) = self.resolve_type(owner, field, elem)?;
        let size = elem_extent
            .size
            .checked_mul(len)
            .filter(|&size| size <= MAX_STRUCT_SIZE)
            .ok_or_else(|| too_large(owner))?;
        // Zero-width elements take no bytes but still become values.
        let values = elem_extent
            .values
            .checked_mul(len)
            .and_then(|n| n.checked_add(1))
            .filter(|&n| n <= MAX_VALUE_COUNT)
            .ok_or_else(|| too_many_values(owner))?;
        let ty = Ty::Array {
            len,
            elem: Box::new(elem),
            elem_size: elem_extent.size,
            index,
        };
        Ok((ty, Extent { size, values }))
    }

    fn enum_id(&self, owner: &str, field: &str, name: &str) -> Result<EnumId, SchemaError> {
        self.enum_index
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::UndefinedEnum {
                name: name.to_string(),
                referenced_by: format!("{owner}.{field}"),
            })
    }

    fn cycle_error(&self, id: usize) -> SchemaError {
        let start = self.stack.iter().position(|&s| s == id).unwrap_or(0);
        let mut names: Vec<&str> = self.stack[start..]
            .iter()
            .map(|&s| self.decls[s].0)
            .collect();
        names.push(self.decls[id].0);
        SchemaError::CyclicStruct {
            cycle: names.join(" -> "),
        }
    }
}

fn too_large(name: &str) -> SchemaError {
    SchemaError::StructTooLarge {
        name: name.to_string(),
        max: MAX_STRUCT_SIZE,
    }
}

fn too_many_values(name: &str) -> SchemaError {
    SchemaError::TooManyValues {
        name: name.to_string(),
        max: MAX_VALUE_COUNT,
    }
}
