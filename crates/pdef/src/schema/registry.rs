//! The loaded schema and its codec entry points.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::codec::{self, PathFilter};
use crate::error::{DecodeError, EncodeError, JsonError, SchemaError};
use crate::limits::{BOOL_SIZE, ENUM_SIZE, FLOAT32_SIZE, INT32_SIZE, MAX_STRUCT_SIZE};
use crate::model::{EnumDef, Pdata, Pdef, Record, TypeInfo, Value};
use crate::schema::layout::{resolve, EnumId, StructId, StructLayout};

/// A resolved pdef bound to its version constant.
///
/// Immutable once loaded. Records borrow the schema they were created
/// from, so a schema stored in a `static` yields `'static` records that
/// can move freely between threads.
#[derive(Debug)]
pub struct Schema {
    version: i32,
    structs: Vec<StructLayout>,
    enums: Vec<EnumDef>,
    struct_index: FxHashMap<String, StructId>,
    enum_index: FxHashMap<String, EnumId>,
}

impl Schema {
    /// Resolves `pdef` and computes every layout.
    ///
    /// Fails on undefined or cyclic references, duplicate names, enums
    /// with more than 256 members, a root whose first field is not an
    /// `int`, or a layout larger than [`MAX_STRUCT_SIZE`].
    pub fn load(pdef: &Pdef, version: i32) -> Result<Self, SchemaError> {
        let resolved = resolve(pdef)?;
        let schema = Self {
            version,
            structs: resolved.structs,
            enums: resolved.enums,
            struct_index: resolved.struct_index,
            enum_index: resolved.enum_index,
        };
        debug!(
            version,
            structs = schema.structs.len() - 1,
            enums = schema.enums.len(),
            root_size = schema.root().size(),
            "loaded pdef schema"
        );
        Ok(schema)
    }

    /// The root version constant.
    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn root_id(&self) -> StructId {
        StructId::ROOT
    }

    /// Layout of the root record.
    pub fn root(&self) -> &StructLayout {
        &self.structs[0]
    }

    /// Id of a named (non-root) struct.
    pub fn struct_id(&self, name: &str) -> Option<StructId> {
        self.struct_index.get(name).copied()
    }

    pub fn struct_layout(&self, id: StructId) -> Option<&StructLayout> {
        self.structs.get(id.0)
    }

    pub fn struct_by_name(&self, name: &str) -> Option<&StructLayout> {
        self.struct_id(name).map(|id| self.layout(id))
    }

    /// Every layout, root first.
    pub fn structs(&self) -> &[StructLayout] {
        &self.structs
    }

    pub fn enum_id(&self, name: &str) -> Option<EnumId> {
        self.enum_index.get(name).copied()
    }

    pub fn enum_def(&self, id: EnumId) -> Option<&EnumDef> {
        self.enums.get(id.0)
    }

    pub fn enum_by_name(&self, name: &str) -> Option<&EnumDef> {
        self.enum_id(name).map(|id| self.enum_at(id))
    }

    pub fn enums(&self) -> &[EnumDef] {
        &self.enums
    }

    /// Ids handed out by this schema always index a layout.
    pub(crate) fn layout(&self, id: StructId) -> &StructLayout {
        &self.structs[id.0]
    }

    pub(crate) fn enum_at(&self, id: EnumId) -> &EnumDef {
        &self.enums[id.0]
    }

    /// Encoded size of a type expression against this schema's names.
    pub fn size_of(&self, ty: &TypeInfo) -> Result<usize, SchemaError> {
        let size = match ty {
            TypeInfo::Int32 => INT32_SIZE,
            TypeInfo::Float32 => FLOAT32_SIZE,
            TypeInfo::Bool => BOOL_SIZE,
            TypeInfo::EnumRef { .. } => ENUM_SIZE,
            TypeInfo::FixedString { len } => *len,
            TypeInfo::StructRef { name } => self
                .struct_by_name(name)
                .map(StructLayout::size)
                .ok_or_else(|| SchemaError::UndefinedStruct {
                    name: name.clone(),
                    referenced_by: ty.to_string(),
                })?,
            TypeInfo::Array { len, elem } => self.array_size(ty, *len, elem)?,
            TypeInfo::MappedArray { enum_ref, elem } => {
                let arity = self
                    .enum_by_name(enum_ref)
                    .map(EnumDef::arity)
                    .ok_or_else(|| SchemaError::UndefinedEnum {
                        name: enum_ref.clone(),
                        referenced_by: ty.to_string(),
                    })?;
                self.array_size(ty, arity, elem)?
            }
        };
        Ok(size)
    }

    fn array_size(&self, ty: &TypeInfo, len: usize, elem: &TypeInfo) -> Result<usize, SchemaError> {
        self.size_of(elem)?
            .checked_mul(len)
            .filter(|&size| size <= MAX_STRUCT_SIZE)
            .ok_or_else(|| SchemaError::StructTooLarge {
                name: ty.to_string(),
                max: MAX_STRUCT_SIZE,
            })
    }

    /// A zeroed root record with the version field set and no tail.
    pub fn new_pdata(&self) -> Pdata<'_> {
        let mut root = Record::zeroed(self, StructId::ROOT);
        root.values_mut()[0] = Value::Int(self.version);
        Pdata {
            root,
            tail: Vec::new(),
        }
    }

    /// A zeroed record of a named struct.
    pub fn new_record(&self, name: &str) -> Option<Record<'_>> {
        self.struct_id(name).map(|id| Record::zeroed(self, id))
    }

    /// Decodes a root pdata buffer. See [`codec::decode_pdata`].
    pub fn decode(&self, b: &[u8]) -> Result<Pdata<'_>, DecodeError> {
        codec::decode_pdata(self, b)
    }

    /// Decodes a named struct from a buffer of exactly its size.
    pub fn decode_struct(&self, name: &str, b: &[u8]) -> Result<Record<'_>, DecodeError> {
        let id = self.struct_id(name).ok_or_else(|| DecodeError::UnknownStruct {
            name: name.to_string(),
        })?;
        codec::decode_record(self, id, b)
    }

    /// Encodes a root record followed by its tail.
    pub fn encode(&self, pdata: &Pdata<'_>) -> Result<Vec<u8>, EncodeError> {
        codec::encode_pdata(self, pdata)
    }

    /// Encodes a single struct without a tail. The root is version-checked.
    pub fn encode_struct(&self, record: &Record<'_>) -> Result<Vec<u8>, EncodeError> {
        codec::encode_record(self, record)
    }

    /// JSON projection of a root record.
    pub fn marshal_json(&self, pdata: &Pdata<'_>) -> Result<Vec<u8>, EncodeError> {
        codec::marshal_pdata_json(self, pdata, None)
    }

    /// JSON projection of a root record, keeping only the fields whose
    /// path `filter` accepts.
    pub fn marshal_json_filter<F>(&self, pdata: &Pdata<'_>, filter: F) -> Result<Vec<u8>, EncodeError>
    where
        F: Fn(&[&str]) -> bool,
    {
        let filter: PathFilter<'_> = &filter;
        codec::marshal_pdata_json(self, pdata, Some(filter))
    }

    /// JSON projection of a single struct.
    pub fn marshal_struct_json(&self, record: &Record<'_>) -> Result<Vec<u8>, EncodeError> {
        codec::marshal_record_json(self, record, None)
    }

    /// Parses the JSON projection back into a root record.
    pub fn unmarshal_json(&self, b: &[u8]) -> Result<Pdata<'_>, JsonError> {
        codec::unmarshal_pdata_json(self, b)
    }
}
