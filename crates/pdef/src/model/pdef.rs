//! The parsed form of a pdef: root fields, named structs and named enums.
//!
//! Type references are by name and may point forward; they are resolved
//! when the model is loaded into a [`Schema`](crate::Schema).

use std::fmt;

/// A type expression as written in a pdef field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum TypeInfo {
    /// `int`: little-endian i32.
    Int32,
    /// `float`: little-endian IEEE-754 f32.
    Float32,
    /// `bool`: one byte.
    Bool,
    /// `string(N)`: N bytes, zero padded.
    FixedString { len: usize },
    /// A reference to a named struct.
    StructRef { name: String },
    /// A reference to a named enum (one ordinal byte).
    EnumRef { name: String },
    /// `array(N, T)`.
    Array { len: usize, elem: Box<TypeInfo> },
    /// An array with one element per member of `enum_ref`.
    MappedArray { enum_ref: String, elem: Box<TypeInfo> },
}

impl TypeInfo {
    pub fn string(len: usize) -> Self {
        TypeInfo::FixedString { len }
    }

    pub fn struct_ref(name: impl Into<String>) -> Self {
        TypeInfo::StructRef { name: name.into() }
    }

    pub fn enum_ref(name: impl Into<String>) -> Self {
        TypeInfo::EnumRef { name: name.into() }
    }

    pub fn array(len: usize, elem: TypeInfo) -> Self {
        TypeInfo::Array {
            len,
            elem: Box::new(elem),
        }
    }

    pub fn mapped_array(enum_ref: impl Into<String>, elem: TypeInfo) -> Self {
        TypeInfo::MappedArray {
            enum_ref: enum_ref.into(),
            elem: Box::new(elem),
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeInfo::Int32 => f.write_str("int"),
            TypeInfo::Float32 => f.write_str("float"),
            TypeInfo::Bool => f.write_str("bool"),
            TypeInfo::FixedString { len } => write!(f, "string({len})"),
            TypeInfo::StructRef { name } | TypeInfo::EnumRef { name } => f.write_str(name),
            TypeInfo::Array { len, elem } => write!(f, "array({len}, {elem})"),
            TypeInfo::MappedArray { enum_ref, elem } => write!(f, "array({enum_ref}, {elem})"),
        }
    }
}

/// A named field. Declaration order fixes the byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub ty: TypeInfo,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeInfo) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A named struct declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<Field>,
}

/// A named enum declaration. A member's ordinal is its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A complete pdef: the root record plus every struct and enum it may use.
///
/// The first root field is the version field and must be an `int`; this
/// is checked when the pdef is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pdef {
    pub root: Vec<Field>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub structs: Vec<StructDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enums: Vec<EnumDef>,
}

impl Pdef {
    /// Finds a struct declaration by name.
    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Finds an enum declaration by name.
    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.name == name)
    }
}
