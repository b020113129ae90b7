//! Builder API for constructing a [`Pdef`] in code.
//!
//! # Example
//!
//! ```rust
//! use pdef::model::builder::PdefBuilder;
//! use pdef::TypeInfo;
//!
//! let pdef = PdefBuilder::new()
//!     .root(|s| s
//!         .int("version")
//!         .string("name", 8)
//!         .struct_ref("stats", "sStats")
//!     )
//!     .struct_def("sStats", |s| s
//!         .int("score")
//!         .mapped_array("kills", "eMode", TypeInfo::Int32)
//!     )
//!     .enum_def("eMode", ["ffa", "ctf"])
//!     .build();
//!
//! assert_eq!(pdef.root.len(), 3);
//! ```

use crate::model::{EnumDef, Field, Pdef, StructDef, TypeInfo};

/// Builder for a complete [`Pdef`].
#[derive(Debug, Clone, Default)]
pub struct PdefBuilder {
    root: Vec<Field>,
    structs: Vec<StructDef>,
    enums: Vec<EnumDef>,
}

impl PdefBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the root record's fields, replacing any previous root.
    pub fn root<F>(mut self, f: F) -> Self
    where
        F: FnOnce(StructBuilder) -> StructBuilder,
    {
        self.root = f(StructBuilder::new()).fields;
        self
    }

    /// Declares a named struct.
    pub fn struct_def<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(StructBuilder) -> StructBuilder,
    {
        self.structs.push(StructDef {
            name: name.into(),
            fields: f(StructBuilder::new()).fields,
        });
        self
    }

    /// Declares a named enum; members get ordinals in iteration order.
    pub fn enum_def<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enums.push(EnumDef::new(name, values));
        self
    }

    /// Builds the pdef. Names are not resolved until the pdef is loaded.
    pub fn build(self) -> Pdef {
        Pdef {
            root: self.root,
            structs: self.structs,
            enums: self.enums,
        }
    }
}

/// Builder for the ordered field list of one struct.
#[derive(Debug, Clone, Default)]
pub struct StructBuilder {
    fields: Vec<Field>,
}

impl StructBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field with an arbitrary type expression.
    pub fn field(mut self, name: impl Into<String>, ty: TypeInfo) -> Self {
        self.fields.push(Field::new(name, ty));
        self
    }

    pub fn int(self, name: impl Into<String>) -> Self {
        self.field(name, TypeInfo::Int32)
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.field(name, TypeInfo::Float32)
    }

    pub fn bool(self, name: impl Into<String>) -> Self {
        self.field(name, TypeInfo::Bool)
    }

    /// Adds a `string(len)` field.
    pub fn string(self, name: impl Into<String>, len: usize) -> Self {
        self.field(name, TypeInfo::string(len))
    }

    pub fn struct_ref(self, name: impl Into<String>, struct_name: impl Into<String>) -> Self {
        self.field(name, TypeInfo::struct_ref(struct_name))
    }

    pub fn enum_ref(self, name: impl Into<String>, enum_name: impl Into<String>) -> Self {
        self.field(name, TypeInfo::enum_ref(enum_name))
    }

    /// Adds an `array(len, elem)` field.
    pub fn array(self, name: impl Into<String>, len: usize, elem: TypeInfo) -> Self {
        self.field(name, TypeInfo::array(len, elem))
    }

    /// Adds an array field with one element per member of `enum_name`.
    pub fn mapped_array(
        self,
        name: impl Into<String>,
        enum_name: impl Into<String>,
        elem: TypeInfo,
    ) -> Self {
        self.field(name, TypeInfo::mapped_array(enum_name, elem))
    }

    /// Returns the declared fields.
    pub fn build(self) -> Vec<Field> {
        self.fields
    }
}
