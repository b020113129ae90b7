//! pdef: schema-driven codec for fixed-layout player data.
//!
//! A pdef declares one root record plus named structs and enums. This
//! crate resolves a pdef into byte-exact layouts once, then encodes and
//! decodes player data ("pdata") against those layouts and projects it to
//! JSON.
//!
//! # Overview
//!
//! - **Byte-exact**: for any valid root buffer, `encode(decode(b)) == b`,
//!   including out-of-range enum ordinals and trailing tail bytes
//! - **Load once**: layouts, offsets and enum arities are computed when the
//!   schema is loaded and never recomputed per call
//! - **Shareable**: a [`Schema`] is immutable and `Send + Sync`
//!
//! # Quick Start
//!
//! ```rust
//! use pdef::{PdefBuilder, Schema, Value};
//!
//! let pdef = PdefBuilder::new()
//!     .root(|s| s.int("version").string("name", 8).int("score"))
//!     .build();
//! let schema = Schema::load(&pdef, 1).unwrap();
//!
//! let mut pdata = schema.new_pdata();
//! pdata.set("name", "bob").unwrap();
//! pdata.set("score", 42).unwrap();
//!
//! let bytes = schema.encode(&pdata).unwrap();
//! assert_eq!(bytes.len(), 16);
//!
//! let decoded = schema.decode(&bytes).unwrap();
//! assert_eq!(decoded.get("score"), Some(&Value::Int(42)));
//!
//! let json = schema.marshal_json(&decoded).unwrap();
//! assert_eq!(json, br#"{"version":1,"name":"bob","score":42}"#);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Pdef declarations, the builder, and record values
//! - [`schema`]: Layout resolution and the loaded [`Schema`]
//! - [`codec`]: Binary, enum and JSON codecs
//! - [`blob`]: Hashing and compression of encoded pdata for storage
//! - [`error`]: Error types
//! - [`limits`]: Bounds applied at load and unpack
//!
//! # Wire Format
//!
//! Byte-packed, no alignment, little-endian:
//! - Root: `int` version, remaining fields in declaration order, then
//!   opaque tail bytes of any length
//! - Embedded structs: fields only, exact size

pub mod blob;
pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod schema;

// Re-export commonly used types at crate root
pub use blob::{compress, decompress, pdata_hash, BlobOptions, Compression, PdataHash, StoredPdata};
pub use codec::PathFilter;
pub use error::{BlobError, DecodeError, EncodeError, EnumError, ErrorKind, JsonError, SchemaError};
pub use model::{
    EnumDef, Field, Pdata, Pdef, PdefBuilder, Record, StructBuilder, StructDef, TypeInfo, Value,
};
pub use schema::{EnumId, FieldLayout, Schema, StructId, StructLayout, Ty};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
