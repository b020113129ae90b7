//! Schema resolution and the loaded, immutable [`Schema`].

pub mod layout;
pub mod registry;

pub use layout::{EnumId, FieldLayout, StructId, StructLayout, Ty};
pub use registry::Schema;
