//! Data model: the parsed pdef and decoded record values.

pub mod builder;
pub mod pdef;
pub mod record;

pub use builder::{PdefBuilder, StructBuilder};
pub use pdef::{EnumDef, Field, Pdef, StructDef, TypeInfo};
pub use record::{Pdata, Record, Value};
