//! Binary and JSON codecs for pdef records.
//!
//! The binary format is byte-packed with no alignment: every multi-byte
//! number is little-endian and every field sits at the offset computed when
//! the schema was loaded. The root record starts with its `int` version
//! field and may be followed by tail bytes that are carried verbatim.

pub mod binary;
pub mod enums;
pub mod json;
pub mod primitives;

pub use binary::{decode_pdata, decode_record, encode_pdata, encode_record};
pub use json::{append_f32, marshal_pdata_json, marshal_record_json, unmarshal_pdata_json, PathFilter};

/// One step of a field path used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Seg<'a> {
    Field(&'a str),
    Index(usize),
}

/// Renders a path as `a.b[2].c`.
pub(crate) fn render(path: &[Seg<'_>]) -> String {
    let mut out = String::new();
    for seg in path {
        match seg {
            Seg::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            Seg::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// The innermost array index on the path, if any.
pub(crate) fn last_index(path: &[Seg<'_>]) -> Option<usize> {
    path.iter().rev().find_map(|seg| match seg {
        Seg::Index(i) => Some(*i),
        Seg::Field(_) => None,
    })
}
