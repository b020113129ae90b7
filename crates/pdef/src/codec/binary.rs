//! Fixed-layout binary encoding and decoding.
//!
//! Decoding validates the buffer size (and for the root, the version) up
//! front; once those checks pass every field read is infallible because
//! each sub-slice comes from a precomputed layout. Encoding allocates the
//! full output up front and writes each field into its slot, so an error
//! never leaves a partially written buffer with the caller.

use crate::codec::primitives::{
    get_bool, get_enum, get_f32, get_fixed_string, get_i32, put_bool, put_enum, put_f32,
    put_fixed_string, put_i32,
};
use crate::codec::{last_index, render, Seg};
use crate::error::{DecodeError, EncodeError};
use crate::limits::INT32_SIZE;
use crate::model::{Pdata, Record, Value};
use crate::schema::{Schema, StructId, Ty};

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a root pdata buffer.
///
/// The version is checked before any other field is read. Bytes beyond the
/// root layout are kept as the tail.
pub fn decode_pdata<'s>(schema: &'s Schema, b: &[u8]) -> Result<Pdata<'s>, DecodeError> {
    let root = schema.root();
    let version = schema.version();

    if b.len() < INT32_SIZE {
        return Err(DecodeError::MissingVersion {
            name: root.name().to_string(),
            version,
            actual: b.len(),
        });
    }

    let found = get_i32(&b[..INT32_SIZE]);
    if found != version {
        return Err(DecodeError::UnsupportedVersion {
            name: root.name().to_string(),
            version,
            found,
        });
    }

    if b.len() < root.size() {
        return Err(DecodeError::TooShort {
            name: root.name().to_string(),
            version,
            min: root.size(),
            actual: b.len(),
        });
    }

    let (body, tail) = b.split_at(root.size());
    Ok(Pdata {
        root: read_record(schema, StructId::ROOT, body),
        tail: tail.to_vec(),
    })
}

/// Decodes one struct from a buffer of exactly its layout size.
pub fn decode_record<'s>(
    schema: &'s Schema,
    id: StructId,
    b: &[u8],
) -> Result<Record<'s>, DecodeError> {
    let layout = schema.layout(id);
    if b.len() != layout.size() {
        return Err(DecodeError::InvalidSize {
            name: layout.name().to_string(),
            version: schema.version(),
            expected: layout.size(),
            actual: b.len(),
        });
    }
    Ok(read_record(schema, id, b))
}

fn read_record<'s>(schema: &'s Schema, id: StructId, b: &[u8]) -> Record<'s> {
    let values = schema
        .layout(id)
        .fields()
        .iter()
        .map(|f| read_value(schema, f.ty(), &b[f.range()]))
        .collect();
    Record::from_parts(schema, id, values)
}

fn read_value<'s>(schema: &'s Schema, ty: &Ty, b: &[u8]) -> Value<'s> {
    match ty {
        Ty::Int32 => Value::Int(get_i32(b)),
        Ty::Float32 => Value::Float(get_f32(b)),
        Ty::Bool => Value::Bool(get_bool(b)),
        Ty::FixedString { .. } => Value::String(get_fixed_string(b)),
        Ty::Enum(_) => Value::Enum(get_enum(b)),
        Ty::Struct(id) => Value::Struct(read_record(schema, *id, b)),
        Ty::Array {
            len,
            elem,
            elem_size,
            ..
        } => Value::Array(
            (0..*len)
                .map(|i| {
                    let start = i * elem_size;
                    read_value(schema, elem, &b[start..start + elem_size])
                })
                .collect(),
        ),
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a root pdata record followed by its tail.
pub fn encode_pdata(schema: &Schema, pdata: &Pdata<'_>) -> Result<Vec<u8>, EncodeError> {
    check_root(schema, &pdata.root)?;

    let size = schema.root().size();
    let mut out = Vec::with_capacity(size + pdata.tail.len());
    out.resize(size, 0);

    let mut path = Vec::new();
    write_record(schema, &pdata.root, &mut out, &mut path)?;

    out.extend_from_slice(&pdata.tail);
    Ok(out)
}

/// Encodes one struct to exactly its layout size, without a tail. A root
/// record still has its version checked.
pub fn encode_record(schema: &Schema, record: &Record<'_>) -> Result<Vec<u8>, EncodeError> {
    check_record(schema, record)?;

    let mut out = vec![0u8; record.layout().size()];
    let mut path = Vec::new();
    write_record(schema, record, &mut out, &mut path)?;
    Ok(out)
}

/// Fails unless `record` belongs to `schema` and is an instance of `id`.
pub(crate) fn check_owner(
    schema: &Schema,
    record: &Record<'_>,
    id: StructId,
) -> Result<(), EncodeError> {
    if record.is_instance_of(schema, id) {
        return Ok(());
    }
    Err(EncodeError::WrongStruct {
        expected: schema.layout(id).name().to_string(),
        found: record.name().to_string(),
    })
}

/// Fails unless `record` belongs to `schema`, with the version check
/// applied when it is the root.
pub(crate) fn check_record(schema: &Schema, record: &Record<'_>) -> Result<(), EncodeError> {
    if record.struct_id() == StructId::ROOT {
        check_root(schema, record)
    } else {
        check_owner(schema, record, record.struct_id())
    }
}

/// Fails unless `record` is this schema's root and carries its version.
pub(crate) fn check_root(schema: &Schema, record: &Record<'_>) -> Result<(), EncodeError> {
    check_owner(schema, record, StructId::ROOT)?;

    let root = schema.root();
    let version = schema.version();
    let version_field = &root.fields()[0];
    match record.values().first() {
        Some(Value::Int(found)) if *found == version => Ok(()),
        Some(Value::Int(found)) => Err(EncodeError::UnsupportedVersion {
            name: root.name().to_string(),
            version,
            found: *found,
        }),
        other => Err(EncodeError::TypeMismatch {
            name: root.name().to_string(),
            version,
            field: version_field.name().to_string(),
            expected: version_field.ty().kind_name(),
            found: other.map_or("nothing", Value::kind_name),
        }),
    }
}

fn write_record<'s>(
    schema: &Schema,
    record: &Record<'s>,
    b: &mut [u8],
    path: &mut Vec<Seg<'s>>,
) -> Result<(), EncodeError> {
    let owner = record.name();
    for (field, value) in record.fields() {
        path.push(Seg::Field(field.name()));
        write_value(schema, owner, field.ty(), value, &mut b[field.range()], path)?;
        path.pop();
    }
    Ok(())
}

fn write_value<'s>(
    schema: &Schema,
    owner: &str,
    ty: &Ty,
    value: &Value<'s>,
    b: &mut [u8],
    path: &mut Vec<Seg<'s>>,
) -> Result<(), EncodeError> {
    match (ty, value) {
        (Ty::Int32, Value::Int(v)) => put_i32(b, *v),
        (Ty::Float32, Value::Float(v)) => put_f32(b, *v),
        (Ty::Bool, Value::Bool(v)) => put_bool(b, *v),
        (Ty::Enum(_), Value::Enum(v)) => put_enum(b, *v),
        (Ty::FixedString { len }, Value::String(s)) => {
            put_fixed_string(b, s).map_err(|actual| EncodeError::StringTooLong {
                name: owner.to_string(),
                version: schema.version(),
                field: render(path),
                index: last_index(path),
                len: actual,
                max: *len,
            })?;
        }
        (Ty::Struct(id), Value::Struct(r)) => {
            check_owner(schema, r, *id)?;
            write_record(schema, r, b, path)?;
        }
        (
            Ty::Array {
                len,
                elem,
                elem_size,
                ..
            },
            Value::Array(items),
        ) => {
            if items.len() != *len {
                return Err(EncodeError::ArrayLength {
                    name: owner.to_string(),
                    version: schema.version(),
                    field: render(path),
                    expected: *len,
                    actual: items.len(),
                });
            }
            for (i, item) in items.iter().enumerate() {
                let start = i * elem_size;
                path.push(Seg::Index(i));
                write_value(schema, owner, elem, item, &mut b[start..start + elem_size], path)?;
                path.pop();
            }
        }
        _ => {
            return Err(EncodeError::TypeMismatch {
                name: owner.to_string(),
                version: schema.version(),
                field: render(path),
                expected: ty.kind_name(),
                found: value.kind_name(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::builder::PdefBuilder;
    use crate::model::TypeInfo;

    const BOB: [u8; 16] = [
        0x01, 0x00, 0x00, 0x00, b'b', b'o', b'b', 0x00, 0x00, 0x00, 0x00, 0x00, 0x2A, 0x00, 0x00,
        0x00,
    ];

    fn simple() -> Schema {
        let pdef = PdefBuilder::new()
            .root(|s| s.int("version").string("name", 8).int("score"))
            .build();
        Schema::load(&pdef, 1).unwrap()
    }

    fn nested() -> Schema {
        let pdef = PdefBuilder::new()
            .root(|s| {
                s.int("version")
                    .enum_ref("mode", "eMode")
                    .array("loadouts", 3, TypeInfo::struct_ref("sLoadout"))
                    .mapped_array("wins", "eMode", TypeInfo::Int32)
            })
            .struct_def("sLoadout", |s| s.string("name", 4).bool("active").float("kd"))
            .enum_def("eMode", ["tdm", "ctf", "lts"])
            .build();
        Schema::load(&pdef, 7).unwrap()
    }

    #[test]
    fn test_encode_bob() {
        let schema = simple();
        let mut pdata = schema.new_pdata();
        pdata.set("name", "bob").unwrap();
        pdata.set("score", 42).unwrap();

        let bytes = encode_pdata(&schema, &pdata).unwrap();
        assert_eq!(bytes, BOB);

        let decoded = decode_pdata(&schema, &bytes).unwrap();
        assert_eq!(decoded, pdata);
        assert_eq!(decoded.get("score"), Some(&Value::Int(42)));
    }

    #[test]
    fn test_tail_preserved() {
        let schema = simple();
        let mut b = BOB.to_vec();
        b.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00]);

        let pdata = decode_pdata(&schema, &b).unwrap();
        assert_eq!(pdata.tail, [0xDE, 0xAD, 0xBE, 0xEF, 0x00]);
        assert_eq!(encode_pdata(&schema, &pdata).unwrap(), b);
    }

    #[test]
    fn test_version_gate() {
        let schema = simple();
        let mut b = BOB.to_vec();
        b[0] = 2;

        let err = decode_pdata(&schema, &b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
        assert!(matches!(err, DecodeError::UnsupportedVersion { found: 2, .. }));

        // The version is checked before the size.
        let err = decode_pdata(&schema, &[9, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion { found: 9, .. }));
    }

    #[test]
    fn test_short_buffers() {
        let schema = simple();

        let err = decode_pdata(&schema, &[1, 0]).unwrap_err();
        assert!(matches!(err, DecodeError::MissingVersion { actual: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidSize);

        let err = decode_pdata(&schema, &BOB[..15]).unwrap_err();
        assert!(matches!(err, DecodeError::TooShort { min: 16, actual: 15, .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidSize);
    }

    #[test]
    fn test_encode_rejects_wrong_version() {
        let schema = simple();
        let mut pdata = schema.new_pdata();
        pdata.set("version", 5).unwrap();

        let err = encode_pdata(&schema, &pdata).unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedVersion { version: 1, found: 5, .. }));
    }

    #[test]
    fn test_encode_record_checks_root_version() {
        let schema = simple();
        let mut pdata = schema.new_pdata();
        pdata.set("version", 99).unwrap();

        let err = encode_record(&schema, &pdata.root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
        assert!(matches!(err, EncodeError::UnsupportedVersion { version: 1, found: 99, .. }));

        pdata.set("version", 1).unwrap();
        pdata.set("score", 42).unwrap();
        pdata.set("name", "bob").unwrap();
        assert_eq!(encode_record(&schema, &pdata.root).unwrap(), BOB);
    }

    #[test]
    fn test_string_too_long() {
        let schema = nested();
        let mut pdata = schema.new_pdata();
        let loadouts = pdata.get_mut("loadouts").and_then(Value::as_array_mut).unwrap();
        loadouts[2]
            .as_record_mut()
            .unwrap()
            .set("name", "shotgun")
            .unwrap();

        let err = encode_pdata(&schema, &pdata).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSize);
        match err {
            EncodeError::StringTooLong {
                name,
                version,
                field,
                index,
                len,
                max,
            } => {
                assert_eq!(name, "sLoadout");
                assert_eq!(version, 7);
                assert_eq!(field, "loadouts[2].name");
                assert_eq!(index, Some(2));
                assert_eq!((len, max), (7, 4));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enum_ordinal_passthrough() {
        let schema = nested();
        let size = schema.root().size();
        let mut b = vec![0u8; size];
        b[0] = 7;
        b[4] = 250;

        let pdata = decode_pdata(&schema, &b).unwrap();
        assert_eq!(pdata.get("mode"), Some(&Value::Enum(250)));
        assert_eq!(encode_pdata(&schema, &pdata).unwrap()[4], 250);
    }

    #[test]
    fn test_mapped_array_decodes_arity_elements() {
        let schema = nested();
        let pdata = schema.new_pdata();
        let wins = pdata.get("wins").and_then(Value::as_array).unwrap();
        assert_eq!(wins.len(), 3);

        let b = encode_pdata(&schema, &pdata).unwrap();
        // version + mode + 3 * (4 + 1 + 4) + 3 * 4
        assert_eq!(b.len(), 4 + 1 + 27 + 12);
    }

    #[test]
    fn test_nested_offsets() {
        let schema = nested();
        let mut pdata = schema.new_pdata();
        {
            let loadouts = pdata.get_mut("loadouts").and_then(Value::as_array_mut).unwrap();
            let second = loadouts[1].as_record_mut().unwrap();
            second.set("name", "smg").unwrap();
            second.set("active", true).unwrap();
            second.set("kd", 1.5f32).unwrap();
        }
        let wins = pdata.get_mut("wins").and_then(Value::as_array_mut).unwrap();
        wins[2] = Value::Int(-1);

        let b = encode_pdata(&schema, &pdata).unwrap();
        let second = &b[5 + 9..5 + 18];
        assert_eq!(&second[..4], b"smg\0");
        assert_eq!(second[4], 1);
        assert_eq!(&second[5..], &1.5f32.to_le_bytes());
        assert_eq!(&b[b.len() - 4..], &[0xFF; 4]);

        assert_eq!(decode_pdata(&schema, &b).unwrap(), pdata);
    }

    #[test]
    fn test_non_root_exact_size() {
        let schema = nested();
        let id = schema.struct_id("sLoadout").unwrap();

        let err = decode_record(&schema, id, &[0u8; 10]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidSize { expected: 9, actual: 10, .. }));
        let err = decode_record(&schema, id, &[0u8; 8]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidSize { expected: 9, actual: 8, .. }));

        let b = [b'a', b'r', 0, 0, 1, 0, 0, 0x80, 0x3F];
        let record = decode_record(&schema, id, &b).unwrap();
        assert_eq!(record.get("name").and_then(Value::as_str), Some("ar"));
        assert_eq!(record.get("kd"), Some(&Value::Float(1.0)));
        assert_eq!(encode_record(&schema, &record).unwrap(), b);
    }

    #[test]
    fn test_lossy_canonicalisation() {
        let schema = nested();
        let id = schema.struct_id("sLoadout").unwrap();
        let b = [b'a', 0, b'z', 0, 7, 0, 0, 0, 0];

        let record = decode_record(&schema, id, &b).unwrap();
        assert_eq!(record.get("name").and_then(Value::as_bytes), Some(&b"a"[..]));
        assert_eq!(record.get("active"), Some(&Value::Bool(true)));
        assert_eq!(
            encode_record(&schema, &record).unwrap(),
            [b'a', 0, 0, 0, 1, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_shape_errors() {
        let schema = nested();
        let mut pdata = schema.new_pdata();
        *pdata.get_mut("wins").unwrap() = Value::Array(vec![Value::Int(0)]);
        let err = encode_pdata(&schema, &pdata).unwrap_err();
        assert!(matches!(err, EncodeError::ArrayLength { expected: 3, actual: 1, .. }));

        let mut pdata = schema.new_pdata();
        *pdata.get_mut("mode").unwrap() = Value::Int(1);
        let err = encode_pdata(&schema, &pdata).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);

        let other = nested();
        let foreign = other.new_pdata();
        let err = encode_pdata(&schema, &foreign).unwrap_err();
        assert!(matches!(err, EncodeError::WrongStruct { .. }));
    }
}
