//! JSON projection of decoded records.
//!
//! Output is written directly into a byte buffer in field declaration
//! order. Floats follow the formatting of the game's JSON consumer: `NaN`
//! and infinities become `null`, everything else uses the shortest
//! representation that reads back as the same `f32`. Enums are written as
//! their member name, or as the bare ordinal when it is out of range.
//!
//! Filter paths name fields only; array elements share the path of their
//! array field.
//!
//! Strings are escaped byte-for-byte like the game's JSON writer, without HTML
//! escaping: `<`, `>` and `&` stay literal, control characters other than
//! `\n`, `\r` and `\t` become `\u00XX`, U+2028 and U+2029 are escaped, and
//! each byte of invalid UTF-8 becomes `\ufffd`.

use std::io::Write;

use serde_json::ser::{CharEscape, CompactFormatter, Formatter};
use serde_json::Value as JsonValue;

use crate::codec::binary::{check_owner, check_record, check_root};
use crate::codec::{render, Seg};
use crate::error::{EncodeError, JsonError};
use crate::limits::ROOT_NAME;
use crate::model::{Pdata, Record, Value};
use crate::schema::{Schema, StructId, Ty};

/// Decides whether the field at a path (field names from the root) is
/// written. Returning false skips the field and everything below it.
pub type PathFilter<'a> = &'a dyn Fn(&[&str]) -> bool;

// =============================================================================
// MARSHAL
// =============================================================================

/// Marshals a root record. The version must match the schema; the tail is
/// never included.
pub fn marshal_pdata_json(
    schema: &Schema,
    pdata: &Pdata<'_>,
    filter: Option<PathFilter<'_>>,
) -> Result<Vec<u8>, EncodeError> {
    check_root(schema, &pdata.root)?;
    let mut out = Vec::with_capacity(schema.root().size() * 2);
    let mut path = Vec::new();
    write_object(schema, &pdata.root, &mut out, &mut path, filter)?;
    Ok(out)
}

/// Marshals any record. Filter paths start at this record's fields. A root
/// record still has its version checked.
pub fn marshal_record_json(
    schema: &Schema,
    record: &Record<'_>,
    filter: Option<PathFilter<'_>>,
) -> Result<Vec<u8>, EncodeError> {
    check_record(schema, record)?;
    let mut out = Vec::with_capacity(record.layout().size() * 2);
    let mut path = Vec::new();
    write_object(schema, record, &mut out, &mut path, filter)?;
    Ok(out)
}

/// Appends a float as a JSON number, or `null` when it is not finite.
pub fn append_f32(out: &mut Vec<u8>, v: f32) {
    if !v.is_finite() {
        out.extend_from_slice(b"null");
        return;
    }
    let abs = v.abs();
    if abs != 0.0 && !(1e-6..1e21).contains(&abs) {
        // `{:e}` omits the sign of positive exponents ("1e21" -> "1e+21").
        let s = format!("{v:e}");
        match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => {
                out.extend_from_slice(mantissa.as_bytes());
                out.extend_from_slice(b"e+");
                out.extend_from_slice(exp.as_bytes());
            }
            _ => out.extend_from_slice(s.as_bytes()),
        }
    } else {
        out.extend_from_slice(format!("{v}").as_bytes());
    }
}

fn write_object<'s>(
    schema: &Schema,
    record: &Record<'s>,
    out: &mut Vec<u8>,
    path: &mut Vec<&'s str>,
    filter: Option<PathFilter<'_>>,
) -> Result<(), EncodeError> {
    let owner = record.name();
    out.push(b'{');
    let mut first = true;
    for (field, value) in record.fields() {
        path.push(field.name());
        if filter.is_none_or(|f| f(path.as_slice())) {
            if !first {
                out.push(b',');
            }
            first = false;
            write_str(out, field.name().as_bytes())?;
            out.push(b':');
            write_value(schema, owner, field.ty(), value, out, path, filter)?;
        }
        path.pop();
    }
    out.push(b'}');
    Ok(())
}

fn write_value<'s>(
    schema: &Schema,
    owner: &str,
    ty: &Ty,
    value: &Value<'s>,
    out: &mut Vec<u8>,
    path: &mut Vec<&'s str>,
    filter: Option<PathFilter<'_>>,
) -> Result<(), EncodeError> {
    match (ty, value) {
        (Ty::Int32, Value::Int(v)) => write!(out, "{v}").map_err(json_err)?,
        (Ty::Float32, Value::Float(v)) => append_f32(out, *v),
        (Ty::Bool, Value::Bool(v)) => {
            out.extend_from_slice(if *v { &b"true"[..] } else { &b"false"[..] });
        }
        (Ty::FixedString { .. }, Value::String(s)) => {
            write_str(out, s)?;
        }
        (Ty::Enum(id), Value::Enum(ordinal)) => match schema.enum_at(*id).name(*ordinal) {
            Ok(name) => write_str(out, name.as_bytes())?,
            Err(_) => write!(out, "{ordinal}").map_err(json_err)?,
        },
        (Ty::Struct(id), Value::Struct(r)) => {
            check_owner(schema, r, *id)?;
            write_object(schema, r, out, path, filter)?;
        }
        (Ty::Array { len, elem, .. }, Value::Array(items)) => {
            if items.len() != *len {
                return Err(EncodeError::ArrayLength {
                    name: owner.to_string(),
                    version: schema.version(),
                    field: path.join("."),
                    expected: *len,
                    actual: items.len(),
                });
            }
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(schema, owner, elem, item, out, path, filter)?;
            }
            out.push(b']');
        }
        _ => {
            return Err(EncodeError::TypeMismatch {
                name: owner.to_string(),
                version: schema.version(),
                field: path.join("."),
                expected: ty.kind_name(),
                found: value.kind_name(),
            });
        }
    }
    Ok(())
}

fn write_str(out: &mut Vec<u8>, s: &[u8]) -> Result<(), EncodeError> {
    let mut f = CompactFormatter;
    f.begin_string(out).map_err(json_err)?;
    for chunk in s.utf8_chunks() {
        let valid = chunk.valid();
        let mut start = 0;
        for (i, c) in valid.char_indices() {
            let escape = match c {
                '"' => Some(CharEscape::Quote),
                '\\' => Some(CharEscape::ReverseSolidus),
                '\n' => Some(CharEscape::LineFeed),
                '\r' => Some(CharEscape::CarriageReturn),
                '\t' => Some(CharEscape::Tab),
                '\u{0}'..='\u{1f}' => Some(CharEscape::AsciiControl(c as u8)),
                '\u{2028}' | '\u{2029}' => None,
                _ => continue,
            };
            f.write_string_fragment(out, &valid[start..i]).map_err(json_err)?;
            match escape {
                Some(escape) => f.write_char_escape(out, escape),
                None => write!(out, "\\u{:04x}", c as u32),
            }
            .map_err(json_err)?;
            start = i + c.len_utf8();
        }
        f.write_string_fragment(out, &valid[start..]).map_err(json_err)?;
        for _ in chunk.invalid() {
            f.write_string_fragment(out, "\\ufffd").map_err(json_err)?;
        }
    }
    f.end_string(out).map_err(json_err)
}

fn json_err(e: impl std::fmt::Display) -> EncodeError {
    EncodeError::Json(e.to_string())
}

// =============================================================================
// UNMARSHAL
// =============================================================================

/// Parses the JSON projection back into a root record.
///
/// Absent keys keep their zero value and `null` keeps the current value,
/// except for floats where it reads as NaN. Enum members may be given by
/// name or by raw ordinal. The result has no tail.
pub fn unmarshal_pdata_json<'s>(schema: &'s Schema, b: &[u8]) -> Result<Pdata<'s>, JsonError> {
    let json: JsonValue = serde_json::from_slice(b).map_err(|e| JsonError::Syntax(e.to_string()))?;

    let mut root = Record::zeroed(schema, StructId::ROOT);
    let mut path = Vec::new();
    read_object(schema, &mut root, &json, &mut path)?;

    let version = schema.version();
    let found = root.values().first().and_then(Value::as_int);
    if let Some(found) = found.filter(|&v| v != version) {
        return Err(JsonError::UnsupportedVersion {
            name: ROOT_NAME.to_string(),
            version,
            found,
        });
    }
    Ok(Pdata {
        root,
        tail: Vec::new(),
    })
}

fn read_object<'s>(
    schema: &'s Schema,
    record: &mut Record<'s>,
    json: &JsonValue,
    path: &mut Vec<Seg<'s>>,
) -> Result<(), JsonError> {
    let object = json.as_object().ok_or_else(|| JsonError::TypeMismatch {
        field: render(path),
        expected: "object",
    })?;
    let layout = record.layout();
    for (key, item) in object {
        let Some(index) = layout.field_index(key) else {
            let mut field = render(path);
            if !field.is_empty() {
                field.push('.');
            }
            field.push_str(key);
            return Err(JsonError::UnknownField { field });
        };
        let field = &layout.fields()[index];
        path.push(Seg::Field(field.name()));
        read_value(schema, field.ty(), &mut record.values_mut()[index], item, path)?;
        path.pop();
    }
    Ok(())
}

fn read_value<'s>(
    schema: &'s Schema,
    ty: &Ty,
    slot: &mut Value<'s>,
    json: &JsonValue,
    path: &mut Vec<Seg<'s>>,
) -> Result<(), JsonError> {
    if json.is_null() {
        if *ty == Ty::Float32 {
            *slot = Value::Float(f32::NAN);
        }
        return Ok(());
    }

    let mismatch = |expected: &'static str| JsonError::TypeMismatch {
        field: render(path),
        expected,
    };

    *slot = match ty {
        Ty::Int32 => json
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int)
            .ok_or_else(|| mismatch("int32 number"))?,
        Ty::Float32 => json
            .as_f64()
            .map(|n| Value::Float(n as f32))
            .ok_or_else(|| mismatch("number"))?,
        Ty::Bool => json.as_bool().map(Value::Bool).ok_or_else(|| mismatch("bool"))?,
        Ty::FixedString { len } => {
            let s = json.as_str().ok_or_else(|| mismatch("string"))?;
            if s.len() > *len {
                return Err(JsonError::StringTooLong {
                    field: render(path),
                    len: s.len(),
                    max: *len,
                });
            }
            Value::String(s.as_bytes().to_vec())
        }
        Ty::Enum(id) => match json {
            JsonValue::String(name) => {
                let ordinal = schema.enum_at(*id).ordinal(name).map_err(|source| {
                    JsonError::InvalidEnumValue {
                        field: render(path),
                        source,
                    }
                })?;
                Value::Enum(ordinal)
            }
            _ => json
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .map(Value::Enum)
                .ok_or_else(|| mismatch("enum name or ordinal"))?,
        },
        Ty::Struct(id) => {
            let mut record = Record::zeroed(schema, *id);
            read_object(schema, &mut record, json, path)?;
            Value::Struct(record)
        }
        Ty::Array { len, elem, .. } => {
            let items = json.as_array().ok_or_else(|| mismatch("array"))?;
            if items.len() != *len {
                return Err(JsonError::ArrayLength {
                    field: render(path),
                    expected: *len,
                    actual: items.len(),
                });
            }
            let mut values = Vec::with_capacity(*len);
            for (i, item) in items.iter().enumerate() {
                let mut value = Value::zeroed(schema, elem);
                path.push(Seg::Index(i));
                read_value(schema, elem, &mut value, item, path)?;
                path.pop();
                values.push(value);
            }
            Value::Array(values)
        }
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::builder::PdefBuilder;
    use crate::model::TypeInfo;

    fn simple() -> Schema {
        let pdef = PdefBuilder::new()
            .root(|s| s.int("version").string("name", 8).int("score"))
            .build();
        Schema::load(&pdef, 1).unwrap()
    }

    fn game() -> Schema {
        let pdef = PdefBuilder::new()
            .root(|s| {
                s.int("version")
                    .enum_ref("mode", "eMode")
                    .struct_ref("stats", "sStats")
                    .array("loadouts", 2, TypeInfo::struct_ref("sLoadout"))
            })
            .struct_def("sStats", |s| s.int("score").float("kd").bool("ranked"))
            .struct_def("sLoadout", |s| s.string("name", 8).array("mods", 2, TypeInfo::enum_ref("eMode")))
            .enum_def("eMode", ["tdm", "ctf", "lts"])
            .build();
        Schema::load(&pdef, 2).unwrap()
    }

    fn f32_json(v: f32) -> String {
        let mut out = Vec::new();
        append_f32(&mut out, v);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_marshal_bob() {
        let schema = simple();
        let mut pdata = schema.new_pdata();
        pdata.set("name", "bob").unwrap();
        pdata.set("score", 42).unwrap();

        let json = marshal_pdata_json(&schema, &pdata, None).unwrap();
        assert_eq!(json, br#"{"version":1,"name":"bob","score":42}"#);
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(f32_json(f32::NAN), "null");
        assert_eq!(f32_json(f32::INFINITY), "null");
        assert_eq!(f32_json(f32::NEG_INFINITY), "null");
        assert_eq!(f32_json(0.0), "0");
        assert_eq!(f32_json(1.5), "1.5");
        assert_eq!(f32_json(-2.0), "-2");
        assert_eq!(f32_json(0.1), "0.1");
        assert_eq!(f32_json(1e-6), "0.000001");
        assert_eq!(f32_json(1e-7), "1e-7");
        assert_eq!(f32_json(1e21), "1e+21");
        assert_eq!(f32_json(123456790.0), "123456790");
    }

    fn str_json(s: &[u8]) -> String {
        let mut out = Vec::new();
        write_str(&mut out, s).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(str_json(b"<a&b>/"), r#""<a&b>/""#);
        assert_eq!(str_json(b"\"\\\n\r\t"), r#""\"\\\n\r\t""#);
        assert_eq!(str_json(b"\x08\x0c\x01\x1f"), r#""\u0008\u000c\u0001\u001f""#);
        assert_eq!(str_json("x\u{2028}y\u{2029}".as_bytes()), r#""x\u2028y\u2029""#);
        assert_eq!(str_json("é\u{7f}".as_bytes()), "\"é\u{7f}\"");
    }

    #[test]
    fn test_invalid_utf8_escaped_per_byte() {
        assert_eq!(str_json(b"a\xffb"), r#""a\ufffdb""#);
        assert_eq!(str_json(b"\xe2\x82A"), r#""\ufffd\ufffdA""#);

        let schema = simple();
        let mut pdata = schema.new_pdata();
        pdata.set("name", Value::String(vec![b'<', 0xC0, b'>'])).unwrap();
        let json = marshal_pdata_json(&schema, &pdata, None).unwrap();
        assert_eq!(json, br#"{"version":1,"name":"<\ufffd>","score":0}"#);
    }

    #[test]
    fn test_non_finite_fields_are_null() {
        let schema = game();
        let mut pdata = schema.new_pdata();
        let stats = pdata.get_mut("stats").and_then(Value::as_record_mut).unwrap();
        stats.set("kd", f32::NAN).unwrap();

        let json = marshal_pdata_json(&schema, &pdata, None).unwrap();
        let text = String::from_utf8(json).unwrap();
        assert!(text.contains(r#""kd":null"#), "{text}");
    }

    #[test]
    fn test_filter_skips_nested_field() {
        let schema = game();
        let mut pdata = schema.new_pdata();
        let stats = pdata.get_mut("stats").and_then(Value::as_record_mut).unwrap();
        stats.set("score", 10).unwrap();

        let filter = |path: &[&str]| path != ["stats", "score"];
        let json = marshal_pdata_json(&schema, &pdata, Some(&filter)).unwrap();
        let parsed: JsonValue = serde_json::from_slice(&json).unwrap();

        let stats = parsed["stats"].as_object().unwrap();
        assert!(!stats.contains_key("score"));
        assert!(stats.contains_key("kd"));
        assert!(stats.contains_key("ranked"));
    }

    #[test]
    fn test_filter_paths_skip_array_indexes() {
        let schema = game();
        let pdata = schema.new_pdata();

        let filter = |path: &[&str]| path != ["loadouts", "mods"];
        let json = marshal_pdata_json(&schema, &pdata, Some(&filter)).unwrap();
        let text = String::from_utf8(json).unwrap();
        assert!(text.contains(r#""loadouts":[{"name":""},{"name":""}]"#), "{text}");
    }

    #[test]
    fn test_enum_out_of_range_is_number() {
        let schema = game();
        let mut pdata = schema.new_pdata();
        pdata.set("mode", Value::Enum(250)).unwrap();

        let json = marshal_pdata_json(&schema, &pdata, None).unwrap();
        let parsed: JsonValue = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed["mode"], 250);

        pdata.set("mode", Value::Enum(1)).unwrap();
        let json = marshal_pdata_json(&schema, &pdata, None).unwrap();
        let parsed: JsonValue = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed["mode"], "ctf");
    }

    #[test]
    fn test_marshal_checks_version() {
        let schema = simple();
        let mut pdata = schema.new_pdata();
        pdata.set("version", 3).unwrap();

        let err = marshal_pdata_json(&schema, &pdata, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);

        // The struct-level entry point checks the root too.
        let err = marshal_record_json(&schema, &pdata.root, None).unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedVersion { version: 1, found: 3, .. }));

        // Sub-records carry no version.
        let stats = game();
        let record = stats.new_record("sStats").unwrap();
        let json = marshal_record_json(&stats, &record, None).unwrap();
        assert_eq!(json, br#"{"score":0,"kd":0,"ranked":false}"#);
    }

    #[test]
    fn test_tail_not_marshaled() {
        let schema = simple();
        let mut pdata = schema.new_pdata();
        pdata.tail = vec![1, 2, 3];

        let json = marshal_pdata_json(&schema, &pdata, None).unwrap();
        assert_eq!(json, br#"{"version":1,"name":"","score":0}"#);
    }

    #[test]
    fn test_unmarshal_round_trip() {
        let schema = game();
        let input = br#"{
            "version": 2,
            "mode": "lts",
            "stats": {"score": 7, "kd": null, "ranked": true},
            "loadouts": [{"name": "smg", "mods": ["tdm", 2]}, {"name": "", "mods": [0, 200]}]
        }"#;

        let pdata = unmarshal_pdata_json(&schema, input).unwrap();
        assert_eq!(pdata.get("mode"), Some(&Value::Enum(2)));
        assert_eq!(pdata.lookup("stats.score"), Some(&Value::Int(7)));
        assert!(pdata.lookup("stats.kd").and_then(Value::as_float).unwrap().is_nan());
        assert_eq!(pdata.lookup("loadouts[0].mods[1]"), Some(&Value::Enum(2)));
        assert_eq!(pdata.lookup("loadouts[1].mods[1]"), Some(&Value::Enum(200)));
        assert!(pdata.tail.is_empty());

        let json = marshal_pdata_json(&schema, &pdata, None).unwrap();
        let again = unmarshal_pdata_json(&schema, &json).unwrap();
        assert_eq!(again.lookup("loadouts[0].name"), pdata.lookup("loadouts[0].name"));
        assert_eq!(again.get("mode"), pdata.get("mode"));
    }

    #[test]
    fn test_unmarshal_absent_keys_stay_zero() {
        let schema = simple();
        let pdata = unmarshal_pdata_json(&schema, br#"{"version":1}"#).unwrap();
        assert_eq!(pdata, schema.new_pdata());
    }

    #[test]
    fn test_unmarshal_errors() {
        let schema = game();

        let err = unmarshal_pdata_json(&schema, br#"{"version":2,"mode":"koth"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEnumValue);
        assert!(matches!(err, JsonError::InvalidEnumValue { ref field, .. } if field == "mode"));

        let err = unmarshal_pdata_json(&schema, br#"{"version":3}"#).unwrap_err();
        assert!(matches!(err, JsonError::UnsupportedVersion { version: 2, found: 3, .. }));

        let err = unmarshal_pdata_json(&schema, br#"{"version":2,"extra":1}"#).unwrap_err();
        assert!(matches!(err, JsonError::UnknownField { ref field } if field == "extra"));

        let err = unmarshal_pdata_json(&schema, br#"{"version":2,"stats":{"score":"x"}}"#)
            .unwrap_err();
        assert!(matches!(err, JsonError::TypeMismatch { ref field, .. } if field == "stats.score"));

        let input = br#"{"version":2,"loadouts":[{"name":"a very long name"},{}]}"#;
        let err = unmarshal_pdata_json(&schema, input).unwrap_err();
        assert!(matches!(err, JsonError::StringTooLong { ref field, len: 16, max: 8 } if field == "loadouts[0].name"));

        let err = unmarshal_pdata_json(&schema, br#"{"version":2,"loadouts":[]}"#).unwrap_err();
        assert!(matches!(err, JsonError::ArrayLength { expected: 2, actual: 0, .. }));

        let err = unmarshal_pdata_json(&schema, b"{").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }
}
