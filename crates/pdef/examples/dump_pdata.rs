//! Prints the JSON projection of a pdata file.
//!
//! Usage: dump_pdata <schema.json> <version> <file.pdata> [field.path ...]
//!
//! The schema is a JSON-serialized `Pdef`. When field paths are given only
//! those subtrees are printed.

use std::fs;

use pdef::{Pdef, Schema, Value};

fn format_value(v: &Value) -> String {
    match v {
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format!("{f:.6}"),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => format!("{:?}", String::from_utf8_lossy(s)),
        Value::Enum(o) => format!("#{o}"),
        Value::Struct(r) => format!("{} {{{} fields}}", r.name(), r.values().len()),
        Value::Array(items) => format!("[{} items]", items.len()),
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let (Some(schema_path), Some(version), Some(path)) = (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: dump_pdata <schema.json> <version> <file.pdata> [field.path ...]");
        std::process::exit(2);
    };
    let fields: Vec<String> = args.collect();

    let pdef: Pdef =
        serde_json::from_slice(&fs::read(&schema_path).expect("Failed to read schema"))
            .expect("Failed to parse schema");
    let version: i32 = version.parse().expect("Version must be an integer");
    let schema = Schema::load(&pdef, version).expect("Failed to load schema");

    println!("Reading: {}", path);
    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let pdata = schema.decode(&data).expect("Failed to decode");
    println!("Root size: {} bytes", schema.root().size());
    println!("Tail: {} bytes", pdata.tail.len());

    if fields.is_empty() {
        let json = schema.marshal_json(&pdata).expect("Failed to marshal");
        println!("\n{}", String::from_utf8_lossy(&json));
        return;
    }

    println!();
    for field in &fields {
        match pdata.lookup(field) {
            Some(v) => println!("{field} = {}", format_value(v)),
            None => println!("{field}: not found"),
        }
    }

    let names: Vec<Vec<&str>> = fields
        .iter()
        .map(|f| f.split('.').map(|s| s.split('[').next().unwrap_or(s)).collect())
        .collect();
    let json = schema
        .marshal_json_filter(&pdata, |path| {
            names
                .iter()
                .any(|n| n.starts_with(path) || path.starts_with(n))
        })
        .expect("Failed to marshal");
    println!("\n{}", String::from_utf8_lossy(&json));
}
