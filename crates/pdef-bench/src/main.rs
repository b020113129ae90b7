//! Benchmark for pdef encoding using a representative player-data schema.
//!
//! Builds a batch of deterministic player records, then measures encode,
//! decode, JSON projection and blob packing throughput. Any `.pdata` files
//! given on the command line are decoded and printed as JSON instead.
//!
//! Usage: pdef-bench [--count N] [--schema pdef.json --version V] [file.pdata ...]

use std::fs;
use std::time::Instant;

use lazy_static::lazy_static;
use pdef::{
    BlobOptions, Pdata, Pdef, PdefBuilder, Schema, StoredPdata, TypeInfo, Value,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_VERSION: i32 = 34;
const DEFAULT_COUNT: usize = 10_000;

lazy_static! {
    static ref SCHEMA: Schema =
        Schema::load(&demo_pdef(), DEMO_VERSION).expect("demo pdef is valid");
}

// =============================================================================
// DEMO SCHEMA
// =============================================================================

const GAME_MODES: [&str; 8] = ["tdm", "ctf", "lts", "ffa", "cp", "mfd", "coliseum", "aitdm"];
const WEAPONS: [&str; 6] = ["r201", "car", "flatline", "kraber", "eva8", "wingman"];
const CLASSES: [&str; 7] = ["ion", "scorch", "northstar", "ronin", "tone", "legion", "monarch"];
const NAMES: [&str; 8] = ["viper", "ash", "blisk", "kane", "richter", "slone", "bt", "jack"];

fn demo_pdef() -> Pdef {
    PdefBuilder::new()
        .root(|s| {
            s.int("initializedVersion")
                .string("name", 32)
                .int("xp")
                .int("gen")
                .bool("isPostGameScoreboardValid")
                .enum_ref("lastGameMode", "eGameMode")
                .mapped_array("gameModeWins", "eGameMode", TypeInfo::Int32)
                .mapped_array("gameModeLosses", "eGameMode", TypeInfo::Int32)
                .mapped_array("weaponStats", "eWeapon", TypeInfo::struct_ref("sWeaponStats"))
                .array("pilotLoadouts", 10, TypeInfo::struct_ref("sPilotLoadout"))
                .array("titanLoadouts", 10, TypeInfo::struct_ref("sTitanLoadout"))
                .struct_ref("ranked", "sRanked")
        })
        .struct_def("sWeaponStats", |s| {
            s.int("kills")
                .int("shotsFired")
                .int("shotsHit")
                .float("hoursUsed")
                .bool("unlocked")
        })
        .struct_def("sPilotLoadout", |s| {
            s.string("name", 32)
                .enum_ref("primary", "eWeapon")
                .enum_ref("secondary", "eWeapon")
                .array("primaryMods", 2, TypeInfo::Int32)
                .int("skinIndex")
        })
        .struct_def("sTitanLoadout", |s| {
            s.string("name", 32)
                .enum_ref("titanClass", "eTitanClass")
                .int("decal")
                .bool("isPrime")
        })
        .struct_def("sRanked", |s| {
            s.bool("joined")
                .int("currentSeason")
                .float("mmr")
                .mapped_array("seasonHistory", "eGameMode", TypeInfo::array(4, TypeInfo::Int32))
        })
        .enum_def("eGameMode", GAME_MODES)
        .enum_def("eWeapon", WEAPONS)
        .enum_def("eTitanClass", CLASSES)
        .build()
}

// =============================================================================
// RECORD GENERATION
// =============================================================================

/// Small deterministic generator so runs are comparable.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    fn below(&mut self, n: usize) -> usize {
        self.next() as usize % n
    }
}

fn fill(value: &mut Value<'_>, rng: &mut Lcg) {
    match value {
        Value::Int(v) => *v = (rng.next() % 100_000) as i32,
        Value::Float(v) => *v = (rng.next() % 10_000) as f32 / 100.0,
        Value::Bool(v) => *v = rng.next() % 2 == 0,
        Value::String(s) => *s = NAMES[rng.below(NAMES.len())].as_bytes().to_vec(),
        Value::Enum(o) => *o = (rng.next() % 6) as u8,
        Value::Struct(r) => r.values_mut().iter_mut().for_each(|v| fill(v, rng)),
        Value::Array(items) => items.iter_mut().for_each(|v| fill(v, rng)),
    }
}

fn make_player(seed: u64) -> Pdata<'static> {
    let mut rng = Lcg(seed);
    let mut pdata = SCHEMA.new_pdata();
    // Leave the version field alone.
    for v in pdata.values_mut().iter_mut().skip(1) {
        fill(v, &mut rng);
    }
    pdata
}

// =============================================================================
// MAIN
// =============================================================================

struct Args {
    count: usize,
    schema: Option<String>,
    version: Option<i32>,
    files: Vec<String>,
}

fn parse_args() -> Args {
    let mut args = Args {
        count: DEFAULT_COUNT,
        schema: None,
        version: None,
        files: Vec::new(),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--count" => {
                args.count = it
                    .next()
                    .and_then(|v| v.parse().ok())
                    .expect("--count takes a number");
            }
            "--schema" => args.schema = it.next(),
            "--version" => {
                let version = it
                    .next()
                    .and_then(|v| v.parse().ok())
                    .expect("--version takes a number");
                args.version = Some(version);
            }
            _ => args.files.push(arg),
        }
    }
    args
}

fn dump_files(schema: &Schema, files: &[String]) {
    for path in files {
        let data = fs::read(path).expect("Failed to read pdata file");
        match schema.decode(&data) {
            Ok(pdata) => {
                let json = schema.marshal_json(&pdata).expect("Failed to marshal");
                println!("{}: {} bytes, {} tail", path, data.len(), pdata.tail.len());
                println!("{}", String::from_utf8_lossy(&json));
            }
            Err(e) => println!("{}: {} ({})", path, e, e.kind()),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = parse_args();

    if let Some(schema_path) = &args.schema {
        let pdef: Pdef = serde_json::from_slice(&fs::read(schema_path).expect("Failed to read schema"))
            .expect("Failed to parse schema");
        let version = args.version.expect("--schema requires --version");
        let schema = Schema::load(&pdef, version).expect("Failed to load schema");
        dump_files(&schema, &args.files);
        return;
    }
    if !args.files.is_empty() {
        dump_files(&SCHEMA, &args.files);
        return;
    }

    let root_size = SCHEMA.root().size();
    info!(
        version = SCHEMA.version(),
        root_size,
        structs = SCHEMA.structs().len(),
        "demo schema loaded"
    );
    println!("Root size: {} bytes", root_size);

    // Build records
    let build_start = Instant::now();
    let players: Vec<Pdata<'static>> = (0..args.count as u64).map(make_player).collect();
    let build_time = build_start.elapsed();
    println!("Built {} records in {:?}", players.len(), build_time);

    // Encode
    let encode_start = Instant::now();
    let encoded: Vec<Vec<u8>> = players
        .iter()
        .map(|p| SCHEMA.encode(p).expect("Failed to encode"))
        .collect();
    let encode_time = encode_start.elapsed();
    let total_bytes: usize = encoded.iter().map(Vec::len).sum();

    println!("\nEncode: {} bytes in {:?}", total_bytes, encode_time);
    println!(
        "  Throughput: {:.2} MB/s",
        (total_bytes as f64 / 1_000_000.0) / encode_time.as_secs_f64()
    );

    // Decode
    let decode_start = Instant::now();
    let decoded: Vec<Pdata<'static>> = encoded
        .iter()
        .map(|b| SCHEMA.decode(b).expect("Failed to decode"))
        .collect();
    let decode_time = decode_start.elapsed();

    println!("\nDecode: {:?}", decode_time);
    println!(
        "  Throughput: {:.2} MB/s",
        (total_bytes as f64 / 1_000_000.0) / decode_time.as_secs_f64()
    );
    assert_eq!(decoded, players, "Decode should reproduce the records");

    // Re-encode must be byte-exact
    for (b, p) in encoded.iter().zip(&decoded) {
        assert_eq!(&SCHEMA.encode(p).expect("Failed to re-encode"), b);
    }

    // JSON projection
    let json_start = Instant::now();
    let json: Vec<Vec<u8>> = decoded
        .iter()
        .map(|p| SCHEMA.marshal_json(p).expect("Failed to marshal"))
        .collect();
    let json_time = json_start.elapsed();
    let json_bytes: usize = json.iter().map(Vec::len).sum();

    println!("\nJSON: {} bytes in {:?}", json_bytes, json_time);
    for j in json.iter().take(100) {
        serde_json::from_slice::<serde_json::Value>(j).expect("JSON projection should parse");
    }

    // Storage blobs
    let options = BlobOptions::default();
    let pack_start = Instant::now();
    let stored: Vec<StoredPdata> = encoded
        .iter()
        .map(|b| StoredPdata::pack(b, &options).expect("Failed to pack"))
        .collect();
    let pack_time = pack_start.elapsed();
    let stored_bytes: usize = stored.iter().map(|s| s.data.len()).sum();

    println!("\nPack (zstd level {}): {} bytes in {:?}", options.level, stored_bytes, pack_time);
    println!(
        "  Compression ratio: {:.1}x",
        total_bytes as f64 / stored_bytes as f64
    );

    let unpack_start = Instant::now();
    for (s, b) in stored.iter().zip(&encoded) {
        assert_eq!(&s.unpack().expect("Failed to unpack"), b);
    }
    let unpack_time = unpack_start.elapsed();
    println!("Unpack + verify: {:?}", unpack_time);

    info!(
        records = players.len(),
        encoded_bytes = total_bytes,
        stored_bytes,
        json_bytes,
        "benchmark complete"
    );

    println!("\n=== Summary ===");
    println!("Records: {}", players.len());
    println!(
        "Binary: {} bytes ({:.1} MB)",
        total_bytes,
        total_bytes as f64 / 1_000_000.0
    );
    println!(
        "JSON: {} bytes ({:.1}x binary)",
        json_bytes,
        json_bytes as f64 / total_bytes as f64
    );
    println!(
        "Stored: {} bytes ({:.1}% of binary)",
        stored_bytes,
        100.0 * stored_bytes as f64 / total_bytes as f64
    );
}
