//! Bounds applied while loading schemas and unpacking stored pdata.

/// Enum ordinals are stored as a single byte.
pub const MAX_ENUM_MEMBERS: usize = 256;

/// Largest struct layout accepted at schema load (16 MiB).
pub const MAX_STRUCT_SIZE: usize = 16 * 1024 * 1024;

/// Most values a decoded struct may hold, counting every nested struct
/// and array element. Zero-width fields take no bytes, so `MAX_STRUCT_SIZE`
/// alone does not bound them.
pub const MAX_VALUE_COUNT: usize = 4 * 1024 * 1024;

/// Largest decompressed pdata blob accepted, root plus tail (64 MiB).
pub const MAX_PDATA_SIZE: usize = 64 * 1024 * 1024;

/// zstd level used by the default blob options.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Name of the root struct in errors and logs.
pub const ROOT_NAME: &str = "pdata";

/// Encoded size of an `int` field.
pub const INT32_SIZE: usize = 4;

/// Encoded size of a `float` field.
pub const FLOAT32_SIZE: usize = 4;

/// Encoded size of a `bool` field.
pub const BOOL_SIZE: usize = 1;

/// Encoded size of an enum field (one ordinal byte).
pub const ENUM_SIZE: usize = 1;
