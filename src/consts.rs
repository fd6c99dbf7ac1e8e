/// Built-in placeholder symbols usable after `?`.
pub const BUILT_IN_CHARSET: &[u8] = b"ludsaLUDSAbhBH";

/// Number of custom placeholder slots (`?1` .. `?9`).
pub const MAX_CUSTOM_PLACEHOLDERS: usize = 9;

/// Upper bound on position ranges in one compiled pattern.
pub const MAX_RANGES: usize = 125;

/// Upper bound on the normalized pattern text, in bytes.
pub const MAX_PATTERN_BYTES: usize = 0x8000;

/// Size of the template key buffer. No candidate may be longer.
pub const KEY_BUFFER_CAPACITY: usize = 0x400;

/// Native maximum length used when the consumer declares none.
pub const DEFAULT_NATIVE_MAX_LENGTH: usize = 125;

/// Bytes that must stay escaped when they come out of a class or a hex escape.
pub const METACHARS: &[u8] = b"\\[]?-";

/// Marker written into template positions owned by a position range.
pub const RANGE_MARKER: u8 = b'#';
