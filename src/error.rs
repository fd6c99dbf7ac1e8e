use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Mask Syntax Error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Mask Encoding Error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Mask Capacity Error: {0}")]
    Capacity(#[from] CapacityError),

    #[error("Node Partition Error: {0}")]
    Partition(#[from] PartitionError),

    #[error("Cannot resume, pattern changed: {0}")]
    ChecksumMismatch(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration Error: {0}")]
    Config(String),
}

/// Malformed pattern text. Always fatal, raised before any candidate exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("unbalanced brackets, missing closing or opening bracket")]
    UnbalancedBracket,

    #[error("empty group [] not valid")]
    EmptyGroup,

    #[error("custom placeholder ?{0} not defined")]
    UndefinedPlaceholder(char),

    #[error("custom placeholder ?{0} references another custom placeholder")]
    NestedPlaceholder(char),

    #[error("hybrid mask must contain ?w or ?W")]
    MissingWordPlaceholder,

    #[error("hybrid mask must contain ?w/?W after truncation for max. length")]
    WordTruncated,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("can't use ?{symbol} placeholder without an 8-bit legacy codepage (internal encoding is {encoding})")]
    EncodingRequired { symbol: char, encoding: String },

    #[error("mask contains multi-byte characters; an internal codepage is required")]
    CodepageRequired,

    #[error("character U+{code:04X} has no representation in {encoding}")]
    Unmappable { code: u32, encoding: String },

    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error("pattern is {len} bytes, limit is {limit}")]
    PatternTooLong { len: usize, limit: usize },

    #[error("pattern compiles to {count} ranges, limit is {limit}")]
    RangeOverflow { count: usize, limit: usize },

    #[error("truncation at range {range} would drop consumer-enumerated range {immovable}; use a bigger max length")]
    InternalRangeTruncation { range: usize, immovable: usize },

    #[error("requested length {requested} is unsatisfiable: {reason}")]
    UnsatisfiableLength { requested: usize, reason: String },

    #[error("length {len} exceeds the key buffer capacity {capacity}")]
    KeyOverflow { len: usize, capacity: usize },

    #[error("candidate space of {ranges} ranges does not fit in 64 bits")]
    CandidateOverflow { ranges: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("insufficient work: node {node_min}-{node_max}/{node_count} gets no candidates out of {total}")]
    NoWorkForNode {
        node_min: u32,
        node_max: u32,
        node_count: u32,
        total: u64,
    },

    #[error("invalid node specification '{0}', expected N/T or N-M/T with 1 <= N <= M <= T")]
    InvalidNode(String),
}

pub type MaskResult<T> = Result<T, MaskError>;
