mod tables;

pub use self::tables::{
    encodings as print_encodings, hits as print_hits, node_shares as print_node_shares,
    ranges as print_ranges, summary as print_summary,
};
