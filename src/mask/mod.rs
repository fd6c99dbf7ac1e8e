//! Pattern language front end: normalization, range compilation, template
//! layout and length stretching.

pub mod compile;
pub mod normalize;
pub mod pattern;
pub mod stretch;
pub mod template;

pub use compile::{compile_ranges, ActiveChain, PositionRange, RangeId};
pub use normalize::{normalize, NormalizeContext};
pub use pattern::{Pattern, Span, Token, TokenKind};
pub use stretch::stretch;
pub use template::{build_template, Template, TemplateKey, WordSlot};
