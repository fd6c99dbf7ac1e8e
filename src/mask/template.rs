use tracing::debug;

use super::compile::{ActiveChain, RangeId};
use super::pattern::{Token, TokenKind};
use crate::consts::{KEY_BUFFER_CAPACITY, RANGE_MARKER};
use crate::error::{CapacityError, MaskResult, SyntaxError};

/// Fixed-capacity candidate buffer. The odometer rewrites range positions
/// in place between emissions; literal bytes stay put for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateKey {
    buf: Vec<u8>,
    capacity: usize,
}

impl Default for TemplateKey {
    fn default() -> Self {
        Self::with_capacity(KEY_BUFFER_CAPACITY)
    }
}

impl TemplateKey {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, b: u8) -> Result<(), CapacityError> {
        if self.buf.len() >= self.capacity {
            return Err(CapacityError::KeyOverflow {
                len: self.buf.len() + 1,
                capacity: self.capacity,
            });
        }
        self.buf.push(b);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline(always)]
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

/// Where a parent word goes in the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSlot {
    pub position: usize,
    pub invert: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub key: TemplateKey,
    pub words: Vec<WordSlot>,
    /// Ranges that received a key position.
    pub positioned: usize,
    pub truncated: bool,
}

/// Lays out the template key for output length `max_len` and links the
/// ranges that fit into `chain`.
///
/// `word_len` is the parent word length in stacked mode; in pure mode `?w`
/// is written out literally. Ranges beyond `max_len` drop out of the chain.
/// Dropping a disabled (consumer-enumerated) range is an error since the
/// consumer still expects to fill it.
pub fn build_template(
    tokens: &[Token],
    chain: &mut ActiveChain,
    max_len: usize,
    word_len: Option<usize>,
) -> MaskResult<Template> {
    let mut template = Template::default();
    if max_len > template.key.capacity() {
        return Err(CapacityError::KeyOverflow {
            len: max_len,
            capacity: template.key.capacity(),
        }
        .into());
    }

    let mut range = 0;
    let mut consumed = 0;
    for token in tokens {
        if template.key.len() >= max_len {
            break;
        }
        match token.kind {
            TokenKind::Group(_) | TokenKind::Class(_) => {
                let r = chain.get_mut(RangeId(range));
                r.key_position = template.key.len();
                template.key.push(RANGE_MARKER)?;
                range += 1;
            }
            TokenKind::Literal(b) => template.key.push(b)?,
            TokenKind::Word { invert } => match word_len {
                Some(len) => {
                    template.words.push(WordSlot {
                        position: template.key.len(),
                        invert,
                    });
                    let room = max_len - template.key.len();
                    for _ in 0..len.min(room) {
                        template.key.push(0)?;
                    }
                }
                None => {
                    template.key.push(b'?')?;
                    if template.key.len() < max_len {
                        template.key.push(if invert { b'W' } else { b'w' })?;
                    }
                }
            },
        }
        consumed += 1;
    }
    template.positioned = range;
    template.truncated = consumed < tokens.len();

    if let Some(immovable) = (range..chain.len()).rev().find(|&i| !chain.is_enabled(RangeId(i))) {
        return Err(CapacityError::InternalRangeTruncation {
            range: range.saturating_sub(1),
            immovable,
        }
        .into());
    }
    chain.relink(range);
    if template.truncated {
        debug!(
            "Template truncated at length {}: {} of {} ranges active",
            max_len,
            range,
            chain.len()
        );
    }

    if word_len.is_some() && template.words.is_empty() {
        return Err(SyntaxError::WordTruncated.into());
    }

    for r in chain.ranges().iter().take(range) {
        let (pos, b) = (r.key_position, r.current());
        template.key.as_mut_bytes()[pos] = b;
    }
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Encoding;
    use crate::mask::compile::compile_ranges;
    use crate::mask::pattern::Pattern;

    fn setup(text: &str) -> (Vec<Token>, ActiveChain) {
        let pattern = Pattern::parse(text.as_bytes().to_vec()).unwrap();
        let ranges = compile_ranges(&pattern, Encoding::Ascii, true).unwrap();
        (pattern.tokens(), ActiveChain::new(ranges))
    }

    #[test]
    fn test_layout_and_first_candidate() {
        let (tokens, mut chain) = setup("x[ab]y?d");
        let t = build_template(&tokens, &mut chain, 10, None).unwrap();
        assert_eq!(t.key.as_bytes(), b"xay1");
        assert_eq!(chain.get(RangeId(0)).key_position, 1);
        assert_eq!(chain.get(RangeId(1)).key_position, 3);
        assert!(!t.truncated);
    }

    #[test]
    fn test_truncation_unlinks_ranges() {
        let (tokens, mut chain) = setup("?d?d?d");
        let t = build_template(&tokens, &mut chain, 2, None).unwrap();
        assert!(t.truncated);
        assert_eq!(t.key.len(), 2);
        assert_eq!(chain.active_len(), 2);
        assert_eq!(chain.total().unwrap(), 100);
    }

    #[test]
    fn test_internal_range_cannot_be_dropped() {
        let (tokens, mut chain) = setup("?d?d?d");
        chain.skip(RangeId(2));
        let err = build_template(&tokens, &mut chain, 2, None).unwrap_err();
        assert!(matches!(
            err,
            crate::error::MaskError::Capacity(CapacityError::InternalRangeTruncation {
                immovable: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_word_slots() {
        let (tokens, mut chain) = setup("?d?w!?W");
        let t = build_template(&tokens, &mut chain, 20, Some(3)).unwrap();
        assert_eq!(
            t.words,
            vec![
                WordSlot { position: 1, invert: false },
                WordSlot { position: 5, invert: true }
            ]
        );
        assert_eq!(t.key.len(), 8);
    }

    #[test]
    fn test_word_literal_in_pure_mode() {
        let (tokens, mut chain) = setup("a?w");
        let t = build_template(&tokens, &mut chain, 10, None).unwrap();
        assert_eq!(t.key.as_bytes(), b"a?w");
    }

    #[test]
    fn test_key_capacity() {
        let (tokens, mut chain) = setup("abc");
        assert!(build_template(&tokens, &mut chain, KEY_BUFFER_CAPACITY + 1, None).is_err());
    }
}
