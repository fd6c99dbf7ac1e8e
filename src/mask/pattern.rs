use crate::charset::is_class_symbol;
use crate::consts::MAX_PATTERN_BYTES;
use crate::error::{CapacityError, MaskResult, SyntaxError};

/// Inclusive byte offsets of an outer-most bracket group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub open: usize,
    pub close: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Literal(u8),
    Group(Span),
    Class(u8),
    Word { invert: bool },
}

/// One output position of the pattern together with the source bytes it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is_range(&self) -> bool {
        matches!(self.kind, TokenKind::Group(_) | TokenKind::Class(_))
    }
}

/// A normalized pattern: escapes are still in place, custom placeholders and
/// hex escapes are gone, and the bracket and quantifier tables are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    text: Vec<u8>,
    groups: Vec<Span>,
    classes: Vec<usize>,
}

impl Pattern {
    /// Builds the bracket and quantifier tables for already-expanded text.
    pub fn parse(text: Vec<u8>) -> MaskResult<Self> {
        if text.len() > MAX_PATTERN_BYTES {
            return Err(CapacityError::PatternTooLong {
                len: text.len(),
                limit: MAX_PATTERN_BYTES,
            }
            .into());
        }
        let groups = find_groups(&text)?;
        let classes = find_classes(&text, &groups);
        Ok(Self {
            text,
            groups,
            classes,
        })
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn groups(&self) -> &[Span] {
        &self.groups
    }

    /// Offsets of free-standing `?x` quantifiers (the `?`).
    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn tokens(&self) -> Vec<Token> {
        let text = &self.text;
        let n = text.len();
        let mut out = Vec::with_capacity(n);
        let mut groups = self.groups.iter().peekable();
        let mut classes = self.classes.iter().peekable();
        let mut i = 0;

        while i < n {
            while groups.next_if(|g| g.open < i).is_some() {}
            while classes.next_if(|&&c| c < i).is_some() {}

            let (kind, len) = if let Some(g) = groups.next_if(|g| g.open == i) {
                (TokenKind::Group(*g), g.close + 1 - i)
            } else if classes.next_if(|&&c| c == i).is_some() {
                (TokenKind::Class(text[i + 1]), 2)
            } else if text[i] == b'\\' {
                match text.get(i + 1) {
                    Some(&b) => (TokenKind::Literal(b), 2),
                    None => (TokenKind::Literal(b'\\'), 1),
                }
            } else if text[i] == b'?' && matches!(text.get(i + 1), Some(b'w' | b'W')) {
                (
                    TokenKind::Word {
                        invert: text[i + 1] == b'W',
                    },
                    2,
                )
            } else {
                (TokenKind::Literal(text[i]), 1)
            };

            out.push(Token {
                kind,
                start: i,
                end: i + len,
            });
            i += len;
        }
        out
    }

    /// Output positions the pattern produces on its own: every literal,
    /// escape, class or group counts once, parent-word splices count zero.
    pub fn effective_len(&self) -> usize {
        self.tokens()
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Word { .. }))
            .count()
    }

    pub fn word_count(&self) -> usize {
        self.tokens()
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Word { .. }))
            .count()
    }

    pub fn range_count(&self) -> usize {
        self.groups.len() + self.classes.len()
    }

    pub fn display(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

/// Locates outer-most groups. A group opens at the first unescaped `[` and
/// closes at the last `]` seen before a `[` that follows a `]`, so inner
/// brackets become literal members: `[[ab]c]` is one group, `[[ab][c]` two.
fn find_groups(text: &[u8]) -> Result<Vec<Span>, SyntaxError> {
    let n = text.len();
    let mut groups = Vec::new();
    let mut j = 0;

    while j < n {
        let mut i = j;
        while i < n && text[i] != b'[' {
            i += if text[i] == b'\\' { 2 } else { 1 };
        }
        if i >= n {
            break;
        }

        let open = i;
        if text.get(open + 1) == Some(&b']') {
            return Err(SyntaxError::EmptyGroup);
        }

        let mut close = None;
        i += 1;
        while i < n {
            match text[i] {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b']' => close = Some(i),
                b'[' if close.is_some() => break,
                _ => {}
            }
            i += 1;
        }

        match close {
            Some(close) => groups.push(Span { open, close }),
            None => return Err(SyntaxError::UnbalancedBracket),
        }
        j = i;
    }
    Ok(groups)
}

fn find_classes(text: &[u8], groups: &[Span]) -> Vec<usize> {
    let mut classes = Vec::new();
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            b'\\' => i += 1,
            b'?' if text.get(i + 1).is_some_and(|&s| is_class_symbol(s))
                && !groups.iter().any(|g| g.open < i && i < g.close) =>
            {
                classes.push(i)
            }
            _ => {}
        }
        i += 1;
    }
    classes
}
