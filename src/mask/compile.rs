use tracing::debug;

use super::pattern::{Pattern, TokenKind};
use crate::charset::{class_members, Encoding};
use crate::consts::MAX_RANGES;
use crate::error::{CapacityError, MaskResult};

/// Index of a range in pattern order. Range 0 is the leftmost group or class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeId(pub usize);

/// One variable position of the candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRange {
    pub members: Vec<u8>,
    /// Set when `members` is a contiguous ascending byte run starting here.
    pub start: Option<u8>,
    /// Byte offset in the template key, assigned when the template is built.
    pub key_position: usize,
    pub next: Option<RangeId>,
    pub prev: Option<RangeId>,
    pub cursor: usize,
}

impl PositionRange {
    pub fn new(members: Vec<u8>) -> Self {
        let start = members.first().copied().filter(|&first| {
            members
                .iter()
                .enumerate()
                .all(|(i, &b)| b as usize == first as usize + i)
        });
        Self {
            members,
            start,
            key_position: 0,
            next: None,
            prev: None,
            cursor: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[inline(always)]
    pub fn member(&self, index: usize) -> u8 {
        match self.start {
            Some(base) => base + index as u8,
            None => self.members[index],
        }
    }

    #[inline(always)]
    pub fn current(&self) -> u8 {
        self.member(self.cursor)
    }
}

/// Ranges in a flat arena plus the doubly linked significance order over
/// the ones the odometer drives. Disabled ranges keep their slot but are
/// never linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveChain {
    ranges: Vec<PositionRange>,
    enabled: Vec<bool>,
    head: Option<RangeId>,
}

impl ActiveChain {
    pub fn new(ranges: Vec<PositionRange>) -> Self {
        let enabled = vec![true; ranges.len()];
        let mut chain = Self {
            ranges,
            enabled,
            head: None,
        };
        chain.relink(chain.len());
        chain
    }

    /// Links every enabled range below `limit` in pattern order.
    pub fn relink(&mut self, limit: usize) {
        let mut prev: Option<RangeId> = None;
        self.head = None;
        for r in &mut self.ranges {
            r.next = None;
            r.prev = None;
        }
        for i in (0..limit.min(self.ranges.len())).filter(|&i| self.enabled[i]) {
            let id = RangeId(i);
            match prev {
                Some(p) => self.ranges[p.0].next = Some(id),
                None => self.head = Some(id),
            }
            self.ranges[i].prev = prev;
            prev = Some(id);
        }
    }

    /// Drops the range from the chain, relinking its neighbours around it.
    pub fn skip(&mut self, id: RangeId) {
        if !self.enabled.get(id.0).copied().unwrap_or(false) {
            return;
        }
        self.enabled[id.0] = false;
        let (prev, next) = (self.ranges[id.0].prev, self.ranges[id.0].next);
        match prev {
            Some(p) => self.ranges[p.0].next = next,
            None if self.head == Some(id) => self.head = next,
            None => {}
        }
        if let Some(n) = next {
            self.ranges[n.0].prev = prev;
        }
        self.ranges[id.0].next = None;
        self.ranges[id.0].prev = None;
    }

    pub fn is_enabled(&self, id: RangeId) -> bool {
        self.enabled.get(id.0).copied().unwrap_or(false)
    }

    pub fn head(&self) -> Option<RangeId> {
        self.head
    }

    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            chain: self,
            cursor: self.head,
        }
    }

    pub fn active_len(&self) -> usize {
        self.iter().count()
    }

    pub fn ranges(&self) -> &[PositionRange] {
        &self.ranges
    }

    pub fn ranges_mut(&mut self) -> &mut [PositionRange] {
        &mut self.ranges
    }

    pub fn get(&self, id: RangeId) -> &PositionRange {
        &self.ranges[id.0]
    }

    pub fn get_mut(&mut self, id: RangeId) -> &mut PositionRange {
        &mut self.ranges[id.0]
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn reset_cursors(&mut self) {
        for r in &mut self.ranges {
            r.cursor = 0;
        }
    }

    /// Number of candidates the linked ranges enumerate.
    pub fn total(&self) -> MaskResult<u64> {
        self.iter()
            .try_fold(1u64, |acc, id| acc.checked_mul(self.get(id).len() as u64))
            .ok_or_else(|| {
                CapacityError::CandidateOverflow {
                    ranges: self.active_len(),
                }
                .into()
            })
    }

    /// Product over the disabled ranges, which a consumer enumerates itself.
    pub fn internal_total(&self) -> u64 {
        self.ranges
            .iter()
            .zip(&self.enabled)
            .filter(|(_, on)| !**on)
            .fold(1u64, |acc, (r, _)| acc.saturating_mul(r.len() as u64))
    }
}

pub struct ChainIter<'a> {
    chain: &'a ActiveChain,
    cursor: Option<RangeId>,
}

impl Iterator for ChainIter<'_> {
    type Item = RangeId;

    fn next(&mut self) -> Option<RangeId> {
        let id = self.cursor?;
        self.cursor = self.chain.get(id).next;
        Some(id)
    }
}

/// Builds one position range per group or free-standing class, in pattern order.
pub fn compile_ranges(
    pattern: &Pattern,
    encoding: Encoding,
    case_sensitive: bool,
) -> MaskResult<Vec<PositionRange>> {
    let count = pattern.range_count();
    if count > MAX_RANGES {
        return Err(CapacityError::RangeOverflow {
            count,
            limit: MAX_RANGES,
        }
        .into());
    }

    let text = pattern.text();
    let mut ranges = Vec::with_capacity(count);
    for token in pattern.tokens() {
        let members = match token.kind {
            TokenKind::Group(span) => resolve_group(&text[span.open + 1..span.close]),
            TokenKind::Class(symbol) => class_members(symbol, encoding, case_sensitive)?,
            _ => continue,
        };
        let range = PositionRange::new(members);
        debug!(
            "Range {}: {} members{}",
            ranges.len(),
            range.len(),
            if range.start.is_some() { ", contiguous" } else { "" }
        );
        ranges.push(range);
    }
    Ok(ranges)
}

/// Resolves the body of a bracket group into its ordered, de-duplicated
/// members. `a-b` is an inclusive range in either direction unless the `-`
/// is first or last; `\` makes the next byte literal.
pub fn resolve_group(body: &[u8]) -> Vec<u8> {
    let mut members = Vec::with_capacity(body.len());
    let mut seen = [false; 256];
    let mut add = |b: u8, members: &mut Vec<u8>| {
        if !seen[b as usize] {
            seen[b as usize] = true;
            members.push(b);
        }
    };

    let n = body.len();
    let mut j = 0;
    while j < n {
        let c = body[j];
        if c == b'\\' {
            j += 1;
            if j >= n {
                break;
            }
            add(body[j], &mut members);
        } else if c == b'-' && j > 0 && j + 1 < n && body[j + 1] != b'\\' {
            fill(body[j - 1], body[j + 1], |b| add(b, &mut members));
            j += 1;
        } else if c == b'-' && j > 0 && j + 2 < n && body[j + 1] == b'\\' {
            fill(body[j - 1], body[j + 2], |b| add(b, &mut members));
            j += 2;
        } else {
            add(c, &mut members);
        }
        j += 1;
    }
    members
}

fn fill(from: u8, to: u8, mut add: impl FnMut(u8)) {
    if from <= to {
        (from..=to).for_each(&mut add);
    } else {
        (to..=from).rev().for_each(&mut add);
    }
}
