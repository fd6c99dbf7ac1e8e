use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::charset::Encoding;
use crate::consts::{DEFAULT_NATIVE_MAX_LENGTH, KEY_BUFFER_CAPACITY};
use crate::engine::{
    node_share, seed_cursors, CandidateBudget, CheckpointRecord, Consumer, LengthState, NodeShare,
    NodeSpec, Odometer, PatternId, RunOutcome, WorkerSlot,
};
use crate::error::{CapacityError, MaskError, MaskResult, PartitionError, SyntaxError};
use crate::mask::{
    build_template, compile_ranges, normalize, stretch, ActiveChain, NormalizeContext, Pattern,
    RangeId, Template, Token, TokenKind,
};

#[derive(Debug, Clone, TypedBuilder)]
pub struct MaskOptions {
    #[builder(setter(into))]
    pub pattern: String,
    /// `?1`..`?9` definitions in slot order; empty strings are undefined.
    #[builder(default)]
    pub custom: Vec<String>,
    #[builder(default)]
    pub encoding: Encoding,
    #[builder(default = true)]
    pub case_sensitive: bool,
    /// Enables length iteration from this length up to the maximum.
    #[builder(default)]
    pub min_length: Option<usize>,
    #[builder(default)]
    pub max_length: Option<usize>,
    #[builder(default = 0)]
    pub native_min_length: usize,
    #[builder(default = DEFAULT_NATIVE_MAX_LENGTH)]
    pub native_max_length: usize,
    #[builder(default)]
    pub node: Option<NodeSpec>,
    /// Runs only this worker's piece of the node's share (the whole run when
    /// `node` is unset).
    #[builder(default)]
    pub worker: Option<WorkerSlot>,
    #[builder(default = false)]
    pub stacked: bool,
    /// Ranges the consumer enumerates on its own; they stay at their first member.
    #[builder(default)]
    pub internal_ranges: Vec<usize>,
}

/// Word lengths a parent mode should produce so that the spliced candidate
/// fits the requested length range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBudget {
    pub min: Option<usize>,
    pub max: usize,
}

/// One enumeration run: the compiled pattern plus all mutable odometer state.
///
/// Pure mode is driven by [`MaskSession::run`], stacked mode by
/// [`MaskSession::run_word`] once per parent word.
#[derive(Debug)]
pub struct MaskSession {
    options: MaskOptions,
    pattern: Pattern,
    tokens: Vec<Token>,
    chain: ActiveChain,
    template: Template,
    budget: CandidateBudget,
    id: PatternId,
    max_len: usize,
    own_len: usize,
    word_count: usize,
    current_len: Option<usize>,
    done_before: u64,
    word_len: Option<usize>,
    started: bool,
    finished: bool,
}

impl MaskSession {
    pub fn new(options: MaskOptions) -> MaskResult<Self> {
        info!("Initializing mask session");
        let max_len = options.max_length.unwrap_or(options.native_max_length);
        validate_lengths(&options, max_len)?;

        let ctx = NormalizeContext {
            custom: &options.custom,
            encoding: options.encoding,
            case_sensitive: options.case_sensitive,
        };
        let mut pattern = normalize(&options.pattern, &ctx)?;
        let explicit_length = options.max_length.is_some() || options.min_length.is_some();
        if !options.stacked && explicit_length {
            pattern = stretch(&pattern, max_len)?;
        }

        let tokens = pattern.tokens();
        let own_len = pattern.effective_len();
        let word_count = pattern.word_count();
        check_words(&options, &tokens, word_count, max_len)?;

        let ranges = compile_ranges(&pattern, options.encoding, options.case_sensitive)?;
        let mut chain = ActiveChain::new(ranges);
        for &idx in &options.internal_ranges {
            if idx < chain.len() {
                chain.skip(RangeId(idx));
            } else {
                warn!("Ignoring internal range {}: pattern has {} ranges", idx, chain.len());
            }
        }

        let node = options.node.filter(|_| !options.stacked);
        let worker = options.worker.filter(|_| !options.stacked);
        let id = PatternId::from_parts(
            pattern.text(),
            options.encoding,
            options.case_sensitive,
            node,
            worker,
            &options.internal_ranges,
        );

        let mut session = Self {
            options,
            pattern,
            tokens,
            chain,
            template: Template::default(),
            budget: CandidateBudget::default(),
            id,
            max_len,
            own_len,
            word_count,
            current_len: None,
            done_before: 0,
            word_len: None,
            started: false,
            finished: false,
        };

        if !session.options.stacked {
            let start = session.options.min_length.unwrap_or(max_len);
            session.prepare_length(start)?;
            if session.options.min_length.is_some() {
                session.current_len = Some(start);
            } else if session.template.truncated {
                warn!(
                    "Mask truncated to max length {}: {} of {} ranges active",
                    max_len,
                    session.chain.active_len(),
                    session.chain.len()
                );
            }
        }

        info!(
            "Mask ready: {} ({} ranges, {} candidates)",
            session.pattern.display(),
            session.chain.len(),
            session.budget.total
        );
        Ok(session)
    }

    /// Lays out the template for `len` and resets the odometer to this
    /// node's first candidate at that length.
    fn prepare_length(&mut self, len: usize) -> MaskResult<()> {
        self.chain.reset_cursors();
        let node = self.partition_node();
        let worker = self.worker();

        if len == 0 {
            // The empty candidate belongs to the node that takes the remainder,
            // and within it to the last worker.
            self.chain.relink(0);
            self.template = Template::default();
            let owner = node.map_or(true, |n| n.max == n.count) && worker.map_or(true, |w| w.is_last());
            self.budget = if owner {
                CandidateBudget::unpartitioned(1)
            } else {
                CandidateBudget::for_share(NodeShare { offset: 0, count: 0 })
            };
            return Ok(());
        }

        self.template = build_template(&self.tokens, &mut self.chain, len, None)?;
        let total = self.chain.total()?;
        self.budget = match (node, worker) {
            (None, None) => CandidateBudget::unpartitioned(total),
            (node, worker) => {
                let node = match node {
                    Some(node) => node,
                    None => NodeSpec::single(1, 1)?,
                };
                match node_share(total, node) {
                    Ok(share) => {
                        let share = match worker {
                            Some(worker) => {
                                let piece = share.split(worker);
                                debug!(
                                    "Worker {} of node {}: {} candidates starting at {}",
                                    worker, node, piece.count, piece.offset
                                );
                                piece
                            }
                            None => share,
                        };
                        seed_cursors(&mut self.chain, share.offset);
                        CandidateBudget::for_share(share)
                    }
                    // Short lengths may not reach every node while scanning.
                    Err(PartitionError::NoWorkForNode { .. }) if self.length_iteration().is_some() => {
                        debug!("Node {} has no work at length {}", node, len);
                        CandidateBudget::for_share(NodeShare { offset: 0, count: 0 })
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };
        debug!(
            "Length {}: template {:?}, {} candidates",
            len,
            String::from_utf8_lossy(self.template.key.as_bytes()),
            self.budget.total
        );
        Ok(())
    }

    /// Minimum length when pure mode scans lengths, `None` otherwise.
    fn length_iteration(&self) -> Option<usize> {
        self.options.min_length.filter(|_| !self.options.stacked)
    }

    fn partition_node(&self) -> Option<NodeSpec> {
        self.options.node.filter(|_| !self.options.stacked)
    }

    fn worker(&self) -> Option<WorkerSlot> {
        self.options.worker.filter(|_| !self.options.stacked)
    }

    /// Seeds the session from a checkpoint. Must precede the first candidate.
    pub fn restore(&mut self, record: &CheckpointRecord) -> MaskResult<()> {
        if self.started {
            return Err(MaskError::Config(
                "a session can only be restored before its first candidate".to_string(),
            ));
        }
        record.verify(&self.id, &self.chain)?;

        match (self.length_iteration(), record.length) {
            (Some(_), Some(state)) => {
                if state.current > self.max_len {
                    return Err(MaskError::ChecksumMismatch(format!(
                        "saved length {} is beyond max length {}",
                        state.current, self.max_len
                    )));
                }
                self.prepare_length(state.current)?;
                self.current_len = Some(state.current);
                self.done_before = state.done_before;
            }
            (None, None) => {}
            _ => {
                return Err(MaskError::ChecksumMismatch(
                    "length iteration settings differ from the saved session".to_string(),
                ))
            }
        }

        record.restore(&self.id, &mut self.chain)?;
        self.budget.remaining = record.remaining;
        info!(
            "Restored session: {} candidates remaining{}",
            record.remaining,
            self.current_len
                .map(|l| format!(" at length {}", l))
                .unwrap_or_default()
        );
        Ok(())
    }

    /// Enumerates every candidate of a pure-mode session.
    pub fn run<C: Consumer + ?Sized>(&mut self, consumer: &mut C) -> MaskResult<RunOutcome> {
        self.run_for(consumer, None)
    }

    /// Like [`MaskSession::run`], pausing after `window` candidates so the
    /// caller can checkpoint. Calling again continues where it paused.
    pub fn run_for<C: Consumer + ?Sized>(
        &mut self,
        consumer: &mut C,
        window: Option<u64>,
    ) -> MaskResult<RunOutcome> {
        if self.options.stacked {
            return Err(MaskError::Config(
                "stacked sessions are driven one parent word at a time".to_string(),
            ));
        }
        if self.finished {
            return Ok(RunOutcome::Exhausted);
        }
        self.started = true;

        let outcome = if self.length_iteration().is_some() {
            self.run_lengths(consumer, window)?
        } else {
            self.generate(consumer, window)
        };
        self.finished = matches!(outcome, RunOutcome::Exhausted | RunOutcome::QuotaReached);
        Ok(outcome)
    }

    fn run_lengths<C: Consumer + ?Sized>(
        &mut self,
        consumer: &mut C,
        mut window: Option<u64>,
    ) -> MaskResult<RunOutcome> {
        let Some(mut len) = self.current_len else {
            return Ok(RunOutcome::Exhausted);
        };
        let mut prepared = true;
        let mut previous: Option<usize> = None;

        while len <= self.max_len {
            if !prepared {
                let finished = self.budget;
                self.prepare_length(len)?;
                if previous == Some(self.template.key.len()) {
                    debug!("Length {} adds nothing to the template, stopping", len);
                    self.budget = finished;
                    break;
                }
            }
            prepared = false;
            previous = Some(self.template.key.len());
            self.current_len = Some(len);

            let before = self.budget.remaining;
            let outcome = self.generate(consumer, window);
            if let Some(w) = window.as_mut() {
                *w = w.saturating_sub(before.saturating_sub(self.budget.remaining));
            }
            match outcome {
                RunOutcome::Stopped | RunOutcome::Paused => return Ok(outcome),
                RunOutcome::Exhausted | RunOutcome::QuotaReached => {}
            }
            self.done_before += self.budget.done();
            len += 1;
        }
        Ok(RunOutcome::Exhausted)
    }

    fn generate<C: Consumer + ?Sized>(&mut self, consumer: &mut C, window: Option<u64>) -> RunOutcome {
        Odometer::new(&mut self.chain, &mut self.template.key, &mut self.budget)
            .with_window(window)
            .run(consumer)
    }

    /// Stacked mode: enumerates the mask around one parent word. `?w` takes
    /// the word as is, `?W` with every letter case-inverted.
    pub fn run_word<C: Consumer + ?Sized>(
        &mut self,
        word: &[u8],
        consumer: &mut C,
    ) -> MaskResult<RunOutcome> {
        if !self.options.stacked {
            return Err(MaskError::Config(
                "parent words can only be spliced into a stacked session".to_string(),
            ));
        }

        let resuming = self.started && self.budget.remaining > 0;
        if self.word_len != Some(word.len()) {
            self.template = build_template(&self.tokens, &mut self.chain, self.max_len, Some(word.len()))?;
            self.word_len = Some(word.len());
            debug!(
                "Rebuilt template for {}-byte words: {} bytes",
                word.len(),
                self.template.key.len()
            );
        }
        if !resuming {
            self.budget = CandidateBudget::unpartitioned(self.chain.total()?);
        }
        self.started = true;

        let encoding = self.options.encoding;
        let Template { key, words, .. } = &mut self.template;
        let buf = key.as_mut_bytes();
        for slot in words.iter() {
            let n = word.len().min(self.max_len - slot.position);
            for (dst, &src) in buf[slot.position..slot.position + n].iter_mut().zip(word) {
                *dst = if slot.invert { encoding.toggle_case(src) } else { src };
            }
        }

        let outcome = self.generate(consumer, None);
        if outcome == RunOutcome::Exhausted {
            self.budget.remaining = 0;
        }
        Ok(outcome)
    }

    /// Snapshot of the odometer, valid between candidates.
    pub fn checkpoint(&self) -> CheckpointRecord {
        let length = self.length_iteration().map(|min| LengthState {
            current: self.current_len.unwrap_or(min),
            done_before: self.done_before,
        });
        CheckpointRecord::save(&self.id, &self.chain, &self.budget, length)
    }

    /// Percent of this node's candidates produced so far.
    pub fn progress(&self) -> f64 {
        let total = self.done_before + self.budget.total;
        if total == 0 {
            return 100.0;
        }
        (self.done_before + self.budget.done()) as f64 * 100.0 / total as f64
    }

    /// Parent-mode length limits in stacked mode, after subtracting the
    /// mask's own output and sharing the rest between the splice points.
    pub fn parent_length_budget(&self) -> Option<LengthBudget> {
        if !self.options.stacked {
            return None;
        }
        let own = self.own_len.min(self.max_len - 1);
        let words = self.word_count.max(1);
        let min = self.options.min_length.map(|m| {
            if m >= own {
                (m - own) / words
            } else {
                m / words
            }
        });
        Some(LengthBudget {
            min,
            max: (self.max_len - own) / words,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn chain(&self) -> &ActiveChain {
        &self.chain
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn budget(&self) -> &CandidateBudget {
        &self.budget
    }

    pub fn pattern_id(&self) -> &PatternId {
        &self.id
    }

    pub fn options(&self) -> &MaskOptions {
        &self.options
    }

    pub fn max_length(&self) -> usize {
        self.max_len
    }

    pub fn effective_length(&self) -> usize {
        self.own_len
    }

    pub fn current_length(&self) -> Option<usize> {
        self.current_len
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

fn validate_lengths(options: &MaskOptions, max_len: usize) -> MaskResult<()> {
    if max_len > KEY_BUFFER_CAPACITY {
        return Err(CapacityError::KeyOverflow {
            len: max_len,
            capacity: KEY_BUFFER_CAPACITY,
        }
        .into());
    }
    if max_len == 0 {
        return Err(CapacityError::UnsatisfiableLength {
            requested: 0,
            reason: "max length must be at least 1".to_string(),
        }
        .into());
    }
    if options.max_length.is_some() && max_len < options.native_min_length {
        return Err(CapacityError::UnsatisfiableLength {
            requested: max_len,
            reason: format!("below the consumer's minimum length {}", options.native_min_length),
        }
        .into());
    }
    if let Some(min) = options.min_length {
        if min > max_len {
            return Err(CapacityError::UnsatisfiableLength {
                requested: min,
                reason: format!("min length exceeds max length {}", max_len),
            }
            .into());
        }
    }
    if options.stacked && max_len < 2 {
        return Err(CapacityError::UnsatisfiableLength {
            requested: max_len,
            reason: "too short max length for a hybrid mask".to_string(),
        }
        .into());
    }
    Ok(())
}

fn check_words(
    options: &MaskOptions,
    tokens: &[Token],
    word_count: usize,
    max_len: usize,
) -> MaskResult<()> {
    if !options.stacked {
        if word_count > 0 {
            warn!("?w has no special meaning in pure mask mode");
        }
        return Ok(());
    }
    if word_count == 0 {
        return Err(SyntaxError::MissingWordPlaceholder.into());
    }
    let before_first = tokens
        .iter()
        .take_while(|t| !matches!(t.kind, TokenKind::Word { .. }))
        .count();
    if before_first >= max_len {
        return Err(SyntaxError::WordTruncated.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(session: &mut MaskSession) -> Vec<String> {
        let mut out = Vec::new();
        session
            .run(&mut |c: &[u8]| {
                out.push(String::from_utf8_lossy(c).into_owned());
                false
            })
            .unwrap();
        out
    }

    fn session(pattern: &str) -> MaskSession {
        MaskSession::new(MaskOptions::builder().pattern(pattern).build()).unwrap()
    }

    #[test]
    fn test_literal_pattern() {
        let mut s = session("secret");
        assert_eq!(s.chain().len(), 0);
        assert_eq!(collect(&mut s), vec!["secret"]);
        assert!(s.is_finished());
    }

    #[test]
    fn test_length_iteration() {
        let options = MaskOptions::builder()
            .pattern("[ab]")
            .min_length(Some(0))
            .max_length(Some(2))
            .build();
        let mut s = MaskSession::new(options).unwrap();
        assert_eq!(collect(&mut s), vec!["", "a", "b", "aa", "ba", "ab", "bb"]);
        assert_eq!(s.progress(), 100.0);
    }

    #[test]
    fn test_min_length_stretches_to_native_max() {
        let options = MaskOptions::builder()
            .pattern("x?d")
            .min_length(Some(1))
            .native_max_length(5)
            .build();
        let mut s = MaskSession::new(options).unwrap();
        // Stretched to five positions by the native maximum.
        assert_eq!(s.effective_length(), 5);
        assert_eq!(collect(&mut s).len(), 1 + 10 + 100 + 1000 + 10000);
    }

    #[test]
    fn test_truncation_to_max_length() {
        let options = MaskOptions::builder().pattern("?d?d?d").native_max_length(2).build();
        let mut s = MaskSession::new(options).unwrap();
        assert_eq!(s.budget().total, 100);
        assert!(collect(&mut s).iter().all(|c| c.len() == 2));
    }

    #[test]
    fn test_stacked_words() {
        let options = MaskOptions::builder()
            .pattern("?W[12]")
            .stacked(true)
            .max_length(Some(10))
            .build();
        let mut s = MaskSession::new(options).unwrap();
        let mut out = Vec::new();
        for word in ["ab", "Cd"] {
            s.run_word(word.as_bytes(), &mut |c: &[u8]| {
                out.push(String::from_utf8_lossy(c).into_owned());
                false
            })
            .unwrap();
        }
        assert_eq!(out, vec!["AB1", "AB2", "cD1", "cD2"]);
    }

    #[test]
    fn test_stacked_word_is_cut_at_max_length() {
        let options = MaskOptions::builder()
            .pattern("?d?w")
            .stacked(true)
            .max_length(Some(4))
            .build();
        let mut s = MaskSession::new(options).unwrap();
        let mut out = Vec::new();
        s.run_word(b"abcdef", &mut |c: &[u8]| {
            out.push(c.to_vec());
            true
        })
        .unwrap();
        assert_eq!(out, vec![b"1abc".to_vec()]);
    }

    #[test]
    fn test_stacked_requirements() {
        let missing = MaskSession::new(MaskOptions::builder().pattern("?d?d").stacked(true).build());
        assert!(matches!(
            missing,
            Err(MaskError::Syntax(SyntaxError::MissingWordPlaceholder))
        ));

        let truncated = MaskSession::new(
            MaskOptions::builder()
                .pattern("abc?w")
                .stacked(true)
                .max_length(Some(3))
                .build(),
        );
        assert!(matches!(
            truncated,
            Err(MaskError::Syntax(SyntaxError::WordTruncated))
        ));

        let short = MaskSession::new(
            MaskOptions::builder()
                .pattern("?w")
                .stacked(true)
                .max_length(Some(1))
                .build(),
        );
        assert!(matches!(
            short,
            Err(MaskError::Capacity(CapacityError::UnsatisfiableLength { .. }))
        ));
    }

    #[test]
    fn test_parent_length_budget() {
        let options = MaskOptions::builder()
            .pattern("?w?d?w")
            .stacked(true)
            .min_length(Some(5))
            .max_length(Some(11))
            .build();
        let s = MaskSession::new(options).unwrap();
        assert_eq!(
            s.parent_length_budget(),
            Some(LengthBudget { min: Some(2), max: 5 })
        );
        assert_eq!(session("?d").parent_length_budget(), None);
    }

    #[test]
    fn test_invalid_lengths() {
        let err = MaskSession::new(
            MaskOptions::builder()
                .pattern("?d")
                .min_length(Some(4))
                .max_length(Some(3))
                .build(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MaskError::Capacity(CapacityError::UnsatisfiableLength { requested: 4, .. })
        ));

        let err = MaskSession::new(
            MaskOptions::builder()
                .pattern("?d")
                .max_length(Some(2))
                .native_min_length(4)
                .build(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MaskError::Capacity(CapacityError::UnsatisfiableLength { requested: 2, .. })
        ));
    }

    #[test]
    fn test_restore_after_start_is_rejected() {
        let mut s = session("?d");
        let record = s.checkpoint();
        collect(&mut s);
        assert!(matches!(s.restore(&record), Err(MaskError::Config(_))));
    }

    #[test]
    fn test_internal_ranges_are_left_alone() {
        let options = MaskOptions::builder()
            .pattern("[ab][xy]")
            .internal_ranges(vec![1])
            .build();
        let mut s = MaskSession::new(options).unwrap();
        assert_eq!(s.chain().internal_total(), 2);
        assert_eq!(collect(&mut s), vec!["ax", "bx"]);
    }

    #[test]
    fn test_progress_is_complete_when_template_stops_growing() {
        let options = MaskOptions::builder()
            .pattern("?d?d?d")
            .min_length(Some(1))
            .max_length(Some(3))
            .build();
        let mut s = MaskSession::new(options).unwrap();
        // Only two positions left to lay out, so length 3 repeats length 2.
        s.tokens.truncate(2);
        assert_eq!(collect(&mut s).len(), 10 + 100);
        assert!(s.is_finished());
        assert_eq!(s.budget().remaining, 0);
        assert_eq!(s.progress(), 100.0);
    }

    fn worker_run(node: Option<NodeSpec>, parts: u32, min_length: Option<usize>) -> Vec<Vec<String>> {
        (0..parts)
            .map(|i| {
                let options = MaskOptions::builder()
                    .pattern("[a-w]")
                    .min_length(min_length)
                    .max_length(min_length.map(|_| 2))
                    .node(node)
                    .worker(Some(WorkerSlot::new(i, parts).unwrap()))
                    .build();
                collect(&mut MaskSession::new(options).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_workers_cover_their_node() {
        let node = NodeSpec::single(1, 2).ok();
        let whole = collect(
            &mut MaskSession::new(MaskOptions::builder().pattern("[a-w]").node(node).build()).unwrap(),
        );
        let pieces = worker_run(node, 3, None);
        assert_eq!(pieces.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 5]);
        assert_eq!(pieces.concat(), whole);
        // The boundary with node 2/2 is covered by the last worker.
        assert_eq!(whole.last().map(String::as_str), Some("k"));
    }

    #[test]
    fn test_workers_without_node_split_everything() {
        let full = collect(&mut session("[a-w]"));
        assert_eq!(worker_run(None, 4, None).concat(), full);

        let scanned = MaskOptions::builder()
            .pattern("[a-w]")
            .min_length(Some(0))
            .max_length(Some(2))
            .build();
        let mut full = collect(&mut MaskSession::new(scanned).unwrap());
        let mut joined = worker_run(None, 4, Some(0)).concat();
        assert_eq!(joined.iter().filter(|c| c.is_empty()).count(), 1);
        full.sort();
        joined.sort();
        assert_eq!(joined, full);
    }
}
