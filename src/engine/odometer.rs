use super::{CandidateBudget, Consumer, RunOutcome};
use crate::mask::{ActiveChain, PositionRange, RangeId, TemplateKey};

/// Chains with at least this many ranges run the nested fast path.
pub const UNROLL_DEPTH: usize = 4;

/// Mixed-radix counter over the active chain. The first range in the chain
/// is least significant and varies fastest.
///
/// Cursors always describe the next candidate to emit, so whatever the run
/// ends with (stop, quota, pause) the chain can be checkpointed as is.
pub struct Odometer<'a> {
    chain: &'a mut ActiveChain,
    key: &'a mut TemplateKey,
    budget: &'a mut CandidateBudget,
    window: Option<u64>,
}

impl<'a> Odometer<'a> {
    pub fn new(
        chain: &'a mut ActiveChain,
        key: &'a mut TemplateKey,
        budget: &'a mut CandidateBudget,
    ) -> Self {
        Self {
            chain,
            key,
            budget,
            window: None,
        }
    }

    /// Emit at most `window` candidates before pausing.
    pub fn with_window(mut self, window: Option<u64>) -> Self {
        self.window = window;
        self
    }

    pub fn run<C: Consumer + ?Sized>(self, consumer: &mut C) -> RunOutcome {
        let order: Vec<RangeId> = self.chain.iter().collect();
        if order.len() < UNROLL_DEPTH {
            self.run_general(&order, consumer)
        } else {
            self.run_unrolled(&order, consumer)
        }
    }

    fn run_general<C: Consumer + ?Sized>(self, order: &[RangeId], consumer: &mut C) -> RunOutcome {
        let Odometer {
            chain,
            key,
            budget,
            mut window,
        } = self;

        for &id in order {
            write(key, chain.get(id));
        }

        loop {
            if let Some(outcome) = admit(budget, &mut window) {
                return outcome;
            }
            if consumer.process(key.as_bytes()) {
                budget.remaining += 1;
                return RunOutcome::Stopped;
            }
            if !advance(chain, key, order) {
                return RunOutcome::Exhausted;
            }
        }
    }

    fn run_unrolled<C: Consumer + ?Sized>(self, order: &[RangeId], consumer: &mut C) -> RunOutcome {
        let Odometer {
            chain,
            key,
            budget,
            mut window,
        } = self;
        let (lanes, rest) = order.split_at(UNROLL_DEPTH);

        for &id in order {
            write(key, chain.get(id));
        }

        loop {
            let (outcome, cursors) = {
                let ranges = chain.ranges();
                let [r1, r2, r3, r4] = [0, 1, 2, 3].map(|i| &ranges[lanes[i].0]);
                let (mut i1, mut i2, mut i3, mut i4) = (r1.cursor, r2.cursor, r3.cursor, r4.cursor);
                let buf = key.as_mut_bytes();
                let mut outcome = None;

                'block: while i4 < r4.len() {
                    buf[r4.key_position] = r4.member(i4);
                    while i3 < r3.len() {
                        buf[r3.key_position] = r3.member(i3);
                        while i2 < r2.len() {
                            buf[r2.key_position] = r2.member(i2);
                            while i1 < r1.len() {
                                if let Some(o) = admit(budget, &mut window) {
                                    outcome = Some(o);
                                    break 'block;
                                }
                                buf[r1.key_position] = r1.member(i1);
                                if consumer.process(buf) {
                                    budget.remaining += 1;
                                    outcome = Some(RunOutcome::Stopped);
                                    break 'block;
                                }
                                i1 += 1;
                            }
                            i1 = 0;
                            i2 += 1;
                        }
                        i2 = 0;
                        i3 += 1;
                    }
                    i3 = 0;
                    i4 += 1;
                }
                if outcome.is_none() {
                    i4 = 0;
                }
                (outcome, [i1, i2, i3, i4])
            };

            for (id, cursor) in lanes.iter().zip(cursors) {
                chain.get_mut(*id).cursor = cursor;
            }
            if let Some(outcome) = outcome {
                // Lanes may hold bytes of the block's last candidate.
                for &id in lanes {
                    write(key, chain.get(id));
                }
                return outcome;
            }
            for &id in lanes {
                write(key, chain.get(id));
            }
            if !advance(chain, key, rest) {
                return RunOutcome::Exhausted;
            }
        }
    }
}

#[inline(always)]
fn write(key: &mut TemplateKey, range: &PositionRange) {
    key.as_mut_bytes()[range.key_position] = range.current();
}

/// Takes one candidate out of the window and the quota, or reports why not.
#[inline(always)]
fn admit(budget: &mut CandidateBudget, window: &mut Option<u64>) -> Option<RunOutcome> {
    if *window == Some(0) {
        return Some(RunOutcome::Paused);
    }
    if budget.enforce_quota && budget.remaining == 0 {
        return Some(RunOutcome::QuotaReached);
    }
    budget.remaining = budget.remaining.saturating_sub(1);
    if let Some(w) = window.as_mut() {
        *w -= 1;
    }
    None
}

/// Steps the counter formed by `order`, carrying into the next range on
/// wrap-around. Returns `false` once the carry runs off the end.
fn advance(chain: &mut ActiveChain, key: &mut TemplateKey, order: &[RangeId]) -> bool {
    for &id in order {
        let range = chain.get_mut(id);
        range.cursor += 1;
        let wrapped = range.cursor == range.len();
        if wrapped {
            range.cursor = 0;
        }
        write(key, chain.get(id));
        if !wrapped {
            return true;
        }
    }
    false
}
