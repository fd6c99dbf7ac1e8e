#![allow(dead_code)]

use maskforge::engine::RunOutcome;
use maskforge::{MaskOptions, MaskSession};

pub fn options(pattern: &str) -> MaskOptions {
    MaskOptions::builder().pattern(pattern).build()
}

/// Runs a pure-mode session to the end and returns every candidate.
pub fn collect(session: &mut MaskSession) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let outcome = session
        .run(&mut |c: &[u8]| {
            out.push(c.to_vec());
            false
        })
        .expect("run failed");
    assert!(matches!(
        outcome,
        RunOutcome::Exhausted | RunOutcome::QuotaReached
    ));
    out
}

pub fn generate(options: MaskOptions) -> Vec<Vec<u8>> {
    let mut session = MaskSession::new(options).expect("session init failed");
    collect(&mut session)
}

pub fn strings(candidates: &[Vec<u8>]) -> Vec<String> {
    candidates
        .iter()
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect()
}
