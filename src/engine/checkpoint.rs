use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{CandidateBudget, NodeSpec, WorkerSlot};
use crate::charset::Encoding;
use crate::error::{MaskError, MaskResult};
use crate::mask::ActiveChain;

/// Fingerprint of everything that shapes the candidate sequence. A record
/// only restores into a session with the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternId {
    pub hash: String,
}

impl PatternId {
    pub fn from_parts(
        normalized: &[u8],
        encoding: Encoding,
        case_sensitive: bool,
        node: Option<NodeSpec>,
        worker: Option<WorkerSlot>,
        internal_ranges: &[usize],
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalized);
        hasher.update([0u8]);
        hasher.update(encoding.to_string().as_bytes());
        hasher.update([case_sensitive as u8]);
        if let Some(node) = node {
            hasher.update(node.to_string().as_bytes());
        }
        if let Some(worker) = worker {
            hasher.update(worker.to_string().as_bytes());
        }
        for idx in internal_ranges {
            hasher.update((*idx as u64).to_le_bytes());
        }
        Self {
            hash: hex::encode(hasher.finalize()),
        }
    }
}

/// Length-iteration progress, present when a minimum length is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthState {
    pub current: usize,
    /// Candidates finished at lengths below `current`.
    pub done_before: u64,
}

/// Persisted odometer state. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub pattern_id: String,
    pub remaining: u64,
    pub range_count: u32,
    pub cursors: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<LengthState>,
}

impl CheckpointRecord {
    /// Snapshot between two candidates. Cursors name the next candidate.
    pub fn save(
        id: &PatternId,
        chain: &ActiveChain,
        budget: &CandidateBudget,
        length: Option<LengthState>,
    ) -> Self {
        Self {
            pattern_id: id.hash.clone(),
            remaining: budget.remaining,
            range_count: chain.len() as u32,
            cursors: chain.ranges().iter().map(|r| r.cursor as u32).collect(),
            length,
        }
    }

    /// Checks that the record belongs to this pattern and fits its ranges.
    pub fn verify(&self, id: &PatternId, chain: &ActiveChain) -> MaskResult<()> {
        if self.pattern_id != id.hash {
            return Err(MaskError::ChecksumMismatch(format!(
                "pattern fingerprint {} does not match {}",
                short(&self.pattern_id),
                short(&id.hash)
            )));
        }
        if self.range_count as usize != chain.len() || self.cursors.len() != chain.len() {
            return Err(MaskError::ChecksumMismatch(format!(
                "record has {} ranges, pattern compiles to {}",
                self.range_count,
                chain.len()
            )));
        }
        if let Some((i, (c, r))) = self
            .cursors
            .iter()
            .zip(chain.ranges())
            .enumerate()
            .find(|(_, (c, r))| **c as usize >= r.len())
        {
            return Err(MaskError::ChecksumMismatch(format!(
                "cursor {} of range {} is outside its {} members",
                c,
                i,
                r.len()
            )));
        }
        Ok(())
    }

    /// Writes the cursors back into a freshly compiled chain.
    pub fn restore(&self, id: &PatternId, chain: &mut ActiveChain) -> MaskResult<()> {
        self.verify(id, chain)?;
        for (range, &cursor) in chain.ranges_mut().iter_mut().zip(&self.cursors) {
            range.cursor = cursor as usize;
        }
        debug!("Restored {} cursors, {} remaining", self.cursors.len(), self.remaining);
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> MaskResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let record = serde_json::from_str(&content)?;
        info!("Loaded session from {}", path.as_ref().display());
        Ok(record)
    }

    /// Writes through a sibling temporary file and renames it into place, so
    /// an interrupted save never leaves a half-written session behind.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> MaskResult<()> {
        let path = path.as_ref();
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = Path::new(&tmp_name);

        let mut file = fs::File::create(tmp)?;
        file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(tmp, path)?;
        Ok(())
    }
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::PositionRange;
    use tempfile::tempdir;

    fn chain() -> ActiveChain {
        ActiveChain::new(vec![
            PositionRange::new(b"abc".to_vec()),
            PositionRange::new(b"xy".to_vec()),
        ])
    }

    fn id(text: &str) -> PatternId {
        PatternId::from_parts(text.as_bytes(), Encoding::Ascii, true, None, None, &[])
    }

    #[test]
    fn test_fingerprint_depends_on_inputs() {
        assert_eq!(id("?d"), id("?d"));
        assert_ne!(id("?d"), id("?l"));
        let node = NodeSpec::single(1, 2).ok();
        assert_ne!(
            id("?d"),
            PatternId::from_parts(b"?d", Encoding::Ascii, true, node, None, &[])
        );
        let worker = WorkerSlot::new(0, 2).ok();
        assert_ne!(
            PatternId::from_parts(b"?d", Encoding::Ascii, true, node, None, &[]),
            PatternId::from_parts(b"?d", Encoding::Ascii, true, node, worker, &[])
        );
    }

    #[test]
    fn test_restore_overwrites_cursors() {
        let mut source = chain();
        source.get_mut(crate::mask::RangeId(0)).cursor = 2;
        source.get_mut(crate::mask::RangeId(1)).cursor = 1;
        let budget = CandidateBudget::unpartitioned(6);
        let record = CheckpointRecord::save(&id("p"), &source, &budget, None);

        let mut target = chain();
        record.restore(&id("p"), &mut target).unwrap();
        assert_eq!(target, source);
    }

    #[test]
    fn test_restore_rejects_changed_pattern() {
        let record = CheckpointRecord::save(&id("p"), &chain(), &CandidateBudget::default(), None);
        let err = record.restore(&id("q"), &mut chain()).unwrap_err();
        assert!(matches!(err, MaskError::ChecksumMismatch(_)));

        let mut wrong = record.clone();
        wrong.range_count = 3;
        assert!(wrong.restore(&id("p"), &mut chain()).is_err());

        let mut wrong = record;
        wrong.cursors[1] = 2;
        assert!(wrong.restore(&id("p"), &mut chain()).is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.session");
        let record = CheckpointRecord {
            pattern_id: id("p").hash,
            remaining: 41,
            range_count: 2,
            cursors: vec![1, 0],
            length: Some(LengthState {
                current: 3,
                done_before: 702,
            }),
        };
        record.save_to_file(&path).unwrap();
        assert_eq!(CheckpointRecord::load_from_file(&path).unwrap(), record);
        assert!(!dir.path().join("run.session.tmp").exists());
    }

    #[test]
    fn test_field_order() {
        let record = CheckpointRecord::save(&id("p"), &chain(), &CandidateBudget::default(), None);
        let json = serde_json::to_string(&record).unwrap();
        let keys: Vec<_> = ["pattern_id", "remaining", "range_count", "cursors"]
            .iter()
            .map(|k| json.find(k).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(!json.contains("length"));
    }
}
