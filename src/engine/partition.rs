use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PartitionError;
use crate::mask::ActiveChain;

/// A contiguous run of nodes `min..=max` out of `count` cooperating nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSpec {
    pub min: u32,
    pub max: u32,
    pub count: u32,
}

impl NodeSpec {
    pub fn new(min: u32, max: u32, count: u32) -> Result<Self, PartitionError> {
        if min == 0 || min > max || max > count {
            return Err(PartitionError::InvalidNode(format!("{}-{}/{}", min, max, count)));
        }
        Ok(Self { min, max, count })
    }

    pub fn single(node: u32, count: u32) -> Result<Self, PartitionError> {
        Self::new(node, node, count)
    }

    pub fn width(&self) -> u32 {
        self.max - self.min + 1
    }
}

impl fmt::Display for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}/{}", self.min, self.count)
        } else {
            write!(f, "{}-{}/{}", self.min, self.max, self.count)
        }
    }
}

impl FromStr for NodeSpec {
    type Err = PartitionError;

    /// Parses `N/T` or `N-M/T`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PartitionError::InvalidNode(s.to_string());
        let (nodes, count) = s.trim().split_once('/').ok_or_else(invalid)?;
        let count: u32 = count.parse().map_err(|_| invalid())?;
        let (min, max) = match nodes.split_once('-') {
            Some((a, b)) => (
                a.parse().map_err(|_| invalid())?,
                b.parse().map_err(|_| invalid())?,
            ),
            None => {
                let n = nodes.parse().map_err(|_| invalid())?;
                (n, n)
            }
        };
        Self::new(min, max, count).map_err(|_| invalid())
    }
}

/// Worker `index` (0-based) of `parts` local threads sharing one node's slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerSlot {
    pub index: u32,
    pub parts: u32,
}

impl WorkerSlot {
    pub fn new(index: u32, parts: u32) -> Result<Self, PartitionError> {
        if index >= parts {
            return Err(PartitionError::InvalidNode(format!(
                "worker {} of {}",
                index + 1,
                parts
            )));
        }
        Ok(Self { index, parts })
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.parts
    }
}

impl fmt::Display for WorkerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}/{}", self.index + 1, self.parts)
    }
}

/// The slice of the global sequence a node range owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeShare {
    pub offset: u64,
    pub count: u64,
}

impl NodeShare {
    /// The piece of this share one local worker runs. Pieces are contiguous
    /// and the last worker takes the remainder, so together they cover the
    /// share exactly. A worker may get an empty piece when the share is
    /// smaller than the worker count.
    pub fn split(&self, worker: WorkerSlot) -> NodeShare {
        let unit = self.count / worker.parts as u64;
        let start = unit * worker.index as u64;
        let count = if worker.is_last() {
            self.count - start
        } else {
            unit
        };
        NodeShare {
            offset: self.offset + start,
            count,
        }
    }
}

/// Splits `total` candidates evenly; the last node also takes the remainder,
/// so the shares of all nodes add up to `total` exactly.
pub fn node_share(total: u64, node: NodeSpec) -> Result<NodeShare, PartitionError> {
    let unit = total / node.count as u64;
    let offset = unit * (node.min as u64 - 1);
    let count = if node.max == node.count {
        total - offset
    } else {
        unit * node.width() as u64
    };

    if count == 0 {
        return Err(PartitionError::NoWorkForNode {
            node_min: node.min,
            node_max: node.max,
            node_count: node.count,
            total,
        });
    }
    info!(
        "Node {}: {} of {} candidates starting at {}",
        node, count, total, offset
    );
    Ok(NodeShare { offset, count })
}

/// Points every chained range at candidate number `offset` by decoding it
/// in the chain's mixed radix.
pub fn seed_cursors(chain: &mut ActiveChain, offset: u64) {
    let order: Vec<_> = chain.iter().collect();
    let mut rest = offset;
    for id in order {
        let range = chain.get_mut(id);
        let radix = range.len() as u64;
        range.cursor = (rest % radix) as usize;
        rest /= radix;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::PositionRange;

    #[test]
    fn test_parse_node_spec() {
        assert_eq!("3/8".parse::<NodeSpec>().unwrap(), NodeSpec { min: 3, max: 3, count: 8 });
        assert_eq!("2-4/8".parse::<NodeSpec>().unwrap(), NodeSpec { min: 2, max: 4, count: 8 });
        assert!("0/8".parse::<NodeSpec>().is_err());
        assert!("5-4/8".parse::<NodeSpec>().is_err());
        assert!("9/8".parse::<NodeSpec>().is_err());
        assert!("x".parse::<NodeSpec>().is_err());
        assert_eq!(NodeSpec::new(2, 4, 8).unwrap().to_string(), "2-4/8");
    }

    #[test]
    fn test_shares_sum_to_total() {
        let total = 1003;
        let sum: u64 = (1..=7)
            .map(|n| node_share(total, NodeSpec::single(n, 7).unwrap()).unwrap().count)
            .sum();
        assert_eq!(sum, total);
        let last = node_share(total, NodeSpec::single(7, 7).unwrap()).unwrap();
        assert_eq!(last.offset, 143 * 6);
        assert_eq!(last.count, 1003 - 143 * 6);
    }

    #[test]
    fn test_no_work() {
        let err = node_share(3, NodeSpec::single(2, 5).unwrap()).unwrap_err();
        assert!(matches!(err, PartitionError::NoWorkForNode { node_min: 2, .. }));
        // The last node still gets the remainder.
        assert_eq!(node_share(3, NodeSpec::single(5, 5).unwrap()).unwrap().count, 3);
    }

    #[test]
    fn test_range_share_is_unit_times_width() {
        let range = node_share(23, NodeSpec::new(1, 2, 3).unwrap()).unwrap();
        assert_eq!(range, NodeShare { offset: 0, count: 14 });
        let last = node_share(23, NodeSpec::single(3, 3).unwrap()).unwrap();
        assert_eq!(range.offset + range.count, last.offset);
        assert_eq!(last.offset + last.count, 23);
    }

    #[test]
    fn test_worker_split_meets_next_node() {
        let first = node_share(23, NodeSpec::single(1, 2).unwrap()).unwrap();
        let second = node_share(23, NodeSpec::single(2, 2).unwrap()).unwrap();
        let pieces: Vec<_> = (0..3)
            .map(|i| first.split(WorkerSlot::new(i, 3).unwrap()))
            .collect();
        assert_eq!(
            pieces,
            vec![
                NodeShare { offset: 0, count: 3 },
                NodeShare { offset: 3, count: 3 },
                NodeShare { offset: 6, count: 5 },
            ]
        );
        let end = pieces.last().map(|p| p.offset + p.count);
        assert_eq!(end, Some(second.offset));
    }

    #[test]
    fn test_worker_split_of_tiny_share() {
        let share = NodeShare { offset: 10, count: 2 };
        let pieces: Vec<_> = (0..4)
            .map(|i| share.split(WorkerSlot::new(i, 4).unwrap()))
            .collect();
        assert!(pieces[..3].iter().all(|p| p.count == 0));
        assert_eq!(pieces[3], NodeShare { offset: 10, count: 2 });
        assert!(WorkerSlot::new(4, 4).is_err());
        assert!(WorkerSlot::new(0, 0).is_err());
    }

    #[test]
    fn test_seed_cursors_mixed_radix() {
        let ranges = vec![
            PositionRange::new(b"abc".to_vec()),
            PositionRange::new(b"0123".to_vec()),
        ];
        let mut chain = ActiveChain::new(ranges);
        seed_cursors(&mut chain, 7);
        let cursors: Vec<_> = chain.ranges().iter().map(|r| r.cursor).collect();
        assert_eq!(cursors, vec![1, 2]);
    }
}
