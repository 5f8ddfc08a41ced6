//! Eligibility and ordering policy for question selection

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Order in which eligible questions are handed out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrder {
    /// Insertion order of the question bank
    Stable,
    /// Fresh random order per attempt
    Shuffled,
}

/// Store-owned rules for building a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityPolicy {
    pub exclude_mastered: bool,
    pub order: SelectionOrder,
    /// Batch size when the caller gives no limit
    pub default_batch_size: u32,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            exclude_mastered: true,
            order: SelectionOrder::Shuffled,
            default_batch_size: 10,
        }
    }
}

impl EligibilityPolicy {
    /// Batch size for a request
    pub fn batch_size(&self, requested: Option<u32>) -> usize {
        requested.unwrap_or(self.default_batch_size) as usize
    }

    /// Order `candidates` and cut them down to `batch`
    pub fn arrange(&self, mut candidates: Vec<String>, batch: usize) -> Vec<String> {
        if self.order == SelectionOrder::Shuffled {
            candidates.shuffle(&mut rand::thread_rng());
        }
        candidates.truncate(batch);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("q{i}")).collect()
    }

    #[test]
    fn test_stable_keeps_order() {
        let policy = EligibilityPolicy {
            order: SelectionOrder::Stable,
            ..Default::default()
        };
        assert_eq!(policy.arrange(ids(5), 3), vec!["q0", "q1", "q2"]);
    }

    #[test]
    fn test_shuffled_keeps_members() {
        let policy = EligibilityPolicy::default();
        let mut picked = policy.arrange(ids(8), 8);
        picked.sort();
        let mut expected = ids(8);
        expected.sort();
        assert_eq!(picked, expected);
    }

    #[test]
    fn test_batch_size_defaults() {
        let policy = EligibilityPolicy::default();
        assert_eq!(policy.batch_size(None), 10);
        assert_eq!(policy.batch_size(Some(3)), 3);
    }
}
