//! Arc recall and attachment scores.

use crate::errors::Result;
use crate::oracle::DynamicOracle;
use crate::transition::StateArena;
use crate::types::{DepArc, GoldTree};
use serde::Serialize;

/// Number of gold arcs (head, modifier and label) present in `predicted`
pub fn recall_abs(gold: &[DepArc], predicted: &[DepArc]) -> usize {
    gold.iter().filter(|g| predicted.contains(g)).count()
}

/// Fraction of gold arcs present in `predicted`; 1.0 when there are none
pub fn recall_rel(gold: &[DepArc], predicted: &[DepArc]) -> f64 {
    if gold.is_empty() {
        return 1.0;
    }
    recall_abs(gold, predicted) as f64 / gold.len() as f64
}

/// Check that the oracle trajectory rebuilds every labeled gold arc.
///
/// Fails with `OracleExhausted` for trees the oracle cannot follow
/// (non-projective ones).
pub fn oracle_has_perfect_recall(gold: &GoldTree) -> Result<bool> {
    let mut arena = StateArena::new(gold.len());
    let init = arena.initial();
    let last = DynamicOracle::new(gold).trajectory(&mut arena, init)?;
    let gold_arcs = gold.arcs();
    Ok(recall_abs(&gold_arcs, &arena.arcs(last)) == gold_arcs.len())
}

/// Unlabeled and labeled attachment counts of a parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttachmentScores {
    pub total: usize,
    pub unlabeled: usize,
    pub labeled: usize,
}

impl AttachmentScores {
    /// Score `predicted` against `gold`; tokens with no predicted head count as wrong
    pub fn compute(gold: &GoldTree, predicted: &[DepArc]) -> Self {
        let mut scores = Self {
            total: gold.len(),
            ..Self::default()
        };
        for modifier in 1..=gold.len() {
            let Some(arc) = predicted.iter().find(|a| a.modifier == modifier) else {
                continue;
            };
            if gold.head_of(modifier) == Some(arc.head) {
                scores.unlabeled += 1;
                if gold.label_of(arc.head, modifier) == Some(arc.label) {
                    scores.labeled += 1;
                }
            }
        }
        scores
    }

    /// Fold another sentence's counts in
    pub fn add(&mut self, other: &AttachmentScores) {
        self.total += other.total;
        self.unlabeled += other.unlabeled;
        self.labeled += other.labeled;
    }

    pub fn uas(&self) -> f64 {
        ratio(self.unlabeled, self.total)
    }

    pub fn las(&self) -> f64 {
        ratio(self.labeled, self.total)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        1.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recall() {
        let gold = vec![DepArc::new(2, 1, 1), DepArc::new(0, 2, 2)];
        let pred = vec![DepArc::new(0, 2, 2), DepArc::new(0, 1, 1)];
        assert_eq!(recall_abs(&gold, &pred), 1);
        assert!((recall_rel(&gold, &pred) - 0.5).abs() < 1e-12);
        assert_eq!(recall_rel(&[], &pred), 1.0);
        // labels must match too
        assert_eq!(recall_abs(&gold, &[DepArc::new(2, 1, 9)]), 0);
    }

    #[test]
    fn test_oracle_recall_on_reference_sentence() {
        let gold = GoldTree::new(vec![2, 0, 2, 5, 2, 2], vec![3, 1, 4, 5, 4, 6]).unwrap();
        assert!(oracle_has_perfect_recall(&gold).unwrap());
    }

    #[test]
    fn test_oracle_recall_non_projective() {
        let gold = GoldTree::unlabeled(vec![0, 1, 1, 2]).unwrap();
        assert!(oracle_has_perfect_recall(&gold)
            .unwrap_err()
            .is_oracle_exhausted());
    }

    #[test]
    fn test_attachment_scores() {
        let gold = GoldTree::new(vec![2, 0, 2], vec![1, 2, 3]).unwrap();
        let pred = vec![
            DepArc::new(2, 1, 1), // right head and label
            DepArc::new(0, 2, 7), // right head, wrong label
            DepArc::new(1, 3, 3), // wrong head
        ];
        let scores = AttachmentScores::compute(&gold, &pred);
        assert_eq!(scores.total, 3);
        assert_eq!(scores.unlabeled, 2);
        assert_eq!(scores.labeled, 1);
        assert!((scores.uas() - 2.0 / 3.0).abs() < 1e-12);

        let mut total = scores;
        total.add(&AttachmentScores::compute(&gold, &[]));
        assert_eq!(total.total, 6);
        assert!((total.las() - 1.0 / 6.0).abs() < 1e-12);
    }
}
