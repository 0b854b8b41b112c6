//! Goldberg & Nivre (2012) dynamic oracle for the arc-eager system.
//!
//! For any configuration (on the gold path or not) the oracle counts, per
//! action, how many gold arcs would become unreachable if that action were
//! taken. Following zero-cost actions in the fixed order
//! ArcLeft > ArcRight > Reduce > Shift yields a canonical trajectory that
//! rebuilds every gold arc of a projective tree.

use crate::errors::{ParserError, Result};
use crate::transition::{ActionType, ConfigId, StateArena};
use crate::types::{GoldTree, LabelId, DEFAULT_LABEL};

/// Per-action costs; `None` marks an illegal action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionCosts {
    pub arc_left: Option<usize>,
    pub arc_right: Option<usize>,
    pub reduce: Option<usize>,
    pub shift: Option<usize>,
}

impl ActionCosts {
    /// Cost of one action
    pub fn get(&self, action: ActionType) -> Option<usize> {
        match action {
            ActionType::ArcLeft => self.arc_left,
            ActionType::ArcRight => self.arc_right,
            ActionType::Reduce => self.reduce,
            ActionType::Shift => self.shift,
        }
    }

    /// `[arcLeft, arcRight, reduce, shift]` with -1 for illegal actions
    pub fn to_signed(&self) -> [i64; 4] {
        ActionType::PRIORITY.map(|a| self.get(a).map_or(-1, |c| c as i64))
    }

    /// First zero-cost action in priority order
    pub fn zero_cost_action(&self) -> Option<ActionType> {
        ActionType::PRIORITY
            .iter()
            .copied()
            .find(|&a| self.get(a) == Some(0))
    }
}

/// Dynamic oracle for one gold tree
#[derive(Debug, Clone, Copy)]
pub struct DynamicOracle<'a> {
    gold: &'a GoldTree,
}

impl<'a> DynamicOracle<'a> {
    /// Create an oracle for a gold tree
    pub fn new(gold: &'a GoldTree) -> Self {
        Self { gold }
    }

    /// Cost of every action at configuration `id`
    pub fn costs(&self, arena: &StateArena, id: ConfigId) -> ActionCosts {
        let top = arena.stack_top(id);
        let buffer = arena.buffer(id);
        let on_stack = |token: usize| arena.stack_iter(id).any(|item| item == token);
        let below_top = |token: usize| arena.stack_iter(id).skip(1).any(|item| item == token);
        let count = |unreachable: &dyn Fn(usize, usize) -> bool| {
            self.gold
                .heads()
                .iter()
                .enumerate()
                .filter(|&(i, &h)| unreachable(h, i + 1))
                .count()
        };

        let legal = |a: ActionType| arena.is_legal(id, a);

        ActionCosts {
            arc_left: legal(ActionType::ArcLeft).then(|| {
                count(&|h, m| (top == h && m > buffer) || (top == m && h > buffer))
            }),
            arc_right: legal(ActionType::ArcRight).then(|| {
                count(&|h, m| {
                    (m == buffer && (h > buffer || below_top(h))) || (h == buffer && below_top(m))
                })
            }),
            reduce: legal(ActionType::Reduce).then(|| count(&|h, m| h == top && m >= buffer)),
            shift: legal(ActionType::Shift).then(|| {
                count(&|h, m| (m == buffer && on_stack(h)) || (h == buffer && on_stack(m)))
            }),
        }
    }

    /// The canonical next action at `id` and the label it should carry.
    ///
    /// `step` is only used for error reporting.
    pub fn next_action(
        &self,
        arena: &StateArena,
        id: ConfigId,
        step: usize,
    ) -> Result<(ActionType, LabelId)> {
        let costs = self.costs(arena, id);
        let top = arena.stack_top(id);
        let buffer = arena.buffer(id);
        let Some(action) = costs.zero_cost_action() else {
            trace_warn!(step, top, buffer, "oracle exhausted");
            return Err(ParserError::oracle_exhausted(step, top, buffer));
        };
        let label = match action {
            ActionType::ArcLeft => self.gold.label_of(buffer, top),
            ActionType::ArcRight => self.gold.label_of(top, buffer),
            _ => None,
        };
        Ok((action, label.unwrap_or(DEFAULT_LABEL)))
    }

    /// Follow zero-cost actions from `from` until a final configuration.
    ///
    /// Takes at most `2n` steps for a sentence of `n` tokens.
    pub fn trajectory(&self, arena: &mut StateArena, from: ConfigId) -> Result<ConfigId> {
        let max_steps = 2 * arena.sentence_len();
        let mut cur = from;
        let mut step = 0;
        while !arena.is_final(cur) {
            if step >= max_steps {
                return Err(ParserError::internal(format!(
                    "oracle trajectory did not terminate within {} steps",
                    max_steps
                )));
            }
            let (action, label) = self.next_action(arena, cur, step)?;
            cur = arena.apply(cur, action, label)?;
            step += 1;
        }
        Ok(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DepArc;

    fn example_tree() -> GoldTree {
        // He wrote her a letter .
        GoldTree::new(vec![2, 0, 2, 5, 2, 2], vec![1, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn test_reference_sentence_perfect_recall() {
        let gold = example_tree();
        let mut arena = StateArena::new(gold.len());
        let init = arena.initial();
        let last = DynamicOracle::new(&gold)
            .trajectory(&mut arena, init)
            .unwrap();

        let mut predicted = arena.arcs(last);
        predicted.sort_by_key(|a| a.modifier);
        assert_eq!(predicted, gold.arcs());
        assert_eq!(arena.history(last).len(), 2 * gold.len());
    }

    #[test]
    fn test_initial_costs() {
        let gold = example_tree();
        let arena = StateArena::new(gold.len());
        let costs = DynamicOracle::new(&gold).costs(&arena, arena.initial());
        assert_eq!(costs.arc_left, None);
        assert_eq!(costs.reduce, None);
        // 0 -> 1 is not gold, and 1 <- 2 needs token 1 on the stack
        assert_eq!(costs.arc_right, Some(1));
        assert_eq!(costs.shift, Some(0));
        assert_eq!(costs.to_signed(), [-1, 1, -1, 0]);
        assert_eq!(costs.zero_cost_action(), Some(ActionType::Shift));
    }

    #[test]
    fn test_costs_off_the_gold_path() {
        let gold = example_tree();
        let mut arena = StateArena::new(gold.len());
        // wrong: attach "He" directly to the root
        let s1 = arena
            .apply(arena.initial(), ActionType::ArcRight, 0)
            .unwrap();
        let oracle = DynamicOracle::new(&gold);
        let costs = oracle.costs(&arena, s1);
        // all other gold arcs are still reachable
        assert_eq!(costs.reduce, Some(0));
        let last = oracle.trajectory(&mut arena, s1).unwrap();
        let arcs = arena.arcs(last);
        let gold_arcs = gold.arcs();
        let correct = arcs
            .iter()
            .filter(|a| gold_arcs.iter().any(|g| g.same_attachment(a)))
            .count();
        // only the arc for token 1 (and hence the root arc of 2) can be lost
        assert!(correct >= gold.len() - 2);
    }

    #[test]
    fn test_gold_labels_on_oracle_arcs() {
        let gold = example_tree();
        let mut arena = StateArena::new(gold.len());
        let init = arena.initial();
        let last = DynamicOracle::new(&gold)
            .trajectory(&mut arena, init)
            .unwrap();
        for arc in arena.arcs(last) {
            assert_eq!(gold.label_of(arc.head, arc.modifier), Some(arc.label));
        }
    }

    #[test]
    fn test_non_projective_tree_exhausts_oracle() {
        // 1 -> 3 crosses 2 -> 4
        let gold = GoldTree::unlabeled(vec![0, 1, 1, 2]).unwrap();
        let mut arena = StateArena::new(gold.len());
        let init = arena.initial();
        let err = DynamicOracle::new(&gold)
            .trajectory(&mut arena, init)
            .unwrap_err();
        assert!(err.is_oracle_exhausted());
    }

    #[test]
    fn test_single_token() {
        let gold = GoldTree::unlabeled(vec![0]).unwrap();
        let mut arena = StateArena::new(1);
        let init = arena.initial();
        let last = DynamicOracle::new(&gold)
            .trajectory(&mut arena, init)
            .unwrap();
        assert_eq!(arena.arcs(last), vec![DepArc::new(0, 1, 0)]);
    }
}
