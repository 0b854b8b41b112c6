//! Parser configurations stored in a per-sentence arena.
//!
//! A configuration only records its stack top, buffer cursor, the action
//! that produced it, and its parent. Stacks are persistent linked cells
//! shared between configurations; arcs and head assignments are recovered
//! by walking the parent chain.

use super::action::{Action, ActionType};
use crate::errors::{ParserError, Result};
use crate::types::{DepArc, LabelId};

/// Index of a configuration inside a [`StateArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigId(usize);

impl ConfigId {
    /// Position in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct StackCell {
    item: usize,
    below: Option<usize>,
}

/// One parser configuration
#[derive(Debug, Clone, Copy)]
pub struct Configuration {
    stack: usize,
    buffer: usize,
    action: Option<Action>,
    parent: Option<ConfigId>,
}

impl Configuration {
    /// Next unconsumed position (1-indexed; `n + 1` once exhausted)
    pub fn buffer(&self) -> usize {
        self.buffer
    }

    /// The action that produced this configuration (`None` for the initial one)
    pub fn action(&self) -> Option<Action> {
        self.action
    }

    /// The configuration this one was derived from
    pub fn parent(&self) -> Option<ConfigId> {
        self.parent
    }
}

/// Arena of configurations for one sentence.
///
/// The initial configuration (stack `[root]`, buffer 1) is created with the
/// arena and always has id 0.
#[derive(Debug, Clone)]
pub struct StateArena {
    sentence_len: usize,
    configs: Vec<Configuration>,
    cells: Vec<StackCell>,
}

impl StateArena {
    /// Create an arena for a sentence of `sentence_len` tokens
    pub fn new(sentence_len: usize) -> Self {
        Self {
            sentence_len,
            configs: vec![Configuration {
                stack: 0,
                buffer: 1,
                action: None,
                parent: None,
            }],
            cells: vec![StackCell {
                item: 0,
                below: None,
            }],
        }
    }

    /// The initial configuration
    pub fn initial(&self) -> ConfigId {
        ConfigId(0)
    }

    /// Number of tokens in the sentence
    pub fn sentence_len(&self) -> usize {
        self.sentence_len
    }

    /// Number of configurations allocated so far
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Always false: the initial configuration exists from the start
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Look up a configuration
    pub fn get(&self, id: ConfigId) -> &Configuration {
        &self.configs[id.0]
    }

    /// Buffer cursor of a configuration
    pub fn buffer(&self, id: ConfigId) -> usize {
        self.configs[id.0].buffer
    }

    /// Top of the stack (0 is the root)
    pub fn stack_top(&self, id: ConfigId) -> usize {
        self.cells[self.configs[id.0].stack].item
    }

    /// Stack items from top to bottom
    pub fn stack_iter(&self, id: ConfigId) -> StackIter<'_> {
        StackIter {
            cells: &self.cells,
            cur: Some(self.configs[id.0].stack),
        }
    }

    /// Stack contents, bottom (root) first
    pub fn stack(&self, id: ConfigId) -> Vec<usize> {
        let mut items: Vec<usize> = self.stack_iter(id).collect();
        items.reverse();
        items
    }

    /// Number of items on the stack, including the root
    pub fn stack_depth(&self, id: ConfigId) -> usize {
        self.stack_iter(id).count()
    }

    /// Final iff only the root is left and the buffer is exhausted
    pub fn is_final(&self, id: ConfigId) -> bool {
        let cfg = &self.configs[id.0];
        self.cells[cfg.stack].below.is_none() && cfg.buffer > self.sentence_len
    }

    /// Walk from `id` back to the initial configuration
    pub fn ancestors(&self, id: ConfigId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            cur: Some(id),
        }
    }

    /// Head assigned to `token` by an arc in the history of `id`
    pub fn head_of(&self, id: ConfigId, token: usize) -> Option<usize> {
        self.ancestors(id)
            .filter_map(|c| self.configs[c.0].action)
            .find_map(|a| match a {
                Action::Arc { head, modifier, .. } if modifier == token => Some(head),
                _ => None,
            })
    }

    /// Check if `token` already received a head
    pub fn has_head(&self, id: ConfigId, token: usize) -> bool {
        self.head_of(id, token).is_some()
    }

    /// Check whether `action` may be applied to `id`
    pub fn is_legal(&self, id: ConfigId, action: ActionType) -> bool {
        let buffer = self.buffer(id);
        match action {
            ActionType::Shift | ActionType::ArcRight => buffer <= self.sentence_len,
            ActionType::Reduce => {
                let top = self.stack_top(id);
                top != 0 && self.has_head(id, top)
            }
            ActionType::ArcLeft => {
                let top = self.stack_top(id);
                top != 0 && !self.has_head(id, top)
            }
        }
    }

    /// Legal action types, in [`ActionType::PRIORITY`] order
    pub fn legal_actions(&self, id: ConfigId) -> Vec<ActionType> {
        ActionType::PRIORITY
            .iter()
            .copied()
            .filter(|&a| self.is_legal(id, a))
            .collect()
    }

    /// Apply a transition, allocating the successor configuration.
    ///
    /// `label` is only used by arc actions. Fails with
    /// [`ParserError::IllegalTransition`] when the action is not legal.
    pub fn apply(&mut self, id: ConfigId, action: ActionType, label: LabelId) -> Result<ConfigId> {
        if !self.is_legal(id, action) {
            return Err(ParserError::illegal_transition(
                action,
                self.stack_top(id),
                self.buffer(id),
            ));
        }

        let cfg = self.configs[id.0];
        let top_cell = self.cells[cfg.stack];
        let (stack, buffer, applied) = match action {
            ActionType::Shift => (self.push(cfg.stack, cfg.buffer), cfg.buffer + 1, Action::Shift),
            ActionType::Reduce => (Self::below(top_cell)?, cfg.buffer, Action::Reduce),
            ActionType::ArcLeft => (
                Self::below(top_cell)?,
                cfg.buffer,
                Action::arc(cfg.buffer, top_cell.item, label),
            ),
            ActionType::ArcRight => (
                self.push(cfg.stack, cfg.buffer),
                cfg.buffer + 1,
                Action::arc(top_cell.item, cfg.buffer, label),
            ),
        };

        let next = ConfigId(self.configs.len());
        self.configs.push(Configuration {
            stack,
            buffer,
            action: Some(applied),
            parent: Some(id),
        });
        Ok(next)
    }

    /// Actions from the initial configuration up to `id`, oldest first
    pub fn history(&self, id: ConfigId) -> Vec<Action> {
        let mut actions: Vec<Action> = self
            .ancestors(id)
            .filter_map(|c| self.configs[c.0].action)
            .collect();
        actions.reverse();
        actions
    }

    /// Arcs created on the way to `id`, oldest first
    pub fn arcs(&self, id: ConfigId) -> Vec<DepArc> {
        let mut arcs: Vec<DepArc> = self
            .ancestors(id)
            .filter_map(|c| self.configs[c.0].action)
            .filter_map(|a| a.dep_arc())
            .collect();
        arcs.reverse();
        arcs
    }

    /// Configurations from the initial one to `id`, inclusive
    pub fn path(&self, id: ConfigId) -> Vec<ConfigId> {
        let mut path: Vec<ConfigId> = self.ancestors(id).collect();
        path.reverse();
        path
    }

    fn push(&mut self, stack: usize, item: usize) -> usize {
        self.cells.push(StackCell {
            item,
            below: Some(stack),
        });
        self.cells.len() - 1
    }

    fn below(cell: StackCell) -> Result<usize> {
        cell.below
            .ok_or_else(|| ParserError::internal("attempted to pop the root off the stack"))
    }
}

/// Iterator over stack items, top first
#[derive(Debug, Clone)]
pub struct StackIter<'a> {
    cells: &'a [StackCell],
    cur: Option<usize>,
}

impl Iterator for StackIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let cell = self.cells[self.cur?];
        self.cur = cell.below;
        Some(cell.item)
    }
}

/// Iterator over a configuration and its predecessors
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    arena: &'a StateArena,
    cur: Option<ConfigId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ConfigId;

    fn next(&mut self) -> Option<ConfigId> {
        let id = self.cur?;
        self.cur = self.arena.configs[id.0].parent;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_configuration() {
        let arena = StateArena::new(3);
        let init = arena.initial();
        assert_eq!(arena.stack(init), vec![0]);
        assert_eq!(arena.buffer(init), 1);
        assert!(!arena.is_final(init));
        assert_eq!(
            arena.legal_actions(init),
            vec![ActionType::ArcRight, ActionType::Shift]
        );
    }

    #[test]
    fn test_empty_sentence_is_final() {
        let arena = StateArena::new(0);
        assert!(arena.is_final(arena.initial()));
        assert!(arena.legal_actions(arena.initial()).is_empty());
    }

    #[test]
    fn test_shift_and_arcs() {
        let mut arena = StateArena::new(3);
        let s1 = arena.apply(arena.initial(), ActionType::Shift, 0).unwrap();
        assert_eq!(arena.stack(s1), vec![0, 1]);
        assert_eq!(arena.buffer(s1), 2);

        // 2 -> 1
        let s2 = arena.apply(s1, ActionType::ArcLeft, 4).unwrap();
        assert_eq!(arena.stack(s2), vec![0]);
        assert_eq!(arena.buffer(s2), 2);
        assert_eq!(arena.head_of(s2, 1), Some(2));

        // 0 -> 2
        let s3 = arena.apply(s2, ActionType::ArcRight, 1).unwrap();
        assert_eq!(arena.stack(s3), vec![0, 2]);
        assert!(arena.is_legal(s3, ActionType::Reduce));
        assert!(!arena.is_legal(s3, ActionType::ArcLeft));

        assert_eq!(
            arena.arcs(s3),
            vec![DepArc::new(2, 1, 4), DepArc::new(0, 2, 1)]
        );
        assert_eq!(
            arena.history(s3),
            vec![Action::Shift, Action::arc(2, 1, 4), Action::arc(0, 2, 1)]
        );
        assert_eq!(arena.path(s3), vec![arena.initial(), s1, s2, s3]);
    }

    #[test]
    fn test_illegal_transitions_fail_fast() {
        let mut arena = StateArena::new(2);
        let init = arena.initial();
        let err = arena.apply(init, ActionType::Reduce, 0).unwrap_err();
        assert!(err.is_illegal_transition());
        assert!(arena.apply(init, ActionType::ArcLeft, 0).is_err());

        // Reduce on a headless token
        let s1 = arena.apply(init, ActionType::Shift, 0).unwrap();
        assert!(arena.apply(s1, ActionType::Reduce, 0).is_err());
        // no configuration was allocated for the failed attempts
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_arc_left_on_exhausted_buffer() {
        let mut arena = StateArena::new(1);
        let s1 = arena.apply(arena.initial(), ActionType::Shift, 0).unwrap();
        assert!(!arena.is_legal(s1, ActionType::Shift));
        assert_eq!(arena.legal_actions(s1), vec![ActionType::ArcLeft]);
        let s2 = arena.apply(s1, ActionType::ArcLeft, 0).unwrap();
        assert!(arena.is_final(s2));
        assert_eq!(arena.arcs(s2), vec![DepArc::new(2, 1, 0)]);
    }

    #[test]
    fn test_stacks_are_shared_not_mutated() {
        let mut arena = StateArena::new(3);
        let s1 = arena.apply(arena.initial(), ActionType::Shift, 0).unwrap();
        let a = arena.apply(s1, ActionType::Shift, 0).unwrap();
        let b = arena.apply(s1, ActionType::ArcLeft, 0).unwrap();
        assert_eq!(arena.stack(s1), vec![0, 1]);
        assert_eq!(arena.stack(a), vec![0, 1, 2]);
        assert_eq!(arena.stack(b), vec![0]);
        assert_eq!(arena.stack_depth(a), 3);
        assert_eq!(arena.stack_iter(a).collect::<Vec<_>>(), vec![2, 1, 0]);
    }
}
