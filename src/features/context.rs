//! Positions and token values a configuration exposes to the templates.
//!
//! Everything here is derived from the stack top, the buffer cursor and one
//! linear scan of the arc history.

use crate::transition::{ConfigId, StateArena};
use crate::types::Sentence;

/// Feature value for a missing position (no head, no such child)
pub const NONE_VALUE: i64 = -1;
/// Feature value for the artificial root (position 0)
pub const ROOT_VALUE: i64 = -2;
/// Feature value for positions past the end of the sentence
pub const END_VALUE: i64 = -3;

/// Structural neighbourhood of the stack top (`s0`) and buffer front (`n0`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateContext {
    pub s0: usize,
    pub n0: usize,
    /// Governor of `s0` and the governor's governor
    pub s0_head: Option<usize>,
    pub s0_head2: Option<usize>,
    /// Leftmost and second-leftmost left dependents of `s0`
    pub s0_left: Option<usize>,
    pub s0_left2: Option<usize>,
    /// Rightmost and second-rightmost right dependents of `s0`
    pub s0_right: Option<usize>,
    pub s0_right2: Option<usize>,
    /// Leftmost and second-leftmost dependents of `n0`
    pub n0_left: Option<usize>,
    pub n0_left2: Option<usize>,
    pub s0_left_valency: usize,
    pub s0_right_valency: usize,
    pub n0_left_valency: usize,
}

impl StateContext {
    /// Scan the arc history of `id`
    pub fn new(arena: &StateArena, id: ConfigId) -> Self {
        let s0 = arena.stack_top(id);
        let n0 = arena.buffer(id);
        let arcs = arena.arcs(id);

        let head_of = |token: usize| arcs.iter().find(|a| a.modifier == token).map(|a| a.head);
        let s0_head = if s0 == 0 { None } else { head_of(s0) };
        let s0_head2 = s0_head.filter(|&h| h != 0).and_then(head_of);

        let mut s0_lefts = Vec::new();
        let mut s0_rights = Vec::new();
        let mut n0_lefts = Vec::new();
        for arc in &arcs {
            if arc.head == s0 {
                if arc.modifier < s0 {
                    s0_lefts.push(arc.modifier);
                } else {
                    s0_rights.push(arc.modifier);
                }
            } else if arc.head == n0 && arc.modifier < n0 {
                n0_lefts.push(arc.modifier);
            }
        }
        s0_lefts.sort_unstable();
        s0_rights.sort_unstable_by(|a, b| b.cmp(a));
        n0_lefts.sort_unstable();

        Self {
            s0,
            n0,
            s0_head,
            s0_head2,
            s0_left: s0_lefts.first().copied(),
            s0_left2: s0_lefts.get(1).copied(),
            s0_right: s0_rights.first().copied(),
            s0_right2: s0_rights.get(1).copied(),
            n0_left: n0_lefts.first().copied(),
            n0_left2: n0_lefts.get(1).copied(),
            s0_left_valency: s0_lefts.len(),
            s0_right_valency: s0_rights.len(),
            n0_left_valency: n0_lefts.len(),
        }
    }

    /// Bucketed `n0 - s0` gap
    pub fn distance(&self) -> i64 {
        match self.n0.saturating_sub(self.s0) {
            d @ 0..=4 => d as i64,
            5..=9 => 5,
            _ => 6,
        }
    }
}

/// Word/POS lookup with sentinels for root, end and missing positions
#[derive(Debug, Clone, Copy)]
pub struct TokenView<'a> {
    sentence: &'a Sentence,
}

impl<'a> TokenView<'a> {
    pub fn new(sentence: &'a Sentence) -> Self {
        Self { sentence }
    }

    /// Word id at a 1-indexed position
    pub fn word(&self, position: impl Into<Option<usize>>) -> i64 {
        self.lookup(self.sentence.words(), position.into())
    }

    /// POS id at a 1-indexed position
    pub fn tag(&self, position: impl Into<Option<usize>>) -> i64 {
        self.lookup(self.sentence.pos(), position.into())
    }

    fn lookup(&self, values: &[u32], position: Option<usize>) -> i64 {
        match position {
            None => NONE_VALUE,
            Some(0) => ROOT_VALUE,
            Some(p) => values.get(p - 1).map_or(END_VALUE, |&v| v as i64),
        }
    }
}
