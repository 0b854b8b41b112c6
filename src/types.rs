//! Core types for arceager
//!
//! This module defines the data the parser core consumes and produces:
//! string interning, integer-coded sentences, gold trees, dependency arcs,
//! and the parser configuration.

use crate::errors::{ParserError, Result};
use crate::features::TemplateGroup;
use crate::transition::action::{MAX_LABEL, MAX_POSITION};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Interned id of a word form or POS tag
pub type TokenId = u32;

/// Interned id of a dependency label
pub type LabelId = u32;

/// Label attached to arcs whose label is not predicted
pub const DEFAULT_LABEL: LabelId = 0;

// ============================================================================
// Alphabet
// ============================================================================

/// A bidirectional string <-> id table.
///
/// Ids are dense and assigned in first-seen order, so the same alphabet can
/// intern words, POS tags and labels for a whole corpus.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Alphabet {
    /// Maps strings to their interned IDs
    string_to_id: FxHashMap<String, TokenId>,
    /// Maps IDs back to strings
    id_to_string: Vec<String>,
}

impl Alphabet {
    /// Create a new empty alphabet
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an alphabet with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            string_to_id: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            id_to_string: Vec::with_capacity(capacity),
        }
    }

    /// Intern a string, returning its ID
    pub fn intern(&mut self, s: &str) -> TokenId {
        if let Some(&id) = self.string_to_id.get(s) {
            return id;
        }

        let id = self.id_to_string.len() as TokenId;
        self.string_to_id.insert(s.to_string(), id);
        self.id_to_string.push(s.to_string());
        id
    }

    /// Intern every string of a sequence
    pub fn intern_all<S: AsRef<str>>(&mut self, items: &[S]) -> Vec<TokenId> {
        items.iter().map(|s| self.intern(s.as_ref())).collect()
    }

    /// Get a string by its ID
    pub fn lookup(&self, id: TokenId) -> Option<&str> {
        self.id_to_string.get(id as usize).map(String::as_str)
    }

    /// Get the ID of a string without interning it
    pub fn get(&self, s: &str) -> Option<TokenId> {
        self.string_to_id.get(s).copied()
    }

    /// Number of distinct strings
    pub fn len(&self) -> usize {
        self.id_to_string.len()
    }

    /// Check if the alphabet is empty
    pub fn is_empty(&self) -> bool {
        self.id_to_string.is_empty()
    }
}

// ============================================================================
// Sentence
// ============================================================================

/// An integer-coded sentence: parallel word and POS arrays.
///
/// Token `i` of the arrays is position `i + 1` in the transition system;
/// position 0 is the artificial root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SentenceParts")]
pub struct Sentence {
    words: Vec<TokenId>,
    pos: Vec<TokenId>,
}

#[derive(Deserialize)]
struct SentenceParts {
    words: Vec<TokenId>,
    pos: Vec<TokenId>,
}

impl TryFrom<SentenceParts> for Sentence {
    type Error = ParserError;

    fn try_from(parts: SentenceParts) -> Result<Self> {
        Self::new(parts.words, parts.pos)
    }
}

impl Sentence {
    /// Create a sentence, checking that both arrays have the same length
    pub fn new(words: Vec<TokenId>, pos: Vec<TokenId>) -> Result<Self> {
        if words.len() != pos.len() {
            return Err(ParserError::invalid_sentence(format!(
                "{} words but {} POS tags",
                words.len(),
                pos.len()
            )));
        }
        // n + 1 must still fit in the packed action head field
        if words.len() >= MAX_POSITION {
            return Err(ParserError::invalid_sentence(format!(
                "sentence length {} exceeds the maximum of {}",
                words.len(),
                MAX_POSITION - 1
            )));
        }
        Ok(Self { words, pos })
    }

    /// Number of tokens (excluding the root)
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the sentence has no tokens
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word ids, 0-indexed
    pub fn words(&self) -> &[TokenId] {
        &self.words
    }

    /// POS ids, 0-indexed
    pub fn pos(&self) -> &[TokenId] {
        &self.pos
    }
}

// ============================================================================
// Dependency arcs and gold trees
// ============================================================================

/// A labeled dependency arc between 1-indexed positions (0 = root)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepArc {
    pub head: usize,
    pub modifier: usize,
    pub label: LabelId,
}

impl DepArc {
    /// Create a new arc
    pub fn new(head: usize, modifier: usize, label: LabelId) -> Self {
        Self {
            head,
            modifier,
            label,
        }
    }

    /// True when the head is to the right of the modifier
    pub fn is_left(&self) -> bool {
        self.head > self.modifier
    }

    /// Check if two arcs connect the same tokens, ignoring labels
    pub fn same_attachment(&self, other: &DepArc) -> bool {
        self.head == other.head && self.modifier == other.modifier
    }
}

impl fmt::Display for DepArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} -> {})", self.label, self.head, self.modifier)
    }
}

/// A gold dependency tree.
///
/// `heads[i]` is the 1-indexed head of token `i + 1` (0 = root) and
/// `deprels[i]` its label. Construction checks that the arrays describe a
/// single-rooted tree; projectivity is left to the caller, see
/// [`GoldTree::is_projective`]. Deserialization runs the same checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GoldTreeParts")]
pub struct GoldTree {
    heads: Vec<usize>,
    deprels: Vec<LabelId>,
}

#[derive(Deserialize)]
struct GoldTreeParts {
    heads: Vec<usize>,
    deprels: Vec<LabelId>,
}

impl TryFrom<GoldTreeParts> for GoldTree {
    type Error = ParserError;

    fn try_from(parts: GoldTreeParts) -> Result<Self> {
        Self::new(parts.heads, parts.deprels)
    }
}

impl GoldTree {
    /// Create a gold tree and validate its shape
    pub fn new(heads: Vec<usize>, deprels: Vec<LabelId>) -> Result<Self> {
        let n = heads.len();
        if deprels.len() != n {
            return Err(ParserError::invalid_tree(format!(
                "{} heads but {} labels",
                n,
                deprels.len()
            )));
        }
        if n >= MAX_POSITION {
            return Err(ParserError::invalid_tree(format!(
                "tree of {} tokens is too large",
                n
            )));
        }

        let mut roots = 0;
        for (i, &h) in heads.iter().enumerate() {
            let m = i + 1;
            if h > n {
                return Err(ParserError::invalid_tree(format!(
                    "head {} of token {} is out of range",
                    h, m
                )));
            }
            if h == m {
                return Err(ParserError::invalid_tree(format!("token {} heads itself", m)));
            }
            if h == 0 {
                roots += 1;
            }
        }
        if let Some(&label) = deprels.iter().find(|&&l| l > MAX_LABEL) {
            return Err(ParserError::invalid_tree(format!(
                "label {} exceeds the maximum of {}",
                label, MAX_LABEL
            )));
        }
        if n > 0 && roots != 1 {
            return Err(ParserError::invalid_tree(format!(
                "expected exactly one root, found {}",
                roots
            )));
        }

        // Every token must reach the root in at most n hops.
        for start in 1..=n {
            let mut cur = start;
            let mut hops = 0;
            while cur != 0 {
                cur = heads[cur - 1];
                hops += 1;
                if hops > n {
                    return Err(ParserError::invalid_tree(format!(
                        "token {} is on a cycle",
                        start
                    )));
                }
            }
        }

        Ok(Self { heads, deprels })
    }

    /// Build an unlabeled tree (all labels = [`DEFAULT_LABEL`])
    pub fn unlabeled(heads: Vec<usize>) -> Result<Self> {
        let deprels = vec![DEFAULT_LABEL; heads.len()];
        Self::new(heads, deprels)
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    /// Check if the tree has no tokens
    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// 1-indexed heads (0 = root), one per token
    pub fn heads(&self) -> &[usize] {
        &self.heads
    }

    /// Labels, one per token
    pub fn deprels(&self) -> &[LabelId] {
        &self.deprels
    }

    /// Head of a 1-indexed token
    pub fn head_of(&self, modifier: usize) -> Option<usize> {
        modifier
            .checked_sub(1)
            .and_then(|i| self.heads.get(i))
            .copied()
    }

    /// Label of the gold arc `head -> modifier`, if that arc is in the tree
    pub fn label_of(&self, head: usize, modifier: usize) -> Option<LabelId> {
        match self.head_of(modifier) {
            Some(h) if h == head => Some(self.deprels[modifier - 1]),
            _ => None,
        }
    }

    /// The gold arc set, ordered by modifier
    pub fn arcs(&self) -> Vec<DepArc> {
        self.heads
            .iter()
            .zip(&self.deprels)
            .enumerate()
            .map(|(i, (&h, &l))| DepArc::new(h, i + 1, l))
            .collect()
    }

    /// Pairs of arcs that cross each other (both endpoints treated as a span)
    pub fn crossing_arcs(&self) -> Vec<(DepArc, DepArc)> {
        let arcs = self.arcs();
        let span = |a: &DepArc| (a.head.min(a.modifier), a.head.max(a.modifier));
        let mut crossing = Vec::new();
        for (i, a) in arcs.iter().enumerate() {
            let (a_lo, a_hi) = span(a);
            for b in &arcs[i + 1..] {
                let (b_lo, b_hi) = span(b);
                let crosses = (a_lo < b_lo && b_lo < a_hi && a_hi < b_hi)
                    || (b_lo < a_lo && a_lo < b_hi && b_hi < a_hi);
                if crosses {
                    crossing.push((*a, *b));
                }
            }
        }
        crossing
    }

    /// True when no two arcs cross; the oracle requires this
    pub fn is_projective(&self) -> bool {
        self.crossing_arcs().is_empty()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// How many configurations the last trellis level keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalBeam {
    /// Keep exactly one final configuration; Z is its forward value
    #[default]
    Collapse,
    /// Keep the top-B final configurations; Z is their log-sum-exp and
    /// decoding picks the maximum
    KeepAll,
}

/// Configuration for parsing and training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Size of the hashed weight table
    pub feature_dim: usize,
    /// Number of configurations kept per trellis level
    pub beam_width: usize,
    /// Added under the square root of the adaptive step
    pub adagrad_epsilon: f64,
    /// Step size of the adaptive update
    pub learning_rate: f64,
    /// Width of the last trellis level
    #[serde(default)]
    pub final_beam: FinalBeam,
    /// Feature template groups to extract
    #[serde(default = "default_templates")]
    pub templates: Vec<TemplateGroup>,
}

fn default_templates() -> Vec<TemplateGroup> {
    TemplateGroup::ALL.to_vec()
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            feature_dim: 1 << 20,
            beam_width: 32,
            adagrad_epsilon: 1e-8,
            learning_rate: 0.1,
            final_beam: FinalBeam::Collapse,
            templates: default_templates(),
        }
    }
}

impl ParserConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON config; missing optional fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.feature_dim == 0 {
            return Err(ParserError::invalid_config("feature_dim must be > 0"));
        }

        if self.beam_width == 0 {
            return Err(ParserError::invalid_config("beam_width must be > 0"));
        }

        if !self.adagrad_epsilon.is_finite() || self.adagrad_epsilon <= 0.0 {
            return Err(ParserError::invalid_config(format!(
                "adagrad_epsilon must be finite and > 0, got {}",
                self.adagrad_epsilon
            )));
        }

        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ParserError::invalid_config(format!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }

        if self.templates.is_empty() {
            return Err(ParserError::invalid_config(
                "at least one template group is required",
            ));
        }

        Ok(())
    }

    /// Builder method: set the weight table size
    pub fn with_feature_dim(mut self, feature_dim: usize) -> Self {
        self.feature_dim = feature_dim;
        self
    }

    /// Builder method: set the beam width
    pub fn with_beam_width(mut self, beam_width: usize) -> Self {
        self.beam_width = beam_width;
        self
    }

    /// Builder method: set the adaptive-gradient epsilon
    pub fn with_adagrad_epsilon(mut self, epsilon: f64) -> Self {
        self.adagrad_epsilon = epsilon;
        self
    }

    /// Builder method: set the learning rate
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Builder method: set the final beam policy
    pub fn with_final_beam(mut self, final_beam: FinalBeam) -> Self {
        self.final_beam = final_beam;
        self
    }

    /// Builder method: set the template groups
    pub fn with_templates(mut self, templates: Vec<TemplateGroup>) -> Self {
        self.templates = templates;
        self
    }
}
