//! Feature extraction for parser configurations.
//!
//! Templates are organized in groups that can be switched on and off from
//! [`ParserConfig`](crate::types::ParserConfig). Extraction never touches
//! the weights; it only produces 64-bit keys that the scorer maps into the
//! weight table together with an action type.

pub mod context;
pub mod templates;

pub use context::{StateContext, TokenView, END_VALUE, NONE_VALUE, ROOT_VALUE};
pub use templates::Template;

use crate::transition::{ConfigId, StateArena};
use crate::types::Sentence;
use serde::{Deserialize, Serialize};

/// A named group of templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateGroup {
    /// Word, POS and word+POS of `s0`, `n0`, `n1`, `n2`
    SingleWords,
    /// Conjunctions of `s0` and `n0`, plus `n0`/`n1` POS
    WordPairs,
    /// POS trigrams over the stack top, buffer and first-order neighbours
    HigherOrder,
    /// Second-order neighbours (grand-head, second-leftmost/rightmost)
    ThirdOrder,
    /// Bucketed `s0`..`n0` distance conjoined with words and tags
    Distance,
    /// Child counts of `s0` and `n0`
    Valency,
    /// Head and extreme children of `s0`, leftmost child of `n0`
    Unigrams,
}

impl TemplateGroup {
    /// All groups, in extraction order
    pub const ALL: [TemplateGroup; 7] = [
        TemplateGroup::SingleWords,
        TemplateGroup::WordPairs,
        TemplateGroup::HigherOrder,
        TemplateGroup::ThirdOrder,
        TemplateGroup::Distance,
        TemplateGroup::Valency,
        TemplateGroup::Unigrams,
    ];

    /// Templates of this group
    pub fn templates(self) -> &'static [Template] {
        use Template::*;
        match self {
            TemplateGroup::SingleWords => &[
                S0wp, S0w, S0p, N0wp, N0w, N0p, N1wp, N1w, N1p, N2wp, N2w, N2p,
            ],
            TemplateGroup::WordPairs => &[
                S0wpN0wp, S0wpN0w, S0wN0wp, S0wpN0p, S0pN0wp, S0wN0w, S0pN0p, N0pN1p,
            ],
            TemplateGroup::HigherOrder => &[
                N0pN1pN2p, S0pN0pN1p, S0hpS0pN0p, S0pS0lpN0p, S0pS0rpN0p, S0pN0pN0lp,
            ],
            TemplateGroup::ThirdOrder => &[
                S0h2w,
                S0h2p,
                S0l2w,
                S0l2p,
                S0r2w,
                S0r2p,
                N0l2w,
                N0l2p,
                S0pS0lpS0l2p,
                S0pS0rpS0r2p,
                S0pS0hpS0h2p,
                N0pN0lpN0l2p,
            ],
            TemplateGroup::Distance => &[S0wd, S0pd, N0wd, N0pd, S0wN0wd, S0pN0pd],
            TemplateGroup::Valency => &[S0wVr, S0pVr, S0wVl, S0pVl, N0wVl, N0pVl],
            TemplateGroup::Unigrams => &[S0hw, S0hp, S0lw, S0lp, S0rw, S0rp, N0lw, N0lp],
        }
    }
}

/// Turns configurations into feature keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureExtractor {
    groups: Vec<TemplateGroup>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(&TemplateGroup::ALL)
    }
}

impl FeatureExtractor {
    /// Extractor over the given groups; duplicates are ignored
    pub fn new(groups: &[TemplateGroup]) -> Self {
        let mut unique = Vec::with_capacity(groups.len());
        for &group in groups {
            if !unique.contains(&group) {
                unique.push(group);
            }
        }
        Self { groups: unique }
    }

    /// Enabled groups
    pub fn groups(&self) -> &[TemplateGroup] {
        &self.groups
    }

    /// Number of keys produced per configuration
    pub fn num_features(&self) -> usize {
        self.groups.iter().map(|g| g.templates().len()).sum()
    }

    /// Feature keys of configuration `id`.
    ///
    /// The output depends only on the configuration and the sentence, never
    /// on the action about to be scored.
    pub fn extract(&self, arena: &StateArena, id: ConfigId, sentence: &Sentence) -> Vec<u64> {
        let ctx = StateContext::new(arena, id);
        let tokens = TokenView::new(sentence);
        let mut keys = Vec::with_capacity(self.num_features());
        for group in &self.groups {
            keys.extend(group.templates().iter().map(|t| t.key(&ctx, &tokens)));
        }
        keys
    }
}
