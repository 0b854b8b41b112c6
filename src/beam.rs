//! Beam search over arc-eager configurations.
//!
//! The search builds a [`Trellis`]: one level per transition step, each
//! level holding at most `beam_width` entries ranked by forward score. Every
//! entry points at exactly one entry of the previous level. Structurally
//! identical configurations reached along different paths stay separate
//! entries, so the beam bounds the search but is not a dynamic program.
//!
//! A complete derivation of an `n`-token sentence always has `2n`
//! transitions (every token is pushed once and popped once), hence the
//! trellis has `2n + 1` levels.
//!
//! # Training quantities
//!
//! Forward values are log-domain scores: `forward = parent.forward + local`.
//! [`Trellis::compute_backward`] fills backward values in true log space
//! (`backward(p) = logsumexp over kept children c of (c.local + c.backward)`)
//! and [`Trellis::marginal`] gives `exp(forward + backward - Z)`. These are
//! marginals of the distribution restricted to paths that survived pruning,
//! an approximation of the full CRF marginals.

use crate::errors::{ensure_finite, ParserError, Result};
use crate::features::FeatureExtractor;
use crate::model::WeightVector;
use crate::transition::{ActionType, ConfigId, StateArena};
use crate::types::{FinalBeam, Sentence, DEFAULT_LABEL};
use std::cmp::Ordering;

// ============================================================================
// Trellis
// ============================================================================

/// One kept cell of the trellis
#[derive(Debug, Clone, PartialEq)]
pub struct BeamEntry {
    /// Configuration in the trellis arena
    pub config: ConfigId,
    /// Rank of the predecessor in the previous level
    pub parent: Option<usize>,
    /// Transition that led here from the predecessor
    pub action: Option<ActionType>,
    /// Accumulated score of the path ending here
    pub forward: f64,
    /// Score of the last transition alone
    pub local: f64,
    /// Log-sum of the scores of kept continuations (after `compute_backward`)
    pub backward: f64,
    /// Feature keys of this configuration; empty until it is expanded
    pub features: Vec<u64>,
}

impl BeamEntry {
    fn root(config: ConfigId) -> Self {
        Self {
            config,
            parent: None,
            action: None,
            forward: 0.0,
            local: 0.0,
            backward: f64::NEG_INFINITY,
            features: Vec::new(),
        }
    }
}

/// Level-by-level search record for one sentence
#[derive(Debug, Clone)]
pub struct Trellis {
    arena: StateArena,
    levels: Vec<Vec<BeamEntry>>,
}

impl Trellis {
    /// Configurations created during the search
    pub fn arena(&self) -> &StateArena {
        &self.arena
    }

    /// All levels, initial level first
    pub fn levels(&self) -> &[Vec<BeamEntry>] {
        &self.levels
    }

    /// Number of levels (`2n + 1`)
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Entries of the final level
    pub fn finals(&self) -> &[BeamEntry] {
        self.levels.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Highest-scoring final entry; ties go to the lower rank
    pub fn best(&self) -> Option<&BeamEntry> {
        self.finals()
            .iter()
            .reduce(|best, e| if e.forward > best.forward { e } else { best })
    }

    /// Approximate log partition: log-sum-exp of final forward values
    pub fn log_partition(&self) -> f64 {
        self.finals()
            .iter()
            .fold(f64::NEG_INFINITY, |acc, e| log_add(acc, e.forward))
    }

    /// Fill every entry's backward value, last level first.
    ///
    /// Entries whose continuations were all pruned keep `-inf`.
    pub fn compute_backward(&mut self) -> Result<()> {
        for level in &mut self.levels {
            for entry in level.iter_mut() {
                entry.backward = f64::NEG_INFINITY;
            }
        }
        if let Some(last) = self.levels.last_mut() {
            for entry in last.iter_mut() {
                entry.backward = 0.0;
            }
        }

        for t in (1..self.levels.len()).rev() {
            let (before, after) = self.levels.split_at_mut(t);
            let parents = &mut before[t - 1];
            for child in &after[0] {
                let Some(p) = child.parent else {
                    return Err(ParserError::internal(format!(
                        "entry at level {} has no predecessor",
                        t
                    )));
                };
                let parent = &mut parents[p];
                parent.backward = log_add(parent.backward, child.local + child.backward);
            }
        }

        let root = self.levels.first().and_then(|l| l.first());
        if let Some(root) = root {
            ensure_finite("backward value of the initial configuration", root.backward)?;
        }
        Ok(())
    }

    /// Approximate marginal of entry `rank` at `level`, given `log_z`
    pub fn marginal(&self, level: usize, rank: usize, log_z: f64) -> f64 {
        let entry = &self.levels[level][rank];
        (entry.forward + entry.backward - log_z).exp()
    }

    /// Actions on the path ending at `entry`
    pub fn path_actions(&self, entry: &BeamEntry) -> Vec<ActionType> {
        self.arena
            .history(entry.config)
            .iter()
            .map(|a| a.action_type())
            .collect()
    }

    /// Take the arena for further inspection
    pub fn into_arena(self) -> StateArena {
        self.arena
    }
}

/// `ln(e^a + e^b)` without overflow; `-inf` is the identity
pub fn log_add(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Candidate {
    parent: usize,
    action: ActionType,
    local: f64,
    forward: f64,
}

/// Beam search driver borrowing the model for one or more sentences
#[derive(Debug, Clone, Copy)]
pub struct BeamSearch<'a> {
    weights: &'a WeightVector,
    extractor: &'a FeatureExtractor,
    width: usize,
    final_beam: FinalBeam,
}

impl<'a> BeamSearch<'a> {
    /// Driver keeping `width` configurations per level; `width` must be > 0
    pub fn new(
        weights: &'a WeightVector,
        extractor: &'a FeatureExtractor,
        width: usize,
        final_beam: FinalBeam,
    ) -> Result<Self> {
        if width == 0 {
            return Err(ParserError::invalid_config("beam_width must be > 0"));
        }
        Ok(Self {
            weights,
            extractor,
            width,
            final_beam,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Search `sentence` and return the full trellis
    pub fn run(&self, sentence: &Sentence) -> Result<Trellis> {
        trace_span!("beam_search", tokens = sentence.len(), width = self.width);

        let mut arena = StateArena::new(sentence.len());
        let mut levels = vec![vec![BeamEntry::root(arena.initial())]];
        let steps = 2 * sentence.len();

        for step in 1..=steps {
            let prev = match levels.last_mut() {
                Some(level) => level,
                None => return Err(ParserError::internal("trellis has no levels")),
            };

            let mut candidates = Vec::with_capacity(prev.len() * 4);
            for (rank, entry) in prev.iter_mut().enumerate() {
                entry.features = self.extractor.extract(&arena, entry.config, sentence);
                for action in arena.legal_actions(entry.config) {
                    let local = ensure_finite(
                        "local score",
                        self.weights.score(&entry.features, action),
                    )?;
                    candidates.push(Candidate {
                        parent: rank,
                        action,
                        local,
                        forward: ensure_finite("forward score", entry.forward + local)?,
                    });
                }
            }
            if candidates.is_empty() {
                return Err(ParserError::internal(format!(
                    "no legal transition at step {} of {}",
                    step, steps
                )));
            }

            // stable: equal scores keep expansion order
            candidates.sort_by(|a, b| {
                b.forward
                    .partial_cmp(&a.forward)
                    .unwrap_or(Ordering::Equal)
            });
            let keep = if step == steps && self.final_beam == FinalBeam::Collapse {
                1
            } else {
                self.width
            };
            let _generated = candidates.len();
            candidates.truncate(keep);

            let mut level = Vec::with_capacity(candidates.len());
            for c in candidates {
                let parent_config = prev[c.parent].config;
                let config = arena.apply(parent_config, c.action, DEFAULT_LABEL)?;
                level.push(BeamEntry {
                    config,
                    parent: Some(c.parent),
                    action: Some(c.action),
                    forward: c.forward,
                    local: c.local,
                    backward: f64::NEG_INFINITY,
                    features: Vec::new(),
                });
            }
            trace_debug!(step, generated = _generated, kept = level.len(), "beam level");
            levels.push(level);
        }

        let trellis = Trellis { arena, levels };
        if let Some(bad) = trellis.finals().iter().find(|e| !trellis.arena.is_final(e.config)) {
            return Err(ParserError::internal(format!(
                "non-final configuration {:?} in the last trellis level",
                bad.config
            )));
        }
        Ok(trellis)
    }
}
