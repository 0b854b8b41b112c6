//! Parsing and approximate forward-backward training.
//!
//! One training step on a sentence:
//!
//! 1. beam search builds a [`Trellis`] with forward values, local scores and
//!    feature sets;
//! 2. `Z` is the log-sum-exp of the final forward values (with
//!    [`FinalBeam::Collapse`] that is the single kept final entry);
//! 3. backward values are accumulated in log space and each kept transition
//!    gets the marginal `exp(forward + backward - Z)`;
//! 4. the marginal-weighted feature vectors are subtracted from the gradient
//!    and the oracle trajectory's feature vectors are added with weight 1;
//! 5. one adaptive step is applied to the weights.
//!
//! The marginals only cover paths that survived pruning, so this is an
//! approximation of CRF training, not the exact objective. With a collapsed
//! final level the update reduces to "oracle path minus best beam path".

use crate::beam::{BeamSearch, Trellis};
use crate::errors::{ensure_finite, ParserError, Result};
use crate::features::FeatureExtractor;
use crate::model::{Gradient, WeightVector};
use crate::oracle::DynamicOracle;
use crate::transition::{Action, ActionType, StateArena};
use crate::types::{DepArc, GoldTree, ParserConfig, Sentence, DEFAULT_LABEL};
use serde::Serialize;

/// Result of decoding one sentence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parse {
    /// Transitions of the best final beam path
    pub actions: Vec<Action>,
    /// Arcs induced by `actions`, in creation order
    pub arcs: Vec<DepArc>,
    /// Forward score of the path
    pub score: f64,
    sentence_len: usize,
}

impl Parse {
    /// Head of every token (index `i` is token `i + 1`).
    ///
    /// `None` marks tokens without a real head: unattached tokens and tokens
    /// attached to the virtual position past the end of the sentence.
    pub fn heads(&self) -> Vec<Option<usize>> {
        let mut heads = vec![None; self.sentence_len];
        for arc in &self.arcs {
            if arc.head <= self.sentence_len && arc.modifier >= 1 {
                if let Some(slot) = heads.get_mut(arc.modifier - 1) {
                    *slot = Some(arc.head);
                }
            }
        }
        heads
    }
}

/// Diagnostics of one training step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StepReport {
    /// Approximate log partition over the kept final entries
    pub log_partition: f64,
    /// Model score of the oracle trajectory
    pub oracle_score: f64,
    /// Forward score of the best final beam entry
    pub best_score: f64,
    /// Touched gradient entries
    pub gradient_entries: usize,
    /// Weight entries changed by the update
    pub updated: usize,
}

impl StepReport {
    /// Margin of the oracle path over the best beam path
    pub fn margin(&self) -> f64 {
        self.oracle_score - self.best_score
    }
}

/// Arc-eager parser: configuration, weights and feature extractor
#[derive(Debug, Clone)]
pub struct Parser {
    config: ParserConfig,
    weights: WeightVector,
    extractor: FeatureExtractor,
}

impl Parser {
    /// Parser with zero weights
    pub fn new(config: ParserConfig) -> Result<Self> {
        config.validate()?;
        let weights = WeightVector::new(config.feature_dim, config.adagrad_epsilon)?;
        Ok(Self::assemble(config, weights))
    }

    /// Parser over existing weights (e.g. a checkpoint).
    ///
    /// The weights keep their accumulators but take `config.adagrad_epsilon`.
    pub fn with_weights(config: ParserConfig, weights: WeightVector) -> Result<Self> {
        config.validate()?;
        if weights.dim() != config.feature_dim {
            return Err(ParserError::DimensionMismatch {
                expected: config.feature_dim,
                actual: weights.dim(),
            });
        }
        let weights = weights.with_epsilon(config.adagrad_epsilon);
        Ok(Self::assemble(config, weights))
    }

    fn assemble(config: ParserConfig, weights: WeightVector) -> Self {
        let extractor = FeatureExtractor::new(&config.templates);
        Self {
            config,
            weights,
            extractor,
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Current weights, for checkpointing
    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    pub fn into_weights(self) -> WeightVector {
        self.weights
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Run beam search with the configured width
    pub fn beam_search(&self, sentence: &Sentence) -> Result<Trellis> {
        BeamSearch::new(
            &self.weights,
            &self.extractor,
            self.config.beam_width,
            self.config.final_beam,
        )?
        .run(sentence)
    }

    /// Decode `sentence`: the best final beam path and its arcs
    pub fn parse(&self, sentence: &Sentence) -> Result<Parse> {
        let trellis = self.beam_search(sentence)?;
        let best = trellis
            .best()
            .ok_or_else(|| ParserError::internal("trellis has no final entry"))?;
        let arena = trellis.arena();
        Ok(Parse {
            actions: arena.history(best.config),
            arcs: arena.arcs(best.config),
            score: best.forward,
            sentence_len: sentence.len(),
        })
    }

    /// The oracle's action sequence for `gold`, arcs carrying gold labels
    pub fn oracle_actions(gold: &GoldTree) -> Result<Vec<Action>> {
        let mut arena = StateArena::new(gold.len());
        let init = arena.initial();
        let last = DynamicOracle::new(gold).trajectory(&mut arena, init)?;
        Ok(arena.history(last))
    }

    /// Replay `actions` from the initial configuration and sum their local scores
    pub fn score_actions(&self, sentence: &Sentence, actions: &[ActionType]) -> Result<f64> {
        let mut arena = StateArena::new(sentence.len());
        let mut cur = arena.initial();
        let mut total = 0.0;
        for &action in actions {
            let features = self.extractor.extract(&arena, cur, sentence);
            total += self.weights.score(&features, action);
            cur = arena.apply(cur, action, DEFAULT_LABEL)?;
        }
        ensure_finite("trajectory score", total)
    }

    /// Gradient of one sentence without touching the weights
    pub fn compute_gradient(
        &self,
        sentence: &Sentence,
        gold: &GoldTree,
    ) -> Result<(Gradient, StepReport)> {
        check_lengths(sentence, gold)?;
        let mut grad = Gradient::new();

        // model expectation over the beam
        let mut trellis = self.beam_search(sentence)?;
        trellis.compute_backward()?;
        let log_z = ensure_finite("log partition", trellis.log_partition())?;
        trace_debug!(log_z, "partition");
        let levels = trellis.levels();
        for t in 1..levels.len() {
            for (rank, entry) in levels[t].iter().enumerate() {
                let marginal = ensure_finite("marginal", trellis.marginal(t, rank, log_z))?;
                if marginal == 0.0 {
                    continue;
                }
                let (Some(parent), Some(action)) = (entry.parent, entry.action) else {
                    return Err(ParserError::internal(format!(
                        "entry {} at level {} has no predecessor",
                        rank, t
                    )));
                };
                let features = &levels[t - 1][parent].features;
                self.weights.accumulate(&mut grad, features, action, -marginal);
            }
        }
        let best_score = trellis.best().map_or(0.0, |e| e.forward);

        // empirical term along the oracle trajectory
        let mut arena = StateArena::new(sentence.len());
        let init = arena.initial();
        let last = DynamicOracle::new(gold).trajectory(&mut arena, init)?;
        let mut oracle_score = 0.0;
        let path = arena.path(last);
        for pair in path.windows(2) {
            let Some(action) = arena.get(pair[1]).action() else {
                continue;
            };
            let action = action.action_type();
            let features = self.extractor.extract(&arena, pair[0], sentence);
            oracle_score += self.weights.score(&features, action);
            self.weights.accumulate(&mut grad, &features, action, 1.0);
        }

        let report = StepReport {
            log_partition: log_z,
            oracle_score,
            best_score,
            gradient_entries: grad.len(),
            updated: 0,
        };
        Ok((grad, report))
    }

    /// One training step on a single sentence
    pub fn train_step(&mut self, sentence: &Sentence, gold: &GoldTree) -> Result<StepReport> {
        trace_span!("train_step", tokens = sentence.len());
        let (grad, mut report) = self.compute_gradient(sentence, gold)?;
        report.updated = self
            .weights
            .apply_adagrad(&grad, self.config.learning_rate)?;
        Ok(report)
    }
}

fn check_lengths(sentence: &Sentence, gold: &GoldTree) -> Result<()> {
    if sentence.len() != gold.len() {
        return Err(ParserError::invalid_tree(format!(
            "gold tree has {} tokens but the sentence has {}",
            gold.len(),
            sentence.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FinalBeam;

    fn reference() -> (Sentence, GoldTree) {
        // He wrote her a letter .
        let sentence = Sentence::new(vec![1, 2, 3, 4, 5, 6], vec![1, 2, 1, 3, 4, 5]).unwrap();
        let gold = GoldTree::new(vec![2, 0, 2, 5, 2, 2], vec![1, 2, 3, 4, 5, 6]).unwrap();
        (sentence, gold)
    }

    fn small_config() -> ParserConfig {
        ParserConfig::new()
            .with_feature_dim(1 << 16)
            .with_beam_width(4)
    }

    #[test]
    fn test_parse_is_complete_derivation() {
        let (sentence, _) = reference();
        let parser = Parser::new(small_config()).unwrap();
        let parse = parser.parse(&sentence).unwrap();
        assert_eq!(parse.actions.len(), 12);
        assert_eq!(parse.heads().len(), 6);
        assert!(parse.arcs.iter().all(|a| a.label == DEFAULT_LABEL));
    }

    #[test]
    fn test_with_weights_checks_dimension() {
        let weights = WeightVector::new(10, 1e-8).unwrap();
        let err = Parser::with_weights(small_config(), weights).unwrap_err();
        assert!(matches!(err, ParserError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_with_weights_takes_config_epsilon() {
        let config = small_config().with_adagrad_epsilon(1e-6);
        let weights = WeightVector::new(config.feature_dim, 1.0).unwrap();
        let parser = Parser::with_weights(config, weights).unwrap();
        assert_eq!(parser.weights().epsilon(), 1e-6);
    }

    #[test]
    fn test_deserialized_gold_tree_is_validated() {
        let (sentence, _) = reference();
        assert!(serde_json::from_str::<GoldTree>(r#"{"heads":[2,0],"deprels":[]}"#).is_err());
        let gold: GoldTree =
            serde_json::from_str(r#"{"heads":[2,0,2,5,2,2],"deprels":[1,2,3,4,5,6]}"#).unwrap();
        assert_eq!(Parser::oracle_actions(&gold).unwrap().len(), 12);
        let mut parser = Parser::new(small_config()).unwrap();
        assert!(parser.train_step(&sentence, &gold).is_ok());
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let (sentence, _) = reference();
        let gold = GoldTree::unlabeled(vec![0]).unwrap();
        let mut parser = Parser::new(small_config()).unwrap();
        assert!(parser.train_step(&sentence, &gold).is_err());
        assert!(parser.compute_gradient(&sentence, &gold).is_err());
    }

    #[test]
    fn test_oracle_actions_carry_gold_labels() {
        let (_, gold) = reference();
        let actions = Parser::oracle_actions(&gold).unwrap();
        assert_eq!(actions.len(), 12);
        let arcs: Vec<DepArc> = actions.iter().filter_map(|a| a.dep_arc()).collect();
        assert_eq!(arcs.len(), 6);
        for arc in arcs {
            assert_eq!(gold.label_of(arc.head, arc.modifier), Some(arc.label));
        }
    }

    #[test]
    fn test_gradient_vanishes_when_beam_follows_oracle() {
        let (sentence, gold) = reference();
        let mut parser = Parser::new(small_config()).unwrap();
        for _ in 0..20 {
            parser.train_step(&sentence, &gold).unwrap();
        }
        let (grad, report) = parser.compute_gradient(&sentence, &gold).unwrap();
        let tol = 1e-6 * report.best_score.abs().max(1.0);
        assert!(report.margin() >= -tol);
        assert!(grad.iter().all(|(_, g)| g.abs() < 1e-6));
    }

    #[test]
    fn test_score_actions_matches_beam_score() {
        let (sentence, gold) = reference();
        let mut parser = Parser::new(small_config()).unwrap();
        parser.train_step(&sentence, &gold).unwrap();
        let parse = parser.parse(&sentence).unwrap();
        let types: Vec<ActionType> = parse.actions.iter().map(|a| a.action_type()).collect();
        let replayed = parser.score_actions(&sentence, &types).unwrap();
        assert!((replayed - parse.score).abs() <= 1e-9 * parse.score.abs().max(1.0));

        // an illegal replay fails fast
        let err = parser
            .score_actions(&sentence, &[ActionType::Reduce])
            .unwrap_err();
        assert!(err.is_illegal_transition());
    }

    #[test]
    fn test_keep_all_training_runs() {
        let (sentence, gold) = reference();
        let mut parser =
            Parser::new(small_config().with_final_beam(FinalBeam::KeepAll)).unwrap();
        let report = parser.train_step(&sentence, &gold).unwrap();
        assert!(report.log_partition.is_finite());
        assert!(report.updated > 0);
    }

    #[test]
    fn test_empty_sentence_trains_to_nothing() {
        let sentence = Sentence::new(vec![], vec![]).unwrap();
        let gold = GoldTree::unlabeled(vec![]).unwrap();
        let mut parser = Parser::new(small_config()).unwrap();
        let report = parser.train_step(&sentence, &gold).unwrap();
        assert_eq!(report.updated, 0);
        assert!(parser.parse(&sentence).unwrap().actions.is_empty());
    }
}
