//! # arceager
//!
//! An arc-eager transition-based dependency parser core.
//!
//! This library provides the state machine, dynamic oracle, hashed feature
//! templates, beam search and approximate forward-backward training of a
//! transition-based dependency parser. It consumes integer-coded sentences
//! and performs no I/O.
//!
//! ## Features
//!
//! - **Dynamic oracle**: Goldberg & Nivre cost function, valid off the gold path
//! - **Hashed features**: Zhang & Nivre templates mixed with FxHash
//! - **Beam training**: log-space forward-backward over the pruned beam with AdaGrad
//!
//! ## Example
//!
//! ```
//! use arceager::{GoldTree, Parser, ParserConfig, Sentence};
//!
//! let sentence = Sentence::new(vec![1, 2, 3], vec![1, 2, 1]).unwrap();
//! let gold = GoldTree::unlabeled(vec![2, 0, 2]).unwrap();
//!
//! let config = ParserConfig::new().with_feature_dim(1 << 16).with_beam_width(4);
//! let mut parser = Parser::new(config).unwrap();
//! for _ in 0..5 {
//!     parser.train_step(&sentence, &gold).unwrap();
//! }
//! let parse = parser.parse(&sentence).unwrap();
//! assert_eq!(parse.actions.len(), 6);
//! assert_eq!(parse.heads().len(), 3);
//! ```

#[macro_use]
mod macros;

pub mod beam;
pub mod errors;
pub mod eval;
pub mod features;
pub mod model;
pub mod oracle;
pub mod parser;
pub mod transition;
pub mod types;

// Re-export commonly used types
pub use errors::{ParserError, Result};
pub use types::{
    Alphabet, DepArc, FinalBeam, GoldTree, LabelId, ParserConfig, Sentence, TokenId,
    DEFAULT_LABEL,
};

// Re-export main functionality
pub use beam::{BeamEntry, BeamSearch, Trellis};
pub use eval::{oracle_has_perfect_recall, recall_abs, recall_rel, AttachmentScores};
pub use features::{FeatureExtractor, TemplateGroup};
pub use model::{Gradient, WeightVector};
pub use oracle::{ActionCosts, DynamicOracle};
pub use parser::{Parse, Parser, StepReport};
pub use transition::{Action, ActionType, ConfigId, StateArena};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
