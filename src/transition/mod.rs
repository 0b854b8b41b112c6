//! Arc-eager transition system
//!
//! - [`action`]: the `Shift | Reduce | Arc` action type and its packed encoding
//! - [`state`]: configurations in a per-sentence arena with parent links

pub mod action;
pub mod state;

pub use action::{Action, ActionType, MAX_LABEL, MAX_POSITION};
pub use state::{ConfigId, Configuration, StateArena};
