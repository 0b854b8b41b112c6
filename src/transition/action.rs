//! Transition actions and their packed integer encoding.
//!
//! The packed form is `0 = Shift`, `1 = Reduce`, and for arcs
//! `2 + (head << 36 | modifier << 16 | label)`, giving 20 bits for each
//! position and 16 bits for the label.

use crate::errors::{ParserError, Result};
use crate::types::{DepArc, LabelId};
use serde::{Deserialize, Serialize};
use std::fmt;

const LABEL_BITS: u32 = 16;
const POSITION_BITS: u32 = 20;
const MODIFIER_SHIFT: u32 = LABEL_BITS;
const HEAD_SHIFT: u32 = LABEL_BITS + POSITION_BITS;
const ARC_OFFSET: u64 = 2;

/// Largest position (head or modifier) an arc can carry
pub const MAX_POSITION: usize = (1 << POSITION_BITS) - 1;

/// Largest label id an arc can carry
pub const MAX_LABEL: LabelId = (1 << LABEL_BITS) - 1;

/// The four transition types, numbered as the scorer expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Shift = 0,
    Reduce = 1,
    ArcLeft = 2,
    ArcRight = 3,
}

impl ActionType {
    /// All action types in scorer order
    pub const ALL: [ActionType; 4] = [
        ActionType::Shift,
        ActionType::Reduce,
        ActionType::ArcLeft,
        ActionType::ArcRight,
    ];

    /// Order in which the oracle and the beam expansion try actions
    pub const PRIORITY: [ActionType; 4] = [
        ActionType::ArcLeft,
        ActionType::ArcRight,
        ActionType::Reduce,
        ActionType::Shift,
    ];

    /// Index used when hashing features with this action
    pub fn index(self) -> u64 {
        self as u64
    }

    /// Short mnemonic
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Shift => "SH",
            ActionType::Reduce => "RE",
            ActionType::ArcLeft => "AL",
            ActionType::ArcRight => "AR",
        }
    }
}

/// A transition that was (or may be) applied to a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Shift,
    Reduce,
    Arc {
        head: usize,
        modifier: usize,
        label: LabelId,
    },
}

impl Action {
    /// Create an arc action
    pub fn arc(head: usize, modifier: usize, label: LabelId) -> Self {
        Action::Arc {
            head,
            modifier,
            label,
        }
    }

    /// The transition type; arcs are left or right by head position
    pub fn action_type(&self) -> ActionType {
        match *self {
            Action::Shift => ActionType::Shift,
            Action::Reduce => ActionType::Reduce,
            Action::Arc { head, modifier, .. } if head > modifier => ActionType::ArcLeft,
            Action::Arc { .. } => ActionType::ArcRight,
        }
    }

    /// The arc this action creates, if any
    pub fn dep_arc(&self) -> Option<DepArc> {
        match *self {
            Action::Arc {
                head,
                modifier,
                label,
            } => Some(DepArc::new(head, modifier, label)),
            _ => None,
        }
    }

    /// Check if this action creates an arc
    pub fn is_arc(&self) -> bool {
        matches!(self, Action::Arc { .. })
    }

    /// Pack into a single integer
    pub fn encode(&self) -> Result<u64> {
        match *self {
            Action::Shift => Ok(0),
            Action::Reduce => Ok(1),
            Action::Arc {
                head,
                modifier,
                label,
            } => {
                if head == modifier {
                    return Err(ParserError::action_encoding(format!(
                        "arc from {} to itself",
                        head
                    )));
                }
                if head > MAX_POSITION || modifier > MAX_POSITION {
                    return Err(ParserError::action_encoding(format!(
                        "position out of range: head={} modifier={} (max {})",
                        head, modifier, MAX_POSITION
                    )));
                }
                if label > MAX_LABEL {
                    return Err(ParserError::action_encoding(format!(
                        "label {} out of range (max {})",
                        label, MAX_LABEL
                    )));
                }
                let packed = ((head as u64) << HEAD_SHIFT)
                    | ((modifier as u64) << MODIFIER_SHIFT)
                    | label as u64;
                Ok(packed + ARC_OFFSET)
            }
        }
    }

    /// Unpack an integer produced by [`Action::encode`]
    pub fn decode(code: u64) -> Result<Action> {
        match code {
            0 => Ok(Action::Shift),
            1 => Ok(Action::Reduce),
            _ => {
                let packed = code - ARC_OFFSET;
                if packed >> (HEAD_SHIFT + POSITION_BITS) != 0 {
                    return Err(ParserError::action_encoding(format!(
                        "code {} has bits above the head field",
                        code
                    )));
                }
                let head = (packed >> HEAD_SHIFT) as usize & MAX_POSITION;
                let modifier = (packed >> MODIFIER_SHIFT) as usize & MAX_POSITION;
                let label = (packed as LabelId) & MAX_LABEL;
                if head == modifier {
                    return Err(ParserError::action_encoding(format!(
                        "code {} decodes to a self-loop on {}",
                        code, head
                    )));
                }
                Ok(Action::arc(head, modifier, label))
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Action::Shift | Action::Reduce => f.write_str(self.action_type().as_str()),
            Action::Arc {
                head,
                modifier,
                label,
            } => write!(
                f,
                "{}(h={} m={} l={})",
                self.action_type().as_str(),
                head,
                modifier,
                label
            ),
        }
    }
}
