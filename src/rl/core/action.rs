//! Action Space
//!
//! Discrete sell/hold/buy decisions and their signed target positions.

use serde::{Deserialize, Serialize};

use crate::error::EnvError;

/// Number of discrete actions
pub const NUM_ACTIONS: usize = 3;

/// Discrete trading decision
///
/// The index minus one is the signed position the agent wants to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TradeAction {
    /// Go (or stay) short
    Sell = 0,
    /// Go (or stay) flat
    Hold = 1,
    /// Go (or stay) long
    Buy = 2,
}

impl TradeAction {
    /// Convert from action index
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Sell),
            1 => Some(Self::Hold),
            2 => Some(Self::Buy),
            _ => None,
        }
    }

    /// Convert to action index
    pub fn to_index(self) -> usize {
        self as usize
    }

    /// Signed target position: -1 short, 0 flat, +1 long
    pub fn target_position(self) -> i8 {
        self as i8 - 1
    }

    /// Get all possible actions
    pub fn all() -> &'static [TradeAction] {
        &[Self::Sell, Self::Hold, Self::Buy]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sell => "sell",
            Self::Hold => "hold",
            Self::Buy => "buy",
        }
    }
}

impl TryFrom<usize> for TradeAction {
    type Error = EnvError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::from_index(index).ok_or(EnvError::InvalidAction(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for action in TradeAction::all() {
            assert_eq!(TradeAction::from_index(action.to_index()), Some(*action));
        }
        assert_eq!(TradeAction::from_index(3), None);
    }

    #[test]
    fn test_target_positions() {
        assert_eq!(TradeAction::Sell.target_position(), -1);
        assert_eq!(TradeAction::Hold.target_position(), 0);
        assert_eq!(TradeAction::Buy.target_position(), 1);
    }

    #[test]
    fn test_invalid_index_is_rejected() {
        assert_eq!(TradeAction::try_from(5), Err(EnvError::InvalidAction(5)));
    }
}
