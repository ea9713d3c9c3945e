// ⚠️ Ledger Errors - What the mutation layer can refuse
//
// Reads never fail: missing items contribute zero and bad dates fall out of
// filters. Only edits are rejected, when their target is gone or their
// lines carry nothing usable.

use crate::model::{Quantity, MAX_QUANTITY};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Client,
    Contract,
    Item,
    Commitment,
    Invoice,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Client => "client",
            EntityKind::Contract => "contract",
            EntityKind::Item => "contract item",
            EntityKind::Commitment => "commitment",
            EntityKind::Invoice => "invoice",
        };
        f.write_str(name)
    }
}

/// Failures of the portfolio mutation layer. The ledger engine itself
/// never fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} has no line with a positive quantity")]
    EmptyDocument { kind: EntityKind },

    #[error("quantity {quantity} exceeds the maximum of {max}", max = MAX_QUANTITY)]
    QuantityOutOfRange { quantity: Quantity },
}

impl LedgerError {
    pub fn not_found(kind: EntityKind, id: &str) -> Self {
        LedgerError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Reject quantities the balance figures could not represent exactly
    pub fn check_quantity(quantity: Quantity) -> Result<Quantity, Self> {
        if quantity > MAX_QUANTITY {
            Err(LedgerError::QuantityOutOfRange { quantity })
        } else {
            Ok(quantity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            LedgerError::not_found(EntityKind::Item, "i-9").to_string(),
            "contract item not found: i-9"
        );
        assert_eq!(
            LedgerError::QuantityOutOfRange { quantity: u64::MAX }.to_string(),
            format!("quantity {} exceeds the maximum of {}", u64::MAX, MAX_QUANTITY)
        );
    }

    #[test]
    fn test_check_quantity_bounds() {
        assert_eq!(LedgerError::check_quantity(MAX_QUANTITY), Ok(MAX_QUANTITY));
        assert_eq!(
            LedgerError::check_quantity(MAX_QUANTITY + 1),
            Err(LedgerError::QuantityOutOfRange { quantity: MAX_QUANTITY + 1 })
        );
    }
}
