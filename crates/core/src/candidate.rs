//! Proposed wagers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;
use crate::kelly;

/// A single proposed wager under evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetCandidate {
    /// Unique within a batch.
    pub id: String,
    /// Estimated win probability, strictly between 0 and 1.
    pub probability: Decimal,
    /// Decimal odds, strictly greater than 1.0.
    pub price: Decimal,
    /// Shared by candidates whose outcomes are linked (same night, same game).
    #[serde(default)]
    pub correlation_group: Option<String>,
}

impl BetCandidate {
    /// Creates an uncorrelated candidate.
    #[must_use]
    pub fn new(id: impl Into<String>, probability: Decimal, price: Decimal) -> Self {
        Self {
            id: id.into(),
            probability,
            price,
            correlation_group: None,
        }
    }

    /// Tags the candidate with a correlation group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.correlation_group = Some(group.into());
        self
    }

    /// The correlation group, treating an empty string as uncorrelated.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.correlation_group.as_deref().filter(|g| !g.is_empty())
    }

    /// Checks probability and price domains.
    ///
    /// # Errors
    /// Returns [`InvalidInputError::Probability`] unless `0 < probability < 1`,
    /// and [`InvalidInputError::Price`] unless `price > 1`.
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        if self.probability <= Decimal::ZERO || self.probability >= Decimal::ONE {
            return Err(InvalidInputError::Probability {
                candidate_id: self.id.clone(),
                value: self.probability,
            });
        }
        if self.price <= Decimal::ONE {
            return Err(InvalidInputError::Price {
                candidate_id: self.id.clone(),
                value: self.price,
            });
        }
        Ok(())
    }

    /// Expected profit per unit staked.
    #[must_use]
    pub fn expected_value(&self) -> Decimal {
        kelly::expected_value(self.probability, self.price)
    }
}
