//! Bet Records

use serde::{Serialize, Deserialize};

/// Monotonically assigned bet identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BetId(pub u64);

/// A single stake on one round.
///
/// `cashed` only ever goes false -> true, and `cash_out_multiplier`
/// is `Some` exactly when `cashed` is true. Both are private so the
/// only way to flip them is [`Bet::cash_out`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    /// Unique bet ID
    pub id: BetId,

    /// Stake, already debited from the balance
    pub amount: f64,

    /// Round index this stake rides on
    pub placed_in_round: u64,

    cashed: bool,

    cash_out_multiplier: Option<f64>,
}

impl Bet {
    /// Create an open (uncashed) bet.
    pub fn new(id: BetId, amount: f64, placed_in_round: u64) -> Self {
        Self {
            id,
            amount,
            placed_in_round,
            cashed: false,
            cash_out_multiplier: None,
        }
    }

    /// Has this bet been cashed out?
    #[inline]
    pub fn is_cashed(&self) -> bool {
        self.cashed
    }

    /// Multiplier the bet was cashed at.
    #[inline]
    pub fn cash_out_multiplier(&self) -> Option<f64> {
        self.cash_out_multiplier
    }

    /// Amount returned to the balance, if cashed.
    pub fn payout(&self) -> Option<f64> {
        self.cash_out_multiplier.map(|m| self.amount * m)
    }

    /// Cash the bet out at `multiplier`.
    ///
    /// Returns the payout, or `None` if the bet was already cashed.
    pub fn cash_out(&mut self, multiplier: f64) -> Option<f64> {
        if self.cashed {
            return None;
        }
        self.cashed = true;
        self.cash_out_multiplier = Some(multiplier);
        self.payout()
    }
}
