//! Bet Ledger
//!
//! Owns the player's balance and the stakes riding on the current round.
//! Every balance mutation goes through here: debit on placement,
//! one credit per cashout request.

use serde::{Serialize, Deserialize};

use crate::game::bet::{Bet, BetId};

// =============================================================================
// ERRORS
// =============================================================================

/// Reasons a stake is refused. Refusal never mutates the ledger.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BetError {
    /// Stake exceeds the available balance.
    #[error("Insufficient funds: stake {requested:.2} exceeds balance {available:.2}")]
    InsufficientFunds {
        /// Normalized stake that was requested.
        requested: f64,
        /// Balance at the time of the request.
        available: f64,
    },

    /// Stake is non-numeric or below the minimum (reject policy only).
    #[error("Invalid stake amount: {amount}")]
    InvalidAmount {
        /// Amount as supplied by the caller.
        amount: f64,
    },

    /// The targeted round no longer accepts stakes.
    #[error("Round is closed for entry")]
    EntryClosed,
}

// =============================================================================
// STAKE POLICY
// =============================================================================

/// What to do with a non-positive, non-finite or below-minimum stake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidAmountPolicy {
    /// Raise it to the minimum stake.
    #[default]
    Clamp,
    /// Refuse it with [`BetError::InvalidAmount`].
    Reject,
}

/// Stake validation rules.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakePolicy {
    /// Smallest accepted stake.
    pub min_stake: f64,
    /// Floor stakes to whole units.
    pub whole_units: bool,
    /// Handling of invalid amounts.
    pub invalid_amount: InvalidAmountPolicy,
}

impl Default for StakePolicy {
    fn default() -> Self {
        Self {
            min_stake: 1.0,
            whole_units: true,
            invalid_amount: InvalidAmountPolicy::Clamp,
        }
    }
}

impl StakePolicy {
    /// Turn a raw requested amount into the stake that will be debited.
    ///
    /// Under `Clamp`, NaN and negative infinity become the minimum stake.
    /// Positive infinity passes through and fails the balance check.
    pub fn normalize(&self, raw: f64) -> Result<f64, BetError> {
        let floored = if self.whole_units { raw.floor() } else { raw };

        match self.invalid_amount {
            InvalidAmountPolicy::Clamp => {
                if floored.is_nan() || floored == f64::NEG_INFINITY {
                    return Ok(self.min_stake);
                }
                Ok(floored.max(self.min_stake))
            }
            InvalidAmountPolicy::Reject => {
                if !floored.is_finite() || floored <= 0.0 || floored < self.min_stake {
                    return Err(BetError::InvalidAmount { amount: raw });
                }
                Ok(floored)
            }
        }
    }
}

/// Stake shortcut buttons offered next to the amount field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakePreset {
    /// A fixed chip value.
    Fixed(f64),
    /// Half the current amount.
    Half,
    /// Twice the current amount.
    Double,
    /// The whole balance.
    Max,
}

impl StakePreset {
    /// New amount for the stake field. Whole units, never below 1.
    pub fn apply(self, current: f64, balance: f64) -> f64 {
        let current = if current.is_finite() && current > 0.0 { current } else { 1.0 };
        let next = match self {
            StakePreset::Fixed(value) => value,
            StakePreset::Half => current / 2.0,
            StakePreset::Double => current * 2.0,
            StakePreset::Max => balance,
        };
        if next.is_finite() { next.floor().max(1.0) } else { 1.0 }
    }
}

// =============================================================================
// BALANCE
// =============================================================================

/// The player's account.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Balance(f64);

impl Balance {
    /// Open an account.
    pub fn new(amount: f64) -> Self {
        Self(amount.max(0.0))
    }

    /// Current funds.
    #[inline]
    pub fn amount(&self) -> f64 {
        self.0
    }

    /// Withdraw `amount`, refusing rather than going negative.
    fn debit(&mut self, amount: f64) -> Result<(), BetError> {
        if amount > self.0 {
            return Err(BetError::InsufficientFunds {
                requested: amount,
                available: self.0,
            });
        }
        self.0 -= amount;
        Ok(())
    }

    fn credit(&mut self, amount: f64) {
        self.0 += amount;
    }
}

// =============================================================================
// SETTLEMENT RESULTS
// =============================================================================

/// Outcome of one cashout request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashOut {
    /// Single multiplier every bet in the batch was valued at.
    pub multiplier: f64,
    /// Total credited to the balance.
    pub payout: f64,
    /// Bets settled by this request.
    pub bets: Vec<BetId>,
}

/// Stakes lost when a round crashed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Forfeit {
    /// Number of uncashed bets.
    pub bets: usize,
    /// Sum of their stakes.
    pub stake: f64,
}

// =============================================================================
// LEDGER
// =============================================================================

/// Stake records for the current round (plus stakes queued for the next).
#[derive(Clone, Debug)]
pub struct BetLedger {
    bets: Vec<Bet>,
    next_id: u64,
    balance: Balance,
    policy: StakePolicy,
    /// Round the ledger is currently settling.
    round: u64,
    /// Set once the current round crashed.
    settled: bool,
}

impl BetLedger {
    /// Create an empty ledger at round 0 (no round played yet).
    pub fn new(starting_balance: f64, policy: StakePolicy) -> Self {
        Self {
            bets: Vec::new(),
            next_id: 0,
            balance: Balance::new(starting_balance),
            policy,
            round: 0,
            settled: false,
        }
    }

    /// Current balance.
    #[inline]
    pub fn balance(&self) -> f64 {
        self.balance.amount()
    }

    /// Round being settled.
    #[inline]
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Has the current round crashed?
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Stake policy in force.
    pub fn policy(&self) -> &StakePolicy {
        &self.policy
    }

    /// All records, in placement order.
    pub fn bets(&self) -> &[Bet] {
        &self.bets
    }

    /// Look up a bet.
    pub fn get(&self, id: BetId) -> Option<&Bet> {
        self.bets.iter().find(|b| b.id == id)
    }

    /// Uncashed bets on the current round that can still be cashed out.
    pub fn open_bets(&self) -> impl Iterator<Item = &Bet> {
        let round = self.round;
        let settled = self.settled;
        self.bets
            .iter()
            .filter(move |b| !settled && b.placed_in_round == round && !b.is_cashed())
    }

    /// Any bet eligible for a cashout right now?
    pub fn has_open_bets(&self) -> bool {
        self.open_bets().next().is_some()
    }

    /// Stakes queued for a round that has not started yet.
    pub fn queued_bets(&self) -> impl Iterator<Item = &Bet> {
        let round = self.round;
        self.bets.iter().filter(move |b| b.placed_in_round > round)
    }

    /// Place a stake on `round`.
    ///
    /// The stake is debited immediately. Fails without mutation if the
    /// amount is invalid (reject policy), exceeds the balance, or targets
    /// a round that is over.
    pub fn place(&mut self, raw_amount: f64, round: u64) -> Result<Bet, BetError> {
        if round < self.round || (round == self.round && self.settled) {
            return Err(BetError::EntryClosed);
        }

        let amount = self.policy.normalize(raw_amount)?;
        self.balance.debit(amount)?;

        self.next_id += 1;
        let bet = Bet::new(BetId(self.next_id), amount, round);
        self.bets.push(bet.clone());

        Ok(bet)
    }

    /// Cash out every open bet of the current round at one multiplier.
    ///
    /// The total is credited once, after the scan. Returns `None` and
    /// mutates nothing when no bet is eligible.
    pub fn cash_out_all(&mut self, multiplier: f64) -> Option<CashOut> {
        if self.settled {
            return None;
        }

        let round = self.round;
        let mut payout = 0.0;
        let mut settled_ids = Vec::new();

        for bet in self.bets.iter_mut().filter(|b| b.placed_in_round == round) {
            if let Some(amount) = bet.cash_out(multiplier) {
                payout += amount;
                settled_ids.push(bet.id);
            }
        }

        if settled_ids.is_empty() {
            return None;
        }

        self.balance.credit(payout);

        Some(CashOut {
            multiplier,
            payout,
            bets: settled_ids,
        })
    }

    /// Close the current round after a crash.
    ///
    /// Uncashed stakes are lost; they were debited at placement so no
    /// balance change happens here.
    pub fn settle_crash(&mut self) -> Forfeit {
        let forfeit = self.open_bets().fold(Forfeit::default(), |acc, bet| Forfeit {
            bets: acc.bets + 1,
            stake: acc.stake + bet.amount,
        });
        self.settled = true;
        forfeit
    }

    /// Move to `new_round`, keeping only stakes placed for it.
    pub fn reset(&mut self, new_round: u64) {
        self.bets.retain(|b| b.placed_in_round == new_round);
        self.round = new_round;
        self.settled = false;
    }
}
