//! Fee accounting for auction settlement.
//!
//! The [`Policy`] is an explicit configuration object owned by the factory
//! and passed by reference into auction operations; nothing here reads
//! ambient global state, so tests can run any number of independent fee
//! configurations side by side.

use {
    domain::AuctionId,
    primitive_types::{U256, U512},
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
    thiserror::Error,
};

/// 100% in basis points.
const BPS_SCALE: u64 = 10_000;

/// Highest configurable fee rate, 50%.
pub const MAX_RATE_BPS: u16 = 5_000;

/// Rate applied to auctions without an override, 2.5%.
pub const DEFAULT_RATE_BPS: u16 = 250;

/// A validated fee rate in basis points.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct Bps(u16);

impl Bps {
    pub fn new(rate: u16) -> Result<Self, Error> {
        if rate > MAX_RATE_BPS {
            return Err(Error::RateTooHigh(rate));
        }
        Ok(Self(rate))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for Bps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bps", self.0)
    }
}

/// The seller/fee decomposition of a gross settlement amount.
///
/// `seller + fee == gross` holds exactly for every input: the fee
/// truncates toward zero and the seller amount is the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub seller: U256,
    pub fee: U256,
}

/// Default fee rate plus per-auction overrides.
#[derive(Debug, Clone)]
pub struct Policy {
    default_rate: Bps,
    overrides: HashMap<AuctionId, Bps>,
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(Bps(DEFAULT_RATE_BPS))
    }
}

impl Policy {
    pub fn new(default_rate: Bps) -> Self {
        Self {
            default_rate,
            overrides: HashMap::new(),
        }
    }

    /// The rate that applies to the given auction: its override if one was
    /// set, the default otherwise.
    pub fn effective_rate(&self, auction: AuctionId) -> Bps {
        self.overrides
            .get(&auction)
            .copied()
            .unwrap_or(self.default_rate)
    }

    /// Replaces the default rate. Existing per-auction overrides are
    /// cleared: a new global rate applies to the whole fleet.
    pub fn set_default_rate(&mut self, rate: Bps) {
        self.default_rate = rate;
        self.overrides.clear();
    }

    /// Sets the rate for one auction without touching its siblings.
    pub fn set_override(&mut self, auction: AuctionId, rate: Bps) {
        self.overrides.insert(auction, rate);
    }

    /// Splits a gross amount into the seller payout and the retained fee
    /// at the auction's effective rate.
    pub fn split(&self, auction: AuctionId, gross: U256) -> Split {
        let rate = self.effective_rate(auction);
        let fee = U256::try_from(
            gross.full_mul(U256::from(rate.0)) / U512::from(BPS_SCALE),
        )
        .expect("fee never exceeds gross");
        Split {
            seller: gross - fee,
            fee,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("fee rate {0} bps exceeds the {MAX_RATE_BPS} bps cap")]
    RateTooHigh(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bps(rate: u16) -> Bps {
        Bps::new(rate).unwrap()
    }

    #[test]
    fn split_is_exact_for_any_rate() {
        let gross = U256::from(1_234_567_891_234_567_891u128);
        for rate in [0, 1, 250, 499, 2500, MAX_RATE_BPS] {
            let mut policy = Policy::new(bps(rate));
            policy.set_override(AuctionId(7), bps(rate));
            for auction in [AuctionId(0), AuctionId(7)] {
                let split = policy.split(auction, gross);
                assert_eq!(split.seller + split.fee, gross);
                assert_eq!(
                    split.fee,
                    gross * U256::from(rate) / U256::from(10_000u64)
                );
            }
        }
    }

    #[test]
    fn split_handles_huge_gross_amounts() {
        let gross = U256::MAX;
        let split = Policy::default().split(AuctionId(0), gross);
        assert_eq!(split.seller + split.fee, gross);
    }

    #[test]
    fn default_rate_is_250_bps() {
        let policy = Policy::default();
        assert_eq!(policy.effective_rate(AuctionId(3)).get(), 250);
    }

    #[test]
    fn override_takes_precedence_and_stays_isolated() {
        let mut policy = Policy::default();
        policy.set_override(AuctionId(1), bps(500));
        assert_eq!(policy.effective_rate(AuctionId(1)).get(), 500);
        assert_eq!(policy.effective_rate(AuctionId(2)).get(), 250);

        let gross = U256::from(1_000_000u64);
        assert_eq!(policy.split(AuctionId(1), gross).fee, U256::from(50_000u64));
        assert_eq!(policy.split(AuctionId(2), gross).fee, U256::from(25_000u64));
    }

    #[test]
    fn new_default_rate_clears_overrides() {
        let mut policy = Policy::default();
        policy.set_override(AuctionId(1), bps(300));
        policy.set_default_rate(bps(400));
        assert_eq!(policy.effective_rate(AuctionId(1)).get(), 400);
        assert_eq!(policy.effective_rate(AuctionId(2)).get(), 400);
    }

    #[test]
    fn rates_above_the_cap_are_rejected() {
        assert_eq!(
            Bps::new(MAX_RATE_BPS + 1),
            Err(Error::RateTooHigh(MAX_RATE_BPS + 1))
        );
        assert!(Bps::new(MAX_RATE_BPS).is_ok());
    }
}
