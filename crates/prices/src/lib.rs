//! Price normalization across bid currencies.
//!
//! Bids may be denominated in the native currency or any registered token;
//! comparing them requires converting each raw amount into one canonical
//! 18-decimal unit through an external oracle price. Every comparison in
//! the workspace goes through [`Feeds::normalize`], so the fixed-point
//! rounding policy is defined exactly once and is testable in isolation
//! from the bidding logic.

use {
    domain::{Currency, NormalizedValue, Timestamp},
    primitive_types::{U256, U512},
    std::{collections::HashMap, sync::Arc},
    thiserror::Error,
};

/// Decimals of the canonical comparison unit.
pub const CANONICAL_DECIMALS: u32 = 18;

/// A price report from an external oracle.
#[derive(Debug, Clone, Copy)]
pub struct Quote {
    /// Price of one raw currency unit, scaled by `10^decimals`. Oracles
    /// report signed values; anything non-positive is rejected downstream.
    pub price: i128,
    pub decimals: u32,
    pub updated_at: Timestamp,
}

/// Boundary to one external price oracle.
pub trait PriceFeed: Send + Sync {
    fn latest(&self) -> Quote;
}

/// Registry of price feeds, one per accepted currency.
///
/// A currency without a feed is an observable [`Error::FeedMissing`] state,
/// distinct from a feed that reports zero.
pub struct Feeds {
    feeds: HashMap<Currency, Arc<dyn PriceFeed>>,
    /// Quotes older than this many seconds are rejected. `None` disables
    /// the staleness check.
    max_age_secs: Option<u64>,
}

impl Default for Feeds {
    fn default() -> Self {
        Self::new()
    }
}

impl Feeds {
    pub fn new() -> Self {
        Self {
            feeds: HashMap::new(),
            max_age_secs: None,
        }
    }

    pub fn with_max_age(max_age_secs: u64) -> Self {
        Self {
            feeds: HashMap::new(),
            max_age_secs: Some(max_age_secs),
        }
    }

    /// Registers (or replaces) the feed for a currency.
    pub fn register(&mut self, currency: Currency, feed: Arc<dyn PriceFeed>) {
        tracing::debug!(%currency, "price feed registered");
        self.feeds.insert(currency, feed);
    }

    pub fn is_registered(&self, currency: Currency) -> bool {
        self.feeds.contains_key(&currency)
    }

    /// The most recent quote for a currency.
    pub fn latest(&self, currency: Currency) -> Result<Quote, Error> {
        let feed = self
            .feeds
            .get(&currency)
            .ok_or(Error::FeedMissing(currency))?;
        Ok(feed.latest())
    }

    /// Converts a raw `amount` of `currency` into the canonical 18-decimal
    /// comparison unit: `amount × price`, with the quoted price rescaled
    /// from its own decimals to 18 first. Widening to 512 bits keeps the
    /// intermediate product exact; a result that does not fit back into
    /// 256 bits is an error rather than a silent wrap.
    pub fn normalize(
        &self,
        currency: Currency,
        amount: U256,
        now: Timestamp,
    ) -> Result<NormalizedValue, Error> {
        let quote = self.latest(currency)?;
        if quote.price <= 0 {
            return Err(Error::StaleOrInvalidPrice(currency));
        }
        if let Some(max_age) = self.max_age_secs {
            if now.secs_since(quote.updated_at) > max_age {
                return Err(Error::StaleOrInvalidPrice(currency));
            }
        }

        let price = U256::from(quote.price.unsigned_abs());
        let wide = amount.full_mul(price);
        let rescaled = if quote.decimals <= CANONICAL_DECIMALS {
            let scale = U512::from(10u8).pow(U512::from(CANONICAL_DECIMALS - quote.decimals));
            wide.checked_mul(scale).ok_or(Error::Overflow)?
        } else {
            let scale = U512::from(10u8).pow(U512::from(quote.decimals - CANONICAL_DECIMALS));
            wide / scale
        };
        let value = U256::try_from(rescaled).map_err(|_| Error::Overflow)?;
        Ok(NormalizedValue(value))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("no price feed registered for {0}")]
    FeedMissing(Currency),
    #[error("price feed for {0} reported a non-positive or stale price")]
    StaleOrInvalidPrice(Currency),
    #[error("normalized value does not fit into 256 bits")]
    Overflow,
}
