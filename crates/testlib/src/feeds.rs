use {
    domain::Timestamp,
    prices::{PriceFeed, Quote},
    std::sync::{Arc, Mutex},
};

/// A feed returning a settable fixed quote, like the mock aggregators the
/// production system is configured with in local deployments.
pub struct FixedPriceFeed {
    quote: Mutex<Quote>,
}

impl FixedPriceFeed {
    pub fn new(price: i128, decimals: u32) -> Arc<Self> {
        Arc::new(Self {
            quote: Mutex::new(Quote {
                price,
                decimals,
                updated_at: Timestamp(0),
            }),
        })
    }

    pub fn set_price(&self, price: i128) {
        self.quote.lock().unwrap().price = price;
    }

    pub fn set_updated_at(&self, updated_at: Timestamp) {
        self.quote.lock().unwrap().updated_at = updated_at;
    }
}

impl PriceFeed for FixedPriceFeed {
    fn latest(&self) -> Quote {
        *self.quote.lock().unwrap()
    }
}
