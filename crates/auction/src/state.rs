use {
    domain::{Address, AssetId, AuctionId, Collection, Currency, Timestamp},
    primitive_types::U256,
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// The persisted data of one auction instance.
///
/// Invariants: `deposited` and `ended` each latch to `true` at most once
/// and `ended` is terminal; `highest_bid`, `highest_bidder` and
/// `bid_currency` only ever change together. All mutation happens in the
/// logic module; the rest of the workspace reads through the accessors.
#[derive(Debug, Clone)]
pub struct State {
    pub(crate) id: AuctionId,
    pub(crate) seller: Address,
    pub(crate) admin: Address,
    /// This instance's own custody account. Holds the escrowed asset, the
    /// current high bid and any retained fees.
    pub(crate) escrow: Address,
    pub(crate) collection: Option<Collection>,
    pub(crate) asset: Option<AssetId>,
    pub(crate) bid_currency: Currency,
    pub(crate) start_price: U256,
    pub(crate) start_time: Timestamp,
    pub(crate) duration_secs: u64,
    pub(crate) highest_bid: U256,
    pub(crate) highest_bidder: Option<Address>,
    pub(crate) deposited: bool,
    pub(crate) ended: bool,
    /// Fee balances credited at settlement, per currency. The only funds
    /// a withdrawal may touch; the live high-bid escrow stays reserved
    /// for refunds.
    pub(crate) retained: HashMap<Currency, U256>,
}

impl State {
    pub fn new(id: AuctionId, seller: Address, admin: Address) -> Self {
        Self {
            id,
            seller,
            admin,
            escrow: Address::escrow(id),
            collection: None,
            asset: None,
            bid_currency: Currency::Native,
            start_price: U256::zero(),
            start_time: Timestamp::default(),
            duration_secs: 0,
            highest_bid: U256::zero(),
            highest_bidder: None,
            deposited: false,
            ended: false,
            retained: HashMap::new(),
        }
    }

    pub fn id(&self) -> AuctionId {
        self.id
    }

    pub fn seller(&self) -> Address {
        self.seller
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn escrow(&self) -> Address {
        self.escrow
    }

    pub fn collection(&self) -> Option<Collection> {
        self.collection
    }

    pub fn asset(&self) -> Option<AssetId> {
        self.asset
    }

    pub fn bid_currency(&self) -> Currency {
        self.bid_currency
    }

    pub fn start_price(&self) -> U256 {
        self.start_price
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// The bidding deadline. Bids at or after this instant are rejected.
    pub fn end_time(&self) -> Timestamp {
        self.start_time.plus_secs(self.duration_secs)
    }

    pub fn highest_bid(&self) -> U256 {
        self.highest_bid
    }

    pub fn highest_bidder(&self) -> Option<Address> {
        self.highest_bidder
    }

    pub fn deposited(&self) -> bool {
        self.deposited
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    /// The retained fee balance for a currency.
    pub fn retained(&self, currency: Currency) -> U256 {
        self.retained.get(&currency).copied().unwrap_or_default()
    }

    pub(crate) fn deadline_passed(&self, now: Timestamp) -> bool {
        now >= self.end_time()
    }

    pub fn snapshot(&self, fee_rate: fee::Bps) -> Snapshot {
        Snapshot {
            seller: self.seller,
            highest_bidder: self.highest_bidder,
            collection: self.collection,
            bid_currency: self.bid_currency,
            start_price: self.start_price,
            start_time: self.start_time,
            end_time: self.end_time(),
            asset: self.asset,
            highest_bid: self.highest_bid,
            fee_rate,
            deposited: self.deposited,
            ended: self.ended,
        }
    }
}

/// The public fields of an auction as broadcast to remote mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub seller: Address,
    pub highest_bidder: Option<Address>,
    pub collection: Option<Collection>,
    pub bid_currency: Currency,
    pub start_price: U256,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub asset: Option<AssetId>,
    pub highest_bid: U256,
    pub fee_rate: fee::Bps,
    pub deposited: bool,
    pub ended: bool,
}
