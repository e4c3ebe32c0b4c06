//! The per-instance auction state machine.
//!
//! An [`Auction`] holds nothing but data ([`State`]) and a handle to the
//! shared [`Beacon`]; its behavior is resolved through the beacon once per
//! call, so swapping the beacon pointer live-upgrades every instance at
//! once. The state machine itself lives in [`logic::Standard`].
//!
//! Lifecycle: created empty → populated by exactly one deposit → zero or
//! more bids while the window is open → exactly one terminal end.

pub mod beacon;
pub mod logic;
pub mod state;

pub use {
    beacon::Beacon,
    logic::{Logic, Standard},
    state::{Snapshot, State},
};

use {
    domain::{Address, AssetId, Collection, Currency, Custody, Timestamp},
    primitive_types::U256,
    serde::{Deserialize, Serialize},
    std::sync::Arc,
    thiserror::Error,
};

/// Per-call execution environment. The factory owns the fee policy and the
/// feed registry and passes them by reference; custody is the external
/// ledger collaborator.
pub struct Env<'a> {
    pub caller: Address,
    pub now: Timestamp,
    pub custody: &'a mut dyn Custody,
    pub feeds: &'a prices::Feeds,
    pub fees: &'a fee::Policy,
}

/// A deposit call: places the asset into escrow and opens the bidding
/// window at the current ledger time.
#[derive(Debug, Clone, Copy)]
pub struct Deposit {
    pub asset: AssetId,
    pub duration_secs: u64,
    pub collection: Option<Collection>,
    /// Denominated in the native reference currency.
    pub start_price: U256,
}

/// A bid call. `bidder` is the account escrow is pulled from; for relayed
/// cross-chain bids this is the remote bidder's origin-chain account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub bidder: Address,
    pub amount: U256,
    pub currency: Currency,
}

/// One auction instance: data plus the shared logic pointer.
pub struct Auction {
    state: State,
    beacon: Arc<Beacon>,
}

impl Auction {
    pub fn new(state: State, beacon: Arc<Beacon>) -> Self {
        Self { state, beacon }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Version of the logic currently active for this instance.
    pub fn version(&self) -> &'static str {
        self.beacon.version()
    }

    pub fn deposit(&mut self, env: &mut Env, call: Deposit) -> Result<(), Error> {
        self.beacon.current().deposit(&mut self.state, env, call)
    }

    pub fn bid(&mut self, env: &mut Env, call: Bid) -> Result<(), Error> {
        self.beacon.current().bid(&mut self.state, env, call)
    }

    pub fn end(&mut self, env: &mut Env) -> Result<(), Error> {
        self.beacon.current().end(&mut self.state, env)
    }

    /// Withdraws the entire retained fee balance of `currency` to the
    /// admin. Returns the withdrawn amount.
    pub fn withdraw_fee(&mut self, env: &mut Env, currency: Currency) -> Result<U256, Error> {
        self.beacon
            .current()
            .withdraw_fee(&mut self.state, env, currency)
    }

    /// The public field snapshot broadcast to remote mirrors.
    pub fn snapshot(&self, fee_rate: fee::Bps) -> Snapshot {
        self.state.snapshot(fee_rate)
    }
}

impl std::fmt::Debug for Auction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auction")
            .field("state", &self.state)
            .field("version", &self.version())
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("caller is not authorized for this operation")]
    Unauthorized,
    #[error("the asset was already deposited")]
    AlreadyDeposited,
    #[error("no asset has been deposited")]
    NotDeposited,
    #[error("a collection is required to deposit an asset")]
    MissingCollection,
    #[error("the bidding window is closed")]
    AuctionEnded,
    #[error("the auction has already been ended")]
    AlreadyEnded,
    #[error("bid does not exceed the current minimum")]
    InsufficientBid,
    #[error("no balance to withdraw")]
    NoBalance,
    #[error(transparent)]
    Price(#[from] prices::Error),
    #[error(transparent)]
    Custody(#[from] domain::custody::Error),
}
