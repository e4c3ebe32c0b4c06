//! The auction factory.
//!
//! Creates auction instances bound to one shared logic beacon, keeps the
//! append-only registry, owns the fee policy and the price feed registry,
//! and proxies administrative calls to the instances. The factory never
//! holds escrow itself; it only validates and forwards.

use {
    auction::{Auction, Beacon, Bid, Deposit, Env, Logic, State},
    domain::{Address, AuctionId, ChainId, Currency, Custody, Timestamp},
    mirror::{Channel, Message, Mirror, NoopChannel},
    primitive_types::U256,
    std::{collections::HashMap, sync::Arc},
    thiserror::Error,
};

pub struct Factory {
    admin: Address,
    beacon: Arc<Beacon>,
    auctions: Vec<Auction>,
    fees: fee::Policy,
    feeds: prices::Feeds,
    mirrors: HashMap<AuctionId, Mirror>,
    channel: Arc<dyn Channel>,
}

impl Factory {
    /// A factory without cross-chain mirroring.
    pub fn new(admin: Address, logic: Box<dyn Logic>) -> Self {
        Self::with_channel(admin, logic, Arc::new(NoopChannel))
    }

    /// A factory whose auctions can be mirrored through the given message
    /// channel.
    pub fn with_channel(
        admin: Address,
        logic: Box<dyn Logic>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            admin,
            beacon: Arc::new(Beacon::new(admin, logic)),
            auctions: Vec::new(),
            fees: fee::Policy::default(),
            feeds: prices::Feeds::new(),
            mirrors: HashMap::new(),
            channel,
        }
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Version of the logic currently served by the beacon.
    pub fn version(&self) -> &'static str {
        self.beacon.version()
    }

    /// Creates a new auction for `seller` with this factory as admin and
    /// appends it to the registry. Ids are sequential and never reused.
    pub fn create_auction(&mut self, seller: Address) -> AuctionId {
        let id = AuctionId(self.auctions.len() as u64);
        let state = State::new(id, seller, self.admin);
        self.auctions.push(Auction::new(state, self.beacon.clone()));
        tracing::info!(%id, %seller, "auction created");
        id
    }

    pub fn auction_count(&self) -> usize {
        self.auctions.len()
    }

    pub fn auction(&self, id: AuctionId) -> Result<&Auction, Error> {
        self.auctions
            .get(id.0 as usize)
            .ok_or(Error::AuctionNotFound(id))
    }

    /// Registers (or replaces) the price feed for a currency. Admin only.
    pub fn register_price_feed(
        &mut self,
        caller: Address,
        currency: Currency,
        feed: Arc<dyn prices::PriceFeed>,
    ) -> Result<(), Error> {
        self.ensure_admin(caller)?;
        self.feeds.register(currency, feed);
        Ok(())
    }

    /// Deposits the asset into an auction. Allowed for that auction's
    /// seller or the factory admin.
    pub fn deposit_nft(
        &mut self,
        caller: Address,
        now: Timestamp,
        custody: &mut dyn Custody,
        id: AuctionId,
        call: Deposit,
    ) -> Result<(), Error> {
        {
            let fees = &self.fees;
            let feeds = &self.feeds;
            let auction = lookup_mut(&mut self.auctions, id)?;
            if caller != auction.state().seller() && caller != self.admin {
                return Err(auction::Error::Unauthorized.into());
            }
            let mut env = Env {
                caller,
                now,
                custody,
                feeds,
                fees,
            };
            auction.deposit(&mut env, call)?;
        }
        self.broadcast_state(id);
        Ok(())
    }

    /// Submits a bid. `bidder` is the account escrow is pulled from.
    pub fn place_bid(
        &mut self,
        bidder: Address,
        now: Timestamp,
        custody: &mut dyn Custody,
        id: AuctionId,
        amount: U256,
        currency: Currency,
    ) -> Result<(), Error> {
        {
            let fees = &self.fees;
            let feeds = &self.feeds;
            let auction = lookup_mut(&mut self.auctions, id)?;
            let mut env = Env {
                caller: bidder,
                now,
                custody,
                feeds,
                fees,
            };
            auction.bid(
                &mut env,
                Bid {
                    bidder,
                    amount,
                    currency,
                },
            )?;
        }
        self.broadcast_state(id);
        Ok(())
    }

    /// Ends an auction, settling it against the highest bid if one exists.
    /// Admin only when called through the factory.
    pub fn end_auction(
        &mut self,
        caller: Address,
        now: Timestamp,
        custody: &mut dyn Custody,
        id: AuctionId,
    ) -> Result<(), Error> {
        self.ensure_admin(caller)?;
        {
            let fees = &self.fees;
            let feeds = &self.feeds;
            let auction = lookup_mut(&mut self.auctions, id)?;
            let mut env = Env {
                caller,
                now,
                custody,
                feeds,
                fees,
            };
            auction.end(&mut env)?;
        }
        self.broadcast_state(id);
        Ok(())
    }

    /// Withdraws an auction's retained native-currency fees to the admin.
    pub fn withdraw_fee_from_auction(
        &mut self,
        caller: Address,
        now: Timestamp,
        custody: &mut dyn Custody,
        id: AuctionId,
    ) -> Result<U256, Error> {
        self.withdraw(caller, now, custody, id, Currency::Native)
    }

    /// Withdraws an auction's retained fees in the given token.
    pub fn withdraw_token_fee_from_auction(
        &mut self,
        caller: Address,
        now: Timestamp,
        custody: &mut dyn Custody,
        id: AuctionId,
        token: Address,
    ) -> Result<U256, Error> {
        self.withdraw(caller, now, custody, id, Currency::Token(token))
    }

    /// Sweeps the retained native-currency fees of every auction in the
    /// registry in one administrative action. Auctions with nothing
    /// retained are skipped, not treated as errors. Returns the total.
    pub fn withdraw_all_native_fees(
        &mut self,
        caller: Address,
        now: Timestamp,
        custody: &mut dyn Custody,
    ) -> Result<U256, Error> {
        self.ensure_admin(caller)?;
        let fees = &self.fees;
        let feeds = &self.feeds;
        let mut total = U256::zero();
        let mut swept = 0usize;
        for auction in &mut self.auctions {
            if auction.state().retained(Currency::Native).is_zero() {
                continue;
            }
            let mut env = Env {
                caller,
                now,
                custody: &mut *custody,
                feeds,
                fees,
            };
            total += auction.withdraw_fee(&mut env, Currency::Native)?;
            swept += 1;
        }
        tracing::info!(%total, swept, "native fees swept");
        Ok(total)
    }

    fn withdraw(
        &mut self,
        caller: Address,
        now: Timestamp,
        custody: &mut dyn Custody,
        id: AuctionId,
        currency: Currency,
    ) -> Result<U256, Error> {
        self.ensure_admin(caller)?;
        let fees = &self.fees;
        let feeds = &self.feeds;
        let auction = lookup_mut(&mut self.auctions, id)?;
        let mut env = Env {
            caller,
            now,
            custody,
            feeds,
            fees,
        };
        Ok(auction.withdraw_fee(&mut env, currency)?)
    }

    /// Sets the fee rate override for one auction. Admin only.
    pub fn set_auction_fee_rate(
        &mut self,
        caller: Address,
        id: AuctionId,
        rate_bps: u16,
    ) -> Result<(), Error> {
        self.ensure_admin(caller)?;
        self.auction(id)?;
        let rate = fee::Bps::new(rate_bps)?;
        self.fees.set_override(id, rate);
        Ok(())
    }

    /// Sets the default fee rate for the whole fleet. Admin only.
    pub fn set_global_fee_rate(&mut self, caller: Address, rate_bps: u16) -> Result<(), Error> {
        self.ensure_admin(caller)?;
        let rate = fee::Bps::new(rate_bps)?;
        self.fees.set_default_rate(rate);
        Ok(())
    }

    /// The rate that currently applies to an auction.
    pub fn auction_fee_rate(&self, id: AuctionId) -> Result<fee::Bps, Error> {
        self.auction(id)?;
        Ok(self.fees.effective_rate(id))
    }

    /// Swaps the beacon to new logic for all existing and future
    /// instances. Admin only; the beacon logs the version transition.
    pub fn upgrade_beacon(&self, caller: Address, new_logic: Box<dyn Logic>) -> Result<(), Error> {
        Ok(self.beacon.upgrade(caller, new_logic)?)
    }

    /// Registers the remote bid proxy serving `chain` for one auction.
    pub fn register_bid_proxy(
        &mut self,
        caller: Address,
        id: AuctionId,
        chain: ChainId,
        proxy: Address,
    ) -> Result<(), Error> {
        self.auction(id)?;
        let mirror = self
            .mirrors
            .entry(id)
            .or_insert_with(|| Mirror::new(self.admin, id, self.channel.clone()));
        mirror.register_bid_proxy(caller, chain, proxy)?;
        Ok(())
    }

    /// Broadcasts an auction's current snapshot to one remote chain.
    pub fn broadcast_auction_item(&self, id: AuctionId, chain: ChainId) -> Result<(), Error> {
        let auction = self.auction(id)?;
        let mirror = self
            .mirrors
            .get(&id)
            .ok_or(mirror::Error::ChainNotRegistered(chain))?;
        let snapshot = auction.snapshot(self.fees.effective_rate(id));
        mirror.broadcast(chain, snapshot)?;
        Ok(())
    }

    /// Receive callback for the message channel: handles bids relayed
    /// from remote chains. A relayed bid that fails origin-side
    /// validation is reported back to the chain it came from rather than
    /// silently dropped.
    pub fn handle_inbound(
        &mut self,
        chain: ChainId,
        payload: &[u8],
        now: Timestamp,
        custody: &mut dyn Custody,
    ) -> Result<(), Error> {
        match Message::decode(payload)? {
            Message::RelayBid { auction, bid } => {
                match self.place_bid(bid.bidder, now, custody, auction, bid.amount, bid.currency) {
                    Ok(()) => {}
                    Err(err) => {
                        tracing::warn!(%auction, %chain, %err, "relayed bid rejected");
                        if let Some(mirror) = self.mirrors.get(&auction) {
                            let _ = mirror.report_rejection(chain, bid.bidder, err.to_string());
                        }
                    }
                }
                Ok(())
            }
            other => {
                tracing::debug!(?other, %chain, "ignoring non-relay payload");
                Ok(())
            }
        }
    }

    fn ensure_admin(&self, caller: Address) -> Result<(), Error> {
        if caller != self.admin {
            return Err(auction::Error::Unauthorized.into());
        }
        Ok(())
    }

    fn broadcast_state(&self, id: AuctionId) {
        let Some(mirror) = self.mirrors.get(&id) else {
            return;
        };
        let Ok(auction) = self.auction(id) else {
            return;
        };
        mirror.broadcast_all(&auction.snapshot(self.fees.effective_rate(id)));
    }
}

fn lookup_mut(auctions: &mut [Auction], id: AuctionId) -> Result<&mut Auction, Error> {
    auctions
        .get_mut(id.0 as usize)
        .ok_or(Error::AuctionNotFound(id))
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("auction {0} does not exist")]
    AuctionNotFound(AuctionId),
    #[error(transparent)]
    Auction(#[from] auction::Error),
    #[error(transparent)]
    Fee(#[from] fee::Error),
    #[error(transparent)]
    Mirror(#[from] mirror::Error),
}
