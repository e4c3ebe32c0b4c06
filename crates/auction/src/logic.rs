//! The auction behavior resolved through the beacon.
//!
//! Every operation validates and plans its custody movements before any
//! state mutation; the custody execution is atomic by contract, so a
//! failure anywhere aborts the call with zero side effects.

use {
    crate::{Bid, Deposit, Env, Error, state::State},
    domain::{AssetTransfer, Currency, FundTransfer, Settlement},
    primitive_types::U256,
};

/// Auction behavior. Implementations are interchangeable: instances hold
/// only data, so pointing the beacon at a new implementation upgrades the
/// whole fleet at once. Callers can detect the active implementation
/// through [`Logic::version`].
pub trait Logic: Send + Sync {
    fn version(&self) -> &'static str;

    fn deposit(&self, state: &mut State, env: &mut Env, call: Deposit) -> Result<(), Error>;

    fn bid(&self, state: &mut State, env: &mut Env, call: Bid) -> Result<(), Error>;

    fn end(&self, state: &mut State, env: &mut Env) -> Result<(), Error>;

    fn withdraw_fee(
        &self,
        state: &mut State,
        env: &mut Env,
        currency: Currency,
    ) -> Result<U256, Error>;
}

/// The production auction state machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct Standard;

impl Logic for Standard {
    fn version(&self) -> &'static str {
        "1.0.0"
    }

    fn deposit(&self, state: &mut State, env: &mut Env, call: Deposit) -> Result<(), Error> {
        if env.caller != state.seller && env.caller != state.admin {
            return Err(Error::Unauthorized);
        }
        if state.deposited {
            return Err(Error::AlreadyDeposited);
        }
        let collection = call.collection.ok_or(Error::MissingCollection)?;

        let owner = env.custody.owner_of(collection, call.asset)?;
        env.custody.execute(&Settlement {
            assets: vec![AssetTransfer {
                collection,
                asset: call.asset,
                from: owner,
                to: state.escrow,
            }],
            funds: vec![],
        })?;

        state.collection = Some(collection);
        state.asset = Some(call.asset);
        state.start_price = call.start_price;
        state.duration_secs = call.duration_secs;
        state.start_time = env.now;
        state.deposited = true;
        tracing::info!(
            auction = %state.id,
            asset = %call.asset,
            start_price = %call.start_price,
            duration_secs = call.duration_secs,
            "asset deposited, bidding open"
        );
        Ok(())
    }

    fn bid(&self, state: &mut State, env: &mut Env, call: Bid) -> Result<(), Error> {
        if !state.deposited {
            return Err(Error::NotDeposited);
        }
        if state.ended || state.deadline_passed(env.now) {
            return Err(Error::AuctionEnded);
        }

        let offered = env.feeds.normalize(call.currency, call.amount, env.now)?;
        let floor = match state.highest_bidder {
            Some(_) => env
                .feeds
                .normalize(state.bid_currency, state.highest_bid, env.now)?,
            None => env
                .feeds
                .normalize(Currency::Native, state.start_price, env.now)?,
        };
        // Strictly greater: ties would make the winner ambiguous, and the
        // first bid must beat the start price, not meet it.
        if offered <= floor {
            return Err(Error::InsufficientBid);
        }

        let mut funds = vec![FundTransfer {
            currency: call.currency,
            from: call.bidder,
            to: state.escrow,
            amount: call.amount,
        }];
        if let Some(previous) = state.highest_bidder {
            funds.push(FundTransfer {
                currency: state.bid_currency,
                from: state.escrow,
                to: previous,
                amount: state.highest_bid,
            });
        }
        env.custody.execute(&Settlement {
            assets: vec![],
            funds,
        })?;

        state.highest_bid = call.amount;
        state.highest_bidder = Some(call.bidder);
        state.bid_currency = call.currency;
        tracing::info!(
            auction = %state.id,
            bidder = %call.bidder,
            amount = %call.amount,
            currency = %call.currency,
            "bid accepted"
        );
        Ok(())
    }

    fn end(&self, state: &mut State, env: &mut Env) -> Result<(), Error> {
        if env.caller != state.seller && env.caller != state.admin {
            return Err(Error::Unauthorized);
        }
        if state.ended {
            return Err(Error::AlreadyEnded);
        }

        match state.highest_bidder {
            Some(winner) => {
                // Bids require a deposit, so the asset fields are set.
                let (Some(collection), Some(asset)) = (state.collection, state.asset) else {
                    return Err(Error::NotDeposited);
                };
                let split = env.fees.split(state.id, state.highest_bid);
                env.custody.execute(&Settlement {
                    assets: vec![AssetTransfer {
                        collection,
                        asset,
                        from: state.escrow,
                        to: winner,
                    }],
                    funds: vec![FundTransfer {
                        currency: state.bid_currency,
                        from: state.escrow,
                        to: state.seller,
                        amount: split.seller,
                    }],
                })?;
                *state.retained.entry(state.bid_currency).or_default() += split.fee;
                tracing::info!(
                    auction = %state.id,
                    winner = %winner,
                    gross = %state.highest_bid,
                    seller_amount = %split.seller,
                    fee = %split.fee,
                    "auction settled"
                );
            }
            None => {
                if let (Some(collection), Some(asset)) = (state.collection, state.asset) {
                    env.custody.execute(&Settlement {
                        assets: vec![AssetTransfer {
                            collection,
                            asset,
                            from: state.escrow,
                            to: state.seller,
                        }],
                        funds: vec![],
                    })?;
                }
                tracing::info!(auction = %state.id, "auction ended without bids");
            }
        }
        state.ended = true;
        Ok(())
    }

    fn withdraw_fee(
        &self,
        state: &mut State,
        env: &mut Env,
        currency: Currency,
    ) -> Result<U256, Error> {
        if env.caller != state.admin {
            return Err(Error::Unauthorized);
        }
        let amount = state.retained(currency);
        if amount.is_zero() {
            return Err(Error::NoBalance);
        }
        env.custody.execute(&Settlement {
            assets: vec![],
            funds: vec![FundTransfer {
                currency,
                from: state.escrow,
                to: state.admin,
                amount,
            }],
        })?;
        state.retained.remove(&currency);
        tracing::info!(auction = %state.id, %currency, %amount, "fees withdrawn");
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{Auction, Beacon, Deposit},
        domain::{Address, AssetId, AuctionId, Collection, Custody, Timestamp},
        std::sync::Arc,
        testlib::{addr, custody::InMemoryCustody, feeds::FixedPriceFeed},
    };

    /// 2000 USD per ETH, 8 quote decimals.
    const ETH_USD: i128 = 2_000_00000000;
    /// 1 USD per MERC.
    const MERC_USD: i128 = 1_00000000;

    struct Setup {
        custody: InMemoryCustody,
        feeds: prices::Feeds,
        fees: fee::Policy,
        auction: Auction,
        seller: Address,
        admin: Address,
        collection: Collection,
        asset: AssetId,
        merc: Currency,
    }

    fn setup() -> Setup {
        let seller = addr(1);
        let admin = addr(2);
        let collection = Collection(addr(40));
        let asset = AssetId::from(7u64);
        let merc = Currency::Token(addr(41));

        let mut custody = InMemoryCustody::new();
        custody.mint_asset(collection, asset, seller);

        let mut feeds = prices::Feeds::new();
        feeds.register(Currency::Native, FixedPriceFeed::new(ETH_USD, 8));
        feeds.register(merc, FixedPriceFeed::new(MERC_USD, 8));

        let beacon = Arc::new(Beacon::new(admin, Box::new(Standard)));
        let auction = Auction::new(State::new(AuctionId(0), seller, admin), beacon);
        Setup {
            custody,
            feeds,
            fees: fee::Policy::default(),
            auction,
            seller,
            admin,
            collection,
            asset,
            merc,
        }
    }

    fn eth(amount: f64) -> U256 {
        U256::from((amount * 1e6) as u64) * U256::exp10(12)
    }

    impl Setup {
        fn deposit(&mut self, caller: Address, now: u64) -> Result<(), Error> {
            let mut env = Env {
                caller,
                now: Timestamp(now),
                custody: &mut self.custody,
                feeds: &self.feeds,
                fees: &self.fees,
            };
            self.auction.deposit(
                &mut env,
                Deposit {
                    asset: self.asset,
                    duration_secs: 3600,
                    collection: Some(self.collection),
                    start_price: eth(0.01),
                },
            )
        }

        fn bid(
            &mut self,
            bidder: Address,
            amount: U256,
            currency: Currency,
            now: u64,
        ) -> Result<(), Error> {
            let mut env = Env {
                caller: bidder,
                now: Timestamp(now),
                custody: &mut self.custody,
                feeds: &self.feeds,
                fees: &self.fees,
            };
            self.auction.bid(
                &mut env,
                Bid {
                    bidder,
                    amount,
                    currency,
                },
            )
        }

        fn end(&mut self, caller: Address, now: u64) -> Result<(), Error> {
            let mut env = Env {
                caller,
                now: Timestamp(now),
                custody: &mut self.custody,
                feeds: &self.feeds,
                fees: &self.fees,
            };
            self.auction.end(&mut env)
        }

        fn withdraw(&mut self, caller: Address, currency: Currency) -> Result<U256, Error> {
            let mut env = Env {
                caller,
                now: Timestamp(10_000),
                custody: &mut self.custody,
                feeds: &self.feeds,
                fees: &self.fees,
            };
            self.auction.withdraw_fee(&mut env, currency)
        }
    }

    #[test]
    fn deposit_moves_the_asset_into_escrow() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();

        let state = s.auction.state();
        assert!(state.deposited());
        assert_eq!(state.start_time(), Timestamp(1000));
        assert_eq!(state.end_time(), Timestamp(4600));
        assert_eq!(
            s.custody.owner_of(s.collection, s.asset).unwrap(),
            state.escrow()
        );
        assert_eq!(s.auction.version(), "1.0.0");
    }

    #[test]
    fn deposit_is_allowed_for_seller_or_admin_only() {
        let mut s = setup();
        assert_eq!(s.deposit(addr(9), 1000), Err(Error::Unauthorized));
        assert!(!s.auction.state().deposited());
        s.deposit(s.admin, 1000).unwrap();
    }

    #[test]
    fn deposit_happens_exactly_once() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        assert_eq!(s.deposit(s.seller, 1001), Err(Error::AlreadyDeposited));
        assert_eq!(s.auction.state().start_time(), Timestamp(1000));
    }

    #[test]
    fn deposit_requires_a_collection() {
        let mut s = setup();
        let mut env = Env {
            caller: s.seller,
            now: Timestamp(1000),
            custody: &mut s.custody,
            feeds: &s.feeds,
            fees: &s.fees,
        };
        let result = s.auction.deposit(
            &mut env,
            Deposit {
                asset: s.asset,
                duration_secs: 3600,
                collection: None,
                start_price: eth(0.01),
            },
        );
        assert_eq!(result, Err(Error::MissingCollection));
    }

    #[test]
    fn bids_before_deposit_are_rejected() {
        let mut s = setup();
        s.custody.fund(addr(5), Currency::Native, eth(1.0));
        assert_eq!(
            s.bid(addr(5), eth(0.02), Currency::Native, 1010),
            Err(Error::NotDeposited)
        );
    }

    #[test]
    fn first_bid_must_strictly_exceed_the_start_price() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        s.custody.fund(addr(5), Currency::Native, eth(1.0));

        assert_eq!(
            s.bid(addr(5), eth(0.01), Currency::Native, 1010),
            Err(Error::InsufficientBid)
        );
        assert_eq!(s.auction.state().highest_bidder(), None);

        s.bid(addr(5), eth(0.02), Currency::Native, 1010).unwrap();
        let state = s.auction.state();
        assert_eq!(state.highest_bidder(), Some(addr(5)));
        assert_eq!(state.highest_bid(), eth(0.02));
        assert_eq!(state.bid_currency(), Currency::Native);
        assert_eq!(s.custody.balance(state.escrow(), Currency::Native), eth(0.02));
        assert_eq!(s.custody.balance(addr(5), Currency::Native), eth(0.98));
    }

    #[test]
    fn lower_or_equal_bids_leave_the_highest_untouched() {
        let mut s = setup();
        let merc = s.merc;
        s.deposit(s.seller, 1000).unwrap();
        s.custody.fund(addr(5), Currency::Native, eth(1.0));
        s.custody.fund(addr(6), merc, eth(200.0));
        s.bid(addr(5), eth(0.02), Currency::Native, 1010).unwrap();

        // 40 MERC at 1 USD equals 0.02 ETH at 2000 USD. Equality loses.
        assert_eq!(
            s.bid(addr(6), eth(40.0), merc, 1020),
            Err(Error::InsufficientBid)
        );
        assert_eq!(
            s.bid(addr(6), eth(30.0), merc, 1020),
            Err(Error::InsufficientBid)
        );
        assert_eq!(s.auction.state().highest_bidder(), Some(addr(5)));
        assert_eq!(s.auction.state().highest_bid(), eth(0.02));
        assert_eq!(s.custody.balance(addr(6), merc), eth(200.0));
    }

    #[test]
    fn outbid_refunds_the_previous_bidder_in_full() {
        let mut s = setup();
        let merc = s.merc;
        s.deposit(s.seller, 1000).unwrap();
        s.custody.fund(addr(5), Currency::Native, eth(1.0));
        s.custody.fund(addr(6), merc, eth(200.0));

        s.bid(addr(5), eth(0.02), Currency::Native, 1010).unwrap();
        s.bid(addr(6), eth(100.0), merc, 1020).unwrap();

        let state = s.auction.state();
        assert_eq!(state.highest_bidder(), Some(addr(6)));
        assert_eq!(state.highest_bid(), eth(100.0));
        assert_eq!(state.bid_currency(), merc);
        // The ETH bidder is whole again; escrow holds only the MERC bid.
        assert_eq!(s.custody.balance(addr(5), Currency::Native), eth(1.0));
        assert_eq!(s.custody.balance(state.escrow(), Currency::Native), U256::zero());
        assert_eq!(s.custody.balance(state.escrow(), merc), eth(100.0));
    }

    #[test]
    fn bids_at_or_after_the_deadline_fail_without_fund_movement() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        s.custody.fund(addr(5), Currency::Native, eth(1.0));

        s.bid(addr(5), eth(0.02), Currency::Native, 4599).unwrap();
        assert_eq!(
            s.bid(addr(5), eth(0.5), Currency::Native, 4600),
            Err(Error::AuctionEnded)
        );
        assert_eq!(s.auction.state().highest_bid(), eth(0.02));
        assert_eq!(s.custody.balance(addr(5), Currency::Native), eth(0.98));
    }

    #[test]
    fn bids_in_unregistered_currencies_are_rejected() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        let unknown = Currency::Token(addr(99));
        s.custody.fund(addr(5), unknown, eth(1.0));
        assert_eq!(
            s.bid(addr(5), eth(0.5), unknown, 1010),
            Err(Error::Price(prices::Error::FeedMissing(unknown)))
        );
    }

    #[test]
    fn underfunded_bids_change_nothing() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        s.custody.fund(addr(5), Currency::Native, eth(0.01));
        assert!(matches!(
            s.bid(addr(5), eth(0.02), Currency::Native, 1010),
            Err(Error::Custody(domain::custody::Error::InsufficientFunds { .. }))
        ));
        let state = s.auction.state();
        assert_eq!(state.highest_bidder(), None);
        assert_eq!(s.custody.balance(addr(5), Currency::Native), eth(0.01));
        assert_eq!(s.custody.balance(state.escrow(), Currency::Native), U256::zero());
    }

    #[test]
    fn end_settles_asset_and_funds_atomically() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        s.custody.fund(addr(5), Currency::Native, eth(1.0));
        s.bid(addr(5), eth(0.02), Currency::Native, 1010).unwrap();

        s.end(s.seller, 5000).unwrap();

        let state = s.auction.state();
        assert!(state.ended());
        assert_eq!(s.custody.owner_of(s.collection, s.asset).unwrap(), addr(5));
        // 250 bps of 0.02 is 0.0005; the seller receives the rest.
        assert_eq!(s.custody.balance(s.seller, Currency::Native), eth(0.0195));
        assert_eq!(state.retained(Currency::Native), eth(0.0005));
        assert_eq!(s.custody.balance(state.escrow(), Currency::Native), eth(0.0005));
    }

    #[test]
    fn end_without_bids_returns_the_asset_and_moves_no_funds() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        s.end(s.admin, 5000).unwrap();

        assert_eq!(s.custody.owner_of(s.collection, s.asset).unwrap(), s.seller);
        assert_eq!(
            s.custody.balance(s.seller, Currency::Native),
            U256::zero()
        );
    }

    #[test]
    fn end_before_any_deposit_just_latches() {
        let mut s = setup();
        s.end(s.admin, 5000).unwrap();
        assert!(s.auction.state().ended());
        assert_eq!(s.custody.owner_of(s.collection, s.asset).unwrap(), s.seller);
    }

    #[test]
    fn end_is_terminal() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        s.custody.fund(addr(5), Currency::Native, eth(1.0));
        s.bid(addr(5), eth(0.02), Currency::Native, 1010).unwrap();
        s.end(s.seller, 5000).unwrap();

        assert_eq!(s.end(s.seller, 5001), Err(Error::AlreadyEnded));
        assert_eq!(
            s.bid(addr(5), eth(0.5), Currency::Native, 1030),
            Err(Error::AuctionEnded)
        );
        assert_eq!(s.custody.owner_of(s.collection, s.asset).unwrap(), addr(5));
    }

    #[test]
    fn end_requires_seller_or_admin() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        assert_eq!(s.end(addr(9), 5000), Err(Error::Unauthorized));
        assert!(!s.auction.state().ended());
    }

    #[test]
    fn fee_withdrawal_is_admin_only_and_drains_the_retained_balance() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        s.custody.fund(addr(5), Currency::Native, eth(1.0));
        s.bid(addr(5), eth(0.02), Currency::Native, 1010).unwrap();
        s.end(s.seller, 5000).unwrap();

        assert_eq!(
            s.withdraw(s.seller, Currency::Native),
            Err(Error::Unauthorized)
        );
        let merc = s.merc;
        assert_eq!(s.withdraw(s.admin, merc), Err(Error::NoBalance));

        let amount = s.withdraw(s.admin, Currency::Native).unwrap();
        assert_eq!(amount, eth(0.0005));
        assert_eq!(s.custody.balance(s.admin, Currency::Native), eth(0.0005));
        assert_eq!(s.auction.state().retained(Currency::Native), U256::zero());
        assert_eq!(
            s.withdraw(s.admin, Currency::Native),
            Err(Error::NoBalance)
        );
    }

    #[test]
    fn withdrawal_never_touches_the_live_bid_escrow() {
        let mut s = setup();
        s.deposit(s.seller, 1000).unwrap();
        s.custody.fund(addr(5), Currency::Native, eth(1.0));
        s.bid(addr(5), eth(0.02), Currency::Native, 1010).unwrap();

        // The escrow holds the live bid, but nothing is retained yet.
        assert_eq!(
            s.withdraw(s.admin, Currency::Native),
            Err(Error::NoBalance)
        );
        assert_eq!(
            s.custody.balance(s.auction.state().escrow(), Currency::Native),
            eth(0.02)
        );
    }
}
