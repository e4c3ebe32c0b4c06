//! Cross-chain state mirroring.
//!
//! An origin auction pushes snapshots of its public state to registered
//! bid proxies on remote chains; remote users bid against the mirror and
//! the proxy relays their bids back. Delivery is fire-and-forget over an
//! external message channel with no ordering guarantee across chains, so
//! mirrors are advisory and may transiently lag: the origin auction stays
//! the sole authority over bid acceptance.

use {
    auction::{Bid, Snapshot},
    domain::{Address, AuctionId, ChainId},
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, sync::Arc},
    thiserror::Error,
};

/// Wire payload exchanged between an origin auction and its remote proxies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Origin → proxy: the auction's public state at broadcast time.
    AuctionState {
        auction: AuctionId,
        snapshot: Snapshot,
    },
    /// Proxy → origin: a bid submitted on the remote chain.
    RelayBid { auction: AuctionId, bid: Bid },
    /// Origin → proxy: a relayed bid failed origin-side validation.
    BidRejected {
        auction: AuctionId,
        bidder: Address,
        reason: String,
    },
}

impl Message {
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("message serialization is infallible")
    }

    pub fn decode(payload: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(payload).map_err(Error::Decode)
    }
}

/// Outbound half of the external message relay. `send` must not block;
/// delivery is eventual and unordered across chains.
pub trait Channel: Send + Sync {
    fn send(&self, chain: ChainId, payload: Vec<u8>);
}

/// A channel that drops every payload. The default for deployments that
/// never register a remote proxy.
pub struct NoopChannel;

impl Channel for NoopChannel {
    fn send(&self, _chain: ChainId, _payload: Vec<u8>) {}
}

/// Origin-side mirror of one auction: tracks which proxy serves each
/// remote chain and pushes snapshots through the channel.
pub struct Mirror {
    admin: Address,
    auction: AuctionId,
    proxies: HashMap<ChainId, Address>,
    channel: Arc<dyn Channel>,
}

impl Mirror {
    pub fn new(admin: Address, auction: AuctionId, channel: Arc<dyn Channel>) -> Self {
        Self {
            admin,
            auction,
            proxies: HashMap::new(),
            channel,
        }
    }

    /// Registers the bid proxy serving a remote chain. One proxy per
    /// chain; registering again overwrites. Admin only.
    pub fn register_bid_proxy(
        &mut self,
        caller: Address,
        chain: ChainId,
        proxy: Address,
    ) -> Result<(), Error> {
        if caller != self.admin {
            return Err(Error::Unauthorized);
        }
        tracing::info!(auction = %self.auction, %chain, %proxy, "bid proxy registered");
        self.proxies.insert(chain, proxy);
        Ok(())
    }

    pub fn proxy(&self, chain: ChainId) -> Option<Address> {
        self.proxies.get(&chain).copied()
    }

    pub fn registered_chains(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.proxies.keys().copied()
    }

    /// Serializes the snapshot and sends it to the proxy registered for
    /// `chain`.
    pub fn broadcast(&self, chain: ChainId, snapshot: Snapshot) -> Result<(), Error> {
        if !self.proxies.contains_key(&chain) {
            return Err(Error::ChainNotRegistered(chain));
        }
        tracing::debug!(auction = %self.auction, %chain, "broadcasting auction state");
        self.channel.send(
            chain,
            Message::AuctionState {
                auction: self.auction,
                snapshot,
            }
            .encode(),
        );
        Ok(())
    }

    /// Sends the snapshot to every registered chain. Called after each
    /// state-changing operation so mirrors converge on the origin.
    pub fn broadcast_all(&self, snapshot: &Snapshot) {
        for chain in self.registered_chains() {
            // Registration was just checked by iterating, so this only
            // fails if the set changed underneath us, which it cannot.
            let _ = self.broadcast(chain, snapshot.clone());
        }
    }

    /// Reports a rejected relayed bid back to the chain it came from.
    pub fn report_rejection(
        &self,
        chain: ChainId,
        bidder: Address,
        reason: String,
    ) -> Result<(), Error> {
        if !self.proxies.contains_key(&chain) {
            return Err(Error::ChainNotRegistered(chain));
        }
        self.channel.send(
            chain,
            Message::BidRejected {
                auction: self.auction,
                bidder,
                reason,
            }
            .encode(),
        );
        Ok(())
    }
}

/// Remote-chain read replica of one auction plus the relay point for
/// remote bid submissions. Never authoritative: the origin validates every
/// relayed bid itself.
pub struct BidProxy {
    origin_chain: ChainId,
    auction: AuctionId,
    snapshot: Option<Snapshot>,
    rejections: Vec<(Address, String)>,
    channel: Arc<dyn Channel>,
}

impl BidProxy {
    pub fn new(origin_chain: ChainId, auction: AuctionId, channel: Arc<dyn Channel>) -> Self {
        Self {
            origin_chain,
            auction,
            snapshot: None,
            rejections: Vec::new(),
            channel,
        }
    }

    /// The latest mirrored state, if any broadcast arrived yet.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Rejection notices relayed back from the origin.
    pub fn rejections(&self) -> &[(Address, String)] {
        &self.rejections
    }

    /// Relays a local bid submission to the origin auction.
    pub fn submit_bid(&self, bid: Bid) {
        tracing::debug!(
            auction = %self.auction,
            bidder = %bid.bidder,
            amount = %bid.amount,
            "relaying bid to origin chain"
        );
        self.channel.send(
            self.origin_chain,
            Message::RelayBid {
                auction: self.auction,
                bid,
            }
            .encode(),
        );
    }

    /// Receive callback invoked by the channel when a message arrives on
    /// this proxy's chain. Messages for other auctions are ignored.
    pub fn on_message(&mut self, payload: &[u8]) -> Result<(), Error> {
        match Message::decode(payload)? {
            Message::AuctionState { auction, snapshot } if auction == self.auction => {
                self.snapshot = Some(snapshot);
            }
            Message::BidRejected {
                auction,
                bidder,
                reason,
            } if auction == self.auction => {
                tracing::warn!(%auction, %bidder, %reason, "origin rejected relayed bid");
                self.rejections.push((bidder, reason));
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("caller is not authorized for this operation")]
    Unauthorized,
    #[error("no bid proxy registered for chain {0}")]
    ChainNotRegistered(ChainId),
    #[error("malformed mirror payload: {0}")]
    Decode(#[from] serde_json::Error),
}
