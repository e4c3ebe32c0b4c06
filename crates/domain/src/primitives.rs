use {
    primitive_types::{H160, U256},
    serde::{Deserialize, Serialize},
};

/// An account identity on the settlement ledger.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct Address(pub H160);

impl Address {
    /// Deterministic address derived from a small integer. Used for test
    /// accounts and derived escrow accounts.
    pub fn from_low_u64(value: u64) -> Self {
        Self(H160::from_low_u64_be(value))
    }

    /// The escrow account owned by one auction instance. Lives in a
    /// reserved range that never collides with [`Self::from_low_u64`]
    /// accounts.
    pub fn escrow(auction: AuctionId) -> Self {
        let mut raw = [0u8; 20];
        raw[0] = 0xe5;
        raw[1] = 0xc0;
        raw[12..20].copy_from_slice(&auction.0.to_be_bytes());
        Self(H160(raw))
    }
}

impl From<H160> for Address {
    fn from(value: H160) -> Self {
        Self(value)
    }
}

impl From<Address> for H160 {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identifier of one non-fungible asset within a collection.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct AssetId(pub U256);

impl From<u64> for AssetId {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The non-fungible collection an escrowed asset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collection(pub Address);

impl From<Address> for Collection {
    fn from(value: Address) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bid denomination: the native settlement currency or a fungible token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Native,
    Token(Address),
}

impl Currency {
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Token(address) => write!(f, "{address}"),
        }
    }
}

/// Sequential auction identifier assigned by the factory. Append-only:
/// an id, once assigned, is never reused.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct AuctionId(pub u64);

impl std::fmt::Display for AuctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a remote chain participating in cross-chain mirroring.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct ChainId(pub u64);

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger time in seconds. State-changing operations receive the current
/// timestamp from the caller, like a block timestamp, which keeps the
/// serialized execution model free of any ambient clock.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn plus_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed since `earlier`, saturating at zero.
    pub fn secs_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bid amount converted into the canonical 18-decimal comparison unit.
///
/// Values are only comparable when both were produced by the same
/// normalization function; the price normalizer is the single place that
/// constructs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NormalizedValue(pub U256);

impl From<NormalizedValue> for U256 {
    fn from(value: NormalizedValue) -> Self {
        value.0
    }
}
