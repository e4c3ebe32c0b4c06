//! The boundary to the external asset and currency implementations.
//!
//! The ledger behind [`Custody`] owns every balance; the auction core only
//! plans movements and submits them as one [`Settlement`]. Execution is
//! all-or-nothing by contract: either every transfer in the plan applies or
//! the ledger is left untouched and the enclosing call aborts.

use {
    super::primitives::{Address, AssetId, Collection, Currency},
    primitive_types::U256,
    thiserror::Error,
};

/// One fungible value movement between ledger accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundTransfer {
    pub currency: Currency,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

/// One non-fungible custody transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetTransfer {
    pub collection: Collection,
    pub asset: AssetId,
    pub from: Address,
    pub to: Address,
}

/// The complete movement plan of one auction operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    pub assets: Vec<AssetTransfer>,
    pub funds: Vec<FundTransfer>,
}

impl Settlement {
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty() && self.funds.is_empty()
    }
}

/// External custody of assets and funds.
pub trait Custody {
    /// The current holder of an asset.
    fn owner_of(&self, collection: Collection, asset: AssetId) -> Result<Address, Error>;

    /// The current balance of an account in the given currency.
    fn balance_of(&self, account: Address, currency: Currency) -> U256;

    /// Applies the whole settlement atomically.
    fn execute(&mut self, settlement: &Settlement) -> Result<(), Error>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("asset {asset} is not known to collection {collection}")]
    UnknownAsset {
        collection: Collection,
        asset: AssetId,
    },
    #[error("account {from} does not hold asset {asset}")]
    NotAssetOwner { from: Address, asset: AssetId },
    #[error("account {from} holds {held} of {currency}, transfer needs {needed}")]
    InsufficientFunds {
        from: Address,
        currency: Currency,
        held: U256,
        needed: U256,
    },
}
