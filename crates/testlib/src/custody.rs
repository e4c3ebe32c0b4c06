use {
    domain::{
        Address,
        AssetId,
        Collection,
        Currency,
        Custody,
        Settlement,
        custody::{AssetTransfer, Error, FundTransfer},
    },
    primitive_types::U256,
    std::collections::HashMap,
};

/// An in-memory asset and currency ledger implementing the atomic custody
/// contract: a settlement is simulated on a scratch copy and only replaces
/// the live ledger when every transfer in it succeeded.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustody {
    owners: HashMap<(Collection, AssetId), Address>,
    balances: HashMap<(Address, Currency), U256>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asset with its initial owner.
    pub fn mint_asset(&mut self, collection: Collection, asset: AssetId, owner: Address) {
        self.owners.insert((collection, asset), owner);
    }

    /// Credits an account with funds out of thin air.
    pub fn fund(&mut self, account: Address, currency: Currency, amount: U256) {
        *self.balances.entry((account, currency)).or_default() += amount;
    }

    pub fn balance(&self, account: Address, currency: Currency) -> U256 {
        self.balances
            .get(&(account, currency))
            .copied()
            .unwrap_or_default()
    }

    fn apply_asset(&mut self, transfer: &AssetTransfer) -> Result<(), Error> {
        let key = (transfer.collection, transfer.asset);
        let owner = self.owners.get(&key).copied().ok_or(Error::UnknownAsset {
            collection: transfer.collection,
            asset: transfer.asset,
        })?;
        if owner != transfer.from {
            return Err(Error::NotAssetOwner {
                from: transfer.from,
                asset: transfer.asset,
            });
        }
        self.owners.insert(key, transfer.to);
        Ok(())
    }

    fn apply_fund(&mut self, transfer: &FundTransfer) -> Result<(), Error> {
        let held = self.balance(transfer.from, transfer.currency);
        if held < transfer.amount {
            return Err(Error::InsufficientFunds {
                from: transfer.from,
                currency: transfer.currency,
                held,
                needed: transfer.amount,
            });
        }
        self.balances
            .insert((transfer.from, transfer.currency), held - transfer.amount);
        *self
            .balances
            .entry((transfer.to, transfer.currency))
            .or_default() += transfer.amount;
        Ok(())
    }
}

impl Custody for InMemoryCustody {
    fn owner_of(&self, collection: Collection, asset: AssetId) -> Result<Address, Error> {
        self.owners
            .get(&(collection, asset))
            .copied()
            .ok_or(Error::UnknownAsset { collection, asset })
    }

    fn balance_of(&self, account: Address, currency: Currency) -> U256 {
        self.balance(account, currency)
    }

    fn execute(&mut self, settlement: &Settlement) -> Result<(), Error> {
        let mut next = self.clone();
        for transfer in &settlement.assets {
            next.apply_asset(transfer)?;
        }
        for transfer in &settlement.funds {
            next.apply_fund(transfer)?;
        }
        *self = next;
        Ok(())
    }
}
