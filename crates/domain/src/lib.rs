//! Shared domain primitives for the auction house workspace.
//!
//! Every crate in the workspace agrees on these identity and value types;
//! the [`custody`] module defines the boundary to the external asset and
//! currency implementations.

pub mod custody;
pub mod primitives;

pub use {
    custody::{AssetTransfer, Custody, FundTransfer, Settlement},
    primitives::{
        Address,
        AssetId,
        AuctionId,
        ChainId,
        Collection,
        Currency,
        NormalizedValue,
        Timestamp,
    },
};
