//! Shared test doubles for the auction workspace: an in-memory custody
//! ledger, fixed price feeds, an in-process message channel and account
//! helpers.

pub mod channel;
pub mod custody;
pub mod feeds;

use domain::Address;

/// A deterministic test account.
pub fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

/// Initializes logging for a test binary. Later calls are ignored.
pub fn init_tracing() {
    observe::initialize_reentrant("debug");
}
